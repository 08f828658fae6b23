//! Logging system for the toolbox.
//!
//! Structured `tracing` output to stderr, filtered by `RUST_LOG` when set
//! and by the CLI verbosity flags otherwise.

use toolbox_types::{Result, ToolboxError};
use tracing_subscriber::{fmt, EnvFilter};

/// Filter directive for the given verbosity flags.
///
/// `debug` wins over `verbose`, which wins over `quiet`.
pub fn directive(verbose: bool, debug: bool, quiet: bool) -> &'static str {
    if debug {
        "toolbox=trace,russh=debug"
    } else if verbose {
        "toolbox=debug"
    } else if quiet {
        "toolbox=warn"
    } else {
        "toolbox=info"
    }
}

/// Initialize the logging system.
///
/// `RUST_LOG` takes precedence over `default_directive`.
pub fn init(default_directive: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .try_init()
        .map_err(|e| ToolboxError::Config(format!("initialize logging: {}", e)))
}

/// Initialize the logging system with default configuration.
pub fn init_default() -> Result<()> {
    init(directive(false, false, false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_precedence() {
        assert_eq!(directive(false, false, false), "toolbox=info");
        assert_eq!(directive(true, false, true), "toolbox=debug");
        assert_eq!(directive(true, true, false), "toolbox=trace,russh=debug");
        assert_eq!(directive(false, false, true), "toolbox=warn");
    }
}

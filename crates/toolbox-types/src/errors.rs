//! Error types for toolbox operations.

use crate::enums::ExitInfo;
use std::time::Duration;
use thiserror::Error;

/// The main error type for toolbox operations.
///
/// Variants are grouped the way failures are reported to the operator:
/// configuration problems (surfaced before any network activity),
/// connectivity problems (carrying captured remote output), readiness
/// timeouts, and per-secret failures wrapped with the offending path.
#[derive(Error, Debug)]
pub enum ToolboxError {
    /// Configuration-related error (missing input, malformed files)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Host name absent from the host directory
    #[error("host {name:?} not found (available: {})", .known.join(", "))]
    HostNotFound {
        /// The requested name
        name: String,
        /// Every name the directory knows about
        known: Vec<String>,
    },

    /// Host record present but without an address
    #[error("host {name:?} has no address configured")]
    HostAddressMissing {
        /// The host name
        name: String,
    },

    /// Secret path not of the form `mount/sub/path`
    #[error("invalid path {0:?}: expected format mount/path")]
    MalformedPath(String),

    /// SSH dial, handshake, authentication or channel error
    #[error("SSH error: {0}")]
    Ssh(String),

    /// Remote command exited unsuccessfully
    #[error("remote command `{command}` failed ({exit})\noutput: {output}")]
    Command {
        /// The command line that was run
        command: String,
        /// How the command ended
        exit: ExitInfo,
        /// Combined stdout and stderr
        output: String,
    },

    /// Remote forwarding helper died during startup
    #[error("remote helper failed ({exit})\noutput: {output}")]
    RemoteHelperFailed {
        /// How the helper ended
        exit: ExitInfo,
        /// Everything the helper printed before exiting
        output: String,
    },

    /// Bootstrap credential could not be decoded
    #[error("decode token: {0}")]
    TokenDecode(String),

    /// Secret store never became healthy
    #[error("timeout after {elapsed:?} waiting for Vault: {last_error}")]
    ReadinessTimeout {
        /// How long polling ran
        elapsed: Duration,
        /// The last health check failure observed
        last_error: String,
    },

    /// Vault operation error
    #[error("Vault error: {0}")]
    Vault(String),

    /// Unknown secret type or key algorithm
    #[error("unsupported {what}: {value}")]
    Unsupported {
        /// What kind of value was rejected ("secret type", "algorithm")
        what: &'static str,
        /// The offending value
        value: String,
    },

    /// Operator submitted nothing at a prompt
    #[error("no input provided for {0}")]
    EmptyInput(String),

    /// Secret material could not be generated
    #[error("Secret generation error: {0}")]
    Generation(String),

    /// Failure while processing a specific secret
    #[error("process secret {path:?}")]
    Secret {
        /// Full secret path from the spec file entry
        path: String,
        /// Underlying failure
        #[source]
        source: Box<ToolboxError>,
    },

    /// One or more teardown steps failed
    #[error("close tunnel: {}", .0.join("; "))]
    Close(Vec<String>),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ToolboxError {
    /// Wrap an error with the secret path it occurred on.
    pub fn for_secret(path: impl Into<String>, source: ToolboxError) -> Self {
        ToolboxError::Secret {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// The innermost error, looking through any [`ToolboxError::Secret`] wrapping.
    pub fn root(&self) -> &ToolboxError {
        match self {
            ToolboxError::Secret { source, .. } => source.root(),
            other => other,
        }
    }
}

/// A specialized Result type for toolbox operations.
pub type Result<T> = std::result::Result<T, ToolboxError>;

/// Helper macro to bail out with a ToolboxError
///
/// This is used for expected error conditions.
///
/// # Example
///
/// ```ignore
/// if !valid {
///     bail!(Config, "Invalid configuration: {}", reason);
/// }
/// ```
#[macro_export]
macro_rules! bail {
    ($variant:ident, $msg:expr) => {
        return Err($crate::ToolboxError::$variant($msg.to_string()))
    };
    ($variant:ident, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::ToolboxError::$variant(format!($fmt, $($arg)*)))
    };
}

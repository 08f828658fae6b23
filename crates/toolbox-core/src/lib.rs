//! # Toolbox Core
//!
//! Core utilities, run configuration, host lookup, and logging for the
//! cloudlab toolbox.
//!
//! This crate provides:
//!
//! - **Configuration**: one explicit [`RunConfig`] per invocation
//! - **Host directory**: name → address resolution from `hosts.json`
//! - **Logging**: `tracing` subscriber setup
//! - **Terminal**: masked operator prompts
//! - **File Operations**: typed YAML/JSON loading, path utilities
//!
//! ## Example
//!
//! ```no_run
//! use toolbox_core::HostDirectory;
//!
//! toolbox_core::log::init_default()?;
//!
//! let hosts = HostDirectory::load("hosts.json")?;
//! let address = hosts.resolve("kube-1")?;
//! # Ok::<(), toolbox_types::ToolboxError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod hosts;
pub mod log;
pub mod term;
pub mod util;

// Re-export commonly used items
pub use config::{HostKeyCheck, RunConfig};
pub use hosts::HostDirectory;
pub use term::TerminalPrompt;
pub use toolbox_types::{ToolboxError, Result};

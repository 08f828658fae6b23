//! CLI command implementations.

pub mod secrets;

//! mavis-bench: benchmark harness for the MAvis hospital search client.
//!
//! This library resolves batches of levels, runs the external solver against
//! each one under a hard deadline, extracts performance metrics from its
//! output and emits Markdown, JSON and task-table results.

// Core modules
pub mod cli;
pub mod error;
pub mod export;
pub mod runner;
pub mod tasks;

// Re-export commonly used error types
pub use error::{ConfigurationError, ExportError};

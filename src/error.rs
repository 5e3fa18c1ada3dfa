//! Error types for mavis-bench operations.
//!
//! Two kinds of failure exist in a benchmark batch:
//! - configuration-level problems, fatal before any task runs
//!   ([`ConfigurationError`]);
//! - problems emitting results after the batch ([`ExportError`]).
//!
//! Per-task failures (timeouts, crashes, missing levels) are not errors at
//! all: they are recorded as an [`crate::runner::OutcomeStatus`].

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a batch before any task is executed.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Required artifact not found: {path} ({hint})")]
    MissingArtifact { path: PathBuf, hint: String },

    #[error("No levels found matching prefix '{prefix}' in {}", directory.display())]
    EmptyTaskSource { directory: PathBuf, prefix: String },

    #[error("Task table {} contains no runnable rows", path.display())]
    EmptyTable { path: PathBuf },

    #[error("Invalid strategy '{0}' (expected one of: bfs, dfs, astar, wastar, greedy)")]
    InvalidStrategy(String),

    #[error("Invalid task table {}: {message}", path.display())]
    InvalidTable { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Compilation failed: {0}")]
    Compilation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur while emitting batch results.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Task table {} changed shape during the batch: {message}", path.display())]
    TableMismatch { path: PathBuf, message: String },

    #[error("Failed to update spreadsheet {}: {message}", path.display())]
    Spreadsheet { path: PathBuf, message: String },

    #[error("Table error: {0}")]
    Table(#[from] ConfigurationError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

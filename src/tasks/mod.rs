//! Task sources: which levels to run, with which strategy.
//!
//! Two sources feed the same pipeline:
//! - a directory scan of level files filtered by name prefix, all run with
//!   one strategy;
//! - a structured task table (one sheet per group of levels) naming a
//!   strategy per row, whose rows later receive the results.
//!
//! Both produce [`Task`]s in a deterministic order.

pub mod directory;
pub mod table;
mod xlsx;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::runner::{HarnessConfig, Strategy};

pub use table::{Sheet, Workbook};

/// One level paired with one strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Level name (file stem, or the table's instance cell).
    pub instance_id: String,
    /// Resolved level file; `None` means the task is skipped.
    pub instance_path: Option<PathBuf>,
    /// Strategy to run the level with.
    pub strategy: Strategy,
    /// Where the task came from.
    pub origin: TaskOrigin,
}

/// Provenance of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskOrigin {
    /// Found by scanning a level directory.
    DirectoryScan { directory: PathBuf },
    /// Read from a row of a task table. `row` is the 0-based row index in
    /// the sheet, the header being row 0.
    StructuredTable { sheet: String, row: usize },
}

/// Where to take tasks from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskSource {
    DirectoryScan {
        directory: PathBuf,
        /// Case-sensitive file name prefix; empty matches every level.
        prefix: String,
        extension: String,
        strategy: Strategy,
    },
    StructuredTable {
        path: PathBuf,
        levels_dir: PathBuf,
        extension: String,
    },
}

impl TaskSource {
    /// Scans the configured levels directory with the default strategy.
    pub fn directory_scan(config: &HarnessConfig, prefix: impl Into<String>) -> Self {
        TaskSource::DirectoryScan {
            directory: config.levels_dir.clone(),
            prefix: prefix.into(),
            extension: config.level_extension.clone(),
            strategy: config.default_strategy,
        }
    }

    /// Reads tasks from a workbook, resolving levels in the configured
    /// levels directory.
    pub fn structured_table(config: &HarnessConfig, path: impl Into<PathBuf>) -> Self {
        TaskSource::StructuredTable {
            path: path.into(),
            levels_dir: config.levels_dir.clone(),
            extension: config.level_extension.clone(),
        }
    }

    /// Produces the ordered task list.
    pub fn resolve(&self) -> Result<Vec<Task>, ConfigurationError> {
        match self {
            TaskSource::DirectoryScan {
                directory,
                prefix,
                extension,
                strategy,
            } => directory::scan(directory, prefix, extension, *strategy),
            TaskSource::StructuredTable {
                path,
                levels_dir,
                extension,
            } => table::resolve(path, levels_dir, extension),
        }
    }

    /// Human-readable description for logs and report headers.
    pub fn describe(&self) -> String {
        match self {
            TaskSource::DirectoryScan {
                directory, prefix, ..
            } if prefix.is_empty() => format!("{} (all levels)", directory.display()),
            TaskSource::DirectoryScan {
                directory, prefix, ..
            } => format!("{} (prefix '{}')", directory.display(), prefix),
            TaskSource::StructuredTable { path, .. } => format!("table {}", path.display()),
        }
    }

    /// The workbook to write results back into, if any.
    pub fn table_path(&self) -> Option<&Path> {
        match self {
            TaskSource::StructuredTable { path, .. } => Some(path),
            TaskSource::DirectoryScan { .. } => None,
        }
    }
}

/// Label for the strategies used by a task list: the single strategy, or
/// "mixed".
pub fn strategy_label(tasks: &[Task]) -> String {
    let mut strategies: Vec<Strategy> = tasks.iter().map(|t| t.strategy).collect();
    strategies.sort();
    strategies.dedup();
    match strategies.as_slice() {
        [] => "-".to_string(),
        [only] => only.to_string(),
        _ => "mixed".to_string(),
    }
}

//! Structured task table.
//!
//! A workbook is a list of named sheets, each a grid of cells. Row 0 of every
//! sheet is a header. The layout is fixed:
//!
//! | column | content                        |
//! |--------|--------------------------------|
//! | 0      | level name                     |
//! | 1      | strategy                       |
//! | 2      | nodes generated (written back) |
//! | 3      | search time, s (written back)  |
//! | 4      | solution length (written back) |
//!
//! Workbooks are Excel files (`.xlsx`), or JSON (`.json`) or YAML (`.yaml`,
//! `.yml`) documents of this shape:
//!
//! ```yaml
//! sheets:
//!   - name: SA
//!     rows:
//!       - [Level, Strategy, Generated, Time, Length]
//!       - [SAD1, bfs, null, null, null]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::{xlsx, Task, TaskOrigin};
use crate::error::{ConfigurationError, ExportError};
use crate::runner::Strategy;

pub const INSTANCE_COLUMN: usize = 0;
pub const STRATEGY_COLUMN: usize = 1;
pub const GENERATED_COLUMN: usize = 2;
pub const TIME_COLUMN: usize = 3;
pub const LENGTH_COLUMN: usize = 4;

/// Number of header rows preceding the data in each sheet.
pub const HEADER_ROWS: usize = 1;

/// A named grid of cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}

impl Sheet {
    /// Returns the trimmed text of a cell, or `None` if absent or blank.
    pub fn cell_text(&self, row: usize, column: usize) -> Option<String> {
        let text = match self.rows.get(row)?.get(column)? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null | Value::Array(_) | Value::Object(_) => return None,
        };
        (!text.is_empty()).then_some(text)
    }

    /// Writes a cell, padding the row with nulls as needed.
    pub fn set_cell(&mut self, row: usize, column: usize, value: Value) {
        if let Some(cells) = self.rows.get_mut(row) {
            if cells.len() <= column {
                cells.resize(column + 1, Value::Null);
            }
            cells[column] = value;
        }
    }
}

/// A collection of sheets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    #[serde(default)]
    pub sheets: Vec<Sheet>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkbookFormat {
    Json,
    Yaml,
    Xlsx,
}

impl WorkbookFormat {
    fn for_path(path: &Path) -> Result<Self, ConfigurationError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(WorkbookFormat::Json),
            Some("yaml") | Some("yml") => Ok(WorkbookFormat::Yaml),
            Some("xlsx") => Ok(WorkbookFormat::Xlsx),
            _ => Err(ConfigurationError::InvalidTable {
                path: path.to_path_buf(),
                message: "expected a .xlsx, .json, .yaml or .yml file".to_string(),
            }),
        }
    }
}

impl Workbook {
    /// Reads a workbook from disk.
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let invalid = |message: String| ConfigurationError::InvalidTable {
            path: path.to_path_buf(),
            message,
        };

        let workbook = match WorkbookFormat::for_path(path)? {
            WorkbookFormat::Xlsx => xlsx::read(path)?,
            format => {
                let content = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
                match format {
                    WorkbookFormat::Json => serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))?,
                    _ => serde_yaml::from_str(&content).map_err(|e| invalid(e.to_string()))?,
                }
            }
        };
        debug!(path = %path.display(), sheets = workbook.sheets.len(), "Loaded workbook");
        Ok(workbook)
    }

    /// Writes the workbook to disk through a temporary sibling file, so an
    /// interrupted write never leaves a truncated workbook behind.
    ///
    /// JSON and YAML workbooks are rewritten whole. An Excel workbook must
    /// already exist at `path`; only its written-back columns are replaced.
    pub fn save(&self, path: &Path) -> Result<(), ExportError> {
        let tmp = temp_sibling(path);
        let content = match WorkbookFormat::for_path(path)? {
            WorkbookFormat::Json => Some(serde_json::to_string_pretty(self)? + "\n"),
            WorkbookFormat::Yaml => Some(serde_yaml::to_string(self)?),
            WorkbookFormat::Xlsx => {
                xlsx::write_result_columns(self, path, &tmp)?;
                None
            }
        };

        if let Some(content) = content {
            std::fs::write(&tmp, content).map_err(|source| ExportError::Write {
                path: tmp.clone(),
                source,
            })?;
        }
        std::fs::rename(&tmp, path).map_err(|source| ExportError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    /// Finds a sheet by name.
    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheets.iter_mut().find(|s| s.name == name)
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Reads tasks from every sheet, in sheet then row order.
///
/// Rows missing a level name or a strategy are not tasks and are skipped
/// silently. A strategy that does not parse is a configuration error.
pub fn resolve(path: &Path, levels_dir: &Path, extension: &str) -> Result<Vec<Task>, ConfigurationError> {
    let workbook = Workbook::load(path)?;
    let mut tasks = Vec::new();

    for sheet in &workbook.sheets {
        for row in HEADER_ROWS..sheet.rows.len() {
            let (Some(instance_id), Some(strategy)) = (
                sheet.cell_text(row, INSTANCE_COLUMN),
                sheet.cell_text(row, STRATEGY_COLUMN),
            ) else {
                debug!(sheet = %sheet.name, row, "Row lacks level or strategy, excluded");
                continue;
            };

            let strategy: Strategy = strategy.parse().map_err(|e: ConfigurationError| {
                ConfigurationError::InvalidTable {
                    path: path.to_path_buf(),
                    message: format!("sheet '{}' row {}: {}", sheet.name, row + 1, e),
                }
            })?;

            let instance_path = probe_level(levels_dir, &instance_id, extension);
            if instance_path.is_none() {
                debug!(level = %instance_id, "Level file not found, task will be skipped");
            }

            tasks.push(Task {
                instance_id,
                instance_path,
                strategy,
                origin: TaskOrigin::StructuredTable {
                    sheet: sheet.name.clone(),
                    row,
                },
            });
        }
    }

    if tasks.is_empty() {
        return Err(ConfigurationError::EmptyTable {
            path: path.to_path_buf(),
        });
    }

    info!(count = tasks.len(), table = %path.display(), "Loaded tasks from table");
    Ok(tasks)
}

/// Looks for `<dir>/<id>`, then `<dir>/<id>.<extension>`.
fn probe_level(levels_dir: &Path, instance_id: &str, extension: &str) -> Option<PathBuf> {
    [
        levels_dir.join(instance_id),
        levels_dir.join(format!("{instance_id}.{extension}")),
    ]
    .into_iter()
    .find(|candidate| candidate.is_file())
}

//! Write-back of results into the task table.
//!
//! The workbook is reopened after the batch, updated in memory and saved in
//! one step. Only rows a task came from are touched; values that are unknown
//! are written as `null` so numeric columns never receive placeholder text.

use std::path::Path;

use serde_json::{Number, Value};
use tracing::{debug, info};

use crate::error::ExportError;
use crate::runner::{BatchResult, ExecutionOutcome};
use crate::tasks::table::{GENERATED_COLUMN, INSTANCE_COLUMN, LENGTH_COLUMN, TIME_COLUMN};
use crate::tasks::{TaskOrigin, Workbook};

/// Writes every table-origin outcome back into its row of the workbook at
/// `path`. Returns the number of rows updated.
pub fn write_back(batch: &BatchResult, path: &Path) -> Result<usize, ExportError> {
    let mut workbook = Workbook::load(path)?;
    let mut updated = 0;

    for entry in batch.entries() {
        let TaskOrigin::StructuredTable { sheet, row } = &entry.task.origin else {
            continue;
        };

        let Some(target) = workbook.sheet_mut(sheet) else {
            return Err(ExportError::TableMismatch {
                path: path.to_path_buf(),
                message: format!("sheet '{sheet}' no longer exists"),
            });
        };

        let current = target.cell_text(*row, INSTANCE_COLUMN);
        if current.as_deref() != Some(entry.task.instance_id.as_str()) {
            return Err(ExportError::TableMismatch {
                path: path.to_path_buf(),
                message: format!(
                    "sheet '{}' row {} holds {:?}, expected '{}'",
                    sheet,
                    row + 1,
                    current.unwrap_or_default(),
                    entry.task.instance_id
                ),
            });
        }

        let outcome = &entry.outcome;
        target.set_cell(*row, GENERATED_COLUMN, integer_cell(outcome.nodes_generated));
        target.set_cell(*row, TIME_COLUMN, elapsed_cell(outcome));
        target.set_cell(*row, LENGTH_COLUMN, integer_cell(outcome.solution_length));
        debug!(sheet = %sheet, row, level = %entry.task.instance_id, "Updated row");
        updated += 1;
    }

    workbook.save(path)?;
    info!(path = %path.display(), rows = updated, "Wrote results back to task table");
    Ok(updated)
}

fn integer_cell(value: Option<u64>) -> Value {
    value.map(Value::from).unwrap_or(Value::Null)
}

/// Search time reported by the client, else the measured wall time.
fn elapsed_cell(outcome: &ExecutionOutcome) -> Value {
    outcome
        .cpu_time_seconds
        .or(outcome.wall_time_seconds)
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::metrics::PartialMetrics;
    use crate::runner::{BatchMetadata, BatchRecorder, Strategy};
    use crate::tasks::Task;
    use serde_json::json;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn metadata() -> BatchMetadata {
        BatchMetadata {
            run_id: "batch-wb".to_string(),
            source: "table".to_string(),
            strategy: "mixed".to_string(),
            timeout_secs: 180.0,
            solver: "sh".to_string(),
        }
    }

    fn table_task(id: &str, sheet: &str, row: usize) -> Task {
        Task {
            instance_id: id.to_string(),
            instance_path: None,
            strategy: Strategy::Bfs,
            origin: TaskOrigin::StructuredTable {
                sheet: sheet.to_string(),
                row,
            },
        }
    }

    fn workbook_file(temp: &TempDir) -> std::path::PathBuf {
        let path = temp.path().join("tasks.json");
        let workbook = json!({
            "sheets": [{
                "name": "SA",
                "rows": [
                    ["Level", "Strategy", "Generated", "Time", "Length"],
                    ["SAD1", "bfs", "stale", "stale", "stale"],
                    ["notes", null],
                    ["SAD2", "dfs"]
                ]
            }]
        });
        fs::write(&path, workbook.to_string()).unwrap();
        path
    }

    #[test]
    fn test_write_back_updates_origin_rows_only() {
        let temp = TempDir::new().unwrap();
        let path = workbook_file(&temp);

        let mut recorder = BatchRecorder::start(metadata());
        let solved = PartialMetrics {
            solved: true,
            solution_length: Some(19),
            generated: Some(1234),
            time_seconds: Some(0.5),
            ..PartialMetrics::default()
        };
        recorder.record(
            table_task("SAD1", "SA", 1),
            ExecutionOutcome::from_exit(Some(0), solved, Duration::from_secs(1)),
        );
        recorder.record(table_task("SAD2", "SA", 3), ExecutionOutcome::skipped());
        let batch = recorder.finish();

        assert_eq!(write_back(&batch, &path).unwrap(), 2);

        let workbook = Workbook::load(&path).unwrap();
        let rows = &workbook.sheets[0].rows;
        assert_eq!(rows[1], vec![json!("SAD1"), json!("bfs"), json!(1234), json!(0.5), json!(19)]);
        assert_eq!(rows[2], vec![json!("notes"), Value::Null]);
        assert_eq!(
            rows[3],
            vec![json!("SAD2"), json!("dfs"), Value::Null, Value::Null, Value::Null]
        );
        assert_eq!(rows[0][0], json!("Level"));
    }

    #[test]
    fn test_timeout_writes_wall_time_without_length() {
        let temp = TempDir::new().unwrap();
        let path = workbook_file(&temp);

        let mut recorder = BatchRecorder::start(metadata());
        recorder.record(table_task("SAD1", "SA", 1), ExecutionOutcome::timeout(Duration::from_secs(190)));
        write_back(&recorder.finish(), &path).unwrap();

        let workbook = Workbook::load(&path).unwrap();
        let row = &workbook.sheets[0].rows[1];
        assert_eq!(row[GENERATED_COLUMN], Value::Null);
        assert_eq!(row[TIME_COLUMN], json!(190.0));
        assert_eq!(row[LENGTH_COLUMN], Value::Null);
    }

    #[test]
    fn test_moved_row_is_mismatch() {
        let temp = TempDir::new().unwrap();
        let path = workbook_file(&temp);
        let before = fs::read_to_string(&path).unwrap();

        let mut recorder = BatchRecorder::start(metadata());
        recorder.record(table_task("SAD1", "SA", 3), ExecutionOutcome::skipped());
        let err = write_back(&recorder.finish(), &path).unwrap_err();

        assert!(matches!(err, ExportError::TableMismatch { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_directory_tasks_are_ignored() {
        let temp = TempDir::new().unwrap();
        let path = workbook_file(&temp);

        let mut recorder = BatchRecorder::start(metadata());
        recorder.record(
            Task {
                instance_id: "SAD1".to_string(),
                instance_path: None,
                strategy: Strategy::Bfs,
                origin: TaskOrigin::DirectoryScan {
                    directory: temp.path().to_path_buf(),
                },
            },
            ExecutionOutcome::skipped(),
        );
        assert_eq!(write_back(&recorder.finish(), &path).unwrap(), 0);
    }
}

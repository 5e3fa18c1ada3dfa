//! JSON record of a finished batch.

use std::path::Path;

use tracing::info;

use crate::error::ExportError;
use crate::runner::BatchResult;

/// Writes the batch as pretty-printed JSON.
pub fn write_json(batch: &BatchResult, path: &Path) -> Result<(), ExportError> {
    let json = serde_json::to_string_pretty(batch)?;
    super::write_file(path, &json)?;
    info!(path = %path.display(), entries = batch.entries().len(), "Wrote JSON record");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{BatchMetadata, BatchRecorder, ExecutionOutcome, Strategy};
    use crate::tasks::{Task, TaskOrigin};
    use std::path::PathBuf;

    #[test]
    fn test_write_json_keeps_unknowns_as_null() {
        let mut recorder = BatchRecorder::start(BatchMetadata {
            run_id: "batch-json".to_string(),
            source: "table tasks.yaml".to_string(),
            strategy: "dfs".to_string(),
            timeout_secs: 60.0,
            solver: "sh".to_string(),
        });
        recorder.record(
            Task {
                instance_id: "SAD9".to_string(),
                instance_path: None,
                strategy: Strategy::Dfs,
                origin: TaskOrigin::StructuredTable {
                    sheet: "SA".to_string(),
                    row: 3,
                },
            },
            ExecutionOutcome::skipped(),
        );
        let batch = recorder.finish();

        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("batch.json");
        write_json(&batch, &path).unwrap();

        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["metadata"]["run_id"], "batch-json");
        assert_eq!(value["counts"]["skipped"], 1);
        let outcome = &value["entries"][0]["outcome"];
        assert_eq!(outcome["status"], "skipped");
        assert!(outcome["solution_length"].is_null());
        assert_eq!(value["entries"][0]["task"]["origin"]["row"], 3);

        let restored: BatchResult = serde_json::from_value(value).unwrap();
        assert_eq!(restored, batch);
    }
}

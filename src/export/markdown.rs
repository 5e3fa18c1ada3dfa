//! Narrative Markdown report.

use std::fmt::Write as _;
use std::path::Path;

use tracing::info;

use crate::error::ExportError;
use crate::runner::{BatchResult, ExecutionOutcome, OutcomeStatus};

/// Placeholder rendered for unknown values.
pub const PLACEHOLDER: &str = "-";

/// Renders the report for a finished batch.
///
/// The output depends only on `batch`: rendering the same result twice gives
/// identical text.
pub fn render_markdown(batch: &BatchResult) -> String {
    let meta = batch.metadata();
    let counts = batch.counts();
    let timeout = format_secs(meta.timeout_secs);

    let mut out = String::new();
    out.push_str("# Benchmark Results\n\n");
    let _ = writeln!(
        out,
        "**Date:** {}  ",
        batch.started_at().format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out, "**Run:** `{}`  ", meta.run_id);
    let _ = writeln!(out, "**Source:** {}  ", escape_cell(&meta.source));
    let _ = writeln!(
        out,
        "**Strategy:** `{}` | **Timeout:** {}s | **Solver:** `{}`  ",
        meta.strategy, timeout, meta.solver
    );

    let mut score = format!("**Score:** {}/{} solved", counts.solved, counts.total);
    if counts.timeout > 0 {
        let _ = write!(score, " | {} timeout", counts.timeout);
    }
    if counts.error > 0 {
        let _ = write!(score, " | {} error/unsolved", counts.error);
    }
    if counts.skipped > 0 {
        let _ = write!(score, " | {} skipped", counts.skipped);
    }
    out.push_str(&score);
    out.push_str("\n\n");

    out.push_str(
        "| Level | Strategy | Status | Solution Length | Time (s) | Wall (s) | Expanded | Generated | Memory |\n",
    );
    out.push_str(
        "|-------|----------|--------|-----------------|----------|----------|----------|-----------|--------|\n",
    );

    for entry in batch.entries() {
        let outcome = &entry.outcome;
        let _ = writeln!(
            out,
            "| `{}` | {} | {} | {} | {} | {} | {} | {} | {} |",
            escape_cell(&entry.task.instance_id),
            entry.task.strategy,
            outcome.status.label(),
            or_placeholder(outcome.solution_length),
            search_time(outcome, &timeout),
            outcome
                .wall_time_seconds
                .map(|s| format!("{s:.2}"))
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
            or_placeholder(outcome.nodes_expanded),
            or_placeholder(outcome.nodes_generated),
            outcome
                .memory_used
                .as_deref()
                .map(escape_cell)
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
        );
    }

    out.push_str("\n### Summary\n");
    let _ = writeln!(out, "- **Total**: {}", counts.total);
    let _ = writeln!(out, "- **Solved**: {} ✅", counts.solved);
    let _ = writeln!(out, "- **Timeout**: {} ⏱️", counts.timeout);
    let _ = writeln!(out, "- **Error / Unsolved**: {} ❌", counts.error);
    let _ = writeln!(out, "- **Skipped**: {} ⏭️", counts.skipped);

    out
}

/// Renders the report and writes it to `path`.
pub fn write_report(batch: &BatchResult, path: &Path) -> Result<(), ExportError> {
    super::write_file(path, &render_markdown(batch))?;
    info!(path = %path.display(), "Wrote Markdown report");
    Ok(())
}

fn search_time(outcome: &ExecutionOutcome, timeout: &str) -> String {
    match (outcome.status, outcome.cpu_time_seconds) {
        (_, Some(secs)) => format!("{secs:.3}"),
        (OutcomeStatus::Timeout, None) => format!(">{timeout}"),
        (_, None) => PLACEHOLDER.to_string(),
    }
}

fn or_placeholder<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| PLACEHOLDER.to_string())
}

fn format_secs(secs: f64) -> String {
    if secs.fract() == 0.0 {
        format!("{secs:.0}")
    } else {
        secs.to_string()
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::metrics::PartialMetrics;
    use crate::runner::{BatchMetadata, BatchRecorder, Strategy};
    use crate::tasks::{Task, TaskOrigin};
    use std::path::PathBuf;
    use std::time::Duration;

    fn task(id: &str) -> Task {
        Task {
            instance_id: id.to_string(),
            instance_path: Some(PathBuf::from(format!("levels/{id}.lvl"))),
            strategy: Strategy::Bfs,
            origin: TaskOrigin::DirectoryScan {
                directory: PathBuf::from("levels"),
            },
        }
    }

    fn batch() -> BatchResult {
        let mut recorder = BatchRecorder::start(BatchMetadata {
            run_id: "batch-test".to_string(),
            source: "levels (prefix 'MA')".to_string(),
            strategy: "bfs".to_string(),
            timeout_secs: 180.0,
            solver: "java -jar server.jar".to_string(),
        });
        let solved = PartialMetrics {
            solved: true,
            solution_length: Some(12),
            expanded: Some(1000),
            frontier: Some(20),
            generated: Some(1020),
            time_seconds: Some(0.25),
            memory: Some("12.5 MB".to_string()),
        };
        recorder.record(
            task("MAPF00"),
            ExecutionOutcome::from_exit(Some(0), solved, Duration::from_millis(1500)),
        );
        recorder.record(task("MAthomasAppartment"), ExecutionOutcome::timeout(Duration::from_secs(190)));
        recorder.record(task("MAmissing"), ExecutionOutcome::skipped());
        recorder.record(
            task("MAcrash"),
            ExecutionOutcome::from_exit(Some(1), PartialMetrics::default(), Duration::from_secs(1)),
        );
        recorder.finish()
    }

    #[test]
    fn test_render_is_deterministic() {
        let batch = batch();
        assert_eq!(render_markdown(&batch), render_markdown(&batch));
    }

    #[test]
    fn test_header_counts() {
        let report = render_markdown(&batch());
        assert!(report.starts_with("# Benchmark Results\n"));
        assert!(report.contains("**Strategy:** `bfs` | **Timeout:** 180s"));
        assert!(report.contains("**Score:** 1/4 solved | 1 timeout | 1 error/unsolved | 1 skipped"));
        assert!(report.contains("- **Total**: 4"));
        assert!(report.contains("- **Skipped**: 1 ⏭️"));
    }

    #[test]
    fn test_rows_and_placeholders() {
        let report = render_markdown(&batch());
        assert!(report.contains("| `MAPF00` | bfs | ✅ Solved | 12 | 0.250 | 1.50 | 1000 | 1020 | 12.5 MB |"));
        assert!(report.contains("| `MAthomasAppartment` | bfs | ⏱️ Timeout | - | >180 | 190.00 | - | - | - |"));
        assert!(report.contains("| `MAmissing` | bfs | ⏭️ Skipped | - | - | - | - | - | - |"));
        assert!(report.contains("| `MAcrash` | bfs | ❌ Error | - | - | 1.00 | - | - | - |"));
    }

    #[test]
    fn test_rows_follow_batch_order() {
        let report = render_markdown(&batch());
        let first = report.find("`MAPF00`").unwrap();
        let last = report.find("`MAcrash`").unwrap();
        assert!(first < last);
    }

    #[test]
    fn test_format_secs() {
        assert_eq!(format_secs(180.0), "180");
        assert_eq!(format_secs(0.5), "0.5");
    }

    #[test]
    fn test_write_report() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("out").join("results.md");
        let batch = batch();

        write_report(&batch, &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), render_markdown(&batch));
    }
}

//! Batch orchestrator.
//!
//! Runs tasks strictly one after another, so timings never overlap. A
//! failing task never stops the batch.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use super::adapters::SolverAdapter;
use super::config::HarnessConfig;
use super::executor::TaskRunner;
use super::result::{BatchMetadata, BatchRecorder, BatchResult, ExecutionOutcome};
use crate::error::ConfigurationError;
use crate::tasks::{strategy_label, Task, TaskSource};

/// One progress update. `outcome` is `None` when the task is about to start.
#[derive(Debug, Clone, Copy)]
pub struct ProgressEvent<'a> {
    /// 1-based position of the task in the batch.
    pub position: usize,
    pub total: usize,
    pub task: &'a Task,
    pub outcome: Option<&'a ExecutionOutcome>,
}

/// Receives progress events, e.g. to print an operator console line.
pub type ProgressSink = Arc<dyn Fn(&ProgressEvent<'_>) + Send + Sync>;

/// Coordinates resolution, execution and accumulation for one batch.
pub struct BatchOrchestrator {
    config: HarnessConfig,
    runner: TaskRunner,
    progress: Option<ProgressSink>,
}

impl BatchOrchestrator {
    /// Creates an orchestrator launching runs through `adapter`.
    pub fn new(config: HarnessConfig, adapter: Arc<dyn SolverAdapter>) -> Self {
        let runner = TaskRunner::new(adapter, config.timeout, config.grace);
        Self {
            config,
            runner,
            progress: None,
        }
    }

    /// Installs a progress sink.
    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Checks prerequisites and resolves the task list. Any error here is
    /// fatal and happens before a single task runs.
    pub async fn prepare(&self, source: &TaskSource) -> Result<Vec<Task>, ConfigurationError> {
        self.config.validate()?;
        self.runner.adapter().check_prerequisites().await?;
        source.resolve()
    }

    /// Prepares and executes a whole batch from a task source.
    pub async fn run_source(&self, source: &TaskSource) -> Result<BatchResult, ConfigurationError> {
        let tasks = self.prepare(source).await?;
        Ok(self.execute(&source.describe(), tasks).await)
    }

    /// Executes tasks in order, one at a time.
    pub async fn execute(&self, source: &str, tasks: Vec<Task>) -> BatchResult {
        let metadata = BatchMetadata {
            run_id: format!("batch-{}", Uuid::new_v4()),
            source: source.to_string(),
            strategy: strategy_label(&tasks),
            timeout_secs: self.config.timeout.as_secs_f64(),
            solver: self.runner.adapter().describe(),
        };
        info!(
            run_id = %metadata.run_id,
            tasks = tasks.len(),
            source = %metadata.source,
            "Starting batch"
        );

        let total = tasks.len();
        let mut recorder = BatchRecorder::start(metadata);

        for (idx, task) in tasks.into_iter().enumerate() {
            self.notify(&ProgressEvent {
                position: idx + 1,
                total,
                task: &task,
                outcome: None,
            });

            let outcome = self.runner.run(&task).await;
            if !outcome.is_solved() {
                warn!(level = %task.instance_id, status = %outcome.status, "Task not solved");
            }

            self.notify(&ProgressEvent {
                position: idx + 1,
                total,
                task: &task,
                outcome: Some(&outcome),
            });
            recorder.record(task, outcome);
        }

        let batch = recorder.finish();
        let counts = batch.counts();
        info!(
            solved = counts.solved,
            timeout = counts.timeout,
            error = counts.error,
            skipped = counts.skipped,
            total = counts.total,
            "Batch complete"
        );
        batch
    }

    fn notify(&self, event: &ProgressEvent<'_>) {
        if let Some(sink) = &self.progress {
            sink(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::adapters::CommandAdapter;
    use crate::runner::result::OutcomeStatus;
    use crate::runner::Strategy;
    use crate::tasks::TaskOrigin;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;

    fn task(id: &str, path: Option<&str>) -> Task {
        Task {
            instance_id: id.to_string(),
            instance_path: path.map(PathBuf::from),
            strategy: Strategy::Bfs,
            origin: TaskOrigin::DirectoryScan {
                directory: PathBuf::from("levels"),
            },
        }
    }

    #[tokio::test]
    async fn test_failures_do_not_abort_batch() {
        let config = HarnessConfig::default().with_timeout(Duration::from_secs(5));
        let orchestrator = BatchOrchestrator::new(config, Arc::new(CommandAdapter::new("/nonexistent/solver")));

        let batch = orchestrator
            .execute("test", vec![task("A", Some("A.lvl")), task("B", None), task("C", Some("C.lvl"))])
            .await;

        let statuses: Vec<OutcomeStatus> = batch.entries().iter().map(|e| e.outcome.status).collect();
        assert_eq!(
            statuses,
            vec![
                OutcomeStatus::InternalException,
                OutcomeStatus::Skipped,
                OutcomeStatus::InternalException
            ]
        );
        assert_eq!(batch.counts().error, 2);
        assert_eq!(batch.counts().skipped, 1);
        assert_eq!(batch.metadata().strategy, "bfs");
        assert_eq!(batch.metadata().timeout_secs, 5.0);
        assert!(batch.metadata().run_id.starts_with("batch-"));
    }

    #[tokio::test]
    async fn test_progress_events_in_order() {
        let seen: Arc<Mutex<Vec<(usize, bool)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let sink: ProgressSink = Arc::new(move |event: &ProgressEvent<'_>| {
            sink_seen
                .lock()
                .unwrap()
                .push((event.position, event.outcome.is_some()));
        });

        let orchestrator = BatchOrchestrator::new(
            HarnessConfig::default(),
            Arc::new(CommandAdapter::new("/nonexistent/solver")),
        )
        .with_progress(sink);

        orchestrator.execute("test", vec![task("A", None), task("B", None)]).await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![(1, false), (1, true), (2, false), (2, true)]
        );
    }

    #[tokio::test]
    async fn test_prepare_fails_before_running() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = HarnessConfig::default().with_levels_dir(temp.path());
        let orchestrator = BatchOrchestrator::new(config.clone(), Arc::new(CommandAdapter::new("sh")));

        let err = orchestrator
            .run_source(&TaskSource::directory_scan(&config, "MAPF"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::EmptyTaskSource { .. }));
    }
}

//! Outcomes of single runs and of whole batches.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::metrics::PartialMetrics;
use crate::tasks::Task;

/// Classification of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// The client reported a solution.
    Solved,
    /// The run finished cleanly without a solution.
    NoSolution,
    /// The process exited non-zero without reporting a solution.
    ProcessError,
    /// The run hit the hard deadline and was killed.
    Timeout,
    /// The process could not be started or waited on.
    InternalException,
    /// The level could not be resolved; nothing was started.
    Skipped,
}

impl OutcomeStatus {
    /// Label used in the narrative report.
    pub fn label(&self) -> &'static str {
        match self {
            OutcomeStatus::Solved => "✅ Solved",
            OutcomeStatus::NoSolution => "❌ No solution",
            OutcomeStatus::ProcessError => "❌ Error",
            OutcomeStatus::Timeout => "⏱️ Timeout",
            OutcomeStatus::InternalException => "❌ Exception",
            OutcomeStatus::Skipped => "⏭️ Skipped",
        }
    }
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutcomeStatus::Solved => write!(f, "solved"),
            OutcomeStatus::NoSolution => write!(f, "no_solution"),
            OutcomeStatus::ProcessError => write!(f, "process_error"),
            OutcomeStatus::Timeout => write!(f, "timeout"),
            OutcomeStatus::InternalException => write!(f, "internal_exception"),
            OutcomeStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Result of running one task.
///
/// Fields are never omitted when serialized; unknown values are `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub status: OutcomeStatus,
    /// Present only when `status` is `Solved`.
    pub solution_length: Option<u64>,
    /// Search time reported by the client.
    pub cpu_time_seconds: Option<f64>,
    /// Time measured by the harness; present whenever a process was started.
    pub wall_time_seconds: Option<f64>,
    pub memory_used: Option<String>,
    pub nodes_expanded: Option<u64>,
    pub nodes_generated: Option<u64>,
    pub frontier_size: Option<u64>,
    /// Exit code, when the process exited on its own.
    pub exit_code: Option<i32>,
    /// Diagnostic message for exceptions.
    pub error: Option<String>,
}

impl ExecutionOutcome {
    fn empty(status: OutcomeStatus) -> Self {
        Self {
            status,
            solution_length: None,
            cpu_time_seconds: None,
            wall_time_seconds: None,
            memory_used: None,
            nodes_expanded: None,
            nodes_generated: None,
            frontier_size: None,
            exit_code: None,
            error: None,
        }
    }

    /// Outcome for a task whose level could not be resolved.
    pub fn skipped() -> Self {
        Self::empty(OutcomeStatus::Skipped)
    }

    /// Outcome for a run killed at the hard deadline.
    pub fn timeout(deadline: Duration) -> Self {
        Self {
            wall_time_seconds: Some(deadline.as_secs_f64()),
            ..Self::empty(OutcomeStatus::Timeout)
        }
    }

    /// Outcome for a run that could not be started or awaited.
    pub fn internal_exception(error: impl Into<String>, wall_time: Option<Duration>) -> Self {
        Self {
            wall_time_seconds: wall_time.map(|d| d.as_secs_f64()),
            error: Some(error.into()),
            ..Self::empty(OutcomeStatus::InternalException)
        }
    }

    /// Classifies a finished process from its exit code and parsed output.
    ///
    /// A non-zero exit only counts as an error when the output does not
    /// report a solution. `exit_code` is `None` when killed by a signal.
    pub fn from_exit(exit_code: Option<i32>, metrics: PartialMetrics, wall_time: Duration) -> Self {
        let exited_cleanly = exit_code == Some(0);
        let status = if !exited_cleanly && !metrics.solved {
            OutcomeStatus::ProcessError
        } else if metrics.solved {
            OutcomeStatus::Solved
        } else {
            OutcomeStatus::NoSolution
        };

        Self {
            status,
            solution_length: if status == OutcomeStatus::Solved {
                metrics.solution_length
            } else {
                None
            },
            cpu_time_seconds: metrics.time_seconds,
            wall_time_seconds: Some(wall_time.as_secs_f64()),
            memory_used: metrics.memory,
            nodes_expanded: metrics.expanded,
            nodes_generated: metrics.generated,
            frontier_size: metrics.frontier,
            exit_code,
            error: None,
        }
    }

    /// Returns true if the run solved its level.
    pub fn is_solved(&self) -> bool {
        self.status == OutcomeStatus::Solved
    }
}

/// Aggregate counts over a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCounts {
    pub solved: usize,
    pub timeout: usize,
    /// Process errors, internal exceptions and runs without a solution.
    pub error: usize,
    pub skipped: usize,
    pub total: usize,
}

impl BatchCounts {
    fn record(&mut self, status: OutcomeStatus) {
        self.total += 1;
        match status {
            OutcomeStatus::Solved => self.solved += 1,
            OutcomeStatus::Timeout => self.timeout += 1,
            OutcomeStatus::Skipped => self.skipped += 1,
            OutcomeStatus::NoSolution
            | OutcomeStatus::ProcessError
            | OutcomeStatus::InternalException => self.error += 1,
        }
    }
}

/// One task together with its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub task: Task,
    pub outcome: ExecutionOutcome,
}

/// Descriptive metadata for a batch, fixed before the first task runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchMetadata {
    /// Unique identifier for this batch.
    pub run_id: String,
    /// Human-readable description of the task source.
    pub source: String,
    /// Strategy label: a single strategy, or "mixed".
    pub strategy: String,
    /// Per-task timeout in seconds.
    pub timeout_secs: f64,
    /// Description of the solver command.
    pub solver: String,
}

/// Accumulates outcomes while a batch is running.
#[derive(Debug)]
pub struct BatchRecorder {
    metadata: BatchMetadata,
    started_at: DateTime<Utc>,
    entries: Vec<BatchEntry>,
    counts: BatchCounts,
}

impl BatchRecorder {
    /// Starts an empty batch.
    pub fn start(metadata: BatchMetadata) -> Self {
        Self {
            metadata,
            started_at: Utc::now(),
            entries: Vec::new(),
            counts: BatchCounts::default(),
        }
    }

    /// Appends the outcome of the next task.
    pub fn record(&mut self, task: Task, outcome: ExecutionOutcome) {
        self.counts.record(outcome.status);
        self.entries.push(BatchEntry { task, outcome });
    }

    /// Running counts so far.
    pub fn counts(&self) -> BatchCounts {
        self.counts
    }

    /// Freezes the batch.
    pub fn finish(self) -> BatchResult {
        BatchResult {
            metadata: self.metadata,
            started_at: self.started_at,
            finished_at: Utc::now(),
            entries: self.entries,
            counts: self.counts,
        }
    }
}

/// A completed, read-only batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    metadata: BatchMetadata,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    entries: Vec<BatchEntry>,
    counts: BatchCounts,
}

impl BatchResult {
    pub fn metadata(&self) -> &BatchMetadata {
        &self.metadata
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    /// Entries in task order.
    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    pub fn counts(&self) -> BatchCounts {
        self.counts
    }

    /// True only if the batch is non-empty and every task was solved.
    pub fn all_solved(&self) -> bool {
        self.counts.total > 0 && self.counts.solved == self.counts.total
    }
}

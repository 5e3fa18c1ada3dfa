//! Benchmark runner for the MAvis search client.
//!
//! This module runs the external solver against levels and turns each run
//! into a structured outcome.
//!
//! # Architecture
//!
//! ```text
//! TaskSource → Vec<Task> → BatchOrchestrator → TaskRunner → solver process
//!                                   ↓                           ↓
//!                              BatchResult  ←  metrics::extract(stdout + stderr)
//! ```
//!
//! The runner:
//! 1. Checks that the solver artifacts exist
//! 2. Runs every task in order under a hard deadline
//! 3. Parses the solver output into metrics
//! 4. Accumulates outcomes into a frozen [`BatchResult`]
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use mavis_bench::runner::{BatchOrchestrator, HarnessConfig, ServerAdapter};
//! use mavis_bench::tasks::TaskSource;
//!
//! let config = HarnessConfig::default().with_timeout(Duration::from_secs(60));
//! let adapter = Arc::new(ServerAdapter::from_config(&config));
//! let source = TaskSource::directory_scan(&config, "MAPF");
//!
//! let batch = BatchOrchestrator::new(config, adapter).run_source(&source).await?;
//! println!("{}/{} solved", batch.counts().solved, batch.counts().total);
//! ```

pub mod adapters;
pub mod compile;
pub mod config;
pub mod executor;
pub mod metrics;
pub mod orchestrator;
pub mod result;

pub use adapters::{AdapterError, CommandAdapter, Invocation, ServerAdapter, SolverAdapter, Strategy};
pub use compile::compile_client;
pub use config::HarnessConfig;
pub use executor::TaskRunner;
pub use metrics::PartialMetrics;
pub use orchestrator::{BatchOrchestrator, ProgressEvent, ProgressSink};
pub use result::{
    BatchCounts, BatchEntry, BatchMetadata, BatchRecorder, BatchResult, ExecutionOutcome, OutcomeStatus,
};

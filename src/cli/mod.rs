//! Command-line interface for mavis-bench.
//!
//! Provides commands for running benchmark batches and compiling the search
//! client.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli, Commands};

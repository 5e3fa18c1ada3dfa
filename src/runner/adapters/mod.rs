//! Solver adapters for launching the external search program.
//!
//! Each adapter knows how to:
//! 1. Build the command line for one level and one strategy
//! 2. Check that the artifacts it needs are present before a batch starts
//!
//! The executor owns process lifetime, deadlines and output capture; adapters
//! only describe *what* to launch.

pub mod command;
pub mod server;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::error::ConfigurationError;

/// Search strategies understood by the search client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Breadth-first search.
    #[default]
    Bfs,
    /// Depth-first search.
    Dfs,
    /// A* with the client's default heuristic.
    Astar,
    /// Weighted A*.
    Wastar,
    /// Greedy best-first search.
    Greedy,
}

impl Strategy {
    /// Every strategy, in the order they are listed to operators.
    pub const ALL: [Strategy; 5] = [
        Strategy::Bfs,
        Strategy::Dfs,
        Strategy::Astar,
        Strategy::Wastar,
        Strategy::Greedy,
    ];

    /// Returns the name passed to the client (without the leading dash).
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Bfs => "bfs",
            Strategy::Dfs => "dfs",
            Strategy::Astar => "astar",
            Strategy::Wastar => "wastar",
            Strategy::Greedy => "greedy",
        }
    }

    /// Returns the command-line flag selecting this strategy in the client.
    pub fn client_flag(&self) -> String {
        format!("-{}", self.as_str())
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Strategy {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('-').to_lowercase().as_str() {
            "bfs" => Ok(Strategy::Bfs),
            "dfs" => Ok(Strategy::Dfs),
            "astar" | "a*" => Ok(Strategy::Astar),
            "wastar" | "wa*" => Ok(Strategy::Wastar),
            "greedy" => Ok(Strategy::Greedy),
            _ => Err(ConfigurationError::InvalidStrategy(s.trim().to_string())),
        }
    }
}

/// Everything an adapter needs to know to launch one run.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    /// Resolved path of the level file.
    pub instance_path: &'a Path,
    /// Strategy to select in the client.
    pub strategy: Strategy,
    /// Per-task budget handed to the external program.
    pub timeout: Duration,
}

impl Invocation<'_> {
    /// Timeout in whole seconds, never below one.
    pub fn timeout_secs(&self) -> u64 {
        self.timeout.as_secs().max(1)
    }
}

/// Trait for solver adapters.
#[async_trait]
pub trait SolverAdapter: Send + Sync {
    /// Short human-readable description, used in logs and report headers.
    fn describe(&self) -> String;

    /// Builds the command for one run. Stdio and kill-on-drop are configured
    /// by the executor.
    fn command(&self, invocation: &Invocation<'_>) -> Result<Command, AdapterError>;

    /// Verifies that the artifacts this adapter launches exist.
    async fn check_prerequisites(&self) -> Result<(), ConfigurationError>;
}

/// Error type for adapter operations.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("Invalid command template: {0}")]
    InvalidTemplate(String),

    #[error("Instance path is not valid UTF-8: {0}")]
    NonUtf8Path(String),
}

pub use command::CommandAdapter;
pub use server::ServerAdapter;

//! Generic command adapter.
//!
//! Runs any command-line solver. Arguments may contain the placeholders
//! `{instance}`, `{strategy}` and `{timeout}`, substituted per run.

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;

use super::{AdapterError, Invocation, SolverAdapter};
use crate::error::ConfigurationError;

/// Generic adapter that works with any CLI-based solver.
#[derive(Debug, Clone)]
pub struct CommandAdapter {
    /// Program to run.
    program: String,
    /// Argument templates.
    args: Vec<String>,
}

impl CommandAdapter {
    /// Creates a new command adapter with the given program.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Creates with argument templates.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Parses a whitespace-separated command line such as
    /// `./solve.sh {instance} -{strategy}`.
    pub fn parse(command_line: &str) -> Result<Self, AdapterError> {
        let mut parts = command_line.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| AdapterError::InvalidTemplate("empty solver command".to_string()))?;
        Ok(Self::new(program).with_args(parts))
    }

    fn expand(&self, template: &str, invocation: &Invocation<'_>) -> Result<String, AdapterError> {
        let instance = invocation
            .instance_path
            .to_str()
            .ok_or_else(|| AdapterError::NonUtf8Path(invocation.instance_path.display().to_string()))?;

        Ok(template
            .replace("{instance}", instance)
            .replace("{strategy}", invocation.strategy.as_str())
            .replace("{timeout}", &invocation.timeout_secs().to_string()))
    }
}

#[async_trait]
impl SolverAdapter for CommandAdapter {
    fn describe(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }

    fn command(&self, invocation: &Invocation<'_>) -> Result<Command, AdapterError> {
        let mut cmd = Command::new(&self.program);
        for arg in &self.args {
            cmd.arg(self.expand(arg, invocation)?);
        }
        Ok(cmd)
    }

    async fn check_prerequisites(&self) -> Result<(), ConfigurationError> {
        // Bare program names are looked up on PATH at spawn time.
        let looks_like_path = self.program.contains(std::path::MAIN_SEPARATOR) || self.program.contains('/');
        if looks_like_path && !tokio::fs::try_exists(Path::new(&self.program)).await.unwrap_or(false) {
            return Err(ConfigurationError::MissingArtifact {
                path: self.program.clone().into(),
                hint: "solver command does not exist".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::Strategy;
    use std::time::Duration;

    fn args_of(cmd: &Command) -> Vec<String> {
        cmd.as_std()
            .get_args()
            .map(|a| a.to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_parse_and_expand() {
        let adapter = CommandAdapter::parse("./solve.sh --level {instance} -{strategy} -t {timeout}").unwrap();
        let path = Path::new("levels/SAD1.lvl");
        let invocation = Invocation {
            instance_path: path,
            strategy: Strategy::Astar,
            timeout: Duration::from_secs(30),
        };

        let cmd = adapter.command(&invocation).unwrap();
        assert_eq!(cmd.as_std().get_program(), "./solve.sh");
        assert_eq!(
            args_of(&cmd),
            vec!["--level", "levels/SAD1.lvl", "-astar", "-t", "30"]
        );
    }

    #[test]
    fn test_parse_empty_command() {
        assert!(matches!(
            CommandAdapter::parse("   "),
            Err(AdapterError::InvalidTemplate(_))
        ));
    }

    #[test]
    fn test_describe() {
        let adapter = CommandAdapter::new("sh").with_args(["-c", "cat {instance}"]);
        assert_eq!(adapter.describe(), "sh -c cat {instance}");
        assert_eq!(CommandAdapter::new("solver").describe(), "solver");
    }

    #[tokio::test]
    async fn test_prerequisites_missing_script() {
        let adapter = CommandAdapter::new("./definitely/not/here.sh");
        assert!(adapter.check_prerequisites().await.is_err());
        assert!(CommandAdapter::new("sh").check_prerequisites().await.is_ok());
    }
}

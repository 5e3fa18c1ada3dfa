//! MAvis server adapter.
//!
//! Launches the competition server (`java -jar server.jar`), which in turn
//! starts the search client as a child process and relays its output.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{AdapterError, Invocation, SolverAdapter};
use crate::error::ConfigurationError;
use crate::runner::config::HarnessConfig;

/// Adapter for the Java server + search client pair.
#[derive(Debug, Clone)]
pub struct ServerAdapter {
    java_bin: String,
    server_jar: PathBuf,
    java_xmx: String,
    client_class: String,
    client_dir: PathBuf,
}

impl ServerAdapter {
    /// Creates an adapter from the harness configuration.
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self {
            java_bin: config.java_bin.clone(),
            server_jar: config.server_jar.clone(),
            java_xmx: config.java_xmx.clone(),
            client_class: config.client_class.clone(),
            client_dir: config.client_dir.clone(),
        }
    }

    /// Classpath root for the client: the directory holding the client's
    /// package directory.
    pub fn classpath(&self) -> PathBuf {
        match self.client_dir.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// The command line the server uses to start the client. The server
    /// splits it on whitespace, so the classpath must not contain spaces.
    pub fn client_command(&self, invocation: &Invocation<'_>) -> String {
        format!(
            "{} -Xmx{} -cp {} {} {}",
            self.java_bin,
            self.java_xmx,
            self.classpath().display(),
            self.client_class,
            invocation.strategy.client_flag()
        )
    }
}

#[async_trait]
impl SolverAdapter for ServerAdapter {
    fn describe(&self) -> String {
        format!(
            "{} -jar {} (client {}, Xmx {})",
            self.java_bin,
            self.server_jar.display(),
            self.client_class,
            self.java_xmx
        )
    }

    fn command(&self, invocation: &Invocation<'_>) -> Result<Command, AdapterError> {
        let mut cmd = Command::new(&self.java_bin);
        cmd.arg("-jar")
            .arg(&self.server_jar)
            .arg("-l")
            .arg(invocation.instance_path)
            .arg("-c")
            .arg(self.client_command(invocation))
            .arg("-t")
            .arg(invocation.timeout_secs().to_string());

        debug!(
            level = %invocation.instance_path.display(),
            strategy = %invocation.strategy,
            "Built server invocation"
        );

        Ok(cmd)
    }

    async fn check_prerequisites(&self) -> Result<(), ConfigurationError> {
        if !tokio::fs::try_exists(&self.server_jar).await.unwrap_or(false) {
            return Err(ConfigurationError::MissingArtifact {
                path: self.server_jar.clone(),
                hint: "the server jar must be present in the working directory".to_string(),
            });
        }

        if !has_class_files(&self.client_dir).await {
            return Err(ConfigurationError::MissingArtifact {
                path: self.client_dir.clone(),
                hint: "no .class files found; compile first or pass --compile".to_string(),
            });
        }

        Ok(())
    }
}

async fn has_class_files(dir: &Path) -> bool {
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return false;
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        if entry.path().extension() == Some(OsStr::new("class")) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::Strategy;
    use std::time::Duration;
    use tempfile::TempDir;

    fn adapter_in(dir: &Path) -> ServerAdapter {
        let config = HarnessConfig::default()
            .with_server_jar(dir.join("server.jar"))
            .with_client_dir(dir.join("searchclient"));
        ServerAdapter::from_config(&config)
    }

    #[test]
    fn test_command_line() {
        let adapter = ServerAdapter::from_config(&HarnessConfig::default());
        let path = Path::new("levels/MAPF00.lvl");
        let invocation = Invocation {
            instance_path: path,
            strategy: Strategy::Greedy,
            timeout: Duration::from_secs(180),
        };

        let cmd = adapter.command(&invocation).unwrap();
        let std_cmd = cmd.as_std();
        let args: Vec<String> = std_cmd
            .get_args()
            .map(|a| a.to_string_lossy().to_string())
            .collect();

        assert_eq!(std_cmd.get_program(), "java");
        assert_eq!(
            args,
            vec![
                "-jar",
                "server.jar",
                "-l",
                "levels/MAPF00.lvl",
                "-c",
                "java -Xmx4g -cp . searchclient.SearchClient -greedy",
                "-t",
                "180",
            ]
        );
    }

    #[test]
    fn test_client_classpath_is_package_root() {
        let config = HarnessConfig::default().with_client_dir("/opt/mavis/searchclient");
        let adapter = ServerAdapter::from_config(&config);
        let invocation = Invocation {
            instance_path: Path::new("levels/SAD1.lvl"),
            strategy: Strategy::Astar,
            timeout: Duration::from_secs(60),
        };

        assert_eq!(adapter.classpath(), PathBuf::from("/opt/mavis"));
        assert_eq!(
            adapter.client_command(&invocation),
            "java -Xmx4g -cp /opt/mavis searchclient.SearchClient -astar"
        );
    }

    #[tokio::test]
    async fn test_prerequisites_missing_jar() {
        let temp = TempDir::new().unwrap();
        let err = adapter_in(temp.path()).check_prerequisites().await.unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingArtifact { path, .. } if path.ends_with("server.jar")));
    }

    #[tokio::test]
    async fn test_prerequisites_missing_class_files() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("server.jar"), b"jar").unwrap();
        std::fs::create_dir(temp.path().join("searchclient")).unwrap();
        std::fs::write(temp.path().join("searchclient/SearchClient.java"), "class X {}").unwrap();

        let err = adapter_in(temp.path()).check_prerequisites().await.unwrap_err();
        assert!(err.to_string().contains("--compile"));
    }

    #[tokio::test]
    async fn test_prerequisites_satisfied() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("server.jar"), b"jar").unwrap();
        std::fs::create_dir(temp.path().join("searchclient")).unwrap();
        std::fs::write(temp.path().join("searchclient/SearchClient.class"), b"\xca\xfe").unwrap();

        assert!(adapter_in(temp.path()).check_prerequisites().await.is_ok());
    }
}

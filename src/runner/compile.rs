//! Compilation of the search client sources.

use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use super::config::HarnessConfig;
use crate::error::ConfigurationError;

/// Runs `javac` on every `.java` file in the client directory. Class files
/// land next to their sources.
///
/// Returns the number of compiled source files.
pub async fn compile_client(config: &HarnessConfig) -> Result<usize, ConfigurationError> {
    let sources = java_sources(config).await?;
    if sources.is_empty() {
        return Err(ConfigurationError::MissingArtifact {
            path: config.client_dir.clone(),
            hint: "no .java sources to compile".to_string(),
        });
    }

    info!(
        javac = %config.javac_bin,
        files = sources.len(),
        dir = %config.client_dir.display(),
        "Compiling search client"
    );

    let output = Command::new(&config.javac_bin)
        .args(&sources)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| ConfigurationError::Compilation(format!("failed to run {}: {}", config.javac_bin, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(ConfigurationError::Compilation(if stderr.is_empty() {
            format!("{} exited with {}", config.javac_bin, output.status)
        } else {
            stderr
        }));
    }

    debug!(files = sources.len(), "Compilation successful");
    Ok(sources.len())
}

async fn java_sources(config: &HarnessConfig) -> Result<Vec<PathBuf>, ConfigurationError> {
    let mut entries = tokio::fs::read_dir(&config.client_dir).await.map_err(|_| {
        ConfigurationError::MissingArtifact {
            path: config.client_dir.clone(),
            hint: "search client directory does not exist".to_string(),
        }
    })?;

    let mut sources = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension() == Some(OsStr::new("java")) {
            sources.push(path);
        }
    }
    sources.sort();
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn client_dir(files: &[&str]) -> TempDir {
        let temp = TempDir::new().unwrap();
        for name in files {
            fs::write(temp.path().join(name), "class X {}\n").unwrap();
        }
        temp
    }

    #[tokio::test]
    async fn test_sources_sorted_and_filtered() {
        let temp = client_dir(&["State.java", "Action.java", "State.class", "README"]);
        let config = HarnessConfig::new().with_client_dir(temp.path());

        let sources = java_sources(&config).await.unwrap();
        let names: Vec<_> = sources
            .iter()
            .filter_map(|p| p.file_name().and_then(OsStr::to_str))
            .collect();
        assert_eq!(names, vec!["Action.java", "State.java"]);
    }

    #[tokio::test]
    async fn test_no_sources_is_missing_artifact() {
        let temp = client_dir(&["State.class"]);
        let config = HarnessConfig::new().with_client_dir(temp.path());
        assert!(matches!(
            compile_client(&config).await,
            Err(ConfigurationError::MissingArtifact { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_client_dir() {
        let temp = TempDir::new().unwrap();
        let config = HarnessConfig::new().with_client_dir(temp.path().join("searchclient"));
        assert!(matches!(
            compile_client(&config).await,
            Err(ConfigurationError::MissingArtifact { .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_compiler_failure_reports_stderr() {
        let temp = client_dir(&["SearchClient.java"]);
        let mut config = HarnessConfig::new().with_client_dir(temp.path());
        // `false` ignores its arguments and exits 1 without output.
        config.javac_bin = "false".to_string();

        let err = compile_client(&config).await.unwrap_err();
        assert!(matches!(&err, ConfigurationError::Compilation(msg) if msg.contains("false exited")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_compiler_success() {
        let temp = client_dir(&["SearchClient.java", "State.java"]);
        let mut config = HarnessConfig::new().with_client_dir(temp.path());
        config.javac_bin = "true".to_string();

        assert_eq!(compile_client(&config).await.unwrap(), 2);
    }
}

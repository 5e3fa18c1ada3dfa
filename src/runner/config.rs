//! Configuration for benchmark batches.
//!
//! A [`HarnessConfig`] is built from defaults, optionally overlaid with a YAML
//! file and `MAVIS_*` environment variables, and finally with command-line
//! flags. It is passed explicitly to the orchestrator; nothing here is global.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::Strategy;
use crate::error::ConfigurationError;

/// Default per-level timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 180;

/// Extra allowance on top of the timeout for the server to shut down.
pub const DEFAULT_GRACE_SECS: u64 = 10;

/// Configuration for running a batch of levels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Directory containing level files.
    pub levels_dir: PathBuf,
    /// Extension of level files, without the dot.
    pub level_extension: String,
    /// Path to the competition server jar.
    pub server_jar: PathBuf,
    /// Directory holding the search client sources and classes.
    pub client_dir: PathBuf,
    /// Fully qualified main class of the search client.
    pub client_class: String,
    /// Java launcher.
    pub java_bin: String,
    /// Java compiler, used by the compile step.
    pub javac_bin: String,
    /// Maximum heap handed to the client JVM (`-Xmx`).
    pub java_xmx: String,
    /// Strategy used when the task source does not name one.
    pub default_strategy: Strategy,
    /// Per-level time budget.
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// Extra time granted past the budget before the process is killed.
    #[serde(with = "duration_secs")]
    pub grace: Duration,
}

impl HarnessConfig {
    /// Creates a configuration with defaults.
    pub fn new() -> Self {
        Self {
            levels_dir: PathBuf::from("levels"),
            level_extension: "lvl".to_string(),
            server_jar: PathBuf::from("server.jar"),
            client_dir: PathBuf::from("searchclient"),
            client_class: "searchclient.SearchClient".to_string(),
            java_bin: "java".to_string(),
            javac_bin: "javac".to_string(),
            java_xmx: "4g".to_string(),
            default_strategy: Strategy::Bfs,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            grace: Duration::from_secs(DEFAULT_GRACE_SECS),
        }
    }

    /// Loads a configuration from a YAML file. Missing keys keep defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigurationError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Overlays values from environment variables.
    ///
    /// Supported variables:
    /// - `MAVIS_LEVELS_DIR`, `MAVIS_SERVER_JAR`, `MAVIS_CLIENT_DIR`
    /// - `MAVIS_JAVA_XMX`, `MAVIS_JAVA_BIN`
    /// - `MAVIS_TIMEOUT_SECS`, `MAVIS_GRACE_SECS`
    /// - `MAVIS_STRATEGY`
    pub fn apply_env(mut self) -> Result<Self, ConfigurationError> {
        if let Ok(val) = std::env::var("MAVIS_LEVELS_DIR") {
            self.levels_dir = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("MAVIS_SERVER_JAR") {
            self.server_jar = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("MAVIS_CLIENT_DIR") {
            self.client_dir = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("MAVIS_JAVA_XMX") {
            self.java_xmx = val;
        }
        if let Ok(val) = std::env::var("MAVIS_JAVA_BIN") {
            self.java_bin = val;
        }
        if let Ok(val) = std::env::var("MAVIS_TIMEOUT_SECS") {
            self.timeout = Duration::from_secs(parse_env_value(&val, "MAVIS_TIMEOUT_SECS")?);
        }
        if let Ok(val) = std::env::var("MAVIS_GRACE_SECS") {
            self.grace = Duration::from_secs(parse_env_value(&val, "MAVIS_GRACE_SECS")?);
        }
        if let Ok(val) = std::env::var("MAVIS_STRATEGY") {
            self.default_strategy = val.parse()?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.timeout.is_zero() {
            return Err(ConfigurationError::ValidationFailed(
                "timeout must be greater than 0".to_string(),
            ));
        }
        if self.grace.is_zero() {
            return Err(ConfigurationError::ValidationFailed(
                "grace margin must be greater than 0".to_string(),
            ));
        }
        if self.level_extension.is_empty() || self.level_extension.starts_with('.') {
            return Err(ConfigurationError::ValidationFailed(format!(
                "level_extension must be a bare extension, got '{}'",
                self.level_extension
            )));
        }
        Ok(())
    }

    /// Hard deadline after which a run is killed.
    pub fn deadline(&self) -> Duration {
        self.timeout + self.grace
    }

    /// Sets the levels directory.
    pub fn with_levels_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.levels_dir = dir.into();
        self
    }

    /// Sets the server jar path.
    pub fn with_server_jar(mut self, path: impl Into<PathBuf>) -> Self {
        self.server_jar = path.into();
        self
    }

    /// Sets the client directory.
    pub fn with_client_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.client_dir = dir.into();
        self
    }

    /// Sets the default strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.default_strategy = strategy;
        self
    }

    /// Sets the per-level timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the grace margin.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Sets the client JVM heap size.
    pub fn with_java_xmx(mut self, xmx: impl Into<String>) -> Self {
        self.java_xmx = xmx.into();
        self
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_env_value<T: std::str::FromStr>(val: &str, key: &str) -> Result<T, ConfigurationError>
where
    T::Err: std::fmt::Display,
{
    val.trim().parse().map_err(|e: T::Err| ConfigurationError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}

/// Durations are written as (possibly fractional) seconds in config files.
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::default();
        assert_eq!(config.levels_dir, PathBuf::from("levels"));
        assert_eq!(config.timeout, Duration::from_secs(180));
        assert_eq!(config.deadline(), Duration::from_secs(190));
        assert_eq!(config.default_strategy, Strategy::Bfs);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = HarnessConfig::new()
            .with_levels_dir("custom")
            .with_strategy(Strategy::Greedy)
            .with_timeout(Duration::from_secs(300))
            .with_grace(Duration::from_secs(5))
            .with_java_xmx("8g");

        assert_eq!(config.levels_dir, PathBuf::from("custom"));
        assert_eq!(config.default_strategy, Strategy::Greedy);
        assert_eq!(config.deadline(), Duration::from_secs(305));
        assert_eq!(config.java_xmx, "8g");
    }

    #[test]
    fn test_zero_grace_rejected() {
        let config = HarnessConfig::new().with_grace(Duration::ZERO);
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::ValidationFailed(msg)) if msg.contains("grace")
        ));
    }

    #[test]
    fn test_dotted_extension_rejected() {
        let mut config = HarnessConfig::new();
        config.level_extension = ".lvl".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_yaml_file_partial() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("harness.yaml");
        std::fs::write(
            &path,
            "levels_dir: comp_levels\ntimeout: 300\ngrace: 2.5\ndefault_strategy: astar\n",
        )
        .unwrap();

        let config = HarnessConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.levels_dir, PathBuf::from("comp_levels"));
        assert_eq!(config.timeout, Duration::from_secs(300));
        assert_eq!(config.grace, Duration::from_millis(2500));
        assert_eq!(config.default_strategy, Strategy::Astar);
        assert_eq!(config.server_jar, PathBuf::from("server.jar"));
    }

    #[test]
    fn test_from_yaml_file_invalid_strategy() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("harness.yaml");
        std::fs::write(&path, "default_strategy: idastar\n").unwrap();

        assert!(matches!(
            HarnessConfig::from_yaml_file(&path),
            Err(ConfigurationError::Yaml(_))
        ));
    }

    #[test]
    fn test_parse_env_value() {
        let secs: u64 = parse_env_value(" 42 ", "MAVIS_TIMEOUT_SECS").unwrap();
        assert_eq!(secs, 42);

        let err = parse_env_value::<u64>("abc", "MAVIS_TIMEOUT_SECS").unwrap_err();
        assert!(err.to_string().contains("MAVIS_TIMEOUT_SECS"));
    }
}

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

/// Server configuration.
///
/// Loaded from built-in defaults, then an optional YAML file, then
/// environment overrides.
///
/// ```yaml
/// server:
///   listen_addr: "localhost:8000"
///   idle_timeout_secs: 60
/// static_files:
///   root: "htdocs"
/// logging:
///   level: "info"
///   access_log: "log.txt"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub static_files: StaticFilesConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub idle_timeout_secs: u64,
    pub backlog: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    pub root: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "localhost:8000".to_string(),
            idle_timeout_secs: 60,
            backlog: 128,
        }
    }
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("htdocs"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            access_log: PathBuf::from("log.txt"),
        }
    }
}

impl Config {
    /// Loads the configuration for the running process.
    ///
    /// `path` (or the `CONFIG` variable when `path` is `None`) names an
    /// optional YAML file. `LISTEN`, `DOCUMENT_ROOT`, `ACCESS_LOG`,
    /// `IDLE_TIMEOUT` and `LOG_LEVEL` override individual fields.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let file = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("CONFIG").map(PathBuf::from));

        let mut cfg = match file {
            Some(p) => Self::from_file(&p)?,
            None => Self::default(),
        };

        cfg.apply_overrides(|key| std::env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Applies overrides from a variable lookup (the process environment in
    /// production).
    pub fn apply_overrides<F>(&mut self, var: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = var("LISTEN") {
            self.server.listen_addr = v;
        }
        if let Some(v) = var("DOCUMENT_ROOT") {
            self.static_files.root = PathBuf::from(v);
        }
        if let Some(v) = var("ACCESS_LOG") {
            self.logging.access_log = PathBuf::from(v);
        }
        if let Some(v) = var("IDLE_TIMEOUT") {
            self.server.idle_timeout_secs = v
                .parse()
                .with_context(|| format!("IDLE_TIMEOUT must be whole seconds, got {:?}", v))?;
        }
        if let Some(v) = var("LOG_LEVEL") {
            self.logging.level = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.backlog < 1 {
            anyhow::bail!("server.backlog must be at least 1");
        }
        if self.server.idle_timeout_secs == 0 {
            anyhow::bail!("server.idle_timeout_secs must be at least 1");
        }
        self.log_level()?;
        Ok(())
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.server.idle_timeout_secs)
    }

    pub fn log_level(&self) -> anyhow::Result<tracing::Level> {
        self.logging
            .level
            .parse()
            .map_err(|_| anyhow::anyhow!("Unknown log level {:?}", self.logging.level))
    }
}

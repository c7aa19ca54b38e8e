//! Editor configuration and the file-backed loader.

use serde::{Deserialize, Serialize};

use std::future::Future;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, ScribeError};

/// Quiet period before a burst of edits is committed to history.
pub const DEFAULT_HISTORY_DEBOUNCE_MS: u64 = 900;
/// How long the undo/redo guard stays up after a programmatic write.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 100;
/// Maximum number of snapshots kept in the undo history.
pub const DEFAULT_MAX_HISTORY: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Debounce window for history capture, in milliseconds.
    pub history_debounce_ms: u64,
    /// Settle delay after undo/redo, in milliseconds.
    pub settle_delay_ms: u64,
    /// Bound on the undo history.
    pub max_history: usize,
    /// Default log filter, overridden by `RUST_LOG`.
    pub log_level: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_debounce_ms: DEFAULT_HISTORY_DEBOUNCE_MS,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            max_history: DEFAULT_MAX_HISTORY,
            log_level: "info".to_owned(),
        }
    }
}

impl EditorConfig {
    pub fn history_debounce(&self) -> Duration {
        Duration::from_millis(self.history_debounce_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Loads the configuration from the provided loader.
    pub async fn load(loader: &impl Loader) -> Result<Self> {
        let config = loader.load().await?;
        config.validate()?;
        Ok(config)
    }

    /// Saves the configuration using the provided saver.
    pub async fn save(&self, saver: &impl Saver) -> Result<()> {
        saver.save(self).await
    }

    /// Apply `SCRIBE_*` environment overrides on top of this config.
    ///
    /// - `SCRIBE_HISTORY_DEBOUNCE_MS`
    /// - `SCRIBE_SETTLE_DELAY_MS`
    /// - `SCRIBE_MAX_HISTORY`
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(raw) = lookup("SCRIBE_HISTORY_DEBOUNCE_MS") {
            self.history_debounce_ms = parse_var("SCRIBE_HISTORY_DEBOUNCE_MS", &raw)?;
        }
        if let Some(raw) = lookup("SCRIBE_SETTLE_DELAY_MS") {
            self.settle_delay_ms = parse_var("SCRIBE_SETTLE_DELAY_MS", &raw)?;
        }
        if let Some(raw) = lookup("SCRIBE_MAX_HISTORY") {
            self.max_history = parse_var("SCRIBE_MAX_HISTORY", &raw)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_history == 0 {
            return Err(ScribeError::InvalidConfig(
                "max_history must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| ScribeError::InvalidConfig(format!("{key}={raw:?} is not a valid number")))
}

/// The trait for loading configuration data.
pub trait Loader {
    /// Loads the configuration data.
    fn load(&self) -> impl Future<Output = Result<EditorConfig>> + Send;
}

/// The trait for saving configuration data.
pub trait Saver {
    /// Saves the configuration data.
    fn save(&self, config: &EditorConfig) -> impl Future<Output = Result<()>> + Send;
}

/// An implementation of [`Loader`] and [`Saver`] that reads and writes a configuration file.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a new [`FileStore`] with the given path.
    ///
    /// [`EditorConfig`] data will be serialized and deserialized using the file extension.
    /// Supports `.json` and `.toml` files.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|ext| ext.to_str())
    }
}

impl Loader for FileStore {
    async fn load(&self) -> Result<EditorConfig> {
        match self.extension() {
            Some("json") => Ok(serde_json::from_str(&std::fs::read_to_string(&self.path)?)?),
            Some("toml") => Ok(toml::from_str(&std::fs::read_to_string(&self.path)?)?),
            other => Err(ScribeError::UnsupportedFormat(
                other.unwrap_or_default().to_owned(),
            )),
        }
    }
}

impl Saver for FileStore {
    async fn save(&self, config: &EditorConfig) -> Result<()> {
        match self.extension() {
            Some("json") => Ok(std::fs::write(
                &self.path,
                serde_json::to_string_pretty(config)?,
            )?),
            Some("toml") => Ok(std::fs::write(&self.path, toml::to_string_pretty(config)?)?),
            other => Err(ScribeError::UnsupportedFormat(
                other.unwrap_or_default().to_owned(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.history_debounce(), Duration::from_millis(900));
        assert_eq!(config.settle_delay(), Duration::from_millis(100));
        assert_eq!(config.max_history, 200);
    }

    #[tokio::test]
    async fn test_toml_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("scribe.toml"));

        let config = EditorConfig {
            history_debounce_ms: 500,
            ..Default::default()
        };
        config.save(&store).await.unwrap();

        let loaded = EditorConfig::load(&store).await.unwrap();
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn test_partial_json_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scribe.json");
        std::fs::write(&path, r#"{ "max_history": 50 }"#).unwrap();

        let loaded = EditorConfig::load(&FileStore::new(&path)).await.unwrap();
        assert_eq!(loaded.max_history, 50);
        assert_eq!(loaded.history_debounce_ms, DEFAULT_HISTORY_DEBOUNCE_MS);
    }

    #[tokio::test]
    async fn test_unsupported_extension() {
        let store = FileStore::new("scribe.yaml");
        let err = EditorConfig::load(&store).await.unwrap_err();
        assert!(matches!(err, ScribeError::UnsupportedFormat(ext) if ext == "yaml"));
    }

    #[tokio::test]
    async fn test_zero_history_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scribe.json");
        std::fs::write(&path, r#"{ "max_history": 0 }"#).unwrap();

        let err = EditorConfig::load(&FileStore::new(&path)).await.unwrap_err();
        assert!(matches!(err, ScribeError::InvalidConfig(_)));
    }

    #[test]
    fn test_overrides() {
        let config = EditorConfig::default()
            .with_overrides(|key| match key {
                "SCRIBE_SETTLE_DELAY_MS" => Some("250".to_owned()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.settle_delay_ms, 250);
        assert_eq!(config.history_debounce_ms, DEFAULT_HISTORY_DEBOUNCE_MS);

        let err = EditorConfig::default()
            .with_overrides(|key| (key == "SCRIBE_MAX_HISTORY").then(|| "lots".to_owned()))
            .unwrap_err();
        assert!(matches!(err, ScribeError::InvalidConfig(_)));
    }
}

//! Configuration for linepipe.
//!
//! Configuration is loaded from `~/.config/linepipe/config.toml` (or the
//! platform equivalent). Every key is optional.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::lexer::DEFAULT_SEPARATOR;
use crate::scheduler::PIPE_BUFFER_SIZE;

/// Pipeline settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Bytes buffered in each link between two stages.
    pub pipe_capacity: usize,

    /// Separator between stage descriptors on the command line.
    pub separator: String,

    /// Whole-run deadline in milliseconds. Unset means no deadline.
    pub timeout_ms: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pipe_capacity: PIPE_BUFFER_SIZE,
            separator: DEFAULT_SEPARATOR.to_string(),
            timeout_ms: None,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, returns default configuration.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Get the default config file path.
    pub fn config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "linepipe")
            .context("Could not determine config directory")?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Link capacity, never below one byte.
    pub fn capacity(&self) -> usize {
        self.pipe_capacity.max(1)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn separator(&self) -> &str {
        if self.separator.is_empty() {
            DEFAULT_SEPARATOR
        } else {
            &self.separator
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.pipe_capacity, 65_536);
        assert_eq!(config.separator(), "|");
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
pipe_capacity = 4096
separator = ";"
timeout_ms = 1500
"#;

        let config: PipelineConfig = toml::from_str(toml).expect("parse failed");
        assert_eq!(config.capacity(), 4096);
        assert_eq!(config.separator(), ";");
        assert_eq!(config.timeout(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: PipelineConfig = toml::from_str("").expect("parse failed");
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let config: PipelineConfig = toml::from_str("pipe_capacity = 0").expect("parse failed");
        assert_eq!(config.capacity(), 1);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "separator = \"->\"\n").unwrap();

        let config = PipelineConfig::load_from(&path).unwrap();
        assert_eq!(config.separator(), "->");
        assert_eq!(config.pipe_capacity, PIPE_BUFFER_SIZE);
    }

    #[test]
    fn test_load_from_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "pipe_capacity = \"lots\"\n").unwrap();

        let err = PipelineConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }
}

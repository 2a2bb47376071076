//! Application-level runtime configuration — log level, screen resolution, and
//! backend selection. Distinct from [`crate::template::Template`] (the zone layout),
//! matching the §6 boundary between "core config" and the external template loader.
//!
//! Grounded directly on the teacher's `Config::load_or_default`/`save` pair: JSON via
//! `serde_json`, a `directories::ProjectDirs`-derived default path, and per-section
//! `Default` impls.

use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::backend::BackendKind;

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub display: DisplayConfig,
    pub backend: BackendConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from `custom_path`, or the platform default path if none is
    /// given, creating a default config file on first run.
    pub fn load_or_default(custom_path: Option<&String>) -> Result<Self> {
        let config_path = match custom_path {
            Some(path) => PathBuf::from(path),
            None => Self::default_config_path()?,
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = Self::default();
            default_config.save(&config_path)?;
            Ok(default_config)
        }
    }

    /// Save configuration to `path`, creating its parent directory if needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    fn default_config_path() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("", "", "signage-engine")
            .ok_or_else(|| anyhow::anyhow!("unable to determine config directory"))?;

        Ok(project_dirs.config_dir().join("config.json"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            display: DisplayConfig::default(),
            backend: BackendConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Screen geometry used to convert zone percentages into pixel rectangles (§4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub screen_width: u32,
    pub screen_height: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            screen_width: 1920,
            screen_height: 1080,
        }
    }
}

/// Which [`PlaybackBackend`](crate::backend::PlaybackBackend) implementation to use,
/// and its tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub kind: BackendKindConfig,
    pub player_command: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKindConfig::Embedded,
            player_command: None,
        }
    }
}

/// Serializable mirror of [`BackendKind`] (which intentionally carries no `serde`
/// derive of its own — it is an internal engine type, not a config wire format).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKindConfig {
    Embedded,
    Subprocess,
}

impl From<BackendKindConfig> for BackendKind {
    fn from(kind: BackendKindConfig) -> Self {
        match kind {
            BackendKindConfig::Embedded => BackendKind::Embedded,
            BackendKindConfig::Subprocess => BackendKind::Subprocess,
        }
    }
}

/// Structured logging configuration, consumed by `main` when building the
/// `tracing-subscriber` filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.display.screen_width, 1920);
        assert_eq!(config.display.screen_height, 1080);
        assert_eq!(config.backend.kind, BackendKindConfig::Embedded);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_serialization_round_trips() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).expect("failed to serialize config");
        let deserialized: Config = serde_json::from_str(&json).expect("failed to deserialize config");

        assert_eq!(config.display.screen_width, deserialized.display.screen_width);
        assert_eq!(config.backend.kind, deserialized.backend.kind);
    }

    #[test]
    fn test_config_save_then_load() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let config_path = temp_dir.path().join("test-config.json");

        let mut original_config = Config::default();
        original_config.display.screen_width = 3840;
        original_config.save(&config_path).expect("failed to save config");

        assert!(config_path.exists());

        let loaded_config = Config::load_or_default(Some(&config_path.display().to_string()))
            .expect("failed to load saved config");

        assert_eq!(original_config.display.screen_width, loaded_config.display.screen_width);
    }

    #[test]
    fn test_load_or_default_creates_file_when_missing() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let config_path = temp_dir.path().join("missing/config.json");

        let loaded = Config::load_or_default(Some(&config_path.display().to_string()))
            .expect("failed to create default config");

        assert!(config_path.exists());
        assert_eq!(loaded.display.screen_width, Config::default().display.screen_width);
    }
}

//! Settings for the `prodyn` binary.
//!
//! Read from `$XDG_CONFIG_HOME/prodyn/config.toml` (or the platform config
//! dir), then overridden by `PRODYN_LOG` and `PRODYN_EMPTY_IS_NOT_FOUND`.
//! `PRODYN_DB` is bound to `--db` by the CLI. Command-line flags win over
//! both.
//!
//! # Example
//!
//! ```toml
//! db_path = "/var/lib/prodyn/production.db"
//! log_level = "info"
//! default_bucket = "quarter"
//! empty_is_not_found = false
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dynamics::BucketSize;

pub const ENV_LOG: &str = "PRODYN_LOG";
pub const ENV_EMPTY_IS_NOT_FOUND: &str = "PRODYN_EMPTY_IS_NOT_FOUND";

const APP_DIR: &str = "prodyn";
const CONFIG_FILE: &str = "config.toml";
const DB_FILE: &str = "production.db";

/// Errors that can occur when loading or saving settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// SQLite database; `None` means `<data dir>/prodyn/production.db`.
    pub db_path: Option<PathBuf>,
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_level: String,
    pub default_bucket: BucketSize,
    /// Report a request that matched nothing as not-found instead of an
    /// empty result.
    pub empty_is_not_found: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: "warn".into(),
            default_bucket: BucketSize::default(),
            empty_is_not_found: false,
        }
    }
}

impl Settings {
    /// Load from the default location and apply environment overrides.
    ///
    /// A missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Self::load_from(&Self::config_path()?)?;
        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Load from a specific path without environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// `$XDG_CONFIG_HOME/prodyn/config.toml`, falling back to the platform
    /// config dir.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            return Ok(PathBuf::from(xdg_config).join(APP_DIR).join(CONFIG_FILE));
        }
        dirs::config_dir()
            .map(|p| p.join(APP_DIR).join(CONFIG_FILE))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Apply `PRODYN_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup(ENV_LOG).filter(|v| !v.trim().is_empty()) {
            self.log_level = level;
        }
        if let Some(raw) = lookup(ENV_EMPTY_IS_NOT_FOUND) {
            self.empty_is_not_found = parse_flag(ENV_EMPTY_IS_NOT_FOUND, &raw)?;
        }
        Ok(())
    }

    /// Database path with the default filled in.
    pub fn resolved_db_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.db_path {
            return Ok(path.clone());
        }
        dirs::data_dir()
            .map(|p| p.join(APP_DIR).join(DB_FILE))
            .ok_or(ConfigError::NoConfigDir)
    }
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::Invalid {
            key,
            message: format!("expected a boolean, got '{other}'"),
        }),
    }
}

// =============================================================================
// CONFIGURATION - Load settings from bootstrap.toml
// =============================================================================
//
// Settings for the demo shell only; the bootstrap core takes none.
// Provides sensible defaults if the file is missing or has errors.

use anyhow::{Context, Result};
use log::LevelFilter;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "bootstrap.toml";

/// Root configuration structure
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub logging: LoggingConfig,
}

/// Window settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "gfx-bootstrap".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Logging settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub log_to_file: bool,
    pub log_file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_to_file: false,
            log_file: "gfx_bootstrap.log".to_string(),
        }
    }
}

/// Where `Config::load` got its settings from. Loading happens before the
/// logger exists, so this is reported afterwards through `log`.
#[derive(Debug)]
pub enum ConfigSource {
    File(PathBuf),
    Missing(PathBuf),
    /// Unreadable or malformed; defaults were used.
    Invalid(anyhow::Error),
}

impl ConfigSource {
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => log::info!("Loaded configuration from {:?}", path),
            ConfigSource::Missing(path) => {
                log::info!("Config file not found at {:?}, using defaults", path)
            }
            ConfigSource::Invalid(e) => log::warn!("{:#}. Using defaults.", e),
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults if not found
    pub fn load() -> (Self, ConfigSource) {
        Self::load_from_path(CONFIG_FILE)
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> (Self, ConfigSource) {
        let path = path.as_ref();

        if !path.exists() {
            return (Config::default(), ConfigSource::Missing(path.to_path_buf()));
        }

        match Self::read(path) {
            Ok(config) => (config, ConfigSource::File(path.to_path_buf())),
            Err(e) => (Config::default(), ConfigSource::Invalid(e)),
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::parse(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Log level as a filter; unknown names fall back to `Info`.
    pub fn level_filter(&self) -> LevelFilter {
        self.logging.level.parse().unwrap_or_else(|_| {
            eprintln!("Unknown log level '{}', defaulting to info", self.logging.level);
            LevelFilter::Info
        })
    }
}

//! # Terminal Configuration
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`SARI_*`)
//! 2. Config file (`sari.toml`, or `--config PATH`)
//! 3. Defaults (this file)
//!
//! ```toml
//! [database]
//! path = "/var/lib/sari/sari.db"
//! max_connections = 5
//!
//! [store]
//! name = "Aling Nena's Store"
//! utc_offset_minutes = 480
//!
//! [checkout]
//! allow_oversell = true
//! low_stock_warning = 5
//!
//! [history]
//! page_size = 5
//!
//! [logging]
//! filter = "info,sari=debug,sqlx=warn"
//! ```
//!
//! Configuration is read once at startup and never changes afterwards.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

use sari_core::history::DEFAULT_PAGE_SIZE;
use sari_core::LOW_STOCK_WARNING_LEVEL;

pub const CONFIG_FILE_NAME: &str = "sari.toml";
pub const DEFAULT_LOG_FILTER: &str = "info,sari=debug,sqlx=warn";

/// Philippine Standard Time (UTC+8).
const DEFAULT_UTC_OFFSET_MINUTES: i32 = 480;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Could not determine the app data directory")]
    NoDataDir,
}

/// Terminal configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseSection,
    pub store: StoreSection,
    pub checkout: CheckoutSection,
    pub history: HistorySection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// Database file. Defaults to `sari.db` in the platform data directory.
    pub path: Option<PathBuf>,
    pub max_connections: u32,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        DatabaseSection {
            path: None,
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Store name (printed on receipts)
    pub name: String,
    /// Minutes east of UTC for day, month and year boundaries.
    pub utc_offset_minutes: i32,
}

impl Default for StoreSection {
    fn default() -> Self {
        StoreSection {
            name: "Sari-Sari Store".to_string(),
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckoutSection {
    /// Let stock go negative (reported as oversold) instead of failing a sale.
    pub allow_oversell: bool,
    /// Stock level at which adding to a cart warns "restock soon".
    pub low_stock_warning: i64,
}

impl Default for CheckoutSection {
    fn default() -> Self {
        CheckoutSection {
            allow_oversell: true,
            low_stock_warning: LOW_STOCK_WARNING_LEVEL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySection {
    pub page_size: usize,
}

impl Default for HistorySection {
    fn default() -> Self {
        HistorySection {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// `EnvFilter` directive; `RUST_LOG` still wins when set.
    pub filter: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        LoggingSection {
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl AppConfig {
    /// Loads configuration: defaults, then the TOML file, then `SARI_*`.
    ///
    /// With `path = None` the platform config directory is searched; a
    /// missing file there is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => AppConfig::default(),
            },
        };

        config.apply_env(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn from_toml(raw: &str) -> Result<Self, String> {
        toml::from_str(raw).map_err(|e| e.to_string())
    }

    /// Applies `SARI_DB_PATH`, `SARI_UTC_OFFSET_MINUTES`, `SARI_ALLOW_OVERSELL`
    /// and `SARI_LOG`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(path) = var("SARI_DB_PATH") {
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(offset) = var("SARI_UTC_OFFSET_MINUTES") {
            self.store.utc_offset_minutes = offset
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue("SARI_UTC_OFFSET_MINUTES".to_string()))?;
        }

        if let Some(flag) = var("SARI_ALLOW_OVERSELL") {
            self.checkout.allow_oversell = match flag.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => return Err(ConfigError::InvalidValue("SARI_ALLOW_OVERSELL".to_string())),
            };
        }

        if let Some(filter) = var("SARI_LOG") {
            self.logging.filter = filter;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(-14 * 60..=14 * 60).contains(&self.store.utc_offset_minutes) {
            return Err(ConfigError::InvalidValue("store.utc_offset_minutes".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue("database.max_connections".to_string()));
        }
        if self.history.page_size == 0 {
            return Err(ConfigError::InvalidValue("history.page_size".to_string()));
        }
        if self.checkout.low_stock_warning < 0 {
            return Err(ConfigError::InvalidValue("checkout.low_stock_warning".to_string()));
        }
        Ok(())
    }

    /// Configured database path, or `sari.db` in the platform data directory.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }

        let dirs = project_dirs().ok_or(ConfigError::NoDataDir)?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir).map_err(|source| ConfigError::Read {
            path: data_dir.to_path_buf(),
            source,
        })?;
        Ok(data_dir.join("sari.db"))
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("ph", "sari", "pos")
}

/// `sari.toml` in the platform config directory.
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

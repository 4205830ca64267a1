//! # Server Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TALLY_PORT=8080                                                    │
//! │     TALLY_TIMEZONE=Asia/Kolkata                                        │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     --config <path>, or                                                │
//! │     ~/.config/tally-pos/tally.toml (Linux)                             │
//! │     ~/Library/Application Support/com.tally.pos/tally.toml (macOS)     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [server]
//! bind_addr = "0.0.0.0"
//! port = 5000
//!
//! [database]
//! path = "tally.db"
//!
//! [business]
//! timezone = "Asia/Kolkata"
//! cutover = "23:00"
//!
//! [reports]
//! scheduler_enabled = true
//! catch_up_days = 7
//! history_limit = 90
//! ```

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

use tally_core::{DEFAULT_CUTOVER_HOUR, DEFAULT_TIMEZONE};

/// Upper bound for `reports.catch_up_days`.
pub const MAX_CATCH_UP_DAYS: u32 = 366;

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Unknown timezone '{0}'")]
    Timezone(String),

    #[error("Cutover '{0}' is not HH:MM")]
    Cutover(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// =============================================================================
// Sections
// =============================================================================

/// Where the HTTP API listens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            bind_addr: default_bind_addr(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    /// `bind_addr:port`, ready for `TcpListener::bind`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file; created on first start.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("tally.db")
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
        }
    }
}

/// The single business timezone and the daily close-out time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessSettings {
    /// IANA zone name. Every sale is stamped in this zone.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Local wall-clock time of the daily close-out, `HH:MM`.
    #[serde(default = "default_cutover")]
    pub cutover: String,
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

fn default_cutover() -> String {
    format!("{DEFAULT_CUTOVER_HOUR:02}:00")
}

impl Default for BusinessSettings {
    fn default() -> Self {
        BusinessSettings {
            timezone: default_timezone(),
            cutover: default_cutover(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSettings {
    /// Turn off to run the API without the nightly close-out.
    #[serde(default = "default_true")]
    pub scheduler_enabled: bool,

    /// Closed days checked for missing reports at startup.
    #[serde(default = "default_catch_up_days")]
    pub catch_up_days: u32,

    /// Default page size of `GET /api/reports`.
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,
}

fn default_true() -> bool {
    true
}

fn default_catch_up_days() -> u32 {
    7
}

fn default_history_limit() -> u32 {
    90
}

impl Default for ReportSettings {
    fn default() -> Self {
        ReportSettings {
            scheduler_enabled: true,
            catch_up_days: default_catch_up_days(),
            history_limit: default_history_limit(),
        }
    }
}

// =============================================================================
// Root Config
// =============================================================================

/// Everything the server needs to start.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TallyConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub business: BusinessSettings,

    #[serde(default)]
    pub reports: ReportSettings,
}

impl TallyConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`tally.toml`)
    /// 3. `TALLY_*` environment variables
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path).map_err(|source| {
                    ConfigError::Read {
                        path: path.clone(),
                        source,
                    }
                })?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Applies `TALLY_*` overrides read through `lookup`.
    ///
    /// Values that fail to parse are ignored with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("TALLY_BIND_ADDR") {
            self.server.bind_addr = addr;
        }

        if let Some(port) = lookup("TALLY_PORT") {
            match port.parse::<u16>() {
                Ok(p) => {
                    debug!(port = p, "Overriding port from environment");
                    self.server.port = p;
                }
                Err(_) => warn!(value = %port, "Ignoring invalid TALLY_PORT"),
            }
        }

        if let Some(path) = lookup("TALLY_DB_PATH") {
            self.database.path = PathBuf::from(path);
        }

        if let Some(tz) = lookup("TALLY_TIMEZONE") {
            debug!(timezone = %tz, "Overriding timezone from environment");
            self.business.timezone = tz;
        }

        if let Some(cutover) = lookup("TALLY_CUTOVER") {
            self.business.cutover = cutover;
        }

        if let Some(days) = lookup("TALLY_CATCH_UP_DAYS") {
            match days.parse::<u32>() {
                Ok(d) => self.reports.catch_up_days = d,
                Err(_) => warn!(value = %days, "Ignoring invalid TALLY_CATCH_UP_DAYS"),
            }
        }

        if let Some(enabled) = lookup("TALLY_SCHEDULER_ENABLED") {
            match enabled.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.reports.scheduler_enabled = true,
                "0" | "false" | "no" | "off" => self.reports.scheduler_enabled = false,
                _ => warn!(value = %enabled, "Ignoring invalid TALLY_SCHEDULER_ENABLED"),
            }
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timezone()?;
        self.cutover()?;

        if self.reports.history_limit == 0 {
            return Err(ConfigError::Invalid(
                "history_limit must be greater than 0".into(),
            ));
        }

        if self.reports.catch_up_days > MAX_CATCH_UP_DAYS {
            return Err(ConfigError::Invalid(format!(
                "catch_up_days must be at most {MAX_CATCH_UP_DAYS}"
            )));
        }

        Ok(())
    }

    /// The business timezone.
    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.business
            .timezone
            .parse()
            .map_err(|_| ConfigError::Timezone(self.business.timezone.clone()))
    }

    /// The local close-out time.
    pub fn cutover(&self) -> Result<NaiveTime, ConfigError> {
        NaiveTime::parse_from_str(self.business.cutover.trim(), "%H:%M")
            .map_err(|_| ConfigError::Cutover(self.business.cutover.clone()))
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "tally", "pos")
            .map(|dirs| dirs.config_dir().join("tally.toml"))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

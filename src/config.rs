use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Application-level constants
pub const APP_NAME: &str = "PawsCare";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "pawscare_lib=info,pawscare=info,warn"
}

/// Get the application data directory
/// ~/PawsCare/ on all platforms, falling back to the working directory
/// when no home directory can be resolved.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// File backing the persistent session cache (local storage analogue).
pub fn session_cache_path() -> PathBuf {
    app_data_dir().join("session.json")
}

/// Local clinic database (mock dataset / offline mode).
pub fn database_path() -> PathBuf {
    app_data_dir().join("clinic.db")
}

/// Optional JSON configuration file.
pub fn config_path() -> PathBuf {
    app_data_dir().join("config.json")
}

// ═══════════════════════════════════════════════════════════
// Schedule configuration
// ═══════════════════════════════════════════════════════════

/// Errors from loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error reading config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),
}

/// Opening hours and band boundaries used to build the slot catalog.
///
/// Hours are on the 24h clock. Slots run from `opening_hour` (inclusive)
/// to `closing_hour` (exclusive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub opening_hour: u32,
    pub closing_hour: u32,
    pub afternoon_start: u32,
    pub evening_start: u32,
    pub slot_minutes: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            opening_hour: 8,
            closing_hour: 20,
            afternoon_start: 12,
            evening_start: 17,
            slot_minutes: 30,
        }
    }
}

impl ScheduleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.closing_hour > 24 {
            return Err(ConfigError::InvalidSchedule(format!(
                "closing hour {} is past midnight",
                self.closing_hour
            )));
        }
        if self.opening_hour >= self.closing_hour {
            return Err(ConfigError::InvalidSchedule(format!(
                "opening hour {} must be before closing hour {}",
                self.opening_hour, self.closing_hour
            )));
        }
        if self.afternoon_start > self.evening_start {
            return Err(ConfigError::InvalidSchedule(
                "afternoon must start before evening".into(),
            ));
        }
        if self.slot_minutes == 0 || 60 % self.slot_minutes != 0 {
            return Err(ConfigError::InvalidSchedule(format!(
                "slot length {} must divide an hour",
                self.slot_minutes
            )));
        }
        Ok(())
    }
}

/// Top-level configuration for a clinic console instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicConfig {
    pub schedule: ScheduleConfig,
    pub session_cache_path: PathBuf,
    pub database_path: PathBuf,
}

impl Default for ClinicConfig {
    fn default() -> Self {
        Self {
            schedule: ScheduleConfig::default(),
            session_cache_path: session_cache_path(),
            database_path: database_path(),
        }
    }
}

impl ClinicConfig {
    /// Load from a JSON file. A missing file yields the defaults;
    /// a present but malformed file is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str::<Self>(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                Self::default()
            }
            Err(e) => return Err(e.into()),
        };
        config.schedule.validate()?;
        Ok(config)
    }
}

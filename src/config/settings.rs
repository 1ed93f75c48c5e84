//! Configuration settings for the scheduling core.

use crate::error::{ConfigError, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scheduling: SchedulingConfig,
    pub calendar: CalendarSyncConfig,
    pub reconciler: ReconcilerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scheduling: SchedulingConfig::default(),
            calendar: CalendarSyncConfig::default(),
            reconciler: ReconcilerConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::ReadFile)?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations or use defaults.
    pub fn load() -> Result<Self> {
        let config_paths = [
            // Current directory
            PathBuf::from("config.toml"),
            PathBuf::from("rota.toml"),
            // User config directory
            dirs::config_dir()
                .map(|p| p.join("rota/config.toml"))
                .unwrap_or_default(),
            // Home directory
            dirs::home_dir()
                .map(|p| p.join(".rota/config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Config::default())
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<()> {
        if self.scheduling.default_duration_minutes == 0 {
            return Err(
                ConfigError::Invalid("default_duration_minutes must be > 0".to_string()).into(),
            );
        }
        if self.scheduling.working_window_end <= self.scheduling.working_window_start {
            return Err(ConfigError::Invalid(
                "working window must end after it starts".to_string(),
            )
            .into());
        }

        if self.calendar.enabled {
            if self.calendar.calendar_id.is_empty() {
                return Err(ConfigError::MissingField("calendar.calendar_id".to_string()).into());
            }
            if self.calendar.token.is_empty() {
                return Err(ConfigError::MissingField("calendar.token".to_string()).into());
            }
        }

        if self.reconciler.interval_secs == 0 {
            return Err(ConfigError::Invalid("reconciler.interval_secs must be > 0".to_string()).into());
        }

        Ok(())
    }
}

/// Slot generation and conflict checking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingConfig {
    /// Fallback appointment duration when a type's stored duration is absent
    /// or unparsable.
    pub default_duration_minutes: u32,
    /// Default working window start when the caller does not supply one.
    pub working_window_start: NaiveTime,
    /// Default working window end.
    pub working_window_end: NaiveTime,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            default_duration_minutes: 45,
            working_window_start: NaiveTime::from_hms_opt(8, 0, 0).expect("valid time"),
            working_window_end: NaiveTime::from_hms_opt(18, 0, 0).expect("valid time"),
        }
    }
}

/// External calendar synchronization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSyncConfig {
    /// Whether confirmed appointments are mirrored to the external calendar.
    pub enabled: bool,
    /// Target calendar identifier.
    pub calendar_id: String,
    /// Bearer token for the calendar API.
    pub token: String,
    /// Calendar API base URL.
    pub api_base_url: String,
    /// Timezone label attached to event start/end times.
    pub timezone: String,
    /// Timeout in seconds for calendar API requests.
    pub timeout_secs: u64,
}

impl Default for CalendarSyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            calendar_id: String::new(),
            token: String::new(),
            api_base_url: "https://www.googleapis.com/calendar/v3".to_string(),
            timezone: "UTC".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Reconciliation loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Seconds between reconciliation passes.
    pub interval_secs: u64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self { interval_secs: 300 }
    }
}

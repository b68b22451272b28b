//! Configuration for the scheduling core.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingConfig {
    /// How many days ahead recurring windows are expanded.
    pub horizon_days: u32,
    /// Size of the atomic reservable block, in minutes.
    pub block_minutes: u32,
    pub office_hours: OfficeHoursConfig,
    pub storage: StorageConfig,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            horizon_days: 14,
            block_minutes: 30,
            office_hours: OfficeHoursConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl SchedulingConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::ReadFile)?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: SchedulingConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations or use defaults.
    pub fn load() -> Result<Self> {
        let config_paths = [
            // Current directory
            PathBuf::from("convene.toml"),
            PathBuf::from("config.toml"),
            // User config directory
            dirs::config_dir()
                .map(|p| p.join("convene/config.toml"))
                .unwrap_or_default(),
            // Home directory
            dirs::home_dir()
                .map(|p| p.join(".convene/config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.horizon_days == 0 || self.horizon_days > 365 {
            return Err(
                ConfigError::Invalid("horizon_days must be between 1 and 365".to_string()).into(),
            );
        }

        if self.block_minutes == 0 || self.block_minutes > 240 {
            return Err(
                ConfigError::Invalid("block_minutes must be between 1 and 240".to_string()).into(),
            );
        }

        if 1440 % self.block_minutes != 0 {
            return Err(
                ConfigError::Invalid("block_minutes must divide a whole day".to_string()).into(),
            );
        }

        if self.office_hours.open >= self.office_hours.close {
            return Err(ConfigError::Invalid(
                "office_hours.open must be before office_hours.close".to_string(),
            )
            .into());
        }

        Ok(())
    }

    /// Expand the optional persistence directory path.
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.storage
            .data_dir
            .as_ref()
            .map(|dir| PathBuf::from(shellexpand::tilde(dir).as_ref()))
    }
}

/// Bounds within which availability windows and meetings may be scheduled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OfficeHoursConfig {
    /// Earliest acceptable start of a window or meeting.
    pub open: NaiveTime,
    /// Latest acceptable end of a window or meeting.
    pub close: NaiveTime,
    /// Whether weekend availability windows are accepted.
    pub allow_weekends: bool,
}

impl Default for OfficeHoursConfig {
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            close: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
            allow_weekends: false,
        }
    }
}

impl OfficeHoursConfig {
    /// Check whether a span lies fully inside office hours.
    pub fn contains(&self, start: NaiveTime, end: NaiveTime) -> bool {
        start >= self.open && end <= self.close
    }
}

/// Storage configuration for the embedded store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for JSON persistence. None keeps everything in memory.
    pub data_dir: Option<String>,
}

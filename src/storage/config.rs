//! Application configuration.
//!
//! Loaded from `config.toml` in the platform data directory. A missing file
//! yields defaults, which are written back so they can be edited; every
//! section and field may be omitted.

use crate::sensors::types::LinkConfig;
use crate::workouts::types::ClassifierConfig;
use btleplug::api::bleuuid::uuid_from_u16;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application version
    pub version: String,
    /// Data directory path
    #[serde(skip)]
    pub data_dir: PathBuf,
    /// Sensor link settings
    pub sensor: SensorSettings,
    /// Rep/set classification settings
    pub classifier: ClassifierSettings,
    /// Session storage settings
    pub storage: StorageSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            data_dir: PathBuf::new(),
            sensor: SensorSettings::default(),
            classifier: ClassifierSettings::default(),
            storage: StorageSettings::default(),
        }
    }
}

impl AppConfig {
    /// Full path of the session database.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.storage.database_file)
    }
}

/// Sensor link settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorSettings {
    /// 16-bit assigned number of the strain service
    pub service_uuid: u16,
    /// 16-bit assigned number of the strain characteristic
    pub characteristic_uuid: u16,
    /// Start scanning as soon as the app starts
    pub scan_on_start: bool,
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            service_uuid: 0x180A,
            characteristic_uuid: 0x2A57,
            scan_on_start: true,
        }
    }
}

impl SensorSettings {
    /// Expand the short identifiers into full GATT UUIDs.
    pub fn link_config(&self) -> LinkConfig {
        LinkConfig {
            service_uuid: uuid_from_u16(self.service_uuid),
            characteristic_uuid: uuid_from_u16(self.characteristic_uuid),
        }
    }
}

/// Rep/set classification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSettings {
    /// Minimum sample counted as a rep
    pub rep_threshold: u16,
    /// Charted values below this are raised to it
    pub chart_floor: u16,
    /// Synthetic clock advance per sample in milliseconds
    pub sample_interval_ms: u64,
    /// Chart decimation period in milliseconds
    pub decimation_ms: u64,
    /// Minimum spacing between reps in milliseconds
    pub rep_debounce_ms: u64,
    /// Recovery ticker period in milliseconds
    pub recovery_tick_ms: u64,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        let defaults = ClassifierConfig::default();
        Self {
            rep_threshold: defaults.rep_threshold,
            chart_floor: defaults.chart_floor,
            sample_interval_ms: defaults.sample_interval_ms,
            decimation_ms: defaults.decimation_ms,
            rep_debounce_ms: defaults.rep_debounce.as_millis() as u64,
            recovery_tick_ms: defaults.recovery_tick.as_millis() as u64,
        }
    }
}

impl ClassifierSettings {
    /// Build the classifier configuration.
    ///
    /// Zero periods would stall the set clock or spin the timers, so they
    /// fall back to the defaults.
    pub fn classifier_config(&self) -> ClassifierConfig {
        let defaults = ClassifierConfig::default();
        let non_zero = |value: u64, fallback: u64| if value == 0 { fallback } else { value };

        ClassifierConfig {
            rep_threshold: self.rep_threshold,
            chart_floor: self.chart_floor,
            sample_interval_ms: non_zero(self.sample_interval_ms, defaults.sample_interval_ms),
            decimation_ms: non_zero(self.decimation_ms, defaults.decimation_ms),
            rep_debounce: Duration::from_millis(non_zero(
                self.rep_debounce_ms,
                defaults.rep_debounce.as_millis() as u64,
            )),
            recovery_tick: Duration::from_millis(non_zero(
                self.recovery_tick_ms,
                defaults.recovery_tick.as_millis() as u64,
            )),
        }
    }
}

/// Session storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Database file name inside the data directory
    pub database_file: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_file: "sessions.db".to_string(),
        }
    }
}

/// Get the application data directory.
pub fn get_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "strainsense", "StrainSense")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the configuration file path.
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("config.toml")
}

/// Load application configuration from file.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let path = get_config_path();

    if !path.exists() {
        tracing::info!("No config at {:?}, using defaults", path);
        let config = AppConfig {
            data_dir: get_data_dir(),
            ..Default::default()
        };
        if let Err(e) = save_config(&config) {
            tracing::warn!("Failed to write default config: {}", e);
        }
        return Ok(config);
    }

    let mut config = load_config_from(&path)?;
    config.data_dir = get_data_dir();

    Ok(config)
}

/// Load configuration from a specific file.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
    parse_config(&content)
}

/// Parse configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Save application configuration to file.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    save_config_to(config, &get_config_path())
}

/// Save configuration to a specific file, creating parent directories.
pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
    }

    let content =
        toml::to_string_pretty(config).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;
    tracing::debug!("Saved config to {:?}", path);

    Ok(())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}

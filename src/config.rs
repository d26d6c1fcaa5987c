//! Sensor configuration loaded from `$XDG_CONFIG_HOME/lis3-accel/config.toml`
//!
//! Missing files fall back to defaults and a default file is written on first
//! start so the paths can be edited for the board at hand.

use color_eyre::eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::sensor::control::DEFAULT_POLL_INTERVAL_MS;
use crate::sensor::input::DEFAULT_READER_CAPACITY;
use crate::sensor::reading::AxisScale;

const CONFIG_DIR: &str = "lis3-accel";
const CONFIG_FILE: &str = "config.toml";

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SensorConfig {
    /// Event node the accelerometer reports on
    pub device_path: PathBuf,
    /// Device directory holding the `poll` attribute
    pub sysfs_dir: PathBuf,
    /// Period used on enable when no delay was requested
    pub default_delay_ms: i32,
    /// Delay the daemon requests before its first enable
    pub initial_delay_ns: i64,
    /// Raw records buffered per fill
    pub reader_capacity: usize,
    /// Readings requested per `read_events` call by the daemon
    pub read_batch: usize,
    /// Raw count to physical unit conversion, per source axis
    pub scale: AxisScale,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            device_path: PathBuf::from("/dev/input/event0"),
            sysfs_dir: PathBuf::from("/sys/class/input/input0/device"),
            default_delay_ms: DEFAULT_POLL_INTERVAL_MS,
            initial_delay_ns: DEFAULT_POLL_INTERVAL_MS as i64 * 1_000_000,
            reader_capacity: DEFAULT_READER_CAPACITY,
            read_batch: 16,
            scale: AxisScale::default(),
        }
    }
}

impl SensorConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| eyre!("Failed to parse sensor config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_delay_ms <= 0 {
            return Err(eyre!(
                "default_delay_ms must be positive, got {}",
                self.default_delay_ms
            ));
        }
        if self.initial_delay_ns < 0 {
            return Err(eyre!(
                "initial_delay_ns must not be negative, got {}",
                self.initial_delay_ns
            ));
        }
        if self.reader_capacity < 1 {
            return Err(eyre!("reader_capacity must be at least 1"));
        }
        if self.read_batch < 1 {
            return Err(eyre!("read_batch must be at least 1"));
        }
        if !self.scale.is_finite() {
            return Err(eyre!("scale constants must be finite: {:?}", self.scale));
        }
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| {
            warn!("Could not determine config directory, using current directory");
            PathBuf::from(".")
        });
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        path
    }

    /// Write the default configuration if nothing exists at `path` yet.
    pub async fn ensure_default_config(path: &Path) -> Result<()> {
        if tokio::fs::try_exists(path)
            .await
            .map_err(|e| eyre!("Failed to check if config file exists: {}", e))?
        {
            debug!("Config file present at {}", path.display());
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
        }

        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| eyre!("Failed to serialize default config: {}", e))?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| eyre!("Failed to write default config file: {}", e))?;
        info!("Wrote default config to {}", path.display());
        Ok(())
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;
        let config = Self::from_toml(&content)?;
        debug!("Loaded config: {:?}", config);
        Ok(config)
    }
}

//! Acquisition configuration
//!
//! TOML-backed settings for which device to open, what to configure on it,
//! and how the grab loop and recovery should behave. Every field has a
//! default, so a partial file (or none at all) still yields a runnable
//! setup.

use crate::acquire::AcquireOptions;
use crate::driver::CameraDriver;
use crate::reconnect::ReconnectPolicy;
use crate::session::CameraSession;
use crate::types::PixelFormat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

// ==================== Defaults ====================

pub const DEFAULT_EXPOSURE_US: f64 = 5000.0;
pub const DEFAULT_GAIN_DB: f64 = 5.0;
pub const DEFAULT_GRAB_TIMEOUT_MS: u64 = 1000;
pub const DEFAULT_RECONNECT_ATTEMPTS: u32 = 5;
pub const DEFAULT_RECONNECT_BASE_DELAY_MS: u64 = 500;
pub const DEFAULT_STATS_INTERVAL_MS: u64 = 1000;

const APP_DIR: &str = "camgrab";
const CONFIG_FILE: &str = "acquire.toml";

/// Failure while reading or writing a configuration file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config io: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config serialize: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ==================== Camera ====================

/// Which device to open and what to program into it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Enumeration index to open when no serial is given
    pub index: usize,
    /// Open by serial number instead of index
    pub serial: Option<String>,
    pub exposure_us: Option<f64>,
    pub gain_db: Option<f64>,
    pub frame_rate_hz: Option<f64>,
    pub pixel_format: Option<PixelFormat>,
    pub trigger_enabled: bool,
    /// GigE only; skipped for USB devices by the driver
    pub packet_size: Option<i64>,
    pub packet_delay: Option<i64>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            serial: None,
            exposure_us: Some(DEFAULT_EXPOSURE_US),
            gain_db: Some(DEFAULT_GAIN_DB),
            frame_rate_hz: None,
            pixel_format: None,
            trigger_enabled: false,
            packet_size: None,
            packet_delay: None,
        }
    }
}

// ==================== Recovery ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RECONNECT_ATTEMPTS,
            base_delay_ms: DEFAULT_RECONNECT_BASE_DELAY_MS,
        }
    }
}

impl ReconnectConfig {
    pub fn to_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::new(self.max_attempts, Duration::from_millis(self.base_delay_ms))
    }
}

// ==================== Top level ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquireConfig {
    pub camera: CameraConfig,
    pub reconnect: ReconnectConfig,
    pub grab_timeout_ms: u64,
    pub stats_interval_ms: u64,
    /// Stop the demo loop after this long; `None` runs until interrupted
    pub run_seconds: Option<u64>,
}

impl Default for AcquireConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            reconnect: ReconnectConfig::default(),
            grab_timeout_ms: DEFAULT_GRAB_TIMEOUT_MS,
            stats_interval_ms: DEFAULT_STATS_INTERVAL_MS,
            run_seconds: None,
        }
    }
}

impl AcquireConfig {
    /// Platform config location, e.g. `~/.config/camgrab/acquire.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs_next::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Load from the default location, falling back to defaults on any
    /// problem (missing file, unreadable, malformed)
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => {
                debug!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Could not load {}: {}, using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn to_options(&self) -> AcquireOptions {
        AcquireOptions {
            grab_timeout: Duration::from_millis(self.grab_timeout_ms),
            reconnect: self.reconnect.to_policy(),
            stats_interval: Duration::from_millis(self.stats_interval_ms),
            max_frames: None,
        }
    }

    /// Program every configured value into an open session
    ///
    /// Refusals are logged and skipped, matching how replay treats them; the
    /// session's store ends up holding exactly what the device accepted.
    pub fn apply_to<D: CameraDriver>(&self, session: &mut CameraSession<D>) {
        let camera = &self.camera;
        if let Some(v) = camera.exposure_us {
            if let Err(e) = session.set_exposure_time(v) {
                warn!("Configured exposure time rejected: {}", e);
            }
        }
        if let Some(v) = camera.gain_db {
            if let Err(e) = session.set_gain(v) {
                warn!("Configured gain rejected: {}", e);
            }
        }
        if let Some(v) = camera.frame_rate_hz {
            if let Err(e) = session.set_frame_rate(v) {
                warn!("Configured frame rate rejected: {}", e);
            }
        }
        if let Some(v) = camera.pixel_format {
            if let Err(e) = session.set_pixel_format(v) {
                warn!("Configured pixel format rejected: {}", e);
            }
        }
        if let Err(e) = session.set_trigger_mode(camera.trigger_enabled) {
            warn!("Configured trigger mode rejected: {}", e);
        }
        if let Some(v) = camera.packet_size {
            if let Err(e) = session.set_packet_size(v) {
                warn!("Configured packet size rejected: {}", e);
            }
        }
        if let Some(v) = camera.packet_delay {
            if let Err(e) = session.set_packet_delay(v) {
                warn!("Configured packet delay rejected: {}", e);
            }
        }
    }
}

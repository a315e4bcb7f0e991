//! Configuration file loading and merging
//!
//! Loads user configuration from `~/.config/framepress/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{FramepressError, Result};

use super::{Codec, PipelineConfig, RateControl};

/// Configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Default settings
    #[serde(default)]
    pub defaults: DefaultSettings,

    /// I/O strategy settings
    #[serde(default)]
    pub io: IoSettings,

    /// Device paths
    #[serde(default)]
    pub devices: DeviceSettings,
}

/// Default pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultSettings {
    /// Nominal frame rate
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Output codec (h264, vp8, vp9)
    #[serde(default = "default_codec")]
    pub codec: String,

    /// Rate-control mode (auto, qp, crf, vbr, cbr)
    #[serde(default = "default_rc_mode")]
    pub rate_control: String,

    /// Rate-control value: quantizer for qp, rate factor for crf,
    /// kbit/s for vbr/cbr (ignored for auto)
    #[serde(default)]
    pub rate_value: f32,
}

/// Per-device I/O strategy settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IoSettings {
    /// Capture device I/O strategy (mmap, rw)
    #[serde(default = "default_io")]
    pub source: String,

    /// Output device I/O strategy (mmap, rw)
    #[serde(default = "default_io")]
    pub sink: String,
}

/// Device path settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSettings {
    /// Capture device path
    #[serde(default = "default_source")]
    pub source: String,

    /// Output device path
    #[serde(default = "default_sink")]
    pub sink: String,
}

// Default value functions
fn default_fps() -> u32 {
    25
}

fn default_codec() -> String {
    "h264".to_string()
}

fn default_rc_mode() -> String {
    "auto".to_string()
}

fn default_io() -> String {
    "mmap".to_string()
}

fn default_source() -> String {
    "/dev/video0".to_string()
}

fn default_sink() -> String {
    "/dev/video1".to_string()
}

impl Default for DefaultSettings {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            codec: default_codec(),
            rate_control: default_rc_mode(),
            rate_value: 0.0,
        }
    }
}

impl Default for IoSettings {
    fn default() -> Self {
        Self {
            source: default_io(),
            sink: default_io(),
        }
    }
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            source: default_source(),
            sink: default_sink(),
        }
    }
}

impl ConfigFile {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("framepress").join("config.toml")
        } else if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("framepress")
                .join("config.toml")
        } else {
            PathBuf::from("/etc/framepress/config.toml")
        }
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path())
    }

    /// Load configuration from a specific path
    pub fn load_from(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| FramepressError::Config(format!("Failed to read config file: {}", e)))?;

        let config: ConfigFile = toml::from_str(&content)
            .map_err(|e| FramepressError::Config(format!("Failed to parse config file: {}", e)))?;

        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load configuration, logging warnings but returning defaults on error
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load config file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(Self::default_path())
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    FramepressError::Config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| FramepressError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&path, content)
            .map_err(|e| FramepressError::Config(format!("Failed to write config file: {}", e)))?;

        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Create a default config file if it doesn't exist
    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_path();
        if path.exists() {
            return Ok(false);
        }

        let config = Self::default();
        config.save_to(path)?;
        Ok(true)
    }

    /// Resolve the file contents into pipeline settings.
    ///
    /// Parse errors (unknown codec, rate-control mode, or I/O strategy)
    /// surface here; cross-field checks are left to
    /// [`PipelineConfig::validate`] so callers can layer overrides first.
    pub fn to_pipeline_config(&self) -> Result<PipelineConfig> {
        let codec: Codec = self.defaults.codec.parse()?;
        let rate_control = match self.defaults.rate_control.as_str() {
            "auto" => RateControl::Auto,
            "qp" => RateControl::ConstQp(self.defaults.rate_value as u32),
            "crf" => RateControl::RateFactor(self.defaults.rate_value),
            "vbr" => RateControl::Vbr {
                bitrate: self.defaults.rate_value as u32,
            },
            "cbr" => RateControl::Cbr {
                bitrate: self.defaults.rate_value as u32,
            },
            other => {
                return Err(FramepressError::config(format!(
                    "unknown rate_control '{other}' in config file"
                )));
            }
        };

        Ok(PipelineConfig::default()
            .with_devices(self.devices.source.clone(), self.devices.sink.clone())
            .with_fps(self.defaults.fps)
            .with_codec(codec)
            .with_rate_control(rate_control)
            .with_io(self.io.source.parse()?, self.io.sink.parse()?))
    }
}

/// Generate a sample configuration file
pub fn sample_config() -> String {
    r#"# Framepress Configuration

[defaults]
# Nominal frame rate (drives the encoder time base and keyframe interval)
fps = 25

# Output codec: h264, vp8, vp9
codec = "h264"

# Rate control mode:
#   "auto" - codec defaults (VBR at 1000 kbit/s for vp8/vp9)
#   "qp"   - constant quantizer (h264 only)
#   "crf"  - constant rate factor (h264 only)
#   "vbr"  - variable bitrate (vp8/vp9 only)
#   "cbr"  - constant bitrate (vp8/vp9 only)
rate_control = "auto"

# Rate control value: quantizer for qp, rate factor for crf,
# kbit/s for vbr/cbr (ignored for auto)
rate_value = 0.0

[io]
# Capture device I/O strategy: mmap, rw
source = "mmap"

# Output device I/O strategy: mmap, rw
sink = "mmap"

[devices]
# Capture device path
source = "/dev/video0"

# Output device path
sink = "/dev/video1"
"#
    .to_string()
}

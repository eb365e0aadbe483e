//! Configuration file handling for scan-camera.
//!
//! Loads configuration from `<config dir>/scan-camera/config.toml` or a custom path.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::camera::{
    DeviceKind, FacingMode, NumericConstraint, RawDevice, SessionOptions, TrackCapabilities,
    VideoConstraints,
};

/// Configuration file structure for scan-camera.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub simulator: SimulatorConfig,
}

/// Acquisition settings.
#[derive(Debug, Deserialize, Clone)]
pub struct CameraConfig {
    /// Device id to select before enumeration.
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub width: Option<NumericConstraint>,
    #[serde(default)]
    pub height: Option<NumericConstraint>,
    #[serde(default)]
    pub frame_rate: Option<NumericConstraint>,
    #[serde(default)]
    pub facing_mode: Option<FacingMode>,
    /// Watchdog for stream requests, in milliseconds. 0 disables it.
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: None,
            width: None,
            height: None,
            frame_rate: None,
            facing_mode: None,
            acquire_timeout_ms: default_acquire_timeout_ms(),
        }
    }
}

impl CameraConfig {
    pub fn acquire_timeout(&self) -> Option<Duration> {
        (self.acquire_timeout_ms > 0).then(|| Duration::from_millis(self.acquire_timeout_ms))
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            video: VideoConstraints {
                width: self.width,
                height: self.height,
                frame_rate: self.frame_rate,
                facing_mode: self.facing_mode,
                ..VideoConstraints::default()
            },
            preferred_device: self.device.clone(),
            acquire_timeout: self.acquire_timeout(),
        }
    }
}

/// Script for the simulated media platform.
#[derive(Debug, Deserialize, Clone)]
pub struct SimulatorConfig {
    #[serde(default = "default_true")]
    pub secure_context: bool,
    #[serde(default = "default_true")]
    pub capture_supported: bool,
    #[serde(default = "default_user_agent")]
    pub user_agent: Option<String>,
    #[serde(default = "default_devices")]
    pub devices: Vec<SimulatedDevice>,
    #[serde(default)]
    pub capabilities: Option<TrackCapabilities>,
    /// Platform failure name reported by device enumeration.
    #[serde(default)]
    pub enumerate_failure: Option<String>,
    /// Platform failure name reported by stream requests.
    #[serde(default)]
    pub acquire_failure: Option<String>,
    /// Platform failure name reported when playback starts.
    #[serde(default)]
    pub ready_failure: Option<String>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            secure_context: true,
            capture_supported: true,
            user_agent: default_user_agent(),
            devices: default_devices(),
            capabilities: None,
            enumerate_failure: None,
            acquire_failure: None,
            ready_failure: None,
        }
    }
}

/// A device entry in the simulator script.
#[derive(Debug, Deserialize, Clone)]
pub struct SimulatedDevice {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_kind")]
    pub kind: DeviceKind,
    #[serde(default)]
    pub group_id: Option<String>,
}

impl SimulatedDevice {
    pub fn to_raw(&self) -> RawDevice {
        RawDevice {
            device_id: self.id.clone(),
            label: self.label.clone(),
            kind: self.kind,
            group_id: self.group_id.clone(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_acquire_timeout_ms() -> u64 {
    10_000
}

fn default_kind() -> DeviceKind {
    DeviceKind::VideoInput
}

fn default_user_agent() -> Option<String> {
    Some(
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.6099.109 Safari/537.36"
            .to_string(),
    )
}

fn default_devices() -> Vec<SimulatedDevice> {
    vec![
        SimulatedDevice {
            id: String::new(),
            label: "Integrated Webcam".to_string(),
            kind: DeviceKind::VideoInput,
            group_id: None,
        },
        SimulatedDevice {
            id: "label-scanner-01".to_string(),
            label: "Label Scanner Camera".to_string(),
            kind: DeviceKind::VideoInput,
            group_id: None,
        },
        SimulatedDevice {
            id: "default-mic".to_string(),
            label: "Built-in Microphone".to_string(),
            kind: DeviceKind::AudioInput,
            group_id: None,
        },
    ]
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the default file doesn't exist.
    /// Returns an error if an explicit path is missing, or if the file exists
    /// but cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound {
                        path: path.to_path_buf(),
                    });
                }
                Self::load_file(path)
            }
            None => {
                let path = default_path();
                if path.exists() {
                    Self::load_file(&path)
                } else {
                    log::debug!("No config at {}, using defaults", path.display());
                    Ok(Config::default())
                }
            }
        }
    }

    fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file '{}' not found", .path.display())]
    NotFound { path: PathBuf },
    #[error("Failed to read config file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("scan-camera").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/scan-camera/config.toml")
        })
}

/// Commented default config written by `config init`.
pub const DEFAULT_CONFIG: &str = r#"# scan-camera configuration

[camera]
# Device id to select first (default: first camera found)
# device = "label-scanner-01"
# Requested resolution and frame rate: a number or { min = .., max = .. }
# width = { min = 640, max = 1920 }
# height = 720
# frame_rate = { max = 30 }
# Facing mode: user, environment, left, right
# facing_mode = "environment"
# Give up on a stream request after this many milliseconds (0 = wait forever)
acquire_timeout_ms = 10000

[simulator]
# Report a secure (HTTPS) context
secure_context = true
# Expose camera capture at all
capture_supported = true
# Platform failure names to inject, e.g. "NotAllowedError", "OverconstrainedError"
# enumerate_failure = "NotReadableError"
# acquire_failure = "NotAllowedError"
# ready_failure = "TypeError"

[[simulator.devices]]
id = ""
label = "Integrated Webcam"

[[simulator.devices]]
id = "label-scanner-01"
label = "Label Scanner Camera"

# [simulator.capabilities]
# width = [320, 1920]
# height = [240, 1080]
# frame_rate = [1, 30]
# facing_modes = ["environment"]
"#;

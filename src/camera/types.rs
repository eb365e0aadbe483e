//! Camera types and data structures.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::CameraError;

/// Kind of a media device as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    VideoInput,
    AudioInput,
    AudioOutput,
}

/// A device entry exactly as the platform enumerates it.
///
/// `device_id` and `label` may be empty (some platforms withhold them until
/// camera permission is granted).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDevice {
    pub device_id: String,
    pub label: String,
    pub kind: DeviceKind,
    pub group_id: Option<String>,
}

impl RawDevice {
    pub fn video(device_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            label: label.into(),
            kind: DeviceKind::VideoInput,
            group_id: None,
        }
    }
}

/// A camera-capable input device retained by the session.
///
/// `device_id` is never empty: entries the platform reports without an id are
/// given `camera-<index>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceDescriptor {
    pub device_id: String,
    pub label: String,
    pub kind: DeviceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

impl DeviceDescriptor {
    /// Label to show for this device, falling back to `Camera <n>` (1-based)
    /// while the platform withholds labels.
    pub fn display_label(&self, index: usize) -> String {
        if self.label.is_empty() {
            format!("Camera {}", index + 1)
        } else {
            self.label.clone()
        }
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.label.is_empty() {
            write!(f, "{}", self.device_id)
        } else {
            write!(f, "{} ({})", self.label, self.device_id)
        }
    }
}

/// Lifecycle phase of a camera session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Idle,
    Enumerating,
    Acquiring,
    Active,
    Failed,
}

/// Identifies one acquisition attempt. Tokens increase monotonically per
/// session; only the most recently issued one can complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RequestToken(pub(crate) u64);

impl RequestToken {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Published, read-only view of a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    /// True only while an acquisition is in flight.
    pub loading: bool,
    /// True only while a stream is attached and playing.
    pub active: bool,
    pub error: Option<CameraError>,
    pub devices: Vec<DeviceDescriptor>,
    pub selected_device_id: Option<String>,
    /// Id of the owned stream, if one is attached.
    pub stream_id: Option<String>,
}

impl SessionSnapshot {
    /// Human-readable camera status used in reports.
    pub fn status_label(&self) -> &'static str {
        if self.active {
            "Active"
        } else if self.loading {
            "Initializing"
        } else {
            "Inactive"
        }
    }
}

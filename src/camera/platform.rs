//! Media platform capability traits and stream constraints.
//!
//! The session never touches a global platform object. Everything it needs
//! from the host (device listing, stream acquisition, the secure-context
//! flag) comes through an injected [`MediaPlatform`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::PlatformFailure;
use super::types::RawDevice;

/// Host media-capture capability.
#[async_trait]
pub trait MediaPlatform: Send + Sync {
    type Stream: MediaStream + 'static;

    /// Whether the host exposes camera capture at all.
    fn is_capture_supported(&self) -> bool;

    /// Whether the host runs in a secure transport context.
    fn is_secure_context(&self) -> bool;

    /// Identification string of the host, for diagnostics.
    fn user_agent(&self) -> Option<String> {
        None
    }

    /// List every media device the host knows about.
    async fn enumerate_devices(&self) -> Result<Vec<RawDevice>, PlatformFailure>;

    /// Request a live stream satisfying `constraints`.
    async fn request_stream(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Self::Stream, PlatformFailure>;
}

/// A live media stream. Hardware stays claimed until every track is stopped.
#[async_trait]
pub trait MediaStream: Send + Sync {
    type Track: MediaTrack;

    fn id(&self) -> &str;

    fn tracks(&self) -> &[Self::Track];

    /// Resolves once media metadata has loaded and playback has begun.
    async fn ready(&self) -> Result<(), PlatformFailure>;

    /// Stop every track of this stream.
    fn stop_all(&self) {
        for track in self.tracks() {
            track.stop();
        }
    }
}

/// One track of a [`MediaStream`].
pub trait MediaTrack: Send + Sync {
    fn id(&self) -> &str;

    fn label(&self) -> &str;

    /// Release the underlying device. Stopping twice is harmless.
    fn stop(&self);

    fn is_live(&self) -> bool;

    /// Capability ranges the device supports, if the host reports them.
    fn capabilities(&self) -> Option<TrackCapabilities> {
        None
    }
}

/// Which device a video request may be satisfied by.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceConstraint {
    /// Any camera the host picks.
    #[default]
    Any,
    /// Exactly this device; the host must fail rather than substitute.
    Exact(String),
}

/// A numeric track setting: an exact value or a bounded range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericConstraint {
    Exact(u32),
    Range { min: Option<u32>, max: Option<u32> },
}

impl NumericConstraint {
    /// Whether `value` satisfies this constraint.
    pub fn accepts(&self, value: u32) -> bool {
        match *self {
            NumericConstraint::Exact(v) => v == value,
            NumericConstraint::Range { min, max } => {
                min.map_or(true, |m| value >= m) && max.map_or(true, |m| value <= m)
            }
        }
    }
}

impl fmt::Display for NumericConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericConstraint::Exact(v) => write!(f, "{}", v),
            NumericConstraint::Range { min, max } => {
                let bound = |b: &Option<u32>| b.map_or_else(|| "?".to_string(), |v| v.to_string());
                write!(f, "{}-{}", bound(min), bound(max))
            }
        }
    }
}

/// Camera facing direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    User,
    Environment,
    Left,
    Right,
}

impl fmt::Display for FacingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FacingMode::User => "user",
            FacingMode::Environment => "environment",
            FacingMode::Left => "left",
            FacingMode::Right => "right",
        };
        f.write_str(s)
    }
}

/// Constraints on the video track of a stream request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct VideoConstraints {
    pub device_id: DeviceConstraint,
    pub width: Option<NumericConstraint>,
    pub height: Option<NumericConstraint>,
    pub frame_rate: Option<NumericConstraint>,
    pub facing_mode: Option<FacingMode>,
}

impl VideoConstraints {
    /// Same settings, pinned to `device_id` (or unpinned when `None`).
    pub fn for_device(&self, device_id: Option<&str>) -> Self {
        Self {
            device_id: match device_id {
                Some(id) => DeviceConstraint::Exact(id.to_string()),
                None => DeviceConstraint::Any,
            },
            ..self.clone()
        }
    }
}

impl fmt::Display for VideoConstraints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(width) = &self.width {
            parts.push(format!("Width: {}", width));
        }
        if let Some(height) = &self.height {
            parts.push(format!("Height: {}", height));
        }
        if let Some(frame_rate) = &self.frame_rate {
            parts.push(format!("Frame Rate: {}", frame_rate));
        }
        if let Some(facing_mode) = &self.facing_mode {
            parts.push(format!("Facing Mode: {}", facing_mode));
        }
        f.write_str(&parts.join(", "))
    }
}

/// A full stream request. Audio is never requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamConstraints {
    pub video: VideoConstraints,
    audio: bool,
}

impl StreamConstraints {
    pub fn video_only(video: VideoConstraints) -> Self {
        Self { video, audio: false }
    }

    pub fn audio(&self) -> bool {
        self.audio
    }
}

/// Ranges a video track reports it can be configured to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackCapabilities {
    pub width: Option<(u32, u32)>,
    pub height: Option<(u32, u32)>,
    pub frame_rate: Option<(u32, u32)>,
    pub facing_modes: Vec<FacingMode>,
}

impl fmt::Display for TrackCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some((lo, hi)) = self.width {
            parts.push(format!("Width: {}-{}", lo, hi));
        }
        if let Some((lo, hi)) = self.height {
            parts.push(format!("Height: {}-{}", lo, hi));
        }
        if let Some((lo, hi)) = self.frame_rate {
            parts.push(format!("Frame Rate: {}-{}", lo, hi));
        }
        if !self.facing_modes.is_empty() {
            let modes: Vec<String> = self.facing_modes.iter().map(|m| m.to_string()).collect();
            parts.push(format!("Facing Mode: {}", modes.join("/")));
        }
        f.write_str(&parts.join(", "))
    }
}

//! Camera session management.
//!
//! This module provides the camera-acquisition core:
//! - Device discovery and id normalization via [`normalize_devices`]
//! - Session lifecycle via [`CameraSession`]
//! - Failure classification via [`CameraError`] and [`CameraErrorKind`]
//! - The host capability seam via [`MediaPlatform`]

mod device;
mod error;
mod platform;
mod session;
mod types;

pub use device::normalize_devices;
pub use error::{CameraError, CameraErrorKind, PlatformFailure};
pub use platform::{
    DeviceConstraint, FacingMode, MediaPlatform, MediaStream, MediaTrack, NumericConstraint,
    StreamConstraints, TrackCapabilities, VideoConstraints,
};
pub use session::{CameraSession, SessionOptions, StreamView};
pub use types::{
    DeviceDescriptor, DeviceKind, RawDevice, RequestToken, SessionPhase, SessionSnapshot,
};

//! Scripted media platform.
//!
//! [`SimulatedPlatform`] stands in for the host camera API. Its behavior
//! comes from configuration (or builder calls in tests): which devices exist,
//! whether the context is secure, and which platform failure name each
//! operation should report. Every call is recorded as a [`PlatformEvent`] so
//! callers can check what the session asked for and in which order.
//!
//! Clones share state, so a test can keep a handle while the session owns
//! the platform.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::camera::{
    normalize_devices, DeviceConstraint, MediaPlatform, MediaStream, MediaTrack,
    NumericConstraint, PlatformFailure, RawDevice, StreamConstraints, TrackCapabilities,
    VideoConstraints,
};
use crate::config::SimulatorConfig;

/// Something the session asked of the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformEvent {
    Enumerated,
    Requested(StreamConstraints),
    Granted { stream_id: String },
    Rejected { name: String },
    TrackStopped { stream_id: String, track_id: String },
}

#[derive(Debug, Default)]
struct SimState {
    secure_context: bool,
    capture_supported: bool,
    user_agent: Option<String>,
    devices: Vec<RawDevice>,
    capabilities: Option<TrackCapabilities>,
    enumerate_failure: Option<String>,
    acquire_failure: Option<String>,
    ready_failure: Option<String>,
    stall_acquisition: bool,
    streams_issued: u64,
    tracks: Vec<(String, Arc<AtomicBool>)>,
    events: Vec<PlatformEvent>,
}

fn lock(state: &Mutex<SimState>) -> MutexGuard<'_, SimState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process media platform driven by a script.
#[derive(Debug, Clone)]
pub struct SimulatedPlatform {
    state: Arc<Mutex<SimState>>,
}

impl Default for SimulatedPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedPlatform {
    /// A secure, capture-capable platform with no devices.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                secure_context: true,
                capture_supported: true,
                ..SimState::default()
            })),
        }
    }

    pub fn from_config(config: &SimulatorConfig) -> Self {
        let platform = Self::new();
        {
            let mut s = lock(&platform.state);
            s.secure_context = config.secure_context;
            s.capture_supported = config.capture_supported;
            s.user_agent = config.user_agent.clone();
            s.devices = config.devices.iter().map(|d| d.to_raw()).collect();
            s.capabilities = config.capabilities.clone();
            s.enumerate_failure = config.enumerate_failure.clone();
            s.acquire_failure = config.acquire_failure.clone();
            s.ready_failure = config.ready_failure.clone();
        }
        platform
    }

    pub fn with_devices(self, devices: Vec<RawDevice>) -> Self {
        self.set_devices(devices);
        self
    }

    pub fn with_user_agent(self, user_agent: impl Into<String>) -> Self {
        lock(&self.state).user_agent = Some(user_agent.into());
        self
    }

    pub fn with_capabilities(self, capabilities: TrackCapabilities) -> Self {
        lock(&self.state).capabilities = Some(capabilities);
        self
    }

    pub fn insecure(self) -> Self {
        self.set_secure_context(false);
        self
    }

    pub fn unsupported(self) -> Self {
        lock(&self.state).capture_supported = false;
        self
    }

    /// Make stream requests hang forever.
    pub fn stall_acquisition(self) -> Self {
        lock(&self.state).stall_acquisition = true;
        self
    }

    pub fn fail_enumeration(self, name: &str) -> Self {
        self.set_enumerate_failure(Some(name));
        self
    }

    pub fn fail_acquisition(self, name: &str) -> Self {
        self.set_acquire_failure(Some(name));
        self
    }

    pub fn fail_ready(self, name: &str) -> Self {
        self.set_ready_failure(Some(name));
        self
    }

    pub fn set_devices(&self, devices: Vec<RawDevice>) {
        lock(&self.state).devices = devices;
    }

    pub fn set_secure_context(&self, secure: bool) {
        lock(&self.state).secure_context = secure;
    }

    pub fn set_enumerate_failure(&self, name: Option<&str>) {
        lock(&self.state).enumerate_failure = name.map(str::to_string);
    }

    pub fn set_acquire_failure(&self, name: Option<&str>) {
        lock(&self.state).acquire_failure = name.map(str::to_string);
    }

    pub fn set_ready_failure(&self, name: Option<&str>) {
        lock(&self.state).ready_failure = name.map(str::to_string);
    }

    /// Every call recorded so far, oldest first.
    pub fn events(&self) -> Vec<PlatformEvent> {
        lock(&self.state).events.clone()
    }

    /// Constraints of every stream request, oldest first.
    pub fn requests(&self) -> Vec<StreamConstraints> {
        lock(&self.state)
            .events
            .iter()
            .filter_map(|e| match e {
                PlatformEvent::Requested(c) => Some(c.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn enumerate_calls(&self) -> usize {
        lock(&self.state)
            .events
            .iter()
            .filter(|e| matches!(e, PlatformEvent::Enumerated))
            .count()
    }

    /// Ids of tracks that have been handed out and not yet stopped.
    pub fn live_tracks(&self) -> Vec<String> {
        lock(&self.state)
            .tracks
            .iter()
            .filter(|(_, live)| live.load(Ordering::SeqCst))
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn reject(s: &mut SimState, name: &str, message: &str) -> PlatformFailure {
        log::debug!("Simulated platform rejecting request with {}", name);
        s.events.push(PlatformEvent::Rejected {
            name: name.to_string(),
        });
        PlatformFailure::new(name, message)
    }
}

fn within(range: Option<(u32, u32)>, constraint: Option<&NumericConstraint>) -> bool {
    match (range, constraint) {
        (Some((lo, hi)), Some(NumericConstraint::Exact(v))) => (lo..=hi).contains(v),
        (Some((lo, hi)), Some(NumericConstraint::Range { min, max })) => {
            max.map_or(true, |m| m >= lo) && min.map_or(true, |m| m <= hi)
        }
        _ => true,
    }
}

fn satisfies(caps: &TrackCapabilities, video: &VideoConstraints) -> bool {
    let facing_ok = match video.facing_mode {
        Some(mode) if !caps.facing_modes.is_empty() => caps.facing_modes.contains(&mode),
        _ => true,
    };
    facing_ok
        && within(caps.width, video.width.as_ref())
        && within(caps.height, video.height.as_ref())
        && within(caps.frame_rate, video.frame_rate.as_ref())
}

#[async_trait]
impl MediaPlatform for SimulatedPlatform {
    type Stream = SimulatedStream;

    fn is_capture_supported(&self) -> bool {
        lock(&self.state).capture_supported
    }

    fn is_secure_context(&self) -> bool {
        lock(&self.state).secure_context
    }

    fn user_agent(&self) -> Option<String> {
        lock(&self.state).user_agent.clone()
    }

    async fn enumerate_devices(&self) -> Result<Vec<RawDevice>, PlatformFailure> {
        let mut s = lock(&self.state);
        s.events.push(PlatformEvent::Enumerated);
        match s.enumerate_failure.clone() {
            Some(name) => Err(PlatformFailure::new(name, "simulated enumeration failure")),
            None => Ok(s.devices.clone()),
        }
    }

    async fn request_stream(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<SimulatedStream, PlatformFailure> {
        let stall = {
            let mut s = lock(&self.state);
            s.events.push(PlatformEvent::Requested(constraints.clone()));
            s.stall_acquisition
        };
        if stall {
            std::future::pending::<()>().await;
        }

        let mut s = lock(&self.state);
        if let Some(name) = s.acquire_failure.clone() {
            return Err(Self::reject(&mut s, &name, "simulated acquisition failure"));
        }

        let devices = normalize_devices(s.devices.clone());
        let device = match &constraints.video.device_id {
            DeviceConstraint::Exact(id) => match devices.iter().find(|d| &d.device_id == id) {
                Some(d) => d.clone(),
                None => {
                    return Err(Self::reject(
                        &mut s,
                        "OverconstrainedError",
                        "no device matches the requested deviceId",
                    ))
                }
            },
            DeviceConstraint::Any => match devices.first() {
                Some(d) => d.clone(),
                None => {
                    return Err(Self::reject(
                        &mut s,
                        "NotFoundError",
                        "requested device not found",
                    ))
                }
            },
        };

        let fits = s
            .capabilities
            .as_ref()
            .map_or(true, |caps| satisfies(caps, &constraints.video));
        if !fits {
            return Err(Self::reject(
                &mut s,
                "OverconstrainedError",
                "device cannot satisfy the requested settings",
            ));
        }

        s.streams_issued += 1;
        let n = s.streams_issued;
        let stream_id = format!("stream-{}", n);
        let track_id = format!("track-{}", n);
        let live = Arc::new(AtomicBool::new(true));
        s.tracks.push((track_id.clone(), Arc::clone(&live)));
        s.events.push(PlatformEvent::Granted {
            stream_id: stream_id.clone(),
        });

        let track = SimulatedTrack {
            id: track_id,
            label: device.label.clone(),
            stream_id: stream_id.clone(),
            live,
            capabilities: s.capabilities.clone(),
            state: Arc::clone(&self.state),
        };

        Ok(SimulatedStream {
            id: stream_id,
            tracks: vec![track],
            ready_failure: s.ready_failure.clone(),
        })
    }
}

/// Stream handed out by [`SimulatedPlatform`].
#[derive(Debug)]
pub struct SimulatedStream {
    id: String,
    tracks: Vec<SimulatedTrack>,
    ready_failure: Option<String>,
}

#[async_trait]
impl MediaStream for SimulatedStream {
    type Track = SimulatedTrack;

    fn id(&self) -> &str {
        &self.id
    }

    fn tracks(&self) -> &[SimulatedTrack] {
        &self.tracks
    }

    async fn ready(&self) -> Result<(), PlatformFailure> {
        match &self.ready_failure {
            Some(name) => Err(PlatformFailure::new(
                name.clone(),
                "simulated playback failure",
            )),
            None => Ok(()),
        }
    }
}

/// Video track of a [`SimulatedStream`].
#[derive(Debug)]
pub struct SimulatedTrack {
    id: String,
    label: String,
    stream_id: String,
    live: Arc<AtomicBool>,
    capabilities: Option<TrackCapabilities>,
    state: Arc<Mutex<SimState>>,
}

impl MediaTrack for SimulatedTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn stop(&self) {
        if self.live.swap(false, Ordering::SeqCst) {
            lock(&self.state).events.push(PlatformEvent::TrackStopped {
                stream_id: self.stream_id.clone(),
                track_id: self.id.clone(),
            });
        }
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn capabilities(&self) -> Option<TrackCapabilities> {
        self.capabilities.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::FacingMode;

    fn request(device: DeviceConstraint) -> StreamConstraints {
        StreamConstraints::video_only(VideoConstraints {
            device_id: device,
            ..VideoConstraints::default()
        })
    }

    #[tokio::test]
    async fn test_exact_device_mismatch_is_overconstrained() {
        let platform = SimulatedPlatform::new().with_devices(vec![RawDevice::video("a", "A")]);
        let err = platform
            .request_stream(&request(DeviceConstraint::Exact("b".to_string())))
            .await
            .unwrap_err();
        assert_eq!(err.name, "OverconstrainedError");
    }

    #[tokio::test]
    async fn test_no_devices_is_not_found() {
        let platform = SimulatedPlatform::new();
        let err = platform
            .request_stream(&request(DeviceConstraint::Any))
            .await
            .unwrap_err();
        assert_eq!(err.name, "NotFoundError");
    }

    #[tokio::test]
    async fn test_placeholder_ids_are_requestable() {
        let platform = SimulatedPlatform::new().with_devices(vec![RawDevice::video("", "Webcam")]);
        let stream = platform
            .request_stream(&request(DeviceConstraint::Exact("camera-0".to_string())))
            .await
            .unwrap();
        assert_eq!(stream.tracks()[0].label(), "Webcam");
    }

    #[tokio::test]
    async fn test_capabilities_reject_unsupported_settings() {
        let platform = SimulatedPlatform::new()
            .with_devices(vec![RawDevice::video("a", "A")])
            .with_capabilities(TrackCapabilities {
                width: Some((320, 1280)),
                height: Some((240, 720)),
                frame_rate: Some((1, 30)),
                facing_modes: vec![FacingMode::Environment],
            });

        let too_fast = StreamConstraints::video_only(VideoConstraints {
            frame_rate: Some(NumericConstraint::Exact(60)),
            ..VideoConstraints::default()
        });
        let err = platform.request_stream(&too_fast).await.unwrap_err();
        assert_eq!(err.name, "OverconstrainedError");

        let fine = StreamConstraints::video_only(VideoConstraints {
            width: Some(NumericConstraint::Range {
                min: Some(640),
                max: None,
            }),
            facing_mode: Some(FacingMode::Environment),
            ..VideoConstraints::default()
        });
        assert!(platform.request_stream(&fine).await.is_ok());
    }

    #[tokio::test]
    async fn test_track_stop_is_recorded_once() {
        let platform = SimulatedPlatform::new().with_devices(vec![RawDevice::video("a", "A")]);
        let stream = platform
            .request_stream(&request(DeviceConstraint::Any))
            .await
            .unwrap();
        stream.stop_all();
        stream.stop_all();
        let stops = platform
            .events()
            .iter()
            .filter(|e| matches!(e, PlatformEvent::TrackStopped { .. }))
            .count();
        assert_eq!(stops, 1);
        assert!(platform.live_tracks().is_empty());
    }

    #[tokio::test]
    async fn test_ready_failure() {
        let platform = SimulatedPlatform::new()
            .with_devices(vec![RawDevice::video("a", "A")])
            .fail_ready("TypeError");
        let stream = platform
            .request_stream(&request(DeviceConstraint::Any))
            .await
            .unwrap();
        assert_eq!(stream.ready().await.unwrap_err().name, "TypeError");
    }
}

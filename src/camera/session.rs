//! Camera session lifecycle.
//!
//! [`CameraSession`] owns at most one live stream and walks it through
//! discovery, acquisition, readiness and release. Failures from the platform
//! never escape without first being classified and stored in the session,
//! and every state change is published through a `watch` channel.
//!
//! Acquisition is two-phase: [`CameraSession::start`] attaches the granted
//! stream but leaves the session loading; only [`CameraSession::stream_ready`]
//! (driven by [`CameraSession::wait_ready`] or an external readiness event)
//! makes it active. Each start issues a fresh [`RequestToken`] and signals
//! carrying an older token are ignored.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;

use super::device::normalize_devices;
use super::error::{CameraError, CameraErrorKind, PlatformFailure};
use super::platform::{
    MediaPlatform, MediaStream, MediaTrack, StreamConstraints, TrackCapabilities, VideoConstraints,
};
use super::types::{DeviceDescriptor, RequestToken, SessionPhase, SessionSnapshot};

/// Settings applied to every acquisition of a session.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Video settings; the device id is filled in from the selection.
    pub video: VideoConstraints,
    /// Device to select before any enumeration.
    pub preferred_device: Option<String>,
    /// Upper bound for a stream request and for its readiness wait.
    pub acquire_timeout: Option<Duration>,
}

struct AttachedStream<S> {
    token: RequestToken,
    stream: S,
}

/// Borrowed view of the session's stream.
///
/// Exposes what a renderer needs but no way to stop tracks; only the
/// session releases the device.
pub struct StreamView<'a, S: MediaStream> {
    stream: &'a S,
}

impl<'a, S: MediaStream> StreamView<'a, S> {
    pub fn id(&self) -> &'a str {
        self.stream.id()
    }

    pub fn track_labels(&self) -> Vec<&'a str> {
        self.stream.tracks().iter().map(|t| t.label()).collect()
    }

    /// Whether every track still holds its device.
    pub fn is_live(&self) -> bool {
        self.stream.tracks().iter().all(|t| t.is_live())
    }

    /// Capabilities of the first track, if the host reports them.
    pub fn capabilities(&self) -> Option<TrackCapabilities> {
        self.stream.tracks().first().and_then(|t| t.capabilities())
    }
}

/// Manager of a single camera capture session.
pub struct CameraSession<P: MediaPlatform> {
    platform: P,
    options: SessionOptions,
    phase: SessionPhase,
    error: Option<CameraError>,
    devices: Vec<DeviceDescriptor>,
    selected_device_id: Option<String>,
    stream: Option<AttachedStream<P::Stream>>,
    /// Token of the acquisition that may still complete.
    pending: Option<RequestToken>,
    next_token: u64,
    published: watch::Sender<SessionSnapshot>,
}

impl<P: MediaPlatform> std::fmt::Debug for CameraSession<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraSession")
            .field("phase", &self.phase)
            .field("error", &self.error)
            .field("devices", &self.devices.len())
            .field("selected_device_id", &self.selected_device_id)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl<P: MediaPlatform> CameraSession<P> {
    pub fn new(platform: P, options: SessionOptions) -> Self {
        let selected_device_id = options.preferred_device.clone();
        let (published, _) = watch::channel(SessionSnapshot {
            selected_device_id: selected_device_id.clone(),
            ..SessionSnapshot::default()
        });
        Self {
            platform,
            options,
            phase: SessionPhase::Idle,
            error: None,
            devices: Vec::new(),
            selected_device_id,
            stream: None,
            pending: None,
            next_token: 0,
            published,
        }
    }

    /// Receive every published state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.published.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            loading: self.is_loading(),
            active: self.is_active(),
            error: self.error.clone(),
            devices: self.devices.clone(),
            selected_device_id: self.selected_device_id.clone(),
            stream_id: self.stream.as_ref().map(|a| a.stream.id().to_string()),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == SessionPhase::Acquiring
    }

    pub fn is_active(&self) -> bool {
        self.phase == SessionPhase::Active
    }

    pub fn error(&self) -> Option<&CameraError> {
        self.error.as_ref()
    }

    pub fn devices(&self) -> &[DeviceDescriptor] {
        &self.devices
    }

    pub fn selected_device_id(&self) -> Option<&str> {
        self.selected_device_id.as_deref()
    }

    /// Read-only view of the owned stream, for rendering.
    pub fn stream(&self) -> Option<StreamView<'_, P::Stream>> {
        self.stream.as_ref().map(|a| StreamView { stream: &a.stream })
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Whether camera access is blocked by an insecure host context.
    pub fn is_blocked(&self) -> bool {
        !self.platform.is_secure_context()
    }

    /// Mount step: verify the secure context, then discover devices.
    pub async fn initialize(&mut self) -> Result<(), CameraError> {
        self.ensure_secure()?;
        self.refresh_devices().await.map(|_| ())
    }

    /// Replace the device list with the platform's current video inputs.
    ///
    /// Selects the first device when nothing is selected yet. On failure the
    /// previous list is kept. An enumeration failure while a stream is live is
    /// returned but not recorded, so it cannot mark a working camera failed.
    pub async fn refresh_devices(&mut self) -> Result<&[DeviceDescriptor], CameraError> {
        self.ensure_secure()?;

        let previous = self.phase;
        let streaming = matches!(previous, SessionPhase::Active | SessionPhase::Acquiring);
        if !streaming {
            self.phase = SessionPhase::Enumerating;
            self.publish();
        }

        match self.platform.enumerate_devices().await {
            Ok(raw) => {
                self.devices = normalize_devices(raw);
                if self.selected_device_id.is_none() {
                    self.selected_device_id =
                        self.devices.first().map(|d| d.device_id.clone());
                }
                self.phase = previous;
                log::info!("Discovered {} camera(s)", self.devices.len());
                self.publish();
                Ok(self.devices.as_slice())
            }
            Err(failure) => {
                let err = CameraError::enumeration(failure);
                log::warn!("Camera enumeration failed: {:?}", err.original);
                if streaming {
                    self.phase = previous;
                    self.publish();
                    Err(err)
                } else {
                    Err(self.fail(err))
                }
            }
        }
    }

    /// Request a stream for the selected device.
    ///
    /// Any attached stream is released before the request is issued. On
    /// success the stream is attached and the session stays loading until
    /// [`stream_ready`](Self::stream_ready) is called with the returned token.
    pub async fn start(&mut self) -> Result<RequestToken, CameraError> {
        self.ensure_secure()?;

        if !self.platform.is_capture_supported() {
            return Err(self.fail(CameraError::unsupported()));
        }

        let token = self.issue_token();
        self.pending = Some(token);
        self.error = None;
        self.phase = SessionPhase::Acquiring;
        self.release_stream();
        self.publish();

        let constraints = StreamConstraints::video_only(
            self.options
                .video
                .for_device(self.selected_device_id.as_deref()),
        );
        log::info!(
            "Requesting camera stream (device: {}, request: {})",
            self.selected_device_id.as_deref().unwrap_or("any"),
            token.value()
        );

        let result = guarded(
            self.options.acquire_timeout,
            "request",
            self.platform.request_stream(&constraints),
        )
        .await;

        self.complete_acquisition(token, result)
    }

    fn complete_acquisition(
        &mut self,
        token: RequestToken,
        result: Result<P::Stream, CameraError>,
    ) -> Result<RequestToken, CameraError> {
        if self.pending != Some(token) {
            if let Ok(stream) = &result {
                log::debug!("Discarding stale stream {}", stream.id());
                stream.stop_all();
            }
            return Err(CameraError::new(
                CameraErrorKind::Aborted,
                "Camera request was superseded by a newer one",
            ));
        }

        match result {
            Ok(stream) => {
                log::debug!("Stream {} granted, waiting for playback", stream.id());
                self.stream = Some(AttachedStream { token, stream });
                self.publish();
                Ok(token)
            }
            Err(err) => {
                self.pending = None;
                log::warn!("Camera request failed ({}): {}", err.kind, err.message);
                Err(self.fail(err))
            }
        }
    }

    /// Promote the attached stream to active once its media is playing.
    ///
    /// Returns false, changing nothing, if `token` is not the pending request
    /// or its stream is no longer attached.
    pub fn stream_ready(&mut self, token: RequestToken) -> bool {
        let attached = self.stream.as_ref().map(|a| a.token);
        if self.pending != Some(token) || attached != Some(token) {
            log::debug!("Ignoring ready signal for stale request {}", token.value());
            return false;
        }
        self.pending = None;
        self.error = None;
        self.phase = SessionPhase::Active;
        log::info!("Camera active");
        self.publish();
        true
    }

    /// Record that the pending stream failed to start playing.
    pub fn stream_failed(&mut self, token: RequestToken, failure: PlatformFailure) -> bool {
        self.fail_pending(token, CameraError::classify(failure))
    }

    fn fail_pending(&mut self, token: RequestToken, err: CameraError) -> bool {
        if self.pending != Some(token) {
            return false;
        }
        self.pending = None;
        log::warn!("Camera playback failed ({}): {}", err.kind, err.message);
        self.fail(err);
        true
    }

    /// Wait for the attached stream's readiness signal and apply it.
    ///
    /// Returns immediately if `token` already belongs to the active stream.
    pub async fn wait_ready(&mut self, token: RequestToken) -> Result<(), CameraError> {
        let outcome = {
            let attached = match self.stream.as_ref() {
                Some(a) if a.token == token && self.phase == SessionPhase::Active => {
                    return Ok(())
                }
                Some(a) if a.token == token => a,
                _ => {
                    return Err(CameraError::new(
                        CameraErrorKind::Aborted,
                        "No pending camera stream for this request",
                    ))
                }
            };
            guarded(
                self.options.acquire_timeout,
                "playback",
                attached.stream.ready(),
            )
            .await
        };

        match outcome {
            Ok(()) => {
                if self.stream_ready(token) {
                    Ok(())
                } else {
                    Err(CameraError::new(
                        CameraErrorKind::Aborted,
                        "Camera request was superseded by a newer one",
                    ))
                }
            }
            Err(err) => {
                self.fail_pending(token, err.clone());
                Err(err)
            }
        }
    }

    /// Start the camera and wait until it is active.
    pub async fn activate(&mut self) -> Result<RequestToken, CameraError> {
        let token = self.start().await?;
        self.wait_ready(token).await?;
        Ok(token)
    }

    /// Release the stream. Calling it with nothing attached is a no-op.
    pub fn stop(&mut self) {
        if self.stream.is_none() && self.pending.is_none() {
            return;
        }
        self.pending = None;
        self.release_stream();
        if matches!(self.phase, SessionPhase::Active | SessionPhase::Acquiring) {
            self.phase = SessionPhase::Idle;
        }
        log::info!("Camera stopped");
        self.publish();
    }

    /// Change the selected device.
    ///
    /// When the session is acquiring or active, the camera is re-acquired on
    /// the new device and the new request's token is returned.
    pub async fn select_device(
        &mut self,
        device_id: impl Into<String>,
    ) -> Result<Option<RequestToken>, CameraError> {
        let device_id = device_id.into();
        if self.selected_device_id.as_deref() == Some(device_id.as_str()) {
            return Ok(None);
        }
        if !self.devices.iter().any(|d| d.device_id == device_id) {
            log::warn!("Selecting camera '{}' which is not in the device list", device_id);
        }
        self.selected_device_id = Some(device_id);
        self.publish();

        if matches!(self.phase, SessionPhase::Active | SessionPhase::Acquiring) {
            self.start().await.map(Some)
        } else {
            Ok(None)
        }
    }

    /// Unmount step: release everything and return to idle.
    pub fn teardown(&mut self) {
        self.pending = None;
        self.release_stream();
        self.error = None;
        self.phase = SessionPhase::Idle;
        self.publish();
    }

    fn ensure_secure(&mut self) -> Result<(), CameraError> {
        if self.platform.is_secure_context() {
            return Ok(());
        }
        log::warn!("Refusing camera access outside a secure context");
        self.pending = None;
        Err(self.fail(CameraError::insecure_context()))
    }

    fn fail(&mut self, err: CameraError) -> CameraError {
        self.release_stream();
        self.phase = SessionPhase::Failed;
        self.error = Some(err.clone());
        self.publish();
        err
    }

    fn release_stream(&mut self) -> bool {
        match self.stream.take() {
            Some(attached) => {
                log::debug!("Stopping tracks of stream {}", attached.stream.id());
                attached.stream.stop_all();
                true
            }
            None => false,
        }
    }

    fn issue_token(&mut self) -> RequestToken {
        self.next_token += 1;
        RequestToken(self.next_token)
    }

    fn publish(&self) {
        self.published.send_replace(self.snapshot());
    }
}

impl<P: MediaPlatform> Drop for CameraSession<P> {
    fn drop(&mut self) {
        self.release_stream();
    }
}

async fn guarded<T, F>(limit: Option<Duration>, stage: &str, fut: F) -> Result<T, CameraError>
where
    F: Future<Output = Result<T, PlatformFailure>>,
{
    match limit {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => result.map_err(CameraError::classify),
            Err(_) => Err(CameraError::timed_out(stage, limit)),
        },
        None => fut.await.map_err(CameraError::classify),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::RawDevice;
    use crate::simulator::{PlatformEvent, SimulatedPlatform};

    fn two_cameras() -> SimulatedPlatform {
        SimulatedPlatform::new().with_devices(vec![
            RawDevice::video("front", "Front Camera"),
            RawDevice::video("rear", "Rear Camera"),
        ])
    }

    #[tokio::test]
    async fn test_start_is_loading_until_ready() {
        let platform = two_cameras();
        let mut session = CameraSession::new(platform, SessionOptions::default());
        session.initialize().await.unwrap();

        let token = session.start().await.unwrap();
        assert!(session.is_loading());
        assert!(!session.is_active());
        assert!(session.stream().is_some());

        assert!(session.stream_ready(token));
        assert!(session.is_active());
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn test_stale_ready_signal_is_ignored() {
        let mut session = CameraSession::new(two_cameras(), SessionOptions::default());
        session.initialize().await.unwrap();

        let first = session.start().await.unwrap();
        let second = session.start().await.unwrap();
        assert!(second > first);

        assert!(!session.stream_ready(first));
        assert_eq!(session.phase(), SessionPhase::Acquiring);
        assert!(session.stream_ready(second));
        assert_eq!(session.phase(), SessionPhase::Active);
    }

    #[tokio::test]
    async fn test_stale_completion_stops_its_stream() {
        let platform = two_cameras();
        let handle = platform.clone();
        let mut session = CameraSession::new(platform, SessionOptions::default());
        session.initialize().await.unwrap();

        let old = session.start().await.unwrap();
        let _newer = session.start().await.unwrap();

        let constraints = StreamConstraints::video_only(VideoConstraints::default());
        let late = session.platform().request_stream(&constraints).await.unwrap();
        let late_id = late.id().to_string();
        let result = session.complete_acquisition(old, Ok(late));

        assert_eq!(result.unwrap_err().kind, CameraErrorKind::Aborted);
        assert_ne!(session.snapshot().stream_id.as_deref(), Some(late_id.as_str()));
        assert!(handle
            .events()
            .iter()
            .any(|e| matches!(e, PlatformEvent::TrackStopped { stream_id, .. } if *stream_id == late_id)));
    }

    #[tokio::test]
    async fn test_stop_during_acquiring_discards_ready() {
        let mut session = CameraSession::new(two_cameras(), SessionOptions::default());
        session.initialize().await.unwrap();
        let token = session.start().await.unwrap();
        session.stop();
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(!session.stream_ready(token));
        assert!(!session.is_active());
    }

    #[tokio::test]
    async fn test_stream_failed_classifies_and_releases() {
        let platform = two_cameras();
        let handle = platform.clone();
        let mut session = CameraSession::new(platform, SessionOptions::default());
        session.initialize().await.unwrap();
        let token = session.start().await.unwrap();

        assert!(session.stream_failed(token, PlatformFailure::named("TypeError")));
        assert_eq!(session.error().unwrap().kind, CameraErrorKind::Display);
        assert!(!session.is_active());
        assert!(!session.is_loading());
        assert!(session.stream().is_none());
        assert!(handle
            .events()
            .iter()
            .any(|e| matches!(e, PlatformEvent::TrackStopped { .. })));
    }

    #[tokio::test]
    async fn test_enumeration_failure_while_active_keeps_stream() {
        let platform = two_cameras();
        let handle = platform.clone();
        let mut session = CameraSession::new(platform, SessionOptions::default());
        session.initialize().await.unwrap();
        session.activate().await.unwrap();

        handle.set_enumerate_failure(Some("NotReadableError"));
        let err = session.refresh_devices().await.unwrap_err();
        assert_eq!(err.kind, CameraErrorKind::Unknown);
        assert!(session.is_active());
        assert!(session.error().is_none());
        assert_eq!(session.devices().len(), 2);
    }

    #[tokio::test]
    async fn test_watchdog_times_out_stalled_request() {
        let platform = two_cameras().stall_acquisition();
        let options = SessionOptions {
            acquire_timeout: Some(Duration::from_millis(20)),
            ..SessionOptions::default()
        };
        let mut session = CameraSession::new(platform, options);
        session.initialize().await.unwrap();

        let err = session.start().await.unwrap_err();
        assert_eq!(err.kind, CameraErrorKind::Aborted);
        assert!(err.message.contains("timed out"));
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn test_drop_releases_stream() {
        let platform = two_cameras();
        let handle = platform.clone();
        {
            let mut session = CameraSession::new(platform, SessionOptions::default());
            session.initialize().await.unwrap();
            session.activate().await.unwrap();
        }
        let stream_tracks = handle.live_tracks();
        assert!(stream_tracks.is_empty());
    }

    #[tokio::test]
    async fn test_view_only_borrows_stream() {
        let mut session = CameraSession::new(two_cameras(), SessionOptions::default());
        session.initialize().await.unwrap();
        session.activate().await.unwrap();
        let view = session.stream().unwrap();
        assert!(view.is_live());
        assert_eq!(view.track_labels(), ["Front Camera"]);
        assert_eq!(Some(view.id().to_string()), session.snapshot().stream_id);
    }

    #[tokio::test]
    async fn test_wait_ready_on_active_stream_is_ok() {
        let mut session = CameraSession::new(two_cameras(), SessionOptions::default());
        session.initialize().await.unwrap();
        let token = session.activate().await.unwrap();

        session.wait_ready(token).await.unwrap();
        assert!(session.is_active());
        assert!(session.error().is_none());
    }

    #[tokio::test]
    async fn test_wait_ready_with_replaced_token_is_aborted() {
        let mut session = CameraSession::new(two_cameras(), SessionOptions::default());
        session.initialize().await.unwrap();
        let old = session.activate().await.unwrap();
        session.activate().await.unwrap();

        let err = session.wait_ready(old).await.unwrap_err();
        assert_eq!(err.kind, CameraErrorKind::Aborted);
        assert!(session.is_active());
    }
}

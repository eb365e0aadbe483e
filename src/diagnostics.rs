//! Camera troubleshooting report.
//!
//! Collects what a support person needs to know about a session: which host
//! it runs on, whether the context is secure, how many cameras were found,
//! and the last classified failure with its remediation steps.

use serde::Serialize;
use std::fmt;

use crate::camera::{CameraSession, DeviceDescriptor, MediaPlatform, TrackCapabilities};

/// Browser (host) name and version, parsed from a user-agent string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrowserInfo {
    pub name: String,
    pub version: String,
}

impl BrowserInfo {
    pub fn unknown() -> Self {
        Self {
            name: "Unknown".to_string(),
            version: "Unknown".to_string(),
        }
    }

    /// Detect the browser from a user-agent string.
    ///
    /// Checks run in a fixed order because most agents mention several
    /// engines (Edge and Opera also claim Chrome, Chrome also claims Safari).
    pub fn from_user_agent(user_agent: &str) -> Self {
        let (name, marker) = if user_agent.contains("Firefox") {
            ("Firefox", "Firefox/")
        } else if user_agent.contains("SamsungBrowser") {
            ("Samsung Browser", "SamsungBrowser/")
        } else if user_agent.contains("Opera") || user_agent.contains("OPR") {
            ("Opera", "OPR/")
        } else if user_agent.contains("Edg") {
            ("Edge", "Edg/")
        } else if user_agent.contains("Chrome") {
            ("Chrome", "Chrome/")
        } else if user_agent.contains("Safari") {
            ("Safari", "Version/")
        } else {
            return Self::unknown();
        };

        Self {
            name: name.to_string(),
            version: version_after(user_agent, marker).unwrap_or_else(|| "Unknown".to_string()),
        }
    }
}

impl fmt::Display for BrowserInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

/// The run of digits and dots right after `marker`, if any.
fn version_after(user_agent: &str, marker: &str) -> Option<String> {
    let start = user_agent.find(marker)? + marker.len();
    let version: String = user_agent[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    (!version.is_empty()).then_some(version)
}

/// Snapshot of a session for troubleshooting.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticReport {
    pub browser: BrowserInfo,
    pub user_agent: Option<String>,
    pub secure_context: bool,
    pub camera_count: usize,
    pub devices: Vec<DeviceDescriptor>,
    pub selected_device_id: Option<String>,
    pub camera_status: String,
    pub requested: String,
    /// `<kind> - <platform failure name or N/A>`
    pub last_error: Option<String>,
    pub error_title: Option<String>,
    pub error_message: Option<String>,
    pub remediation: Vec<String>,
    pub capabilities: Option<TrackCapabilities>,
}

impl DiagnosticReport {
    pub fn from_session<P: MediaPlatform>(session: &CameraSession<P>) -> Self {
        let platform = session.platform();
        let user_agent = platform.user_agent();
        let browser = user_agent
            .as_deref()
            .map(BrowserInfo::from_user_agent)
            .unwrap_or_else(BrowserInfo::unknown);
        let snapshot = session.snapshot();
        let error = session.error();

        let capabilities = session.stream().and_then(|view| view.capabilities());

        Self {
            browser,
            user_agent,
            secure_context: platform.is_secure_context(),
            camera_count: snapshot.devices.len(),
            devices: snapshot.devices.clone(),
            selected_device_id: snapshot.selected_device_id.clone(),
            camera_status: snapshot.status_label().to_string(),
            requested: session.options().video.to_string(),
            last_error: error.map(|e| format!("{} - {}", e.kind, e.original_name())),
            error_title: error.map(|e| e.kind.title().to_string()),
            error_message: error.map(|e| e.message.clone()),
            remediation: error
                .map(|e| e.kind.remediation().iter().map(|s| s.to_string()).collect::<Vec<_>>())
                .unwrap_or_default(),
            capabilities,
        }
    }
}

/// Mount a fresh session, try to bring the camera up, and report on it.
///
/// Failures end up in the report rather than in the return value.
pub async fn run_diagnosis<P: MediaPlatform>(session: &mut CameraSession<P>) -> DiagnosticReport {
    match session.initialize().await {
        Ok(()) => {
            if let Err(e) = session.activate().await {
                log::warn!("Camera did not start: {}", e);
            }
        }
        Err(e) => log::warn!("Camera initialization failed: {}", e),
    }
    DiagnosticReport::from_session(session)
}

impl fmt::Display for DiagnosticReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some(title), Some(message)) = (&self.error_title, &self.error_message) {
            writeln!(f, "{}", title)?;
            writeln!(f, "  {}", message)?;
            if !self.remediation.is_empty() {
                writeln!(f, "\n  To fix this issue:")?;
                for (i, step) in self.remediation.iter().enumerate() {
                    writeln!(f, "    {}. {}", i + 1, step)?;
                }
            }
            writeln!(f)?;
        }

        writeln!(f, "Debugging Information")?;
        writeln!(
            f,
            "  Browser:           {}",
            self.user_agent.as_deref().unwrap_or("Unknown")
        )?;
        writeln!(f, "  Detected:          {}", self.browser)?;
        writeln!(
            f,
            "  Secure Context:    {}",
            if self.secure_context { "Yes" } else { "No" }
        )?;
        writeln!(f, "  Available Cameras: {}", self.camera_count)?;
        for (i, device) in self.devices.iter().enumerate() {
            let marker = if self.selected_device_id.as_deref() == Some(device.device_id.as_str()) {
                "*"
            } else {
                " "
            };
            writeln!(
                f,
                "    {} [{}] {} ({})",
                marker,
                i,
                device.display_label(i),
                device.device_id
            )?;
        }
        writeln!(f, "  Camera Status:     {}", self.camera_status)?;
        if !self.requested.is_empty() {
            writeln!(f, "  Requested:         {}", self.requested)?;
        }
        if let Some(caps) = &self.capabilities {
            writeln!(f, "  Capabilities:      {}", caps)?;
        }
        if let Some(last_error) = &self.last_error {
            writeln!(f, "  Last Error:        {}", last_error)?;
        }
        Ok(())
    }
}

//! Camera error taxonomy and platform failure classification.
//!
//! Every failure reported by the media platform is converted into a
//! [`CameraError`] before it reaches session state. The mapping from platform
//! failure names to [`CameraErrorKind`] is fixed and case-sensitive.

use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// A failure reported by the host media platform.
///
/// `name` is the platform-defined failure name (for example `NotAllowedError`)
/// and drives classification. `message` is free-form diagnostics text.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{name}: {message}")]
pub struct PlatformFailure {
    pub name: String,
    pub message: String,
}

impl PlatformFailure {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Failure with the given name and an empty message.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, "")
    }
}

/// Category of a camera failure surfaced to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CameraErrorKind {
    Permission,
    NotFound,
    Constraints,
    Aborted,
    Security,
    Display,
    Unknown,
}

impl CameraErrorKind {
    pub const ALL: [CameraErrorKind; 7] = [
        CameraErrorKind::Permission,
        CameraErrorKind::NotFound,
        CameraErrorKind::Constraints,
        CameraErrorKind::Aborted,
        CameraErrorKind::Security,
        CameraErrorKind::Display,
        CameraErrorKind::Unknown,
    ];

    /// Classify a platform failure name. Unrecognized names map to `Unknown`.
    pub fn from_failure_name(name: &str) -> Self {
        match name {
            "NotAllowedError" | "PermissionDeniedError" => CameraErrorKind::Permission,
            "NotFoundError" | "DevicesNotFoundError" => CameraErrorKind::NotFound,
            "ConstraintNotSatisfiedError" | "OverconstrainedError" => {
                CameraErrorKind::Constraints
            }
            "AbortError" => CameraErrorKind::Aborted,
            "SecurityError" => CameraErrorKind::Security,
            "TypeError" => CameraErrorKind::Display,
            _ => CameraErrorKind::Unknown,
        }
    }

    /// Stable kebab-case identifier, as used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            CameraErrorKind::Permission => "permission",
            CameraErrorKind::NotFound => "not-found",
            CameraErrorKind::Constraints => "constraints",
            CameraErrorKind::Aborted => "aborted",
            CameraErrorKind::Security => "security",
            CameraErrorKind::Display => "display",
            CameraErrorKind::Unknown => "unknown",
        }
    }

    /// Short heading for an alert about this kind of failure.
    pub fn title(&self) -> &'static str {
        match self {
            CameraErrorKind::Permission => "Permission Denied",
            CameraErrorKind::NotFound => "Camera Not Found",
            CameraErrorKind::Constraints => "Camera Constraints Error",
            CameraErrorKind::Aborted => "Camera Access Aborted",
            CameraErrorKind::Security => "Security Error",
            CameraErrorKind::Display => "Display Error",
            CameraErrorKind::Unknown => "Camera Error",
        }
    }

    /// User-facing message for a platform failure of this kind.
    pub fn message(&self) -> &'static str {
        match self {
            CameraErrorKind::Permission => {
                "Camera access was denied. Please allow camera access in your browser settings."
            }
            CameraErrorKind::NotFound => {
                "No camera was found on your device, or the selected camera is not available."
            }
            CameraErrorKind::Constraints => {
                "The selected camera cannot satisfy the requested constraints. Try a different camera or a lower resolution or frame rate."
            }
            CameraErrorKind::Aborted => {
                "Camera access was aborted. This might be due to a hardware error or the camera being used by another application."
            }
            CameraErrorKind::Security => {
                "Camera access was blocked due to security restrictions. Make sure the page is served over a secure connection (HTTPS)."
            }
            CameraErrorKind::Display => {
                "There was a problem displaying the camera stream. Try reloading the page."
            }
            CameraErrorKind::Unknown => "An unknown error occurred while accessing the camera",
        }
    }

    /// Ordered steps the user can take to fix this kind of failure.
    pub fn remediation(&self) -> &'static [&'static str] {
        match self {
            CameraErrorKind::Permission => &[
                "Click the camera icon in your browser's address bar",
                "Select \"Allow\" for camera access",
                "Refresh the page",
            ],
            CameraErrorKind::NotFound => &[
                "Check if your camera is properly connected",
                "Make sure no other application is using the camera",
                "Try restarting your browser",
            ],
            _ => &[],
        }
    }
}

impl fmt::Display for CameraErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified camera failure stored in session state.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message}")]
pub struct CameraError {
    pub kind: CameraErrorKind,
    pub message: String,
    /// The platform failure this error was classified from, if any.
    #[source]
    pub original: Option<PlatformFailure>,
}

impl CameraError {
    pub fn new(kind: CameraErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            original: None,
        }
    }

    /// Classify a platform failure into a camera error carrying the kind's
    /// fixed message.
    pub fn classify(failure: PlatformFailure) -> Self {
        let kind = CameraErrorKind::from_failure_name(&failure.name);
        Self {
            kind,
            message: kind.message().to_string(),
            original: Some(failure),
        }
    }

    /// The host context is not secure; camera access is never attempted.
    pub fn insecure_context() -> Self {
        Self::new(
            CameraErrorKind::Security,
            "Camera access requires a secure connection (HTTPS). Your connection is not secure.",
        )
    }

    /// The platform exposes no camera-capture capability.
    pub fn unsupported() -> Self {
        Self::new(
            CameraErrorKind::Unknown,
            "Your browser does not support camera access. Try using a modern browser like Chrome, Firefox, or Edge.",
        )
    }

    /// Device enumeration failed. Always `Unknown`, whatever the platform name.
    pub fn enumeration(failure: PlatformFailure) -> Self {
        Self {
            kind: CameraErrorKind::Unknown,
            message: "Failed to enumerate camera devices".to_string(),
            original: Some(failure),
        }
    }

    /// The acquisition watchdog fired.
    pub fn timed_out(stage: &str, after: Duration) -> Self {
        Self::new(
            CameraErrorKind::Aborted,
            format!("Camera {} timed out after {} ms", stage, after.as_millis()),
        )
    }

    /// The platform failure name, or `N/A` when there is none.
    pub fn original_name(&self) -> &str {
        self.original
            .as_ref()
            .map(|f| f.name.as_str())
            .unwrap_or("N/A")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_table() {
        let cases = [
            ("NotAllowedError", CameraErrorKind::Permission),
            ("PermissionDeniedError", CameraErrorKind::Permission),
            ("NotFoundError", CameraErrorKind::NotFound),
            ("DevicesNotFoundError", CameraErrorKind::NotFound),
            ("ConstraintNotSatisfiedError", CameraErrorKind::Constraints),
            ("OverconstrainedError", CameraErrorKind::Constraints),
            ("AbortError", CameraErrorKind::Aborted),
            ("SecurityError", CameraErrorKind::Security),
            ("TypeError", CameraErrorKind::Display),
        ];
        for (name, kind) in cases {
            assert_eq!(CameraErrorKind::from_failure_name(name), kind, "{}", name);
        }
    }

    #[test]
    fn test_unmapped_names_are_unknown() {
        for name in ["NotReadableError", "", "notallowederror", "TYPEERROR", "Error"] {
            assert_eq!(
                CameraErrorKind::from_failure_name(name),
                CameraErrorKind::Unknown,
                "{}",
                name
            );
        }
    }

    #[test]
    fn test_classify_keeps_original() {
        let err = CameraError::classify(PlatformFailure::new("AbortError", "device busy"));
        assert_eq!(err.kind, CameraErrorKind::Aborted);
        assert_eq!(err.original_name(), "AbortError");
        assert!(err.to_string().contains("aborted"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_enumeration_is_always_unknown() {
        let err = CameraError::enumeration(PlatformFailure::named("NotAllowedError"));
        assert_eq!(err.kind, CameraErrorKind::Unknown);
        assert_eq!(err.message, "Failed to enumerate camera devices");
    }

    #[test]
    fn test_insecure_context_has_no_original() {
        let err = CameraError::insecure_context();
        assert_eq!(err.kind, CameraErrorKind::Security);
        assert_eq!(err.original_name(), "N/A");
        assert!(err.message.contains("HTTPS"));
    }

    #[test]
    fn test_remediation_steps() {
        assert_eq!(CameraErrorKind::Permission.remediation().len(), 3);
        assert_eq!(CameraErrorKind::NotFound.remediation().len(), 3);
        assert!(CameraErrorKind::Display.remediation().is_empty());
    }

    #[test]
    fn test_kind_serializes_kebab_case() {
        let json = serde_json::to_string(&CameraErrorKind::NotFound).unwrap();
        assert_eq!(json, "\"not-found\"");
        for kind in CameraErrorKind::ALL {
            assert_eq!(
                serde_json::to_string(&kind).unwrap(),
                format!("\"{}\"", kind.as_str())
            );
        }
    }
}

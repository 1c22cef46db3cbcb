//! Error types for camkit operations
//!
//! Two layers live here. [`Error`] covers the ambient concerns of the crate
//! (configuration files, logging setup, rig descriptions, image encoding).
//! [`CameraError`] is the closed taxonomy reported by the camera controller,
//! tagged by [`ErrorCode`] and optionally wrapping the failure that caused it.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias using camkit's ambient [`Error`] type
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for controller operations
pub type CameraResult<T> = std::result::Result<T, CameraError>;

/// Ambient error type for camkit operations outside the controller
#[derive(Error, Debug)]
pub enum Error {
    /// Controller failure surfaced through an ambient API
    #[error(transparent)]
    Camera(#[from] CameraError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Virtual rig description could not be loaded
    #[error("Rig error: {0}")]
    Rig(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image processing error
    #[error("Image processing error: {0}")]
    Image(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Image(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Other(format!("JSON error: {}", e))
    }
}

/// Closed set of camera error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    /// Host does not expose a permissions API
    NoPermissionsApi,
    /// User denied camera access
    PermissionDenied,
    /// Requested constraints cannot be satisfied
    ConfigurationError,
    /// No camera device found
    NoDevice,
    /// Host does not expose media devices
    NoMediaDevicesSupport,
    /// Failed to start the camera
    CameraStartError,
    /// Failed to initialize the camera
    CameraInitializationError,
    /// No video stream available
    NoStream,
    /// Failed to apply camera settings
    CameraSettingsError,
    /// Failed to stop the camera
    CameraStopError,
    /// Camera is held by another application
    CameraAlreadyInUse,
    /// Capture surface could not be drawn to
    CanvasError,
    /// Failed to take a photo
    CameraTakePhotoError,
    /// Failed to toggle the torch
    TorchError,
    /// Failed to change the focus mode
    FocusError,
    /// A provider call did not complete in time
    Timeout,
    /// Anything the classifier does not recognise
    Unknown,
}

impl ErrorCode {
    /// Canonical kebab-case identifier
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::NoPermissionsApi => "no-permissions-api",
            ErrorCode::PermissionDenied => "permission-denied",
            ErrorCode::ConfigurationError => "configuration-error",
            ErrorCode::NoDevice => "no-device",
            ErrorCode::NoMediaDevicesSupport => "no-media-devices-support",
            ErrorCode::CameraStartError => "camera-start-error",
            ErrorCode::CameraInitializationError => "camera-initialization-error",
            ErrorCode::NoStream => "no-stream",
            ErrorCode::CameraSettingsError => "camera-settings-error",
            ErrorCode::CameraStopError => "camera-stop-error",
            ErrorCode::CameraAlreadyInUse => "camera-already-in-use",
            ErrorCode::CanvasError => "canvas-error",
            ErrorCode::CameraTakePhotoError => "camera-take-photo-error",
            ErrorCode::TorchError => "torch-error",
            ErrorCode::FocusError => "focus-error",
            ErrorCode::Timeout => "timeout",
            ErrorCode::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw failure reported by a host capability, identified by its platform error name
/// (`NotAllowedError`, `OverconstrainedError`, ...).
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{name}: {message}")]
pub struct PlatformError {
    /// Platform error name
    pub name: String,
    /// Human readable detail
    pub message: String,
}

impl PlatformError {
    /// Create a platform error from its name and message
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Constraints could not be satisfied by the device
    pub fn is_overconstrained_error(&self) -> bool {
        self.name == "OverconstrainedError"
    }

    /// Device is busy or the acquisition was aborted
    pub fn is_camera_in_use_error(&self) -> bool {
        self.name == "NotReadableError" || self.name == "AbortError"
    }

    /// Map the platform error name onto the closed taxonomy
    pub fn classify(&self) -> (ErrorCode, &'static str) {
        match self.name.as_str() {
            "NotReadableError" | "TrackStartError" => (
                ErrorCode::CameraAlreadyInUse,
                "Camera is currently in use by another application",
            ),
            "NotFoundError" => (ErrorCode::NoDevice, "No camera device was found"),
            "NotAllowedError" | "PermissionDeniedError" => (
                ErrorCode::PermissionDenied,
                "Camera access permission was denied",
            ),
            "ConstraintNotSatisfiedError" => (
                ErrorCode::ConfigurationError,
                "Camera could not satisfy the requested constraints",
            ),
            "OverconstrainedError" => (
                ErrorCode::ConfigurationError,
                "The requested constraints cannot be satisfied",
            ),
            "AbortError" => (ErrorCode::Unknown, "The operation was aborted"),
            "TypeError" => (ErrorCode::Unknown, "An invalid argument was provided"),
            _ => (ErrorCode::Unknown, "An unknown error occurred"),
        }
    }
}

/// What a [`CameraError`] wraps
#[derive(Error, Debug, Clone)]
pub enum ErrorCause {
    /// Failure straight from a host capability
    #[error(transparent)]
    Platform(PlatformError),
    /// Failure already translated by a lower layer of the controller
    #[error(transparent)]
    Camera(Box<CameraError>),
}

/// Camera controller error: a tagged code, a message and an optional cause
#[derive(Error, Debug, Clone)]
#[error("[{code}] {message}")]
pub struct CameraError {
    /// Error tag
    pub code: ErrorCode,
    /// Human readable message
    pub message: String,
    /// Lower level failure, if any
    #[source]
    pub cause: Option<ErrorCause>,
}

impl CameraError {
    /// Create an error without a cause
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
        }
    }

    /// Wrap another camera error
    pub fn wrapping(code: ErrorCode, message: impl Into<String>, cause: CameraError) -> Self {
        Self {
            code,
            message: message.into(),
            cause: Some(ErrorCause::Camera(Box::new(cause))),
        }
    }

    /// Timeout raised by the provider-call wrapper
    pub fn timeout(operation: &str, limit: std::time::Duration) -> Self {
        Self::new(
            ErrorCode::Timeout,
            format!("{operation} timed out after {}ms", limit.as_millis()),
        )
    }

    /// Innermost camera error in the cause chain (self when nothing is nested)
    pub fn root_cause(&self) -> &CameraError {
        let mut current = self;
        while let Some(ErrorCause::Camera(inner)) = &current.cause {
            current = inner;
        }
        current
    }

    /// Platform failure at the bottom of the chain, if any
    pub fn platform_cause(&self) -> Option<&PlatformError> {
        match &self.root_cause().cause {
            Some(ErrorCause::Platform(platform)) => Some(platform),
            _ => None,
        }
    }

    /// `[code] message`, followed by the cause chain
    pub fn describe(&self) -> String {
        let mut out = self.to_string();
        let mut cause = self.cause.as_ref();
        while let Some(next) = cause {
            out.push_str(&format!("\nCaused by: {next}"));
            cause = match next {
                ErrorCause::Camera(inner) => inner.cause.as_ref(),
                ErrorCause::Platform(_) => None,
            };
        }
        out
    }
}

impl From<PlatformError> for CameraError {
    fn from(platform: PlatformError) -> Self {
        let (code, message) = platform.classify();
        Self {
            code,
            message: message.to_string(),
            cause: Some(ErrorCause::Platform(platform)),
        }
    }
}

//! The controller's single source of truth and its reducer

use crate::camera::capture::CapturedPhoto;
use crate::camera::config::{CameraConfiguration, ConfigPatch};
use crate::camera::provider::MediaStream;
use crate::camera::types::{CameraSettings, DeviceDescriptor, Resolution, TrackCapabilities};
use crate::error::CameraError;
use std::sync::Arc;

/// Coarse lifecycle phase derived from the activity flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    /// No stream
    Idle,
    /// `start_stream` in flight
    Initializing,
    /// Stream running
    Active,
    /// `stop_stream` in flight
    Stopping,
}

/// Configuration plus everything observed while the session runs
#[derive(Debug, Clone, Default)]
pub struct CameraState {
    /// Caller intent
    pub config: CameraConfiguration,

    /// Cached video-input devices
    pub devices: Vec<DeviceDescriptor>,
    /// More than one camera is known
    pub has_multiple_devices: bool,
    /// Device behind the running stream
    pub active_device: Option<DeviceDescriptor>,
    /// Reconciled resolution of the running stream
    pub active_resolution: Option<Resolution>,

    /// Running stream
    pub stream: Option<Arc<dyn MediaStream>>,
    /// Stream started successfully and has not been stopped
    pub is_active: bool,
    /// `start_stream` in flight
    pub is_initializing: bool,
    /// `stop_stream` in flight
    pub is_stopping: bool,

    /// Capability snapshot of the running video track
    pub capabilities: Option<TrackCapabilities>,
    /// Settings applied through `update_settings`
    pub current_settings: Option<CameraSettings>,
    /// Torch capability present
    pub supports_torch: bool,
    /// Focus-mode capability present
    pub supports_focus: bool,
    /// Zoom capability present
    pub supports_zoom: bool,
    /// Torch currently on
    pub is_torch_enabled: bool,

    /// Last error reported by the controller
    pub error: Option<CameraError>,
    /// Last photo taken
    pub last_captured_image: Option<CapturedPhoto>,
}

impl CameraState {
    /// Lifecycle phase
    pub fn phase(&self) -> StreamPhase {
        if self.is_initializing {
            StreamPhase::Initializing
        } else if self.is_stopping {
            StreamPhase::Stopping
        } else if self.is_active {
            StreamPhase::Active
        } else {
            StreamPhase::Idle
        }
    }

    /// Shallow merge of a patch; every `Some` field overwrites.
    pub fn apply(&mut self, patch: StatePatch) {
        let StatePatch {
            config,
            devices,
            has_multiple_devices,
            active_device,
            active_resolution,
            stream,
            is_active,
            is_initializing,
            is_stopping,
            capabilities,
            current_settings,
            supports_torch,
            supports_focus,
            supports_zoom,
            is_torch_enabled,
            error,
            last_captured_image,
        } = patch;

        if let Some(config) = config {
            self.config.merge(&config);
        }
        if let Some(devices) = devices {
            self.devices = devices;
        }
        if let Some(v) = has_multiple_devices {
            self.has_multiple_devices = v;
        }
        if let Some(v) = active_device {
            self.active_device = v;
        }
        if let Some(v) = active_resolution {
            self.active_resolution = v;
        }
        if let Some(v) = stream {
            self.stream = v;
        }
        if let Some(v) = is_active {
            self.is_active = v;
        }
        if let Some(v) = is_initializing {
            self.is_initializing = v;
        }
        if let Some(v) = is_stopping {
            self.is_stopping = v;
        }
        if let Some(v) = capabilities {
            self.capabilities = v;
        }
        if let Some(v) = current_settings {
            self.current_settings = v;
        }
        if let Some(v) = supports_torch {
            self.supports_torch = v;
        }
        if let Some(v) = supports_focus {
            self.supports_focus = v;
        }
        if let Some(v) = supports_zoom {
            self.supports_zoom = v;
        }
        if let Some(v) = is_torch_enabled {
            self.is_torch_enabled = v;
        }
        if let Some(v) = error {
            self.error = v;
        }
        if let Some(v) = last_captured_image {
            self.last_captured_image = v;
        }
    }
}

/// Partial state update. `None` leaves a field untouched; for optional
/// fields `Some(None)` clears the value.
#[derive(Debug, Clone, Default)]
pub struct StatePatch {
    /// Configuration changes, merged field by field
    pub config: Option<ConfigPatch>,
    /// Device cache
    pub devices: Option<Vec<DeviceDescriptor>>,
    /// Multiple-device flag
    pub has_multiple_devices: Option<bool>,
    /// Active device
    pub active_device: Option<Option<DeviceDescriptor>>,
    /// Active resolution
    pub active_resolution: Option<Option<Resolution>>,
    /// Stream handle
    pub stream: Option<Option<Arc<dyn MediaStream>>>,
    /// Active flag
    pub is_active: Option<bool>,
    /// Initializing flag
    pub is_initializing: Option<bool>,
    /// Stopping flag
    pub is_stopping: Option<bool>,
    /// Capability snapshot
    pub capabilities: Option<Option<TrackCapabilities>>,
    /// Applied settings
    pub current_settings: Option<Option<CameraSettings>>,
    /// Torch support
    pub supports_torch: Option<bool>,
    /// Focus support
    pub supports_focus: Option<bool>,
    /// Zoom support
    pub supports_zoom: Option<bool>,
    /// Torch state
    pub is_torch_enabled: Option<bool>,
    /// Last error
    pub error: Option<Option<CameraError>>,
    /// Last photo
    pub last_captured_image: Option<Option<CapturedPhoto>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_initial_state() {
        let state = CameraState::default();
        assert!(state.devices.is_empty());
        assert!(!state.is_active);
        assert!(!state.is_initializing);
        assert!(state.stream.is_none());
        assert_eq!(state.phase(), StreamPhase::Idle);
    }

    #[test]
    fn test_apply_overwrites_only_named_fields() {
        let mut state = CameraState {
            supports_torch: true,
            ..Default::default()
        };

        state.apply(StatePatch {
            is_initializing: Some(true),
            error: Some(Some(CameraError::new(ErrorCode::Unknown, "x"))),
            ..Default::default()
        });

        assert!(state.is_initializing);
        assert!(state.supports_torch);
        assert_eq!(state.phase(), StreamPhase::Initializing);

        state.apply(StatePatch {
            is_initializing: Some(false),
            error: Some(None),
            ..Default::default()
        });
        assert!(state.error.is_none());
        assert_eq!(state.phase(), StreamPhase::Idle);
    }

    #[test]
    fn test_config_patch_merges_into_state() {
        let mut state = CameraState::default();
        state.apply(StatePatch {
            config: Some(ConfigPatch::mirroring(true)),
            ..Default::default()
        });
        assert!(state.config.enable_mirroring);
        assert!(!state.config.enable_audio);
    }
}

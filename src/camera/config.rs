//! Camera configuration

use crate::camera::types::{CameraType, Resolution};
use serde::{Deserialize, Serialize};

/// Camera configuration: what the caller wants from the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfiguration {
    /// Capture an audio track alongside the video
    pub enable_audio: bool,

    /// Pinned device id. When set, the facing-mode hint is not sent.
    pub selected_device_id: Option<String>,

    /// Facing preference used when no device is pinned
    pub camera_type: CameraType,

    /// Desired resolution
    pub target_resolution: Option<Resolution>,

    /// Resolution to request instead of the target when configured
    pub fallback_resolution: Option<Resolution>,

    /// Mirror the preview horizontally
    pub enable_mirroring: bool,

    /// Swap requested dimensions on touch-capable form factors
    pub enable_auto_rotation: bool,
}

impl Default for CameraConfiguration {
    fn default() -> Self {
        Self {
            enable_audio: false,
            selected_device_id: None,
            camera_type: CameraType::Front,
            target_resolution: None,
            fallback_resolution: None,
            enable_mirroring: false,
            enable_auto_rotation: false,
        }
    }
}

impl CameraConfiguration {
    /// Preset for a mirrored user-facing camera
    pub fn selfie() -> Self {
        Self {
            camera_type: CameraType::Front,
            target_resolution: Some(Resolution::named(1280, 720, "HD Landscape")),
            enable_mirroring: true,
            enable_auto_rotation: true,
            ..Default::default()
        }
    }

    /// Preset for document or QR scanning with the rear camera
    pub fn document_scan() -> Self {
        Self {
            camera_type: CameraType::Back,
            target_resolution: Some(Resolution::named(1920, 1080, "Full HD Landscape")),
            enable_auto_rotation: true,
            ..Default::default()
        }
    }

    /// Preset for low-end webcams
    pub fn compatible() -> Self {
        Self {
            fallback_resolution: Some(Resolution::named(640, 480, "VGA Landscape")),
            ..Default::default()
        }
    }

    /// Shallow later-wins merge of a patch into this configuration
    pub fn merge(&mut self, patch: &ConfigPatch) {
        if let Some(audio) = patch.enable_audio {
            self.enable_audio = audio;
        }
        if let Some(device) = &patch.selected_device_id {
            self.selected_device_id = device.clone();
        }
        if let Some(camera_type) = patch.camera_type {
            self.camera_type = camera_type;
        }
        if let Some(target) = &patch.target_resolution {
            self.target_resolution = target.clone();
        }
        if let Some(fallback) = &patch.fallback_resolution {
            self.fallback_resolution = fallback.clone();
        }
        if let Some(mirror) = patch.enable_mirroring {
            self.enable_mirroring = mirror;
        }
        if let Some(rotate) = patch.enable_auto_rotation {
            self.enable_auto_rotation = rotate;
        }
    }
}

/// Partial configuration. `None` leaves a field untouched; for optional
/// fields `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigPatch {
    /// Audio on/off
    pub enable_audio: Option<bool>,
    /// Pinned device id
    pub selected_device_id: Option<Option<String>>,
    /// Facing preference
    pub camera_type: Option<CameraType>,
    /// Desired resolution
    pub target_resolution: Option<Option<Resolution>>,
    /// Fallback resolution
    pub fallback_resolution: Option<Option<Resolution>>,
    /// Mirroring
    pub enable_mirroring: Option<bool>,
    /// Auto-rotation
    pub enable_auto_rotation: Option<bool>,
}

impl ConfigPatch {
    /// Patch that pins a device
    pub fn device(device_id: impl Into<String>) -> Self {
        Self {
            selected_device_id: Some(Some(device_id.into())),
            ..Default::default()
        }
    }

    /// Patch that changes the target resolution
    pub fn resolution(resolution: Resolution) -> Self {
        Self {
            target_resolution: Some(Some(resolution)),
            ..Default::default()
        }
    }

    /// Patch that changes the mirroring flag
    pub fn mirroring(enabled: bool) -> Self {
        Self {
            enable_mirroring: Some(enabled),
            ..Default::default()
        }
    }

    /// Patch that changes the facing preference
    pub fn camera_type(camera_type: CameraType) -> Self {
        Self {
            camera_type: Some(camera_type),
            ..Default::default()
        }
    }
}

impl From<CameraConfiguration> for ConfigPatch {
    /// A full configuration expressed as a patch that sets every field
    fn from(config: CameraConfiguration) -> Self {
        Self {
            enable_audio: Some(config.enable_audio),
            selected_device_id: Some(config.selected_device_id),
            camera_type: Some(config.camera_type),
            target_resolution: Some(config.target_resolution),
            fallback_resolution: Some(config.fallback_resolution),
            enable_mirroring: Some(config.enable_mirroring),
            enable_auto_rotation: Some(config.enable_auto_rotation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CameraConfiguration::default();
        assert_eq!(config.camera_type, CameraType::Front);
        assert!(config.target_resolution.is_none());
        assert!(!config.enable_audio);
    }

    #[test]
    fn test_selfie_preset() {
        let config = CameraConfiguration::selfie();
        assert!(config.enable_mirroring);
        assert_eq!(config.camera_type, CameraType::Front);
    }

    #[test]
    fn test_merge_is_shallow_and_later_wins() {
        let mut config = CameraConfiguration::document_scan();
        config.merge(&ConfigPatch {
            enable_mirroring: Some(true),
            selected_device_id: Some(Some("cam-2".into())),
            ..Default::default()
        });

        assert!(config.enable_mirroring);
        assert_eq!(config.selected_device_id.as_deref(), Some("cam-2"));
        assert_eq!(config.camera_type, CameraType::Back);
        assert_eq!(
            config.target_resolution.as_ref().map(|r| r.width),
            Some(1920)
        );

        config.merge(&ConfigPatch {
            selected_device_id: Some(None),
            ..Default::default()
        });
        assert!(config.selected_device_id.is_none());
    }

    #[test]
    fn test_full_config_round_trips_through_patch() {
        let source = CameraConfiguration::selfie();
        let mut target = CameraConfiguration::compatible();
        target.merge(&ConfigPatch::from(source.clone()));
        assert_eq!(target, source);
    }
}

//! Stream constraints and how they are derived from a [`CameraConfiguration`]

use crate::camera::config::CameraConfiguration;
use crate::camera::types::{FacingMode, FocusMode, Resolution, TrackSettings};
use serde::{Deserialize, Serialize};

/// Touch points above which the host is treated as a handheld device
pub const MOBILE_TOUCH_POINTS: u32 = 3;

/// Host form factor, inferred from touch capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormFactor {
    /// Mouse/keyboard host
    Desktop,
    /// Touch-first host (phone, tablet)
    Mobile,
}

impl FormFactor {
    /// Heuristic: more than three touch points means a handheld device.
    /// It is a guess, not a measurement of the sensor orientation.
    pub fn from_touch_points(max_touch_points: u32) -> Self {
        if max_touch_points > MOBILE_TOUCH_POINTS {
            FormFactor::Mobile
        } else {
            FormFactor::Desktop
        }
    }
}

/// A single constrained value, either mandatory or preferred
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Constrain<T> {
    /// The host must satisfy the value or fail
    Exact(T),
    /// The host should get as close as it can
    Ideal(T),
}

impl<T> Constrain<T> {
    /// The constrained value regardless of strength
    pub fn value(&self) -> &T {
        match self {
            Constrain::Exact(v) | Constrain::Ideal(v) => v,
        }
    }

    /// Whether the value is mandatory
    pub fn is_exact(&self) -> bool {
        matches!(self, Constrain::Exact(_))
    }
}

/// Advanced (best-effort) track properties
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AdvancedConstraint {
    /// Torch on/off
    Torch(bool),
    /// Focus mode
    FocusMode(FocusMode),
    /// Zoom level
    Zoom(f64),
}

/// Video track constraints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoConstraints {
    /// Device selection by id
    pub device_id: Option<Constrain<String>>,
    /// Device selection by facing hint
    pub facing_mode: Option<Constrain<FacingMode>>,
    /// Frame width
    pub width: Option<Constrain<u32>>,
    /// Frame height
    pub height: Option<Constrain<u32>>,
    /// Aspect ratio
    pub aspect_ratio: Option<Constrain<f64>>,
    /// Advanced property set
    pub advanced: Vec<AdvancedConstraint>,
}

impl VideoConstraints {
    /// Constraints that only carry advanced properties
    pub fn advanced(advanced: Vec<AdvancedConstraint>) -> Self {
        Self {
            advanced,
            ..Default::default()
        }
    }
}

/// Full stream request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaConstraints {
    /// Include an audio track
    pub audio: bool,
    /// Video constraints; `None` requests no video
    pub video: Option<VideoConstraints>,
}

impl MediaConstraints {
    /// `{ video: true }`
    pub fn any_video() -> Self {
        Self {
            audio: false,
            video: Some(VideoConstraints::default()),
        }
    }
}

/// Outcome of constraint construction
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintPlan {
    /// What will be sent to the device provider
    pub constraints: MediaConstraints,
    /// Resolution actually sent, after any orientation swap
    pub requested: Resolution,
    /// Whether `requested` came from the configuration rather than the 1280x720 default
    pub configured: bool,
}

impl ConstraintPlan {
    /// The requested resolution when one was configured
    pub fn configured_request(&self) -> Option<&Resolution> {
        self.configured.then_some(&self.requested)
    }
}

/// Swap width and height when auto-rotation is on and the host looks handheld
pub fn final_resolution(
    resolution: &Resolution,
    auto_rotate: bool,
    form_factor: FormFactor,
) -> Resolution {
    if auto_rotate && form_factor == FormFactor::Mobile {
        resolution.swapped()
    } else {
        resolution.clone()
    }
}

/// Build stream constraints for the given configuration.
///
/// The device is pinned by exact id when one is selected; otherwise the
/// facing-mode hint is sent. The two are never sent together.
pub fn build_constraints(
    config: &CameraConfiguration,
    use_fallback: bool,
    form_factor: FormFactor,
) -> ConstraintPlan {
    let configured = if use_fallback {
        config.fallback_resolution.as_ref()
    } else {
        config.target_resolution.as_ref()
    };
    let base = configured.cloned().unwrap_or_else(Resolution::default_request);
    let requested = final_resolution(&base, config.enable_auto_rotation, form_factor);

    let (device_id, facing_mode) = match config.selected_device_id.as_deref() {
        Some(id) if !id.is_empty() => (Some(Constrain::Exact(id.to_string())), None),
        _ => (
            None,
            Some(Constrain::Ideal(config.camera_type.facing_mode())),
        ),
    };

    let video = VideoConstraints {
        device_id,
        facing_mode,
        width: Some(Constrain::Exact(requested.width)),
        height: Some(Constrain::Exact(requested.height)),
        aspect_ratio: None,
        advanced: Vec::new(),
    };

    ConstraintPlan {
        constraints: MediaConstraints {
            audio: config.enable_audio,
            video: Some(video),
        },
        requested,
        configured: configured.is_some(),
    }
}

fn differs<T: PartialEq>(current: Option<&T>, wanted: Option<&Constrain<T>>) -> bool {
    match wanted {
        None => false,
        Some(constraint) => current != Some(constraint.value()),
    }
}

/// Compare a live track against freshly built constraints along width,
/// height, facing mode and aspect ratio. Unconstrained dimensions never count.
pub fn has_settings_changed(current: &TrackSettings, wanted: &VideoConstraints) -> bool {
    differs(current.width.as_ref(), wanted.width.as_ref())
        || differs(current.height.as_ref(), wanted.height.as_ref())
        || differs(current.facing_mode.as_ref(), wanted.facing_mode.as_ref())
        || differs(current.aspect_ratio.as_ref(), wanted.aspect_ratio.as_ref())
}

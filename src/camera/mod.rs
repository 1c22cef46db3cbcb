//! Camera session control
//!
//! A [`CameraController`] wraps host device enumeration, permission queries
//! and media streams behind one stateful object. It negotiates resolutions
//! (including orientation-aware dimension swapping), probes torch, focus and
//! zoom support, mirrors the preview and captures stills.
//!
//! The host side is reached only through the traits in [`provider`]; the
//! [`crate::simulator`] module implements all of them in memory.

pub mod capture;
pub mod config;
pub mod constraints;
pub mod controller;
pub mod events;
pub mod provider;
pub mod reconcile;
pub mod specs;
pub mod state;
pub mod types;

pub use capture::{CaptureOptions, CapturedPhoto, calculate_scaled_size};
pub use config::{CameraConfiguration, ConfigPatch};
pub use constraints::{
    AdvancedConstraint, Constrain, ConstraintPlan, FormFactor, MediaConstraints, VideoConstraints,
};
pub use controller::{CameraController, ControllerOptions, next_device_in};
pub use events::{CameraEvent, EventKind, SubscriptionId};
pub use provider::{
    CaptureSurface, DeviceProvider, DrawTransform, EncodedImage, MediaStream, MediaTrack,
    PermissionProvider, PreviewSink, TrackKind, VideoFrame,
};
pub use reconcile::{Reconciliation, reconcile_actual_resolution, should_swap_dimensions};
pub use specs::{check_supported_resolutions_from_specs, is_resolution_supported_from_specs};
pub use state::{CameraState, StatePatch, StreamPhase};
pub use types::{
    CameraSettings, CameraType, DeviceDescriptor, DeviceKind, FacingMode, FocusMode, ImageType,
    MaxResolution, NumericRange, PermissionName, PermissionResponse, PermissionState,
    PermissionStatus, Resolution, ResolutionSupport, STANDARD_RESOLUTIONS, TrackCapabilities,
    TrackSettings, standard_resolutions,
};

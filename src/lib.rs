//! camkit - stateful camera session controller
//!
//! camkit puts device enumeration, permission queries and media streams
//! behind one controller object that owns the whole session state.
//!
//! # Features
//!
//! - **Resolution negotiation**: exact-size requests with an optional
//!   fallback, orientation-aware dimension swapping on handheld devices and
//!   reconciliation of what the device actually delivered
//! - **Capability probing**: torch, focus and zoom support, plus a survey of
//!   each camera's maximum resolution
//! - **Photo capture**: scaled, optionally mirrored PNG/JPEG stills as data URIs
//! - **Observers**: typed lifecycle events with owned state snapshots
//! - **Simulator**: an in-memory rig implementing every host trait
//!
//! # Example
//!
//! ```no_run
//! use camkit::simulator::{RigSpec, VirtualSession};
//! use camkit::{CameraConfiguration, CaptureOptions, Resolution};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let session = VirtualSession::new(RigSpec::phone());
//!     let mut controller = session.controller();
//!
//!     controller
//!         .initialize(CameraConfiguration {
//!             target_resolution: Some(Resolution::new(1280, 720)),
//!             enable_auto_rotation: true,
//!             ..Default::default()
//!         })
//!         .await?;
//!
//!     let photo = controller.take_photo(&CaptureOptions::default())?;
//!     println!("Captured {}x{} ({} bytes)", photo.width, photo.height, photo.bytes.len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs, rust_2024_compatibility)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod camera;
pub mod config;
pub mod error;
pub mod logging;

#[cfg(feature = "simulator")]
#[cfg_attr(docsrs, doc(cfg(feature = "simulator")))]
pub mod simulator;

// Re-exports for convenience
pub use error::{CameraError, CameraResult, Error, ErrorCode, PlatformError, Result};

pub use camera::{
    CameraConfiguration, CameraController, CameraEvent, CameraSettings, CameraState, CameraType,
    CaptureOptions, CapturedPhoto, ConfigPatch, ControllerOptions, DeviceDescriptor, EventKind,
    ImageType, MaxResolution, PermissionResponse, PermissionStatus, Resolution, SubscriptionId,
};
pub use config::{CamkitConfig, CameraOptions, ControllerSettings, LogRotation, LoggingOptions};

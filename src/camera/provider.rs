//! Narrow interfaces onto the host capabilities the controller drives
//!
//! The controller never talks to a platform directly. It enumerates and
//! opens devices through a [`DeviceProvider`], asks for permission state
//! through a [`PermissionProvider`], shows frames through a [`PreviewSink`]
//! and encodes stills through a [`CaptureSurface`]. Every failure crosses
//! these traits as a [`PlatformError`] and is classified once, on the
//! controller side of the boundary.

use crate::camera::constraints::{FormFactor, MediaConstraints, VideoConstraints};
use crate::camera::types::{
    DeviceDescriptor, ImageType, PermissionName, PermissionState, TrackCapabilities,
    TrackSettings,
};
use crate::error::PlatformError;
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;

/// Kind of a single track within a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    /// Video channel
    Video,
    /// Audio channel
    Audio,
}

/// Enumerates devices and acquires streams
#[async_trait]
pub trait DeviceProvider: Send + Sync {
    /// Whether the host exposes device enumeration and stream acquisition at all
    fn is_supported(&self) -> bool {
        true
    }

    /// Maximum simultaneous touch points the host reports
    fn max_touch_points(&self) -> u32 {
        0
    }

    /// Host form factor derived from [`DeviceProvider::max_touch_points`]
    fn form_factor(&self) -> FormFactor {
        FormFactor::from_touch_points(self.max_touch_points())
    }

    /// List every media device currently known to the host
    async fn enumerate(&self) -> Result<Vec<DeviceDescriptor>, PlatformError>;

    /// Acquire a stream satisfying `constraints`
    async fn open_stream(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<Arc<dyn MediaStream>, PlatformError>;
}

/// Answers permission queries
#[async_trait]
pub trait PermissionProvider: Send + Sync {
    /// Current state of the named permission
    async fn query(&self, name: PermissionName) -> Result<PermissionState, PlatformError>;
}

/// An open media stream
pub trait MediaStream: Send + Sync {
    /// Stream identifier
    fn id(&self) -> &str;

    /// Every track in the stream
    fn tracks(&self) -> Vec<Arc<dyn MediaTrack>>;

    /// First video track, if any
    fn video_track(&self) -> Option<Arc<dyn MediaTrack>> {
        self.tracks()
            .into_iter()
            .find(|track| track.kind() == TrackKind::Video)
    }
}

impl fmt::Debug for dyn MediaStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaStream")
            .field("id", &self.id())
            .field("tracks", &self.tracks().len())
            .finish()
    }
}

/// One audio or video channel within a stream
#[async_trait]
pub trait MediaTrack: Send + Sync {
    /// Track kind
    fn kind(&self) -> TrackKind;

    /// Values currently in effect
    fn settings(&self) -> TrackSettings;

    /// What the device could be constrained to
    fn capabilities(&self) -> TrackCapabilities;

    /// Reconstrain the live track
    async fn apply_constraints(&self, constraints: &VideoConstraints) -> Result<(), PlatformError>;

    /// Release the underlying device
    fn stop(&self);

    /// Whether [`MediaTrack::stop`] has been called
    fn is_stopped(&self) -> bool;
}

/// Raw RGBA frame grabbed from the preview
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Tightly packed RGBA8 pixels
    pub rgba: Bytes,
}

/// Live preview surface
#[async_trait]
pub trait PreviewSink: Send + Sync {
    /// Assign a stream and resolve once its metadata is available
    async fn attach(&self, stream: Arc<dyn MediaStream>) -> Result<(), PlatformError>;

    /// Clear the preview source
    fn detach(&self) -> Result<(), PlatformError>;

    /// Apply or remove the horizontal flip
    fn set_mirrored(&self, mirrored: bool);

    /// Natural size of the video currently shown
    fn natural_size(&self) -> (u32, u32);

    /// Grab the frame currently shown
    fn current_frame(&self) -> Result<VideoFrame, PlatformError>;
}

/// Placement of a frame on the capture surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawTransform {
    /// Destination width
    pub width: u32,
    /// Destination height
    pub height: u32,
    /// Flip horizontally
    pub mirror: bool,
}

/// Encoded still image
#[derive(Debug, Clone)]
pub struct EncodedImage {
    /// MIME type of `data`
    pub mime: String,
    /// Encoded bytes
    pub data: Bytes,
}

/// Offscreen 2D surface used to turn a preview frame into an encoded still
pub trait CaptureSurface: Send + Sync {
    /// Resize the surface, clearing its contents
    fn set_size(&self, width: u32, height: u32);

    /// Whether a 2D drawing context can be obtained
    fn has_context(&self) -> bool;

    /// Draw `frame` scaled into the surface
    fn draw(&self, frame: &VideoFrame, transform: DrawTransform) -> Result<(), PlatformError>;

    /// Encode the surface contents. `quality` is in `[0, 1]` and only affects lossy formats.
    fn encode(&self, image_type: ImageType, quality: f32) -> Result<EncodedImage, PlatformError>;
}

//! In-memory camera rig implementing every provider trait
//!
//! A [`RigSpec`] describes the host: which cameras exist, what they can
//! deliver, which permission answers to give and which failures to inject.
//! [`VirtualRig`] serves enumeration, stream acquisition and permission
//! queries from it, [`VirtualPreview`] renders a deterministic test pattern
//! for whatever stream it shows, and [`VirtualCanvas`] scales, mirrors and
//! encodes frames with the `image` crate.

use crate::camera::{
    AdvancedConstraint, CameraController, CaptureSurface, Constrain, DeviceDescriptor, DeviceKind,
    DeviceProvider, DrawTransform, EncodedImage, FacingMode, FocusMode, ImageType,
    MediaConstraints, MediaStream, MediaTrack, NumericRange, PermissionName, PermissionProvider,
    PermissionState, PreviewSink, TrackCapabilities, TrackKind, TrackSettings, VideoConstraints,
    VideoFrame,
};
use crate::error::{Error, PlatformError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// One virtual media device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VirtualDeviceSpec {
    /// Device id
    pub id: String,
    /// Label
    pub label: String,
    /// Device kind
    pub kind: DeviceKind,
    /// Facing mode reported by the track
    pub facing: Option<FacingMode>,
    /// Largest width in landscape orientation
    pub max_width: u32,
    /// Largest height in landscape orientation
    pub max_height: u32,
    /// Torch capability
    pub torch: bool,
    /// Advertised focus modes
    pub focus_modes: Vec<FocusMode>,
    /// Zoom range
    pub zoom: Option<NumericRange>,
    /// Deliver frames with width and height exchanged
    pub rotated: bool,
    /// Platform error name raised when this device is opened
    pub open_error: Option<String>,
    /// Platform error name raised by constraint updates on its tracks
    pub constraint_error: Option<String>,
    /// Delay before the device answers an open request
    pub open_delay_ms: u64,
}

impl Default for VirtualDeviceSpec {
    fn default() -> Self {
        Self {
            id: "virtual-camera".to_string(),
            label: "Virtual Camera".to_string(),
            kind: DeviceKind::VideoInput,
            facing: None,
            max_width: 1920,
            max_height: 1080,
            torch: false,
            focus_modes: Vec::new(),
            zoom: None,
            rotated: false,
            open_error: None,
            constraint_error: None,
            open_delay_ms: 0,
        }
    }
}

impl VirtualDeviceSpec {
    /// Camera with the given id, label and facing mode
    pub fn camera(id: &str, label: &str, facing: Option<FacingMode>) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            facing,
            ..Default::default()
        }
    }

    /// Microphone with the given id and label
    pub fn microphone(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            kind: DeviceKind::AudioInput,
            ..Default::default()
        }
    }

    fn descriptor(&self) -> DeviceDescriptor {
        DeviceDescriptor {
            device_id: self.id.clone(),
            label: self.label.clone(),
            kind: self.kind,
        }
    }

    /// Whether `width`x`height` fits in either orientation
    fn fits(&self, width: u32, height: u32) -> bool {
        (width <= self.max_width && height <= self.max_height)
            || (width <= self.max_height && height <= self.max_width)
    }

    fn capabilities(&self) -> TrackCapabilities {
        let long_side = self.max_width.max(self.max_height) as f64;
        TrackCapabilities {
            facing_mode: self.facing.into_iter().collect(),
            width: Some(NumericRange {
                min: 1.0,
                max: long_side,
            }),
            height: Some(NumericRange {
                min: 1.0,
                max: long_side,
            }),
            torch: self.torch.then_some(true),
            focus_mode: (!self.focus_modes.is_empty()).then(|| self.focus_modes.clone()),
            zoom: self.zoom,
        }
    }
}

/// Host description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigSpec {
    /// Host exposes device enumeration and stream acquisition
    pub media_devices: bool,
    /// Host exposes a permissions API
    pub permissions_api: bool,
    /// Reported touch points; more than three means handheld
    pub max_touch_points: u32,
    /// Camera permission answer
    pub camera_permission: PermissionState,
    /// Microphone permission answer; `None` makes the query fail with `TypeError`
    pub microphone_permission: Option<PermissionState>,
    /// Refuse every stream request with `NotAllowedError`
    pub deny_access: bool,
    /// Devices
    pub devices: Vec<VirtualDeviceSpec>,
}

impl Default for RigSpec {
    fn default() -> Self {
        Self {
            media_devices: true,
            permissions_api: true,
            max_touch_points: 0,
            camera_permission: PermissionState::Granted,
            microphone_permission: Some(PermissionState::Prompt),
            deny_access: false,
            devices: Vec::new(),
        }
    }
}

impl RigSpec {
    /// Desktop with a single 1080p webcam
    pub fn laptop() -> Self {
        Self {
            devices: vec![VirtualDeviceSpec::camera(
                "integrated",
                "Integrated Webcam",
                Some(FacingMode::User),
            )],
            ..Default::default()
        }
    }

    /// Touch device with a front camera and a torch-capable rear camera
    pub fn phone() -> Self {
        Self {
            max_touch_points: 5,
            devices: vec![
                VirtualDeviceSpec::camera("front", "Front Camera", Some(FacingMode::User)),
                VirtualDeviceSpec {
                    torch: true,
                    focus_modes: vec![FocusMode::Continuous, FocusMode::Manual],
                    zoom: Some(NumericRange { min: 1.0, max: 8.0 }),
                    max_width: 3840,
                    max_height: 2160,
                    ..VirtualDeviceSpec::camera("back", "Back Camera", Some(FacingMode::Environment))
                },
                VirtualDeviceSpec::microphone("mic", "Microphone"),
            ],
            ..Default::default()
        }
    }

    /// Load a rig description from a toml or yaml file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Rig(format!("Failed to read {}: {e}", path.display())))?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        Self::parse(&contents, &extension)
            .map_err(|e| Error::Rig(format!("{}: {e}", path.display())))
    }

    /// Parse a rig description; `format` is `toml`, `yaml` or `yml`
    pub fn parse(contents: &str, format: &str) -> std::result::Result<Self, String> {
        match format {
            "toml" => toml::from_str(contents).map_err(|e| format!("invalid TOML: {e}")),
            "yaml" | "yml" => serde_yaml::from_str(contents).map_err(|e| format!("invalid YAML: {e}")),
            other => Err(format!("unsupported rig format '{other}', expected toml/yaml")),
        }
    }
}

fn platform(name: &str, message: impl Into<String>) -> PlatformError {
    PlatformError::new(name, message)
}

/// Pick the delivered size for one open or reconstrain request
fn negotiate_size(
    device: &VirtualDeviceSpec,
    video: &VideoConstraints,
) -> std::result::Result<(u32, u32), PlatformError> {
    let exact_w = video.width.as_ref().filter(|c| c.is_exact()).map(|c| *c.value());
    let exact_h = video.height.as_ref().filter(|c| c.is_exact()).map(|c| *c.value());

    if let (Some(w), Some(h)) = (exact_w, exact_h) {
        if !device.fits(w, h) {
            return Err(platform(
                "OverconstrainedError",
                format!("{} cannot deliver {w}x{h}", device.label),
            ));
        }
    }
    let long_side = device.max_width.max(device.max_height);
    if exact_w.is_some_and(|w| w > long_side) || exact_h.is_some_and(|h| h > long_side) {
        return Err(platform(
            "OverconstrainedError",
            format!("{} cannot satisfy the exact size", device.label),
        ));
    }

    let width = match &video.width {
        Some(Constrain::Exact(w)) => *w,
        Some(Constrain::Ideal(w)) => (*w).min(device.max_width),
        None => device.max_width.min(1280),
    };
    let height = match &video.height {
        Some(Constrain::Exact(h)) => *h,
        Some(Constrain::Ideal(h)) => (*h).min(device.max_height),
        None => device.max_height.min(720),
    };
    Ok((width, height))
}

/// Virtual host: device enumeration, stream acquisition and permission answers
#[derive(Debug, Default)]
pub struct VirtualRig {
    spec: Mutex<RigSpec>,
    tracks: Mutex<Vec<Arc<VirtualTrack>>>,
    opens: AtomicUsize,
    last_constraints: Mutex<Option<MediaConstraints>>,
}

impl VirtualRig {
    /// Rig serving `spec`
    pub fn new(spec: RigSpec) -> Self {
        Self {
            spec: Mutex::new(spec),
            ..Default::default()
        }
    }

    /// Copy of the current description
    pub fn spec(&self) -> RigSpec {
        self.spec.lock().expect("rig spec mutex poisoned").clone()
    }

    /// Mutate the description in place (hot-plugging, permission changes, ...)
    pub fn update<F: FnOnce(&mut RigSpec)>(&self, change: F) {
        change(&mut self.spec.lock().expect("rig spec mutex poisoned"));
    }

    /// Number of stream requests served, successful or not
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Constraints of the most recent stream request
    pub fn last_constraints(&self) -> Option<MediaConstraints> {
        self.last_constraints
            .lock()
            .expect("constraints mutex poisoned")
            .clone()
    }

    /// Tracks handed out that have not been stopped
    pub fn live_tracks(&self) -> usize {
        self.tracks
            .lock()
            .expect("track registry mutex poisoned")
            .iter()
            .filter(|t| !t.is_stopped())
            .count()
    }

    fn select_device(
        spec: &RigSpec,
        video: &VideoConstraints,
    ) -> std::result::Result<VirtualDeviceSpec, PlatformError> {
        let cameras: Vec<&VirtualDeviceSpec> = spec
            .devices
            .iter()
            .filter(|d| d.kind == DeviceKind::VideoInput)
            .collect();
        let first = cameras
            .first()
            .copied()
            .ok_or_else(|| platform("NotFoundError", "Requested device not found"))?;

        if let Some(device_id) = &video.device_id {
            let found = cameras.iter().find(|d| d.id == *device_id.value()).copied();
            return match (found, device_id) {
                (Some(device), _) => Ok(device.clone()),
                (None, Constrain::Exact(id)) => Err(platform(
                    "NotFoundError",
                    format!("No camera with id '{id}'"),
                )),
                (None, Constrain::Ideal(_)) => Ok(first.clone()),
            };
        }

        if let Some(facing) = &video.facing_mode {
            let found = cameras.iter().find(|d| d.facing == Some(*facing.value())).copied();
            return match (found, facing) {
                (Some(device), _) => Ok(device.clone()),
                (None, Constrain::Exact(mode)) => Err(platform(
                    "OverconstrainedError",
                    format!("No camera facing '{mode}'"),
                )),
                (None, Constrain::Ideal(_)) => Ok(first.clone()),
            };
        }

        Ok(first.clone())
    }
}

#[async_trait]
impl DeviceProvider for VirtualRig {
    fn is_supported(&self) -> bool {
        self.spec().media_devices
    }

    fn max_touch_points(&self) -> u32 {
        self.spec().max_touch_points
    }

    async fn enumerate(&self) -> std::result::Result<Vec<DeviceDescriptor>, PlatformError> {
        let spec = self.spec();
        if !spec.media_devices {
            return Err(platform("NotSupportedError", "enumerateDevices is unavailable"));
        }
        Ok(spec.devices.iter().map(VirtualDeviceSpec::descriptor).collect())
    }

    async fn open_stream(
        &self,
        constraints: &MediaConstraints,
    ) -> std::result::Result<Arc<dyn MediaStream>, PlatformError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        *self
            .last_constraints
            .lock()
            .expect("constraints mutex poisoned") = Some(constraints.clone());

        let spec = self.spec();
        if !spec.media_devices {
            return Err(platform("NotSupportedError", "getUserMedia is unavailable"));
        }
        let Some(video) = constraints.video.as_ref() else {
            return Err(platform("TypeError", "At least one of audio and video must be requested"));
        };
        if spec.deny_access {
            return Err(platform("NotAllowedError", "Permission denied"));
        }

        let device = Self::select_device(&spec, video)?;
        if device.open_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(device.open_delay_ms)).await;
        }
        if let Some(name) = &device.open_error {
            return Err(platform(name, format!("Injected failure opening {}", device.label)));
        }

        let (width, height) = negotiate_size(&device, video)?;
        let (width, height) = if device.rotated {
            (height, width)
        } else {
            (width, height)
        };
        tracing::debug!(device = %device.id, width, height, "Virtual stream opened");

        let mut tracks = vec![Arc::new(VirtualTrack::video(device, width, height))];
        if constraints.audio {
            tracks.push(Arc::new(VirtualTrack::audio()));
        }
        self.tracks
            .lock()
            .expect("track registry mutex poisoned")
            .extend(tracks.iter().cloned());

        Ok(Arc::new(VirtualStream {
            id: Uuid::new_v4().to_string(),
            tracks,
        }))
    }
}

#[async_trait]
impl PermissionProvider for VirtualRig {
    async fn query(&self, name: PermissionName) -> std::result::Result<PermissionState, PlatformError> {
        let spec = self.spec();
        match name {
            PermissionName::Camera => Ok(spec.camera_permission),
            PermissionName::Microphone => spec.microphone_permission.ok_or_else(|| {
                platform("TypeError", "'microphone' is not a valid permission name")
            }),
        }
    }
}

/// Stream handed out by the rig
#[derive(Debug)]
pub struct VirtualStream {
    id: String,
    tracks: Vec<Arc<VirtualTrack>>,
}

impl MediaStream for VirtualStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn tracks(&self) -> Vec<Arc<dyn MediaTrack>> {
        self.tracks
            .iter()
            .map(|track| Arc::clone(track) as Arc<dyn MediaTrack>)
            .collect()
    }
}

/// Track handed out by the rig
#[derive(Debug)]
pub struct VirtualTrack {
    kind: TrackKind,
    device: Option<VirtualDeviceSpec>,
    settings: Mutex<TrackSettings>,
    stopped: AtomicBool,
}

impl VirtualTrack {
    fn video(device: VirtualDeviceSpec, width: u32, height: u32) -> Self {
        let settings = TrackSettings {
            device_id: Some(device.id.clone()),
            width: Some(width),
            height: Some(height),
            aspect_ratio: (height > 0).then(|| width as f64 / height as f64),
            facing_mode: device.facing,
            frame_rate: Some(30.0),
            ..Default::default()
        };
        Self {
            kind: TrackKind::Video,
            device: Some(device),
            settings: Mutex::new(settings),
            stopped: AtomicBool::new(false),
        }
    }

    fn audio() -> Self {
        Self {
            kind: TrackKind::Audio,
            device: None,
            settings: Mutex::new(TrackSettings::default()),
            stopped: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl MediaTrack for VirtualTrack {
    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn settings(&self) -> TrackSettings {
        self.settings.lock().expect("track settings mutex poisoned").clone()
    }

    fn capabilities(&self) -> TrackCapabilities {
        self.device
            .as_ref()
            .map(VirtualDeviceSpec::capabilities)
            .unwrap_or_default()
    }

    async fn apply_constraints(
        &self,
        constraints: &VideoConstraints,
    ) -> std::result::Result<(), PlatformError> {
        if self.is_stopped() {
            return Err(platform("InvalidStateError", "Track has ended"));
        }
        let Some(device) = self.device.as_ref() else {
            return Err(platform("OverconstrainedError", "Audio tracks take no video constraints"));
        };
        if let Some(name) = &device.constraint_error {
            return Err(platform(name, "Injected constraint failure"));
        }

        let resize = constraints.width.is_some() || constraints.height.is_some();
        let size = if resize {
            Some(negotiate_size(device, constraints)?)
        } else {
            None
        };

        let mut settings = self.settings.lock().expect("track settings mutex poisoned");
        if let Some((width, height)) = size {
            settings.width = Some(width);
            settings.height = Some(height);
            settings.aspect_ratio = (height > 0).then(|| width as f64 / height as f64);
        }
        for advanced in &constraints.advanced {
            match advanced {
                AdvancedConstraint::Torch(on) if device.torch => settings.torch = Some(*on),
                AdvancedConstraint::FocusMode(mode) if device.focus_modes.contains(mode) => {
                    settings.focus_mode = Some(*mode)
                }
                AdvancedConstraint::Zoom(level) => {
                    if let Some(range) = device.zoom {
                        settings.zoom = Some(level.clamp(range.min, range.max));
                    }
                }
                // Unsupported advanced values are ignored, as hosts do.
                _ => {}
            }
        }
        Ok(())
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct PreviewState {
    stream: Option<Arc<dyn MediaStream>>,
    mirrored: bool,
    stall_metadata: bool,
    detach_error: Option<String>,
}

/// Preview surface that renders a test pattern at the stream's delivered size
#[derive(Default)]
pub struct VirtualPreview {
    state: Mutex<PreviewState>,
}

impl std::fmt::Debug for VirtualPreview {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualPreview")
            .field("attached", &self.is_attached())
            .field("mirrored", &self.is_mirrored())
            .finish()
    }
}

impl VirtualPreview {
    /// Empty preview
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PreviewState> {
        self.state.lock().expect("preview mutex poisoned")
    }

    /// Whether a stream is shown
    pub fn is_attached(&self) -> bool {
        self.lock().stream.is_some()
    }

    /// Whether the horizontal flip is applied
    pub fn is_mirrored(&self) -> bool {
        self.lock().mirrored
    }

    /// Never report metadata for streams attached from now on
    pub fn stall_metadata(&self, stall: bool) {
        self.lock().stall_metadata = stall;
    }

    /// Fail `detach` with the given platform error name
    pub fn fail_detach(&self, name: Option<&str>) {
        self.lock().detach_error = name.map(str::to_string);
    }
}

#[async_trait]
impl PreviewSink for VirtualPreview {
    async fn attach(&self, stream: Arc<dyn MediaStream>) -> std::result::Result<(), PlatformError> {
        let stall = {
            let mut state = self.lock();
            state.stream = Some(stream);
            state.stall_metadata
        };
        if stall {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    fn detach(&self) -> std::result::Result<(), PlatformError> {
        let mut state = self.lock();
        if let Some(name) = &state.detach_error {
            return Err(platform(name, "Injected detach failure"));
        }
        state.stream = None;
        Ok(())
    }

    fn set_mirrored(&self, mirrored: bool) {
        self.lock().mirrored = mirrored;
    }

    fn natural_size(&self) -> (u32, u32) {
        self.lock()
            .stream
            .as_ref()
            .and_then(|stream| stream.video_track())
            .map(|track| {
                let settings = track.settings();
                (settings.width.unwrap_or(0), settings.height.unwrap_or(0))
            })
            .unwrap_or((0, 0))
    }

    fn current_frame(&self) -> std::result::Result<VideoFrame, PlatformError> {
        let (width, height) = self.natural_size();
        if width == 0 || height == 0 {
            return Err(platform("InvalidStateError", "Preview has no video"));
        }

        let pattern = RgbaImage::from_fn(width, height, |x, y| {
            image::Rgba([
                (x * 255 / width) as u8,
                (y * 255 / height) as u8,
                128,
                255,
            ])
        });
        Ok(VideoFrame {
            width,
            height,
            rgba: Bytes::from(pattern.into_raw()),
        })
    }
}

/// Offscreen surface backed by an RGBA buffer
#[derive(Debug)]
pub struct VirtualCanvas {
    buffer: Mutex<RgbaImage>,
    context: AtomicBool,
}

impl Default for VirtualCanvas {
    fn default() -> Self {
        Self {
            buffer: Mutex::new(RgbaImage::new(0, 0)),
            context: AtomicBool::new(true),
        }
    }
}

impl VirtualCanvas {
    /// Canvas with a working 2D context
    pub fn new() -> Self {
        Self::default()
    }

    /// Make 2D context acquisition fail or succeed
    pub fn set_context_available(&self, available: bool) {
        self.context.store(available, Ordering::SeqCst);
    }

    /// Copy of the current pixels
    pub fn pixels(&self) -> RgbaImage {
        self.buffer.lock().expect("canvas mutex poisoned").clone()
    }
}

impl CaptureSurface for VirtualCanvas {
    fn set_size(&self, width: u32, height: u32) {
        *self.buffer.lock().expect("canvas mutex poisoned") = RgbaImage::new(width, height);
    }

    fn has_context(&self) -> bool {
        self.context.load(Ordering::SeqCst)
    }

    fn draw(&self, frame: &VideoFrame, transform: DrawTransform) -> std::result::Result<(), PlatformError> {
        if transform.width == 0 || transform.height == 0 {
            return Err(platform("IndexSizeError", "Canvas has no area"));
        }
        let source = RgbaImage::from_raw(frame.width, frame.height, frame.rgba.to_vec())
            .ok_or_else(|| platform("InvalidStateError", "Frame buffer does not match its size"))?;

        let mut scaled = imageops::resize(&source, transform.width, transform.height, FilterType::Triangle);
        if transform.mirror {
            imageops::flip_horizontal_in_place(&mut scaled);
        }
        *self.buffer.lock().expect("canvas mutex poisoned") = scaled;
        Ok(())
    }

    fn encode(&self, image_type: ImageType, quality: f32) -> std::result::Result<EncodedImage, PlatformError> {
        let buffer = self.pixels();
        let encoding = |e: image::ImageError| platform("EncodingError", e.to_string());

        let data = match image_type {
            ImageType::Png => {
                let mut out = Cursor::new(Vec::new());
                DynamicImage::ImageRgba8(buffer)
                    .write_to(&mut out, ImageFormat::Png)
                    .map_err(encoding)?;
                out.into_inner()
            }
            ImageType::Jpeg => {
                let quality = (quality.clamp(0.0, 1.0) * 100.0).round().max(1.0) as u8;
                let rgb = DynamicImage::ImageRgba8(buffer).to_rgb8();
                let mut out = Vec::new();
                JpegEncoder::new_with_quality(&mut out, quality)
                    .encode_image(&rgb)
                    .map_err(encoding)?;
                out
            }
        };

        Ok(EncodedImage {
            mime: image_type.mime().to_string(),
            data: Bytes::from(data),
        })
    }
}

/// A rig plus its preview and canvas, ready to hand to a controller
#[derive(Debug, Clone)]
pub struct VirtualSession {
    /// Device and permission provider
    pub rig: Arc<VirtualRig>,
    /// Preview sink
    pub preview: Arc<VirtualPreview>,
    /// Capture surface
    pub canvas: Arc<VirtualCanvas>,
}

impl VirtualSession {
    /// Session over `spec`
    pub fn new(spec: RigSpec) -> Self {
        Self {
            rig: Arc::new(VirtualRig::new(spec)),
            preview: Arc::new(VirtualPreview::new()),
            canvas: Arc::new(VirtualCanvas::new()),
        }
    }

    /// Controller wired to every part of this session. The permission
    /// provider is left out when the rig has no permissions API.
    pub fn controller(&self) -> CameraController {
        let controller = CameraController::new(self.rig.clone())
            .with_preview(self.preview.clone())
            .with_capture_surface(self.canvas.clone());
        if self.rig.spec().permissions_api {
            controller.with_permission_provider(self.rig.clone())
        } else {
            controller
        }
    }
}

//! Value types shared by the controller and the provider traits

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of media input reported by device enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// Camera
    VideoInput,
    /// Microphone
    AudioInput,
    /// Speaker or headset
    AudioOutput,
}

/// A media device as reported by one enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Opaque device identifier
    pub device_id: String,
    /// Human readable label (may be empty before permission is granted)
    pub label: String,
    /// Device kind
    pub kind: DeviceKind,
}

impl DeviceDescriptor {
    /// Convenience constructor for a camera descriptor
    pub fn video(device_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            label: label.into(),
            kind: DeviceKind::VideoInput,
        }
    }
}

/// Frame dimensions, used both as a request and as an observed value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Optional display name (e.g. "HD Landscape")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Resolution {
    /// Unnamed resolution
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            name: None,
        }
    }

    /// Named resolution
    pub fn named(width: u32, height: u32, name: impl Into<String>) -> Self {
        Self {
            width,
            height,
            name: Some(name.into()),
        }
    }

    /// Same name, width and height exchanged
    pub fn swapped(&self) -> Self {
        Self {
            width: self.height,
            height: self.width,
            name: self.name.clone(),
        }
    }

    /// Width over height, `None` for a degenerate height
    pub fn aspect_ratio(&self) -> Option<f64> {
        (self.height > 0).then(|| self.width as f64 / self.height as f64)
    }

    /// Whether the pixel dimensions are equal, ignoring the name
    pub fn same_dimensions(&self, other: &Resolution) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// The 1280x720 request used when nothing was configured
    pub fn default_request() -> Self {
        Self::named(1280, 720, "720p")
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = String;

    /// Parses `WIDTHxHEIGHT` (also accepts `*` or `X` as separator)
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let (w, h) = trimmed
            .split_once(['x', 'X', '*'])
            .ok_or_else(|| format!("Expected WIDTHxHEIGHT, got '{trimmed}'"))?;
        let width = w
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("Invalid width '{w}': {e}"))?;
        let height = h
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("Invalid height '{h}': {e}"))?;
        if width == 0 || height == 0 {
            return Err(format!("Resolution '{trimmed}' must be non-zero"));
        }
        Ok(Resolution::new(width, height))
    }
}

/// Logical camera preference used when no device id is pinned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraType {
    /// User-facing camera
    #[default]
    Front,
    /// Environment-facing camera
    Back,
}

impl CameraType {
    /// Facing-mode hint sent to the device provider
    pub fn facing_mode(self) -> FacingMode {
        match self {
            CameraType::Front => FacingMode::User,
            CameraType::Back => FacingMode::Environment,
        }
    }

    /// Camera type implied by an observed facing mode
    pub fn from_facing_mode(mode: FacingMode) -> Option<Self> {
        match mode {
            FacingMode::User => Some(CameraType::Front),
            FacingMode::Environment => Some(CameraType::Back),
            FacingMode::Left | FacingMode::Right => None,
        }
    }

    /// Parse from a user-provided string (case-insensitive)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "front" | "user" => Some(CameraType::Front),
            "back" | "rear" | "environment" => Some(CameraType::Back),
            _ => None,
        }
    }
}

/// Track facing mode as reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Shows the user
    User,
    /// Shows the user's environment
    Environment,
    /// Shows the user, from their left
    Left,
    /// Shows the user, from their right
    Right,
}

impl fmt::Display for FacingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self {
            FacingMode::User => "user",
            FacingMode::Environment => "environment",
            FacingMode::Left => "left",
            FacingMode::Right => "right",
        };
        f.write_str(mode)
    }
}

/// Focus modes a track may advertise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FocusMode {
    /// Continuous autofocus
    Continuous,
    /// Fixed, manually driven focus
    Manual,
    /// Focus once, then hold
    SingleShot,
}

impl fmt::Display for FocusMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self {
            FocusMode::Continuous => "continuous",
            FocusMode::Manual => "manual",
            FocusMode::SingleShot => "single-shot",
        };
        f.write_str(mode)
    }
}

/// Inclusive numeric range advertised by a capability
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    /// Lower bound
    pub min: f64,
    /// Upper bound
    pub max: f64,
}

/// Current values of a live track
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackSettings {
    /// Device that produced the track
    pub device_id: Option<String>,
    /// Delivered width
    pub width: Option<u32>,
    /// Delivered height
    pub height: Option<u32>,
    /// Delivered aspect ratio
    pub aspect_ratio: Option<f64>,
    /// Observed facing mode
    pub facing_mode: Option<FacingMode>,
    /// Delivered frame rate
    pub frame_rate: Option<f64>,
    /// Torch state
    pub torch: Option<bool>,
    /// Focus mode
    pub focus_mode: Option<FocusMode>,
    /// Zoom level
    pub zoom: Option<f64>,
}

/// Capability set of a live track; a `Some` field means the key is present
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackCapabilities {
    /// Facing modes the device can report
    pub facing_mode: Vec<FacingMode>,
    /// Width range
    pub width: Option<NumericRange>,
    /// Height range
    pub height: Option<NumericRange>,
    /// Torch capability
    pub torch: Option<bool>,
    /// Supported focus modes
    pub focus_mode: Option<Vec<FocusMode>>,
    /// Zoom range
    pub zoom: Option<NumericRange>,
}

/// User-adjustable settings applied to a running track
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraSettings {
    /// Zoom level
    pub zoom: Option<f64>,
    /// Focus mode
    pub focus_mode: Option<FocusMode>,
    /// Torch on/off
    pub torch: Option<bool>,
}

impl CameraSettings {
    /// Later-wins merge of two settings records
    pub fn merged(&self, other: &CameraSettings) -> CameraSettings {
        CameraSettings {
            zoom: other.zoom.or(self.zoom),
            focus_mode: other.focus_mode.or(self.focus_mode),
            torch: other.torch.or(self.torch),
        }
    }
}

/// Permission names the controller can query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionName {
    /// Camera access
    Camera,
    /// Microphone access
    Microphone,
}

/// Raw permission state from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    /// Access granted
    Granted,
    /// Access denied
    Denied,
    /// Host will ask the user
    Prompt,
}

/// Permission status reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    /// User has granted the permission
    Granted,
    /// User has not decided yet
    Undetermined,
    /// User has denied the permission
    Denied,
}

/// Permission query result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionResponse {
    /// Status
    pub status: PermissionStatus,
    /// Shorthand for `status == Granted`
    pub granted: bool,
}

impl PermissionResponse {
    /// Build a response from a status
    pub fn from_status(status: PermissionStatus) -> Self {
        Self {
            status,
            granted: status == PermissionStatus::Granted,
        }
    }
}

impl From<PermissionState> for PermissionResponse {
    fn from(state: PermissionState) -> Self {
        match state {
            PermissionState::Granted => Self::from_status(PermissionStatus::Granted),
            PermissionState::Denied => Self::from_status(PermissionStatus::Denied),
            PermissionState::Prompt => Self::from_status(PermissionStatus::Undetermined),
        }
    }
}

/// Encoded image formats for photo capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    /// Lossless PNG
    Png,
    /// JPEG, honours the quality option
    #[default]
    #[serde(alias = "jpg")]
    Jpeg,
}

impl ImageType {
    /// MIME type used in the data URI
    pub fn mime(self) -> &'static str {
        match self {
            ImageType::Png => "image/png",
            ImageType::Jpeg => "image/jpeg",
        }
    }

    /// Parse from a user-provided string (case-insensitive)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "png" | "image/png" => Some(ImageType::Png),
            "jpg" | "jpeg" | "image/jpeg" => Some(ImageType::Jpeg),
            _ => None,
        }
    }
}

/// Maximum resolution a device delivered during a capability survey
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaxResolution {
    /// Device identifier
    pub device_id: String,
    /// Device label
    pub label: String,
    /// Largest delivered width
    pub max_width: u32,
    /// Largest delivered height
    pub max_height: u32,
}

/// A candidate resolution annotated with whether a device can deliver it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionSupport {
    /// Candidate
    #[serde(flatten)]
    pub resolution: Resolution,
    /// Whether both dimensions fit inside the device maximum
    pub is_supported: bool,
}

/// Standard resolutions used as the default candidate set
pub const STANDARD_RESOLUTIONS: [(u32, u32, &str); 18] = [
    // Landscape
    (640, 480, "VGA Landscape"),
    (1280, 720, "HD Landscape"),
    (1920, 1080, "Full HD Landscape"),
    (2560, 1440, "QHD Landscape"),
    (3840, 2160, "4K Landscape"),
    // Portrait
    (480, 640, "VGA Portrait"),
    (720, 1280, "HD Portrait"),
    (1080, 1920, "Full HD Portrait"),
    (1440, 2560, "QHD Portrait"),
    (2160, 3840, "4K Portrait"),
    // Mobile landscape
    (854, 480, "FWVGA Landscape"),
    (960, 540, "qHD Landscape"),
    (1600, 900, "HD+ Landscape"),
    (2048, 1152, "2K Landscape"),
    // Mobile portrait
    (480, 854, "FWVGA Portrait"),
    (540, 960, "qHD Portrait"),
    (900, 1600, "HD+ Portrait"),
    (1152, 2048, "2K Portrait"),
];

/// The standard resolution table as owned values
pub fn standard_resolutions() -> Vec<Resolution> {
    STANDARD_RESOLUTIONS
        .iter()
        .map(|&(w, h, name)| Resolution::named(w, h, name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_parse() {
        let res: Resolution = "1920x1080".parse().unwrap();
        assert_eq!((res.width, res.height), (1920, 1080));
        assert!("1920".parse::<Resolution>().is_err());
        assert!("0x720".parse::<Resolution>().is_err());
        assert!("axb".parse::<Resolution>().is_err());
    }

    #[test]
    fn test_resolution_swap_keeps_name() {
        let res = Resolution::named(1280, 720, "HD");
        let swapped = res.swapped();
        assert_eq!((swapped.width, swapped.height), (720, 1280));
        assert_eq!(swapped.name.as_deref(), Some("HD"));
        assert_eq!(Resolution::new(10, 0).aspect_ratio(), None);
    }

    #[test]
    fn test_camera_type_mapping() {
        assert_eq!(CameraType::Front.facing_mode(), FacingMode::User);
        assert_eq!(
            CameraType::from_facing_mode(FacingMode::Environment),
            Some(CameraType::Back)
        );
        assert_eq!(CameraType::from_facing_mode(FacingMode::Left), None);
        assert_eq!(CameraType::parse("Rear"), Some(CameraType::Back));
    }

    #[test]
    fn test_permission_mapping() {
        let prompt = PermissionResponse::from(PermissionState::Prompt);
        assert_eq!(prompt.status, PermissionStatus::Undetermined);
        assert!(!prompt.granted);
        assert!(PermissionResponse::from(PermissionState::Granted).granted);
    }

    #[test]
    fn test_standard_table_has_portrait_twin_for_each_landscape() {
        let table = standard_resolutions();
        assert_eq!(table.len(), 18);
        for res in table.iter().filter(|r| r.width > r.height) {
            assert!(
                table.iter().any(|p| p.same_dimensions(&res.swapped())),
                "missing portrait variant for {res}"
            );
        }
    }

    #[test]
    fn test_image_type_parse() {
        assert_eq!(ImageType::parse("JPG"), Some(ImageType::Jpeg));
        assert_eq!(ImageType::Png.mime(), "image/png");
        assert!(ImageType::parse("gif").is_none());
    }
}

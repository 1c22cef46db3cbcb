//! camkit runtime configuration handling

use crate::camera::{CameraConfiguration, CameraType, ControllerOptions, Resolution};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Everything camkit reads from `camkit.toml` / `camkit.yaml` and `CAMKIT_*` variables
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CamkitConfig {
    /// Camera session defaults
    pub camera: CameraOptions,
    /// Logging configuration
    pub logging: LoggingOptions,
    /// Provider-call limits
    pub controller: ControllerSettings,
}

impl CamkitConfig {
    /// Explicit file, else the first discovered one, else defaults; env vars win over all.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = explicit_path {
            Self::from_file(path)?
        } else if let Some(path) = Self::discover_file()? {
            tracing::info!("Using configuration file: {}", path.display());
            Self::from_file(&path)?
        } else {
            tracing::debug!("No camkit.toml / camkit.yaml found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// First existing file among cwd candidates and the XDG config directory.
    fn discover_file() -> Result<Option<PathBuf>> {
        let cwd =
            env::current_dir().map_err(|e| Error::Config(format!("Failed to read cwd: {e}")))?;
        for candidate in ["camkit.toml", "camkit.yaml", "camkit.yml"] {
            let path = cwd.join(candidate);
            if path.exists() {
                return Ok(Some(path));
            }
        }

        if let Some(xdg_config) = env::var_os("XDG_CONFIG_HOME") {
            let base = PathBuf::from(xdg_config).join("camkit");
            for candidate in ["config.toml", "config.yaml"] {
                let path = base.join(candidate);
                if path.exists() {
                    return Ok(Some(path));
                }
            }
        }

        Ok(None)
    }

    /// Parse one file; the extension picks the format.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {e}", path.display())))?;
        Self::parse(&contents, path)
    }

    fn parse(contents: &str, path: &Path) -> Result<Self> {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_ascii_lowercase()
            .as_str()
        {
            "toml" => toml::from_str(contents).map_err(|e| {
                Error::Config(format!("Failed to parse TOML {}: {e}", path.display()))
            }),
            "yaml" | "yml" => serde_yaml::from_str(contents).map_err(|e| {
                Error::Config(format!("Failed to parse YAML {}: {e}", path.display()))
            }),
            other => Err(Error::Config(format!(
                "Unsupported config format '{}', expected toml/yaml",
                other
            ))),
        }
    }

    /// `CAMKIT_*` variables, applied last.
    fn apply_env_overrides(&mut self) {
        self.camera.apply_env_overrides();
        self.logging.apply_env_overrides();
        self.controller.apply_env_overrides();
    }

    /// Resolved camera configuration for `CameraController::initialize`.
    pub fn camera_configuration(&self) -> Result<CameraConfiguration> {
        self.camera.to_configuration()
    }

    /// Resolved provider-call limits.
    pub fn controller_options(&self) -> ControllerOptions {
        self.controller.to_options()
    }
}

/// User-friendly camera defaults, written as plain strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraOptions {
    /// Pinned device id
    pub device: Option<String>,
    /// `front` or `back`
    pub facing: Option<String>,
    /// Target resolution as `WIDTHxHEIGHT`
    pub resolution: Option<String>,
    /// Fallback resolution as `WIDTHxHEIGHT`
    pub fallback: Option<String>,
    /// Mirror the preview
    pub mirror: Option<bool>,
    /// Swap requested dimensions on handheld hosts
    pub auto_rotate: Option<bool>,
    /// Capture audio too
    pub audio: Option<bool>,
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

fn parse_resolution(field: &str, value: &str) -> Result<Resolution> {
    value
        .parse::<Resolution>()
        .map_err(|e| Error::Config(format!("Invalid {field} resolution: {e}")))
}

impl CameraOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(device) = env::var("CAMKIT_CAMERA_DEVICE") {
            self.device = Some(device).filter(|d| !d.trim().is_empty());
        }
        if let Ok(facing) = env::var("CAMKIT_CAMERA_FACING") {
            self.facing = Some(facing);
        }
        if let Ok(resolution) = env::var("CAMKIT_CAMERA_RESOLUTION") {
            self.resolution = Some(resolution);
        }
        if let Ok(fallback) = env::var("CAMKIT_CAMERA_FALLBACK") {
            self.fallback = Some(fallback);
        }
        if let Some(mirror) = env::var("CAMKIT_CAMERA_MIRROR").ok().and_then(|v| parse_flag(&v)) {
            self.mirror = Some(mirror);
        }
        if let Some(rotate) = env::var("CAMKIT_CAMERA_AUTO_ROTATE")
            .ok()
            .and_then(|v| parse_flag(&v))
        {
            self.auto_rotate = Some(rotate);
        }
        if let Some(audio) = env::var("CAMKIT_CAMERA_AUDIO").ok().and_then(|v| parse_flag(&v)) {
            self.audio = Some(audio);
        }
    }

    /// Merge overrides onto the default camera configuration.
    pub fn to_configuration(&self) -> Result<CameraConfiguration> {
        let mut config = CameraConfiguration::default();

        if let Some(device) = &self.device {
            config.selected_device_id = Some(device.clone());
        }

        if let Some(facing) = &self.facing {
            config.camera_type = CameraType::parse(facing).ok_or_else(|| {
                Error::Config(format!(
                    "Unknown camera facing '{}'. Use front or back",
                    facing
                ))
            })?;
        }

        if let Some(resolution) = &self.resolution {
            config.target_resolution = Some(parse_resolution("target", resolution)?);
        }

        if let Some(fallback) = &self.fallback {
            config.fallback_resolution = Some(parse_resolution("fallback", fallback)?);
        }

        if let Some(mirror) = self.mirror {
            config.enable_mirroring = mirror;
        }
        if let Some(rotate) = self.auto_rotate {
            config.enable_auto_rotation = rotate;
        }
        if let Some(audio) = self.audio {
            config.enable_audio = audio;
        }

        Ok(config)
    }
}

/// Provider-call limits in milliseconds; `0` disables a limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSettings {
    /// Enumeration and stream acquisition
    pub open_timeout_ms: u64,
    /// Preview metadata wait
    pub metadata_timeout_ms: u64,
    /// Constraint application
    pub constraint_timeout_ms: u64,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            open_timeout_ms: 10_000,
            metadata_timeout_ms: 5_000,
            constraint_timeout_ms: 5_000,
        }
    }
}

impl ControllerSettings {
    pub(crate) fn apply_env_overrides(&mut self) {
        let read = |name: &str| env::var(name).ok().and_then(|v| v.parse::<u64>().ok());
        if let Some(ms) = read("CAMKIT_OPEN_TIMEOUT_MS") {
            self.open_timeout_ms = ms;
        }
        if let Some(ms) = read("CAMKIT_METADATA_TIMEOUT_MS") {
            self.metadata_timeout_ms = ms;
        }
        if let Some(ms) = read("CAMKIT_CONSTRAINT_TIMEOUT_MS") {
            self.constraint_timeout_ms = ms;
        }
    }

    /// Convert into controller options
    pub fn to_options(&self) -> ControllerOptions {
        let limit = |ms: u64| (ms > 0).then(|| Duration::from_millis(ms));
        ControllerOptions {
            open_timeout: limit(self.open_timeout_ms),
            metadata_timeout: limit(self.metadata_timeout_ms),
            constraint_timeout: limit(self.constraint_timeout_ms),
        }
    }
}

/// Structured logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingOptions {
    /// Default log level (overridable via `CAMKIT_LOG_LEVEL`)
    pub level: String,
    /// Also write logs to this file
    pub file: Option<PathBuf>,
    /// ANSI colors on stdout
    pub color: bool,
    /// Rotation for `file`; `None` appends to a single file
    pub rotation: Option<LogRotation>,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            color: true,
            rotation: None,
        }
    }
}

impl LoggingOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(level) = env::var("CAMKIT_LOG_LEVEL") {
            self.level = level;
        }
        if let Ok(file) = env::var("CAMKIT_LOG_FILE") {
            self.file = Some(PathBuf::from(file));
        }
        if let Some(color) = env::var("CAMKIT_LOG_COLOR").ok().and_then(|v| parse_flag(&v)) {
            self.color = color;
        }
        if let Ok(rotation) = env::var("CAMKIT_LOG_ROTATION") {
            if let Some(parsed) = LogRotation::parse(&rotation) {
                self.rotation = Some(parsed);
            }
        }
    }
}

/// Log file rotation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    /// New file every hour
    Hourly,
    /// New file every day
    Daily,
}

impl LogRotation {
    /// Parse a rotation policy (case-insensitive)
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "hourly" => Some(Self::Hourly),
            "daily" => Some(Self::Daily),
            _ => None,
        }
    }
}

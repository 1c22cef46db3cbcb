//! The stateful camera session controller
//!
//! [`CameraController`] owns one [`CameraState`] and drives the host through
//! the provider traits. Every state change goes through a single reducer
//! ([`StatePatch`]) and is announced to `StateChanged` observers with an
//! owned snapshot. Operations that touch the device take `&mut self`, so a
//! controller can never run two of them at once; share it behind a
//! `tokio::sync::Mutex` when several tasks need it.

use crate::camera::capture::{CaptureOptions, CapturedPhoto, calculate_scaled_size, normalize_quality};
use crate::camera::config::ConfigPatch;
use crate::camera::constraints::{
    self, AdvancedConstraint, ConstraintPlan, FormFactor, MediaConstraints, VideoConstraints,
    has_settings_changed,
};
use crate::camera::events::{CameraEvent, EventBus, EventHandler, EventKind, SubscriptionId};
use crate::camera::provider::{
    CaptureSurface, DeviceProvider, DrawTransform, MediaStream, PermissionProvider, PreviewSink,
};
use crate::camera::reconcile::reconcile_actual_resolution;
use crate::camera::specs::probe_constraints;
use crate::camera::state::{CameraState, StatePatch, StreamPhase};
use crate::camera::types::{
    CameraSettings, CameraType, DeviceDescriptor, DeviceKind, FocusMode, MaxResolution,
    PermissionName, PermissionResponse, PermissionStatus, Resolution, TrackSettings,
};
use crate::error::{CameraError, CameraResult, ErrorCode, PlatformError};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Limits applied to provider calls at suspension points. `None` waits forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerOptions {
    /// Device enumeration and stream acquisition
    pub open_timeout: Option<Duration>,
    /// Preview "metadata loaded" wait
    pub metadata_timeout: Option<Duration>,
    /// Constraint application on a live track
    pub constraint_timeout: Option<Duration>,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            open_timeout: Some(Duration::from_secs(10)),
            metadata_timeout: Some(Duration::from_secs(5)),
            constraint_timeout: Some(Duration::from_secs(5)),
        }
    }
}

impl ControllerOptions {
    /// No limits at all
    pub fn unbounded() -> Self {
        Self {
            open_timeout: None,
            metadata_timeout: None,
            constraint_timeout: None,
        }
    }
}

/// Await a provider call, classify its failure and enforce `limit`
async fn bounded<T, F>(limit: Option<Duration>, operation: &str, call: F) -> CameraResult<T>
where
    F: Future<Output = Result<T, PlatformError>>,
{
    match limit {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(result) => result.map_err(CameraError::from),
            Err(_) => Err(CameraError::timeout(operation, limit)),
        },
        None => call.await.map_err(CameraError::from),
    }
}

fn stop_tracks(stream: &dyn MediaStream) {
    for track in stream.tracks() {
        track.stop();
    }
}

/// Device following `current` in `devices`, wrapping around.
///
/// `None` when fewer than two devices are known. An unknown or missing
/// current id starts from the first device.
pub fn next_device_in(devices: &[DeviceDescriptor], current: Option<&str>) -> Option<DeviceDescriptor> {
    if devices.len() < 2 {
        return None;
    }
    let next = current
        .and_then(|id| devices.iter().position(|d| d.device_id == id))
        .map_or(0, |index| (index + 1) % devices.len());
    devices.get(next).cloned()
}

/// Single stateful camera session
pub struct CameraController {
    devices: Arc<dyn DeviceProvider>,
    permissions: Option<Arc<dyn PermissionProvider>>,
    preview: Option<Arc<dyn PreviewSink>>,
    capture: Option<Arc<dyn CaptureSurface>>,
    options: ControllerOptions,
    state: CameraState,
    events: EventBus,
}

impl std::fmt::Debug for CameraController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraController")
            .field("state", &self.state)
            .field("options", &self.options)
            .field("has_preview", &self.preview.is_some())
            .field("has_capture_surface", &self.capture.is_some())
            .field("events", &self.events)
            .finish()
    }
}

impl CameraController {
    /// Controller over a device provider, with default state and options
    pub fn new(devices: Arc<dyn DeviceProvider>) -> Self {
        tracing::debug!("Constructing camera controller");
        Self {
            devices,
            permissions: None,
            preview: None,
            capture: None,
            options: ControllerOptions::default(),
            state: CameraState::default(),
            events: EventBus::new(),
        }
    }

    /// Attach a permission provider
    pub fn with_permission_provider(mut self, permissions: Arc<dyn PermissionProvider>) -> Self {
        self.permissions = Some(permissions);
        self
    }

    /// Attach a preview sink
    pub fn with_preview(mut self, preview: Arc<dyn PreviewSink>) -> Self {
        self.preview = Some(preview);
        self
    }

    /// Attach a capture surface
    pub fn with_capture_surface(mut self, capture: Arc<dyn CaptureSurface>) -> Self {
        self.capture = Some(capture);
        self
    }

    /// Override provider-call limits
    pub fn with_options(mut self, options: ControllerOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace or remove the preview sink
    pub fn set_preview(&mut self, preview: Option<Arc<dyn PreviewSink>>) {
        self.preview = preview;
    }

    /// Replace or remove the capture surface
    pub fn set_capture_surface(&mut self, capture: Option<Arc<dyn CaptureSurface>>) {
        self.capture = capture;
    }

    // ---- State ----

    /// Current state
    pub fn state(&self) -> &CameraState {
        &self.state
    }

    /// Owned copy of the current state
    pub fn snapshot(&self) -> CameraState {
        self.state.clone()
    }

    /// Device behind the running stream
    pub fn active_device(&self) -> Option<&DeviceDescriptor> {
        self.state.active_device.as_ref()
    }

    /// Reconciled resolution of the running stream
    pub fn active_resolution(&self) -> Option<&Resolution> {
        self.state.active_resolution.as_ref()
    }

    /// Capture surface, if one is attached
    pub fn capture_surface(&self) -> Option<&Arc<dyn CaptureSurface>> {
        self.capture.as_ref()
    }

    /// Whether a stream is running
    pub fn is_active(&self) -> bool {
        self.state.is_active
    }

    /// Whether `start_stream` is in flight
    pub fn is_initializing(&self) -> bool {
        self.state.is_initializing
    }

    /// Lifecycle phase
    pub fn phase(&self) -> StreamPhase {
        self.state.phase()
    }

    /// Provider-call limits in effect
    pub fn options(&self) -> &ControllerOptions {
        &self.options
    }

    /// Host form factor as reported by the device provider
    pub fn form_factor(&self) -> FormFactor {
        self.devices.form_factor()
    }

    /// Forget the last reported error
    pub fn clear_error(&mut self) {
        self.update(StatePatch {
            error: Some(None),
            ..Default::default()
        });
    }

    fn update(&mut self, patch: StatePatch) {
        self.state.apply(patch);
        tracing::trace!(phase = ?self.state.phase(), "Camera state updated");
        if self.events.has_listeners(EventKind::StateChanged) {
            self.events
                .emit(&CameraEvent::StateChanged(Box::new(self.state.clone())));
        }
    }

    // ---- Observers ----

    /// Register a handler for one event kind
    pub fn subscribe<F>(&mut self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&CameraEvent) + Send + Sync + 'static,
    {
        let handler: EventHandler = Arc::new(handler);
        self.events.subscribe(kind, handler)
    }

    /// Remove a handler; returns whether it was registered
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Remove every handler
    pub fn clear_subscriptions(&mut self) {
        self.events.clear();
    }

    fn emit(&self, event: CameraEvent) {
        self.events.emit(&event);
    }

    /// Record `error` in state, log it and notify `Error` observers
    pub fn handle_error(&mut self, error: CameraError) {
        tracing::error!(code = %error.code, "[Camera Error]: {}", error.describe());
        self.update(StatePatch {
            error: Some(Some(error.clone())),
            ..Default::default()
        });
        self.emit(CameraEvent::Error(error));
    }

    // ---- Permissions ----

    /// Camera permission state
    pub async fn get_camera_permissions(&self) -> CameraResult<PermissionResponse> {
        self.query_permission(PermissionName::Camera).await
    }

    /// Microphone permission state
    pub async fn get_microphone_permissions(&self) -> CameraResult<PermissionResponse> {
        self.query_permission(PermissionName::Microphone).await
    }

    async fn query_permission(&self, name: PermissionName) -> CameraResult<PermissionResponse> {
        let provider = self.permissions.as_ref().ok_or_else(|| {
            CameraError::new(
                ErrorCode::NoPermissionsApi,
                "Permissions API not supported by this host",
            )
        })?;

        match provider.query(name).await {
            Ok(state) => Ok(state.into()),
            // Hosts that cannot query this permission name
            Err(err) if err.name == "TypeError" => {
                tracing::debug!(?name, "Permission not queryable: {err}");
                Ok(PermissionResponse::from_status(PermissionStatus::Undetermined))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Trigger the host permission prompt by opening and immediately
    /// releasing a plain video stream
    pub async fn request_camera_permissions(&self) -> PermissionResponse {
        if !self.devices.is_supported() {
            return PermissionResponse::from_status(PermissionStatus::Undetermined);
        }

        let opened = bounded(
            self.options.open_timeout,
            "permission request",
            self.devices.open_stream(&MediaConstraints::any_video()),
        )
        .await;

        match opened {
            Ok(stream) => {
                stop_tracks(stream.as_ref());
                PermissionResponse::from_status(PermissionStatus::Granted)
            }
            Err(err) if err.code == ErrorCode::PermissionDenied => {
                PermissionResponse::from_status(PermissionStatus::Denied)
            }
            Err(err) => {
                tracing::debug!("Permission request inconclusive: {err}");
                PermissionResponse::from_status(PermissionStatus::Undetermined)
            }
        }
    }

    // ---- Devices ----

    fn check_media_devices_support(&self) -> CameraResult<()> {
        if self.devices.is_supported() {
            Ok(())
        } else {
            Err(CameraError::new(
                ErrorCode::NoMediaDevicesSupport,
                "The host does not support media device access",
            ))
        }
    }

    async fn refresh_devices(&mut self) -> CameraResult<Vec<DeviceDescriptor>> {
        self.check_media_devices_support()?;

        let all = bounded(
            self.options.open_timeout,
            "device enumeration",
            self.devices.enumerate(),
        )
        .await?;
        let video: Vec<DeviceDescriptor> = all
            .into_iter()
            .filter(|d| d.kind == DeviceKind::VideoInput)
            .collect();

        tracing::debug!(count = video.len(), "Video input devices enumerated");
        self.update(StatePatch {
            has_multiple_devices: Some(video.len() > 1),
            devices: Some(video.clone()),
            ..Default::default()
        });
        self.emit(CameraEvent::DevicesChanged(video.clone()));
        Ok(video)
    }

    /// Cached camera list, enumerated on first use.
    ///
    /// Failures (including an empty enumeration) go to the error handler
    /// and produce an empty list.
    pub async fn list_devices(&mut self) -> Vec<DeviceDescriptor> {
        if !self.state.devices.is_empty() {
            tracing::debug!("Using cached camera devices");
            return self.state.devices.clone();
        }

        match self.refresh_devices().await {
            Ok(devices) if devices.is_empty() => {
                self.handle_error(CameraError::new(
                    ErrorCode::NoDevice,
                    "No video input devices found",
                ));
                Vec::new()
            }
            Ok(devices) => devices,
            Err(err) => {
                self.handle_error(err);
                Vec::new()
            }
        }
    }

    /// Rebuild the device cache after the host reports a device-set change
    pub async fn handle_device_change(&mut self) {
        tracing::info!("Camera device set changed");
        if let Err(err) = self.refresh_devices().await {
            self.handle_error(err);
        }
    }

    /// Camera after the active one, cycling through the cached list
    pub async fn next_device(&mut self) -> Option<DeviceDescriptor> {
        let devices = self.list_devices().await;
        let current = self.state.active_device.as_ref().map(|d| d.device_id.as_str());
        next_device_in(&devices, current)
    }

    // ---- Stream lifecycle ----

    /// Constraints for the current configuration
    pub fn build_constraints(&self, use_fallback: bool) -> ConstraintPlan {
        constraints::build_constraints(&self.state.config, use_fallback, self.form_factor())
    }

    fn uses_fallback(&self) -> bool {
        self.state.config.fallback_resolution.is_some()
    }

    /// Open a stream for the current configuration, replacing any running one.
    ///
    /// On failure the state is left inactive and a `camera-start-error`
    /// wrapping the cause is returned. `is_initializing` is cleared on every
    /// exit path.
    pub async fn start_stream(&mut self) -> CameraResult<()> {
        tracing::info!("Starting camera stream");
        self.update(StatePatch {
            is_initializing: Some(true),
            is_active: Some(false),
            error: Some(None),
            ..Default::default()
        });

        let outcome = match self.try_start_stream().await {
            Ok(()) => Ok(()),
            Err(cause) => {
                let err =
                    CameraError::wrapping(ErrorCode::CameraStartError, "Failed to start camera", cause);
                tracing::warn!("{}", err.describe());
                self.update(StatePatch {
                    is_active: Some(false),
                    error: Some(Some(err.clone())),
                    ..Default::default()
                });
                Err(err)
            }
        };

        self.update(StatePatch {
            is_initializing: Some(false),
            ..Default::default()
        });
        outcome
    }

    async fn try_start_stream(&mut self) -> CameraResult<()> {
        self.stop_stream();
        self.check_media_devices_support()?;

        let plan = self.build_constraints(self.uses_fallback());
        tracing::debug!(constraints = ?plan.constraints, "Requesting camera stream");

        let stream = bounded(
            self.options.open_timeout,
            "stream acquisition",
            self.devices.open_stream(&plan.constraints),
        )
        .await?;

        if let Err(err) = self.activate_stream(Arc::clone(&stream), &plan).await {
            stop_tracks(stream.as_ref());
            self.update(StatePatch {
                stream: Some(None),
                ..Default::default()
            });
            if let Some(preview) = &self.preview {
                if let Err(detach) = preview.detach() {
                    tracing::warn!("Failed to clear preview after start failure: {detach}");
                }
            }
            return Err(err);
        }
        Ok(())
    }

    async fn activate_stream(
        &mut self,
        stream: Arc<dyn MediaStream>,
        plan: &ConstraintPlan,
    ) -> CameraResult<()> {
        if stream.video_track().is_none() {
            return Err(CameraError::new(
                ErrorCode::NoStream,
                "Stream has no video track",
            ));
        }

        if let Some(preview) = &self.preview {
            bounded(
                self.options.metadata_timeout,
                "preview metadata",
                preview.attach(Arc::clone(&stream)),
            )
            .await?;
        }

        self.update_stream_settings(stream, plan);
        self.update_capabilities();
        self.apply_mirror_effect();

        self.update(StatePatch {
            is_active: Some(true),
            ..Default::default()
        });
        tracing::info!(
            device = ?self.state.active_device.as_ref().map(|d| d.label.as_str()),
            resolution = ?self.state.active_resolution.as_ref().map(|r| r.to_string()),
            "Camera stream started"
        );
        self.emit(CameraEvent::Started {
            device: self.state.active_device.clone(),
            resolution: self.state.active_resolution.clone(),
        });
        Ok(())
    }

    /// Read back what the device delivered and record it
    fn update_stream_settings(&mut self, stream: Arc<dyn MediaStream>, plan: &ConstraintPlan) {
        let settings = stream
            .video_track()
            .map(|track| track.settings())
            .unwrap_or_default();

        let active_device = settings
            .device_id
            .as_deref()
            .and_then(|id| self.state.devices.iter().find(|d| d.device_id == id))
            .cloned();
        if active_device.is_none() {
            tracing::warn!("Active camera not found among known devices");
        }

        let resolution = self.reconciled_resolution(&settings, plan);

        let camera_type = settings
            .facing_mode
            .and_then(CameraType::from_facing_mode);

        self.update(StatePatch {
            stream: Some(Some(stream)),
            active_device: Some(active_device),
            active_resolution: Some(Some(resolution)),
            config: camera_type.map(ConfigPatch::camera_type),
            ..Default::default()
        });
    }

    /// Reconcile the track's reported size against what `plan` asked for,
    /// warning on a genuine mismatch
    fn reconciled_resolution(&self, settings: &TrackSettings, plan: &ConstraintPlan) -> Resolution {
        let requested = plan.configured_request();
        let reconciled = reconcile_actual_resolution(
            settings.width.unwrap_or(0),
            settings.height.unwrap_or(0),
            requested,
            self.state.config.enable_auto_rotation,
        );
        if let Some(requested) = requested.filter(|_| reconciled.mismatch) {
            tracing::warn!(
                "Requested resolution ({requested}) differs from actual resolution ({}){}",
                reconciled.resolution,
                if reconciled.swapped {
                    " (dimensions were swapped)"
                } else {
                    ""
                }
            );
        }
        reconciled.resolution
    }

    fn apply_mirror_effect(&self) {
        if let Some(preview) = &self.preview {
            preview.set_mirrored(self.state.config.enable_mirroring);
        }
    }

    /// Stop every track of the running stream and clear the preview.
    ///
    /// Failures are reported through the error handler, never returned.
    pub fn stop_stream(&mut self) {
        if let Err(cause) = self.try_stop_stream() {
            self.handle_error(CameraError::wrapping(
                ErrorCode::CameraStopError,
                "Failed to stop camera",
                cause,
            ));
        }
        if self.state.is_stopping || self.state.is_active {
            self.update(StatePatch {
                is_stopping: Some(false),
                is_active: Some(false),
                ..Default::default()
            });
        }
    }

    fn try_stop_stream(&mut self) -> CameraResult<()> {
        if let Some(stream) = self.state.stream.clone() {
            self.update(StatePatch {
                is_stopping: Some(true),
                ..Default::default()
            });
            stop_tracks(stream.as_ref());
            self.update(StatePatch {
                stream: Some(None),
                is_torch_enabled: Some(false),
                ..Default::default()
            });
            tracing::info!("Camera stream stopped");
            self.emit(CameraEvent::Stopped);
        }

        if let Some(preview) = &self.preview {
            preview.detach()?;
        }
        Ok(())
    }

    /// Merge `patch` into the configuration and bring the stream in line.
    ///
    /// A full restart happens when the pinned device, the facing preference
    /// or the target resolution changed, when nothing is running yet, or when
    /// `force_restart` is set. Otherwise the live track is reconstrained in
    /// place if its width, height, facing mode or aspect ratio no longer match;
    /// if that fails the configuration is rolled back and the error returned.
    pub async fn apply_configuration_changes(
        &mut self,
        patch: impl Into<ConfigPatch>,
        force_restart: bool,
    ) -> CameraResult<()> {
        let patch = patch.into();
        let previous = self.state.config.clone();

        let device_changed = patch
            .selected_device_id
            .as_ref()
            .is_some_and(|device| *device != previous.selected_device_id);
        let facing_changed = patch
            .camera_type
            .is_some_and(|camera_type| camera_type != previous.camera_type);
        let resolution_changed = patch.target_resolution.as_ref().is_some_and(|target| {
            match (target, &previous.target_resolution) {
                (Some(new), Some(old)) => !new.same_dimensions(old),
                (None, None) => false,
                _ => true,
            }
        });

        self.update(StatePatch {
            config: Some(patch),
            ..Default::default()
        });

        let running = match (&self.state.stream, &self.preview) {
            (Some(stream), Some(_)) => Some(Arc::clone(stream)),
            _ => None,
        };
        let Some(stream) = running else {
            return self.start_stream().await;
        };

        if device_changed || facing_changed || resolution_changed || force_restart {
            tracing::info!(
                device_changed,
                facing_changed,
                resolution_changed,
                force_restart,
                "Restarting camera stream for configuration change"
            );
            return self.start_stream().await;
        }

        let track = stream.video_track().ok_or_else(|| {
            CameraError::new(ErrorCode::NoStream, "No video track found")
        })?;
        let plan = self.build_constraints(self.uses_fallback());
        let wanted = plan.constraints.video.clone().unwrap_or_default();

        if has_settings_changed(&track.settings(), &wanted) {
            tracing::debug!(constraints = ?wanted, "Reconstraining live track");
            let applied = bounded(
                self.options.constraint_timeout,
                "constraint update",
                track.apply_constraints(&wanted),
            )
            .await;
            if let Err(err) = applied {
                tracing::warn!("Constraint update failed, rolling back: {err}");
                self.update(StatePatch {
                    config: Some(ConfigPatch::from(previous)),
                    ..Default::default()
                });
                return Err(err);
            }

            let resolution = self.reconciled_resolution(&track.settings(), &plan);
            self.update(StatePatch {
                active_resolution: Some(Some(resolution)),
                ..Default::default()
            });
        }

        if self.state.config.enable_mirroring != previous.enable_mirroring {
            self.apply_mirror_effect();
        }
        Ok(())
    }

    /// Apply zoom, focus mode and torch values the live track supports.
    ///
    /// Failures are reported as `camera-settings-error` through the error
    /// handler.
    pub async fn update_settings(&mut self, settings: CameraSettings) {
        if let Err(cause) = self.try_update_settings(&settings).await {
            self.handle_error(CameraError::wrapping(
                ErrorCode::CameraSettingsError,
                "Failed to update camera settings",
                cause,
            ));
        }
    }

    async fn try_update_settings(&mut self, settings: &CameraSettings) -> CameraResult<()> {
        let stream = self.state.stream.clone().ok_or_else(|| {
            CameraError::new(ErrorCode::NoStream, "No stream to update settings on")
        })?;
        let track = stream.video_track().ok_or_else(|| {
            CameraError::new(ErrorCode::NoStream, "No video track found")
        })?;
        let capabilities = track.capabilities();

        let mut advanced = Vec::new();
        let mut accepted = CameraSettings::default();
        if let Some(zoom) = settings.zoom {
            if capabilities.zoom.is_some() {
                advanced.push(AdvancedConstraint::Zoom(zoom));
                accepted.zoom = Some(zoom);
            } else {
                tracing::warn!("Zoom is not supported on this device");
            }
        }
        if let Some(mode) = settings.focus_mode {
            if capabilities
                .focus_mode
                .as_ref()
                .is_some_and(|modes| modes.contains(&mode))
            {
                advanced.push(AdvancedConstraint::FocusMode(mode));
                accepted.focus_mode = Some(mode);
            } else {
                tracing::warn!("Focus mode \"{mode}\" is not supported");
            }
        }
        let torch = settings.torch.filter(|_| capabilities.torch.is_some());
        if let Some(torch) = torch {
            advanced.push(AdvancedConstraint::Torch(torch));
            accepted.torch = Some(torch);
        } else if settings.torch.is_some() {
            tracing::warn!("Torch is not supported on this device");
        }

        bounded(
            self.options.constraint_timeout,
            "settings update",
            track.apply_constraints(&VideoConstraints::advanced(advanced)),
        )
        .await?;

        let merged = self
            .state
            .current_settings
            .clone()
            .unwrap_or_default()
            .merged(&accepted);
        self.update(StatePatch {
            current_settings: Some(Some(merged.clone())),
            is_torch_enabled: torch,
            ..Default::default()
        });
        self.emit(CameraEvent::SettingsChanged(merged));
        Ok(())
    }

    // ---- Capabilities and features ----

    /// Snapshot the running track's capabilities into the support flags.
    /// No-op without a stream.
    pub fn update_capabilities(&mut self) {
        let Some(track) = self.state.stream.as_ref().and_then(|s| s.video_track()) else {
            tracing::debug!("No stream available, cannot update capabilities");
            return;
        };

        let capabilities = track.capabilities();
        tracing::debug!(?capabilities, "Camera capabilities");
        self.update(StatePatch {
            supports_torch: Some(capabilities.torch.is_some()),
            supports_focus: Some(capabilities.focus_mode.is_some()),
            supports_zoom: Some(capabilities.zoom.is_some()),
            capabilities: Some(Some(capabilities)),
            ..Default::default()
        });
    }

    /// Switch the torch on or off.
    ///
    /// Returns `no-stream` when nothing is running. A missing torch
    /// capability or a failed constraint update is reported as `torch-error`
    /// through the error handler and leaves `is_torch_enabled` untouched.
    pub async fn enable_torch(&mut self, enable: bool) -> CameraResult<()> {
        let stream = self.state.stream.clone().ok_or_else(|| {
            CameraError::new(ErrorCode::NoStream, "Stream is not initialized")
        })?;
        let track = stream.video_track().ok_or_else(|| {
            CameraError::new(ErrorCode::NoStream, "No video track found")
        })?;

        if track.capabilities().torch.is_none() {
            tracing::warn!("Torch is not supported on this device");
            self.handle_error(CameraError::new(
                ErrorCode::TorchError,
                "Torch is not supported on this device",
            ));
            return Ok(());
        }

        let verb = if enable { "enable" } else { "disable" };
        let applied = bounded(
            self.options.constraint_timeout,
            "torch update",
            track.apply_constraints(&VideoConstraints::advanced(vec![AdvancedConstraint::Torch(
                enable,
            )])),
        )
        .await;

        match applied {
            Ok(()) => {
                let settings = self
                    .state
                    .current_settings
                    .clone()
                    .unwrap_or_default()
                    .merged(&CameraSettings {
                        torch: Some(enable),
                        ..Default::default()
                    });
                self.update(StatePatch {
                    is_torch_enabled: Some(enable),
                    current_settings: Some(Some(settings)),
                    ..Default::default()
                });
                tracing::info!("Torch has been {verb}d");
            }
            Err(cause) => self.handle_error(CameraError::wrapping(
                ErrorCode::TorchError,
                format!("Failed to {verb} torch"),
                cause,
            )),
        }
        Ok(())
    }

    /// Apply a focus mode to `stream`'s video track after checking that the
    /// track advertises it
    pub async fn set_focus_mode(
        &mut self,
        stream: &dyn MediaStream,
        mode: FocusMode,
    ) -> CameraResult<()> {
        let track = stream.video_track().ok_or_else(|| {
            CameraError::new(ErrorCode::FocusError, "No video track found")
        })?;

        let supported = track
            .capabilities()
            .focus_mode
            .is_some_and(|modes| modes.contains(&mode));
        if !supported {
            tracing::warn!("Focus mode \"{mode}\" is not supported");
            return Err(CameraError::new(
                ErrorCode::FocusError,
                format!("Focus mode \"{mode}\" is not supported"),
            ));
        }

        bounded(
            self.options.constraint_timeout,
            "focus update",
            track.apply_constraints(&VideoConstraints::advanced(vec![
                AdvancedConstraint::FocusMode(mode),
            ])),
        )
        .await
        .map_err(|cause| {
            CameraError::wrapping(ErrorCode::FocusError, "Failed to set focus mode", cause)
        })?;

        let settings = self
            .state
            .current_settings
            .clone()
            .unwrap_or_default()
            .merged(&CameraSettings {
                focus_mode: Some(mode),
                ..Default::default()
            });
        self.update(StatePatch {
            current_settings: Some(Some(settings)),
            ..Default::default()
        });
        tracing::info!("Focus mode set to \"{mode}\"");
        Ok(())
    }

    /// Survey every known camera for its maximum deliverable resolution.
    /// Devices that cannot be probed are left out.
    pub async fn initialize_camera_capabilities(&mut self) -> Vec<MaxResolution> {
        let devices = self.list_devices().await;
        let mut surveyed = Vec::with_capacity(devices.len());
        for device in &devices {
            if let Some(max) = self.analyze_camera_device(device).await {
                surveyed.push(max);
            }
        }
        surveyed
    }

    /// Open a trial stream on `device` with a very large ideal size, read
    /// back what it delivered and release it again
    pub async fn analyze_camera_device(&self, device: &DeviceDescriptor) -> Option<MaxResolution> {
        let opened = bounded(
            self.options.open_timeout,
            "device survey",
            self.devices.open_stream(&probe_constraints(&device.device_id)),
        )
        .await;

        match opened {
            Ok(stream) => {
                let settings = stream
                    .video_track()
                    .map(|track| track.settings())
                    .unwrap_or_default();
                stop_tracks(stream.as_ref());
                Some(MaxResolution {
                    device_id: device.device_id.clone(),
                    label: device.label.clone(),
                    max_width: settings.width.unwrap_or(0),
                    max_height: settings.height.unwrap_or(0),
                })
            }
            Err(err) => {
                tracing::warn!("Could not analyze device {}: {err}", device.label);
                None
            }
        }
    }

    // ---- Session ----

    /// Merge `config` into the state, enumerate devices and start streaming.
    ///
    /// A failure is classified to its innermost cause, recorded in state,
    /// reported to `Error` observers and returned.
    pub async fn initialize(&mut self, config: impl Into<ConfigPatch>) -> CameraResult<()> {
        tracing::info!("Initializing camera");
        self.update(StatePatch {
            config: Some(config.into()),
            ..Default::default()
        });

        let result = self.try_initialize().await;
        self.report_classified(result, "Failed to start")
    }

    async fn try_initialize(&mut self) -> CameraResult<()> {
        self.check_media_devices_support()?;
        self.refresh_devices().await?;
        self.start_stream().await
    }

    /// Restart on the next camera in the device list
    pub async fn switch_camera(&mut self) -> CameraResult<()> {
        let result = match self.next_device().await {
            Some(next) => {
                tracing::info!(device = %next.label, "Switching camera");
                self.apply_configuration_changes(ConfigPatch::device(next.device_id), true)
                    .await
            }
            None => Err(CameraError::new(
                ErrorCode::NoDevice,
                "No other camera device found",
            )),
        };
        self.report_classified(result, "Failed to switch camera")
    }

    fn report_classified(&mut self, result: CameraResult<()>, context: &str) -> CameraResult<()> {
        let Err(err) = result else {
            return Ok(());
        };
        tracing::error!("{context}: {err}");
        let classified = err.root_cause().clone();
        self.handle_error(classified.clone());
        Err(classified)
    }

    /// Flip the mirroring flag and reapply it to the preview
    pub fn toggle_mirroring(&mut self) -> bool {
        let mirrored = !self.state.config.enable_mirroring;
        self.update(StatePatch {
            config: Some(ConfigPatch::mirroring(mirrored)),
            ..Default::default()
        });
        self.apply_mirror_effect();
        mirrored
    }

    /// Stop the stream, drop every observer and reset the state
    pub fn destroy(&mut self) {
        tracing::info!("Destroying camera controller");
        self.stop_stream();
        self.events.clear();
        self.state = CameraState::default();
    }

    // ---- Capture ----

    /// Grab the current preview frame as an encoded still.
    ///
    /// Requires a running stream, a preview and a capture surface. Every
    /// failure is returned as `camera-take-photo-error` and also reported
    /// through the error handler.
    pub fn take_photo(&mut self, options: &CaptureOptions) -> CameraResult<CapturedPhoto> {
        match self.capture_frame(options) {
            Ok(photo) => {
                tracing::debug!(width = photo.width, height = photo.height, "Photo captured");
                self.update(StatePatch {
                    last_captured_image: Some(Some(photo.clone())),
                    ..Default::default()
                });
                self.emit(CameraEvent::PhotoCaptured {
                    width: photo.width,
                    height: photo.height,
                });
                Ok(photo)
            }
            Err(cause) => {
                let err =
                    CameraError::wrapping(ErrorCode::CameraTakePhotoError, "Failed to take photo", cause);
                self.handle_error(err.clone());
                Err(err)
            }
        }
    }

    fn capture_frame(&self, options: &CaptureOptions) -> CameraResult<CapturedPhoto> {
        if self.state.stream.is_none() {
            return Err(CameraError::new(ErrorCode::NoStream, "Camera is not started"));
        }
        let (Some(preview), Some(surface)) = (&self.preview, &self.capture) else {
            return Err(CameraError::new(
                ErrorCode::ConfigurationError,
                "Camera is not properly configured",
            ));
        };

        let (natural_width, natural_height) = preview.natural_size();
        let (width, height) = calculate_scaled_size(natural_width, natural_height, options.scale);

        surface.set_size(width, height);
        if !surface.has_context() {
            return Err(CameraError::new(
                ErrorCode::CanvasError,
                "Unable to get canvas context",
            ));
        }

        let frame = preview.current_frame()?;
        surface.draw(
            &frame,
            DrawTransform {
                width,
                height,
                mirror: options.mirror,
            },
        )?;
        let encoded = surface.encode(options.image_type, normalize_quality(options.quality))?;

        Ok(CapturedPhoto::from_encoded(
            width,
            height,
            options.image_type,
            encoded,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_devices() -> Vec<DeviceDescriptor> {
        vec![
            DeviceDescriptor::video("a", "Front"),
            DeviceDescriptor::video("b", "Back"),
            DeviceDescriptor::video("c", "Wide"),
        ]
    }

    #[test]
    fn test_next_device_cycles_back_to_start() {
        let devices = three_devices();
        let mut current = "b".to_string();
        for _ in 0..3 {
            current = next_device_in(&devices, Some(&current)).unwrap().device_id;
        }
        assert_eq!(current, "b");
    }

    #[test]
    fn test_next_device_needs_two_devices() {
        let one = vec![DeviceDescriptor::video("a", "Only")];
        assert!(next_device_in(&one, Some("a")).is_none());
        assert!(next_device_in(&[], None).is_none());
    }

    #[test]
    fn test_next_device_without_active_starts_at_first() {
        let devices = three_devices();
        assert_eq!(next_device_in(&devices, None).unwrap().device_id, "a");
        assert_eq!(next_device_in(&devices, Some("zzz")).unwrap().device_id, "a");
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_times_out() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<_, PlatformError>(())
        };
        let err = bounded(Some(Duration::from_secs(1)), "slow call", slow)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Timeout);
        assert!(err.message.contains("slow call"));
    }

    #[tokio::test]
    async fn test_bounded_classifies_platform_failure() {
        let failing = async { Err::<(), _>(PlatformError::new("NotFoundError", "gone")) };
        let err = bounded(None, "open", failing).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NoDevice);
    }

    #[test]
    fn test_default_options() {
        let options = ControllerOptions::default();
        assert_eq!(options.open_timeout, Some(Duration::from_secs(10)));
        assert!(ControllerOptions::unbounded().metadata_timeout.is_none());
    }
}

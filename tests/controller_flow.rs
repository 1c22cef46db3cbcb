use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use camkit::camera::{
    Constrain, FacingMode, FocusMode, PreviewSink, StreamPhase,
    check_supported_resolutions_from_specs, reconcile_actual_resolution,
};
use camkit::simulator::{RigSpec, VirtualDeviceSpec, VirtualSession};
use camkit::{
    CameraConfiguration, CameraController, CameraEvent, CameraSettings, CameraType,
    CaptureOptions, ConfigPatch, ControllerOptions, ErrorCode, EventKind, ImageType,
    PermissionStatus, Resolution,
};

fn three_cameras() -> RigSpec {
    RigSpec {
        devices: vec![
            VirtualDeviceSpec::camera("a", "Camera A", None),
            VirtualDeviceSpec::camera("b", "Camera B", None),
            VirtualDeviceSpec::camera("c", "Camera C", None),
        ],
        ..Default::default()
    }
}

fn counter(controller: &mut CameraController, kind: EventKind) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);
    controller.subscribe(kind, move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    count
}

fn active_id(controller: &CameraController) -> Option<String> {
    controller.active_device().map(|d| d.device_id.clone())
}

#[tokio::test]
async fn empty_enumeration_yields_no_devices() {
    let session = VirtualSession::new(RigSpec::default());
    let mut controller = session.controller();
    let errors = counter(&mut controller, EventKind::Error);

    let devices = controller.list_devices().await;

    assert!(devices.is_empty());
    assert!(!controller.state().has_multiple_devices);
    assert_eq!(
        controller.state().error.as_ref().map(|e| e.code),
        Some(ErrorCode::NoDevice)
    );
    assert_eq!(errors.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn two_cameras_set_multiple_devices_flag() {
    let session = VirtualSession::new(RigSpec::phone());
    let mut controller = session.controller();

    let devices = controller.list_devices().await;

    let ids: Vec<_> = devices.iter().map(|d| d.device_id.as_str()).collect();
    assert_eq!(ids, ["front", "back"]);
    assert!(controller.state().has_multiple_devices);
    assert!(controller.state().error.is_none());
}

#[tokio::test]
async fn start_failure_leaves_session_inactive() {
    let mut spec = RigSpec::laptop();
    spec.devices[0].open_error = Some("NotReadableError".into());
    let session = VirtualSession::new(spec);
    let mut controller = session.controller();

    let err = controller.start_stream().await.unwrap_err();

    assert_eq!(err.code, ErrorCode::CameraStartError);
    assert_eq!(err.root_cause().code, ErrorCode::CameraAlreadyInUse);
    assert!(!controller.is_active());
    assert!(!controller.is_initializing());
    assert_eq!(controller.phase(), StreamPhase::Idle);
    assert_eq!(
        controller.state().error.as_ref().map(|e| e.code),
        Some(ErrorCode::CameraStartError)
    );
    assert!(controller.state().stream.is_none());
}

#[tokio::test]
async fn initialize_reports_classified_root_cause() {
    let spec = RigSpec {
        deny_access: true,
        ..RigSpec::laptop()
    };
    let session = VirtualSession::new(spec);
    let mut controller = session.controller();

    let reported = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = Arc::clone(&reported);
    controller.subscribe(EventKind::Error, move |event| {
        if let CameraEvent::Error(err) = event {
            sink.lock().unwrap().push(err.code);
        }
    });

    let err = controller
        .initialize(CameraConfiguration::default())
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::PermissionDenied);
    assert_eq!(
        controller.state().error.as_ref().map(|e| e.code),
        Some(ErrorCode::PermissionDenied)
    );
    assert_eq!(*reported.lock().unwrap(), vec![ErrorCode::PermissionDenied]);
    assert!(!controller.is_active());
}

#[tokio::test]
async fn initialize_without_media_devices() {
    let spec = RigSpec {
        media_devices: false,
        ..RigSpec::laptop()
    };
    let session = VirtualSession::new(spec);
    let mut controller = session.controller();

    let err = controller
        .initialize(CameraConfiguration::default())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NoMediaDevicesSupport);
    assert_eq!(session.rig.open_count(), 0);
}

#[tokio::test]
async fn torch_without_capability_is_reported_not_raised() {
    let session = VirtualSession::new(RigSpec::laptop());
    let mut controller = session.controller();
    controller
        .initialize(CameraConfiguration::default())
        .await
        .expect("start laptop camera");
    assert!(!controller.state().supports_torch);
    let errors = counter(&mut controller, EventKind::Error);

    controller.enable_torch(true).await.expect("torch failure is not raised");

    assert!(!controller.state().is_torch_enabled);
    assert_eq!(
        controller.state().error.as_ref().map(|e| e.code),
        Some(ErrorCode::TorchError)
    );
    assert_eq!(errors.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn torch_without_stream_is_an_error() {
    let session = VirtualSession::new(RigSpec::phone());
    let mut controller = session.controller();

    let err = controller.enable_torch(true).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::NoStream);
}

#[tokio::test]
async fn mobile_portrait_stream_matches_rotated_request() {
    let session = VirtualSession::new(RigSpec::phone());
    let mut controller = session.controller();

    controller
        .initialize(CameraConfiguration {
            target_resolution: Some(Resolution::new(1280, 720)),
            enable_auto_rotation: true,
            ..Default::default()
        })
        .await
        .expect("start phone camera");

    let sent = session
        .rig
        .last_constraints()
        .and_then(|c| c.video)
        .expect("video constraints sent");
    assert_eq!(sent.width, Some(Constrain::Exact(720)));
    assert_eq!(sent.height, Some(Constrain::Exact(1280)));

    let active = controller.active_resolution().cloned().expect("active resolution");
    assert_eq!((active.width, active.height), (720, 1280));
    assert_eq!(active_id(&controller).as_deref(), Some("front"));
    assert_eq!(session.preview.natural_size(), (720, 1280));

    let plan = controller.build_constraints(false);
    let reconciled = reconcile_actual_resolution(720, 1280, plan.configured_request(), true);
    assert!(!reconciled.mismatch);
    assert!(!reconciled.swapped);
}

#[tokio::test]
async fn switch_camera_cycles_back_to_start() {
    let session = VirtualSession::new(three_cameras());
    let mut controller = session.controller();
    controller
        .initialize(CameraConfiguration::default())
        .await
        .expect("start first camera");
    assert_eq!(active_id(&controller).as_deref(), Some("a"));

    let mut visited = Vec::new();
    for _ in 0..3 {
        controller.switch_camera().await.expect("switch camera");
        visited.push(active_id(&controller).unwrap_or_default());
    }

    assert_eq!(visited, ["b", "c", "a"]);
    assert_eq!(session.rig.live_tracks(), 1);
}

#[tokio::test]
async fn switch_camera_needs_a_second_device() {
    let session = VirtualSession::new(RigSpec::laptop());
    let mut controller = session.controller();
    controller
        .initialize(CameraConfiguration::default())
        .await
        .expect("start laptop camera");

    let err = controller.switch_camera().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::NoDevice);
    assert!(controller.is_active());
}

#[tokio::test]
async fn configuration_changes_patch_or_restart() {
    let session = VirtualSession::new(RigSpec::laptop());
    let mut controller = session.controller();
    controller
        .initialize(CameraConfiguration::default())
        .await
        .expect("start laptop camera");
    assert_eq!(session.rig.open_count(), 1);

    // Mirroring alone never reopens the device.
    controller
        .apply_configuration_changes(ConfigPatch::mirroring(true), false)
        .await
        .expect("mirror");
    assert!(session.preview.is_mirrored());
    assert_eq!(session.rig.open_count(), 1);

    controller
        .apply_configuration_changes(ConfigPatch::resolution(Resolution::new(640, 480)), false)
        .await
        .expect("restart at VGA");
    assert_eq!(session.rig.open_count(), 2);
    let active = controller.active_resolution().cloned().expect("active resolution");
    assert_eq!((active.width, active.height), (640, 480));

    let fallback = ConfigPatch {
        fallback_resolution: Some(Some(Resolution::new(800, 600))),
        ..Default::default()
    };
    controller
        .apply_configuration_changes(fallback, false)
        .await
        .expect("reconstrain in place");
    assert_eq!(session.rig.open_count(), 2);
    let settings = controller
        .state()
        .stream
        .as_ref()
        .and_then(|s| s.video_track())
        .map(|t| t.settings())
        .expect("live track");
    assert_eq!((settings.width, settings.height), (Some(800), Some(600)));
    let active = controller.active_resolution().cloned().expect("active resolution");
    assert_eq!((active.width, active.height), (800, 600));
}

#[tokio::test]
async fn failed_reconstrain_rolls_back_configuration() {
    let mut spec = RigSpec::laptop();
    spec.devices[0].constraint_error = Some("OverconstrainedError".into());
    let session = VirtualSession::new(spec);
    let mut controller = session.controller();
    controller
        .initialize(CameraConfiguration::default())
        .await
        .expect("start laptop camera");

    let fallback = ConfigPatch {
        fallback_resolution: Some(Some(Resolution::new(800, 600))),
        enable_mirroring: Some(true),
        ..Default::default()
    };
    let err = controller
        .apply_configuration_changes(fallback, false)
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::ConfigurationError);
    assert!(controller.state().config.fallback_resolution.is_none());
    assert!(!controller.state().config.enable_mirroring);
    assert!(controller.is_active());
}

#[tokio::test]
async fn capabilities_settings_and_focus() {
    let session = VirtualSession::new(RigSpec::phone());
    let mut controller = session.controller();
    controller
        .initialize(CameraConfiguration::document_scan())
        .await
        .expect("start rear camera");

    assert_eq!(active_id(&controller).as_deref(), Some("back"));
    assert_eq!(controller.state().config.camera_type, CameraType::Back);
    let state = controller.state();
    assert!(state.supports_torch && state.supports_focus && state.supports_zoom);

    controller.enable_torch(true).await.expect("torch on");
    assert!(controller.state().is_torch_enabled);

    let changes = counter(&mut controller, EventKind::SettingsChanged);
    controller
        .update_settings(CameraSettings {
            zoom: Some(2.5),
            ..Default::default()
        })
        .await;
    assert_eq!(changes.load(Ordering::SeqCst), 1);
    let current = controller.state().current_settings.clone().unwrap_or_default();
    assert_eq!(current.zoom, Some(2.5));
    assert_eq!(current.torch, Some(true));

    let stream = controller.state().stream.clone().expect("running stream");
    controller
        .set_focus_mode(stream.as_ref(), FocusMode::Manual)
        .await
        .expect("manual focus");
    let err = controller
        .set_focus_mode(stream.as_ref(), FocusMode::SingleShot)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::FocusError);

    controller.stop_stream();
    assert!(!controller.state().is_torch_enabled);
    assert_eq!(session.rig.live_tracks(), 0);
}

#[tokio::test]
async fn unsupported_settings_are_not_recorded() {
    let session = VirtualSession::new(RigSpec::laptop());
    let mut controller = session.controller();
    controller
        .initialize(CameraConfiguration::default())
        .await
        .expect("start laptop camera");
    let changes = counter(&mut controller, EventKind::SettingsChanged);

    controller
        .update_settings(CameraSettings {
            torch: Some(true),
            zoom: Some(2.0),
            ..Default::default()
        })
        .await;

    let state = controller.state();
    assert!(!state.supports_torch);
    assert!(!state.is_torch_enabled);
    assert!(state.error.is_none());
    let current = state.current_settings.clone().unwrap_or_default();
    assert_eq!(current.torch, None);
    assert_eq!(current.zoom, None);
    assert_eq!(changes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_torch_update_is_reported_not_raised() {
    let mut spec = RigSpec::phone();
    spec.devices[1].constraint_error = Some("NotReadableError".into());
    let session = VirtualSession::new(spec);
    let mut controller = session.controller();
    controller
        .initialize(CameraConfiguration::document_scan())
        .await
        .expect("start rear camera");
    assert_eq!(active_id(&controller).as_deref(), Some("back"));
    assert!(controller.state().supports_torch);
    let errors = counter(&mut controller, EventKind::Error);

    controller.enable_torch(true).await.expect("torch failure is not raised");

    let state = controller.state();
    assert!(!state.is_torch_enabled);
    assert_eq!(state.error.as_ref().map(|e| e.code), Some(ErrorCode::TorchError));
    assert_eq!(
        state.error.as_ref().map(|e| e.root_cause().code),
        Some(ErrorCode::CameraAlreadyInUse)
    );
    assert_eq!(errors.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_settings_update_goes_to_error_handler() {
    let mut spec = RigSpec::phone();
    spec.devices[1].constraint_error = Some("NotReadableError".into());
    let session = VirtualSession::new(spec);
    let mut controller = session.controller();
    controller
        .initialize(CameraConfiguration::document_scan())
        .await
        .expect("start rear camera");
    let errors = counter(&mut controller, EventKind::Error);
    let changes = counter(&mut controller, EventKind::SettingsChanged);

    controller
        .update_settings(CameraSettings {
            zoom: Some(3.0),
            ..Default::default()
        })
        .await;

    let state = controller.state();
    assert_eq!(
        state.error.as_ref().map(|e| e.code),
        Some(ErrorCode::CameraSettingsError)
    );
    assert!(state.current_settings.as_ref().and_then(|s| s.zoom).is_none());
    assert_eq!(errors.load(Ordering::SeqCst), 1);
    assert_eq!(changes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn take_photo_scales_and_encodes() {
    let session = VirtualSession::new(RigSpec::laptop());
    let mut controller = session.controller();
    controller
        .initialize(CameraConfiguration::default())
        .await
        .expect("start laptop camera");
    let captured = counter(&mut controller, EventKind::PhotoCaptured);

    let photo = controller
        .take_photo(&CaptureOptions {
            scale: 0.5,
            image_type: ImageType::Png,
            ..Default::default()
        })
        .expect("photo");

    assert_eq!((photo.width, photo.height), (640, 360));
    assert!(photo.uri.starts_with("data:image/png;base64,"));
    assert!(photo.uri.ends_with(&photo.base64));
    assert!(!photo.bytes.is_empty());
    assert_eq!(captured.load(Ordering::SeqCst), 1);
    assert!(controller.state().last_captured_image.is_some());
}

#[tokio::test]
async fn take_photo_failures_are_wrapped() {
    let session = VirtualSession::new(RigSpec::laptop());
    let mut controller = session.controller();

    let err = controller.take_photo(&CaptureOptions::default()).unwrap_err();
    assert_eq!(err.code, ErrorCode::CameraTakePhotoError);
    assert_eq!(err.root_cause().code, ErrorCode::NoStream);

    controller
        .initialize(CameraConfiguration::default())
        .await
        .expect("start laptop camera");
    session.canvas.set_context_available(false);

    let err = controller.take_photo(&CaptureOptions::default()).unwrap_err();
    assert_eq!(err.root_cause().code, ErrorCode::CanvasError);
    assert_eq!(
        controller.state().error.as_ref().map(|e| e.code),
        Some(ErrorCode::CameraTakePhotoError)
    );
}

#[tokio::test]
async fn permission_queries() {
    let session = VirtualSession::new(RigSpec::laptop());
    let controller = session.controller();

    let camera = controller.get_camera_permissions().await.expect("camera query");
    assert!(camera.granted);
    let microphone = controller.get_microphone_permissions().await.expect("mic query");
    assert_eq!(microphone.status, PermissionStatus::Undetermined);

    session.rig.update(|spec| spec.microphone_permission = None);
    let microphone = controller.get_microphone_permissions().await.expect("mic query");
    assert_eq!(microphone.status, PermissionStatus::Undetermined);

    let requested = controller.request_camera_permissions().await;
    assert_eq!(requested.status, PermissionStatus::Granted);
    assert_eq!(session.rig.live_tracks(), 0);

    session.rig.update(|spec| spec.deny_access = true);
    let requested = controller.request_camera_permissions().await;
    assert_eq!(requested.status, PermissionStatus::Denied);
}

#[tokio::test]
async fn missing_permissions_api() {
    let spec = RigSpec {
        permissions_api: false,
        ..RigSpec::laptop()
    };
    let session = VirtualSession::new(spec);
    let controller = session.controller();

    let err = controller.get_camera_permissions().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::NoPermissionsApi);
}

#[tokio::test(start_paused = true)]
async fn hung_device_open_times_out() {
    let mut spec = RigSpec::laptop();
    spec.devices[0].open_delay_ms = 60_000;
    let session = VirtualSession::new(spec);
    let mut controller = session.controller();

    let err = controller
        .initialize(CameraConfiguration::default())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::Timeout);
    assert!(!controller.is_initializing());
}

#[tokio::test(start_paused = true)]
async fn stalled_preview_releases_the_stream() {
    let session = VirtualSession::new(RigSpec::laptop());
    session.preview.stall_metadata(true);
    let mut controller = session.controller();

    let err = controller.start_stream().await.unwrap_err();
    assert_eq!(err.root_cause().code, ErrorCode::Timeout);
    assert_eq!(session.rig.live_tracks(), 0);
    assert!(!session.preview.is_attached());
    assert!(controller.state().stream.is_none());
}

#[tokio::test]
async fn unbounded_options_still_start() {
    let session = VirtualSession::new(RigSpec::laptop());
    let mut controller = session
        .controller()
        .with_options(ControllerOptions::unbounded());

    controller
        .initialize(CameraConfiguration::selfie())
        .await
        .expect("start selfie camera");
    assert!(session.preview.is_mirrored());
    assert!(!controller.toggle_mirroring());
    assert!(!session.preview.is_mirrored());
}

#[tokio::test]
async fn observers_see_lifecycle_events() {
    let session = VirtualSession::new(RigSpec::laptop());
    let mut controller = session.controller();
    let states = counter(&mut controller, EventKind::StateChanged);
    let started = counter(&mut controller, EventKind::Started);
    let stopped = counter(&mut controller, EventKind::Stopped);

    let facing = Arc::new(std::sync::Mutex::new(None));
    let sink = Arc::clone(&facing);
    let id = controller.subscribe(EventKind::Started, move |event| {
        if let CameraEvent::Started { device, .. } = event {
            *sink.lock().unwrap() = device.as_ref().map(|d| d.device_id.clone());
        }
    });

    controller
        .initialize(CameraConfiguration::default())
        .await
        .expect("start laptop camera");
    controller.stop_stream();

    assert!(states.load(Ordering::SeqCst) >= 4);
    assert_eq!(started.load(Ordering::SeqCst), 1);
    assert_eq!(stopped.load(Ordering::SeqCst), 1);
    assert_eq!(facing.lock().unwrap().as_deref(), Some("integrated"));

    assert!(controller.unsubscribe(id));
    assert!(!controller.unsubscribe(id));
}

#[tokio::test]
async fn stop_failure_is_reported() {
    let session = VirtualSession::new(RigSpec::laptop());
    let mut controller = session.controller();
    controller
        .initialize(CameraConfiguration::default())
        .await
        .expect("start laptop camera");
    session.preview.fail_detach(Some("InvalidStateError"));

    controller.stop_stream();

    assert_eq!(
        controller.state().error.as_ref().map(|e| e.code),
        Some(ErrorCode::CameraStopError)
    );
    assert_eq!(controller.phase(), StreamPhase::Idle);
    assert_eq!(session.rig.live_tracks(), 0);
}

#[tokio::test]
async fn device_change_rebuilds_cache() {
    let session = VirtualSession::new(RigSpec::phone());
    let mut controller = session.controller();
    assert_eq!(controller.list_devices().await.len(), 2);

    session.rig.update(|spec| {
        spec.devices
            .push(VirtualDeviceSpec::camera("usb", "USB Camera", Some(FacingMode::User)))
    });
    assert_eq!(controller.list_devices().await.len(), 2);

    let changes = counter(&mut controller, EventKind::DevicesChanged);
    controller.handle_device_change().await;
    assert_eq!(controller.list_devices().await.len(), 3);
    assert_eq!(changes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn survey_reports_device_maximums() {
    let session = VirtualSession::new(RigSpec::phone());
    let mut controller = session.controller();

    let surveyed = controller.initialize_camera_capabilities().await;

    let maxima: Vec<_> = surveyed
        .iter()
        .map(|m| (m.device_id.as_str(), m.max_width, m.max_height))
        .collect();
    assert_eq!(maxima, [("front", 1920, 1080), ("back", 3840, 2160)]);
    assert_eq!(session.rig.live_tracks(), 0);

    let table = check_supported_resolutions_from_specs(&surveyed[0], None);
    assert!(
        table
            .iter()
            .all(|s| s.is_supported == (s.resolution.width <= 1920 && s.resolution.height <= 1080))
    );
}

#[tokio::test]
async fn destroy_resets_everything() {
    let session = VirtualSession::new(RigSpec::laptop());
    let mut controller = session.controller();
    let states = counter(&mut controller, EventKind::StateChanged);
    controller
        .initialize(CameraConfiguration::default())
        .await
        .expect("start laptop camera");

    controller.destroy();
    let seen = states.load(Ordering::SeqCst);

    assert!(!controller.is_active());
    assert!(controller.state().devices.is_empty());
    assert_eq!(session.rig.live_tracks(), 0);
    assert!(!session.preview.is_attached());

    controller.list_devices().await;
    assert_eq!(states.load(Ordering::SeqCst), seen);
}

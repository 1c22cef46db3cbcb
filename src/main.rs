//! camkit command-line entrypoint

use anyhow::{Context, Result};
use camkit::camera::check_supported_resolutions_from_specs;
use camkit::simulator::{RigSpec, VirtualSession};
use camkit::{CamkitConfig, CameraController, CaptureOptions, ImageType, logging};
use clap::Parser;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "camkit",
    version,
    about = "Drive a camera session against a virtual camera rig"
)]
struct Cli {
    /// Optional configuration file (toml/yaml). Defaults to camkit.{toml,yaml} in cwd/XDG config.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Virtual rig description (toml/yaml). Defaults to a laptop with one webcam.
    #[arg(long, value_name = "PATH")]
    rig: Option<PathBuf>,

    /// Pin the camera by device id (takes precedence over config file)
    #[arg(long, value_name = "ID")]
    device: Option<String>,

    /// List detected cameras and exit
    #[arg(long)]
    list_devices: bool,

    /// Survey every camera's maximum resolution against the standard table
    #[arg(long)]
    probe: bool,

    /// Start the camera, capture one still and write it to PATH (.png or .jpg)
    #[arg(long, value_name = "PATH")]
    snapshot: Option<PathBuf>,

    /// Still size relative to the preview, in (0, 1]
    #[arg(long, value_name = "FACTOR", default_value_t = 1.0)]
    scale: f32,

    /// JPEG quality in [0, 1]
    #[arg(long, value_name = "QUALITY", default_value_t = 0.92)]
    quality: f32,

    /// Output results as formatted JSON instead of human-readable text
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = CamkitConfig::load(cli.config.as_deref())?;
    if let Some(ref device) = cli.device {
        config.camera.device = Some(device.clone());
    }

    logging::init(&config.logging)?;
    info!(?config, "Starting camkit");

    let spec = match cli.rig.as_deref() {
        Some(path) => RigSpec::from_file(path)?,
        None => RigSpec::laptop(),
    };
    let session = VirtualSession::new(spec);
    let mut controller = session.controller().with_options(config.controller_options());

    if cli.list_devices {
        list_devices(&mut controller, cli.json).await?;
    } else if cli.probe {
        probe(&mut controller, cli.json).await?;
    } else if let Some(ref path) = cli.snapshot {
        snapshot(&mut controller, &config, &cli, path).await?;
    } else {
        status(&mut controller, &config, cli.json).await?;
    }

    controller.destroy();
    Ok(())
}

async fn list_devices(controller: &mut CameraController, json: bool) -> Result<()> {
    let devices = controller.list_devices().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
    } else if devices.is_empty() {
        println!("No cameras detected");
    } else {
        println!("Discovered cameras:");
        for (index, dev) in devices.iter().enumerate() {
            println!("  [{index}] {} ({})", dev.label, dev.device_id);
        }
    }
    Ok(())
}

async fn probe(controller: &mut CameraController, json: bool) -> Result<()> {
    let surveyed = controller.initialize_camera_capabilities().await;

    if json {
        let report: Vec<_> = surveyed
            .iter()
            .map(|max| {
                json!({
                    "device": max,
                    "resolutions": check_supported_resolutions_from_specs(max, None),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if surveyed.is_empty() {
        println!("No cameras could be probed");
    }
    for max in &surveyed {
        println!("{} ({}): up to {}x{}", max.label, max.device_id, max.max_width, max.max_height);
        for support in check_supported_resolutions_from_specs(max, None) {
            let mark = if support.is_supported { "yes" } else { "no" };
            println!("  {:<24} {mark}", support.resolution.to_string());
        }
    }
    Ok(())
}

async fn snapshot(
    controller: &mut CameraController,
    config: &CamkitConfig,
    cli: &Cli,
    path: &Path,
) -> Result<()> {
    let image_type = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(ImageType::parse)
        .unwrap_or(ImageType::Png);

    controller
        .initialize(config.camera_configuration()?)
        .await
        .context("Failed to start the camera")?;

    let started = Instant::now();
    let photo = controller.take_photo(&CaptureOptions {
        quality: cli.quality,
        scale: cli.scale,
        image_type,
        mirror: config.camera.mirror.unwrap_or(false),
    })?;
    std::fs::write(path, &photo.bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    if cli.json {
        let payload = json!({
            "path": path,
            "width": photo.width,
            "height": photo.height,
            "mime": photo.image_type.mime(),
            "bytes": photo.bytes.len(),
            "timestamp": photo.timestamp,
            "elapsed_ms": started.elapsed().as_millis() as u64,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!(
            "Wrote {}x{} {} ({} bytes) to {}",
            photo.width,
            photo.height,
            photo.image_type.mime(),
            photo.bytes.len(),
            path.display()
        );
    }
    Ok(())
}

async fn status(controller: &mut CameraController, config: &CamkitConfig, json: bool) -> Result<()> {
    let result = controller.initialize(config.camera_configuration()?).await;
    let state = controller.state();

    if json {
        let payload = json!({
            "active": state.is_active,
            "device": state.active_device,
            "resolution": state.active_resolution,
            "devices": state.devices,
            "supports_torch": state.supports_torch,
            "supports_focus": state.supports_focus,
            "supports_zoom": state.supports_zoom,
            "error": state.error.as_ref().map(|e| json!({ "code": e.code, "message": e.message })),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        match (&state.active_device, &state.active_resolution) {
            (Some(device), Some(resolution)) => {
                println!("Streaming from {} at {resolution}", device.label)
            }
            _ => println!("Camera is not active"),
        }
        println!(
            "Torch: {}  Focus: {}  Zoom: {}",
            state.supports_torch, state.supports_focus, state.supports_zoom
        );
    }

    result.context("Failed to start the camera")?;
    Ok(())
}

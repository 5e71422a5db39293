//! Camera Acquisition Demo - Main Entry Point
//!
//! Opens a camera (the simulator unless a real driver is compiled in),
//! applies the configured parameters, and streams converted frames until
//! the configured run time elapses.

use camgrab_rs::config::AcquireConfig;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,camgrab_rs=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting camera acquisition");

    // Load configuration from the given path, or the default location
    let config = match std::env::args().nth(1) {
        Some(path) => {
            tracing::info!("Loading config from {}", path);
            AcquireConfig::load(Path::new(&path))?
        }
        None => AcquireConfig::load_or_default(),
    };

    run(config)
}

#[cfg(feature = "mock-camera")]
fn run(config: AcquireConfig) -> anyhow::Result<()> {
    use anyhow::Context;
    use camgrab_rs::{
        acquire, directory, CameraSession, CancelToken, MockCamera, MockDevice, PixelFormat,
        TransportMask,
    };
    use std::time::Duration;

    // Simulated rig: one GigE camera delivering Bayer frames at ~30 fps
    let camera = MockCamera::new()
        .with_device(
            MockDevice::gige("MV-SIM-0001", "SimCam GigE", [192, 168, 1, 64])
                .with_sensor(1280, 1024, PixelFormat::BayerBG8),
        )
        .with_frame_interval(Duration::from_millis(33));

    // List what is reachable before committing to one device
    let mut lister = camera.clone();
    let devices = directory::enumerate(&mut lister, TransportMask::ALL);
    if devices.is_empty() {
        anyhow::bail!("no cameras found");
    }
    for (i, device) in devices.iter().enumerate() {
        tracing::info!("  [{}] {}", i, device);
    }

    let mut session = CameraSession::new(camera);
    match &config.camera.serial {
        Some(serial) => session
            .open_by_serial(serial)
            .with_context(|| format!("opening camera with serial {}", serial))?,
        None => session
            .open(config.camera.index)
            .with_context(|| format!("opening camera {}", config.camera.index))?,
    }

    config.apply_to(&mut session);
    session.log_capabilities();
    session.start_grabbing()?;

    // Stop after the configured run time, if any
    let cancel = CancelToken::new();
    if let Some(secs) = config.run_seconds {
        let timer = cancel.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_secs(secs));
            tracing::info!("Run time elapsed, stopping");
            timer.cancel();
        });
    }

    let index = session.device_index().unwrap_or(config.camera.index);
    let options = config.to_options();
    let mut logged_first = false;
    let stats = acquire::run(&mut session, index, &options, &cancel, |frame| {
        if !logged_first {
            tracing::info!(
                "First frame: {}x{} {} ({} bytes)",
                frame.width,
                frame.height,
                frame.pixel_format,
                frame.len()
            );
            logged_first = true;
        }
        tracing::trace!("Frame {} delivered", frame.frame_id);
    });

    session.close();
    tracing::info!(
        "Done: {} frame(s), {} empty, {} failed, {} bytes total",
        stats.frames,
        stats.empty_grabs,
        stats.failed_grabs,
        stats.total_bytes
    );
    Ok(())
}

#[cfg(not(feature = "mock-camera"))]
fn run(_config: AcquireConfig) -> anyhow::Result<()> {
    anyhow::bail!("no camera driver compiled in; rebuild with --features mock-camera")
}

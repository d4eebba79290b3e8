//! ccdsoft-cli
//!
//! Drives a simulated CCDSoft camera through the same driver code a real
//! automation backend would use. Useful for checking configuration files and
//! watching the exposure sequence in the logs.
//!
//! ```bash
//! RUST_LOG=debug ccdsoft-cli --config camera.toml expose --exptime 2 --binning 2x2
//! ccdsoft-cli cool --setpoint -15
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use obs_core::capabilities::{acquire, CameraInfo, TemperatureControl};
use obs_core::observer::LoggingObserver;
use obs_core::storage::MemoryImageStore;
use obs_core::{AbortSignal, CameraConfig, ImageRequest, Shutter, Window};
use obs_driver_ccdsoft::mock::MockCcdSoft;
use obs_driver_ccdsoft::CcdSoftCamera;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "ccdsoft-cli")]
#[command(about = "Exercise the CCDSoft camera driver against a simulated camera", long_about = None)]
struct Cli {
    /// Camera configuration file (TOML). CCDSOFT_* environment variables override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the capability tables
    Capabilities,

    /// Take one exposure and read it out
    Expose {
        /// Exposure time in seconds
        #[arg(long, default_value = "1.0")]
        exptime: f64,

        /// Binning name, e.g. 2x2
        #[arg(long)]
        binning: Option<String>,

        /// open, close or leave_as_is
        #[arg(long, default_value = "open")]
        shutter: Shutter,

        /// Region of interest as top,left,width,height
        #[arg(long)]
        window: Option<Window>,

        /// Polls before the simulated exposure completes
        #[arg(long, default_value = "5")]
        polls: u32,
    },

    /// Start temperature regulation and report a few readings
    Cool {
        /// Set point in Celsius
        #[arg(long, allow_hyphen_values = true)]
        setpoint: f64,

        /// Temperature readings to take
        #[arg(long, default_value = "5")]
        readings: u32,
    },

    /// Connect and print temperature status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = CameraConfig::load(cli.config.as_deref()).context("loading camera config")?;

    match cli.command {
        Commands::Capabilities => print_capabilities(config),
        Commands::Expose {
            exptime,
            binning,
            shutter,
            window,
            polls,
        } => expose(config, exptime, binning, shutter, window, polls).await,
        Commands::Cool { setpoint, readings } => cool(config, setpoint, readings).await,
        Commands::Status => status(config).await,
    }
}

fn simulated_camera(
    config: CameraConfig,
    mock: MockCcdSoft,
    store: Arc<MemoryImageStore>,
) -> Result<CcdSoftCamera<MockCcdSoft>> {
    let mock = mock.with_sensor(config.ccd_width, config.ccd_height);
    Ok(CcdSoftCamera::builder(mock)
        .config(config)
        .image_saver(store)
        .observer(Arc::new(LoggingObserver))
        .build()?)
}

fn print_capabilities(config: CameraConfig) -> Result<()> {
    let camera = simulated_camera(config, MockCcdSoft::new(), Arc::new(MemoryImageStore::new()))?;

    let modes: Vec<_> = camera
        .readout_modes()
        .values()
        .flat_map(|modes| modes.values())
        .collect();
    let report = json!({
        "model": camera.config().model,
        "physical_size": camera.physical_size(),
        "pixel_size": camera.pixel_size(),
        "current_ccd": camera.current_ccd().to_string(),
        "binnings": camera.binnings(),
        "adcs": camera.adcs(),
        "readout_modes": modes,
        "features": obs_core::CameraFeature::ALL
            .iter()
            .map(|f| (format!("{f:?}"), camera.supports(*f)))
            .collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn expose(
    config: CameraConfig,
    exptime: f64,
    binning: Option<String>,
    shutter: Shutter,
    window: Option<Window>,
    polls: u32,
) -> Result<()> {
    let store = Arc::new(MemoryImageStore::new());
    let mock = MockCcdSoft::new().with_polls_to_complete(Some(polls));
    let camera = simulated_camera(config, mock, store.clone())?;
    camera.start().await?;

    let mut request = ImageRequest::new(exptime).with_shutter(shutter);
    if let Some(binning) = binning {
        request = request.with_binning(binning);
    }
    if let Some(window) = window {
        request = request.with_window(window);
    }

    let abort = AbortSignal::new();
    let ctrl_c = abort.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, aborting exposure");
            ctrl_c.set();
        }
    });

    let info = camera.readout_mode_info(request.binning.as_deref(), request.window)?;
    let result = acquire(&camera, &mut request, &abort).await;
    camera.stop().await?;

    let report = match result? {
        Some(proxy) => {
            let stored = store
                .get(&proxy)
                .context("image missing from store after readout")?;
            json!({
                "status": "ok",
                "image": proxy.to_string(),
                "exptime": request.exptime,
                "width": stored.pixels.width,
                "height": stored.pixels.height,
                "window": [info.top, info.left, info.width, info.height],
                "metadata": stored.metadata,
                "headers": stored.headers,
            })
        }
        None => json!({ "status": "aborted", "exptime": request.exptime }),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn cool(config: CameraConfig, setpoint: f64, readings: u32) -> Result<()> {
    let interval = config.poll_interval;
    let camera = simulated_camera(config, MockCcdSoft::new(), Arc::new(MemoryImageStore::new()))?;
    camera.start().await?;

    if !camera.start_cooling(setpoint).await? {
        println!("Temperature control not supported");
        camera.stop().await?;
        return Ok(());
    }

    for _ in 0..readings {
        if let Some(temperature) = camera.temperature().await? {
            println!("{temperature:.2} °C (set point {setpoint:.2} °C)");
        }
        tokio::time::sleep(interval).await;
    }

    camera.stop_cooling().await?;
    camera.stop().await?;
    Ok(())
}

async fn status(config: CameraConfig) -> Result<()> {
    let camera = simulated_camera(config, MockCcdSoft::new(), Arc::new(MemoryImageStore::new()))?;
    camera.start().await?;

    let report = json!({
        "model": camera.config().model,
        "connected": camera.is_connected().await,
        "cooling": camera.is_cooling().await?,
        "temperature": camera.temperature().await?,
        "set_point": camera.set_point().await?,
    });
    camera.stop().await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

use std::{path::Path, sync::Arc};

use anyhow::Context;
use clap::Parser;
use storage::{FileDriftStore, JsonRecordingFile};
use tokio::{
    sync::{broadcast, mpsc},
    time::Instant,
};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracker::{CommandLauncher, Supervisor, Tracker, TrackerInput};

mod app_state;
mod config;
mod gateway;

use app_state::AppState;
use config::{bind_addr, load_settings};

const EVENT_CAPACITY: usize = 256;

/// Streams head-tracker orientation to browser subscribers.
#[derive(Parser, Debug)]
struct Args {
    /// Port to listen on, replacing the configured one.
    #[arg(long)]
    port: Option<u16>,
    /// Run a drift calibration right away.
    #[arg(long)]
    cal: bool,
    /// Record 10 seconds of broadcast data after a 10 second delay.
    #[arg(long)]
    record: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let settings = load_settings();
    let addr = bind_addr(&settings, args.port)?;
    let launcher = CommandLauncher::from_command_line(&settings.sensor_command)
        .context("invalid sensor_command setting")?;

    let (events, _) = broadcast::channel(EVENT_CAPACITY);
    let (inputs, inputs_rx) = mpsc::channel(tracker::INPUT_CAPACITY);

    let mut tracker = Tracker::new(
        events.clone(),
        Arc::new(FileDriftStore::new(&settings.drift_path)),
        Arc::new(JsonRecordingFile::new(&settings.recording_path)),
    );
    tracker.bootstrap(args.cal, Instant::now()).await;
    tokio::spawn(tracker.run(inputs_rx));
    tokio::spawn(Supervisor::new(launcher).run(inputs.clone()));

    if args.record {
        inputs
            .send(TrackerInput::Record)
            .await
            .context("tracker stopped before recording could start")?;
    }

    let state = AppState { events, inputs };
    let app = gateway::build_router(Arc::new(state), Path::new(&settings.webroot));

    info!(%addr, webroot = %settings.webroot, sensor = %settings.sensor_command, "listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await?;
    Ok(())
}

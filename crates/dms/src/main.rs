//! Drowsiness Monitor - Main Entry Point

use alerting::{location_or_unknown, AlertDispatcher, HttpTransport};
use anyhow::Context;
use camera_capture::CameraConfig;
use dms::replay::open_replay;
use dms::{
    AlarmOrchestrator, CommandAudio, CommandSpeech, DrowsinessEngine, Monitor, MonitorConfig,
    SpeechEngine, SpeechWorker,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!("=== Drowsiness Monitor v{} ===", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config =
        MonitorConfig::load(config_path.as_deref()).context("loading configuration")?;

    let camera = CameraConfig {
        index: config.camera.index,
    };
    let replay = config.camera.replay.as_deref().with_context(|| {
        format!(
            "camera {} unavailable: live capture needs a landmark estimator, set camera.replay",
            camera.device_path()
        )
    })?;
    let (frames, landmarks) = open_replay(replay).context("opening frame source")?;
    info!("Replaying {} frames from {}", frames.remaining(), replay.display());

    let client = reqwest::Client::new();
    let location = location_or_unknown(
        &client,
        &config.alert.geolocation_url,
        config.alert.geolocation_timeout(),
    )
    .await;
    let transport =
        HttpTransport::new(&config.alert.collector_url, config.alert.request_timeout())?;
    let dispatcher = AlertDispatcher::new(
        Arc::new(transport),
        location,
        &config.alert,
        Handle::current(),
    );

    let engine: Option<Box<dyn SpeechEngine>> = if config.speech.command.is_empty() {
        warn!("Speech disabled");
        None
    } else {
        Some(Box::new(CommandSpeech::new(&config.speech.command, config.speech.rate)))
    };
    let speech = SpeechWorker::spawn(engine)?;
    let audio = CommandAudio::new(&config.audio.command, config.audio.args.clone());
    let alarm = AlarmOrchestrator::new(audio, speech, &config.dms.alarm_message);

    let engine = DrowsinessEngine::new(&config.dms)?;
    let mut monitor = Monitor::new(frames, landmarks, engine, alarm).with_dispatcher(dispatcher);

    let stop = Arc::new(AtomicBool::new(false));
    let signal_stop = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping");
            signal_stop.store(true, Ordering::Relaxed);
        }
    });

    let (summary, dispatcher) = tokio::task::spawn_blocking(move || {
        let summary = monitor.run(&stop);
        (summary, monitor.take_dispatcher())
    })
    .await?;
    info!(
        "Processed {} frames ({} without a face): {} alarms, {} yawns",
        summary.frames, summary.face_misses, summary.activations, summary.yawns
    );

    if let Some(mut dispatcher) = dispatcher {
        if dispatcher.in_flight() > 0 {
            info!("Collecting {} pending alert deliveries", dispatcher.in_flight());
        }
        let report = dispatcher.drain(config.alert.request_timeout()).await;
        info!(
            "Alerts: {} delivered, {} failed, {} abandoned",
            report.delivered, report.failed, report.abandoned
        );
    }

    Ok(())
}

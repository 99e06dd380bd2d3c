mod config;
mod sim;
mod world;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{self, EnvFilter};
use wall_navigation::{Detection, WallTracker};

use crate::config::{DEFAULT_CONFIG_PATH, load_config};
use crate::sim::Simulation;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_owned());
    let config = load_config(&path).with_context(|| format!("loading {path}"))?;

    let tracker = Arc::new(WallTracker::new(config.tracking.clone()).context("invalid tracking configuration")?);
    let simulation = Simulation::spawn(Arc::clone(&tracker), config.simulation.clone())?;

    tokio::spawn(log_detections(tracker.outputs().open_place_detection.subscribe()));

    let goal = tracker.accept_goal();
    tokio::spawn(log_arrival(goal.feedback()));

    wait_for_stop(config.simulation.duration_secs).await;
    tracker.shutdown();

    let outcome = goal.outcome().await?;
    info!(status = ?outcome.status, arrived = outcome.arrived, "goal finished");

    tokio::task::spawn_blocking(move || simulation.stop()).await?;
    Ok(())
}

async fn wait_for_stop(duration_secs: Option<f32>) {
    let elapsed = async {
        match duration_secs {
            Some(secs) => tokio::time::sleep(Duration::from_secs_f32(secs)).await,
            None => std::future::pending().await,
        }
    };
    tokio::select! {
        res = tokio::signal::ctrl_c() => match res {
            Ok(()) => info!("Ctrl-C received, shutting down"),
            Err(e) => error!("Unable to listen for Ctrl-C: {}", e),
        },
        _ = elapsed => info!("simulation duration elapsed, shutting down"),
    }
}

async fn log_detections(mut rx: broadcast::Receiver<Arc<Detection>>) {
    let mut last = None;
    loop {
        match rx.recv().await {
            Ok(detection) => {
                if last != Some(*detection) {
                    info!(detection = %detection, "open place detection");
                    last = Some(*detection);
                }
            }
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "detection log fell behind"),
            Err(RecvError::Closed) => break,
        }
    }
}

async fn log_arrival(mut feedback: watch::Receiver<bool>) {
    let mut last = false;
    while feedback.changed().await.is_ok() {
        let arrived = *feedback.borrow_and_update();
        if arrived != last {
            info!(arrived, "open place feedback");
            last = arrived;
        }
    }
}

// Main entry point - wiring and startup validation
mod application;
mod domain;
mod infrastructure;

use std::sync::Arc;
use std::time::Duration;

use crate::application::agent::Agent;
use crate::domain::rotation::{Dwell, RotationState};
use crate::infrastructure::config::load_config;
use crate::infrastructure::fbink::FbinkDisplay;
use crate::infrastructure::iotawatt::IotaWattClient;
use crate::infrastructure::renderer::Renderer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    // Configuration problems are the only acceptable reason to die.
    let cfg = load_config()?;

    let monitor = Arc::new(IotaWattClient::new(
        &cfg.monitor.endpoint,
        Duration::from_secs(cfg.monitor.fetch_timeout_secs),
        cfg.monitor.history_hours,
    )?);
    let display = Arc::new(FbinkDisplay::new(
        cfg.display.fbink_path.clone(),
        cfg.display.spool_dir.clone(),
    ));
    let renderer = Renderer::new(cfg.display.width, cfg.display.height)?;
    let rotation = RotationState::new(Dwell::new(
        cfg.rotation.all_sources_dwell_ticks,
        cfg.rotation.single_source_dwell_ticks,
    ));

    tracing::info!(
        endpoint = %cfg.monitor.endpoint,
        width = cfg.display.width,
        height = cfg.display.height,
        "starting iotawatt display agent"
    );

    let agent = Agent::new(
        monitor,
        display,
        renderer,
        rotation,
        Duration::from_secs(cfg.agent.tick_interval_secs),
        chrono::Duration::seconds(cfg.agent.stale_after_secs),
    );

    // Runs until the launcher kills the process.
    agent.run().await;
    Ok(())
}

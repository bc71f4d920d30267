// Agent configuration
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    pub monitor: MonitorSettings,
    pub rotation: RotationSettings,
    pub agent: AgentSettings,
    pub display: DisplaySettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MonitorSettings {
    pub endpoint: String,
    pub fetch_timeout_secs: u64,
    pub history_hours: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RotationSettings {
    pub all_sources_dwell_ticks: u32,
    pub single_source_dwell_ticks: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentSettings {
    pub tick_interval_secs: u64,
    pub stale_after_secs: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DisplaySettings {
    pub width: u32,
    pub height: u32,
    pub fbink_path: String,
    pub spool_dir: String,
}

/// Loads `config/agent.toml` (optional) over built-in defaults, then applies
/// `AGENT_*` environment overrides. Validation failures abort startup; this
/// is the only fatal error path of the process.
pub fn load_config() -> anyhow::Result<AgentConfig> {
    let settings = config::Config::builder()
        .set_default("monitor.endpoint", "http://iotawatt.local")?
        .set_default("monitor.fetch_timeout_secs", 10_i64)?
        .set_default("monitor.history_hours", 24_i64)?
        .set_default("rotation.all_sources_dwell_ticks", 3_i64)?
        .set_default("rotation.single_source_dwell_ticks", 2_i64)?
        .set_default("agent.tick_interval_secs", 15_i64)?
        .set_default("agent.stale_after_secs", 300_i64)?
        .set_default("display.width", 1072_i64)?
        .set_default("display.height", 1448_i64)?
        .set_default("display.fbink_path", "fbink")?
        .set_default("display.spool_dir", "/tmp/iotawatt-display")?
        .add_source(config::File::with_name("config/agent").required(false))
        .add_source(config::Environment::with_prefix("AGENT").separator("__"))
        .build()?;

    let cfg: AgentConfig = settings.try_deserialize()?;
    validate(&cfg)?;
    Ok(cfg)
}

fn validate(cfg: &AgentConfig) -> anyhow::Result<()> {
    anyhow::ensure!(
        !cfg.monitor.endpoint.trim().is_empty(),
        "monitor.endpoint must not be empty"
    );
    anyhow::ensure!(
        cfg.monitor.fetch_timeout_secs > 0,
        "monitor.fetch_timeout_secs must be positive"
    );
    anyhow::ensure!(
        cfg.monitor.history_hours > 0,
        "monitor.history_hours must be positive"
    );
    anyhow::ensure!(
        cfg.rotation.all_sources_dwell_ticks > 0 && cfg.rotation.single_source_dwell_ticks > 0,
        "rotation dwell durations must be at least one tick"
    );
    anyhow::ensure!(
        cfg.agent.tick_interval_secs > 0,
        "agent.tick_interval_secs must be positive"
    );
    anyhow::ensure!(
        cfg.agent.stale_after_secs > 0,
        "agent.stale_after_secs must be positive"
    );
    // One tick must fit a whole worst-case fetch, so ticks never overlap.
    anyhow::ensure!(
        cfg.agent.tick_interval_secs >= cfg.monitor.fetch_timeout_secs,
        "agent.tick_interval_secs must be >= monitor.fetch_timeout_secs"
    );
    anyhow::ensure!(
        cfg.display.width > 0 && cfg.display.height > 0,
        "display geometry must be non-zero"
    );
    Ok(())
}

use anyhow::Result;
use gdhi_adj::{adjustment::run_adjustment, config::Config};
use std::{env, path::PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_CONFIG: &str = "config/config.yaml";

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,gdhi_adj=info"));
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) load config ──────────────────────────────────────────────
    // usage: gdhi_adj [CONFIG]
    let config_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let config = Config::load(&config_path)?;

    // ─── 3) run ──────────────────────────────────────────────────────
    let outcome = run_adjustment(&config)?;
    info!(
        run_id = %outcome.run_id,
        interim = %outcome.interim_path.display(),
        anomalies = outcome.report.anomalies,
        missing = outcome.report.missing_imputations,
        "done"
    );
    if let Some(path) = &outcome.final_path {
        info!(path = %path.display(), "adjusted data written");
    }
    Ok(())
}

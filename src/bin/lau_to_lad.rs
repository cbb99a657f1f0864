use anyhow::Result;
use gdhi_adj::{
    config::Config,
    mapping::{lau_lad_main, load_data},
};
use std::{env, path::Path};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,gdhi_adj=info"));
    fmt().with_env_filter(filter).init();

    // usage: lau_to_lad [CONFIG]
    let config_path = env::args()
        .nth(1)
        .unwrap_or_else(|| "config/config.yaml".to_string());
    let config = Config::load(&config_path)?;
    let settings = config.mapping()?;

    info!("started mapping LAUs to LADs");
    let frame = load_data(settings)?;
    let mapped = lau_lad_main(
        settings,
        Path::new(&config.pipeline_settings.schema_dir),
        frame,
    )?;
    info!(rows = mapped.len(), "finished");
    Ok(())
}

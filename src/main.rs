//! Indicator Lens - World Bank indicator analysis
//!
//! Usage: `indicator_lens [config.json]`. Without a config the indicator files
//! are read from the working directory and charts are written to `charts/`.

use anyhow::{Context, Result};
use indicator_lens::{pipeline, AnalysisConfig};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let config = match std::env::args().nth(1) {
        Some(path) => AnalysisConfig::from_json_file(&path)
            .with_context(|| format!("loading config from {path}"))?,
        None => AnalysisConfig::default(),
    };
    info!("reading indicators from {}", config.data_dir.display());

    let report = pipeline::run(&config).context("analysis failed")?;
    report.print();

    for chart in &report.charts {
        info!("wrote {}", chart.display());
    }
    Ok(())
}

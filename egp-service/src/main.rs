use std::path::PathBuf;

use clap::Parser;
use egp_service::{app, config::Config, observability::init_tracing};

/// User CRUD service
#[derive(Debug, Parser)]
#[command(name = "egp-service", version, about)]
struct Args {
    /// Configuration file; skips the default search path
    #[arg(short, long, env = "EGP_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let (config, sources) = match args.config {
        Some(path) => (Config::load_from(&path)?, vec![path]),
        None => Config::load_with_sources()?,
    };

    init_tracing(&config)?;

    if sources.is_empty() {
        tracing::info!("No configuration file found, using defaults and environment");
    }
    for path in &sources {
        tracing::info!(path = %path.display(), "Loaded configuration file");
    }

    app::run(config).await?;

    Ok(())
}

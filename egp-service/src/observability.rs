//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

use crate::{
    config::{Config, LogFormat},
    error::{Error, Result},
};

/// Build the filter from `service.log_level`
///
/// Accepts a bare level (`debug`) or full directives
/// (`egp_service=debug,tower_http=info`). Falls back to `info` on a bad value.
pub fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_new(log_level).unwrap_or_else(|e| {
        eprintln!("Invalid log level '{}': {}. Using 'info'", log_level, e);
        EnvFilter::new("info")
    })
}

/// Install the global subscriber
///
/// Fails if a subscriber is already installed.
pub fn init_tracing(config: &Config) -> Result<()> {
    let filter = env_filter(&config.service.log_level);
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match config.service.log_format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
    installed.map_err(|e| Error::Internal(format!("Failed to install tracing subscriber: {}", e)))?;

    tracing::info!(
        service = %config.service.name,
        environment = %config.service.environment,
        format = ?config.service.log_format,
        "Tracing initialized"
    );

    Ok(())
}

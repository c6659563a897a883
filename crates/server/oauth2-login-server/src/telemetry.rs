//! Tracing subscriber setup.

use crate::config::Config;
use anyhow::{Context, Result, anyhow};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber according to the logging configuration.
pub fn init_tracing(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_new(config.log_filter()).context("Invalid log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true);

    let result = match config.logging.format.to_lowercase().as_str() {
        "json" => builder.json().try_init(),
        "compact" => builder.compact().try_init(),
        _ => builder.pretty().try_init(),
    };

    result.map_err(|e| anyhow!(e)).context("Failed to install tracing subscriber")
}

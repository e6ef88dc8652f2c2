//! Tracing subscriber setup

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::KitConfig;
use crate::error::{Error, Result};

/// Install a global subscriber with an env filter and fmt layer.
///
/// `filter` is used when `RUST_LOG` is unset. Fails if a global subscriber
/// is already installed.
pub fn init_tracing(filter: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| Error::Telemetry(e.to_string()))
}

/// Install a global subscriber using the configured filter
pub fn init_tracing_from(config: &KitConfig) -> Result<()> {
    init_tracing(&config.log_filter)
}

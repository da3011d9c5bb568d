//! ==============================================================================
//! logging.rs - tracing subscriber setup
//! ==============================================================================
//!
//! purpose:
//!     installs the global subscriber from the [logging] config section.
//!     the hub's own events go out at the configured level, dependencies at
//!     warn. RUST_LOG overrides both.
//!
//! ==============================================================================

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

/// Build the filter for the hub's log output.
///
/// `RUST_LOG` wins over the configured level, other crates stay at `warn`.
pub fn build_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(format!("warn,fire_door_hub={}", config.level)).unwrap_or_else(|e| {
            eprintln!("Invalid log level {:?} ({}), using info", config.level, e);
            EnvFilter::new("warn,fire_door_hub=info")
        })
    })
}

/// Setup logging and install it as the global subscriber.
pub fn init(config: &LoggingConfig) -> anyhow::Result<()> {
    let registry = tracing_subscriber::registry().with(build_filter(config));

    match config.format {
        LogFormat::Pretty => registry.with(fmt::layer()).try_init()?,
        LogFormat::Json => registry.with(fmt::layer().json()).try_init()?,
    }

    Ok(())
}

//! ==============================================================================
//! main.rs - fire & door hub entry point
//! ==============================================================================
//!
//! purpose:
//!     a small hub between one esp32 (flame, gas, temperature and humidity
//!     sensors plus a door actuator) and a browser dashboard.
//!
//! responsibilities:
//!     - load configuration and set up logging
//!     - build the telemetry store, the door command channel and the notifier
//!     - serve the device and dashboard endpoints until ctrl-c
//!
//! relationships:
//!     - uses: config.rs (hub.toml), logging.rs (tracing subscriber)
//!     - uses: telemetry.rs, door.rs, notifier.rs (the shared state)
//!     - uses: server.rs (axum routes)
//!
//! architecture:
//!
//!     ┌──────────┐  /update, /door_status*  ┌─────────────────────────────┐
//!     │  esp32   ├─────────────────────────>│            hub              │
//!     └──────────┘                          │  ┌───────────────────────┐  │
//!                                           │  │ TelemetryStore        ├──┼──> Notifier
//!     ┌──────────┐  /, /data, /open-door    │  ├───────────────────────┤  │   (telegram)
//!     │ browser  ├─────────────────────────>│  │ DoorCommandChannel    │  │
//!     └──────────┘                          │  └───────────────────────┘  │
//!                                           └─────────────────────────────┘
//!
//! ==============================================================================

mod config;
mod domain;
mod door;
mod logging;
mod notifier;
mod server;
mod telemetry;

use anyhow::{Context, Result};

use crate::door::DoorCommandChannel;
use crate::server::AppState;
use crate::telemetry::TelemetryStore;

#[tokio::main]
async fn main() -> Result<()> {
    // step 1: load configuration and start logging
    let (config, source) = config::HubConfig::load_or_default();
    logging::init(&config.logging).context("Failed to setup log subscriber")?;
    config.log_summary(&source);

    // step 2: build the shared state
    let notifier = notifier::from_config(&config.notifier);
    let state = AppState::new(
        TelemetryStore::new(notifier, config.notifier.hazard_message.clone()),
        DoorCommandChannel::new(),
    );

    // step 3: serve until ctrl-c
    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    tracing::info!(addr = %config.server.bind, "Hub listening");

    server::run(listener, state, shutdown_signal()).await?;

    tracing::info!("Hub stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown requested"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for ctrl-c"),
    }
}

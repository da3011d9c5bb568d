//! ==============================================================================
//! telemetry.rs - latest-value store for the esp32's sensor pushes
//! ==============================================================================
//!
//! purpose:
//!     holds the one current SensorReading. the device writes it every few
//!     seconds, dashboards read it whenever they like.
//!
//! locking:
//!     the whole read-modify-write of an ingestion happens under one write
//!     guard, so readers only ever see a snapshot from before or after it.
//!     the notifier is called after the guard is dropped.
//!
//! hazard alerts:
//!     edge triggered. only a clear -> flame transition sends a message;
//!     further pushes while the flame persists stay quiet.
//!
//! ==============================================================================

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::{SensorReading, TelemetryUpdate};
use crate::notifier::Notifier;

/// result of one ingestion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WriteOutcome {
    /// snapshot as committed by this write
    pub reading: SensorReading,
    /// this write flipped the flame flag from clear to detected
    pub hazard_raised: bool,
}

pub struct TelemetryStore {
    latest: RwLock<SensorReading>,
    notifier: Arc<dyn Notifier>,
    hazard_message: String,
}

impl TelemetryStore {
    pub fn new(notifier: Arc<dyn Notifier>, hazard_message: impl Into<String>) -> Self {
        Self {
            latest: RwLock::new(SensorReading::default()),
            notifier,
            hazard_message: hazard_message.into(),
        }
    }

    /// apply a (possibly partial) push from the device
    #[tracing::instrument(skip(self))]
    pub async fn write(&self, update: &TelemetryUpdate) -> WriteOutcome {
        let (previous, reading) = {
            let mut latest = self.latest.write().await;
            let previous = *latest;
            *latest = update.apply_to(&previous);
            (previous, *latest)
        };

        tracing::debug!(?reading, "Telemetry updated");

        let hazard_raised = !previous.flame_detected && reading.flame_detected;
        if hazard_raised {
            tracing::warn!(?reading, "Flame detected");
            if let Err(e) = self.notifier.send(&self.hazard_message) {
                tracing::error!(error = %e, "Failed to dispatch hazard alert");
            }
        } else if previous.flame_detected && !reading.flame_detected {
            tracing::info!("Flame cleared");
        }

        WriteOutcome {
            reading,
            hazard_raised,
        }
    }

    /// consistent copy of the current snapshot
    pub async fn read(&self) -> SensorReading {
        *self.latest.read().await
    }
}

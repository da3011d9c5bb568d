//! ==============================================================================
//! door.rs - single-slot door command mailbox
//! ==============================================================================
//!
//! handshake:
//!
//!     dashboard            hub               esp32
//!         │  request()      │                  │
//!         ├────────────────>│ CLOSED -> OPEN   │
//!         │                 │<─────────────────┤ peek()   (polled, non-consuming)
//!         │                 │      "OPEN"      │
//!         │                 │                  │ ... actuates the door ...
//!         │                 │<─────────────────┤ acknowledge()
//!         │                 │ OPEN -> CLOSED   │
//!
//! a missed poll is harmless: OPEN stays until the device acknowledges.
//! repeated requests and repeated acknowledgements are no-ops.
//!
//! ==============================================================================

use tokio::sync::Mutex;

use crate::domain::DoorCommand;

#[derive(Debug, Default)]
pub struct DoorCommandChannel {
    state: Mutex<DoorCommand>,
}

impl DoorCommandChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// dashboard asks for the door to open
    #[tracing::instrument(skip(self))]
    pub async fn request(&self) {
        let previous = self.transition(DoorCommand::Open).await;
        if previous == DoorCommand::Open {
            tracing::debug!("Door open already pending");
        } else {
            tracing::info!("Door open requested");
        }
    }

    /// device polls for a pending command
    pub async fn peek(&self) -> DoorCommand {
        *self.state.lock().await
    }

    /// device confirms it has actuated the door
    #[tracing::instrument(skip(self))]
    pub async fn acknowledge(&self) {
        let previous = self.transition(DoorCommand::Closed).await;
        if previous == DoorCommand::Open {
            tracing::info!("Door open acknowledged by device");
        } else {
            tracing::debug!("Door reset while already closed");
        }
    }

    async fn transition(&self, next: DoorCommand) -> DoorCommand {
        let mut state = self.state.lock().await;
        std::mem::replace(&mut *state, next)
    }
}

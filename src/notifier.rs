//! ==============================================================================
//! notifier.rs - outbound hazard alerts
//! ==============================================================================
//!
//! purpose:
//!     the store only knows "send this message". whatever actually carries it
//!     (a chat bot, or just the log) lives behind the Notifier trait so the
//!     store can be exercised with a fake.
//!
//! contract:
//!     send() must return without waiting on the network. the telegram
//!     implementation hands the message to a background worker through a
//!     bounded queue; the worker does the http call with its own timeout.
//!
//! relationships:
//!     - used by: telemetry.rs (on a hazard edge)
//!     - built by: main.rs (from the [notifier] config section)
//!
//! ==============================================================================

use std::time::Duration;

use anyhow::Context;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::config::NotifierConfig;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notification queue is full")]
    QueueFull,
    #[error("notification worker has stopped")]
    Closed,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("relay rejected the message with status {status}")]
    Rejected { status: u16 },
}

#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    fn send(&self, message: &str) -> Result<(), NotifyError>;
}

/// fallback used when no relay is configured
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, message: &str) -> Result<(), NotifyError> {
        tracing::warn!(message, "Hazard alert (no relay configured)");
        Ok(())
    }
}

// ==============================================================================
// telegram bot relay
// ==============================================================================

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// queue handle to the telegram worker
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    queue: mpsc::Sender<String>,
}

impl TelegramNotifier {
    /// start the background worker and return the handle feeding it
    ///
    /// must be called from inside a tokio runtime.
    pub fn spawn(config: &NotifierConfig) -> anyhow::Result<Self> {
        let bot_token = config
            .bot_token
            .clone()
            .filter(|t| !t.is_empty())
            .context("notifier.bot_token is not set")?;
        let chat_id = config
            .chat_id
            .clone()
            .filter(|c| !c.is_empty())
            .context("notifier.chat_id is not set")?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to build http client")?;

        let endpoint = format!(
            "{}/bot{}/sendMessage",
            config.api_base.trim_end_matches('/'),
            bot_token
        );

        let (queue, mut inbox) = mpsc::channel::<String>(config.queue_depth.max(1));

        tokio::spawn(async move {
            while let Some(text) = inbox.recv().await {
                match post_message(&client, &endpoint, &chat_id, &text).await {
                    Ok(()) => tracing::info!("Hazard alert delivered"),
                    Err(e) => tracing::error!(error = %e, "Failed to deliver hazard alert"),
                }
            }
            tracing::debug!("Notifier worker stopped");
        });

        Ok(Self { queue })
    }
}

impl Notifier for TelegramNotifier {
    fn send(&self, message: &str) -> Result<(), NotifyError> {
        self.queue
            .try_send(message.to_string())
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => NotifyError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => NotifyError::Closed,
            })
    }
}

async fn post_message(
    client: &reqwest::Client,
    endpoint: &str,
    chat_id: &str,
    text: &str,
) -> Result<(), NotifyError> {
    let response = client
        .post(endpoint)
        .json(&SendMessage { chat_id, text })
        .send()
        .await
        .map_err(|e| NotifyError::Transport(e.without_url().to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(NotifyError::Rejected {
            status: status.as_u16(),
        });
    }
    Ok(())
}

/// pick the notifier implementation from config
///
/// an enabled but incomplete relay config degrades to the log notifier.
pub fn from_config(config: &NotifierConfig) -> std::sync::Arc<dyn Notifier> {
    if !config.enabled {
        tracing::info!("Hazard alerts go to the log only");
        return std::sync::Arc::new(LogNotifier);
    }

    match TelegramNotifier::spawn(config) {
        Ok(notifier) => {
            tracing::info!(api_base = %config.api_base, "Hazard alerts relayed to telegram");
            std::sync::Arc::new(notifier)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Notifier misconfigured, falling back to log");
            std::sync::Arc::new(LogNotifier)
        }
    }
}

// ==============================================================================
// test double
// ==============================================================================

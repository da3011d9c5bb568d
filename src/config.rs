//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `hub.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - ServerConfig: Where the hub listens for the esp32 and the dashboard.
//!     - LoggingConfig: Log level and output format.
//!     - NotifierConfig: Telegram relay credentials and the hazard message.
//!
//! ==============================================================================

use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "HUB_CONFIG";

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct HubConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub notifier: NotifierConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    /// socket address the http server binds to
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        // the esp32 firmware talks to port 5000
        Self { bind: "0.0.0.0:5000".to_string() }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NotifierConfig {
    pub enabled: bool,
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub api_base: String,
    pub timeout_seconds: u64,
    pub queue_depth: usize,
    pub hazard_message: String,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bot_token: None,
            chat_id: None,
            api_base: "https://api.telegram.org".to_string(),
            timeout_seconds: 10,
            queue_depth: 8,
            hazard_message: "🔥 Flame detected! Check the building immediately.".to_string(),
        }
    }
}

impl HubConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file {}", path.as_ref().display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from toml text
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("Failed to parse config")
    }

    /// Load with default fallback
    ///
    /// `HUB_CONFIG` wins over the well-known locations. runs before the log
    /// subscriber exists, so it reports what it did instead of logging it.
    pub fn load_or_default() -> (Self, ConfigSource) {
        let mut paths = Vec::new();
        if let Some(explicit) = std::env::var_os(CONFIG_PATH_ENV) {
            paths.push(PathBuf::from(explicit));
        }
        paths.push(PathBuf::from("config").join("hub.toml"));
        paths.push(PathBuf::from("..").join("config").join("hub.toml"));

        let mut failures = Vec::new();
        for path in paths {
            if !path.exists() {
                continue;
            }
            match Self::load(&path) {
                Ok(config) => return (config, ConfigSource::File { path, failures }),
                Err(e) => failures.push(format!("{}: {:#}", path.display(), e)),
            }
        }

        (Self::default(), ConfigSource::Defaults { failures })
    }

    /// Log configuration summary
    pub fn log_summary(&self, source: &ConfigSource) {
        match source {
            ConfigSource::File { path, .. } => {
                tracing::info!(path = %path.display(), "Loaded configuration")
            }
            ConfigSource::Defaults { .. } => {
                tracing::warn!("No config file found - using defaults")
            }
        }
        for failure in source.failures() {
            tracing::warn!(%failure, "Skipped unreadable config file");
        }

        tracing::info!(
            bind = %self.server.bind,
            log_level = %self.logging.level,
            notifier_enabled = self.notifier.enabled,
            "Hub configuration"
        );
    }
}

/// where the active configuration came from
#[derive(Debug)]
pub enum ConfigSource {
    File { path: PathBuf, failures: Vec<String> },
    Defaults { failures: Vec<String> },
}

impl ConfigSource {
    fn failures(&self) -> &[String] {
        match self {
            Self::File { failures, .. } | Self::Defaults { failures } => failures,
        }
    }
}

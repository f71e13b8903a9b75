//! Bridge configuration with TOML file support.

use serde::{Deserialize, Serialize};

use crate::logging::LogFormat;
use crate::BridgeError;

/// Configuration for a [`crate::StoreBridge`].
///
/// Can be loaded from a TOML file via [`BridgeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Buffered events per `subscribe_updates` receiver before it lags.
    #[serde(default = "default_update_channel_capacity")]
    pub update_channel_capacity: usize,

    /// Drop restored transactions accumulated before a restore failure, so
    /// the next restore starts clean. Off by default: the buffer survives a
    /// failure and a later successful restore delivers those entries too.
    #[serde(default)]
    pub clear_restore_buffer_on_failure: bool,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_update_channel_capacity() -> usize {
    64
}

// ── Impl ───────────────────────────────────────────────────────────────

impl BridgeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, BridgeError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, BridgeError> {
        let config: Self = toml::from_str(s).map_err(|e| BridgeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, BridgeError> {
        toml::to_string_pretty(self).map_err(|e| BridgeError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.update_channel_capacity == 0 {
            return Err(BridgeError::Config(
                "update_channel_capacity must be at least 1".into(),
            ));
        }
        self.parsed_log_format()?;
        Ok(())
    }

    pub fn parsed_log_format(&self) -> Result<LogFormat, BridgeError> {
        self.log_format.parse().map_err(BridgeError::Config)
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            log_format: default_log_format(),
            log_level: default_log_level(),
            update_channel_capacity: default_update_channel_capacity(),
            clear_restore_buffer_on_failure: false,
        }
    }
}

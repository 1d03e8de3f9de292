use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::services::SessionTimings;

/// Client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Realtime endpoint of the room server
    #[serde(default = "default_ws_url")]
    pub ws_url: String,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    #[serde(default = "default_edit_debounce_ms")]
    pub edit_debounce_ms: u64,

    /// How long a disconnect must last before it is shown
    #[serde(default = "default_disconnect_grace_ms")]
    pub disconnect_grace_ms: u64,
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load from app.env file first
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            // Fallback to .env file
            dotenvy::dotenv().ok();
        }

        match envy::from_env::<Config>() {
            Ok(config) => {
                info!("✅ Configuration loaded successfully");
                Ok(config)
            }
            Err(e) => {
                error!("❌ Failed to load configuration: {}", e);
                Err(ConfigError::EnvError(e))
            }
        }
    }

    pub fn timings(&self) -> SessionTimings {
        SessionTimings {
            heartbeat_interval: Duration::from_millis(self.heartbeat_interval_ms),
            reconnect_delay: Duration::from_millis(self.reconnect_delay_ms),
            edit_debounce: Duration::from_millis(self.edit_debounce_ms),
            disconnect_grace: Duration::from_millis(self.disconnect_grace_ms),
        }
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.environment.to_lowercase() == "dev" || self.environment.to_lowercase() == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            environment: default_environment(),
            log_level: default_log_level(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            edit_debounce_ms: default_edit_debounce_ms(),
            disconnect_grace_ms: default_disconnect_grace_ms(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvError(#[from] envy::Error),
}

// Default value functions
fn default_ws_url() -> String {
    "ws://localhost:8100/o/socket".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_heartbeat_interval_ms() -> u64 {
    30_000
}

fn default_reconnect_delay_ms() -> u64 {
    1_000
}

fn default_edit_debounce_ms() -> u64 {
    100
}

fn default_disconnect_grace_ms() -> u64 {
    800
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_session_defaults() {
        let config = Config::default();
        assert_eq!(config.timings(), SessionTimings::default());
        assert!(config.is_development());
    }

    #[test]
    fn reads_overrides_from_key_value_pairs() {
        let vars = vec![
            ("WS_URL".to_string(), "wss://rooms.example/o/socket".to_string()),
            ("RECONNECT_DELAY_MS".to_string(), "250".to_string()),
            ("ENVIRONMENT".to_string(), "production".to_string()),
        ];
        let config: Config = envy::from_iter(vars).expect("config");
        assert_eq!(config.ws_url, "wss://rooms.example/o/socket");
        assert_eq!(config.timings().reconnect_delay, Duration::from_millis(250));
        assert_eq!(config.heartbeat_interval_ms, 30_000);
        assert!(!config.is_development());
    }

    #[test]
    fn rejects_non_numeric_timings() {
        let vars = vec![("EDIT_DEBOUNCE_MS".to_string(), "soon".to_string())];
        let err = envy::from_iter::<_, Config>(vars).unwrap_err();
        assert!(ConfigError::from(err).to_string().starts_with("Environment variable error"));
    }
}

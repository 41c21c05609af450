//! Hub Controller configuration.
//!
//! Configuration is loaded from environment variables. Nothing the hub
//! needs is secret, so `Debug` is derived.

use common::config::{ObservabilityConfig, DEFAULT_LOG_FILTER};
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default HTTP + WebSocket port.
pub const DEFAULT_PORT: u16 = 3033;

/// Default maximum number of rooms held in memory.
pub const DEFAULT_MAX_ROOMS: usize = 10_000;

/// Default shutdown drain period in seconds.
pub const DEFAULT_DRAIN_SECONDS: u64 = 5;

/// Default hub instance ID prefix.
pub const DEFAULT_HUB_ID_PREFIX: &str = "hub";

/// Hub Controller configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP + WebSocket bind address (default: "0.0.0.0:3033").
    pub bind_address: String,

    /// Unique identifier for this hub instance, used in logs.
    pub hub_id: String,

    /// Maximum number of rooms; creating more is rejected as unavailable.
    pub max_rooms: usize,

    /// How long to keep serving after a shutdown signal before closing.
    pub drain_period: Duration,

    /// Logging configuration.
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = match vars.get("HUB_BIND_ADDRESS") {
            Some(addr) => addr.clone(),
            None => {
                let port = parse_var(vars, "PORT", DEFAULT_PORT)?;
                format!("0.0.0.0:{port}")
            }
        };

        let max_rooms = parse_var(vars, "HUB_MAX_ROOMS", DEFAULT_MAX_ROOMS)?;
        if max_rooms == 0 {
            return Err(ConfigError::InvalidValue(
                "HUB_MAX_ROOMS must be greater than zero".to_string(),
            ));
        }

        let drain_seconds = parse_var(vars, "HUB_DRAIN_SECONDS", DEFAULT_DRAIN_SECONDS)?;

        let json_logs = parse_var(vars, "HUB_LOG_JSON", false)?;
        let log_filter = vars
            .get("HUB_LOG_FILTER")
            .cloned()
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        let hub_id = vars.get("HUB_ID").cloned().unwrap_or_else(|| {
            let hostname = vars
                .get("HOSTNAME")
                .cloned()
                .unwrap_or_else(|| "unknown".to_string());
            let uuid_suffix = uuid::Uuid::new_v4().simple().to_string();
            let short_suffix = uuid_suffix.get(..8).unwrap_or("00000000");
            format!("{DEFAULT_HUB_ID_PREFIX}-{hostname}-{short_suffix}")
        });

        Ok(Config {
            bind_address,
            hub_id,
            max_rooms,
            drain_period: Duration::from_secs(drain_seconds),
            observability: ObservabilityConfig {
                log_filter,
                json_logs,
            },
        })
    }
}

fn parse_var<T: std::str::FromStr>(
    vars: &HashMap<String, String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError> {
    match vars.get(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("{name}={raw}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vars_defaults() {
        let config = Config::from_vars(&HashMap::new()).expect("Config should load");

        assert_eq!(config.bind_address, "0.0.0.0:3033");
        assert_eq!(config.max_rooms, DEFAULT_MAX_ROOMS);
        assert_eq!(config.drain_period, Duration::from_secs(DEFAULT_DRAIN_SECONDS));
        assert!(!config.observability.json_logs);
        assert_eq!(config.observability.log_filter, DEFAULT_LOG_FILTER);
        assert!(config.hub_id.starts_with("hub-unknown-"));
    }

    #[test]
    fn test_port_fallback() {
        let vars = HashMap::from([("PORT".to_string(), "8080".to_string())]);
        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn test_explicit_bind_address_wins_over_port() {
        let vars = HashMap::from([
            ("PORT".to_string(), "8080".to_string()),
            (
                "HUB_BIND_ADDRESS".to_string(),
                "127.0.0.1:9000".to_string(),
            ),
        ]);
        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(config.bind_address, "127.0.0.1:9000");
    }

    #[test]
    fn test_custom_values() {
        let vars = HashMap::from([
            ("HUB_ID".to_string(), "hub-custom-001".to_string()),
            ("HUB_MAX_ROOMS".to_string(), "25".to_string()),
            ("HUB_DRAIN_SECONDS".to_string(), "1".to_string()),
            ("HUB_LOG_JSON".to_string(), "true".to_string()),
            ("HUB_LOG_FILTER".to_string(), "info".to_string()),
        ]);
        let config = Config::from_vars(&vars).unwrap();

        assert_eq!(config.hub_id, "hub-custom-001");
        assert_eq!(config.max_rooms, 25);
        assert_eq!(config.drain_period, Duration::from_secs(1));
        assert!(config.observability.json_logs);
        assert_eq!(config.observability.log_filter, "info");
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let vars = HashMap::from([("HUB_MAX_ROOMS".to_string(), "lots".to_string())]);
        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidValue(v)) if v.contains("HUB_MAX_ROOMS")));
    }

    #[test]
    fn test_zero_max_rooms_is_rejected() {
        let vars = HashMap::from([("HUB_MAX_ROOMS".to_string(), "0".to_string())]);
        assert!(Config::from_vars(&vars).is_err());
    }

    #[test]
    fn test_invalid_bool_is_rejected() {
        let vars = HashMap::from([("HUB_LOG_JSON".to_string(), "yes please".to_string())]);
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidValue(_))
        ));
    }
}

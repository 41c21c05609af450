//! Common configuration types for Huddle components.

use serde::{Deserialize, Serialize};

/// Default tracing filter used when neither `RUST_LOG` nor an explicit
/// filter is configured.
pub const DEFAULT_LOG_FILTER: &str = "hub_controller=debug,tower_http=debug";

/// Observability configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Tracing filter directive (same syntax as `RUST_LOG`)
    pub log_filter: String,
    /// Enable JSON-formatted logs
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            json_logs: false,
        }
    }
}

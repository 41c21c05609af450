//! Metrics definitions for the Hub Controller.
//!
//! All metrics follow Prometheus naming conventions:
//! - `hub_` prefix for the Hub Controller
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `actor_type`: 4 values max (controller, room, presence, connection)
//! - `event`: bounded by the closed client event set (~17 values)
//! - `error_type`: bounded by `HubError::error_type` (~10 values)

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Event handling latency buckets - in-memory state transitions
        .set_buckets_for_metric(
            Matcher::Prefix("hub_event".to_string()),
            &[
                0.0005, 0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500,
            ],
        )
        .map_err(|e| format!("Failed to set event latency buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus metrics recorder: {e}"))
}

// ============================================================================
// Connection, Room & Call Metrics (Gauges)
// ============================================================================

/// Set the number of live real-time connections.
///
/// Metric: `hub_connections_active`
pub fn set_connections_active(count: u64) {
    // u64 to f64 conversion is safe for realistic connection counts (< 2^53)
    #[allow(clippy::cast_precision_loss)]
    gauge!("hub_connections_active").set(count as f64);
}

/// Set the number of rooms held in memory.
///
/// Metric: `hub_rooms_active`
pub fn set_rooms_active(count: u64) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("hub_rooms_active").set(count as f64);
}

/// Set the number of rooms with an active voice call.
///
/// Metric: `hub_calls_active`
pub fn set_calls_active(count: u64) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("hub_calls_active").set(count as f64);
}

// ============================================================================
// Event Metrics
// ============================================================================

/// Record one handled client event and how long it took.
///
/// Metrics: `hub_events_total`, `hub_event_duration_seconds`
/// Labels: `event`, `status` (success, error)
pub fn record_event(event: &str, success: bool, duration: Duration) {
    let status = if success { "success" } else { "error" };
    counter!("hub_events_total",
        "event" => event.to_string(),
        "status" => status
    )
    .increment(1);
    histogram!("hub_event_duration_seconds", "event" => event.to_string())
        .record(duration.as_secs_f64());
}

/// Record an error reported back to a client or HTTP caller.
///
/// Metric: `hub_errors_total`
/// Labels: `surface` (realtime, http), `error_type`
pub fn record_error(surface: &str, error_type: &str) {
    counter!("hub_errors_total",
        "surface" => surface.to_string(),
        "error_type" => error_type.to_string()
    )
    .increment(1);
}

// ============================================================================
// Actor Metrics
// ============================================================================

/// Record an actor panic event.
///
/// Metric: `hub_actor_panics_total`
/// Labels: `actor_type`
///
/// Any non-zero value indicates a bug.
pub fn record_actor_panic(actor_type: &str) {
    counter!("hub_actor_panics_total", "actor_type" => actor_type.to_string()).increment(1);
}

/// Record an outbound event dropped because a mailbox was full or closed.
///
/// Metric: `hub_messages_dropped_total`
/// Labels: `actor_type`
pub fn record_message_dropped(actor_type: &str) {
    counter!("hub_messages_dropped_total", "actor_type" => actor_type.to_string()).increment(1);
}

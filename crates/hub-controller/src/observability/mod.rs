//! Observability for the Hub Controller.
//!
//! - [`health`] - liveness and readiness probes
//! - [`metrics`] - Prometheus metric definitions

pub mod health;
pub mod metrics;

pub use health::{health_router, HealthState};

//! Hub Controller
//!
//! Real-time room messaging and voice-call signaling server.
//!
//! # Startup Flow
//!
//! 1. Initialize tracing from the observability configuration
//! 2. Load configuration from environment
//! 3. Initialize Prometheus metrics recorder
//! 4. Initialize actor system (`HubControllerActorHandle`)
//! 5. Bind the listener and serve WebSocket, HTTP, health and metrics routes
//! 6. Wait for shutdown signal, drain, then stop the actor system

#![warn(clippy::pedantic)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use hub_controller::actors::{ActorMetrics, HubControllerActorHandle};
use hub_controller::config::Config;
use hub_controller::observability::metrics::init_metrics_recorder;
use hub_controller::observability::{health_router, HealthState};
use hub_controller::routes::{self, AppState};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Per-actor deadline for stopping the actor system.
const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration first: it carries the log filter
    let config = Config::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_filter));
    if config.observability.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    info!("Starting Hub Controller");
    info!(
        hub_id = %config.hub_id,
        bind_address = %config.bind_address,
        max_rooms = config.max_rooms,
        drain_period_secs = config.drain_period.as_secs(),
        "Configuration loaded successfully"
    );

    // Initialize Prometheus metrics recorder
    // This must happen before any metrics are recorded
    let prometheus_handle = init_metrics_recorder().map_err(|e| {
        error!(error = %e, "Failed to install Prometheus metrics recorder");
        e
    })?;
    info!("Prometheus metrics recorder initialized");

    let health_state = Arc::new(HealthState::new());

    // Initialize actor system
    info!("Initializing actor system...");
    let controller = HubControllerActorHandle::new(
        config.hub_id.clone(),
        ActorMetrics::new(),
        config.max_rooms,
    );
    info!("Actor system initialized");

    let bind_address = config.bind_address.clone();
    let drain_period = config.drain_period;

    let state = Arc::new(AppState {
        controller: controller.clone(),
        config,
    });

    let metrics_router = Router::new().route(
        "/metrics",
        axum::routing::get(move || {
            let handle = prometheus_handle.clone();
            async move { handle.render() }
        }),
    );

    let app = routes::build_routes(state)
        .merge(health_router(Arc::clone(&health_state)))
        .merge(metrics_router);

    // Bind listener before serving to fail fast on bind errors
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .map_err(|e| {
            error!(error = %e, addr = %bind_address, "Failed to bind listener");
            format!("Failed to bind {bind_address}: {e}")
        })?;
    info!(addr = %bind_address, "Hub Controller listening");
    health_state.set_ready();

    let shutdown_health = Arc::clone(&health_state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;

            // Mark as not ready immediately so load balancers stop routing here
            shutdown_health.set_draining();
            if !drain_period.is_zero() {
                warn!(
                    drain_period_secs = drain_period.as_secs(),
                    "Draining before shutdown"
                );
                tokio::time::sleep(drain_period).await;
            }
            info!("Drain period complete");

            // Stopping connection actors closes every open WebSocket
            if let Err(e) = controller.shutdown(SHUTDOWN_DEADLINE).await {
                warn!(error = %e, "Actor system shutdown error");
            }
        })
        .await?;

    info!("Hub Controller shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed. This is acceptable because
/// without signal handlers, we cannot gracefully shut down the service.
async fn shutdown_signal() {
    let ctrl_c = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Received SIGINT, starting graceful shutdown...");
    };

    #[cfg(unix)]
    let terminate = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
        info!("Received SIGTERM, starting graceful shutdown...");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

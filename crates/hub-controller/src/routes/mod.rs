//! HTTP routes for the Hub Controller.
//!
//! Defines the Axum router and application state. The real-time WebSocket
//! endpoint and the administrative JSON endpoints share one listener.

use crate::actors::HubControllerActorHandle;
use crate::config::Config;
use crate::handlers;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Handle to the hub supervisor.
    pub controller: HubControllerActorHandle,

    /// Service configuration.
    pub config: Config,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/ws` - real-time WebSocket endpoint
/// - `/status`, `/rooms/...`, `/message_deleted` - administrative endpoints
/// - TraceLayer for request logging
/// - 30 second request timeout
/// - Permissive CORS (any origin)
pub fn build_routes(state: Arc<AppState>) -> Router {
    let routes = Router::new()
        .route("/ws", get(handlers::ws_upgrade))
        .route("/status", get(handlers::get_status))
        .route(
            "/rooms",
            get(handlers::list_rooms).post(handlers::create_room),
        )
        .route(
            "/rooms/:room_id/messages",
            get(handlers::get_messages).post(handlers::post_message),
        )
        .route(
            "/rooms/:room_id/voice-call",
            get(handlers::get_call).post(handlers::start_call),
        )
        .route("/rooms/:room_id/voice-call/end", post(handlers::end_call))
        .route("/message_deleted", post(handlers::delete_message))
        .with_state(state);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. CorsLayer - Answer preflight requests
    routes
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

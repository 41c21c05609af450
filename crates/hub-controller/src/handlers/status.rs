//! Status handler for Hub Controller.
//!
//! - `GET /status` - Hub-wide counters

use crate::errors::HubError;
use crate::routes::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

/// Response body for `GET /status`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: &'static str,
    pub connections: usize,
    pub users_online: usize,
    pub rooms: usize,
    pub active_calls: usize,
}

/// Handler for GET /status
///
/// `status` reads `"OK"` while serving and `"DRAINING"` once shutdown began.
#[instrument(skip(state))]
pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatusResponse>, HubError> {
    let status = state.controller.get_status().await?;
    let users_online = state.controller.presence().count().await?;

    Ok(Json(StatusResponse {
        status: if status.is_draining { "DRAINING" } else { "OK" },
        connections: status.connection_count,
        users_online,
        rooms: status.room_count,
        active_calls: status.active_calls,
    }))
}

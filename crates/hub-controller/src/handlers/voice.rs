//! Voice call administration handlers for Hub Controller.
//!
//! - `GET /rooms/{room_id}/voice-call` - Call status
//! - `POST /rooms/{room_id}/voice-call` - Start (or join) the room's call
//! - `POST /rooms/{room_id}/voice-call/end` - End the room's call

use super::rooms::Acknowledgement;
use super::present;
use crate::actors::controller::ANONYMOUS_CREATOR_ID;
use crate::actors::messages::Identity;
use crate::domain::call::StartOutcome;
use crate::domain::CallInfo;
use crate::errors::HubError;
use crate::routes::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

/// Display name used when an end request names nobody.
const UNNAMED_ENDER: &str = "Someone";

/// Request body for `POST /rooms/{room_id}/voice-call`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StartCallRequest {
    pub caller_id: Option<String>,
    pub caller_name: Option<String>,
}

/// Request body for `POST /rooms/{room_id}/voice-call/end`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EndCallRequest {
    pub user_id: Option<String>,
    pub user_name: Option<String>,
}

/// Response body for `POST /rooms/{room_id}/voice-call`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartCallResponse {
    pub success: bool,
    pub call_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub already_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participants: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Handler: GET /rooms/{room_id}/voice-call
// ============================================================================

/// Handler for GET /rooms/{room_id}/voice-call
///
/// An unknown room reports `{active: false}` and is not created.
#[instrument(skip(state), fields(room_id = %room_id))]
pub async fn get_call(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<CallInfo>, HubError> {
    let info = match state.controller.get_room(room_id).await? {
        Some(room) => room.call_info().await?,
        None => CallInfo {
            active: false,
            participants: None,
            started_at: None,
            started_by: None,
        },
    };
    Ok(Json(info))
}

// ============================================================================
// Handler: POST /rooms/{room_id}/voice-call
// ============================================================================

/// Handler for POST /rooms/{room_id}/voice-call
///
/// If the room already has a call, the caller is added to it and the
/// response carries `alreadyActive` with the participant count.
///
/// # Response
///
/// - 200 OK: Call started or joined
/// - 400 Bad Request: `callerId` or `callerName` missing
/// - 404 Not Found: Room not found
#[instrument(skip(state, request), fields(room_id = %room_id))]
pub async fn start_call(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    Json(request): Json<StartCallRequest>,
) -> Result<Json<StartCallResponse>, HubError> {
    let room = state
        .controller
        .get_room(room_id.clone())
        .await?
        .ok_or_else(|| HubError::RoomNotFound {
            room_id: room_id.clone(),
        })?;

    let (Some(caller_id), Some(caller_name)) =
        (present(request.caller_id), present(request.caller_name))
    else {
        return Err(HubError::Validation(
            "callerId and callerName are required".to_string(),
        ));
    };

    let outcome = room
        .start_call(Identity::new(caller_id.clone(), caller_name), None)
        .await?;

    info!(
        target: "hub.http",
        room_id = %room_id,
        caller_id = %caller_id,
        outcome = ?outcome,
        "Voice call requested through administrative surface"
    );

    let response = match outcome {
        StartOutcome::Started { started_at } => StartCallResponse {
            success: true,
            call_id: room_id,
            already_active: None,
            participants: None,
            started_at: Some(started_at),
        },
        StartOutcome::Merged { participant_count } => StartCallResponse {
            success: true,
            call_id: room_id,
            already_active: Some(true),
            participants: Some(participant_count),
            started_at: None,
        },
    };
    Ok(Json(response))
}

// ============================================================================
// Handler: POST /rooms/{room_id}/voice-call/end
// ============================================================================

/// Handler for POST /rooms/{room_id}/voice-call/end
///
/// Ends the call for everyone in the room, not only its participants.
///
/// # Response
///
/// - 200 OK: Call ended
/// - 404 Not Found: No active call (or no such room)
#[instrument(skip(state, request), fields(room_id = %room_id))]
pub async fn end_call(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    Json(request): Json<EndCallRequest>,
) -> Result<Json<Acknowledgement>, HubError> {
    let room = state
        .controller
        .get_room(room_id.clone())
        .await?
        .ok_or(HubError::NoActiveCall { room_id })?;

    let ender = Identity::new(
        present(request.user_id).unwrap_or_else(|| ANONYMOUS_CREATOR_ID.to_string()),
        present(request.user_name).unwrap_or_else(|| UNNAMED_ENDER.to_string()),
    );
    room.end_call(ender, true).await?;

    Ok(Json(Acknowledgement {
        success: true,
        message: "Voice call ended",
    }))
}

//! Room administration handlers for Hub Controller.
//!
//! - `GET /rooms` - List room summaries
//! - `POST /rooms` - Create a named room
//! - `GET /rooms/{room_id}/messages` - Room history
//! - `POST /rooms/{room_id}/messages` - Post a message
//! - `POST /message_deleted` - Administrative delete
//!
//! Callers of this surface are trusted: deletes skip the role check and
//! message senders are taken from the request body.

use super::present;
use crate::actors::controller::{ANONYMOUS_CREATOR_ID, ANONYMOUS_CREATOR_NAME};
use crate::actors::messages::{Identity, NewRoom, RoomCreated};
use crate::domain::message::{ChatMessage, MessageKind};
use crate::domain::{DeleteRequester, RoomSummary};
use crate::errors::HubError;
use crate::routes::AppState;
use crate::session::EMPTY_MESSAGE_CONTENT;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

/// Request body for `POST /rooms`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateRoomRequest {
    pub name: Option<String>,
    pub creator_id: Option<String>,
    pub creator_name: Option<String>,
    pub participant_ids: Vec<String>,
}

/// Request body for `POST /rooms/{room_id}/messages`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PostMessageRequest {
    pub sender_id: Option<String>,
    pub sender_name: Option<String>,
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Request body for `POST /message_deleted`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeleteMessageRequest {
    pub room_id: Option<String>,
    pub message_id: Option<String>,
    pub user_id: Option<String>,
}

/// Generic success acknowledgement.
#[derive(Debug, Serialize)]
pub struct Acknowledgement {
    pub success: bool,
    pub message: &'static str,
}

// ============================================================================
// Handler: GET /rooms
// ============================================================================

#[instrument(skip(state))]
pub async fn list_rooms(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<RoomSummary>>, HubError> {
    Ok(Json(state.controller.list_rooms().await?))
}

// ============================================================================
// Handler: POST /rooms
// ============================================================================

/// Handler for POST /rooms
///
/// The creator is seeded with role `creator`; listed participants are
/// seeded as inactive members. Every connection receives `room_created`.
///
/// # Response
///
/// - 201 Created: `{roomId, room}`
/// - 503 Service Unavailable: Hub draining or at room capacity
#[instrument(skip(state, request))]
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<RoomCreated>), HubError> {
    let created = state
        .controller
        .create_room(NewRoom {
            name: present(request.name),
            creator_id: present(request.creator_id),
            creator_name: present(request.creator_name),
            participant_ids: request.participant_ids,
        })
        .await?;

    info!(
        target: "hub.http",
        room_id = %created.room_id,
        participants = created.room.participants.len(),
        "Room created"
    );

    Ok((StatusCode::CREATED, Json(created)))
}

// ============================================================================
// Handler: GET /rooms/{room_id}/messages
// ============================================================================

/// Handler for GET /rooms/{room_id}/messages
///
/// Creates the room if it does not exist yet, returning an empty history.
#[instrument(skip(state), fields(room_id = %room_id))]
pub async fn get_messages(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<Vec<ChatMessage>>, HubError> {
    let room = state.controller.ensure_room(room_id, None).await?;
    Ok(Json(room.history().await?))
}

// ============================================================================
// Handler: POST /rooms/{room_id}/messages
// ============================================================================

/// Handler for POST /rooms/{room_id}/messages
///
/// Missing fields fall back to an anonymous sender, placeholder content
/// and kind `text`. The room is created on first reference.
///
/// # Response
///
/// - 201 Created: the stored message
#[instrument(skip(state, request), fields(room_id = %room_id))]
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    Json(request): Json<PostMessageRequest>,
) -> Result<(StatusCode, Json<ChatMessage>), HubError> {
    let sender = Identity::new(
        present(request.sender_id).unwrap_or_else(|| ANONYMOUS_CREATOR_ID.to_string()),
        present(request.sender_name).unwrap_or_else(|| ANONYMOUS_CREATOR_NAME.to_string()),
    );
    let content =
        present(request.content).unwrap_or_else(|| EMPTY_MESSAGE_CONTENT.to_string());
    let kind = present(request.kind).map(MessageKind::from).unwrap_or_default();

    let room = state.controller.ensure_room(room_id, None).await?;
    let message = room.post_message(sender, content, kind).await?;

    Ok((StatusCode::CREATED, Json(message)))
}

// ============================================================================
// Handler: POST /message_deleted
// ============================================================================

/// Handler for POST /message_deleted
///
/// # Response
///
/// - 200 OK: Message soft-deleted and `message_deleted` broadcast
/// - 400 Bad Request: `roomId` or `messageId` missing, or ambiguous id
/// - 404 Not Found: Room or message not found
#[instrument(skip(state, request))]
pub async fn delete_message(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DeleteMessageRequest>,
) -> Result<Json<Acknowledgement>, HubError> {
    let (Some(room_id), Some(message_id)) =
        (present(request.room_id), present(request.message_id))
    else {
        return Err(HubError::Validation(
            "roomId and messageId are required".to_string(),
        ));
    };

    let room = state
        .controller
        .get_room(room_id.clone())
        .await?
        .ok_or(HubError::RoomNotFound { room_id })?;

    let deleted = room
        .delete_message(
            DeleteRequester::Administrator(present(request.user_id)),
            message_id,
        )
        .await?;

    info!(
        target: "hub.http",
        room_id = %deleted.room_id,
        message_id = %deleted.id,
        "Message deleted through administrative surface"
    );

    Ok(Json(Acknowledgement {
        success: true,
        message: "Message deleted",
    }))
}

//! Hub Controller error types.
//!
//! One error type serves both outward surfaces:
//! - Real-time clients receive an `error` event built from
//!   [`HubError::error_type`] and [`HubError::client_message`].
//! - HTTP callers receive a JSON failure body with the status code from
//!   [`HubError::status_code`] via the `IntoResponse` impl.
//!
//! Internal details are logged server-side but not exposed to clients.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Hub Controller error type.
///
/// Maps to HTTP status codes:
/// - `Validation`, `AmbiguousMessageId`, `InvalidEvent`: 400 Bad Request
/// - `DeleteUnauthorized`: 403 Forbidden
/// - `RoomNotFound`, `MessageNotFound`, `NoActiveCall`, `UserOffline`: 404 Not Found
/// - `Draining`, `RoomCapacityExceeded`: 503 Service Unavailable
/// - `Internal`: 500 Internal Server Error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HubError {
    /// A required field was missing and has no sensible default.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A partial message id matched more than one history entry.
    #[error("Message id {message_id} is ambiguous in room {room_id}")]
    AmbiguousMessageId { room_id: String, message_id: String },

    /// Inbound frame was not a known event or its payload did not parse.
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    /// Room does not exist.
    #[error("Room not found: {room_id}")]
    RoomNotFound { room_id: String },

    /// Message id did not resolve in the room's history.
    #[error("Message {message_id} not found in room {room_id}")]
    MessageNotFound { room_id: String, message_id: String },

    /// The room has no active voice call.
    #[error("No active call in room {room_id}")]
    NoActiveCall { room_id: String },

    /// Requester is neither the sender nor a privileged participant.
    #[error("User {requester_id} may not delete message {message_id} in room {room_id}")]
    DeleteUnauthorized {
        room_id: String,
        message_id: String,
        requester_id: String,
    },

    /// Signaling target is not connected.
    #[error("User offline: {user_id}")]
    UserOffline { user_id: String },

    /// The hub is shutting down and accepts no new rooms.
    #[error("Hub is draining")]
    Draining,

    /// The room limit has been reached.
    #[error("Room capacity exceeded")]
    RoomCapacityExceeded,

    /// Internal error (actor channel failure, task panic).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl HubError {
    /// Returns the `type` field of the real-time `error` event.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            HubError::Validation(_) => "validation",
            HubError::AmbiguousMessageId { .. } => "ambiguous_id",
            HubError::InvalidEvent(_) => "invalid_event",
            HubError::RoomNotFound { .. } => "room_not_found",
            HubError::MessageNotFound { .. } => "message_not_found",
            HubError::NoActiveCall { .. } => "no_active_call",
            HubError::DeleteUnauthorized { .. } => "delete_unauthorized",
            HubError::UserOffline { .. } => "user_offline",
            HubError::Draining | HubError::RoomCapacityExceeded => "unavailable",
            HubError::Internal(_) => "internal_error",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            HubError::Validation(_)
            | HubError::AmbiguousMessageId { .. }
            | HubError::InvalidEvent(_) => StatusCode::BAD_REQUEST,
            HubError::DeleteUnauthorized { .. } => StatusCode::FORBIDDEN,
            HubError::RoomNotFound { .. }
            | HubError::MessageNotFound { .. }
            | HubError::NoActiveCall { .. }
            | HubError::UserOffline { .. } => StatusCode::NOT_FOUND,
            HubError::Draining | HubError::RoomCapacityExceeded => StatusCode::SERVICE_UNAVAILABLE,
            HubError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a client-safe error message (no internal details).
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            HubError::Validation(msg) | HubError::InvalidEvent(msg) => msg.clone(),
            HubError::AmbiguousMessageId { .. } => {
                "Message id matches more than one message".to_string()
            }
            HubError::RoomNotFound { .. } => "Room not found".to_string(),
            HubError::MessageNotFound { .. } => "Message not found".to_string(),
            HubError::NoActiveCall { .. } => "No active call in this room".to_string(),
            HubError::DeleteUnauthorized { .. } => {
                "You are not allowed to delete this message".to_string()
            }
            HubError::UserOffline { .. } => "User is offline".to_string(),
            HubError::Draining => "Server is shutting down, please reconnect".to_string(),
            HubError::RoomCapacityExceeded => "Server is at capacity, please try again".to_string(),
            HubError::Internal(_) => "An internal error occurred".to_string(),
        }
    }

    /// Room the error refers to, if any.
    #[must_use]
    pub fn room_id(&self) -> Option<&str> {
        match self {
            HubError::AmbiguousMessageId { room_id, .. }
            | HubError::RoomNotFound { room_id }
            | HubError::MessageNotFound { room_id, .. }
            | HubError::NoActiveCall { room_id }
            | HubError::DeleteUnauthorized { room_id, .. } => Some(room_id),
            _ => None,
        }
    }

    /// Message the error refers to, if any.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        match self {
            HubError::AmbiguousMessageId { message_id, .. }
            | HubError::MessageNotFound { message_id, .. }
            | HubError::DeleteUnauthorized { message_id, .. } => Some(message_id),
            _ => None,
        }
    }

    /// User the error refers to, if any.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        match self {
            HubError::UserOffline { user_id } => Some(user_id),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        match &self {
            HubError::Internal(reason) => {
                tracing::error!(target: "hub.http", reason = %reason, "Request failed");
            }
            HubError::Draining | HubError::RoomCapacityExceeded => {
                tracing::warn!(target: "hub.http", error = %self, "Service unavailable");
            }
            _ => {
                tracing::debug!(target: "hub.http", error = %self, "Request rejected");
            }
        }
        crate::observability::metrics::record_error("http", self.error_type());

        let body = ErrorResponse {
            success: false,
            error: ErrorDetail {
                code: self.error_type(),
                message: self.client_message(),
            },
        };

        (self.status_code(), Json(body)).into_response()
    }
}

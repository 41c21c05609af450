//! Message types for actor communication.
//!
//! Request/reply messages carry a `respond_to` oneshot sender; the rest are
//! fire-and-forget.

use super::connection::ConnectionActorHandle;
use super::room::RoomActorHandle;
use crate::domain::call::{JoinOutcome, StartOutcome};
use crate::domain::message::{ChatMessage, MessageKind};
use crate::domain::roster::Participant;
use crate::domain::{CallInfo, DeleteRequester, RoomSnapshot, RoomSummary};
use crate::errors::HubError;
use crate::protocol::ServerEvent;

use common::types::ConnectionId;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Authenticated user as seen by the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub user_name: String,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: user_name.into(),
        }
    }
}

/// What presence knew about a user whose connection dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedSession {
    pub identity: Identity,
    /// Rooms the user had joined, for cascade cleanup.
    pub rooms: Vec<String>,
}

/// Request to create a named room (administrative surface).
#[derive(Debug, Clone, Default)]
pub struct NewRoom {
    pub name: Option<String>,
    pub creator_id: Option<String>,
    pub creator_name: Option<String>,
    pub participant_ids: Vec<String>,
}

/// Result of room creation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomCreated {
    pub room_id: String,
    pub room: RoomSnapshot,
}

/// Status snapshot of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerStatus {
    pub room_count: usize,
    pub connection_count: usize,
    pub active_calls: usize,
    pub is_draining: bool,
    pub mailbox_depth: usize,
}

/// New connection registered with the controller.
#[derive(Debug)]
pub struct RegisteredConnection {
    pub handle: ConnectionActorHandle,
    /// Events for the transport writer, in delivery order.
    pub outbound: mpsc::Receiver<ServerEvent>,
}

// ============================================================================
// Controller
// ============================================================================

/// Messages handled by `HubControllerActor`.
#[derive(Debug)]
pub enum ControllerMessage {
    /// Get or lazily create a room.
    EnsureRoom {
        room_id: String,
        /// Seeded as `creator` only when the room is created by this call.
        creator: Option<Participant>,
        respond_to: oneshot::Sender<Result<RoomActorHandle, HubError>>,
    },
    /// Create a new named room and announce it to every connection.
    CreateRoom {
        request: NewRoom,
        respond_to: oneshot::Sender<Result<RoomCreated, HubError>>,
    },
    /// Look up a room without creating it.
    GetRoom {
        room_id: String,
        respond_to: oneshot::Sender<Option<RoomActorHandle>>,
    },
    /// Handles of every room, for listing.
    RoomHandles {
        respond_to: oneshot::Sender<Vec<RoomActorHandle>>,
    },
    RegisterConnection {
        respond_to: oneshot::Sender<Result<RegisteredConnection, HubError>>,
    },
    DeregisterConnection {
        connection_id: ConnectionId,
        respond_to: oneshot::Sender<()>,
    },
    /// Fan an event out to every live connection.
    BroadcastAll { event: ServerEvent },
    GetStatus {
        respond_to: oneshot::Sender<ControllerStatus>,
    },
    Shutdown {
        deadline: Duration,
        respond_to: oneshot::Sender<Result<(), HubError>>,
    },
}

// ============================================================================
// Presence
// ============================================================================

/// Messages handled by `PresenceActor`.
#[derive(Debug)]
pub enum PresenceMessage {
    /// Bind a connection to a user, applying anonymous defaults.
    Authenticate {
        connection: ConnectionActorHandle,
        user_id: Option<String>,
        user_name: Option<String>,
        respond_to: oneshot::Sender<Identity>,
    },
    Resolve {
        user_id: String,
        respond_to: oneshot::Sender<Option<ConnectionActorHandle>>,
    },
    RegisterMembership {
        user_id: String,
        room_id: String,
        respond_to: oneshot::Sender<()>,
    },
    ClearMembership {
        user_id: String,
        room_id: String,
        respond_to: oneshot::Sender<()>,
    },
    /// Remove the session bound to `connection_id`, if it still is.
    DropSession {
        connection_id: ConnectionId,
        respond_to: oneshot::Sender<Option<DroppedSession>>,
    },
    Count { respond_to: oneshot::Sender<usize> },
}

// ============================================================================
// Room
// ============================================================================

/// Messages handled by `RoomActor`.
#[derive(Debug)]
pub enum RoomMessage {
    Join {
        identity: Identity,
        connection: ConnectionActorHandle,
        respond_to: oneshot::Sender<Result<Participant, HubError>>,
    },
    Leave {
        identity: Identity,
        connection_id: ConnectionId,
        respond_to: oneshot::Sender<Result<(), HubError>>,
    },
    PostMessage {
        sender: Identity,
        content: String,
        kind: MessageKind,
        respond_to: oneshot::Sender<Result<ChatMessage, HubError>>,
    },
    Typing {
        identity: Identity,
        connection_id: ConnectionId,
        is_typing: bool,
    },
    DeleteMessage {
        requester: DeleteRequester,
        message_id: String,
        respond_to: oneshot::Sender<Result<ChatMessage, HubError>>,
    },
    GetHistory {
        respond_to: oneshot::Sender<Vec<ChatMessage>>,
    },
    GetSummary {
        respond_to: oneshot::Sender<RoomSummary>,
    },
    GetSnapshot {
        respond_to: oneshot::Sender<RoomSnapshot>,
    },
    GetCallInfo {
        respond_to: oneshot::Sender<CallInfo>,
    },
    /// Start a call or merge into the active one. `connection` is `None`
    /// for the administrative surface.
    StartCall {
        identity: Identity,
        connection: Option<ConnectionActorHandle>,
        respond_to: oneshot::Sender<Result<StartOutcome, HubError>>,
    },
    AcceptCall {
        caller_id: String,
        identity: Identity,
        connection: ConnectionActorHandle,
        respond_to: oneshot::Sender<Result<JoinOutcome, HubError>>,
    },
    RejectCall {
        caller_id: String,
        identity: Identity,
        respond_to: oneshot::Sender<Result<(), HubError>>,
    },
    /// Send `voice_call_invite` to eligible participants.
    InviteAll {
        caller: Identity,
        respond_to: oneshot::Sender<Result<usize, HubError>>,
    },
    /// Send `voice_call_offer` to eligible participants.
    RoomCall {
        caller: Identity,
        respond_to: oneshot::Sender<Result<usize, HubError>>,
    },
    EndCall {
        identity: Identity,
        /// Administrative ends fail on an idle room and notify the whole
        /// room rather than the call group.
        administrative: bool,
        respond_to: oneshot::Sender<Result<(), HubError>>,
    },
    RelayAudio {
        identity: Identity,
        connection_id: ConnectionId,
        audio_chunk: Value,
    },
    /// A connection went away. `identity` is `None` when the connection no
    /// longer speaks for any user.
    Disconnect {
        identity: Option<Identity>,
        connection_id: ConnectionId,
        respond_to: oneshot::Sender<()>,
    },
}

// ============================================================================
// Connection
// ============================================================================

/// Messages handled by `ConnectionActor`.
#[derive(Debug)]
pub enum ConnectionMessage {
    Deliver { event: ServerEvent },
}

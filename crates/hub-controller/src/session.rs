//! Per-connection client session.
//!
//! A [`ClientSession`] turns the inbound frames of one WebSocket into
//! operations on the room, presence and relay components. Frames are
//! handled one at a time, in arrival order.
//!
//! A connection speaks for exactly one user: the identity it authenticated
//! as, or the identity implicitly assigned by its first event. Identity
//! fields inside later event payloads are ignored. Authenticating as a
//! different user releases the previous one from its rooms and call first.
//!
//! Failures are reported to this connection only, as an `error` event; they
//! never close the connection.

use crate::actors::connection::ConnectionActorHandle;
use crate::actors::controller::HubControllerActorHandle;
use crate::actors::messages::Identity;
use crate::actors::room::RoomActorHandle;
use crate::dispatch::to_connection;
use crate::domain::message::MessageKind;
use crate::domain::roster::{Participant, Role};
use crate::domain::DeleteRequester;
use crate::errors::HubError;
use crate::observability::metrics;
use crate::protocol::{ClientEvent, ServerEvent, UserRef};
use crate::relay::SignalingRelay;

use std::collections::BTreeSet;
use std::time::Instant;
use tracing::{debug, warn};

/// Room used when an event names none.
pub const DEFAULT_ROOM_ID: &str = "default_room";

/// Content used when a message arrives without any.
pub const EMPTY_MESSAGE_CONTENT: &str = "Empty message";

pub struct ClientSession {
    connection: ConnectionActorHandle,
    controller: HubControllerActorHandle,
    relay: SignalingRelay,
    identity: Option<Identity>,
    /// Rooms this connection joined or entered a call in, and has not left.
    rooms: BTreeSet<String>,
}

impl ClientSession {
    #[must_use]
    pub fn new(connection: ConnectionActorHandle, controller: HubControllerActorHandle) -> Self {
        let relay = SignalingRelay::new(controller.presence().clone());
        Self {
            connection,
            controller,
            relay,
            identity: None,
            rooms: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    #[must_use]
    pub fn connection(&self) -> &ConnectionActorHandle {
        &self.connection
    }

    /// Parse and handle one inbound text frame.
    pub async fn handle_frame(&mut self, text: &str) {
        match ClientEvent::from_frame(text) {
            Ok(event) => self.handle(event).await,
            Err(e) => self.report("invalid", &e),
        }
    }

    /// Handle one inbound event, reporting any failure to the client.
    pub async fn handle(&mut self, event: ClientEvent) {
        let name = event.name();
        let start = Instant::now();

        let result = self.dispatch(event).await;
        metrics::record_event(name, result.is_ok(), start.elapsed());

        if let Err(e) = result {
            self.report(name, &e);
        }
    }

    fn report(&self, event: &str, err: &HubError) {
        match err {
            HubError::Internal(reason) => {
                warn!(
                    target: "hub.session",
                    connection_id = %self.connection.connection_id(),
                    event = event,
                    reason = %reason,
                    "Event failed"
                );
            }
            _ => {
                debug!(
                    target: "hub.session",
                    connection_id = %self.connection.connection_id(),
                    event = event,
                    error = %err,
                    "Event rejected"
                );
            }
        }
        metrics::record_error("realtime", err.error_type());
        to_connection(&self.connection, ServerEvent::from_error(err));
    }

    /// The identity this connection speaks for, assigning one on first use.
    async fn ensure_identity(
        &mut self,
        claimed_id: Option<String>,
        claimed_name: Option<String>,
    ) -> Result<Identity, HubError> {
        if let Some(identity) = &self.identity {
            return Ok(identity.clone());
        }
        let identity = self
            .controller
            .presence()
            .authenticate(self.connection.clone(), claimed_id, claimed_name)
            .await?;
        self.identity = Some(identity.clone());
        Ok(identity)
    }

    async fn existing_room(&self, room_id: &str) -> Result<Option<RoomActorHandle>, HubError> {
        let room = self.controller.get_room(room_id.to_string()).await?;
        if room.is_none() {
            debug!(
                target: "hub.session",
                connection_id = %self.connection.connection_id(),
                room_id = %room_id,
                "Event names an unknown room, ignoring"
            );
        }
        Ok(room)
    }

    async fn dispatch(&mut self, event: ClientEvent) -> Result<(), HubError> {
        let connection_id = self.connection.connection_id();

        match event {
            ClientEvent::Authenticate(p) => {
                if let Some(previous) = self.identity.take() {
                    let claimed = p.user_id.as_deref().filter(|id| !id.is_empty());
                    if claimed == Some(previous.user_id.as_str()) {
                        self.identity = Some(previous);
                    } else {
                        self.release_identity(previous).await?;
                    }
                }
                let identity = self
                    .controller
                    .presence()
                    .authenticate(self.connection.clone(), p.user_id, p.user_name)
                    .await?;
                to_connection(
                    &self.connection,
                    ServerEvent::Authenticated(UserRef {
                        user_id: identity.user_id.clone(),
                        user_name: identity.user_name.clone(),
                    }),
                );
                debug!(
                    target: "hub.session",
                    connection_id = %connection_id,
                    user_id = %identity.user_id,
                    "User authenticated"
                );
                self.identity = Some(identity);
            }

            ClientEvent::JoinRoom(p) => {
                let room_id = room_or_default(p.room_id);
                let identity = self.ensure_identity(p.user_id, p.user_name).await?;
                let room = self.controller.ensure_room(room_id.clone(), None).await?;
                room.join(identity, self.connection.clone()).await?;
                self.rooms.insert(room_id);
            }

            ClientEvent::LeaveRoom(p) => {
                let room_id = room_or_default(p.room_id);
                let identity = self.ensure_identity(p.user_id, p.user_name).await?;
                if let Some(room) = self.existing_room(&room_id).await? {
                    room.leave(identity, connection_id).await?;
                }
                self.rooms.remove(&room_id);
            }

            ClientEvent::SendMessage(p) => {
                let room_id = room_or_default(p.room_id);
                let identity = self.ensure_identity(None, None).await?;
                let content = p
                    .content
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| EMPTY_MESSAGE_CONTENT.to_string());
                let kind = p.kind.map(MessageKind::from).unwrap_or_default();

                // A room first referenced by a message belongs to its sender.
                let creator = Participant {
                    user_id: identity.user_id.clone(),
                    display_name: identity.user_name.clone(),
                    role: Role::Creator,
                    active: true,
                };
                let room = self.controller.ensure_room(room_id, Some(creator)).await?;
                room.post_message(identity, content, kind).await?;
            }

            ClientEvent::Typing(p) => {
                let room_id = room_or_default(p.room_id);
                let identity = self.ensure_identity(None, None).await?;
                if let Some(room) = self.existing_room(&room_id).await? {
                    room.typing(identity, connection_id, p.is_typing.unwrap_or(false))
                        .await?;
                }
            }

            ClientEvent::DeleteMessage(p) => {
                let room_id = room_or_default(p.room_id);
                let message_id = require(p.message_id, "messageId")?;
                let identity = self.ensure_identity(None, None).await?;
                let room = self
                    .controller
                    .get_room(room_id.clone())
                    .await?
                    .ok_or(HubError::RoomNotFound { room_id })?;
                room.delete_message(DeleteRequester::Participant(identity.user_id), message_id)
                    .await?;
            }

            ClientEvent::StartCall(p) => {
                let room_id = require(p.room_id.clone(), "roomId")?;
                let identity = self
                    .ensure_identity(p.claimed_id(), p.claimed_name())
                    .await?;
                let room = self.controller.ensure_room(room_id.clone(), None).await?;
                room.start_call(identity, Some(self.connection.clone()))
                    .await?;
                self.rooms.insert(room_id);
            }

            ClientEvent::InviteAll(p) => {
                let room_id = require(p.room_id, "roomId")?;
                let caller = self.ensure_identity(p.caller_id, p.caller_name).await?;
                if let Some(room) = self.existing_room(&room_id).await? {
                    room.invite_all(caller).await?;
                }
            }

            ClientEvent::RoomCall(p) => {
                let room_id = require(p.room_id, "roomId")?;
                let caller = self.ensure_identity(p.caller_id, p.caller_name).await?;
                if let Some(room) = self.existing_room(&room_id).await? {
                    room.room_call(caller).await?;
                }
            }

            ClientEvent::Offer(p) => {
                let room_id = require(p.room_id, "roomId")?;
                let target = require(p.target_user_id, "targetUserId")?;
                let caller = self.ensure_identity(p.caller_id, p.caller_name).await?;
                self.relay
                    .relay_offer(&caller, &room_id, &target, p.sdp)
                    .await?;
            }

            ClientEvent::Accept(p) => {
                let room_id = require(p.room_id, "roomId")?;
                let caller_id = require(p.caller_id, "callerId")?;
                let identity = self.ensure_identity(p.user_id, p.user_name).await?;
                let room = self.controller.ensure_room(room_id.clone(), None).await?;
                room.accept_call(caller_id, identity, self.connection.clone())
                    .await?;
                self.rooms.insert(room_id);
            }

            ClientEvent::Reject(p) => {
                let room_id = require(p.room_id, "roomId")?;
                let caller_id = require(p.caller_id, "callerId")?;
                let identity = self.ensure_identity(p.user_id, p.user_name).await?;
                if let Some(room) = self.existing_room(&room_id).await? {
                    room.reject_call(caller_id, identity).await?;
                }
            }

            ClientEvent::IceCandidate(p) => {
                let room_id = require(p.room_id, "roomId")?;
                let target = require(p.target_user_id, "targetUserId")?;
                let candidate = p
                    .candidate
                    .ok_or_else(|| HubError::Validation("candidate is required".to_string()))?;
                let sender = self.ensure_identity(p.sender_id, None).await?;
                self.relay
                    .relay_ice(&sender.user_id, &room_id, &target, candidate)
                    .await?;
            }

            ClientEvent::AudioChunk(p) => {
                let room_id = require(p.room_id, "roomId")?;
                let audio_chunk = p
                    .audio_chunk
                    .ok_or_else(|| HubError::Validation("audioChunk is required".to_string()))?;
                let identity = self.ensure_identity(p.user_id, p.user_name).await?;
                if let Some(room) = self.existing_room(&room_id).await? {
                    room.relay_audio(identity, connection_id, audio_chunk)
                        .await?;
                }
            }

            ClientEvent::EndCall(p) => {
                let room_id = require(p.room_id, "roomId")?;
                let identity = self.ensure_identity(p.user_id, p.user_name).await?;
                if let Some(room) = self.existing_room(&room_id).await? {
                    room.end_call(identity, false).await?;
                }
            }
        }

        Ok(())
    }

    /// Stop speaking for `previous` in every room this connection entered.
    ///
    /// If presence has already rebound `previous` to another connection, the
    /// rooms only drop this connection's subscriptions.
    async fn release_identity(&mut self, previous: Identity) -> Result<(), HubError> {
        let connection_id = self.connection.connection_id();
        let bound_here = self
            .controller
            .presence()
            .resolve(&previous.user_id)
            .await?
            .is_some_and(|c| c.connection_id() == connection_id);

        debug!(
            target: "hub.session",
            connection_id = %connection_id,
            user_id = %previous.user_id,
            rooms = self.rooms.len(),
            "Releasing previous identity"
        );

        let rooms = std::mem::take(&mut self.rooms);
        self.release_rooms(rooms, bound_here.then_some(&previous))
            .await;
        Ok(())
    }

    /// Run the room half of the disconnect cascade for `identity`.
    async fn release_rooms(&self, rooms: BTreeSet<String>, identity: Option<&Identity>) {
        let connection_id = self.connection.connection_id();

        for room_id in rooms {
            let room = match self.controller.get_room(room_id.clone()).await {
                Ok(Some(room)) => room,
                Ok(None) => continue,
                Err(e) => {
                    warn!(
                        target: "hub.session",
                        connection_id = %connection_id,
                        room_id = %room_id,
                        error = %e,
                        "Failed to look up room during disconnect"
                    );
                    continue;
                }
            };
            if let Err(e) = room.disconnect(identity.cloned(), connection_id).await {
                warn!(
                    target: "hub.session",
                    connection_id = %connection_id,
                    room_id = %room_id,
                    error = %e,
                    "Room disconnect failed"
                );
            }
        }
    }

    /// Run the disconnect cascade for this connection.
    ///
    /// The user is marked inactive in every room they joined, removed from
    /// any active call, and dropped from presence. If presence has already
    /// rebound the user to a newer connection, this connection is only
    /// unsubscribed.
    pub async fn disconnect(mut self) {
        let connection_id = self.connection.connection_id();

        let dropped = match self.controller.presence().drop_session(connection_id).await {
            Ok(dropped) => dropped,
            Err(e) => {
                warn!(
                    target: "hub.session",
                    connection_id = %connection_id,
                    error = %e,
                    "Failed to drop presence session"
                );
                None
            }
        };

        let mut rooms = std::mem::take(&mut self.rooms);
        let identity = dropped.map(|session| {
            rooms.extend(session.rooms);
            session.identity
        });

        self.release_rooms(rooms, identity.as_ref()).await;

        if let Err(e) = self.controller.deregister_connection(connection_id).await {
            warn!(
                target: "hub.session",
                connection_id = %connection_id,
                error = %e,
                "Failed to deregister connection"
            );
        }

        debug!(
            target: "hub.session",
            connection_id = %connection_id,
            user_id = identity.as_ref().map_or("-", |i| i.user_id.as_str()),
            "Session closed"
        );
    }
}

fn room_or_default(room_id: Option<String>) -> String {
    room_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| DEFAULT_ROOM_ID.to_string())
}

fn require(value: Option<String>, field: &str) -> Result<String, HubError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| HubError::Validation(format!("{field} is required")))
}

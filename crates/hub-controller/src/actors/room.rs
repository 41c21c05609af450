//! `RoomActor` - per-room actor that owns room state.
//!
//! Each `RoomActor`:
//! - Owns one [`RoomState`]: roster, bounded history, voice call and
//!   invitation round
//! - Keeps two broadcast groups: connections joined to the room, and
//!   connections in the room's call
//! - Serialises every mutation for the room, so join/leave/call transitions
//!   never interleave
//!
//! The actor awaits the presence actor (membership bookkeeping, addressing
//! callers and invitees) but never the controller.

use super::connection::ConnectionActorHandle;
use super::messages::{Identity, RoomMessage};
use super::metrics::{ActorMetrics, ActorType, MailboxMonitor};
use super::presence::PresenceActorHandle;
use crate::dispatch::{to_connection, BroadcastGroup};
use crate::domain::call::{EndOutcome, JoinOutcome, LeaveOutcome, StartOutcome};
use crate::domain::message::{ChatMessage, MessageKind};
use crate::domain::roster::Participant;
use crate::domain::{CallInfo, DeleteRequester, RoomSnapshot, RoomState, RoomSummary};
use crate::errors::HubError;
use crate::protocol::{
    AudioChunkEvent, CallActiveEvent, CallEndEvent, CallMemberEvent, CallerEvent,
    MembershipEvent, MessageDeletedEvent, OfferEvent, ServerEvent, TypingEvent,
    END_REASON_NO_PARTICIPANTS,
};

use chrono::Utc;
use common::types::ConnectionId;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Channel buffer size for the room mailbox.
const ROOM_CHANNEL_BUFFER: usize = 500;

/// Handle to a `RoomActor`.
#[derive(Clone, Debug)]
pub struct RoomActorHandle {
    sender: mpsc::Sender<RoomMessage>,
    cancel_token: CancellationToken,
    room_id: String,
}

impl RoomActorHandle {
    #[must_use]
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> RoomMessage,
    ) -> Result<T, HubError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|e| HubError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| HubError::Internal(format!("response receive failed: {e}")))
    }

    async fn notify(&self, message: RoomMessage) -> Result<(), HubError> {
        self.sender
            .send(message)
            .await
            .map_err(|e| HubError::Internal(format!("channel send failed: {e}")))
    }

    /// Join the room and subscribe `connection` to its broadcasts.
    pub async fn join(
        &self,
        identity: Identity,
        connection: ConnectionActorHandle,
    ) -> Result<Participant, HubError> {
        self.request(|respond_to| RoomMessage::Join {
            identity,
            connection,
            respond_to,
        })
        .await?
    }

    /// Leave the room; also leaves its call.
    pub async fn leave(&self, identity: Identity, connection_id: ConnectionId) -> Result<(), HubError> {
        self.request(|respond_to| RoomMessage::Leave {
            identity,
            connection_id,
            respond_to,
        })
        .await?
    }

    /// Append a message and broadcast it to the room.
    pub async fn post_message(
        &self,
        sender: Identity,
        content: String,
        kind: MessageKind,
    ) -> Result<ChatMessage, HubError> {
        self.request(|respond_to| RoomMessage::PostMessage {
            sender,
            content,
            kind,
            respond_to,
        })
        .await?
    }

    /// Relay a typing indicator to everyone else in the room.
    pub async fn typing(
        &self,
        identity: Identity,
        connection_id: ConnectionId,
        is_typing: bool,
    ) -> Result<(), HubError> {
        self.notify(RoomMessage::Typing {
            identity,
            connection_id,
            is_typing,
        })
        .await
    }

    /// Soft-delete a message, returning it with its canonical id.
    pub async fn delete_message(
        &self,
        requester: DeleteRequester,
        message_id: String,
    ) -> Result<ChatMessage, HubError> {
        self.request(|respond_to| RoomMessage::DeleteMessage {
            requester,
            message_id,
            respond_to,
        })
        .await?
    }

    pub async fn history(&self) -> Result<Vec<ChatMessage>, HubError> {
        self.request(|respond_to| RoomMessage::GetHistory { respond_to })
            .await
    }

    pub async fn summary(&self) -> Result<RoomSummary, HubError> {
        self.request(|respond_to| RoomMessage::GetSummary { respond_to })
            .await
    }

    pub async fn snapshot(&self) -> Result<RoomSnapshot, HubError> {
        self.request(|respond_to| RoomMessage::GetSnapshot { respond_to })
            .await
    }

    pub async fn call_info(&self) -> Result<CallInfo, HubError> {
        self.request(|respond_to| RoomMessage::GetCallInfo { respond_to })
            .await
    }

    /// Start a voice call, or merge into the active one.
    pub async fn start_call(
        &self,
        identity: Identity,
        connection: Option<ConnectionActorHandle>,
    ) -> Result<StartOutcome, HubError> {
        self.request(|respond_to| RoomMessage::StartCall {
            identity,
            connection,
            respond_to,
        })
        .await?
    }

    pub async fn accept_call(
        &self,
        caller_id: String,
        identity: Identity,
        connection: ConnectionActorHandle,
    ) -> Result<JoinOutcome, HubError> {
        self.request(|respond_to| RoomMessage::AcceptCall {
            caller_id,
            identity,
            connection,
            respond_to,
        })
        .await?
    }

    pub async fn reject_call(&self, caller_id: String, identity: Identity) -> Result<(), HubError> {
        self.request(|respond_to| RoomMessage::RejectCall {
            caller_id,
            identity,
            respond_to,
        })
        .await?
    }

    /// Invite eligible participants. Returns how many were invited.
    pub async fn invite_all(&self, caller: Identity) -> Result<usize, HubError> {
        self.request(|respond_to| RoomMessage::InviteAll { caller, respond_to })
            .await?
    }

    /// Offer the call to eligible participants. Returns how many were offered.
    pub async fn room_call(&self, caller: Identity) -> Result<usize, HubError> {
        self.request(|respond_to| RoomMessage::RoomCall { caller, respond_to })
            .await?
    }

    pub async fn end_call(&self, identity: Identity, administrative: bool) -> Result<(), HubError> {
        self.request(|respond_to| RoomMessage::EndCall {
            identity,
            administrative,
            respond_to,
        })
        .await?
    }

    /// Relay an opaque audio chunk to the rest of the call.
    pub async fn relay_audio(
        &self,
        identity: Identity,
        connection_id: ConnectionId,
        audio_chunk: Value,
    ) -> Result<(), HubError> {
        self.notify(RoomMessage::RelayAudio {
            identity,
            connection_id,
            audio_chunk,
        })
        .await
    }

    /// Clean up after a dropped connection.
    pub async fn disconnect(
        &self,
        identity: Option<Identity>,
        connection_id: ConnectionId,
    ) -> Result<(), HubError> {
        self.request(|respond_to| RoomMessage::Disconnect {
            identity,
            connection_id,
            respond_to,
        })
        .await
    }

    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

/// Which audience an invitation fan-out addresses, and with what event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InvitationKind {
    Invite,
    Offer,
}

/// The `RoomActor` implementation.
pub struct RoomActor {
    state: RoomState,
    receiver: mpsc::Receiver<RoomMessage>,
    cancel_token: CancellationToken,
    presence: PresenceActorHandle,
    /// Connections joined to the room.
    members: BroadcastGroup,
    /// Connections in the room's active call.
    call_group: BroadcastGroup,
    metrics: Arc<ActorMetrics>,
    mailbox: MailboxMonitor,
}

impl RoomActor {
    /// Spawn a room actor that takes ownership of `state`.
    pub fn spawn(
        state: RoomState,
        presence: PresenceActorHandle,
        cancel_token: CancellationToken,
        metrics: Arc<ActorMetrics>,
    ) -> (RoomActorHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(ROOM_CHANNEL_BUFFER);
        let room_id = state.room_id().to_string();

        let actor = Self {
            state,
            receiver,
            cancel_token: cancel_token.clone(),
            presence,
            members: BroadcastGroup::new(),
            call_group: BroadcastGroup::new(),
            metrics,
            mailbox: MailboxMonitor::new(ActorType::Room, &room_id),
        };

        let task_handle = tokio::spawn(actor.run());

        let handle = RoomActorHandle {
            sender,
            cancel_token,
            room_id,
        };

        (handle, task_handle)
    }

    #[instrument(skip_all, name = "hub.actor.room", fields(room_id = %self.state.room_id()))]
    async fn run(mut self) {
        info!(
            target: "hub.actor.room",
            room_id = %self.state.room_id(),
            "RoomActor started"
        );

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    debug!(
                        target: "hub.actor.room",
                        room_id = %self.state.room_id(),
                        "RoomActor received cancellation signal"
                    );
                    break;
                }

                msg = self.receiver.recv() => {
                    let Some(message) = msg else {
                        debug!(
                            target: "hub.actor.room",
                            room_id = %self.state.room_id(),
                            "RoomActor channel closed, exiting"
                        );
                        break;
                    };
                    self.mailbox.record_enqueue();
                    self.handle_message(message).await;
                    self.mailbox.record_dequeue();
                    self.metrics.record_message_processed();
                }
            }
        }

        if self.state.call().is_active() {
            self.metrics.call_ended();
        }

        info!(
            target: "hub.actor.room",
            room_id = %self.state.room_id(),
            participants = self.state.roster().len(),
            messages = self.state.history().len(),
            messages_processed = self.mailbox.messages_processed(),
            "RoomActor stopped"
        );
    }

    async fn handle_message(&mut self, message: RoomMessage) {
        match message {
            RoomMessage::Join {
                identity,
                connection,
                respond_to,
            } => {
                let result = self.handle_join(identity, connection).await;
                let _ = respond_to.send(result);
            }

            RoomMessage::Leave {
                identity,
                connection_id,
                respond_to,
            } => {
                let result = self.handle_leave(&identity, connection_id).await;
                let _ = respond_to.send(result);
            }

            RoomMessage::PostMessage {
                sender,
                content,
                kind,
                respond_to,
            } => {
                let message = self.handle_post(&sender, &content, kind);
                let _ = respond_to.send(Ok(message));
            }

            RoomMessage::Typing {
                identity,
                connection_id,
                is_typing,
            } => {
                let event = ServerEvent::UserTyping(TypingEvent {
                    room_id: self.state.room_id().to_string(),
                    user_id: identity.user_id,
                    user_name: identity.user_name,
                    is_typing,
                });
                self.members.broadcast_except(&event, connection_id);
            }

            RoomMessage::DeleteMessage {
                requester,
                message_id,
                respond_to,
            } => {
                let result = self.handle_delete(&requester, &message_id);
                let _ = respond_to.send(result);
            }

            RoomMessage::GetHistory { respond_to } => {
                let _ = respond_to.send(self.state.history().to_vec());
            }

            RoomMessage::GetSummary { respond_to } => {
                let _ = respond_to.send(self.state.summary());
            }

            RoomMessage::GetSnapshot { respond_to } => {
                let _ = respond_to.send(self.state.snapshot());
            }

            RoomMessage::GetCallInfo { respond_to } => {
                let _ = respond_to.send(self.state.call_info());
            }

            RoomMessage::StartCall {
                identity,
                connection,
                respond_to,
            } => {
                let outcome = self.handle_start_call(&identity, connection);
                let _ = respond_to.send(Ok(outcome));
            }

            RoomMessage::AcceptCall {
                caller_id,
                identity,
                connection,
                respond_to,
            } => {
                let result = self
                    .handle_accept_call(&caller_id, &identity, connection)
                    .await;
                let _ = respond_to.send(result);
            }

            RoomMessage::RejectCall {
                caller_id,
                identity,
                respond_to,
            } => {
                let result = self.handle_reject_call(&caller_id, &identity).await;
                let _ = respond_to.send(result);
            }

            RoomMessage::InviteAll { caller, respond_to } => {
                let result = self.send_invitations(&caller, InvitationKind::Invite).await;
                let _ = respond_to.send(result);
            }

            RoomMessage::RoomCall { caller, respond_to } => {
                let result = self.send_invitations(&caller, InvitationKind::Offer).await;
                let _ = respond_to.send(result);
            }

            RoomMessage::EndCall {
                identity,
                administrative,
                respond_to,
            } => {
                let result = self.handle_end_call(&identity, administrative);
                let _ = respond_to.send(result);
            }

            RoomMessage::RelayAudio {
                identity,
                connection_id,
                audio_chunk,
            } => {
                let event = ServerEvent::VoiceAudioChunk(AudioChunkEvent {
                    room_id: self.state.room_id().to_string(),
                    user_id: identity.user_id,
                    user_name: identity.user_name,
                    audio_chunk,
                });
                self.call_group.broadcast_except(&event, connection_id);
            }

            RoomMessage::Disconnect {
                identity,
                connection_id,
                respond_to,
            } => {
                self.handle_disconnect(identity.as_ref(), connection_id);
                let _ = respond_to.send(());
            }
        }
    }

    fn room_id(&self) -> String {
        self.state.room_id().to_string()
    }

    fn call_member(&self, identity: &Identity) -> CallMemberEvent {
        CallMemberEvent {
            room_id: self.room_id(),
            user_id: identity.user_id.clone(),
            user_name: identity.user_name.clone(),
        }
    }

    /// Append a system message and broadcast it to the room.
    fn announce(&mut self, content: String) {
        let notice = self.state.append_system(content);
        self.members.broadcast(&ServerEvent::Message(notice));
    }

    async fn handle_join(
        &mut self,
        identity: Identity,
        connection: ConnectionActorHandle,
    ) -> Result<Participant, HubError> {
        // The join notice goes to history only; clients learn of the join
        // from `user_joined`.
        let (participant, notice) = self.state.join(&identity.user_id, &identity.user_name);
        self.members.insert(connection.clone());
        self.presence
            .register_membership(&identity.user_id, self.state.room_id())
            .await?;

        self.members.broadcast(&ServerEvent::UserJoined(MembershipEvent {
            room_id: self.room_id(),
            user_id: identity.user_id.clone(),
            user_name: identity.user_name.clone(),
            timestamp: notice.timestamp,
        }));

        if let Some(call) = self.state.call().active() {
            to_connection(
                &connection,
                ServerEvent::VoiceCallActive(CallActiveEvent {
                    room_id: self.room_id(),
                    started_by: call.started_by.clone(),
                    started_at: call.started_at,
                    participants: call.participants.len(),
                }),
            );
        }

        debug!(
            target: "hub.actor.room",
            room_id = %self.state.room_id(),
            user_id = %identity.user_id,
            connection_id = %connection.connection_id(),
            members = self.members.len(),
            "User joined room"
        );

        Ok(participant)
    }

    async fn handle_leave(
        &mut self,
        identity: &Identity,
        connection_id: ConnectionId,
    ) -> Result<(), HubError> {
        self.members.remove(connection_id);
        self.call_group.remove(connection_id);

        let notice = self.state.leave(&identity.user_id, &identity.user_name);
        self.members.broadcast(&ServerEvent::UserLeft(MembershipEvent {
            room_id: self.room_id(),
            user_id: identity.user_id.clone(),
            user_name: identity.user_name.clone(),
            timestamp: notice.timestamp,
        }));
        self.members.broadcast(&ServerEvent::Message(notice));

        self.leave_call(identity);

        self.presence
            .clear_membership(&identity.user_id, self.state.room_id())
            .await?;

        debug!(
            target: "hub.actor.room",
            room_id = %self.state.room_id(),
            user_id = %identity.user_id,
            "User left room"
        );

        Ok(())
    }

    fn handle_post(&mut self, sender: &Identity, content: &str, kind: MessageKind) -> ChatMessage {
        let message = self
            .state
            .append(&sender.user_id, &sender.user_name, content, kind);
        let delivered = self.members.broadcast(&ServerEvent::Message(message.clone()));

        debug!(
            target: "hub.actor.room",
            room_id = %self.state.room_id(),
            message_id = %message.id,
            content_len = content.len(),
            delivered = delivered,
            "Message posted"
        );

        message
    }

    fn handle_delete(
        &mut self,
        requester: &DeleteRequester,
        message_id: &str,
    ) -> Result<ChatMessage, HubError> {
        let message = self.state.delete_message(requester, message_id)?;

        self.members
            .broadcast(&ServerEvent::MessageDeleted(MessageDeletedEvent {
                room_id: self.room_id(),
                message_id: message.id.clone(),
                deleted_by: message.deleted_by.clone(),
                timestamp: message.deleted_at.unwrap_or_else(Utc::now),
            }));

        debug!(
            target: "hub.actor.room",
            room_id = %self.state.room_id(),
            message_id = %message.id,
            "Message deleted"
        );

        Ok(message)
    }

    fn handle_start_call(
        &mut self,
        identity: &Identity,
        connection: Option<ConnectionActorHandle>,
    ) -> StartOutcome {
        let connection_id = connection.as_ref().map(ConnectionActorHandle::connection_id);
        let outcome = self
            .state
            .start_call(&identity.user_id, &identity.user_name, connection_id);

        if let Some(connection) = connection {
            self.call_group.insert(connection);
        }

        match &outcome {
            StartOutcome::Started { .. } => {
                self.metrics.call_started();
                self.announce(format!("{} started a voice call", identity.user_name));
                self.members
                    .broadcast(&ServerEvent::VoiceCallStarted(CallerEvent {
                        room_id: self.room_id(),
                        caller_id: identity.user_id.clone(),
                        caller_name: identity.user_name.clone(),
                    }));

                info!(
                    target: "hub.actor.room",
                    room_id = %self.state.room_id(),
                    started_by = %identity.user_id,
                    "Voice call started"
                );
            }
            StartOutcome::Merged { participant_count } => {
                let event = ServerEvent::VoiceUserJoined(self.call_member(identity));
                match connection_id {
                    Some(id) => self.call_group.broadcast_except(&event, id),
                    None => self.call_group.broadcast(&event),
                };

                debug!(
                    target: "hub.actor.room",
                    room_id = %self.state.room_id(),
                    user_id = %identity.user_id,
                    participants = participant_count,
                    "Call start merged into active call"
                );
            }
        }

        outcome
    }

    async fn handle_accept_call(
        &mut self,
        caller_id: &str,
        identity: &Identity,
        connection: ConnectionActorHandle,
    ) -> Result<JoinOutcome, HubError> {
        let outcome = self.state.accept_call(
            caller_id,
            &identity.user_id,
            &identity.user_name,
            Some(connection.connection_id()),
        );
        if outcome == JoinOutcome::Created {
            self.metrics.call_started();
        }

        self.call_group.insert(connection);
        let member = self.call_member(identity);
        self.call_group
            .broadcast(&ServerEvent::VoiceCallJoined(member.clone()));

        if let Some(caller) = self.presence.resolve(caller_id).await? {
            to_connection(&caller, ServerEvent::VoiceCallAccepted(member));
        }

        debug!(
            target: "hub.actor.room",
            room_id = %self.state.room_id(),
            user_id = %identity.user_id,
            caller_id = %caller_id,
            "Call accepted"
        );

        Ok(outcome)
    }

    async fn handle_reject_call(
        &mut self,
        caller_id: &str,
        identity: &Identity,
    ) -> Result<(), HubError> {
        self.state.reject_call(&identity.user_id);

        if let Some(caller) = self.presence.resolve(caller_id).await? {
            to_connection(
                &caller,
                ServerEvent::VoiceCallRejected(self.call_member(identity)),
            );
        }

        Ok(())
    }

    /// Notify every active participant other than the caller who is online
    /// and not yet invited or answered in the current round.
    async fn send_invitations(
        &mut self,
        caller: &Identity,
        kind: InvitationKind,
    ) -> Result<usize, HubError> {
        self.state
            .invitations_mut()
            .ensure_round(&caller.user_id, &caller.user_name);

        let mut invited = 0;
        for user_id in self.state.roster().active_ids_except(&caller.user_id) {
            if !self.state.invitations().is_eligible(&user_id) {
                debug!(
                    target: "hub.actor.room",
                    room_id = %self.state.room_id(),
                    user_id = %user_id,
                    "Skipping already-invited participant"
                );
                continue;
            }

            let Some(target) = self.presence.resolve(&user_id).await? else {
                continue;
            };

            let event = match kind {
                InvitationKind::Invite => ServerEvent::VoiceCallInvite(CallerEvent {
                    room_id: self.room_id(),
                    caller_id: caller.user_id.clone(),
                    caller_name: caller.user_name.clone(),
                }),
                InvitationKind::Offer => ServerEvent::VoiceCallOffer(OfferEvent {
                    room_id: self.room_id(),
                    caller_id: caller.user_id.clone(),
                    caller_name: caller.user_name.clone(),
                    target_user_id: user_id.clone(),
                    sdp: None,
                }),
            };

            if to_connection(&target, event) {
                self.state
                    .invitations_mut()
                    .record_invited(&user_id, target.connection_id());
                invited += 1;
            }
        }

        if kind == InvitationKind::Offer {
            self.announce(format!("{} started a voice call.", caller.user_name));
        }

        debug!(
            target: "hub.actor.room",
            room_id = %self.state.room_id(),
            caller_id = %caller.user_id,
            invited = invited,
            "Invitations sent"
        );

        Ok(invited)
    }

    fn handle_end_call(&mut self, identity: &Identity, administrative: bool) -> Result<(), HubError> {
        match self.state.end_call() {
            EndOutcome::Ended(call) => {
                self.metrics.call_ended();
                self.announce(format!("{} ended the voice call", identity.user_name));

                let event = ServerEvent::VoiceCallEnd(CallEndEvent {
                    room_id: self.room_id(),
                    user_id: Some(identity.user_id.clone()),
                    user_name: Some(identity.user_name.clone()),
                    reason: None,
                });
                if administrative {
                    self.members.broadcast(&event);
                } else {
                    self.call_group.broadcast(&event);
                }
                self.call_group.clear();

                info!(
                    target: "hub.actor.room",
                    room_id = %self.state.room_id(),
                    ended_by = %identity.user_id,
                    participants = call.participants.len(),
                    "Voice call ended"
                );
                Ok(())
            }
            EndOutcome::AlreadyIdle if administrative => Err(HubError::NoActiveCall {
                room_id: self.room_id(),
            }),
            EndOutcome::AlreadyIdle => Ok(()),
        }
    }

    fn handle_disconnect(&mut self, identity: Option<&Identity>, connection_id: ConnectionId) {
        self.members.remove(connection_id);
        self.call_group.remove(connection_id);

        let Some(identity) = identity else {
            return;
        };

        if let Some(notice) = self.state.disconnect(&identity.user_id, &identity.user_name) {
            self.members.broadcast(&ServerEvent::UserLeft(MembershipEvent {
                room_id: self.room_id(),
                user_id: identity.user_id.clone(),
                user_name: identity.user_name.clone(),
                timestamp: notice.timestamp,
            }));
            self.members.broadcast(&ServerEvent::Message(notice));
        }

        self.leave_call(identity);

        debug!(
            target: "hub.actor.room",
            room_id = %self.state.room_id(),
            user_id = %identity.user_id,
            connection_id = %connection_id,
            "User disconnected from room"
        );
    }

    /// Remove `identity` from the call, ending it if nobody is left.
    fn leave_call(&mut self, identity: &Identity) {
        match self.state.leave_call(&identity.user_id) {
            LeaveOutcome::NotInCall => {}
            LeaveOutcome::Left {
                participant,
                remaining,
            } => {
                if let Some(id) = participant.connection_id {
                    self.call_group.remove(id);
                }
                self.call_group
                    .broadcast(&ServerEvent::VoiceUserLeft(self.call_member(identity)));

                debug!(
                    target: "hub.actor.room",
                    room_id = %self.state.room_id(),
                    user_id = %identity.user_id,
                    remaining = remaining,
                    "User left call"
                );
            }
            LeaveOutcome::Ended { .. } => {
                self.metrics.call_ended();
                self.call_group.clear();
                self.members
                    .broadcast(&ServerEvent::VoiceCallEnd(CallEndEvent {
                        room_id: self.room_id(),
                        user_id: Some(identity.user_id.clone()),
                        user_name: Some(identity.user_name.clone()),
                        reason: Some(END_REASON_NO_PARTICIPANTS.to_string()),
                    }));

                if self.members.is_empty() {
                    warn!(
                        target: "hub.actor.room",
                        room_id = %self.state.room_id(),
                        "Call ended with no connections left in the room"
                    );
                } else {
                    info!(
                        target: "hub.actor.room",
                        room_id = %self.state.room_id(),
                        "Voice call ended, no participants left"
                    );
                }
            }
        }
    }
}

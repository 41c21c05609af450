//! Pure room state.
//!
//! Nothing here performs I/O or knows about connections beyond carrying
//! their ids. The [`RoomActor`](crate::actors::room::RoomActor) owns one
//! [`RoomState`] and turns the returned values into broadcasts.

pub mod call;
pub mod history;
pub mod invitations;
pub mod message;
pub mod roster;

use crate::errors::HubError;
use call::{CallSession, EndOutcome, JoinOutcome, LeaveOutcome, StartOutcome};
use chrono::{DateTime, Utc};
use common::types::ConnectionId;
use history::{LookupFailure, MessageHistory};
use invitations::{InvitationResponse, InvitationTracker};
use message::{ChatMessage, MessageKind};
use roster::{Participant, Roster};
use serde::Serialize;

/// Who is asking for a message to be deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteRequester {
    /// A room participant, subject to the sender/moderator check.
    Participant(String),
    /// A trusted administrative caller. No role check.
    Administrator(Option<String>),
}

/// Entry in the room listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id: String,
    pub name: String,
    pub participant_count: usize,
    pub has_active_call: bool,
}

/// Full room view returned by room creation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub participants: Vec<Participant>,
    pub messages: Vec<ChatMessage>,
}

/// Voice call view for the administrative surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallInfo {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participants: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_by: Option<String>,
}

/// Everything the hub knows about one room.
#[derive(Debug)]
pub struct RoomState {
    room_id: String,
    name: String,
    created_at: DateTime<Utc>,
    roster: Roster,
    history: MessageHistory,
    call: CallSession,
    invitations: InvitationTracker,
}

impl RoomState {
    /// Create an empty room. Unnamed rooms are called `Chat <room_id>`.
    #[must_use]
    pub fn new(room_id: &str, name: Option<String>) -> Self {
        Self {
            room_id: room_id.to_string(),
            name: name.unwrap_or_else(|| format!("Chat {room_id}")),
            created_at: Utc::now(),
            roster: Roster::new(),
            history: MessageHistory::new(),
            call: CallSession::new(),
            invitations: InvitationTracker::new(),
        }
    }

    #[must_use]
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn roster_mut(&mut self) -> &mut Roster {
        &mut self.roster
    }

    #[must_use]
    pub fn history(&self) -> &MessageHistory {
        &self.history
    }

    #[must_use]
    pub fn call(&self) -> &CallSession {
        &self.call
    }

    #[must_use]
    pub fn invitations(&self) -> &InvitationTracker {
        &self.invitations
    }

    pub fn invitations_mut(&mut self) -> &mut InvitationTracker {
        &mut self.invitations
    }

    // ------------------------------------------------------------------
    // Membership
    // ------------------------------------------------------------------

    /// Activate a participant and record the join in history.
    pub fn join(&mut self, user_id: &str, display_name: &str) -> (Participant, ChatMessage) {
        let participant = self.roster.activate(user_id, display_name);
        let notice = self.append_system(format!("{display_name} has joined the chat"));
        (participant, notice)
    }

    /// Deactivate a participant and record the departure in history.
    pub fn leave(&mut self, user_id: &str, display_name: &str) -> ChatMessage {
        self.roster.deactivate(user_id);
        self.append_system(format!("{display_name} has left the chat"))
    }

    /// Deactivate a participant whose connection dropped.
    ///
    /// Returns `None` if the user was never a participant of this room.
    pub fn disconnect(&mut self, user_id: &str, display_name: &str) -> Option<ChatMessage> {
        if !self.roster.deactivate(user_id) {
            return None;
        }
        Some(self.append_system(format!("{display_name} has disconnected")))
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// Append a message, evicting the oldest entry at the cap.
    pub fn append(
        &mut self,
        sender_id: &str,
        sender_name: &str,
        content: &str,
        kind: MessageKind,
    ) -> ChatMessage {
        let message = ChatMessage::new(&self.room_id, sender_id, sender_name, content, kind);
        self.history.push(message.clone());
        message
    }

    pub fn append_system(&mut self, content: impl Into<String>) -> ChatMessage {
        let message = ChatMessage::system(&self.room_id, content);
        self.history.push(message.clone());
        message
    }

    /// Soft-delete a message.
    ///
    /// # Errors
    ///
    /// - `MessageNotFound` if the id resolves to nothing
    /// - `AmbiguousMessageId` if a partial id matches several messages
    /// - `DeleteUnauthorized` if a participant may not delete it; the
    ///   message is left untouched
    pub fn delete_message(
        &mut self,
        requester: &DeleteRequester,
        message_id: &str,
    ) -> Result<ChatMessage, HubError> {
        let index = self.history.resolve(message_id).map_err(|failure| match failure {
            LookupFailure::NotFound => HubError::MessageNotFound {
                room_id: self.room_id.clone(),
                message_id: message_id.to_string(),
            },
            LookupFailure::Ambiguous => HubError::AmbiguousMessageId {
                room_id: self.room_id.clone(),
                message_id: message_id.to_string(),
            },
        })?;

        let sender_id = self
            .history
            .get(index)
            .map(|m| m.sender_id.clone())
            .ok_or_else(|| HubError::Internal("resolved index out of range".to_string()))?;

        let deleted_by = match requester {
            DeleteRequester::Participant(requester_id) => {
                if !self.roster.may_delete(requester_id, &sender_id) {
                    return Err(HubError::DeleteUnauthorized {
                        room_id: self.room_id.clone(),
                        message_id: message_id.to_string(),
                        requester_id: requester_id.clone(),
                    });
                }
                Some(requester_id.clone())
            }
            DeleteRequester::Administrator(user_id) => user_id.clone(),
        };

        let message = self
            .history
            .get_mut(index)
            .ok_or_else(|| HubError::Internal("resolved index out of range".to_string()))?;
        message.redact(deleted_by);
        Ok(message.clone())
    }

    // ------------------------------------------------------------------
    // Voice call
    // ------------------------------------------------------------------

    /// Start a call or merge into the active one.
    ///
    /// A fresh call opens a new invitation round.
    pub fn start_call(
        &mut self,
        user_id: &str,
        display_name: &str,
        connection_id: Option<ConnectionId>,
    ) -> StartOutcome {
        let outcome = self.call.start(user_id, display_name, connection_id);
        if matches!(outcome, StartOutcome::Started { .. }) {
            self.invitations.begin_round(user_id, display_name);
        }
        outcome
    }

    /// Join the call after accepting an invitation from `caller_id`.
    ///
    /// An accept that creates the call opens a round on the caller's behalf.
    pub fn accept_call(
        &mut self,
        caller_id: &str,
        user_id: &str,
        display_name: &str,
        connection_id: Option<ConnectionId>,
    ) -> JoinOutcome {
        let outcome = self.call.join(caller_id, user_id, display_name, connection_id);
        if outcome == JoinOutcome::Created {
            let caller_name = self
                .roster
                .get(caller_id)
                .map_or_else(|| caller_id.to_string(), |p| p.display_name.clone());
            self.invitations.begin_round(caller_id, &caller_name);
        }
        self.invitations
            .record_response(user_id, InvitationResponse::Accepted);
        outcome
    }

    pub fn reject_call(&mut self, user_id: &str) {
        self.invitations
            .record_response(user_id, InvitationResponse::Rejected);
    }

    /// Remove a user from the call. The invitation round closes with the call.
    pub fn leave_call(&mut self, user_id: &str) -> LeaveOutcome {
        let outcome = self.call.leave(user_id);
        if matches!(outcome, LeaveOutcome::Ended { .. }) {
            self.invitations.clear();
        }
        outcome
    }

    pub fn end_call(&mut self) -> EndOutcome {
        self.invitations.clear();
        self.call.end()
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    #[must_use]
    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            id: self.room_id.clone(),
            name: self.name.clone(),
            participant_count: self.roster.len(),
            has_active_call: self.call.is_active(),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            id: self.room_id.clone(),
            name: self.name.clone(),
            created_at: self.created_at,
            participants: self.roster.to_vec(),
            messages: self.history.to_vec(),
        }
    }

    #[must_use]
    pub fn call_info(&self) -> CallInfo {
        match self.call.active() {
            Some(call) => CallInfo {
                active: true,
                participants: Some(call.participants.len()),
                started_at: Some(call.started_at),
                started_by: Some(call.started_by.clone()),
            },
            None => CallInfo {
                active: false,
                participants: None,
                started_at: None,
                started_by: None,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use history::HISTORY_CAPACITY;
    use message::REDACTED_CONTENT;
    use roster::Role;

    fn room_with_creator() -> RoomState {
        let mut room = RoomState::new("r1", None);
        room.roster_mut().seed(Participant {
            user_id: "owner".to_string(),
            display_name: "Owner".to_string(),
            role: Role::Creator,
            active: true,
        });
        room
    }

    #[test]
    fn test_default_name() {
        let room = RoomState::new("r1", None);
        assert_eq!(room.name(), "Chat r1");
        assert_eq!(RoomState::new("r2", Some("Team".to_string())).name(), "Team");
    }

    #[test]
    fn test_join_records_system_message() {
        let mut room = RoomState::new("r1", None);
        let (participant, notice) = room.join("u1", "u1");

        assert!(participant.active);
        assert_eq!(participant.role, Role::Member);
        assert_eq!(notice.kind, MessageKind::System);
        assert_eq!(notice.content, "u1 has joined the chat");
        assert_eq!(room.history().len(), 1);
    }

    #[test]
    fn test_disconnect_of_stranger_is_noop() {
        let mut room = RoomState::new("r1", None);
        assert!(room.disconnect("ghost", "Ghost").is_none());
        assert!(room.history().is_empty());
    }

    #[test]
    fn test_history_never_exceeds_cap() {
        let mut room = RoomState::new("r1", None);
        let first = room.append("u1", "A", "first", MessageKind::Text);
        for i in 0..HISTORY_CAPACITY {
            room.append("u1", "A", &format!("m{i}"), MessageKind::Text);
        }
        assert_eq!(room.history().len(), HISTORY_CAPACITY);
        assert!(room.history().iter().all(|m| m.id != first.id));
    }

    #[test]
    fn test_delete_by_sender_keeps_position() {
        let mut room = RoomState::new("r1", None);
        room.join("u1", "Alice");
        let msg = room.append("u1", "Alice", "oops", MessageKind::Text);
        room.append("u1", "Alice", "after", MessageKind::Text);
        let len_before = room.history().len();

        let deleted = room
            .delete_message(&DeleteRequester::Participant("u1".to_string()), &msg.id)
            .unwrap();

        assert_eq!(deleted.id, msg.id);
        assert!(deleted.deleted);
        assert_eq!(deleted.content, REDACTED_CONTENT);
        assert_eq!(room.history().len(), len_before);
        assert_eq!(room.history().get(1).unwrap().id, msg.id);
    }

    #[test]
    fn test_delete_unauthorized_leaves_message_untouched() {
        let mut room = room_with_creator();
        room.join("u2", "Bob");
        room.join("u3", "Cy");
        let msg = room.append("u2", "Bob", "mine", MessageKind::Text);

        let err = room
            .delete_message(&DeleteRequester::Participant("u3".to_string()), &msg.id)
            .unwrap_err();
        assert!(matches!(err, HubError::DeleteUnauthorized { .. }));

        let stored = room.history().iter().find(|m| m.id == msg.id).unwrap();
        assert!(!stored.deleted);
        assert_eq!(stored.content, "mine");

        // the creator may moderate
        room.delete_message(&DeleteRequester::Participant("owner".to_string()), &msg.id)
            .unwrap();
    }

    #[test]
    fn test_delete_lookup_failures() {
        let mut room = RoomState::new("r1", None);
        room.append("u1", "A", "one", MessageKind::Text);
        room.append("u1", "A", "two", MessageKind::Text);

        let admin = DeleteRequester::Administrator(None);
        assert!(matches!(
            room.delete_message(&admin, "does-not-exist"),
            Err(HubError::MessageNotFound { .. })
        ));
        // every id contains "msg_"
        assert!(matches!(
            room.delete_message(&admin, "msg_"),
            Err(HubError::AmbiguousMessageId { .. })
        ));
    }

    #[test]
    fn test_delete_by_truncated_id() {
        let mut room = RoomState::new("r1", None);
        let msg = room.append("u1", "A", "x", MessageKind::Text);
        let suffix = &msg.id[msg.id.len() - 12..];

        let deleted = room
            .delete_message(&DeleteRequester::Administrator(Some("ops".to_string())), suffix)
            .unwrap();
        assert_eq!(deleted.id, msg.id, "canonical id is reported");
        assert_eq!(deleted.deleted_by.as_deref(), Some("ops"));
    }

    #[test]
    fn test_call_start_resets_invitations_and_end_clears() {
        let mut room = RoomState::new("r1", None);
        room.start_call("u1", "Alice", None);
        room.invitations_mut()
            .record_invited("u2", ConnectionId::new());
        assert!(!room.invitations().is_eligible("u2"));

        assert!(matches!(room.end_call(), EndOutcome::Ended(_)));
        assert!(room.invitations().round().is_none());

        room.start_call("u1", "Alice", None);
        assert!(room.invitations().is_eligible("u2"));
    }

    #[test]
    fn test_last_leave_clears_invitations() {
        let mut room = RoomState::new("r1", None);
        room.start_call("u1", "Alice", None);
        assert!(matches!(room.leave_call("u1"), LeaveOutcome::Ended { .. }));
        assert!(room.invitations().round().is_none());
        assert!(!room.call_info().active);
    }

    #[test]
    fn test_accept_records_response() {
        let mut room = RoomState::new("r1", None);
        room.start_call("caller", "Caller", None);
        assert_eq!(
            room.accept_call("caller", "u2", "Bob", None),
            JoinOutcome::Joined
        );
        assert_eq!(
            room.invitations().round().unwrap().response("u2"),
            Some(InvitationResponse::Accepted)
        );
        assert_eq!(room.call_info().participants, Some(2));
    }

    #[test]
    fn test_accept_without_call_opens_round() {
        let mut room = RoomState::new("r1", None);
        room.join("caller", "Caller");
        assert_eq!(
            room.accept_call("caller", "u2", "Bob", None),
            JoinOutcome::Created
        );

        let round = room.invitations().round().unwrap();
        assert_eq!(round.caller_name, "Caller");
        assert_eq!(round.response("u2"), Some(InvitationResponse::Accepted));
        assert!(!room.invitations().is_eligible("u2"));
        assert_eq!(room.call_info().started_by.as_deref(), Some("caller"));
    }

    #[test]
    fn test_summary() {
        let mut room = RoomState::new("r1", Some("General".to_string()));
        room.join("u1", "A");
        room.start_call("u1", "A", None);
        assert_eq!(
            room.summary(),
            RoomSummary {
                id: "r1".to_string(),
                name: "General".to_string(),
                participant_count: 1,
                has_active_call: true,
            }
        );
    }
}

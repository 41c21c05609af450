//! Invitation tracking for a room's voice call.
//!
//! While a round is open, each participant is invited at most once and a
//! participant who already answered is never re-invited. The round is
//! reset whenever a call starts or ends.

use chrono::{DateTime, Utc};
use common::types::ConnectionId;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationResponse {
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invitation {
    pub invited_at: DateTime<Utc>,
    pub connection_id: ConnectionId,
}

#[derive(Debug, Clone)]
pub struct InvitationRound {
    pub caller_id: String,
    pub caller_name: String,
    invited: HashMap<String, Invitation>,
    responded: HashMap<String, InvitationResponse>,
}

impl InvitationRound {
    fn new(caller_id: &str, caller_name: &str) -> Self {
        Self {
            caller_id: caller_id.to_string(),
            caller_name: caller_name.to_string(),
            invited: HashMap::new(),
            responded: HashMap::new(),
        }
    }

    #[must_use]
    pub fn invitation(&self, user_id: &str) -> Option<&Invitation> {
        self.invited.get(user_id)
    }

    #[must_use]
    pub fn response(&self, user_id: &str) -> Option<InvitationResponse> {
        self.responded.get(user_id).copied()
    }
}

#[derive(Debug, Clone, Default)]
pub struct InvitationTracker {
    round: Option<InvitationRound>,
}

impl InvitationTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a fresh round, discarding any previous one.
    pub fn begin_round(&mut self, caller_id: &str, caller_name: &str) {
        self.round = Some(InvitationRound::new(caller_id, caller_name));
    }

    /// Open a round only if none is outstanding.
    pub fn ensure_round(&mut self, caller_id: &str, caller_name: &str) {
        if self.round.is_none() {
            self.begin_round(caller_id, caller_name);
        }
    }

    /// False if `user_id` was already invited or already answered.
    #[must_use]
    pub fn is_eligible(&self, user_id: &str) -> bool {
        self.round.as_ref().map_or(true, |round| {
            !round.invited.contains_key(user_id) && !round.responded.contains_key(user_id)
        })
    }

    /// Record an invitation. Ignored when no round is open.
    pub fn record_invited(&mut self, user_id: &str, connection_id: ConnectionId) {
        if let Some(round) = &mut self.round {
            round.invited.insert(
                user_id.to_string(),
                Invitation {
                    invited_at: Utc::now(),
                    connection_id,
                },
            );
        }
    }

    /// Record an answer. Ignored when no round is open.
    pub fn record_response(&mut self, user_id: &str, response: InvitationResponse) {
        if let Some(round) = &mut self.round {
            round.responded.insert(user_id.to_string(), response);
        }
    }

    pub fn clear(&mut self) {
        self.round = None;
    }

    #[must_use]
    pub fn round(&self) -> Option<&InvitationRound> {
        self.round.as_ref()
    }
}

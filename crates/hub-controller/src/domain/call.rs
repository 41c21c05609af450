//! Voice call state machine for one room.
//!
//! ```text
//!            start / accept
//!   NoCall ─────────────────▶ Active
//!     ▲                          │
//!     └──── end, or last leave ──┘
//! ```
//!
//! A second `start` while `Active` merges the caller into the existing
//! call, so a room never holds more than one call record.

use chrono::{DateTime, Utc};
use common::types::ConnectionId;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallParticipant {
    pub user_id: String,
    pub display_name: String,
    pub joined_at: DateTime<Utc>,
    /// Connection subscribed to the call group. `None` for calls started
    /// over HTTP, which have no live connection.
    pub connection_id: Option<ConnectionId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceCall {
    pub started_at: DateTime<Utc>,
    pub started_by: String,
    pub participants: BTreeMap<String, CallParticipant>,
}

/// Result of [`CallSession::start`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// `NoCall -> Active`; the caller is the only participant.
    Started { started_at: DateTime<Utc> },
    /// A call was already active; the caller was merged in.
    Merged { participant_count: usize },
}

/// Result of [`CallSession::join`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// No call existed; one was created for this join.
    Created,
    Joined,
}

/// Result of [`CallSession::leave`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// No active call, or the user was not in it.
    NotInCall,
    /// The user left; others remain.
    Left {
        participant: CallParticipant,
        remaining: usize,
    },
    /// The user was the last participant; the call is gone.
    Ended { participant: CallParticipant },
}

/// Result of [`CallSession::end`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndOutcome {
    Ended(VoiceCall),
    AlreadyIdle,
}

#[derive(Debug, Clone, Default)]
pub struct CallSession {
    active: Option<VoiceCall>,
}

impl CallSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn active(&self) -> Option<&VoiceCall> {
        self.active.as_ref()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Start a call, or merge the caller into the one already running.
    pub fn start(
        &mut self,
        user_id: &str,
        display_name: &str,
        connection_id: Option<ConnectionId>,
    ) -> StartOutcome {
        let now = Utc::now();
        let participant = CallParticipant {
            user_id: user_id.to_string(),
            display_name: display_name.to_string(),
            joined_at: now,
            connection_id,
        };

        match &mut self.active {
            Some(call) => {
                call.participants.insert(user_id.to_string(), participant);
                StartOutcome::Merged {
                    participant_count: call.participants.len(),
                }
            }
            None => {
                self.active = Some(VoiceCall {
                    started_at: now,
                    started_by: user_id.to_string(),
                    participants: BTreeMap::from([(user_id.to_string(), participant)]),
                });
                StartOutcome::Started { started_at: now }
            }
        }
    }

    /// Add a participant who accepted an invitation.
    ///
    /// If no call exists one is created, attributed to `caller_id`.
    pub fn join(
        &mut self,
        caller_id: &str,
        user_id: &str,
        display_name: &str,
        connection_id: Option<ConnectionId>,
    ) -> JoinOutcome {
        let now = Utc::now();
        let outcome = if self.active.is_some() {
            JoinOutcome::Joined
        } else {
            JoinOutcome::Created
        };

        let call = self.active.get_or_insert_with(|| VoiceCall {
            started_at: now,
            started_by: caller_id.to_string(),
            participants: BTreeMap::new(),
        });
        call.participants.insert(
            user_id.to_string(),
            CallParticipant {
                user_id: user_id.to_string(),
                display_name: display_name.to_string(),
                joined_at: now,
                connection_id,
            },
        );

        outcome
    }

    /// Remove a participant, ending the call if nobody is left.
    pub fn leave(&mut self, user_id: &str) -> LeaveOutcome {
        let Some(call) = &mut self.active else {
            return LeaveOutcome::NotInCall;
        };
        let Some(participant) = call.participants.remove(user_id) else {
            return LeaveOutcome::NotInCall;
        };

        if call.participants.is_empty() {
            self.active = None;
            LeaveOutcome::Ended { participant }
        } else {
            LeaveOutcome::Left {
                participant,
                remaining: call.participants.len(),
            }
        }
    }

    /// End the call unconditionally.
    pub fn end(&mut self) -> EndOutcome {
        match self.active.take() {
            Some(call) => EndOutcome::Ended(call),
            None => EndOutcome::AlreadyIdle,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_start_then_merge_keeps_one_call() {
        let mut call = CallSession::new();
        assert!(matches!(
            call.start("u1", "Alice", None),
            StartOutcome::Started { .. }
        ));
        let started_at = call.active().unwrap().started_at;

        assert_eq!(
            call.start("u2", "Bob", None),
            StartOutcome::Merged {
                participant_count: 2
            }
        );

        let active = call.active().unwrap();
        assert_eq!(active.started_by, "u1");
        assert_eq!(active.started_at, started_at, "merge must not restart the call");
        assert_eq!(active.participants.len(), 2);
    }

    #[test]
    fn test_repeated_start_by_same_user_is_idempotent() {
        let mut call = CallSession::new();
        call.start("u1", "Alice", None);
        assert_eq!(
            call.start("u1", "Alice", None),
            StartOutcome::Merged {
                participant_count: 1
            }
        );
    }

    #[test]
    fn test_join_creates_call_attributed_to_caller() {
        let mut call = CallSession::new();
        assert_eq!(call.join("caller", "u2", "Bob", None), JoinOutcome::Created);

        let active = call.active().unwrap();
        assert_eq!(active.started_by, "caller");
        assert!(active.participants.contains_key("u2"));
        assert!(!active.participants.contains_key("caller"));

        assert_eq!(call.join("caller", "u3", "Cy", None), JoinOutcome::Joined);
    }

    #[test]
    fn test_leave_last_participant_ends_call() {
        let mut call = CallSession::new();
        call.start("u1", "Alice", None);
        call.start("u2", "Bob", None);

        assert!(matches!(
            call.leave("u2"),
            LeaveOutcome::Left { remaining: 1, .. }
        ));
        assert!(call.is_active());

        assert!(matches!(call.leave("u1"), LeaveOutcome::Ended { .. }));
        assert!(!call.is_active());

        assert_eq!(call.leave("u1"), LeaveOutcome::NotInCall);
    }

    #[test]
    fn test_leave_non_participant() {
        let mut call = CallSession::new();
        call.start("u1", "Alice", None);
        assert_eq!(call.leave("u9"), LeaveOutcome::NotInCall);
        assert!(call.is_active());
    }

    #[test]
    fn test_end_is_idempotent() {
        let mut call = CallSession::new();
        call.start("u1", "Alice", None);
        assert!(matches!(call.end(), EndOutcome::Ended(_)));
        assert_eq!(call.end(), EndOutcome::AlreadyIdle);
    }
}

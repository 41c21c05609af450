//! Room membership roster.
//!
//! A participant record outlives the user's presence: leaving or
//! disconnecting only clears `active`, so role and name stay available
//! for history attribution and delete authorization.

use serde::Serialize;
use std::collections::BTreeMap;

/// Participant role within a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Creator,
    Member,
    Admin,
}

impl Role {
    /// Whether this role may delete messages sent by others.
    #[must_use]
    pub const fn may_moderate(&self) -> bool {
        matches!(self, Role::Creator | Role::Admin)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub user_id: String,
    pub display_name: String,
    pub role: Role,
    pub active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Roster {
    participants: BTreeMap<String, Participant>,
}

impl Roster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a participant record, replacing any existing one.
    pub fn seed(&mut self, participant: Participant) {
        self.participants
            .insert(participant.user_id.clone(), participant);
    }

    /// Mark `user_id` active, creating a `Member` record on first join.
    ///
    /// An existing record keeps its role and display name.
    pub fn activate(&mut self, user_id: &str, display_name: &str) -> Participant {
        let participant = self
            .participants
            .entry(user_id.to_string())
            .or_insert_with(|| Participant {
                user_id: user_id.to_string(),
                display_name: display_name.to_string(),
                role: Role::Member,
                active: false,
            });
        participant.active = true;
        participant.clone()
    }

    /// Clear the active flag. Returns false if the user was never a participant.
    pub fn deactivate(&mut self, user_id: &str) -> bool {
        match self.participants.get_mut(user_id) {
            Some(participant) => {
                participant.active = false;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn get(&self, user_id: &str) -> Option<&Participant> {
        self.participants.get(user_id)
    }

    /// Whether `requester_id` may delete a message sent by `sender_id`.
    #[must_use]
    pub fn may_delete(&self, requester_id: &str, sender_id: &str) -> bool {
        requester_id == sender_id
            || self
                .participants
                .get(requester_id)
                .is_some_and(|p| p.role.may_moderate())
    }

    /// Ids of active participants other than `exclude`.
    #[must_use]
    pub fn active_ids_except(&self, exclude: &str) -> Vec<String> {
        self.participants
            .values()
            .filter(|p| p.active && p.user_id != exclude)
            .map(|p| p.user_id.clone())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<Participant> {
        self.participants.values().cloned().collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn creator(user_id: &str) -> Participant {
        Participant {
            user_id: user_id.to_string(),
            display_name: format!("User {user_id}"),
            role: Role::Creator,
            active: true,
        }
    }

    #[test]
    fn test_activate_creates_member_then_reactivates() {
        let mut roster = Roster::new();
        let p = roster.activate("u1", "Alice");
        assert_eq!(p.role, Role::Member);
        assert!(p.active);

        assert!(roster.deactivate("u1"));
        assert!(!roster.get("u1").unwrap().active);

        let p = roster.activate("u1", "Renamed");
        assert!(p.active);
        assert_eq!(p.display_name, "Alice", "existing record keeps its name");
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_activate_preserves_creator_role() {
        let mut roster = Roster::new();
        roster.seed(creator("u1"));
        roster.deactivate("u1");
        assert_eq!(roster.activate("u1", "Alice").role, Role::Creator);
    }

    #[test]
    fn test_deactivate_unknown_user() {
        let mut roster = Roster::new();
        assert!(!roster.deactivate("ghost"));
    }

    #[test]
    fn test_may_delete() {
        let mut roster = Roster::new();
        roster.seed(creator("owner"));
        roster.activate("u2", "Bob");
        roster.seed(Participant {
            user_id: "mod".to_string(),
            display_name: "Mod".to_string(),
            role: Role::Admin,
            active: false,
        });

        assert!(roster.may_delete("u2", "u2"), "sender may delete own message");
        assert!(roster.may_delete("owner", "u2"));
        assert!(roster.may_delete("mod", "u2"), "inactive admin keeps the role");
        assert!(!roster.may_delete("u2", "owner"));
        assert!(!roster.may_delete("stranger", "u2"));
    }

    #[test]
    fn test_active_ids_except() {
        let mut roster = Roster::new();
        roster.activate("u1", "A");
        roster.activate("u2", "B");
        roster.activate("u3", "C");
        roster.deactivate("u3");

        assert_eq!(roster.active_ids_except("u1"), vec!["u2".to_string()]);
    }
}

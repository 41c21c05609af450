//! Test data fixtures for hub testing.

use serde_json::{json, Value};
use uuid::Uuid;

/// Test user fixture.
#[derive(Debug, Clone)]
pub struct TestUser {
    /// User ID.
    pub id: String,
    /// Display name.
    pub name: String,
}

impl TestUser {
    /// Create a test user with a random ID and the given display name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: format!("user-{}", Uuid::new_v4().simple()),
            name: name.into(),
        }
    }

    /// Set an explicit ID (for reproducible tests).
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// `authenticate` payload for this user.
    #[must_use]
    pub fn payload(&self) -> Value {
        json!({ "userId": self.id, "userName": self.name })
    }
}

/// Test room fixture.
#[derive(Debug, Clone)]
pub struct TestRoom {
    /// Room ID.
    pub id: String,
}

impl TestRoom {
    /// Create a test room with the given ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// Create a test room with a random ID.
    #[must_use]
    pub fn random() -> Self {
        Self::new(format!("room-{}", Uuid::new_v4().simple()))
    }

    /// `join_room` payload for `user`.
    #[must_use]
    pub fn join_payload(&self, user: &TestUser) -> Value {
        json!({ "roomId": self.id, "userId": user.id, "userName": user.name })
    }

    /// Payload carrying only this room's ID.
    #[must_use]
    pub fn payload(&self) -> Value {
        json!({ "roomId": self.id })
    }

    /// Payload carrying this room's ID merged with `fields`.
    #[must_use]
    pub fn payload_with(&self, fields: Value) -> Value {
        let mut payload = self.payload();
        if let (Some(target), Value::Object(extra)) = (payload.as_object_mut(), fields) {
            target.extend(extra);
        }
        payload
    }
}

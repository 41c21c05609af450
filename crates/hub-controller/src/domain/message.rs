//! Chat message records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sender id used for hub-generated messages.
pub const SYSTEM_SENDER_ID: &str = "system";

/// Sender name used for hub-generated messages.
pub const SYSTEM_SENDER_NAME: &str = "System";

/// Content that replaces a message body once it is deleted.
pub const REDACTED_CONTENT: &str = "[message deleted]";

/// Kind of a chat message.
///
/// Clients may send kinds the hub does not know about; those are carried
/// through unchanged as [`MessageKind::Other`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageKind {
    #[default]
    Text,
    System,
    Image,
    Other(String),
}

impl From<String> for MessageKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "text" => MessageKind::Text,
            "system" => MessageKind::System,
            "image" => MessageKind::Image,
            _ => MessageKind::Other(value),
        }
    }
}

impl From<MessageKind> for String {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Text => "text".to_string(),
            MessageKind::System => "system".to_string(),
            MessageKind::Image => "image".to_string(),
            MessageKind::Other(other) => other,
        }
    }
}

/// One entry in a room's history.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub room_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ChatMessage {
    /// Create a message with a fresh id, stamped now.
    #[must_use]
    pub fn new(
        room_id: impl Into<String>,
        sender_id: impl Into<String>,
        sender_name: impl Into<String>,
        content: impl Into<String>,
        kind: MessageKind,
    ) -> Self {
        Self {
            id: format!("msg_{}", uuid::Uuid::new_v4().simple()),
            room_id: room_id.into(),
            sender_id: sender_id.into(),
            sender_name: sender_name.into(),
            content: content.into(),
            kind,
            timestamp: Utc::now(),
            deleted: false,
            deleted_by: None,
            deleted_at: None,
        }
    }

    /// Create a hub-generated system message.
    #[must_use]
    pub fn system(room_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(
            room_id,
            SYSTEM_SENDER_ID,
            SYSTEM_SENDER_NAME,
            content,
            MessageKind::System,
        )
    }

    /// Soft-delete in place. Position in history is untouched.
    pub fn redact(&mut self, deleted_by: Option<String>) {
        self.content = REDACTED_CONTENT.to_string();
        self.deleted = true;
        self.deleted_by = deleted_by;
        self.deleted_at = Some(Utc::now());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_unknown_values() {
        let kind: MessageKind = "sticker".to_string().into();
        assert_eq!(kind, MessageKind::Other("sticker".to_string()));
        assert_eq!(String::from(kind), "sticker");
        assert_eq!(MessageKind::from("image".to_string()), MessageKind::Image);
    }

    #[test]
    fn test_serialized_shape() {
        let msg = ChatMessage::new("r1", "u1", "Alice", "hi", MessageKind::Text);
        let json = serde_json::to_value(&msg).unwrap();

        assert!(json["id"].as_str().unwrap().starts_with("msg_"));
        assert_eq!(json["roomId"], "r1");
        assert_eq!(json["senderId"], "u1");
        assert_eq!(json["senderName"], "Alice");
        assert_eq!(json["type"], "text");
        assert!(json.get("deleted").is_none());
        assert!(json.get("deletedBy").is_none());
    }

    #[test]
    fn test_redact() {
        let mut msg = ChatMessage::new("r1", "u1", "Alice", "secret", MessageKind::Text);
        let id = msg.id.clone();
        msg.redact(Some("u1".to_string()));

        assert_eq!(msg.id, id);
        assert_eq!(msg.content, REDACTED_CONTENT);
        assert!(msg.deleted);
        assert_eq!(msg.deleted_by.as_deref(), Some("u1"));
        assert!(msg.deleted_at.is_some());

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["deleted"], true);
    }

    #[test]
    fn test_system_message() {
        let msg = ChatMessage::system("r1", "Alice has joined the chat");
        assert_eq!(msg.sender_id, SYSTEM_SENDER_ID);
        assert_eq!(msg.sender_name, SYSTEM_SENDER_NAME);
        assert_eq!(msg.kind, MessageKind::System);
    }
}

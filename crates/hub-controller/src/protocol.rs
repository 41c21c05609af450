//! Real-time wire protocol.
//!
//! Every WebSocket text frame, in either direction, is a JSON object
//! `{"event": "<name>", "data": {...}}` with camelCase fields in `data`.
//!
//! Inbound frames are parsed into the closed [`ClientEvent`] set. Payload
//! fields are optional wherever the hub has a sensible default; the session
//! layer applies those defaults. Outbound frames are [`ServerEvent`]s.

use crate::domain::message::ChatMessage;
use crate::errors::HubError;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Outbound
// ============================================================================

/// Event pushed from the hub to a client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    Authenticated(UserRef),
    UserJoined(MembershipEvent),
    UserLeft(MembershipEvent),
    UserTyping(TypingEvent),
    Message(ChatMessage),
    MessageDeleted(MessageDeletedEvent),
    RoomCreated(RoomCreatedEvent),
    VoiceCallActive(CallActiveEvent),
    VoiceCallStarted(CallerEvent),
    VoiceUserJoined(CallMemberEvent),
    VoiceUserLeft(CallMemberEvent),
    VoiceCallInvite(CallerEvent),
    VoiceCallOffer(OfferEvent),
    VoiceCallJoined(CallMemberEvent),
    VoiceCallAccepted(CallMemberEvent),
    VoiceCallRejected(CallMemberEvent),
    VoiceIceCandidate(IceCandidateEvent),
    VoiceAudioChunk(AudioChunkEvent),
    VoiceCallEnd(CallEndEvent),
    Error(ErrorEvent),
}

impl ServerEvent {
    /// Wire name of the event, for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            ServerEvent::Authenticated(_) => "authenticated",
            ServerEvent::UserJoined(_) => "user_joined",
            ServerEvent::UserLeft(_) => "user_left",
            ServerEvent::UserTyping(_) => "user_typing",
            ServerEvent::Message(_) => "message",
            ServerEvent::MessageDeleted(_) => "message_deleted",
            ServerEvent::RoomCreated(_) => "room_created",
            ServerEvent::VoiceCallActive(_) => "voice_call_active",
            ServerEvent::VoiceCallStarted(_) => "voice_call_started",
            ServerEvent::VoiceUserJoined(_) => "voice_user_joined",
            ServerEvent::VoiceUserLeft(_) => "voice_user_left",
            ServerEvent::VoiceCallInvite(_) => "voice_call_invite",
            ServerEvent::VoiceCallOffer(_) => "voice_call_offer",
            ServerEvent::VoiceCallJoined(_) => "voice_call_joined",
            ServerEvent::VoiceCallAccepted(_) => "voice_call_accepted",
            ServerEvent::VoiceCallRejected(_) => "voice_call_rejected",
            ServerEvent::VoiceIceCandidate(_) => "voice_ice_candidate",
            ServerEvent::VoiceAudioChunk(_) => "voice_audio_chunk",
            ServerEvent::VoiceCallEnd(_) => "voice_call_end",
            ServerEvent::Error(_) => "error",
        }
    }

    /// Build the `error` event reported to the originating connection.
    #[must_use]
    pub fn from_error(err: &HubError) -> Self {
        ServerEvent::Error(ErrorEvent {
            kind: err.error_type().to_string(),
            message: err.client_message(),
            room_id: err.room_id().map(str::to_string),
            message_id: err.message_id().map(str::to_string),
            user_id: err.user_id().map(str::to_string),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub user_id: String,
    pub user_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipEvent {
    pub room_id: String,
    pub user_id: String,
    pub user_name: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingEvent {
    pub room_id: String,
    pub user_id: String,
    pub user_name: String,
    pub is_typing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDeletedEvent {
    pub room_id: String,
    /// Canonical id, even when the request used a truncated one.
    pub message_id: String,
    pub deleted_by: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomCreatedEvent {
    pub room_id: String,
    pub name: String,
    pub creator: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallActiveEvent {
    pub room_id: String,
    pub started_by: String,
    pub started_at: DateTime<Utc>,
    pub participants: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerEvent {
    pub room_id: String,
    pub caller_id: String,
    pub caller_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallMemberEvent {
    pub room_id: String,
    pub user_id: String,
    pub user_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferEvent {
    pub room_id: String,
    pub caller_id: String,
    pub caller_name: String,
    pub target_user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdp: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidateEvent {
    pub room_id: String,
    pub sender_id: String,
    pub target_user_id: String,
    pub candidate: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioChunkEvent {
    pub room_id: String,
    pub user_id: String,
    pub user_name: String,
    pub audio_chunk: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallEndEvent {
    pub room_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Call-end reason sent when the last participant leaves.
pub const END_REASON_NO_PARTICIPANTS: &str = "no_participants";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

// ============================================================================
// Inbound
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawFrame {
    event: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AuthenticatePayload {
    pub user_id: Option<String>,
    pub user_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RoomPayload {
    pub room_id: Option<String>,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SendMessagePayload {
    pub room_id: Option<String>,
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TypingPayload {
    pub room_id: Option<String>,
    pub is_typing: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeleteMessagePayload {
    pub room_id: Option<String>,
    pub message_id: Option<String>,
}

/// `voice_call_start` uses `userId/userName`, `voice_call_started`
/// uses `callerId/callerName`; both land here. The `user*` fields win when
/// a frame carries both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CallStartPayload {
    pub room_id: Option<String>,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub caller_id: Option<String>,
    pub caller_name: Option<String>,
}

impl CallStartPayload {
    #[must_use]
    pub fn claimed_id(&self) -> Option<String> {
        self.user_id.clone().or_else(|| self.caller_id.clone())
    }

    #[must_use]
    pub fn claimed_name(&self) -> Option<String> {
        self.user_name.clone().or_else(|| self.caller_name.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CallerPayload {
    pub room_id: Option<String>,
    pub caller_id: Option<String>,
    pub caller_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OfferPayload {
    pub room_id: Option<String>,
    pub target_user_id: Option<String>,
    pub caller_id: Option<String>,
    pub caller_name: Option<String>,
    pub sdp: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CallResponsePayload {
    pub room_id: Option<String>,
    pub caller_id: Option<String>,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IceCandidatePayload {
    pub room_id: Option<String>,
    pub target_user_id: Option<String>,
    pub sender_id: Option<String>,
    pub candidate: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AudioChunkPayload {
    pub room_id: Option<String>,
    pub audio_chunk: Option<Value>,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
}

/// Event sent by a client.
///
/// Socket close is handled by the transport and has no frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Authenticate(AuthenticatePayload),
    JoinRoom(RoomPayload),
    LeaveRoom(RoomPayload),
    SendMessage(SendMessagePayload),
    Typing(TypingPayload),
    DeleteMessage(DeleteMessagePayload),
    StartCall(CallStartPayload),
    InviteAll(CallerPayload),
    RoomCall(CallerPayload),
    Offer(OfferPayload),
    Accept(CallResponsePayload),
    Reject(CallResponsePayload),
    IceCandidate(IceCandidatePayload),
    AudioChunk(AudioChunkPayload),
    EndCall(RoomPayload),
}

impl ClientEvent {
    /// Parse one text frame.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEvent` if the frame is not JSON, names an unknown
    /// event, or carries a payload of the wrong shape.
    pub fn from_frame(text: &str) -> Result<Self, HubError> {
        let raw: RawFrame = serde_json::from_str(text)
            .map_err(|e| HubError::InvalidEvent(format!("malformed frame: {e}")))?;

        let data = if raw.data.is_null() {
            Value::Object(serde_json::Map::new())
        } else {
            raw.data
        };

        let event = match raw.event.as_str() {
            "authenticate" => ClientEvent::Authenticate(payload(&raw.event, data)?),
            "join_room" => ClientEvent::JoinRoom(payload(&raw.event, data)?),
            "leave_room" => ClientEvent::LeaveRoom(payload(&raw.event, data)?),
            "send_message" => ClientEvent::SendMessage(payload(&raw.event, data)?),
            "typing" => ClientEvent::Typing(payload(&raw.event, data)?),
            "message_deleted" => ClientEvent::DeleteMessage(payload(&raw.event, data)?),
            "voice_call_start" | "voice_call_started" => {
                ClientEvent::StartCall(payload(&raw.event, data)?)
            }
            "voice_call_invite_all" => ClientEvent::InviteAll(payload(&raw.event, data)?),
            "voice_room_call" => ClientEvent::RoomCall(payload(&raw.event, data)?),
            "voice_call_offer" => ClientEvent::Offer(payload(&raw.event, data)?),
            "voice_call_accept" => ClientEvent::Accept(payload(&raw.event, data)?),
            "voice_call_reject" => ClientEvent::Reject(payload(&raw.event, data)?),
            "voice_ice_candidate" => ClientEvent::IceCandidate(payload(&raw.event, data)?),
            "voice_audio_chunk" => ClientEvent::AudioChunk(payload(&raw.event, data)?),
            "voice_call_end" => ClientEvent::EndCall(payload(&raw.event, data)?),
            other => {
                return Err(HubError::InvalidEvent(format!("unknown event: {other}")));
            }
        };

        Ok(event)
    }

    /// Metric label for this event.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            ClientEvent::Authenticate(_) => "authenticate",
            ClientEvent::JoinRoom(_) => "join_room",
            ClientEvent::LeaveRoom(_) => "leave_room",
            ClientEvent::SendMessage(_) => "send_message",
            ClientEvent::Typing(_) => "typing",
            ClientEvent::DeleteMessage(_) => "message_deleted",
            ClientEvent::StartCall(_) => "voice_call_start",
            ClientEvent::InviteAll(_) => "voice_call_invite_all",
            ClientEvent::RoomCall(_) => "voice_room_call",
            ClientEvent::Offer(_) => "voice_call_offer",
            ClientEvent::Accept(_) => "voice_call_accept",
            ClientEvent::Reject(_) => "voice_call_reject",
            ClientEvent::IceCandidate(_) => "voice_ice_candidate",
            ClientEvent::AudioChunk(_) => "voice_audio_chunk",
            ClientEvent::EndCall(_) => "voice_call_end",
        }
    }
}

fn payload<T: DeserializeOwned>(event: &str, data: Value) -> Result<T, HubError> {
    serde_json::from_value(data)
        .map_err(|e| HubError::InvalidEvent(format!("invalid {event} payload: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::domain::message::MessageKind;

    #[test]
    fn test_parse_join_room() {
        let event =
            ClientEvent::from_frame(r#"{"event":"join_room","data":{"roomId":"r1","userId":"u1"}}"#)
                .unwrap();
        assert_eq!(
            event,
            ClientEvent::JoinRoom(RoomPayload {
                room_id: Some("r1".to_string()),
                user_id: Some("u1".to_string()),
                user_name: None,
            })
        );
    }

    #[test]
    fn test_missing_data_is_empty_payload() {
        let event = ClientEvent::from_frame(r#"{"event":"authenticate"}"#).unwrap();
        assert_eq!(event, ClientEvent::Authenticate(AuthenticatePayload::default()));

        let event = ClientEvent::from_frame(r#"{"event":"typing","data":null}"#).unwrap();
        assert_eq!(event, ClientEvent::Typing(TypingPayload::default()));
    }

    #[test]
    fn test_both_start_names_map_to_start_call() {
        let a = ClientEvent::from_frame(
            r#"{"event":"voice_call_start","data":{"roomId":"r1","userId":"u1","userName":"A"}}"#,
        )
        .unwrap();
        let b = ClientEvent::from_frame(
            r#"{"event":"voice_call_started","data":{"roomId":"r1","callerId":"u1","callerName":"A"}}"#,
        )
        .unwrap();
        for event in [a, b] {
            let ClientEvent::StartCall(p) = event else {
                unreachable!("expected call start");
            };
            assert_eq!(p.claimed_id().as_deref(), Some("u1"));
            assert_eq!(p.claimed_name().as_deref(), Some("A"));
        }
    }

    #[test]
    fn test_start_call_tolerates_both_identity_spellings() {
        let event = ClientEvent::from_frame(
            r#"{"event":"voice_call_start","data":{"roomId":"r1","userId":"u1","callerId":"u2","userName":"A","callerName":"B"}}"#,
        )
        .unwrap();
        let ClientEvent::StartCall(p) = event else {
            unreachable!("expected call start");
        };
        assert_eq!(p.room_id.as_deref(), Some("r1"));
        assert_eq!(p.claimed_id().as_deref(), Some("u1"));
        assert_eq!(p.claimed_name().as_deref(), Some("A"));
    }

    #[test]
    fn test_unknown_event_rejected() {
        let err = ClientEvent::from_frame(r#"{"event":"chat_anything","data":{}}"#).unwrap_err();
        assert_eq!(err.error_type(), "invalid_event");

        let err = ClientEvent::from_frame("not json").unwrap_err();
        assert_eq!(err.error_type(), "invalid_event");
    }

    #[test]
    fn test_wrong_payload_shape_rejected() {
        let err =
            ClientEvent::from_frame(r#"{"event":"typing","data":{"isTyping":"yes"}}"#).unwrap_err();
        assert!(matches!(err, HubError::InvalidEvent(_)));
    }

    #[test]
    fn test_opaque_payloads_pass_through() {
        let event = ClientEvent::from_frame(
            r#"{"event":"voice_ice_candidate","data":{"roomId":"r1","targetUserId":"u2","candidate":{"sdpMid":"0"}}}"#,
        )
        .unwrap();
        let ClientEvent::IceCandidate(p) = event else {
            unreachable!("expected ice candidate");
        };
        assert_eq!(p.candidate.unwrap()["sdpMid"], "0");
    }

    #[test]
    fn test_server_event_shape() {
        let msg = ChatMessage::new("r1", "u1", "Alice", "hi", MessageKind::Text);
        let json = serde_json::to_value(ServerEvent::Message(msg)).unwrap();
        assert_eq!(json["event"], "message");
        assert_eq!(json["data"]["content"], "hi");

        let json = serde_json::to_value(ServerEvent::VoiceCallEnd(CallEndEvent {
            room_id: "r1".to_string(),
            user_id: None,
            user_name: None,
            reason: Some(END_REASON_NO_PARTICIPANTS.to_string()),
        }))
        .unwrap();
        assert_eq!(json["event"], "voice_call_end");
        assert_eq!(json["data"]["reason"], "no_participants");
        assert!(json["data"].get("userId").is_none());
    }

    #[test]
    fn test_error_event_from_hub_error() {
        let err = HubError::UserOffline {
            user_id: "u9".to_string(),
        };
        let json = serde_json::to_value(ServerEvent::from_error(&err)).unwrap();
        assert_eq!(json["event"], "error");
        assert_eq!(json["data"]["type"], "user_offline");
        assert_eq!(json["data"]["userId"], "u9");
        assert!(json["data"].get("roomId").is_none());
    }
}

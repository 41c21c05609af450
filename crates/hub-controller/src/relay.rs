//! Point-to-point signaling relay.
//!
//! Offers and ICE candidates are addressed to one user. The relay resolves
//! the target through presence and forwards the payload untouched, tagged
//! with the sender. SDP and candidate contents are never inspected.

use crate::actors::messages::Identity;
use crate::actors::presence::PresenceActorHandle;
use crate::dispatch::to_connection;
use crate::errors::HubError;
use crate::protocol::{IceCandidateEvent, OfferEvent, ServerEvent};

use serde_json::Value;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct SignalingRelay {
    presence: PresenceActorHandle,
}

impl SignalingRelay {
    #[must_use]
    pub fn new(presence: PresenceActorHandle) -> Self {
        Self { presence }
    }

    /// Forward a call offer to `target_user_id`.
    ///
    /// # Errors
    ///
    /// `UserOffline` if the target has no live connection.
    pub async fn relay_offer(
        &self,
        caller: &Identity,
        room_id: &str,
        target_user_id: &str,
        sdp: Option<Value>,
    ) -> Result<(), HubError> {
        let event = ServerEvent::VoiceCallOffer(OfferEvent {
            room_id: room_id.to_string(),
            caller_id: caller.user_id.clone(),
            caller_name: caller.user_name.clone(),
            target_user_id: target_user_id.to_string(),
            sdp,
        });
        self.relay(target_user_id, event).await
    }

    /// Forward an ICE candidate to `target_user_id`.
    ///
    /// # Errors
    ///
    /// `UserOffline` if the target has no live connection.
    pub async fn relay_ice(
        &self,
        sender_id: &str,
        room_id: &str,
        target_user_id: &str,
        candidate: Value,
    ) -> Result<(), HubError> {
        let event = ServerEvent::VoiceIceCandidate(IceCandidateEvent {
            room_id: room_id.to_string(),
            sender_id: sender_id.to_string(),
            target_user_id: target_user_id.to_string(),
            candidate,
        });
        self.relay(target_user_id, event).await
    }

    async fn relay(&self, target_user_id: &str, event: ServerEvent) -> Result<(), HubError> {
        let name = event.name();
        let offline = || HubError::UserOffline {
            user_id: target_user_id.to_string(),
        };

        let target = self.presence.resolve(target_user_id).await?.ok_or_else(offline)?;
        if !to_connection(&target, event) {
            return Err(offline());
        }

        debug!(
            target: "hub.relay",
            event = name,
            target_user_id = %target_user_id,
            connection_id = %target.connection_id(),
            "Relayed signaling payload"
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::actors::connection::ConnectionActor;
    use crate::actors::metrics::ActorMetrics;
    use crate::actors::presence::PresenceActor;
    use common::types::ConnectionId;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn test_offer_reaches_target_verbatim() {
        let token = CancellationToken::new();
        let metrics = ActorMetrics::new();
        let (presence, _) = PresenceActor::spawn(token.child_token(), std::sync::Arc::clone(&metrics));
        let (tx, mut rx) = mpsc::channel(8);
        let (bob, _) = ConnectionActor::spawn(ConnectionId::new(), tx, token.child_token(), metrics);
        presence
            .authenticate(bob, Some("u2".to_string()), None)
            .await
            .unwrap();

        let relay = SignalingRelay::new(presence);
        let sdp = json!({"type": "offer", "sdp": "v=0"});
        relay
            .relay_offer(&Identity::new("u1", "Ana"), "r1", "u2", Some(sdp.clone()))
            .await
            .unwrap();

        let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        let ServerEvent::VoiceCallOffer(offer) = event else {
            unreachable!("expected voice_call_offer");
        };
        assert_eq!(offer.caller_id, "u1");
        assert_eq!(offer.caller_name, "Ana");
        assert_eq!(offer.sdp, Some(sdp));

        token.cancel();
    }

    #[tokio::test]
    async fn test_offline_target_reports_user_offline() {
        let token = CancellationToken::new();
        let (presence, _) = PresenceActor::spawn(token.child_token(), ActorMetrics::new());
        let relay = SignalingRelay::new(presence);

        let err = relay
            .relay_ice("u1", "r1", "ghost", json!({"candidate": "c"}))
            .await
            .unwrap_err();
        assert_eq!(err, HubError::UserOffline { user_id: "ghost".to_string() });
        assert_eq!(err.error_type(), "user_offline");

        token.cancel();
    }
}

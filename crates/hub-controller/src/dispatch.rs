//! Broadcast fan-out over connection handles.
//!
//! A [`BroadcastGroup`] is a set of subscribed connections. Room actors
//! keep one for the room and one for its call; the controller keeps one for
//! every live connection. Delivery never blocks: each member gets a
//! `try_send`, and a full or closed mailbox only costs that member the event.

use crate::actors::connection::ConnectionActorHandle;
use crate::protocol::ServerEvent;
use common::types::ConnectionId;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct BroadcastGroup {
    members: HashMap<ConnectionId, ConnectionActorHandle>,
}

impl BroadcastGroup {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a connection. Returns false if it was already subscribed.
    pub fn insert(&mut self, handle: ConnectionActorHandle) -> bool {
        self.members.insert(handle.connection_id(), handle).is_none()
    }

    pub fn remove(&mut self, connection_id: ConnectionId) -> Option<ConnectionActorHandle> {
        self.members.remove(&connection_id)
    }

    #[must_use]
    pub fn contains(&self, connection_id: ConnectionId) -> bool {
        self.members.contains_key(&connection_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn clear(&mut self) {
        self.members.clear();
    }

    /// Deliver to every member. Returns how many accepted the event.
    pub fn broadcast(&self, event: &ServerEvent) -> usize {
        self.fan_out(event, None)
    }

    /// Deliver to every member except the originating connection.
    pub fn broadcast_except(&self, event: &ServerEvent, exclude: ConnectionId) -> usize {
        self.fan_out(event, Some(exclude))
    }

    fn fan_out(&self, event: &ServerEvent, exclude: Option<ConnectionId>) -> usize {
        self.members
            .iter()
            .filter(|(id, _)| Some(**id) != exclude)
            .filter(|(_, handle)| handle.deliver(event.clone()))
            .count()
    }
}

/// Deliver to a single connection.
pub fn to_connection(handle: &ConnectionActorHandle, event: ServerEvent) -> bool {
    handle.deliver(event)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::actors::connection::ConnectionActor;
    use crate::actors::metrics::ActorMetrics;
    use crate::protocol::UserRef;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    fn member(token: &CancellationToken) -> (ConnectionActorHandle, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(16);
        let (handle, _task) =
            ConnectionActor::spawn(ConnectionId::new(), tx, token.child_token(), ActorMetrics::new());
        (handle, rx)
    }

    fn event() -> ServerEvent {
        ServerEvent::Authenticated(UserRef {
            user_id: "u1".to_string(),
            user_name: "User u1".to_string(),
        })
    }

    async fn received(rx: &mut mpsc::Receiver<ServerEvent>) -> bool {
        tokio::time::timeout(Duration::from_millis(200), rx.recv())
            .await
            .is_ok_and(|e| e.is_some())
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_members() {
        let token = CancellationToken::new();
        let (a, mut rx_a) = member(&token);
        let (b, mut rx_b) = member(&token);

        let mut group = BroadcastGroup::new();
        assert!(group.insert(a.clone()));
        assert!(!group.insert(a), "duplicate subscribe is a no-op");
        group.insert(b);

        assert_eq!(group.broadcast(&event()), 2);
        assert!(received(&mut rx_a).await);
        assert!(received(&mut rx_b).await);

        token.cancel();
    }

    #[tokio::test]
    async fn test_broadcast_except_skips_origin() {
        let token = CancellationToken::new();
        let (a, mut rx_a) = member(&token);
        let (b, mut rx_b) = member(&token);
        let origin = a.connection_id();

        let mut group = BroadcastGroup::new();
        group.insert(a);
        group.insert(b);

        assert_eq!(group.broadcast_except(&event(), origin), 1);
        assert!(received(&mut rx_b).await);
        assert!(!received(&mut rx_a).await);

        token.cancel();
    }

    #[tokio::test]
    async fn test_removed_member_gets_nothing() {
        let token = CancellationToken::new();
        let (a, mut rx_a) = member(&token);
        let id = a.connection_id();

        let mut group = BroadcastGroup::new();
        group.insert(a);
        assert!(group.remove(id).is_some());
        assert!(group.is_empty());

        assert_eq!(group.broadcast(&event()), 0);
        assert!(!received(&mut rx_a).await);

        token.cancel();
    }
}

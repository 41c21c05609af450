//! `PresenceActor` - the process-wide presence registry.
//!
//! Maps a user id to the connection that currently speaks for it and to
//! the rooms the user has joined. It is the only authority used to address
//! a user directly (signaling relay, call invitations).
//!
//! # Binding rules
//!
//! - A connection speaks for at most one user; re-authenticating on the
//!   same connection replaces the previous binding.
//! - The same user id on a second connection rebinds the address to the
//!   newer connection (last writer wins). Room memberships carry over.
//! - Dropping a connection removes the user only if it is still bound to
//!   that connection.
//!
//! The actor never calls other actors, so room actors may await it.

use super::connection::ConnectionActorHandle;
use super::messages::{DroppedSession, Identity, PresenceMessage};
use super::metrics::{ActorMetrics, ActorType, MailboxMonitor};
use crate::errors::HubError;

use chrono::Utc;
use common::types::ConnectionId;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// Channel buffer size for the presence mailbox.
const PRESENCE_CHANNEL_BUFFER: usize = 1000;

/// Handle to the `PresenceActor`.
#[derive(Clone, Debug)]
pub struct PresenceActorHandle {
    sender: mpsc::Sender<PresenceMessage>,
    cancel_token: CancellationToken,
}

impl PresenceActorHandle {
    /// Bind `connection` to a user.
    ///
    /// A missing id becomes `anon_<millis>`; a missing name `User <id>`.
    pub async fn authenticate(
        &self,
        connection: ConnectionActorHandle,
        user_id: Option<String>,
        user_name: Option<String>,
    ) -> Result<Identity, HubError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PresenceMessage::Authenticate {
                connection,
                user_id,
                user_name,
                respond_to: tx,
            })
            .await
            .map_err(|e| HubError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| HubError::Internal(format!("response receive failed: {e}")))
    }

    /// Current connection for `user_id`, if the user is online.
    pub async fn resolve(&self, user_id: &str) -> Result<Option<ConnectionActorHandle>, HubError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PresenceMessage::Resolve {
                user_id: user_id.to_string(),
                respond_to: tx,
            })
            .await
            .map_err(|e| HubError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| HubError::Internal(format!("response receive failed: {e}")))
    }

    pub async fn register_membership(&self, user_id: &str, room_id: &str) -> Result<(), HubError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PresenceMessage::RegisterMembership {
                user_id: user_id.to_string(),
                room_id: room_id.to_string(),
                respond_to: tx,
            })
            .await
            .map_err(|e| HubError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| HubError::Internal(format!("response receive failed: {e}")))
    }

    pub async fn clear_membership(&self, user_id: &str, room_id: &str) -> Result<(), HubError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PresenceMessage::ClearMembership {
                user_id: user_id.to_string(),
                room_id: room_id.to_string(),
                respond_to: tx,
            })
            .await
            .map_err(|e| HubError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| HubError::Internal(format!("response receive failed: {e}")))
    }

    /// Remove the session bound to `connection_id`.
    ///
    /// Returns `None` if no user is bound to it any more.
    pub async fn drop_session(
        &self,
        connection_id: ConnectionId,
    ) -> Result<Option<DroppedSession>, HubError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PresenceMessage::DropSession {
                connection_id,
                respond_to: tx,
            })
            .await
            .map_err(|e| HubError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| HubError::Internal(format!("response receive failed: {e}")))
    }

    /// Number of users online.
    pub async fn count(&self) -> Result<usize, HubError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PresenceMessage::Count { respond_to: tx })
            .await
            .map_err(|e| HubError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| HubError::Internal(format!("response receive failed: {e}")))
    }

    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

/// One online user.
#[derive(Debug)]
struct UserSession {
    user_name: String,
    connection: ConnectionActorHandle,
    rooms: BTreeSet<String>,
}

/// The `PresenceActor` implementation.
pub struct PresenceActor {
    receiver: mpsc::Receiver<PresenceMessage>,
    cancel_token: CancellationToken,
    sessions: HashMap<String, UserSession>,
    /// Reverse index: which user each connection speaks for.
    by_connection: HashMap<ConnectionId, String>,
    metrics: Arc<ActorMetrics>,
    mailbox: MailboxMonitor,
}

impl PresenceActor {
    /// Spawn the presence actor.
    pub fn spawn(
        cancel_token: CancellationToken,
        metrics: Arc<ActorMetrics>,
    ) -> (PresenceActorHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(PRESENCE_CHANNEL_BUFFER);

        let actor = Self {
            receiver,
            cancel_token: cancel_token.clone(),
            sessions: HashMap::new(),
            by_connection: HashMap::new(),
            metrics,
            mailbox: MailboxMonitor::new(ActorType::Presence, "presence"),
        };

        let task_handle = tokio::spawn(actor.run());

        (
            PresenceActorHandle {
                sender,
                cancel_token,
            },
            task_handle,
        )
    }

    #[instrument(skip_all, name = "hub.actor.presence")]
    async fn run(mut self) {
        info!(target: "hub.actor.presence", "PresenceActor started");

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    debug!(
                        target: "hub.actor.presence",
                        "PresenceActor received cancellation signal"
                    );
                    break;
                }

                msg = self.receiver.recv() => {
                    let Some(message) = msg else {
                        break;
                    };
                    self.mailbox.record_enqueue();
                    self.handle_message(message);
                    self.mailbox.record_dequeue();
                    self.metrics.record_message_processed();
                }
            }
        }

        info!(
            target: "hub.actor.presence",
            users_online = self.sessions.len(),
            messages_processed = self.mailbox.messages_processed(),
            "PresenceActor stopped"
        );
    }

    fn handle_message(&mut self, message: PresenceMessage) {
        match message {
            PresenceMessage::Authenticate {
                connection,
                user_id,
                user_name,
                respond_to,
            } => {
                let identity = self.authenticate(connection, user_id, user_name);
                let _ = respond_to.send(identity);
            }

            PresenceMessage::Resolve {
                user_id,
                respond_to,
            } => {
                let handle = self.sessions.get(&user_id).map(|s| s.connection.clone());
                let _ = respond_to.send(handle);
            }

            PresenceMessage::RegisterMembership {
                user_id,
                room_id,
                respond_to,
            } => {
                if let Some(session) = self.sessions.get_mut(&user_id) {
                    session.rooms.insert(room_id);
                }
                let _ = respond_to.send(());
            }

            PresenceMessage::ClearMembership {
                user_id,
                room_id,
                respond_to,
            } => {
                if let Some(session) = self.sessions.get_mut(&user_id) {
                    session.rooms.remove(&room_id);
                }
                let _ = respond_to.send(());
            }

            PresenceMessage::DropSession {
                connection_id,
                respond_to,
            } => {
                let dropped = self.drop_session(connection_id);
                let _ = respond_to.send(dropped);
            }

            PresenceMessage::Count { respond_to } => {
                let _ = respond_to.send(self.sessions.len());
            }
        }
    }

    fn authenticate(
        &mut self,
        connection: ConnectionActorHandle,
        user_id: Option<String>,
        user_name: Option<String>,
    ) -> Identity {
        let user_id = user_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("anon_{}", Utc::now().timestamp_millis()));
        let user_name = user_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("User {user_id}"));
        let connection_id = connection.connection_id();

        // This connection stops speaking for whoever it spoke for before.
        if let Some(previous) = self.by_connection.remove(&connection_id) {
            if previous != user_id {
                self.remove_if_bound(&previous, connection_id);
            }
        }

        // Rebinding a user from another connection keeps their rooms.
        let rooms = match self.sessions.remove(&user_id) {
            Some(existing) => {
                let old_connection = existing.connection.connection_id();
                if old_connection != connection_id {
                    self.by_connection.remove(&old_connection);
                    debug!(
                        target: "hub.actor.presence",
                        user_id = %user_id,
                        old_connection = %old_connection,
                        new_connection = %connection_id,
                        "User rebound to a new connection"
                    );
                }
                existing.rooms
            }
            None => BTreeSet::new(),
        };

        self.sessions.insert(
            user_id.clone(),
            UserSession {
                user_name: user_name.clone(),
                connection,
                rooms,
            },
        );
        self.by_connection.insert(connection_id, user_id.clone());

        debug!(
            target: "hub.actor.presence",
            user_id = %user_id,
            connection_id = %connection_id,
            "User authenticated"
        );

        Identity { user_id, user_name }
    }

    fn drop_session(&mut self, connection_id: ConnectionId) -> Option<DroppedSession> {
        let user_id = self.by_connection.remove(&connection_id)?;
        let session = self.remove_if_bound(&user_id, connection_id)?;

        debug!(
            target: "hub.actor.presence",
            user_id = %user_id,
            connection_id = %connection_id,
            rooms = session.rooms.len(),
            "Session dropped"
        );

        Some(DroppedSession {
            identity: Identity {
                user_id,
                user_name: session.user_name,
            },
            rooms: session.rooms.into_iter().collect(),
        })
    }

    fn remove_if_bound(&mut self, user_id: &str, connection_id: ConnectionId) -> Option<UserSession> {
        let bound = self
            .sessions
            .get(user_id)
            .is_some_and(|s| s.connection.connection_id() == connection_id);
        if bound {
            self.sessions.remove(user_id)
        } else {
            None
        }
    }
}

//! `ConnectionActor` - one per WebSocket connection.
//!
//! The actor sits between the hub and the transport writer task: room
//! actors and the controller push [`ServerEvent`]s into its mailbox, and it
//! forwards them in order onto the outbound channel the writer drains.
//!
//! # Lifecycle
//!
//! 1. Spawned by the controller when the WebSocket upgrade completes
//! 2. Runs until the writer goes away or its token is cancelled
//! 3. Cancellation propagates from the controller's token

use super::messages::ConnectionMessage;
use super::metrics::{ActorMetrics, ActorType, MailboxMonitor};
use crate::protocol::ServerEvent;

use common::types::ConnectionId;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Channel buffer size for the connection mailbox.
const CONNECTION_CHANNEL_BUFFER: usize = 256;

/// Handle to a `ConnectionActor`.
///
/// This is the address other components use to reach one client.
#[derive(Clone, Debug)]
pub struct ConnectionActorHandle {
    sender: mpsc::Sender<ConnectionMessage>,
    cancel_token: CancellationToken,
    connection_id: ConnectionId,
    metrics: Arc<ActorMetrics>,
}

impl ConnectionActorHandle {
    #[must_use]
    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Queue an event for the client without waiting.
    ///
    /// Returns false if the mailbox was full or closed; the drop is logged
    /// and counted, never surfaced to the sender.
    pub fn deliver(&self, event: ServerEvent) -> bool {
        match self.sender.try_send(ConnectionMessage::Deliver { event }) {
            Ok(()) => true,
            Err(_) => {
                self.metrics
                    .record_dropped(ActorType::Connection, &self.connection_id.to_string());
                false
            }
        }
    }

    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

/// The `ConnectionActor` implementation.
pub struct ConnectionActor {
    connection_id: ConnectionId,
    receiver: mpsc::Receiver<ConnectionMessage>,
    /// Events for the transport writer task.
    outbound: mpsc::Sender<ServerEvent>,
    cancel_token: CancellationToken,
    metrics: Arc<ActorMetrics>,
    mailbox: MailboxMonitor,
}

impl ConnectionActor {
    /// Spawn a new connection actor.
    ///
    /// Returns a handle and the task join handle.
    pub fn spawn(
        connection_id: ConnectionId,
        outbound: mpsc::Sender<ServerEvent>,
        cancel_token: CancellationToken,
        metrics: Arc<ActorMetrics>,
    ) -> (ConnectionActorHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(CONNECTION_CHANNEL_BUFFER);

        let actor = Self {
            connection_id,
            receiver,
            outbound,
            cancel_token: cancel_token.clone(),
            metrics: Arc::clone(&metrics),
            mailbox: MailboxMonitor::new(ActorType::Connection, connection_id.to_string()),
        };

        let task_handle = tokio::spawn(actor.run());

        let handle = ConnectionActorHandle {
            sender,
            cancel_token,
            connection_id,
            metrics,
        };

        (handle, task_handle)
    }

    #[instrument(
        skip_all,
        name = "hub.actor.connection",
        fields(connection_id = %self.connection_id)
    )]
    async fn run(mut self) {
        debug!(
            target: "hub.actor.connection",
            connection_id = %self.connection_id,
            "ConnectionActor started"
        );

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    debug!(
                        target: "hub.actor.connection",
                        connection_id = %self.connection_id,
                        "ConnectionActor received cancellation signal"
                    );
                    break;
                }

                msg = self.receiver.recv() => {
                    let Some(message) = msg else {
                        debug!(
                            target: "hub.actor.connection",
                            connection_id = %self.connection_id,
                            "ConnectionActor channel closed, exiting"
                        );
                        break;
                    };

                    self.mailbox.record_enqueue();
                    let should_exit = self.handle_message(message).await;
                    self.mailbox.record_dequeue();
                    self.metrics.record_message_processed();

                    if should_exit {
                        break;
                    }
                }
            }
        }

        info!(
            target: "hub.actor.connection",
            connection_id = %self.connection_id,
            messages_processed = self.mailbox.messages_processed(),
            "ConnectionActor stopped"
        );
    }

    /// Handle a single message. Returns true if the actor should exit.
    async fn handle_message(&mut self, message: ConnectionMessage) -> bool {
        match message {
            ConnectionMessage::Deliver { event } => {
                let name = event.name();
                if self.outbound.send(event).await.is_err() {
                    warn!(
                        target: "hub.actor.connection",
                        connection_id = %self.connection_id,
                        event = name,
                        "Transport writer gone, closing connection actor"
                    );
                    return true;
                }
                debug!(
                    target: "hub.actor.connection",
                    connection_id = %self.connection_id,
                    event = name,
                    "Forwarded event to client"
                );
                false
            }
        }
    }
}

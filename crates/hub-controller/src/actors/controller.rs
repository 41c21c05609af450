//! `HubControllerActor` - singleton supervisor for the hub.
//!
//! The `HubControllerActor` is the top-level actor in the hub hierarchy:
//!
//! - Singleton per hub instance
//! - Owns the room table and lazily spawns one `RoomActor` per room
//! - Registers a `ConnectionActor` per WebSocket and keeps the hub-wide
//!   broadcast group
//! - Owns the root `CancellationToken` and the `PresenceActor`
//! - Monitors child actor health (panic detection via `JoinHandle`)
//!
//! # Graceful Shutdown
//!
//! On SIGTERM, the controller:
//! 1. Sets `accepting_new = false`
//! 2. Cancels the root `CancellationToken` (propagates to all children)
//! 3. Waits for rooms and connections to stop, up to the shutdown deadline

use super::connection::{ConnectionActor, ConnectionActorHandle};
use super::messages::{
    ControllerMessage, ControllerStatus, NewRoom, RegisteredConnection, RoomCreated,
};
use super::metrics::{ActorMetrics, ActorType, MailboxMonitor};
use super::presence::{PresenceActor, PresenceActorHandle};
use super::room::{RoomActor, RoomActorHandle};
use crate::dispatch::BroadcastGroup;
use crate::domain::roster::{Participant, Role};
use crate::domain::{RoomState, RoomSummary};
use crate::errors::HubError;
use crate::protocol::{RoomCreatedEvent, ServerEvent};

use common::types::ConnectionId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Channel buffer size for the controller mailbox.
const CONTROLLER_CHANNEL_BUFFER: usize = 1000;

/// Buffer between a connection actor and its transport writer.
const OUTBOUND_BUFFER: usize = 256;

/// Default time to wait for each child actor during shutdown.
const DEFAULT_SHUTDOWN_DEADLINE: Duration = Duration::from_secs(30);

/// Room name used when a created room has none.
pub const DEFAULT_CREATED_ROOM_NAME: &str = "New chat";

/// Creator used when a room is created without one.
pub const ANONYMOUS_CREATOR_ID: &str = "anonymous";
pub const ANONYMOUS_CREATOR_NAME: &str = "Anonymous User";

/// Handle to the `HubControllerActor`.
///
/// This is the public interface for interacting with the controller.
#[derive(Clone, Debug)]
pub struct HubControllerActorHandle {
    sender: mpsc::Sender<ControllerMessage>,
    cancel_token: CancellationToken,
    presence: PresenceActorHandle,
    metrics: Arc<ActorMetrics>,
}

impl HubControllerActorHandle {
    /// Create a new `HubControllerActor` and return a handle to it.
    ///
    /// This spawns the controller and the presence actor and returns
    /// immediately.
    #[must_use]
    pub fn new(hub_id: String, metrics: Arc<ActorMetrics>, max_rooms: usize) -> Self {
        let (sender, receiver) = mpsc::channel(CONTROLLER_CHANNEL_BUFFER);
        let cancel_token = CancellationToken::new();

        let (presence, presence_task) =
            PresenceActor::spawn(cancel_token.child_token(), Arc::clone(&metrics));

        let actor = HubControllerActor::new(
            hub_id,
            receiver,
            cancel_token.clone(),
            Arc::clone(&metrics),
            presence.clone(),
            presence_task,
            max_rooms,
        );

        tokio::spawn(actor.run());

        Self {
            sender,
            cancel_token,
            presence,
            metrics,
        }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> ControllerMessage,
    ) -> Result<T, HubError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|e| HubError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| HubError::Internal(format!("response receive failed: {e}")))
    }

    /// The hub's presence registry.
    #[must_use]
    pub fn presence(&self) -> &PresenceActorHandle {
        &self.presence
    }

    #[must_use]
    pub fn metrics(&self) -> &Arc<ActorMetrics> {
        &self.metrics
    }

    /// Get a room, creating it on first reference.
    ///
    /// `creator` is seeded into the roster only if this call creates the room.
    pub async fn ensure_room(
        &self,
        room_id: String,
        creator: Option<Participant>,
    ) -> Result<RoomActorHandle, HubError> {
        self.request(|respond_to| ControllerMessage::EnsureRoom {
            room_id,
            creator,
            respond_to,
        })
        .await?
    }

    /// Create a named room and announce it with `room_created`.
    pub async fn create_room(&self, request: NewRoom) -> Result<RoomCreated, HubError> {
        self.request(|respond_to| ControllerMessage::CreateRoom {
            request,
            respond_to,
        })
        .await?
    }

    /// Look up a room without creating it.
    pub async fn get_room(&self, room_id: String) -> Result<Option<RoomActorHandle>, HubError> {
        self.request(|respond_to| ControllerMessage::GetRoom {
            room_id,
            respond_to,
        })
        .await
    }

    /// Summaries of every room, ordered by id.
    ///
    /// Rooms are queried after the controller hands out their handles, so a
    /// slow room never stalls the controller mailbox.
    pub async fn list_rooms(&self) -> Result<Vec<RoomSummary>, HubError> {
        let handles = self
            .request(|respond_to| ControllerMessage::RoomHandles { respond_to })
            .await?;

        let mut summaries = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.summary().await {
                Ok(summary) => summaries.push(summary),
                Err(e) => {
                    warn!(
                        target: "hub.actor.controller",
                        room_id = %handle.room_id(),
                        error = %e,
                        "Skipping unresponsive room in listing"
                    );
                }
            }
        }
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(summaries)
    }

    /// Spawn a connection actor for a new WebSocket.
    pub async fn register_connection(&self) -> Result<RegisteredConnection, HubError> {
        self.request(|respond_to| ControllerMessage::RegisterConnection { respond_to })
            .await?
    }

    pub async fn deregister_connection(&self, connection_id: ConnectionId) -> Result<(), HubError> {
        self.request(|respond_to| ControllerMessage::DeregisterConnection {
            connection_id,
            respond_to,
        })
        .await
    }

    /// Deliver `event` to every live connection.
    pub async fn broadcast_all(&self, event: ServerEvent) -> Result<(), HubError> {
        self.sender
            .send(ControllerMessage::BroadcastAll { event })
            .await
            .map_err(|e| HubError::Internal(format!("channel send failed: {e}")))
    }

    pub async fn get_status(&self) -> Result<ControllerStatus, HubError> {
        self.request(|respond_to| ControllerMessage::GetStatus { respond_to })
            .await
    }

    /// Initiate graceful shutdown. Each child gets up to `deadline` to stop.
    pub async fn shutdown(&self, deadline: Duration) -> Result<(), HubError> {
        self.request(|respond_to| ControllerMessage::Shutdown {
            deadline,
            respond_to,
        })
        .await?
    }

    /// Cancel the actor (for immediate shutdown).
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Get a child token for spawning child actors.
    #[must_use]
    pub fn child_token(&self) -> CancellationToken {
        self.cancel_token.child_token()
    }
}

/// Internal state for a managed room.
struct ManagedRoom {
    handle: RoomActorHandle,
    task_handle: JoinHandle<()>,
}

/// The `HubControllerActor` implementation.
pub struct HubControllerActor {
    hub_id: String,
    receiver: mpsc::Receiver<ControllerMessage>,
    /// Root cancellation token.
    cancel_token: CancellationToken,
    rooms: HashMap<String, ManagedRoom>,
    max_rooms: usize,
    /// Every live connection, for hub-wide broadcasts.
    everyone: BroadcastGroup,
    connection_tasks: HashMap<ConnectionId, JoinHandle<()>>,
    presence: PresenceActorHandle,
    presence_task: Option<JoinHandle<()>>,
    /// Whether new rooms and connections are accepted.
    accepting_new: bool,
    shutdown_deadline: Duration,
    metrics: Arc<ActorMetrics>,
    mailbox: MailboxMonitor,
}

impl HubControllerActor {
    fn new(
        hub_id: String,
        receiver: mpsc::Receiver<ControllerMessage>,
        cancel_token: CancellationToken,
        metrics: Arc<ActorMetrics>,
        presence: PresenceActorHandle,
        presence_task: JoinHandle<()>,
        max_rooms: usize,
    ) -> Self {
        let mailbox = MailboxMonitor::new(ActorType::Controller, &hub_id);

        Self {
            hub_id,
            receiver,
            cancel_token,
            rooms: HashMap::new(),
            max_rooms,
            everyone: BroadcastGroup::new(),
            connection_tasks: HashMap::new(),
            presence,
            presence_task: Some(presence_task),
            accepting_new: true,
            shutdown_deadline: DEFAULT_SHUTDOWN_DEADLINE,
            metrics,
            mailbox,
        }
    }

    #[instrument(skip_all, name = "hub.actor.controller", fields(hub_id = %self.hub_id))]
    async fn run(mut self) {
        info!(
            target: "hub.actor.controller",
            hub_id = %self.hub_id,
            max_rooms = self.max_rooms,
            "HubControllerActor started"
        );

        loop {
            self.check_room_health().await;
            self.check_connection_health().await;
            self.check_presence_health().await;

            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(
                        target: "hub.actor.controller",
                        hub_id = %self.hub_id,
                        "HubControllerActor received cancellation signal"
                    );
                    self.graceful_shutdown().await;
                    break;
                }

                msg = self.receiver.recv() => {
                    let Some(message) = msg else {
                        info!(
                            target: "hub.actor.controller",
                            hub_id = %self.hub_id,
                            "HubControllerActor channel closed, exiting"
                        );
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
            target: "hub.actor.controller",
            hub_id = %self.hub_id,
            rooms_remaining = self.rooms.len(),
            messages_processed = self.mailbox.messages_processed(),
            "HubControllerActor stopped"
        );
    }

    fn handle_message(&mut self, message: ControllerMessage) {
        match message {
            ControllerMessage::EnsureRoom {
                room_id,
                creator,
                respond_to,
            } => {
                let result = self.ensure_room(&room_id, creator);
                let _ = respond_to.send(result);
            }

            ControllerMessage::CreateRoom {
                request,
                respond_to,
            } => {
                let result = self.create_room(request);
                let _ = respond_to.send(result);
            }

            ControllerMessage::GetRoom {
                room_id,
                respond_to,
            } => {
                let handle = self.rooms.get(&room_id).map(|m| m.handle.clone());
                let _ = respond_to.send(handle);
            }

            ControllerMessage::RoomHandles { respond_to } => {
                let handles = self.rooms.values().map(|m| m.handle.clone()).collect();
                let _ = respond_to.send(handles);
            }

            ControllerMessage::RegisterConnection { respond_to } => {
                let result = self.register_connection();
                let _ = respond_to.send(result);
            }

            ControllerMessage::DeregisterConnection {
                connection_id,
                respond_to,
            } => {
                self.deregister_connection(connection_id);
                let _ = respond_to.send(());
            }

            ControllerMessage::BroadcastAll { event } => {
                let delivered = self.everyone.broadcast(&event);
                debug!(
                    target: "hub.actor.controller",
                    hub_id = %self.hub_id,
                    event = event.name(),
                    delivered = delivered,
                    "Broadcast to all connections"
                );
            }

            ControllerMessage::GetStatus { respond_to } => {
                let _ = respond_to.send(self.get_status());
            }

            ControllerMessage::Shutdown {
                deadline,
                respond_to,
            } => {
                let result = self.initiate_shutdown(deadline);
                let _ = respond_to.send(result);
            }
        }
    }

    fn ensure_room(
        &mut self,
        room_id: &str,
        creator: Option<Participant>,
    ) -> Result<RoomActorHandle, HubError> {
        if let Some(managed) = self.rooms.get(room_id) {
            return Ok(managed.handle.clone());
        }

        let mut state = RoomState::new(room_id, None);
        if let Some(creator) = creator {
            state.roster_mut().seed(creator);
        }
        self.spawn_room(state)
    }

    fn create_room(&mut self, request: NewRoom) -> Result<RoomCreated, HubError> {
        let room_id = format!("room_{}", uuid::Uuid::new_v4().simple());
        let name = request
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CREATED_ROOM_NAME.to_string());
        let creator_id = request
            .creator_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| ANONYMOUS_CREATOR_ID.to_string());
        let creator_name = request
            .creator_name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| ANONYMOUS_CREATOR_NAME.to_string());

        let mut state = RoomState::new(&room_id, Some(name.clone()));
        state.roster_mut().seed(Participant {
            user_id: creator_id.clone(),
            display_name: creator_name,
            role: Role::Creator,
            active: true,
        });
        for member_id in request.participant_ids {
            if member_id == creator_id || member_id.is_empty() {
                continue;
            }
            state.roster_mut().seed(Participant {
                display_name: format!("User {member_id}"),
                user_id: member_id,
                role: Role::Member,
                active: false,
            });
        }

        let room = state.snapshot();
        self.spawn_room(state)?;

        self.everyone
            .broadcast(&ServerEvent::RoomCreated(RoomCreatedEvent {
                room_id: room_id.clone(),
                name,
                creator: creator_id,
            }));

        Ok(RoomCreated { room_id, room })
    }

    fn spawn_room(&mut self, state: RoomState) -> Result<RoomActorHandle, HubError> {
        if !self.accepting_new {
            return Err(HubError::Draining);
        }
        if self.rooms.len() >= self.max_rooms {
            warn!(
                target: "hub.actor.controller",
                hub_id = %self.hub_id,
                max_rooms = self.max_rooms,
                "Room limit reached, rejecting new room"
            );
            return Err(HubError::RoomCapacityExceeded);
        }

        let room_id = state.room_id().to_string();
        let (handle, task_handle) = RoomActor::spawn(
            state,
            self.presence.clone(),
            self.cancel_token.child_token(),
            Arc::clone(&self.metrics),
        );

        self.rooms.insert(
            room_id.clone(),
            ManagedRoom {
                handle: handle.clone(),
                task_handle,
            },
        );
        self.metrics.room_created();

        info!(
            target: "hub.actor.controller",
            hub_id = %self.hub_id,
            room_id = %room_id,
            total_rooms = self.rooms.len(),
            "Room actor created"
        );

        Ok(handle)
    }

    fn register_connection(&mut self) -> Result<RegisteredConnection, HubError> {
        if !self.accepting_new {
            return Err(HubError::Draining);
        }

        let (outbound_tx, outbound) = mpsc::channel(OUTBOUND_BUFFER);
        let connection_id = ConnectionId::new();
        let (handle, task_handle) = ConnectionActor::spawn(
            connection_id,
            outbound_tx,
            self.cancel_token.child_token(),
            Arc::clone(&self.metrics),
        );

        self.everyone.insert(handle.clone());
        self.connection_tasks.insert(connection_id, task_handle);
        self.metrics.connection_created();

        debug!(
            target: "hub.actor.controller",
            hub_id = %self.hub_id,
            connection_id = %connection_id,
            total_connections = self.connection_tasks.len(),
            "Connection registered"
        );

        Ok(RegisteredConnection { handle, outbound })
    }

    fn deregister_connection(&mut self, connection_id: ConnectionId) {
        let handle: Option<ConnectionActorHandle> = self.everyone.remove(connection_id);
        if let Some(handle) = handle {
            handle.cancel();
        }
        if self.connection_tasks.remove(&connection_id).is_some() {
            self.metrics.connection_closed();
            debug!(
                target: "hub.actor.controller",
                hub_id = %self.hub_id,
                connection_id = %connection_id,
                total_connections = self.connection_tasks.len(),
                "Connection deregistered"
            );
        }
    }

    fn get_status(&self) -> ControllerStatus {
        ControllerStatus {
            room_count: self.rooms.len(),
            connection_count: self.connection_tasks.len(),
            active_calls: self.metrics.call_count(),
            is_draining: !self.accepting_new,
            mailbox_depth: self.mailbox.current_depth(),
        }
    }

    fn initiate_shutdown(&mut self, deadline: Duration) -> Result<(), HubError> {
        info!(
            target: "hub.actor.controller",
            hub_id = %self.hub_id,
            room_count = self.rooms.len(),
            connection_count = self.connection_tasks.len(),
            deadline_secs = deadline.as_secs(),
            "Initiating graceful shutdown"
        );

        self.accepting_new = false;
        self.shutdown_deadline = deadline;

        // Propagates to every room, connection and presence
        self.cancel_token.cancel();

        Ok(())
    }

    async fn graceful_shutdown(&mut self) {
        info!(
            target: "hub.actor.controller",
            hub_id = %self.hub_id,
            room_count = self.rooms.len(),
            "Performing graceful shutdown"
        );

        self.accepting_new = false;

        for managed in self.rooms.values() {
            managed.handle.cancel();
        }
        self.presence.cancel();

        let deadline = self.shutdown_deadline;
        let rooms: Vec<_> = self.rooms.drain().collect();
        for (room_id, managed) in rooms {
            match tokio::time::timeout(deadline, managed.task_handle).await {
                Ok(Ok(())) => {
                    debug!(
                        target: "hub.actor.controller",
                        hub_id = %self.hub_id,
                        room_id = %room_id,
                        "Room actor completed cleanly"
                    );
                }
                Ok(Err(e)) => {
                    warn!(
                        target: "hub.actor.controller",
                        hub_id = %self.hub_id,
                        room_id = %room_id,
                        error = ?e,
                        "Room actor task panicked during shutdown"
                    );
                }
                Err(_) => {
                    warn!(
                        target: "hub.actor.controller",
                        hub_id = %self.hub_id,
                        room_id = %room_id,
                        "Room actor shutdown timed out"
                    );
                }
            }
            self.metrics.room_removed();
        }

        self.everyone.clear();
        let connections: Vec<_> = self.connection_tasks.drain().collect();
        for (connection_id, task_handle) in connections {
            if tokio::time::timeout(deadline, task_handle).await.is_err() {
                warn!(
                    target: "hub.actor.controller",
                    hub_id = %self.hub_id,
                    connection_id = %connection_id,
                    "Connection actor shutdown timed out"
                );
            }
            self.metrics.connection_closed();
        }

        if let Some(task) = self.presence_task.take() {
            if tokio::time::timeout(deadline, task).await.is_err() {
                warn!(
                    target: "hub.actor.controller",
                    hub_id = %self.hub_id,
                    "Presence actor shutdown timed out"
                );
            }
        }

        info!(
            target: "hub.actor.controller",
            hub_id = %self.hub_id,
            "Graceful shutdown complete"
        );
    }

    /// Reap room actors that stopped on their own.
    async fn check_room_health(&mut self) {
        let failed: Vec<String> = self
            .rooms
            .iter()
            .filter(|(_, managed)| managed.task_handle.is_finished())
            .map(|(room_id, _)| room_id.clone())
            .collect();

        for room_id in failed {
            let Some(managed) = self.rooms.remove(&room_id) else {
                continue;
            };
            warn!(
                target: "hub.actor.controller",
                hub_id = %self.hub_id,
                room_id = %room_id,
                "Room actor task finished unexpectedly"
            );

            if let Err(join_error) = managed.task_handle.await {
                if join_error.is_panic() {
                    error!(
                        target: "hub.actor.controller",
                        hub_id = %self.hub_id,
                        room_id = %room_id,
                        error = ?join_error,
                        "Room actor panicked - room state lost"
                    );
                    self.metrics.record_panic(ActorType::Room);
                }
            }

            self.metrics.room_removed();
        }
    }

    /// Reap connection actors whose writer went away.
    async fn check_connection_health(&mut self) {
        let finished: Vec<ConnectionId> = self
            .connection_tasks
            .iter()
            .filter(|(_, task)| task.is_finished())
            .map(|(id, _)| *id)
            .collect();

        for connection_id in finished {
            self.everyone.remove(connection_id);
            let Some(task) = self.connection_tasks.remove(&connection_id) else {
                continue;
            };
            if let Err(join_error) = task.await {
                if join_error.is_panic() {
                    error!(
                        target: "hub.actor.controller",
                        hub_id = %self.hub_id,
                        connection_id = %connection_id,
                        error = ?join_error,
                        "Connection actor panicked"
                    );
                    self.metrics.record_panic(ActorType::Connection);
                }
            }
            self.metrics.connection_closed();
        }
    }

    async fn check_presence_health(&mut self) {
        let finished = self
            .presence_task
            .as_ref()
            .is_some_and(JoinHandle::is_finished);
        if !finished {
            return;
        }

        if let Some(task) = self.presence_task.take() {
            if let Err(join_error) = task.await {
                if join_error.is_panic() {
                    self.metrics.record_panic(ActorType::Presence);
                }
            }
            error!(
                target: "hub.actor.controller",
                hub_id = %self.hub_id,
                "Presence actor stopped - users can no longer be addressed"
            );
        }
    }
}

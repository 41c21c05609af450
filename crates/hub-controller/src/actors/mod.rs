//! Actor model implementation for the Hub Controller.
//!
//! ```text
//! HubControllerActor (singleton per hub instance)
//! ├── supervises N RoomActors
//! │   └── RoomActor (one per room, created on first reference)
//! │       ├── owns roster, history, call and invitation state
//! │       └── fans events out to subscribed ConnectionActors
//! ├── supervises N ConnectionActors
//! │   └── ConnectionActor (one per WebSocket)
//! └── PresenceActor (user -> connection registry)
//! ```
//!
//! # Key Design Decisions
//!
//! - **Single-writer rooms**: every mutation of a room goes through its mailbox,
//!   so call-state transitions never race
//! - **One user per connection**: a connection speaks for the user it last
//!   authenticated as
//! - **Non-blocking fan-out**: rooms `try_send` into connection mailboxes; a
//!   slow client only loses its own events
//! - **CancellationToken propagation**: the controller owns the root token and
//!   hands child tokens to every actor it spawns
//!
//! # Modules
//!
//! - [`controller`] - `HubControllerActor` singleton that supervises rooms and connections
//! - [`room`] - `RoomActor` per room
//! - [`presence`] - `PresenceActor` registry of online users
//! - [`connection`] - `ConnectionActor` per WebSocket
//! - [`messages`] - Message types for actor communication
//! - [`metrics`] - Mailbox monitoring and actor metrics

pub mod connection;
pub mod controller;
pub mod messages;
pub mod metrics;
pub mod presence;
pub mod room;

// Re-export primary types
pub use connection::{ConnectionActor, ConnectionActorHandle};
pub use controller::{HubControllerActor, HubControllerActorHandle};
pub use messages::*;
pub use metrics::{ActorMetrics, MailboxMonitor};
pub use presence::{PresenceActor, PresenceActorHandle};
pub use room::{RoomActor, RoomActorHandle};

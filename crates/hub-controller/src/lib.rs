//! Hub Controller Service Library
//!
//! This library provides the core functionality for the Huddle Hub
//! Controller - a real-time room messaging server that also brokers
//! peer-to-peer voice-call signaling:
//!
//! - Presence: which user is reachable on which connection
//! - Rooms: bounded message history, participants and soft deletion
//! - Voice calls: at most one call per room, with invitation rounds
//! - Signaling relay: opaque offers, ICE candidates and audio chunks
//!
//! # Architecture
//!
//! State is owned by actors (see [`actors`]); the WebSocket transport and
//! the administrative HTTP surface are thin adapters over actor handles:
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> session.rs -> actors/*.rs -> domain/*.rs
//! ```
//!
//! # Modules
//!
//! - [`actors`] - Controller, room, presence and connection actors
//! - [`config`] - Service configuration from environment
//! - [`dispatch`] - Broadcast groups over connection handles
//! - [`domain`] - Pure room state (history, roster, call, invitations)
//! - [`errors`] - Error types with HTTP and real-time mappings
//! - [`handlers`] - HTTP and WebSocket handlers
//! - [`observability`] - Health probes and Prometheus metrics
//! - [`protocol`] - Real-time JSON event protocol
//! - [`relay`] - Point-to-point signaling relay
//! - [`routes`] - Axum router setup
//! - [`session`] - Per-connection event handling

pub mod actors;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod observability;
pub mod protocol;
pub mod relay;
pub mod routes;
pub mod session;

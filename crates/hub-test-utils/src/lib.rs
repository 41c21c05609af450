//! # Hub Test Utilities
//!
//! Shared test utilities for the Hub Controller.
//!
//! - `server_harness` - Spawn a real Hub Controller on a random port
//! - `ws_client` - WebSocket client speaking the JSON event protocol
//! - `fixtures` - Test users and rooms
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hub_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<(), anyhow::Error> {
//!     let server = TestHubServer::spawn().await?;
//!     let alice = TestUser::new("Alice");
//!
//!     let mut client = TestWsClient::connect(&server.ws_url()).await?;
//!     client.send("authenticate", alice.payload()).await?;
//!     client.expect_event("authenticated").await;
//!     Ok(())
//! }
//! ```

pub mod fixtures;
pub mod server_harness;
pub mod ws_client;

pub use fixtures::{TestRoom, TestUser};
pub use server_harness::TestHubServer;
pub use ws_client::TestWsClient;

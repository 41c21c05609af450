//! Test server harness for end-to-end testing.
//!
//! Provides `TestHubServer` for spawning real Hub Controller instances in tests.

use hub_controller::actors::{ActorMetrics, HubControllerActorHandle};
use hub_controller::config::Config;
use hub_controller::routes::{self, AppState};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Test harness for spawning the Hub Controller in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_status() -> Result<(), anyhow::Error> {
///     let server = TestHubServer::spawn().await?;
///     let response = reqwest::get(format!("{}/status", server.url())).await?;
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestHubServer {
    addr: SocketAddr,
    controller: HubControllerActorHandle,
    handle: JoinHandle<()>,
}

impl TestHubServer {
    /// Spawn a server with default test configuration.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with_vars(HashMap::new()).await
    }

    /// Spawn a server with extra configuration variables.
    ///
    /// The server always binds to `127.0.0.1:0`.
    pub async fn spawn_with_vars(
        mut vars: HashMap<String, String>,
    ) -> Result<Self, anyhow::Error> {
        vars.insert("HUB_BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string());
        vars.entry("HUB_ID".to_string())
            .or_insert_with(|| "hub-test".to_string());

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let controller = HubControllerActorHandle::new(
            config.hub_id.clone(),
            ActorMetrics::new(),
            config.max_rooms,
        );

        let state = Arc::new(AppState {
            controller: controller.clone(),
            config,
        });

        // Build routes using hub-controller's real route builder
        let app = routes::build_routes(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            controller,
            handle,
        })
    }

    /// Handle to the server's actor system.
    pub fn controller(&self) -> &HubControllerActorHandle {
        &self.controller
    }

    /// Base URL for HTTP requests (e.g. `http://127.0.0.1:12345`).
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// URL of the real-time WebSocket endpoint.
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Socket address the server is bound to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Drop for TestHubServer {
    fn drop(&mut self) {
        self.controller.cancel();
        self.handle.abort();
    }
}

//! WebSocket client for real-time tests.
//!
//! Frames are `{"event": "<name>", "data": {...}}` JSON objects in both
//! directions.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long `expect_event` waits before failing the test.
const EVENT_TIMEOUT: Duration = Duration::from_secs(2);

/// How long `assert_no_event` listens for stray events.
const QUIET_PERIOD: Duration = Duration::from_millis(150);

/// One received server event.
#[derive(Debug, Clone)]
pub struct ReceivedEvent {
    pub event: String,
    pub data: Value,
}

/// A connected real-time client.
pub struct TestWsClient {
    sink: SplitSink<Socket, Message>,
    stream: SplitStream<Socket>,
}

impl TestWsClient {
    /// Connect to `url` (typically [`crate::TestHubServer::ws_url`]).
    pub async fn connect(url: &str) -> Result<Self, anyhow::Error> {
        let (socket, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| anyhow::anyhow!("WebSocket connect failed: {}", e))?;
        let (sink, stream) = socket.split();
        Ok(Self { sink, stream })
    }

    /// Send one event frame.
    pub async fn send(&mut self, event: &str, data: Value) -> Result<(), anyhow::Error> {
        let frame = json!({ "event": event, "data": data }).to_string();
        self.sink
            .send(Message::Text(frame.into()))
            .await
            .map_err(|e| anyhow::anyhow!("WebSocket send failed: {}", e))
    }

    /// Send a raw text frame.
    pub async fn send_raw(&mut self, text: &str) -> Result<(), anyhow::Error> {
        self.sink
            .send(Message::Text(text.to_string().into()))
            .await
            .map_err(|e| anyhow::anyhow!("WebSocket send failed: {}", e))
    }

    /// Receive the next event, or `None` if the socket closed or timed out.
    pub async fn next_event(&mut self, timeout: Duration) -> Option<ReceivedEvent> {
        loop {
            let frame = tokio::time::timeout(timeout, self.stream.next())
                .await
                .ok()??
                .ok()?;
            match frame {
                Message::Text(text) => {
                    let value: Value = serde_json::from_str(text.as_str()).ok()?;
                    return Some(ReceivedEvent {
                        event: value["event"].as_str().unwrap_or_default().to_string(),
                        data: value["data"].clone(),
                    });
                }
                Message::Close(_) => return None,
                _ => {}
            }
        }
    }

    /// Skip events until one named `name` arrives; return its data.
    ///
    /// # Panics
    ///
    /// Panics if no such event arrives in time.
    pub async fn expect_event(&mut self, name: &str) -> Value {
        loop {
            match self.next_event(EVENT_TIMEOUT).await {
                Some(received) if received.event == name => return received.data,
                Some(_) => {}
                None => panic!("timed out waiting for `{name}`"),
            }
        }
    }

    /// Assert that nothing arrives within a short quiet period.
    ///
    /// # Panics
    ///
    /// Panics if an event arrives.
    pub async fn assert_no_event(&mut self) {
        if let Some(received) = self.next_event(QUIET_PERIOD).await {
            panic!(
                "unexpected event `{}`: {}",
                received.event, received.data
            );
        }
    }

    /// Discard everything received so far.
    pub async fn drain(&mut self) {
        while self.next_event(QUIET_PERIOD).await.is_some() {}
    }

    /// Close the socket, triggering the server-side disconnect cascade.
    pub async fn close(mut self) {
        let _ = self.sink.send(Message::Close(None)).await;
        let _ = self.sink.close().await;
    }
}

//! Real-time WebSocket transport.
//!
//! - `GET /ws` - Upgrade to a WebSocket speaking the JSON event protocol
//!
//! Each socket gets a connection actor and a [`ClientSession`]. A writer task
//! drains the actor's outbound queue into the socket; the upgrade task reads
//! frames and feeds them to the session in arrival order. When either side
//! stops, the session runs the disconnect cascade.

use crate::actors::messages::RegisteredConnection;
use crate::errors::HubError;
use crate::protocol::ServerEvent;
use crate::routes::AppState;
use crate::session::ClientSession;
use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// How long the writer may take to flush after the reader stops.
const WRITER_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Close code sent when the hub refuses a socket (RFC 6455 "try again later").
const CLOSE_TRY_AGAIN_LATER: u16 = 1013;

/// Handler for GET /ws
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| serve_socket(socket, state))
}

async fn serve_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let RegisteredConnection { handle, outbound } =
        match state.controller.register_connection().await {
            Ok(registered) => registered,
            Err(e) => {
                refuse(&mut socket, &e).await;
                return;
            }
        };

    let connection_id = handle.connection_id();
    info!(target: "hub.transport.ws", connection_id = %connection_id, "WebSocket connected");

    let (sink, mut stream) = socket.split();
    let mut writer = tokio::spawn(write_events(sink, outbound));
    let mut session = ClientSession::new(handle, state.controller.clone());

    loop {
        tokio::select! {
            _ = &mut writer => {
                debug!(target: "hub.transport.ws", connection_id = %connection_id, "Writer finished");
                break;
            }

            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => session.handle_frame(&text).await,
                    Some(Ok(Message::Binary(bytes))) => {
                        session.handle_frame(&String::from_utf8_lossy(&bytes)).await;
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(
                            target: "hub.transport.ws",
                            connection_id = %connection_id,
                            error = %e,
                            "WebSocket read failed"
                        );
                        break;
                    }
                }
            }
        }
    }

    // Deregistration stops the connection actor, which closes the outbound
    // queue and lets the writer finish.
    session.disconnect().await;
    if !writer.is_finished() && tokio::time::timeout(WRITER_FLUSH_TIMEOUT, &mut writer).await.is_err() {
        writer.abort();
    }

    info!(target: "hub.transport.ws", connection_id = %connection_id, "WebSocket disconnected");
}

/// Serialize queued events onto the socket until the queue closes.
async fn write_events(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<ServerEvent>,
) {
    while let Some(event) = outbound.recv().await {
        let text = match serde_json::to_string(&event) {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    target: "hub.transport.ws",
                    event = event.name(),
                    error = %e,
                    "Failed to encode outbound event"
                );
                continue;
            }
        };
        if sink.send(Message::Text(text)).await.is_err() {
            return;
        }
    }
    let _ = sink.close().await;
}

async fn refuse(socket: &mut WebSocket, error: &HubError) {
    warn!(target: "hub.transport.ws", error = %error, "Refusing WebSocket");
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code: CLOSE_TRY_AGAIN_LATER,
            reason: error.client_message().into(),
        })))
        .await;
}

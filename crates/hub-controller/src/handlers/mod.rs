//! HTTP and WebSocket request handlers for the Hub Controller.

pub mod rooms;
pub mod status;
pub mod voice;
pub mod ws;

pub use rooms::{create_room, delete_message, get_messages, list_rooms, post_message};
pub use status::get_status;
pub use voice::{end_call, get_call, start_call};
pub use ws::ws_upgrade;

/// Treat an absent and an empty request field the same way.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

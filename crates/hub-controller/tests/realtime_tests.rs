//! Real-time WebSocket integration tests.
//!
//! Drives a real Hub Controller through `TestWsClient` sockets.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use hub_test_utils::{TestHubServer, TestRoom, TestUser, TestWsClient};
use serde_json::{json, Value};
use std::time::Duration;

async fn connect_as(server: &TestHubServer, user: &TestUser) -> Result<TestWsClient, anyhow::Error> {
    let mut client = TestWsClient::connect(&server.ws_url()).await?;
    client.send("authenticate", user.payload()).await?;
    let auth = client.expect_event("authenticated").await;
    assert_eq!(auth["userId"], user.id.as_str());
    Ok(client)
}

async fn join(client: &mut TestWsClient, room: &TestRoom, user: &TestUser) -> Result<(), anyhow::Error> {
    client.send("join_room", room.join_payload(user)).await?;
    let joined = client.expect_event("user_joined").await;
    assert_eq!(joined["userId"], user.id.as_str());
    Ok(())
}

async fn call_state(server: &TestHubServer, room: &TestRoom) -> Result<Value, anyhow::Error> {
    Ok(reqwest::get(format!("{}/rooms/{}/voice-call", server.url(), room.id))
        .await?
        .json()
        .await?)
}

/// Join, chat, a merged call start and a disconnect cascade that ends the
/// call exactly once.
#[tokio::test]
async fn test_room_chat_and_call_lifecycle() -> Result<(), anyhow::Error> {
    let server = TestHubServer::spawn().await?;
    let room = TestRoom::new("r1");
    let u1 = TestUser::new("Ana").with_id("u1");
    let u2 = TestUser::new("Ben").with_id("u2");
    let observer = TestUser::new("Cy").with_id("u3");

    let mut c1 = connect_as(&server, &u1).await?;
    join(&mut c1, &room, &u1).await?;

    c1.send("send_message", room.payload_with(json!({"content": "hi"})))
        .await?;
    let message = c1.expect_event("message").await;
    assert_eq!(message["content"], "hi");
    assert_eq!(message["senderId"], "u1");

    let history: Vec<Value> = reqwest::get(format!("{}/rooms/r1/messages", server.url()))
        .await?
        .json()
        .await?;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["type"], "system");
    assert_eq!(history[0]["content"], "Ana has joined the chat");
    assert_eq!(history[1]["content"], "hi");

    c1.send("voice_call_start", room.payload()).await?;
    let started = c1.expect_event("voice_call_started").await;
    assert_eq!(started["callerId"], "u1");

    let mut c2 = connect_as(&server, &u2).await?;
    join(&mut c2, &room, &u2).await?;
    let mut c3 = connect_as(&server, &observer).await?;
    join(&mut c3, &room, &observer).await?;

    // A second start folds into the existing call
    c2.send("voice_call_start", room.payload()).await?;
    let merged = c1.expect_event("voice_user_joined").await;
    assert_eq!(merged["userId"], "u2");
    let call = call_state(&server, &room).await?;
    assert_eq!(call["active"], true);
    assert_eq!(call["participants"], 2);

    c2.close().await;
    let left = c1.expect_event("voice_user_left").await;
    assert_eq!(left["userId"], "u2");
    let call = call_state(&server, &room).await?;
    assert_eq!(call["active"], true);
    assert_eq!(call["participants"], 1);

    c1.close().await;
    let ended = c3.expect_event("voice_call_end").await;
    assert_eq!(ended["reason"], "no_participants");
    assert_eq!(ended["roomId"], "r1");

    while let Some(received) = c3.next_event(Duration::from_millis(200)).await {
        assert_ne!(received.event, "voice_call_end", "call end broadcast twice");
    }
    let call = call_state(&server, &room).await?;
    assert_eq!(call["active"], false);

    Ok(())
}

/// A caller who never joined the room still leaves its call on disconnect.
#[tokio::test]
async fn test_disconnect_ends_call_started_without_join() -> Result<(), anyhow::Error> {
    let server = TestHubServer::spawn().await?;
    let room = TestRoom::random();
    let caller = TestUser::new("Caller");
    let observer = TestUser::new("Observer");

    let mut watcher = connect_as(&server, &observer).await?;
    join(&mut watcher, &room, &observer).await?;

    let mut c = connect_as(&server, &caller).await?;
    c.send("voice_call_start", room.payload()).await?;
    let started = watcher.expect_event("voice_call_started").await;
    assert_eq!(started["callerId"], caller.id.as_str());
    assert_eq!(call_state(&server, &room).await?["active"], true);

    c.close().await;
    let ended = watcher.expect_event("voice_call_end").await;
    assert_eq!(ended["reason"], "no_participants");
    assert_eq!(ended["userId"], caller.id.as_str());

    let call = call_state(&server, &room).await?;
    assert_eq!(call["active"], false);

    Ok(())
}

/// Deletes by a plain member are refused; the sender can delete by id suffix.
#[tokio::test]
async fn test_delete_message_authorization() -> Result<(), anyhow::Error> {
    let server = TestHubServer::spawn().await?;
    let room = TestRoom::random();
    let author = TestUser::new("Author");
    let other = TestUser::new("Other");

    let mut a = connect_as(&server, &author).await?;
    join(&mut a, &room, &author).await?;
    let mut b = connect_as(&server, &other).await?;
    join(&mut b, &room, &other).await?;

    a.send("send_message", room.payload_with(json!({"content": "secret"})))
        .await?;
    let message = b.expect_event("message").await;
    let message_id = message["id"].as_str().unwrap_or_default().to_string();

    b.send(
        "message_deleted",
        room.payload_with(json!({"messageId": message_id})),
    )
    .await?;
    let error = b.expect_event("error").await;
    assert_eq!(error["type"], "delete_unauthorized");

    let suffix = &message_id[message_id.len() - 8..];
    a.send("message_deleted", room.payload_with(json!({"messageId": suffix})))
        .await?;
    let deleted = b.expect_event("message_deleted").await;
    assert_eq!(deleted["messageId"], message_id.as_str());
    assert_eq!(deleted["deletedBy"], author.id.as_str());

    let history: Vec<Value> = reqwest::get(format!("{}/rooms/{}/messages", server.url(), room.id))
        .await?
        .json()
        .await?;
    let stored = history
        .iter()
        .find(|m| m["id"] == message_id.as_str())
        .cloned()
        .unwrap_or_default();
    assert_eq!(stored["deleted"], true);
    assert_ne!(stored["content"], "secret");

    Ok(())
}

#[tokio::test]
async fn test_ice_candidate_to_offline_user_reports_error() -> Result<(), anyhow::Error> {
    let server = TestHubServer::spawn().await?;
    let room = TestRoom::random();
    let user = TestUser::new("Solo");

    let mut client = connect_as(&server, &user).await?;
    client
        .send(
            "voice_ice_candidate",
            room.payload_with(json!({"targetUserId": "ghost", "candidate": {"c": 1}})),
        )
        .await?;
    let error = client.expect_event("error").await;
    assert_eq!(error["type"], "user_offline");

    // The connection stays usable after an error
    client.send("authenticate", user.payload()).await?;
    client.expect_event("authenticated").await;

    Ok(())
}

#[tokio::test]
async fn test_offer_relayed_to_target_only() -> Result<(), anyhow::Error> {
    let server = TestHubServer::spawn().await?;
    let room = TestRoom::random();
    let caller = TestUser::new("Caller");
    let callee = TestUser::new("Callee");
    let bystander = TestUser::new("Bystander");

    let mut a = connect_as(&server, &caller).await?;
    let mut b = connect_as(&server, &callee).await?;
    let mut c = connect_as(&server, &bystander).await?;

    let sdp = json!({"type": "offer", "sdp": "v=0"});
    a.send(
        "voice_call_offer",
        room.payload_with(json!({"targetUserId": callee.id, "sdp": sdp})),
    )
    .await?;

    let offer = b.expect_event("voice_call_offer").await;
    assert_eq!(offer["callerId"], caller.id.as_str());
    assert_eq!(offer["sdp"], sdp);
    c.assert_no_event().await;

    Ok(())
}

#[tokio::test]
async fn test_malformed_frame_reports_invalid_event() -> Result<(), anyhow::Error> {
    let server = TestHubServer::spawn().await?;
    let mut client = TestWsClient::connect(&server.ws_url()).await?;

    client.send_raw("not json").await?;
    let error = client.expect_event("error").await;
    assert_eq!(error["type"], "invalid_event");

    client.send("no_such_event", json!({})).await?;
    let error = client.expect_event("error").await;
    assert_eq!(error["type"], "invalid_event");

    Ok(())
}

#[tokio::test]
async fn test_typing_not_echoed_to_sender() -> Result<(), anyhow::Error> {
    let server = TestHubServer::spawn().await?;
    let room = TestRoom::random();
    let u1 = TestUser::new("Typist");
    let u2 = TestUser::new("Reader");

    let mut a = connect_as(&server, &u1).await?;
    join(&mut a, &room, &u1).await?;
    let mut b = connect_as(&server, &u2).await?;
    join(&mut b, &room, &u2).await?;
    a.drain().await;

    a.send("typing", room.payload_with(json!({"isTyping": true})))
        .await?;
    let typing = b.expect_event("user_typing").await;
    assert_eq!(typing["userId"], u1.id.as_str());
    assert_eq!(typing["isTyping"], true);
    a.assert_no_event().await;

    Ok(())
}

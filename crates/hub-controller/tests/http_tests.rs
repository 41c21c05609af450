//! Administrative HTTP surface integration tests.
//!
//! Tests the `/status`, `/rooms` and `/message_deleted` endpoints using the
//! `TestHubServer` harness.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use hub_test_utils::{TestHubServer, TestRoom, TestUser, TestWsClient};
use serde_json::{json, Value};
use std::collections::HashMap;

#[tokio::test]
async fn test_status_reports_counts() -> Result<(), anyhow::Error> {
    let server = TestHubServer::spawn().await?;
    let user = TestUser::new("Ana");

    let mut client = TestWsClient::connect(&server.ws_url()).await?;
    client.send("authenticate", user.payload()).await?;
    client.expect_event("authenticated").await;

    let body: Value = reqwest::get(format!("{}/status", server.url()))
        .await?
        .json()
        .await?;
    assert_eq!(body["status"], "OK");
    assert_eq!(body["connections"], 1);
    assert_eq!(body["usersOnline"], 1);
    assert_eq!(body["rooms"], 0);
    assert_eq!(body["activeCalls"], 0);

    Ok(())
}

#[tokio::test]
async fn test_create_room_announces_to_connections() -> Result<(), anyhow::Error> {
    let server = TestHubServer::spawn().await?;
    let mut listener = TestWsClient::connect(&server.ws_url()).await?;
    listener
        .send("authenticate", TestUser::new("Watcher").payload())
        .await?;
    listener.expect_event("authenticated").await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/rooms", server.url()))
        .json(&json!({
            "name": "Standup",
            "creatorId": "u1",
            "creatorName": "Ana",
            "participantIds": ["u2", "u1"]
        }))
        .send()
        .await?;
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await?;
    let room_id = body["roomId"].as_str().unwrap().to_string();
    assert!(room_id.starts_with("room_"));
    assert_eq!(body["room"]["name"], "Standup");

    let participants = body["room"]["participants"].as_array().unwrap();
    assert_eq!(participants.len(), 2);
    let creator = participants.iter().find(|p| p["userId"] == "u1").unwrap();
    assert_eq!(creator["role"], "creator");
    assert_eq!(creator["active"], true);
    let member = participants.iter().find(|p| p["userId"] == "u2").unwrap();
    assert_eq!(member["role"], "member");
    assert_eq!(member["active"], false);

    let announced = listener.expect_event("room_created").await;
    assert_eq!(announced["roomId"], room_id.as_str());

    let rooms: Vec<Value> = client
        .get(format!("{}/rooms", server.url()))
        .send()
        .await?
        .json()
        .await?;
    assert!(rooms.iter().any(|r| r["id"] == room_id.as_str()));

    Ok(())
}

#[tokio::test]
async fn test_post_message_applies_defaults() -> Result<(), anyhow::Error> {
    let server = TestHubServer::spawn().await?;
    let room = TestRoom::random();
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/rooms/{}/messages", server.url(), room.id))
        .json(&json!({}))
        .send()
        .await?;
    assert_eq!(response.status(), 201);

    let message: Value = response.json().await?;
    assert_eq!(message["senderId"], "anonymous");
    assert_eq!(message["senderName"], "Anonymous User");
    assert_eq!(message["content"], "Empty message");
    assert_eq!(message["type"], "text");

    let history: Vec<Value> = client
        .get(format!("{}/rooms/{}/messages", server.url(), room.id))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["id"], message["id"]);

    Ok(())
}

#[tokio::test]
async fn test_get_messages_creates_room_lazily() -> Result<(), anyhow::Error> {
    let server = TestHubServer::spawn().await?;
    let room = TestRoom::random();

    let history: Vec<Value> = reqwest::get(format!("{}/rooms/{}/messages", server.url(), room.id))
        .await?
        .json()
        .await?;
    assert!(history.is_empty());

    let rooms: Vec<Value> = reqwest::get(format!("{}/rooms", server.url()))
        .await?
        .json()
        .await?;
    assert!(rooms.iter().any(|r| r["id"] == room.id.as_str()));

    Ok(())
}

#[tokio::test]
async fn test_administrative_delete() -> Result<(), anyhow::Error> {
    let server = TestHubServer::spawn().await?;
    let room = TestRoom::random();
    let member = TestUser::new("Member");
    let client = reqwest::Client::new();

    let mut socket = TestWsClient::connect(&server.ws_url()).await?;
    socket.send("join_room", room.join_payload(&member)).await?;
    socket.expect_event("user_joined").await;

    let message: Value = client
        .post(format!("{}/rooms/{}/messages", server.url(), room.id))
        .json(&json!({"senderId": "someone-else", "content": "oops"}))
        .send()
        .await?
        .json()
        .await?;
    let message_id = message["id"].as_str().unwrap().to_string();

    let missing = client
        .post(format!("{}/message_deleted", server.url()))
        .json(&json!({"roomId": room.id}))
        .send()
        .await?;
    assert_eq!(missing.status(), 400);
    let body: Value = missing.json().await?;
    assert_eq!(body["success"], false);

    let unknown_room = client
        .post(format!("{}/message_deleted", server.url()))
        .json(&json!({"roomId": "nowhere", "messageId": message_id}))
        .send()
        .await?;
    assert_eq!(unknown_room.status(), 404);

    let unknown_message = client
        .post(format!("{}/message_deleted", server.url()))
        .json(&json!({"roomId": room.id, "messageId": "msg_does_not_exist"}))
        .send()
        .await?;
    assert_eq!(unknown_message.status(), 404);

    // Trusted caller: no role check even though the requester is not the sender
    let deleted = client
        .post(format!("{}/message_deleted", server.url()))
        .json(&json!({"roomId": room.id, "messageId": message_id, "userId": "moderator"}))
        .send()
        .await?;
    assert_eq!(deleted.status(), 200);
    let body: Value = deleted.json().await?;
    assert_eq!(body["success"], true);

    let event = socket.expect_event("message_deleted").await;
    assert_eq!(event["messageId"], message_id.as_str());
    assert_eq!(event["deletedBy"], "moderator");

    Ok(())
}

#[tokio::test]
async fn test_voice_call_endpoints() -> Result<(), anyhow::Error> {
    let server = TestHubServer::spawn().await?;
    let room = TestRoom::random();
    let client = reqwest::Client::new();
    let call_url = format!("{}/rooms/{}/voice-call", server.url(), room.id);

    // Unknown room: inactive, and not created by the query
    let status: Value = client.get(&call_url).send().await?.json().await?;
    assert_eq!(status["active"], false);
    let rooms: Vec<Value> = client
        .get(format!("{}/rooms", server.url()))
        .send()
        .await?
        .json()
        .await?;
    assert!(rooms.is_empty());

    let absent = client
        .post(&call_url)
        .json(&json!({"callerId": "u1", "callerName": "Ana"}))
        .send()
        .await?;
    assert_eq!(absent.status(), 404);

    client
        .get(format!("{}/rooms/{}/messages", server.url(), room.id))
        .send()
        .await?;

    let missing_caller = client
        .post(&call_url)
        .json(&json!({"callerId": "u1"}))
        .send()
        .await?;
    assert_eq!(missing_caller.status(), 400);

    let started: Value = client
        .post(&call_url)
        .json(&json!({"callerId": "u1", "callerName": "Ana"}))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(started["success"], true);
    assert_eq!(started["callId"], room.id.as_str());
    assert!(started["startedAt"].is_string());

    let merged: Value = client
        .post(&call_url)
        .json(&json!({"callerId": "u2", "callerName": "Ben"}))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(merged["alreadyActive"], true);
    assert_eq!(merged["participants"], 2);

    let status: Value = client.get(&call_url).send().await?.json().await?;
    assert_eq!(status["active"], true);
    assert_eq!(status["participants"], 2);

    let end_url = format!("{call_url}/end");
    let ended = client
        .post(&end_url)
        .json(&json!({"userId": "u1", "userName": "Ana"}))
        .send()
        .await?;
    assert_eq!(ended.status(), 200);

    let again = client.post(&end_url).json(&json!({})).send().await?;
    assert_eq!(again.status(), 404);

    let status: Value = client.get(&call_url).send().await?.json().await?;
    assert_eq!(status["active"], false);

    let history: Vec<Value> = client
        .get(format!("{}/rooms/{}/messages", server.url(), room.id))
        .send()
        .await?
        .json()
        .await?;
    assert!(history
        .iter()
        .any(|m| m["content"] == "Ana ended the voice call"));

    Ok(())
}

#[tokio::test]
async fn test_room_capacity_returns_503() -> Result<(), anyhow::Error> {
    let server = TestHubServer::spawn_with_vars(HashMap::from([(
        "HUB_MAX_ROOMS".to_string(),
        "1".to_string(),
    )]))
    .await?;
    let client = reqwest::Client::new();

    let first = client
        .post(format!("{}/rooms", server.url()))
        .json(&json!({}))
        .send()
        .await?;
    assert_eq!(first.status(), 201);

    let second = client
        .post(format!("{}/rooms", server.url()))
        .json(&json!({}))
        .send()
        .await?;
    assert_eq!(second.status(), 503);

    Ok(())
}

mod common;

use common::{
    connect, connect_and_authenticate, recv_close, recv_event, send_event, start_server,
    test_state,
};
use tempfile::TempDir;

#[tokio::test]
async fn authenticate_returns_identity() {
    let dir = TempDir::new().unwrap();
    let addr = start_server(test_state(&dir)).await;

    let mut ws = connect(addr).await;
    send_event(
        &mut ws,
        "authenticate",
        serde_json::json!({ "username": "alice", "password": "pw" }),
    )
    .await;

    let data = recv_event(&mut ws, "authenticated").await;
    assert_eq!(data["success"], true);
    assert_eq!(data["user"]["username"], "alice");
    assert!(data["user"]["id"].as_str().unwrap().starts_with("usr_"));
}

#[tokio::test]
async fn wrong_password_gets_failure_reply_then_close() {
    let dir = TempDir::new().unwrap();
    let addr = start_server(test_state(&dir)).await;

    // Register alice with one password, then retry with another.
    let ws = connect_and_authenticate(addr, "alice", "right").await;
    drop(ws);

    let mut ws = connect(addr).await;
    send_event(
        &mut ws,
        "authenticate",
        serde_json::json!({ "username": "alice", "password": "wrong" }),
    )
    .await;

    let data = recv_event(&mut ws, "authenticated").await;
    assert_eq!(data["success"], false);
    assert_eq!(data["message"], "invalid credentials");

    let frame = recv_close(&mut ws).await.expect("close frame");
    assert_eq!(u16::from(frame.code), 4004);
}

#[tokio::test]
async fn first_frame_must_be_authenticate() {
    let dir = TempDir::new().unwrap();
    let addr = start_server(test_state(&dir)).await;

    let mut ws = connect(addr).await;
    send_event(&mut ws, "send-message", serde_json::json!({ "content": "hi" })).await;

    let frame = recv_close(&mut ws).await.expect("close frame");
    assert_eq!(u16::from(frame.code), 4003);
}

#[tokio::test]
async fn join_broadcasts_presence_to_existing_peers() {
    let dir = TempDir::new().unwrap();
    let addr = start_server(test_state(&dir)).await;

    let mut alice = connect_and_authenticate(addr, "alice", "pw").await;
    let _bob = connect_and_authenticate(addr, "bob", "pw").await;

    let joined = recv_event(&mut alice, "user-joined").await;
    assert_eq!(joined["username"], "bob");

    let snapshot = recv_event(&mut alice, "user-status-update").await;
    let users = snapshot["users"].as_array().unwrap();
    let names: Vec<&str> = users
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["alice", "bob"]);
    assert!(users.iter().all(|u| u["status"] == "online"));
}

#[tokio::test]
async fn disconnect_broadcasts_user_left() {
    let dir = TempDir::new().unwrap();
    let addr = start_server(test_state(&dir)).await;

    let mut alice = connect_and_authenticate(addr, "alice", "pw").await;
    let mut bob = connect_and_authenticate(addr, "bob", "pw").await;

    bob.close(None).await.unwrap();

    let left = recv_event(&mut alice, "user-left").await;
    assert_eq!(left["username"], "bob");

    let snapshot = recv_event(&mut alice, "user-status-update").await;
    let users = snapshot["users"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["username"], "alice");
}

#[tokio::test]
async fn second_login_evicts_the_first_with_notice() {
    let dir = TempDir::new().unwrap();
    let addr = start_server(test_state(&dir)).await;

    let mut first = connect_and_authenticate(addr, "alice", "pw").await;
    let _second = connect_and_authenticate(addr, "alice", "pw").await;

    let err = recv_event(&mut first, "error").await;
    assert_eq!(err["message"], "signed in from another location");

    let frame = recv_close(&mut first).await.expect("close frame");
    assert_eq!(u16::from(frame.code), 4010);
}

#[tokio::test]
async fn status_update_reaches_other_peers_as_a_delta() {
    let dir = TempDir::new().unwrap();
    let addr = start_server(test_state(&dir)).await;

    let mut alice = connect_and_authenticate(addr, "alice", "pw").await;
    let mut bob = connect_and_authenticate(addr, "bob", "pw").await;

    send_event(&mut alice, "status-update", serde_json::json!({ "status": "busy" })).await;

    let change = recv_event(&mut bob, "user-status-change").await;
    assert_eq!(change["username"], "alice");
    assert_eq!(change["status"], "busy");
}

#[tokio::test]
async fn invalid_status_gets_an_explicit_error() {
    let dir = TempDir::new().unwrap();
    let addr = start_server(test_state(&dir)).await;

    let mut alice = connect_and_authenticate(addr, "alice", "pw").await;

    send_event(
        &mut alice,
        "status-update",
        serde_json::json!({ "status": "invisible" }),
    )
    .await;

    let err = recv_event(&mut alice, "error").await;
    assert_eq!(err["message"], "unrecognized status");
}

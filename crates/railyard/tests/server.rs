//! Integration tests for the HTTP surface and the full serve loop.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use railyard::handlers::{HealthResponse, SessionResponse};
use railyard::prelude::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tower::ServiceExt;

// =========================================================================
// Helpers
// =========================================================================

fn keyring() -> Keyring {
    Keyring::from_hex(
        "00112233445566778899aabbccddeeff",
        "ffeeddccbbaa99887766554433221100",
    )
    .unwrap()
}

fn state(store: MemoryStore) -> AppState<MemoryStore> {
    let config = SessionConfig {
        ttl_secs: 3600,
        store_timeout_secs: 1,
    };
    AppState::new(SessionManager::new(store, keyring(), config))
}

async fn get(state: &AppState<MemoryStore>, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = router(state.clone())
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// =========================================================================
// GET /session
// =========================================================================

#[tokio::test]
async fn test_session_store_online_returns_both_keys() {
    let state = state(MemoryStore::new());

    let (status, body) = get(&state, "/session").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_private"], true);
    let response: SessionResponse = serde_json::from_value(body).unwrap();
    let private = response.private_key.expect("editable session exposes private key");

    let public_auth = state.auth.auth_by_key(&response.public_key.to_string()).await.unwrap();
    let private_auth = state.auth.auth_by_key(&private.to_string()).await.unwrap();
    assert!(!public_auth.editable);
    assert!(private_auth.editable);
    assert_eq!(public_auth.session.id, private_auth.session.id);
}

#[tokio::test]
async fn test_session_keys_are_sixteen_lowercase_hex_digits() {
    let state = state(MemoryStore::new());

    let (_, body) = get(&state, "/session").await;

    for field in ["public_key", "private_key"] {
        let key = body[field].as_str().unwrap();
        assert_eq!(key.len(), 16, "{field} = {key:?}");
        assert!(key.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
    }
}

#[tokio::test]
async fn test_session_store_offline_withholds_private_key() {
    let store = MemoryStore::new();
    store.set_online(false);
    let state = state(store);

    let (status, body) = get(&state, "/session").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_private"], false);
    assert!(body.get("private_key").is_none());
    let public = body["public_key"].as_str().unwrap();
    assert!(state.auth.auth_by_key(public).await.is_ok());
}

#[tokio::test]
async fn test_session_repeated_calls_issue_distinct_sessions() {
    let state = state(MemoryStore::new());

    let (_, a) = get(&state, "/session").await;
    let (_, b) = get(&state, "/session").await;

    assert_ne!(a["public_key"], b["public_key"]);
    assert_ne!(a["private_key"], b["private_key"]);
    assert_eq!(state.sessions.len(), 2);
}

// =========================================================================
// GET /health
// =========================================================================

#[tokio::test]
async fn test_health_store_online_reports_connected() {
    let state = state(MemoryStore::new());

    let (status, body) = get(&state, "/health").await;

    assert_eq!(status, StatusCode::OK);
    let health: HealthResponse = serde_json::from_value(body).unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.db, "connected");
}

#[tokio::test]
async fn test_health_store_offline_returns_500_with_reason() {
    let store = MemoryStore::new();
    store.set_online(false);
    let state = state(store);

    let (status, body) = get(&state, "/health").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error");
    assert!(body["db"].as_str().unwrap().contains("offline"));
}

#[tokio::test(start_paused = true)]
async fn test_health_store_stalled_returns_500_timed_out() {
    let store = MemoryStore::new();
    store.set_latency(Duration::from_secs(30));
    let state = state(store);
    let started = tokio::time::Instant::now();

    let (status, body) = get(&state, "/health").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error");
    assert!(body["db"].as_str().unwrap().contains("timed out"), "{body}");
    assert!(started.elapsed() < Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn test_session_store_stalled_withholds_private_key() {
    let store = MemoryStore::new();
    store.set_latency(Duration::from_secs(30));
    let state = state(store);

    let (status, body) = get(&state, "/session").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_private"], false);
    assert!(body.get("private_key").is_none());
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let state = state(MemoryStore::new());

    let response = router(state)
        .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =========================================================================
// Full serve loop
// =========================================================================

#[tokio::test]
async fn test_server_serves_over_tcp_and_shuts_down() {
    let store = MemoryStore::new();
    let server = RailyardServerBuilder::new()
        .bind("127.0.0.1:0")
        .sweep_interval(Some(Duration::from_secs(60)))
        .build(store.clone(), keyring())
        .await
        .expect("server should bind");
    let addr = server.local_addr().unwrap();
    let sessions = Arc::clone(&server.state().sessions);

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let running = tokio::spawn(server.run_until(async {
        stop_rx.await.ok();
    }));

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /session HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();

    assert!(raw.starts_with("HTTP/1.1 200"), "unexpected response: {raw}");
    assert!(raw.contains("\"is_private\":true"));
    assert_eq!(sessions.len(), 1);
    assert_eq!(store.len().await, 1);

    stop_tx.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("server should stop after the shutdown signal")
        .unwrap();
    assert!(result.is_ok());
}

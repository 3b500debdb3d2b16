//! Integration Tests for the HTTP Transport
//!
//! Control calls run against a wiremock server; the stream path runs
//! against an in-process WebSocket server, so the full wire shape is
//! exercised without the real agent backend.

use std::time::Duration;

use futures::SinkExt;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use discovery_core::{
    AgentConfig, AgentTransport, BackendConfig, HttpTransport, RequestId, TransportError,
};

fn backend_for(server: &MockServer) -> BackendConfig {
    let addr = server.address();
    BackendConfig::new(addr.ip().to_string(), addr.port())
}

// ============================================================================
// Control Calls
// ============================================================================

#[tokio::test]
async fn test_request_posts_task_and_reads_request_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/request"))
        .and(body_json(serde_json::json!({
            "task": "design an MDM2 binder",
            "config": {"maxIterations": 3},
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "requestId": "req-abc123",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(backend_for(&server));
    let id = transport
        .request("design an MDM2 binder", &AgentConfig::default())
        .await
        .unwrap();

    assert_eq!(id.as_str(), "req-abc123");
}

#[tokio::test]
async fn test_request_http_error_surfaces_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/request"))
        .respond_with(ResponseTemplate::new(503).set_body_string("agent busy"))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(backend_for(&server));
    let err = transport
        .request("test", &AgentConfig::default())
        .await
        .unwrap_err();

    match err {
        TransportError::Http { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "agent busy");
        }
        other => panic!("expected Http error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_request_rejects_malformed_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/request"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "unexpected": true,
        })))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(backend_for(&server));
    let err = transport
        .request("test", &AgentConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_request_network_failure() {
    // Nothing listens here; the request never reaches a backend.
    let transport = HttpTransport::new(BackendConfig::new("127.0.0.1", 1));
    let err = transport
        .request("test", &AgentConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Network(_)));
}

#[tokio::test]
async fn test_configure_posts_max_iterations() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/configure"))
        .and(body_json(serde_json::json!({"maxIterations": 5})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(backend_for(&server));
    transport.configure(5).await.unwrap();
}

#[tokio::test]
async fn test_stop_posts_to_request_scoped_path() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/stop/req-9"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(backend_for(&server));
    transport.stop(&RequestId::new("req-9")).await.unwrap();
}

// ============================================================================
// Stream Path
// ============================================================================

/// Serve one WebSocket connection: send the given messages, then either
/// close cleanly or drop the socket without a closing handshake.
async fn ws_server(messages: Vec<Message>, clean_close: bool) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        for message in messages {
            ws.send(message).await.unwrap();
        }
        if clean_close {
            let _ = ws.close(None).await;
        } else {
            // Let the frames flush, then vanish mid-conversation.
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    });

    port
}

#[tokio::test]
async fn test_stream_delivers_frames_in_send_order() {
    let port = ws_server(
        vec![
            Message::Text(r#"{"content": "first", "type": "status"}"#.into()),
            Message::Text(r#"{"content": "second"}"#.into()),
        ],
        true,
    )
    .await;

    let transport = HttpTransport::new(BackendConfig::new("127.0.0.1", port));
    let mut handle = transport
        .open_stream(&RequestId::new("req-1"))
        .await
        .unwrap();

    assert_eq!(handle.recv().await.unwrap().content, "first");
    assert_eq!(handle.recv().await.unwrap().content, "second");
    assert!(handle.recv().await.is_none());
}

#[tokio::test]
async fn test_stream_skips_malformed_frames() {
    let port = ws_server(
        vec![
            Message::Text("not json at all".into()),
            Message::Text(r#"{"content": "good"}"#.into()),
        ],
        true,
    )
    .await;

    let transport = HttpTransport::new(BackendConfig::new("127.0.0.1", port));
    let mut handle = transport
        .open_stream(&RequestId::new("req-2"))
        .await
        .unwrap();

    assert_eq!(handle.recv().await.unwrap().content, "good");
    assert!(handle.recv().await.is_none());
}

#[tokio::test]
async fn test_abrupt_disconnect_yields_synthetic_error_frame() {
    let port = ws_server(
        vec![Message::Text(r#"{"content": "working"}"#.into())],
        false,
    )
    .await;

    let transport = HttpTransport::new(BackendConfig::new("127.0.0.1", port));
    let mut handle = transport
        .open_stream(&RequestId::new("req-3"))
        .await
        .unwrap();

    assert_eq!(handle.recv().await.unwrap().content, "working");
    let error_frame = handle.recv().await.unwrap();
    assert!(error_frame.is_transport_error());
    assert!(handle.recv().await.is_none());
}

#[tokio::test]
async fn test_open_stream_handshake_failure() {
    let transport = HttpTransport::new(BackendConfig::new("127.0.0.1", 1));
    let err = transport
        .open_stream(&RequestId::new("req-4"))
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Handshake(_)));
}

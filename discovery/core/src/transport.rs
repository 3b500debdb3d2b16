//! Agent Backend Transport
//!
//! Communication with the remote discovery agent: one HTTP control surface
//! (request initiation, configuration, cancellation) and one WebSocket
//! stream per request delivering [`StreamFrame`]s in send order.
//!
//! # Design Philosophy
//!
//! The [`AgentTransport`] trait separates the wire from the session
//! controller so the controller can be driven by an in-process fake in
//! tests. [`StreamHandle`] is an owned resource: whoever holds it holds the
//! stream, closing is idempotent, and dropping the handle tears the reader
//! down. There is no reconnect and no retry; a dropped stream ends the
//! session and the user resubmits.

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::config::{AgentConfig, BackendConfig};
use crate::frames::StreamFrame;
use crate::session::RequestId;

/// Buffered frames per stream before the reader awaits the consumer.
const STREAM_CHANNEL_CAPACITY: usize = 100;

/// Timeout for HTTP control calls. The stream itself has no deadline; it
/// lives until the server closes it.
const CONTROL_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport-level failures.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The backend answered with a non-success HTTP status.
    #[error("backend returned {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body, for the error transcript entry.
        body: String,
    },
    /// The request never reached the backend.
    #[error("network error: {0}")]
    Network(String),
    /// The WebSocket handshake failed.
    #[error("stream handshake failed: {0}")]
    Handshake(String),
    /// The backend answered with a shape this client does not understand.
    #[error("unexpected backend response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

/// Owned handle to one open discovery stream.
///
/// Frames arrive on an internal channel fed by a background reader task.
/// The handle is the sole owner of that task: `close` (or drop) aborts the
/// reader and no further frames are delivered.
#[derive(Debug)]
pub struct StreamHandle {
    rx: mpsc::Receiver<StreamFrame>,
    reader: Option<JoinHandle<()>>,
}

impl StreamHandle {
    /// Wrap a frame channel and its optional reader task.
    #[must_use]
    pub fn new(rx: mpsc::Receiver<StreamFrame>, reader: Option<JoinHandle<()>>) -> Self {
        Self { rx, reader }
    }

    /// Receive the next frame, waiting until one arrives or the stream
    /// ends. `None` means the stream is over.
    pub async fn recv(&mut self) -> Option<StreamFrame> {
        self.rx.recv().await
    }

    /// Take a pending frame without waiting.
    ///
    /// # Errors
    ///
    /// `TryRecvError::Empty` when no frame is pending,
    /// `TryRecvError::Disconnected` when the stream has ended and all
    /// buffered frames were consumed.
    pub fn try_recv(&mut self) -> Result<StreamFrame, mpsc::error::TryRecvError> {
        self.rx.try_recv()
    }

    /// Terminate the stream. Safe to call any number of times, including
    /// after the stream already ended on its own.
    pub fn close(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        self.rx.close();
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Transport to the discovery agent backend.
///
/// Implement this trait to drive the session controller from something
/// other than the real backend (tests use a channel-backed fake).
#[async_trait]
pub trait AgentTransport: Send + Sync {
    /// Submit a discovery task. Returns the backend-issued request id that
    /// keys the stream.
    async fn request(
        &self,
        task: &str,
        config: &AgentConfig,
    ) -> Result<RequestId, TransportError>;

    /// Open the frame stream for a previously issued request.
    async fn open_stream(&self, request_id: &RequestId) -> Result<StreamHandle, TransportError>;

    /// Ask the backend to cancel a request. Best-effort and out-of-band:
    /// the stream closes when the server reacts, not when this returns.
    async fn stop(&self, request_id: &RequestId) -> Result<(), TransportError>;

    /// Push a new agent configuration to the backend.
    async fn configure(&self, max_iterations: u8) -> Result<(), TransportError>;
}

#[derive(Debug, Deserialize)]
struct RequestResponse {
    #[serde(rename = "requestId")]
    request_id: String,
}

/// The real backend transport: reqwest for control calls, a
/// tokio-tungstenite reader task for the stream.
#[derive(Clone)]
pub struct HttpTransport {
    config: BackendConfig,
    http_client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport for the given backend.
    #[must_use]
    pub fn new(config: BackendConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::builder()
                .timeout(CONTROL_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Create a transport for the backend named by the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(BackendConfig::from_env())
    }

    async fn post_checked(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, TransportError> {
        let response = self.http_client.post(url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl AgentTransport for HttpTransport {
    async fn request(
        &self,
        task: &str,
        config: &AgentConfig,
    ) -> Result<RequestId, TransportError> {
        let body = serde_json::json!({
            "task": task,
            "config": { "maxIterations": config.max_iterations },
        });
        let response = self.post_checked(&self.config.request_url(), &body).await?;
        let parsed: RequestResponse = response
            .json()
            .await
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;
        tracing::debug!(request_id = %parsed.request_id, "Discovery request accepted");
        Ok(RequestId::new(parsed.request_id))
    }

    async fn open_stream(&self, request_id: &RequestId) -> Result<StreamHandle, TransportError> {
        let url = self.config.stream_url(request_id);
        let (ws, _) = connect_async(&url)
            .await
            .map_err(|e| TransportError::Handshake(e.to_string()))?;
        tracing::debug!(request_id = %request_id, "Stream opened");

        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        let reader = tokio::spawn(async move {
            let mut ws = ws;
            while let Some(message) = ws.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        forward_frame(&tx, serde_json::from_str(&text)).await;
                    }
                    Ok(Message::Binary(bytes)) => {
                        forward_frame(&tx, serde_json::from_slice(&bytes)).await;
                    }
                    Ok(Message::Close(_)) => break,
                    // Ping/pong and raw continuation frames are the
                    // socket's business, not ours.
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "Stream transport error");
                        let _ = tx.send(StreamFrame::transport_error(e.to_string())).await;
                        break;
                    }
                }
            }
        });

        Ok(StreamHandle::new(rx, Some(reader)))
    }

    async fn stop(&self, request_id: &RequestId) -> Result<(), TransportError> {
        self.post_checked(
            &self.config.stop_url(request_id),
            &serde_json::Value::Null,
        )
        .await?;
        Ok(())
    }

    async fn configure(&self, max_iterations: u8) -> Result<(), TransportError> {
        let body = serde_json::json!({ "maxIterations": max_iterations });
        self.post_checked(&self.config.configure_url(), &body).await?;
        Ok(())
    }
}

/// Forward a parsed frame to the consumer, skipping frames that do not
/// parse. The channel closing (consumer gone) is not an error here; the
/// reader just winds down on the next send.
async fn forward_frame(
    tx: &mpsc::Sender<StreamFrame>,
    parsed: Result<StreamFrame, serde_json::Error>,
) {
    match parsed {
        Ok(frame) => {
            let _ = tx.send(frame).await;
        }
        Err(e) => {
            tracing::warn!(error = %e, "Skipping malformed stream frame");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stream_handle_close_is_idempotent() {
        let (tx, rx) = mpsc::channel(4);
        let mut handle = StreamHandle::new(rx, None);

        tx.send(StreamFrame::text("one")).await.unwrap();
        assert_eq!(handle.try_recv().unwrap().content, "one");

        handle.close();
        handle.close();
        assert!(handle.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stream_handle_drains_then_disconnects() {
        let (tx, rx) = mpsc::channel(4);
        let mut handle = StreamHandle::new(rx, None);

        tx.send(StreamFrame::text("a")).await.unwrap();
        tx.send(StreamFrame::text("b")).await.unwrap();
        drop(tx);

        assert_eq!(handle.try_recv().unwrap().content, "a");
        assert_eq!(handle.try_recv().unwrap().content, "b");
        assert!(matches!(
            handle.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::Http {
            status: 503,
            body: "overloaded".to_string(),
        };
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("overloaded"));

        let err = TransportError::Handshake("refused".to_string());
        assert!(err.to_string().contains("refused"));
    }
}

//! Configuration
//!
//! Two small configuration surfaces: where the agent backend lives
//! (host/port, resolved from the environment), and the per-session agent
//! tuning the user can edit at runtime (maximum design iterations, kept in
//! memory only for the lifetime of the session).

use thiserror::Error;

use crate::session::RequestId;

/// Smallest accepted iteration budget.
pub const MIN_ITERATIONS: u8 = 1;

/// Largest accepted iteration budget.
pub const MAX_ITERATIONS: u8 = 10;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The requested iteration budget is outside the accepted range.
    #[error("max iterations must be between {MIN_ITERATIONS} and {MAX_ITERATIONS}, got {0}")]
    InvalidMaxIterations(u8),
}

/// Runtime agent tuning, editable via the configuration dialog.
///
/// Held in memory only; nothing is persisted across runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AgentConfig {
    /// Maximum number of design iterations per request (1..=10).
    pub max_iterations: u8,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self { max_iterations: 3 }
    }
}

impl AgentConfig {
    /// Validate an iteration budget against the accepted range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidMaxIterations`] when the value is
    /// outside 1..=10.
    pub fn validate_max_iterations(value: u8) -> Result<(), ConfigError> {
        if (MIN_ITERATIONS..=MAX_ITERATIONS).contains(&value) {
            Ok(())
        } else {
            Err(ConfigError::InvalidMaxIterations(value))
        }
    }
}

/// Where the agent backend lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendConfig {
    /// Backend host address.
    pub host: String,
    /// Backend port number.
    pub port: u16,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8000,
        }
    }
}

impl BackendConfig {
    /// Create a backend configuration.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Create from environment variables (`PROTOGEN_HOST`, `PROTOGEN_PORT`),
    /// falling back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let host = std::env::var("PROTOGEN_HOST").unwrap_or(defaults.host);
        let port = std::env::var("PROTOGEN_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.port);
        Self { host, port }
    }

    /// Base URL for HTTP control calls.
    #[must_use]
    pub fn http_base(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Endpoint that initiates a discovery request.
    #[must_use]
    pub fn request_url(&self) -> String {
        format!("{}/api/chat/request", self.http_base())
    }

    /// Endpoint that updates the agent configuration.
    #[must_use]
    pub fn configure_url(&self) -> String {
        format!("{}/api/chat/configure", self.http_base())
    }

    /// Endpoint that requests best-effort cancellation of a request.
    #[must_use]
    pub fn stop_url(&self, request_id: &RequestId) -> String {
        format!("{}/api/chat/stop/{}", self.http_base(), request_id)
    }

    /// WebSocket endpoint delivering the stream for a request.
    #[must_use]
    pub fn stream_url(&self, request_id: &RequestId) -> String {
        format!(
            "ws://{}:{}/api/chat/stream/{}",
            self.host, self.port, request_id
        )
    }
}

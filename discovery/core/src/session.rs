//! Discovery Sessions
//!
//! A session is the lifecycle object for one outstanding discovery request
//! and its stream. It owns the visible transcript, which is append-only:
//! insertion order is arrival order, nothing is reordered or deduplicated.
//!
//! # Design Philosophy
//!
//! The transcript outlives individual requests: submitting a follow-up task
//! starts a new request lifecycle (fresh request id, fresh state) inside
//! the same visible conversation, exactly as the original chat surface
//! behaved. Only an explicit clear resets the transcript to the welcome
//! greeting.

use serde::{Deserialize, Serialize};

use crate::transcript::ChatEvent;

/// Opaque request identifier issued by the backend.
///
/// Valid for the lifetime of one stream; the controller clears it when the
/// stream ends.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    /// Wrap a backend-issued identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a discovery session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No request outstanding; input is live.
    Idle,
    /// Initiating request sent, stream not yet open.
    Requesting,
    /// Stream open, frames arriving.
    Streaming,
    /// Stream ended normally or was stopped by the user.
    Closed,
    /// Request initiation or transport failed.
    Failed,
}

impl SessionState {
    /// Whether a request is in flight (submit must be rejected).
    #[must_use]
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Requesting | Self::Streaming)
    }

    /// Whether this state is terminal for the current request.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }
}

/// One discovery conversation: transcript plus current request lifecycle.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    /// Identifier of the outstanding request, if any.
    request_id: Option<RequestId>,
    /// Current lifecycle state.
    state: SessionState,
    /// Append-only transcript, insertion order = arrival order.
    history: Vec<ChatEvent>,
}

impl Session {
    /// Create a fresh session holding only the welcome greeting.
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: None,
            state: SessionState::Idle,
            history: vec![ChatEvent::welcome()],
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Set the lifecycle state.
    pub fn set_state(&mut self, state: SessionState) {
        self.state = state;
    }

    /// The outstanding request id, if a request is in flight.
    #[must_use]
    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    /// Record the backend-issued id for the current request.
    pub fn set_request_id(&mut self, id: RequestId) {
        self.request_id = Some(id);
    }

    /// Drop the request id when its stream is gone.
    pub fn clear_request_id(&mut self) {
        self.request_id = None;
    }

    /// Append a transcript entry.
    pub fn append(&mut self, event: ChatEvent) {
        self.history.push(event);
    }

    /// The full transcript in insertion order.
    #[must_use]
    pub fn history(&self) -> &[ChatEvent] {
        &self.history
    }

    /// Number of transcript entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Whether the transcript is empty. Never true in practice: a fresh
    /// session starts with the welcome greeting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Discard everything and return to the initial welcome state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Begin a new request lifecycle inside this conversation: drops any
    /// stale request id and moves to Requesting. The transcript is kept.
    pub fn begin_request(&mut self) {
        self.request_id = None;
        self.state = SessionState::Requesting;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

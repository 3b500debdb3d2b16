//! Inbound Stream Frames
//!
//! Wire types for the JSON frames the agent backend delivers over the
//! per-request stream. Each frame carries display text, an optional `type`
//! discriminator, an optional structured `data` object, and an optional
//! inline structure payload (`pdbContent`).
//!
//! # Design Philosophy
//!
//! Frames are kept close to the wire: `data` stays a raw JSON map so that
//! fields this layer does not know about pass through untouched. Typed
//! access to the well-known fields happens in [`crate::transcript`], where
//! the payload model lives.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One JSON-shaped message delivered over the discovery stream.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StreamFrame {
    /// Display text for the transcript.
    #[serde(default)]
    pub content: String,
    /// Frame type discriminator. Absent on legacy plain-text frames.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Structured payload; shape depends on the discriminator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
    /// Inline structure payload, handed whole to the render surface.
    #[serde(rename = "pdbContent", default, skip_serializing_if = "Option::is_none")]
    pub pdb_content: Option<String>,
}

/// Marker the transport puts in synthetic error frames so the controller
/// can tell a dead stream apart from a backend-reported error.
pub(crate) const TRANSPORT_ERROR_TYPE: &str = "transport";

impl StreamFrame {
    /// Create a plain text frame (legacy backend shape, no discriminator).
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// Create the synthetic error frame the transport injects when the
    /// connection fails before or during streaming.
    ///
    /// The frame classifies like any backend error frame, but carries a
    /// transport marker in `data.error_type` so the session controller
    /// knows the stream is gone and the session must fail.
    pub fn transport_error(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        let mut data = Map::new();
        data.insert(
            "error_type".to_string(),
            Value::String(TRANSPORT_ERROR_TYPE.to_string()),
        );
        data.insert("error_details".to_string(), Value::String(detail.clone()));
        Self {
            content: format!("Connection error: {detail}"),
            kind: Some("error".to_string()),
            data: Some(data),
            pdb_content: None,
        }
    }

    /// Whether this frame is a synthetic transport error (as opposed to an
    /// application error reported by the backend).
    #[must_use]
    pub fn is_transport_error(&self) -> bool {
        self.kind.as_deref() == Some("error")
            && self
                .data
                .as_ref()
                .and_then(|d| d.get("error_type"))
                .and_then(Value::as_str)
                == Some(TRANSPORT_ERROR_TYPE)
    }

    /// The parsed discriminator, if the frame carries a known one.
    #[must_use]
    pub fn frame_kind(&self) -> Option<FrameKind> {
        self.kind.as_deref().and_then(FrameKind::parse)
    }
}

/// Known values of the frame `type` discriminator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameKind {
    /// Pipeline stage update.
    Status,
    /// Prompt sent to the LLM (not surfaced verbatim).
    Prompt,
    /// Raw LLM response (not surfaced verbatim).
    Response,
    /// Start of a design iteration.
    Iteration,
    /// Per-candidate results for one completed iteration.
    IterationResults,
    /// Current best design with sequence and binding score.
    DesignResults,
    /// Backend-reported application error.
    Error,
}

impl FrameKind {
    /// Parse a discriminator string. Unknown values yield `None`, which the
    /// classifier treats as a plain assistant turn for backward
    /// compatibility with the legacy text-only backend.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "status" => Some(Self::Status),
            "prompt" => Some(Self::Prompt),
            "response" => Some(Self::Response),
            "iteration" => Some(Self::Iteration),
            "iteration_results" => Some(Self::IterationResults),
            "design_results" => Some(Self::DesignResults),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// The wire name of this discriminator.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Prompt => "prompt",
            Self::Response => "response",
            Self::Iteration => "iteration",
            Self::IterationResults => "iteration_results",
            Self::DesignResults => "design_results",
            Self::Error => "error",
        }
    }
}

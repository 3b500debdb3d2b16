//! Frame Classification
//!
//! Maps raw inbound stream frames to transcript events. Classification is a
//! pure function: same frame in, same event out, no side effects. The
//! session controller decides what else a frame triggers (candidate
//! notices, structure updates); this module only shapes the transcript
//! entry.

use crate::frames::{FrameKind, StreamFrame};
use crate::transcript::{ChatEvent, ChatEventKind, EventPayload};

/// Prefix for iteration markers in the transcript.
pub const ITERATION_MARKER: &str = ">> ";

/// Prefix for error entries in the transcript.
pub const ERROR_MARKER: &str = "[!] ";

/// Literal the legacy backend put in frames announcing a new candidate.
/// Matched case-sensitively, exactly as the original frontend did.
pub const CANDIDATE_MARKER: &str = "promising candidate";

/// Text shown in place of raw prompt/response traffic.
const PROCESSING_TEXT: &str = "Processing...";

/// Classify a raw frame into a transcript event.
///
/// Total over all discriminator values: every known kind has exactly one
/// target shape, and frames with an absent or unknown kind become plain
/// assistant turns (the legacy backend sent untyped text frames).
#[must_use]
pub fn classify(frame: &StreamFrame) -> ChatEvent {
    let payload = frame.data.as_ref().map(EventPayload::from_data);

    match frame.frame_kind() {
        None => ChatEvent::assistant(frame.content.clone()),
        Some(FrameKind::Status) => {
            let event = ChatEvent::system(frame.content.clone()).with_kind(ChatEventKind::Status);
            attach(event, payload)
        }
        // Raw prompt/response traffic is intentionally not surfaced
        // verbatim; the transcript only shows that work is happening.
        Some(FrameKind::Prompt | FrameKind::Response) => {
            let event = ChatEvent::system(PROCESSING_TEXT).with_kind(ChatEventKind::Status);
            attach(event, payload)
        }
        Some(FrameKind::Iteration) => {
            let event = ChatEvent::system(format!("{ITERATION_MARKER}{}", frame.content))
                .with_kind(ChatEventKind::Iteration);
            attach(event, payload)
        }
        Some(FrameKind::IterationResults) => {
            let payload = payload.unwrap_or_default().completed();
            ChatEvent::assistant(frame.content.clone())
                .with_kind(ChatEventKind::IterationResults)
                .with_payload(payload)
        }
        Some(FrameKind::DesignResults) => {
            let payload = payload.unwrap_or_default().completed();
            ChatEvent::assistant(frame.content.clone())
                .with_kind(ChatEventKind::DesignResults)
                .with_payload(payload)
        }
        Some(FrameKind::Error) => {
            let event = ChatEvent::system(format!("{ERROR_MARKER}{}", frame.content))
                .with_kind(ChatEventKind::Error);
            attach(event, payload)
        }
    }
}

fn attach(event: ChatEvent, payload: Option<EventPayload>) -> ChatEvent {
    match payload {
        Some(payload) => event.with_payload(payload),
        None => event,
    }
}

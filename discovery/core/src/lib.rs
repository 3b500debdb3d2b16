//! Discovery Core - Headless Session Engine for Protogen
//!
//! This crate contains everything about talking to the protein-discovery
//! agent backend and reducing its event stream into UI state, completely
//! independent of any UI framework. It can drive a TUI, a web surface, or
//! run headless for testing.
//!
//! # Architecture
//!
//! ```text
//! user task ──> DiscoveryController ──> AgentTransport ──> backend
//!                      │                      │
//!                      │   StreamFrame (arrival order)
//!                      │<─────────────────────┘
//!                classify() ──> ChatEvent ──> Session history
//!                      │
//!                      ├── LabNotice::CandidateFound ──> toast surface
//!                      └── LabNotice::StructureUpdate ─> DesignHistory
//!                                                        StructureView
//! ```
//!
//! # Key Types
//!
//! - [`DiscoveryController`]: lifecycle of one discovery request and its
//!   stream, reduced into an ordered transcript
//! - [`AgentTransport`] / [`HttpTransport`]: control calls plus the
//!   per-request WebSocket frame stream
//! - [`classify`]: pure mapping from raw frames to transcript events
//! - [`Session`]: transcript plus request lifecycle state
//! - [`DesignHistory`]: append-only store of structure snapshots
//! - [`StructureView`]: facade over an external molecular renderer with
//!   last-load-wins semantics
//!
//! # No UI Dependencies
//!
//! This crate has **zero** dependencies on ratatui, crossterm, or any
//! other UI framework. It's pure session logic that can be used anywhere.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod classify;
pub mod config;
pub mod controller;
pub mod frames;
pub mod history;
pub mod render;
pub mod session;
pub mod transcript;
pub mod transport;

// Re-exports for convenience
pub use classify::{classify, CANDIDATE_MARKER, ERROR_MARKER, ITERATION_MARKER};
pub use config::{AgentConfig, BackendConfig, ConfigError, MAX_ITERATIONS, MIN_ITERATIONS};
pub use controller::{DiscoveryController, LabNotice, DEFAULT_IDLE_TIMEOUT};
pub use frames::{FrameKind, StreamFrame};
pub use history::{DesignHistory, DesignSnapshot, SnapshotId, SnapshotMetadata};
pub use render::{
    CommandLog, HeadlessEngine, RenderCommand, RenderEngine, RenderError, Representation,
    StructureView, DEFAULT_PDB,
};
pub use session::{RequestId, Session, SessionState};
pub use transcript::{
    CandidateResult, ChatEvent, ChatEventKind, ChatRole, EventPayload, WELCOME_TEXT,
};
pub use transport::{AgentTransport, HttpTransport, StreamHandle, TransportError};

//! Discovery Session Controller
//!
//! Owns the lifecycle of one discovery request: submits the task, opens the
//! stream, reduces inbound frames into the ordered transcript, and raises
//! side-channel notices for collaborators (candidate toasts, structure
//! updates).
//!
//! # Design Philosophy
//!
//! All state transitions happen on the caller's task: the UI loop calls
//! [`DiscoveryController::poll_stream`] each tick, so frames are processed
//! in arrival order with no locking. The controller is the sole holder of
//! the stream handle; submit, stop, and clear are the only operations that
//! touch it. Notices are fire-and-forget: a slow consumer drops them, it
//! never blocks frame processing.

use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use crate::classify::{classify, CANDIDATE_MARKER};
use crate::config::AgentConfig;
use crate::history::SnapshotMetadata;
use crate::session::{Session, SessionState};
use crate::transcript::{ChatEvent, ChatEventKind};
use crate::transport::{AgentTransport, StreamHandle};

/// How long a silent stream may stay open before the session fails.
/// Zero disables the check.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(120);

/// Fire-and-forget notice to collaborating surfaces.
///
/// At most one `CandidateFound` and one `StructureUpdate` is raised per
/// qualifying frame.
#[derive(Clone, Debug)]
pub enum LabNotice {
    /// A frame announced a new design candidate.
    CandidateFound {
        /// Sequence of the candidate, when the frame carried one.
        sequence: Option<String>,
        /// Binding score of the candidate, when the frame carried one.
        binding_score: Option<f64>,
    },
    /// A frame carried an inline structure payload.
    StructureUpdate {
        /// Raw structure text for the render surface.
        structure: String,
        /// Metadata captured from the frame.
        metadata: SnapshotMetadata,
    },
    /// The session lifecycle state changed.
    StateChanged(SessionState),
}

/// The controller for one discovery conversation.
pub struct DiscoveryController<T: AgentTransport> {
    /// Transport to the agent backend.
    transport: T,
    /// In-memory agent tuning.
    config: AgentConfig,
    /// The conversation: transcript + request lifecycle.
    session: Session,
    /// The open stream, exclusively owned here.
    stream: Option<StreamHandle>,
    /// Notice channel to the UI.
    tx: mpsc::Sender<LabNotice>,
    /// Arrival time of the most recent frame (or stream open).
    last_frame_at: Option<Instant>,
    /// Idle window after which a silent stream fails the session.
    idle_timeout: Duration,
    /// Whether the current stream died with a transport error.
    stream_failed: bool,
}

impl<T: AgentTransport> DiscoveryController<T> {
    /// Create a controller over the given transport.
    pub fn new(transport: T, config: AgentConfig, tx: mpsc::Sender<LabNotice>) -> Self {
        Self {
            transport,
            config,
            session: Session::new(),
            stream: None,
            tx,
            last_frame_at: None,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            stream_failed: false,
        }
    }

    /// Override the idle timeout (zero disables it).
    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// The conversation session.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The transcript in insertion order.
    #[must_use]
    pub fn history(&self) -> &[ChatEvent] {
        self.session.history()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Current agent tuning.
    #[must_use]
    pub fn config(&self) -> AgentConfig {
        self.config
    }

    /// Submit a discovery task.
    ///
    /// A no-op while a request is in flight or when the task is blank.
    /// Otherwise tears down any prior stream, appends the user turn, issues
    /// the initiating request, and opens the stream. Failures surface as a
    /// single error transcript entry and a Failed session; input stays
    /// live for a resubmit.
    pub async fn submit(&mut self, task: &str) {
        if self.session.state().is_busy() {
            tracing::debug!("Submit ignored: request already in flight");
            return;
        }
        let task = task.trim();
        if task.is_empty() {
            tracing::debug!("Submit ignored: blank task");
            return;
        }

        self.teardown_stream();
        self.session.append(ChatEvent::user(task));
        self.session.begin_request();
        self.notify(LabNotice::StateChanged(SessionState::Requesting));

        let request_id = match self.transport.request(task, &self.config).await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(error = %e, "Discovery request failed");
                self.session.append(ChatEvent::error(format!(
                    "Failed to connect to the server. Please make sure the API server is running. ({e})"
                )));
                self.set_state(SessionState::Failed);
                return;
            }
        };
        self.session.set_request_id(request_id.clone());

        match self.transport.open_stream(&request_id).await {
            Ok(handle) => {
                self.stream = Some(handle);
                self.stream_failed = false;
                self.last_frame_at = Some(Instant::now());
                self.set_state(SessionState::Streaming);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Stream open failed");
                self.session.append(ChatEvent::error(format!(
                    "Connection error. Please try again. ({e})"
                )));
                self.session.clear_request_id();
                self.set_state(SessionState::Failed);
            }
        }
    }

    /// Drain pending frames from the stream, in arrival order.
    ///
    /// Call regularly from the UI loop. Also watches for the stream ending
    /// (normal close vs transport failure) and for the idle timeout.
    pub fn poll_stream(&mut self) {
        let mut frames = Vec::new();
        let mut disconnected = false;

        match self.stream.as_mut() {
            Some(stream) => loop {
                match stream.try_recv() {
                    Ok(frame) => frames.push(frame),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        disconnected = true;
                        break;
                    }
                }
            },
            None => return,
        }

        for frame in frames {
            self.handle_frame(frame);
        }

        if disconnected {
            self.finish_stream();
        } else {
            self.check_idle_timeout();
        }
    }

    /// Ask the backend to cancel the outstanding request.
    ///
    /// A no-op unless the session is streaming. Cancellation is
    /// best-effort; the local stream is torn down regardless of whether
    /// the backend acknowledged.
    pub async fn stop(&mut self) {
        if self.session.state() != SessionState::Streaming {
            tracing::debug!("Stop ignored: nothing streaming");
            return;
        }

        if let Some(request_id) = self.session.request_id().cloned() {
            if let Err(e) = self.transport.stop(&request_id).await {
                tracing::warn!(error = %e, "Stop request failed; closing stream anyway");
            }
        }

        self.session
            .append(ChatEvent::system("Discovery stopped by user."));
        self.teardown_stream();
        self.session.clear_request_id();
        self.set_state(SessionState::Closed);
    }

    /// Discard the conversation and return to the initial welcome state.
    /// Safe in every state, including mid-stream.
    pub fn clear(&mut self) {
        self.teardown_stream();
        self.session.reset();
        self.notify(LabNotice::StateChanged(SessionState::Idle));
    }

    /// Update the agent's iteration budget.
    ///
    /// Invalid values and backend rejections surface as an error transcript
    /// entry; the previous value stays in effect.
    pub async fn configure(&mut self, max_iterations: u8) {
        if let Err(e) = AgentConfig::validate_max_iterations(max_iterations) {
            self.session
                .append(ChatEvent::error(format!("Configuration not saved: {e}")));
            return;
        }
        match self.transport.configure(max_iterations).await {
            Ok(()) => {
                self.config.max_iterations = max_iterations;
                self.session.append(ChatEvent::system(format!(
                    "Agent configuration updated: max iterations = {max_iterations}."
                )));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Configuration update failed");
                self.session.append(ChatEvent::error(format!(
                    "Configuration not saved: {e}"
                )));
            }
        }
    }

    /// Reduce one frame into the transcript and raise notices.
    fn handle_frame(&mut self, frame: crate::frames::StreamFrame) {
        self.last_frame_at = Some(Instant::now());
        if frame.is_transport_error() {
            self.stream_failed = true;
        }

        let event = classify(&frame);

        if event.kind == Some(ChatEventKind::DesignResults) {
            let payload = event.payload.as_ref();
            self.notify(LabNotice::CandidateFound {
                sequence: payload.and_then(|p| p.sequence.clone()),
                binding_score: payload.and_then(|p| p.binding_score),
            });
        } else if frame.content.contains(CANDIDATE_MARKER) {
            // Legacy text-marker path: the structured discriminator takes
            // precedence, so a frame never fires twice.
            self.notify(LabNotice::CandidateFound {
                sequence: None,
                binding_score: None,
            });
        }

        if let Some(structure) = frame.pdb_content.clone() {
            let metadata = event
                .payload
                .as_ref()
                .map(SnapshotMetadata::from_payload)
                .unwrap_or_default();
            self.notify(LabNotice::StructureUpdate {
                structure,
                metadata,
            });
        }

        // Backend-reported errors are informational; only synthetic
        // transport errors end the session, and that happens when the
        // channel closes right behind them.
        self.session.append(event);
    }

    /// The stream channel closed: settle the session.
    fn finish_stream(&mut self) {
        self.stream = None;
        self.session.clear_request_id();
        if self.stream_failed {
            tracing::info!("Stream ended after transport error");
            self.set_state(SessionState::Failed);
        } else {
            tracing::info!("Stream closed");
            self.set_state(SessionState::Closed);
        }
    }

    /// Fail a silent stream once the idle window elapses.
    fn check_idle_timeout(&mut self) {
        if self.idle_timeout.is_zero() || self.session.state() != SessionState::Streaming {
            return;
        }
        let idle = self
            .last_frame_at
            .map(|at| at.elapsed())
            .unwrap_or_default();
        if idle >= self.idle_timeout {
            tracing::warn!(?idle, "Stream idle timeout");
            self.session.append(ChatEvent::error(
                "No updates from the server; the stream timed out. Please try again.",
            ));
            self.teardown_stream();
            self.session.clear_request_id();
            self.set_state(SessionState::Failed);
        }
    }

    fn teardown_stream(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.close();
        }
        self.stream_failed = false;
        self.last_frame_at = None;
    }

    fn set_state(&mut self, state: SessionState) {
        self.session.set_state(state);
        self.notify(LabNotice::StateChanged(state));
    }

    /// Non-blocking notice delivery. A full channel drops the notice;
    /// frame processing never waits on the UI.
    fn notify(&self, notice: LabNotice) {
        if let Err(e) = self.tx.try_send(notice) {
            tracing::debug!(error = %e, "Dropping lab notice");
        }
    }
}

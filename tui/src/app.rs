//! Main Application
//!
//! The App struct manages the TUI lifecycle as a thin display client:
//! - Event loop (keyboard, resize)
//! - DiscoveryController for the session and its stream
//! - DesignHistory + StructureView for the structure side panels
//!
//! # Architecture
//!
//! The App forwards input to the controller, polls the stream each frame,
//! and applies [`LabNotice`]s to the collaborating surfaces: candidate
//! notices become toasts, structure updates land in the design history and
//! the render surface. Rendering itself lives in [`crate::ui`].

use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::Terminal;
use tokio::sync::mpsc;

use discovery_core::{
    AgentConfig, AgentTransport, CommandLog, DesignHistory, DiscoveryController, HeadlessEngine,
    LabNotice, SnapshotId, StructureView, DEFAULT_PDB, MAX_ITERATIONS, MIN_ITERATIONS,
};

use crate::ui;

/// How long a candidate toast stays on screen.
const TOAST_TTL: Duration = Duration::from_secs(5);

/// Relative zoom applied per keypress.
const ZOOM_STEP: f32 = 0.2;

/// Notices buffered between frames before the controller starts dropping.
const NOTICE_CHANNEL_CAPACITY: usize = 256;

/// Which pane the non-global keys act on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Focus {
    /// Keys type into the task input; PageUp/PageDown scroll the transcript.
    #[default]
    Chat,
    /// Up/Down walk the design timeline; +/- zoom the structure.
    Structure,
}

impl Focus {
    fn toggle(self) -> Self {
        match self {
            Self::Chat => Self::Structure,
            Self::Structure => Self::Chat,
        }
    }
}

/// Candidate announcement shown briefly over the structure panel.
#[derive(Clone, Debug)]
pub struct Toast {
    /// Headline line.
    pub title: String,
    /// Second line, carrying sequence/score when the frame had them.
    pub detail: String,
    shown_at: Instant,
}

impl Toast {
    fn candidate(sequence: Option<String>, binding_score: Option<f64>) -> Self {
        let detail = match (sequence, binding_score) {
            (Some(seq), Some(score)) => format!("{} ({score:.1})", shorten(&seq, 18)),
            (Some(seq), None) => shorten(&seq, 24),
            _ => "View Update?".to_string(),
        };
        Self {
            title: "A new candidate is ready".to_string(),
            detail,
            shown_at: Instant::now(),
        }
    }

    fn is_expired(&self) -> bool {
        self.shown_at.elapsed() >= TOAST_TTL
    }
}

fn shorten(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max).collect();
        format!("{head}…")
    }
}

/// Editable state of the agent configuration dialog.
#[derive(Clone, Copy, Debug)]
pub struct ConfigModal {
    /// Candidate value, committed on Enter.
    pub value: u8,
}

impl ConfigModal {
    fn new(value: u8) -> Self {
        Self { value }
    }

    fn increment(&mut self) {
        if self.value < MAX_ITERATIONS {
            self.value += 1;
        }
    }

    fn decrement(&mut self) {
        if self.value > MIN_ITERATIONS {
            self.value -= 1;
        }
    }
}

/// Main application state.
pub struct App<T: AgentTransport> {
    /// Is the app still running?
    pub(crate) running: bool,
    /// Session controller; sole owner of the stream.
    pub(crate) controller: DiscoveryController<T>,
    /// Notice channel from the controller.
    notices: mpsc::Receiver<LabNotice>,
    /// Recorded structure snapshots for the timeline.
    pub(crate) history: DesignHistory,
    /// Facade over the render engine.
    pub(crate) view: StructureView<HeadlessEngine>,
    /// Engine call log, shown in the status line.
    pub(crate) render_log: CommandLog,
    /// User input buffer.
    pub(crate) input_buffer: String,
    /// Transcript scroll offset (lines from bottom, 0 = latest).
    pub(crate) scroll_offset: usize,
    /// Total rendered transcript lines (for scroll bounds).
    pub(crate) total_lines: usize,
    /// Which pane the non-global keys act on.
    pub(crate) focus: Focus,
    /// Open configuration dialog, if any.
    pub(crate) modal: Option<ConfigModal>,
    /// Active candidate toast, if any.
    pub(crate) toast: Option<Toast>,
    /// Terminal size, updated on resize and render.
    pub(crate) size: (u16, u16),
}

impl<T: AgentTransport> App<T> {
    /// Create an App over the given backend transport.
    pub fn new(transport: T) -> Self {
        let (tx, notices) = mpsc::channel(NOTICE_CHANNEL_CAPACITY);
        let controller = DiscoveryController::new(transport, AgentConfig::default(), tx);
        let engine = HeadlessEngine::new();
        let render_log = engine.log();
        Self {
            running: true,
            controller,
            notices,
            history: DesignHistory::new(),
            view: StructureView::new(engine),
            render_log,
            input_buffer: String::new(),
            scroll_offset: 0,
            total_lines: 0,
            focus: Focus::default(),
            modal: None,
            toast: None,
            size: (80, 24),
        }
    }

    /// Main event loop.
    pub async fn run(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> anyhow::Result<()> {
        // ~10 FPS is plenty for a transcript that updates per stream frame.
        let frame_duration = Duration::from_millis(100);
        let mut event_stream = EventStream::new();

        // Show the demo helix until discovery produces a real structure.
        if let Err(e) = self.view.load(DEFAULT_PDB.to_string()).await {
            tracing::warn!(error = %e, "Demo structure load failed");
        }
        self.render(terminal)?;

        while self.running {
            let frame_start = Instant::now();

            tokio::select! {
                biased;

                maybe_event = event_stream.next() => {
                    if let Some(Ok(event)) = maybe_event {
                        match event {
                            // Only handle Press events (not Release or Repeat)
                            Event::Key(key) if key.kind == KeyEventKind::Press => {
                                self.handle_key(key).await;
                            }
                            Event::Resize(w, h) => self.size = (w, h),
                            _ => {}
                        }
                    }
                }

                _ = tokio::time::sleep(Duration::from_millis(16)) => {}
            }

            self.tick().await;
            self.render(terminal)?;

            // Frame rate limiting
            let elapsed = frame_start.elapsed();
            if elapsed < frame_duration {
                tokio::time::sleep(frame_duration - elapsed).await;
            }
        }

        Ok(())
    }

    /// One frame's worth of non-input work: drain the stream, apply
    /// notices, expire the toast.
    pub async fn tick(&mut self) {
        self.controller.poll_stream();
        self.process_notices().await;
        if self.toast.as_ref().is_some_and(Toast::is_expired) {
            self.toast = None;
        }
    }

    /// Render the current state.
    pub fn render<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> anyhow::Result<()> {
        terminal.draw(|frame| ui::draw(frame, self))?;
        Ok(())
    }

    /// Apply all pending controller notices to the side surfaces.
    async fn process_notices(&mut self) {
        while let Ok(notice) = self.notices.try_recv() {
            match notice {
                LabNotice::CandidateFound {
                    sequence,
                    binding_score,
                } => {
                    self.toast = Some(Toast::candidate(sequence, binding_score));
                }
                LabNotice::StructureUpdate {
                    structure,
                    metadata,
                } => {
                    self.history.record(structure.clone(), metadata);
                    if let Err(e) = self.view.load(structure).await {
                        tracing::warn!(error = %e, "Structure load failed");
                    }
                }
                LabNotice::StateChanged(state) => {
                    tracing::debug!(?state, "Session state changed");
                }
            }
        }
    }

    /// Handle one key press.
    pub async fn handle_key(&mut self, key: KeyEvent) {
        if self.modal.is_some() {
            self.handle_modal_key(key).await;
            return;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => self.running = false,
            KeyCode::Char('l') if ctrl => {
                // Clears the conversation only; recorded designs stay.
                self.controller.clear();
                self.scroll_offset = 0;
            }
            KeyCode::Char('x') if ctrl => self.controller.stop().await,
            KeyCode::Char('g') if ctrl => {
                self.modal = Some(ConfigModal::new(self.controller.config().max_iterations));
            }
            KeyCode::Char('r') if ctrl => self.view.reset_view().await,
            KeyCode::Tab => {
                let next = self.view.style().next();
                self.view.set_representation(next).await;
            }
            KeyCode::F(2) => self.focus = self.focus.toggle(),
            KeyCode::Esc => self.toast = None,
            KeyCode::Enter => self.submit_input().await,
            KeyCode::PageUp => {
                let page = (self.size.1 / 2) as usize;
                let max_scroll = self.total_lines.saturating_sub(1);
                self.scroll_offset = (self.scroll_offset + page).min(max_scroll);
            }
            KeyCode::PageDown => {
                let page = (self.size.1 / 2) as usize;
                self.scroll_offset = self.scroll_offset.saturating_sub(page);
            }
            _ if self.focus == Focus::Structure => self.handle_structure_key(key).await,
            KeyCode::Char(c) => self.input_buffer.push(c),
            KeyCode::Backspace => {
                self.input_buffer.pop();
            }
            _ => {}
        }
    }

    async fn handle_modal_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.modal = None,
            KeyCode::Up | KeyCode::Char('+') => {
                if let Some(modal) = self.modal.as_mut() {
                    modal.increment();
                }
            }
            KeyCode::Down | KeyCode::Char('-') => {
                if let Some(modal) = self.modal.as_mut() {
                    modal.decrement();
                }
            }
            KeyCode::Enter => {
                if let Some(modal) = self.modal.take() {
                    self.controller.configure(modal.value).await;
                }
            }
            _ => {}
        }
    }

    async fn handle_structure_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('+') | KeyCode::Char('=') => self.view.zoom(ZOOM_STEP).await,
            KeyCode::Char('-') => self.view.zoom(-ZOOM_STEP).await,
            KeyCode::Up => self.select_neighbor(-1).await,
            KeyCode::Down => self.select_neighbor(1).await,
            _ => {}
        }
    }

    async fn submit_input(&mut self) {
        // Keep the typed task if a request is still in flight.
        if self.controller.state().is_busy() {
            return;
        }
        let task = std::mem::take(&mut self.input_buffer);
        self.controller.submit(&task).await;
        self.scroll_offset = 0;
    }

    /// Move the timeline selection and show the newly selected structure.
    async fn select_neighbor(&mut self, delta: isize) {
        let ids: Vec<SnapshotId> = self.history.iter().map(|s| s.id).collect();
        if ids.is_empty() {
            return;
        }
        let index = self
            .history
            .selected_id()
            .and_then(|id| ids.iter().position(|&x| x == id));
        let next = match index {
            Some(i) => {
                let last = ids.len() as isize - 1;
                (i as isize + delta).clamp(0, last) as usize
            }
            None if delta < 0 => ids.len() - 1,
            None => 0,
        };
        let Some(structure) = self.history.select(ids[next]).map(|s| s.structure.clone()) else {
            return;
        };
        if let Err(e) = self.view.load(structure).await {
            tracing::warn!(error = %e, "Structure load failed");
        }
    }

    // === Accessors for the surface and tests ===

    /// The session controller.
    #[must_use]
    pub fn controller(&self) -> &DiscoveryController<T> {
        &self.controller
    }

    /// The design snapshot timeline.
    #[must_use]
    pub fn design_history(&self) -> &DesignHistory {
        &self.history
    }

    /// The structure render facade.
    #[must_use]
    pub fn structure_view(&self) -> &StructureView<HeadlessEngine> {
        &self.view
    }

    /// The render engine's call log.
    #[must_use]
    pub fn render_log(&self) -> &CommandLog {
        &self.render_log
    }

    /// The current input buffer contents.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input_buffer
    }

    /// The active toast, if one is showing.
    #[must_use]
    pub fn toast(&self) -> Option<&Toast> {
        self.toast.as_ref()
    }

    /// The open configuration dialog, if any.
    #[must_use]
    pub fn config_modal(&self) -> Option<&ConfigModal> {
        self.modal.as_ref()
    }

    /// Whether the event loop is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }
}

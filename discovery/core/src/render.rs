//! Structure Render Surface
//!
//! Thin facade over an external molecular rendering engine. This layer
//! never parses structure text: whatever the backend sent is handed to the
//! engine whole, and format correctness is the engine's problem.
//!
//! # Design Philosophy
//!
//! Loading is asynchronous and may race a later load for a newer
//! structure. [`StructureView`] gives every load a ticket and checks it
//! after the engine finishes: a superseded in-flight load is discarded,
//! never rendered, so the surface always shows the most recently requested
//! structure.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;

/// Coloring scheme applied to every representation.
pub const CHAIN_COLORING: &str = "chainid";

/// Opacity applied to every representation.
pub const REPRESENTATION_OPACITY: f32 = 0.8;

/// Demonstration structure (a short alanine helix) shown before any
/// discovery has produced a real one.
pub const DEFAULT_PDB: &str = "\
ATOM      1  N   ALA A   1      27.271  24.862   5.000  1.00 20.00
ATOM      2  CA  ALA A   1      26.000  24.000   5.000  1.00 20.00
ATOM      3  C   ALA A   1      25.000  24.000   6.000  1.00 20.00
ATOM      4  O   ALA A   1      25.000  24.000   7.000  1.00 20.00
ATOM      5  CB  ALA A   1      26.000  22.000   5.000  1.00 20.00
ATOM      6  N   ALA A   2      24.000  24.000   6.000  1.00 20.00
ATOM      7  CA  ALA A   2      23.000  24.000   7.000  1.00 20.00
ATOM      8  C   ALA A   2      22.000  24.000   8.000  1.00 20.00
ATOM      9  O   ALA A   2      21.000  24.000   9.000  1.00 20.00
ATOM     10  CB  ALA A   2      23.000  22.000   7.000  1.00 20.00
ATOM     11  N   ALA A   3      22.000  24.000   8.000  1.00 20.00
ATOM     12  CA  ALA A   3      21.000  24.000   9.000  1.00 20.00
ATOM     13  C   ALA A   3      20.000  24.000  10.000  1.00 20.00
ATOM     14  O   ALA A   3      19.000  24.000  11.000  1.00 20.00
ATOM     15  CB  ALA A   3      21.000  22.000   9.000  1.00 20.00
CONECT    1    2
CONECT    2    3
CONECT    3    4
CONECT    2    5
CONECT    6    7
CONECT    7    8
CONECT    8    9
CONECT    7   10
CONECT   11   12
CONECT   12   13
CONECT   13   14
CONECT   12   15
END";

/// Render failures reported by the engine.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The engine rejected or failed to load the structure.
    #[error("render engine failure: {0}")]
    Engine(String),
}

/// Representation style for the current structure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Representation {
    /// Ribbon cartoon (the load-time default).
    #[default]
    Cartoon,
    /// Molecular surface.
    Surface,
    /// Ball and stick.
    BallStick,
}

impl Representation {
    /// The engine-facing name of this style.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cartoon => "cartoon",
            Self::Surface => "surface",
            Self::BallStick => "ball+stick",
        }
    }

    /// The next style in display order, for cycling from the UI.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::Cartoon => Self::Surface,
            Self::Surface => Self::BallStick,
            Self::BallStick => Self::Cartoon,
        }
    }
}

/// An external rendering engine, consumed as an opaque renderer.
#[async_trait]
pub trait RenderEngine: Send {
    /// Remove all loaded geometry.
    fn clear(&mut self);

    /// Parse and stage a structure. May take arbitrarily long.
    async fn load_structure(&mut self, structure: &str) -> Result<(), RenderError>;

    /// Replace all representations on the current structure.
    fn set_representation(&mut self, style: Representation, coloring: &str, opacity: f32);

    /// Recenter and zoom the camera to fit the current structure.
    fn reset_view(&mut self);

    /// Relative camera zoom.
    fn zoom(&mut self, delta: f32);
}

#[derive(Debug, Default)]
struct ViewState {
    structure: Option<String>,
    style: Representation,
}

/// Facade over a render engine with last-load-wins semantics.
pub struct StructureView<E: RenderEngine> {
    engine: AsyncMutex<E>,
    loads: AtomicU64,
    state: parking_lot::Mutex<ViewState>,
}

impl<E: RenderEngine> StructureView<E> {
    /// Wrap an engine.
    pub fn new(engine: E) -> Self {
        Self {
            engine: AsyncMutex::new(engine),
            loads: AtomicU64::new(0),
            state: parking_lot::Mutex::new(ViewState::default()),
        }
    }

    /// Load a structure, replacing whatever is currently shown.
    ///
    /// Prior geometry is cleared before the new content loads; once the
    /// engine has parsed it, the default cartoon representation is applied
    /// and the camera recentered. Returns `Ok(false)` when this load was
    /// superseded by a newer one while in flight, in which case nothing
    /// was committed.
    ///
    /// # Errors
    ///
    /// Propagates [`RenderError`] from the engine.
    pub async fn load(&self, structure: String) -> Result<bool, RenderError> {
        let ticket = self.loads.fetch_add(1, Ordering::SeqCst) + 1;
        let mut engine = self.engine.lock().await;

        // A newer load may have been requested while we waited for the
        // engine; its content is the one that must end up on screen.
        if self.loads.load(Ordering::SeqCst) != ticket {
            tracing::debug!("Discarding superseded structure load");
            return Ok(false);
        }

        engine.clear();
        engine.load_structure(&structure).await?;

        if self.loads.load(Ordering::SeqCst) != ticket {
            tracing::debug!("Discarding structure load superseded mid-flight");
            engine.clear();
            return Ok(false);
        }

        engine.set_representation(
            Representation::Cartoon,
            CHAIN_COLORING,
            REPRESENTATION_OPACITY,
        );
        engine.reset_view();

        let mut state = self.state.lock();
        state.structure = Some(structure);
        state.style = Representation::Cartoon;
        Ok(true)
    }

    /// Replace all representations on the current structure. No-op while
    /// nothing is loaded.
    pub async fn set_representation(&self, style: Representation) {
        if !self.has_structure() {
            return;
        }
        let mut engine = self.engine.lock().await;
        engine.set_representation(style, CHAIN_COLORING, REPRESENTATION_OPACITY);
        self.state.lock().style = style;
    }

    /// Recenter the camera on the current structure.
    pub async fn reset_view(&self) {
        self.engine.lock().await.reset_view();
    }

    /// Relative camera zoom.
    pub async fn zoom(&self, delta: f32) {
        self.engine.lock().await.zoom(delta);
    }

    /// The currently displayed structure text, if any.
    #[must_use]
    pub fn structure(&self) -> Option<String> {
        self.state.lock().structure.clone()
    }

    /// Whether a structure is currently displayed.
    #[must_use]
    pub fn has_structure(&self) -> bool {
        self.state.lock().structure.is_some()
    }

    /// The active representation style.
    #[must_use]
    pub fn style(&self) -> Representation {
        self.state.lock().style
    }
}

/// One engine call, recorded by [`HeadlessEngine`].
#[derive(Clone, Debug, PartialEq)]
pub enum RenderCommand {
    /// Geometry cleared.
    Clear,
    /// Structure staged (byte length recorded, content stays opaque).
    Load(usize),
    /// Representation replaced.
    SetRepresentation(Representation),
    /// Camera recentered.
    ResetView,
    /// Camera zoomed.
    Zoom(f32),
}

/// Shared log of engine calls, for inspection from tests and the TUI
/// status line.
#[derive(Clone, Debug, Default)]
pub struct CommandLog(Arc<parking_lot::Mutex<Vec<RenderCommand>>>);

impl CommandLog {
    fn push(&self, command: RenderCommand) {
        self.0.lock().push(command);
    }

    /// Copy of the recorded commands, in call order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<RenderCommand> {
        self.0.lock().clone()
    }
}

/// In-process engine used when no external renderer is attached (TUI mode)
/// and throughout the tests. Records every call and keeps the staged
/// structure; an optional artificial delay makes load races reproducible.
#[derive(Debug, Default)]
pub struct HeadlessEngine {
    log: CommandLog,
    staged: Option<String>,
    load_delay: Option<Duration>,
}

impl HeadlessEngine {
    /// Create an engine with no load delay.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine whose loads take the given time.
    #[must_use]
    pub fn with_load_delay(delay: Duration) -> Self {
        Self {
            load_delay: Some(delay),
            ..Self::default()
        }
    }

    /// Handle to this engine's command log.
    #[must_use]
    pub fn log(&self) -> CommandLog {
        self.log.clone()
    }
}

#[async_trait]
impl RenderEngine for HeadlessEngine {
    fn clear(&mut self) {
        self.staged = None;
        self.log.push(RenderCommand::Clear);
    }

    async fn load_structure(&mut self, structure: &str) -> Result<(), RenderError> {
        if let Some(delay) = self.load_delay {
            tokio::time::sleep(delay).await;
        }
        self.staged = Some(structure.to_string());
        self.log.push(RenderCommand::Load(structure.len()));
        Ok(())
    }

    fn set_representation(&mut self, style: Representation, _coloring: &str, _opacity: f32) {
        self.log.push(RenderCommand::SetRepresentation(style));
    }

    fn reset_view(&mut self) {
        self.log.push(RenderCommand::ResetView);
    }

    fn zoom(&mut self, delta: f32) {
        self.log.push(RenderCommand::Zoom(delta));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_representation_names() {
        assert_eq!(Representation::Cartoon.as_str(), "cartoon");
        assert_eq!(Representation::Surface.as_str(), "surface");
        assert_eq!(Representation::BallStick.as_str(), "ball+stick");
    }

    #[test]
    fn test_representation_cycle() {
        let mut style = Representation::Cartoon;
        style = style.next();
        assert_eq!(style, Representation::Surface);
        style = style.next();
        assert_eq!(style, Representation::BallStick);
        style = style.next();
        assert_eq!(style, Representation::Cartoon);
    }

    #[tokio::test]
    async fn test_load_clears_then_applies_cartoon_and_recenters() {
        let engine = HeadlessEngine::new();
        let log = engine.log();
        let view = StructureView::new(engine);

        let applied = view.load(DEFAULT_PDB.to_string()).await.unwrap();
        assert!(applied);
        assert_eq!(view.structure().as_deref(), Some(DEFAULT_PDB));
        assert_eq!(view.style(), Representation::Cartoon);
        assert_eq!(
            log.snapshot(),
            vec![
                RenderCommand::Clear,
                RenderCommand::Load(DEFAULT_PDB.len()),
                RenderCommand::SetRepresentation(Representation::Cartoon),
                RenderCommand::ResetView,
            ]
        );
    }

    #[tokio::test]
    async fn test_load_resets_style_to_cartoon() {
        let view = StructureView::new(HeadlessEngine::new());
        view.load("A".to_string()).await.unwrap();
        view.set_representation(Representation::Surface).await;
        assert_eq!(view.style(), Representation::Surface);

        view.load("B".to_string()).await.unwrap();
        assert_eq!(view.style(), Representation::Cartoon);
    }

    #[tokio::test]
    async fn test_set_representation_without_structure_is_noop() {
        let engine = HeadlessEngine::new();
        let log = engine.log();
        let view = StructureView::new(engine);

        view.set_representation(Representation::Surface).await;
        assert!(log.snapshot().is_empty());
        assert_eq!(view.style(), Representation::Cartoon);
    }

    #[tokio::test]
    async fn test_superseded_load_is_discarded() {
        let engine = HeadlessEngine::with_load_delay(Duration::from_millis(50));
        let view = Arc::new(StructureView::new(engine));

        let slow = {
            let view = Arc::clone(&view);
            tokio::spawn(async move { view.load("FIRST".to_string()).await })
        };
        // Let the first load take the engine and start staging.
        tokio::time::sleep(Duration::from_millis(10)).await;
        let fresh = {
            let view = Arc::clone(&view);
            tokio::spawn(async move { view.load("SECOND".to_string()).await })
        };

        let slow_applied = slow.await.unwrap().unwrap();
        let fresh_applied = fresh.await.unwrap().unwrap();

        assert!(!slow_applied);
        assert!(fresh_applied);
        assert_eq!(view.structure().as_deref(), Some("SECOND"));
    }

    #[tokio::test]
    async fn test_zoom_and_reset_pass_through() {
        let engine = HeadlessEngine::new();
        let log = engine.log();
        let view = StructureView::new(engine);

        view.zoom(0.5).await;
        view.reset_view().await;
        assert_eq!(
            log.snapshot(),
            vec![RenderCommand::Zoom(0.5), RenderCommand::ResetView]
        );
    }
}

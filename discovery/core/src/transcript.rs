//! Transcript Events
//!
//! Types for the visible chat transcript. Every entry is a [`ChatEvent`],
//! derived either from an inbound stream frame (via [`crate::classify`]) or
//! from a local action (user input, stop, transport failure).
//!
//! # Design Philosophy
//!
//! The payload model replaces the original dynamic any-shaped metadata with
//! a small fixed set of well-known optional fields plus an explicit `extra`
//! passthrough bag. Code that needs a field names it; everything else rides
//! along untouched for display or snapshot metadata.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Greeting shown as the only transcript entry of a fresh session.
pub const WELCOME_TEXT: &str = "Welcome to ProteinFold. I'll help you discover novel proteins \
for your research. What would you like to discover today?";

/// Who a transcript entry is attributed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    /// The person driving the discovery.
    User,
    /// The discovery agent.
    Assistant,
    /// Pipeline status and local notices.
    System,
    /// Connection-level failures.
    Error,
}

/// Structured kind of a transcript entry. Absent for plain textual turns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatEventKind {
    /// Pipeline stage update.
    Status,
    /// Prompt sent to the LLM.
    Prompt,
    /// Raw LLM response.
    Response,
    /// Start of a design iteration.
    Iteration,
    /// Per-candidate results for one iteration.
    IterationResults,
    /// Current best design.
    DesignResults,
    /// Error, backend-reported or connection-level.
    Error,
}

/// One candidate evaluated during an iteration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CandidateResult {
    /// Amino-acid sequence in one-letter code.
    #[serde(default)]
    pub sequence: String,
    /// Predicted binding score.
    #[serde(default)]
    pub binding_score: Option<f64>,
    /// Opaque predicted-structure blob, if the backend attached one.
    #[serde(default)]
    pub structure: Option<Value>,
}

/// Structured payload of a transcript entry.
///
/// Well-known fields are typed; anything else the backend sent lands in
/// `extra` and passes through to snapshot metadata unchanged.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EventPayload {
    /// Pipeline stage name (e.g. "planning", "refinement").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    /// Status marker (e.g. "in_progress", "completed", "stopped").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Current iteration index (1-based).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration: Option<u32>,
    /// Total number of iterations configured for the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_iterations: Option<u32>,
    /// Best sequence so far, for design results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<String>,
    /// Binding score of the best sequence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding_score: Option<f64>,
    /// Design rationale text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    /// Per-candidate results of a completed iteration.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<CandidateResult>,
    /// Error category for error entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Error detail for error entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
    /// Passthrough for fields this layer does not model.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl EventPayload {
    /// Build a payload from a raw frame `data` object.
    ///
    /// Well-known fields are lifted into their typed slots; unrecognized
    /// fields are kept in `extra`. Iteration-results frames report the best
    /// candidate as `best_sequence`/`best_score`; those fill the plain
    /// slots only when no plain field is present.
    #[must_use]
    pub fn from_data(data: &Map<String, Value>) -> Self {
        const LIFTED: &[&str] = &[
            "stage",
            "status",
            "iteration",
            "total_iterations",
            "sequence",
            "best_sequence",
            "binding_score",
            "best_score",
            "rationale",
            "results",
            "error_type",
            "error_details",
        ];

        let str_field = |key: &str| {
            data.get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        let int_field = |key: &str| data.get(key).and_then(Value::as_u64).map(|v| v as u32);
        let num_field = |key: &str| data.get(key).and_then(Value::as_f64);

        let results = data
            .get("results")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| serde_json::from_value(item.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();

        let extra = data
            .iter()
            .filter(|(key, _)| !LIFTED.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Self {
            stage: str_field("stage"),
            status: str_field("status"),
            iteration: int_field("iteration"),
            total_iterations: int_field("total_iterations"),
            sequence: str_field("sequence").or_else(|| str_field("best_sequence")),
            binding_score: num_field("binding_score").or_else(|| num_field("best_score")),
            rationale: str_field("rationale"),
            results,
            error_type: str_field("error_type"),
            error_details: str_field("error_details"),
            extra,
        }
    }

    /// Mark this payload as completed (used for iteration and design
    /// results, which always arrive finished).
    #[must_use]
    pub fn completed(mut self) -> Self {
        self.status = Some("completed".to_string());
        self
    }
}

/// One entry in the visible transcript.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatEvent {
    /// Who this entry is attributed to.
    pub role: ChatRole,
    /// Structured kind; `None` for plain textual turns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ChatEventKind>,
    /// Display text. May be empty for structured kinds.
    pub text: String,
    /// Structured payload for kinds that carry one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<EventPayload>,
    /// Whether the entry renders folded. Display-only; defaults to true
    /// for iteration results.
    #[serde(default)]
    pub collapsed: bool,
}

impl ChatEvent {
    /// A plain user turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self::plain(ChatRole::User, text)
    }

    /// A plain assistant turn.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::plain(ChatRole::Assistant, text)
    }

    /// A plain system notice.
    pub fn system(text: impl Into<String>) -> Self {
        Self::plain(ChatRole::System, text)
    }

    /// An error-styled entry for a failed operation.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Error,
            kind: Some(ChatEventKind::Error),
            text: text.into(),
            payload: None,
            collapsed: false,
        }
    }

    /// The fixed greeting a fresh session starts with.
    #[must_use]
    pub fn welcome() -> Self {
        Self::assistant(WELCOME_TEXT)
    }

    fn plain(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            role,
            kind: None,
            text: text.into(),
            payload: None,
            collapsed: false,
        }
    }

    /// Attach a structured kind.
    #[must_use]
    pub fn with_kind(mut self, kind: ChatEventKind) -> Self {
        self.kind = Some(kind);
        // Iteration results fold by default; everything else starts open.
        self.collapsed = matches!(kind, ChatEventKind::IterationResults);
        self
    }

    /// Attach a structured payload.
    #[must_use]
    pub fn with_payload(mut self, payload: EventPayload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Whether this entry carries a design result complete enough to act
    /// on. A design-results entry without both a sequence and a score is a
    /// non-actionable status update, not an error.
    #[must_use]
    pub fn is_render_eligible(&self) -> bool {
        self.kind == Some(ChatEventKind::DesignResults)
            && self
                .payload
                .as_ref()
                .is_some_and(|p| p.sequence.is_some() && p.binding_score.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn data(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_payload_lifts_well_known_fields() {
        let payload = EventPayload::from_data(&data(json!({
            "stage": "planning",
            "status": "in_progress",
            "iteration": 2,
            "total_iterations": 5,
            "sequence": "MYKR",
            "binding_score": 96.3,
            "rationale": "helix staple",
        })));
        assert_eq!(payload.stage.as_deref(), Some("planning"));
        assert_eq!(payload.status.as_deref(), Some("in_progress"));
        assert_eq!(payload.iteration, Some(2));
        assert_eq!(payload.total_iterations, Some(5));
        assert_eq!(payload.sequence.as_deref(), Some("MYKR"));
        assert_eq!(payload.binding_score, Some(96.3));
        assert_eq!(payload.rationale.as_deref(), Some("helix staple"));
        assert!(payload.extra.is_empty());
    }

    #[test]
    fn test_payload_best_fields_fill_plain_slots() {
        let payload = EventPayload::from_data(&data(json!({
            "best_sequence": "ALEL",
            "best_score": 0.82,
        })));
        assert_eq!(payload.sequence.as_deref(), Some("ALEL"));
        assert_eq!(payload.binding_score, Some(0.82));
    }

    #[test]
    fn test_payload_plain_sequence_wins_over_best() {
        let payload = EventPayload::from_data(&data(json!({
            "sequence": "PLAIN",
            "best_sequence": "BEST",
        })));
        assert_eq!(payload.sequence.as_deref(), Some("PLAIN"));
    }

    #[test]
    fn test_payload_unknown_fields_pass_through() {
        let payload = EventPayload::from_data(&data(json!({
            "stage": "refinement",
            "visualization_url": "https://example.com/viz/1.png",
            "confidence": 0.8,
        })));
        assert_eq!(payload.extra.len(), 2);
        assert_eq!(
            payload.extra.get("visualization_url").unwrap(),
            "https://example.com/viz/1.png"
        );
    }

    #[test]
    fn test_payload_results_list() {
        let payload = EventPayload::from_data(&data(json!({
            "results": [
                {"sequence": "AAA", "binding_score": 0.5, "structure": {"pdb_url": "u"}},
                {"sequence": "BBB", "binding_score": 0.7},
            ],
        })));
        assert_eq!(payload.results.len(), 2);
        assert_eq!(payload.results[0].sequence, "AAA");
        assert_eq!(payload.results[1].binding_score, Some(0.7));
        assert!(payload.results[0].structure.is_some());
    }

    #[test]
    fn test_iteration_results_fold_by_default() {
        let event = ChatEvent::assistant("done").with_kind(ChatEventKind::IterationResults);
        assert!(event.collapsed);
        let event = ChatEvent::assistant("done").with_kind(ChatEventKind::DesignResults);
        assert!(!event.collapsed);
    }

    #[test]
    fn test_render_eligibility_needs_sequence_and_score() {
        let complete = ChatEvent::assistant("")
            .with_kind(ChatEventKind::DesignResults)
            .with_payload(EventPayload {
                sequence: Some("MYKR".into()),
                binding_score: Some(96.3),
                ..EventPayload::default()
            });
        assert!(complete.is_render_eligible());

        let missing_score = ChatEvent::assistant("")
            .with_kind(ChatEventKind::DesignResults)
            .with_payload(EventPayload {
                sequence: Some("MYKR".into()),
                ..EventPayload::default()
            });
        assert!(!missing_score.is_render_eligible());

        let wrong_kind = ChatEvent::system("status").with_kind(ChatEventKind::Status);
        assert!(!wrong_kind.is_render_eligible());
    }

    #[test]
    fn test_welcome_event() {
        let event = ChatEvent::welcome();
        assert_eq!(event.role, ChatRole::Assistant);
        assert!(event.kind.is_none());
        assert!(event.text.starts_with("Welcome to ProteinFold"));
    }
}

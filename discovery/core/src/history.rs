//! Design History
//!
//! Append-only store of discovered structure snapshots. Each snapshot pairs
//! the opaque structure text with the metadata the backend sent alongside
//! it, under a process-unique id. One snapshot may be selected at a time;
//! selecting drives what the render surface shows.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::transcript::EventPayload;

/// Identifier of one recorded snapshot, unique within the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotId(u64);

impl SnapshotId {
    /// Allocate the next id.
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl std::fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "snap_{}", self.0)
    }
}

/// Metadata attached to a recorded snapshot.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    /// Display name. Defaulted at record time when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Amino-acid sequence of the design.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<String>,
    /// Predicted binding score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding_score: Option<f64>,
    /// Prediction confidence, when the backend reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    /// Iteration that produced this design.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration: Option<u32>,
    /// Passthrough fields from the source event.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl SnapshotMetadata {
    /// Derive snapshot metadata from a classified event payload.
    #[must_use]
    pub fn from_payload(payload: &EventPayload) -> Self {
        let confidence_score = payload
            .extra
            .get("confidence")
            .or_else(|| payload.extra.get("confidence_score"))
            .and_then(Value::as_f64);
        Self {
            name: None,
            sequence: payload.sequence.clone(),
            binding_score: payload.binding_score,
            confidence_score,
            iteration: payload.iteration,
            extra: payload.extra.clone(),
        }
    }
}

/// One recorded structure result.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DesignSnapshot {
    /// Process-unique identifier.
    pub id: SnapshotId,
    /// Raw structure text, handed whole to the render surface.
    pub structure: String,
    /// Metadata captured with the structure. `name` is always present
    /// after recording.
    pub metadata: SnapshotMetadata,
    /// Capture time for display.
    pub captured_at: chrono::DateTime<chrono::Local>,
}

/// Append-only, insertion-ordered collection of design snapshots with a
/// weak selection pointer.
#[derive(Debug, Default)]
pub struct DesignHistory {
    snapshots: Vec<DesignSnapshot>,
    selected: Option<SnapshotId>,
}

impl DesignHistory {
    /// Create an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new snapshot. Always appends; never overwrites or merges.
    ///
    /// When the metadata carries no name, one is derived from the 1-based
    /// insertion position ("Design Iteration {n}"). The new snapshot
    /// becomes the selected one.
    pub fn record(
        &mut self,
        structure: impl Into<String>,
        mut metadata: SnapshotMetadata,
    ) -> SnapshotId {
        let id = SnapshotId::next();
        if metadata.name.is_none() {
            metadata.name = Some(format!("Design Iteration {}", self.snapshots.len() + 1));
        }
        tracing::debug!(snapshot = %id, name = ?metadata.name, "Recording design snapshot");
        self.snapshots.push(DesignSnapshot {
            id,
            structure: structure.into(),
            metadata,
            captured_at: chrono::Local::now(),
        });
        self.selected = Some(id);
        id
    }

    /// Select a snapshot. Unknown ids are a no-op; the caller gets the
    /// snapshot back on success so it can hand the structure to the render
    /// surface.
    pub fn select(&mut self, id: SnapshotId) -> Option<&DesignSnapshot> {
        if self.snapshots.iter().any(|s| s.id == id) {
            self.selected = Some(id);
            self.get(id)
        } else {
            None
        }
    }

    /// Look up a snapshot by id.
    #[must_use]
    pub fn get(&self, id: SnapshotId) -> Option<&DesignSnapshot> {
        self.snapshots.iter().find(|s| s.id == id)
    }

    /// The currently selected snapshot. A selection pointing at a snapshot
    /// that no longer exists degrades to no selection.
    #[must_use]
    pub fn selected(&self) -> Option<&DesignSnapshot> {
        self.selected.and_then(|id| self.get(id))
    }

    /// The selected snapshot's id, if the selection is live.
    #[must_use]
    pub fn selected_id(&self) -> Option<SnapshotId> {
        self.selected.filter(|id| self.get(*id).is_some())
    }

    /// Snapshots in insertion order, for timeline display.
    pub fn iter(&self) -> impl Iterator<Item = &DesignSnapshot> {
        self.snapshots.iter()
    }

    /// Number of recorded snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_record_appends_and_selects() {
        let mut history = DesignHistory::new();
        let first = history.record("ATOM...", SnapshotMetadata::default());
        let second = history.record("ATOM...", SnapshotMetadata::default());

        assert_ne!(first, second);
        assert_eq!(history.len(), 2);
        assert_eq!(history.selected_id(), Some(second));

        let ids: Vec<_> = history.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![first, second]);
    }

    #[test]
    fn test_default_names_are_positional() {
        let mut history = DesignHistory::new();
        history.record("A", SnapshotMetadata::default());
        history.record(
            "B",
            SnapshotMetadata {
                name: Some("MDM2 binder".to_string()),
                ..SnapshotMetadata::default()
            },
        );
        history.record("C", SnapshotMetadata::default());

        let names: Vec<_> = history
            .iter()
            .map(|s| s.metadata.name.clone().unwrap())
            .collect();
        assert_eq!(
            names,
            vec!["Design Iteration 1", "MDM2 binder", "Design Iteration 3"]
        );
    }

    #[test]
    fn test_select_unknown_id_is_noop() {
        let mut history = DesignHistory::new();
        let id = history.record("A", SnapshotMetadata::default());

        // Ids are process-global, so one from another store is unknown here.
        let mut other = DesignHistory::new();
        let foreign = other.record("X", SnapshotMetadata::default());

        assert!(history.select(foreign).is_none());
        assert_eq!(history.selected_id(), Some(id));
    }

    #[test]
    fn test_select_earlier_snapshot() {
        let mut history = DesignHistory::new();
        let first = history.record("A", SnapshotMetadata::default());
        history.record("B", SnapshotMetadata::default());

        let selected = history.select(first).unwrap();
        assert_eq!(selected.structure, "A");
        assert_eq!(history.selected_id(), Some(first));
    }

    #[test]
    fn test_metadata_from_payload() {
        let payload = EventPayload {
            sequence: Some("MYKR".into()),
            binding_score: Some(96.3),
            iteration: Some(2),
            extra: serde_json::json!({"confidence": 0.8, "pdb_url": "u"})
                .as_object()
                .cloned()
                .unwrap(),
            ..EventPayload::default()
        };
        let metadata = SnapshotMetadata::from_payload(&payload);
        assert_eq!(metadata.sequence.as_deref(), Some("MYKR"));
        assert_eq!(metadata.binding_score, Some(96.3));
        assert_eq!(metadata.confidence_score, Some(0.8));
        assert_eq!(metadata.iteration, Some(2));
        assert!(metadata.extra.contains_key("pdb_url"));
    }

    #[test]
    fn test_scores_recorded_in_order() {
        let mut history = DesignHistory::new();
        history.record(
            "ATOM...",
            SnapshotMetadata {
                binding_score: Some(0.5),
                ..SnapshotMetadata::default()
            },
        );
        let second = history.record(
            "ATOM...",
            SnapshotMetadata {
                binding_score: Some(0.9),
                ..SnapshotMetadata::default()
            },
        );

        let scores: Vec<_> = history.iter().map(|s| s.metadata.binding_score).collect();
        assert_eq!(scores, vec![Some(0.5), Some(0.9)]);
        assert_eq!(history.selected_id(), Some(second));
        assert_eq!(
            history.selected().unwrap().metadata.name.as_deref(),
            Some("Design Iteration 2")
        );
    }
}

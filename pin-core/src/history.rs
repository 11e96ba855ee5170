//! Scene history - bounded linear undo/redo over full-scene snapshots.
//!
//! A [`Snapshot`] is an immutable deep copy of the scene at one point in
//! time. Snapshots form a linear stack with a cursor; pushing while the
//! cursor is not at the tip discards the redo branch, and overflow evicts
//! the oldest snapshot while preserving the cursor's relative position.
//! Selection is intentionally not part of snapshot state.

use serde::{Deserialize, Serialize};

use crate::element::Element;
use crate::model::SceneModel;

/// Default number of snapshots retained.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// An immutable deep copy of the full scene at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// All elements in paint order.
    pub elements: Vec<Element>,
    /// Canvas width at capture time.
    pub canvas_width: f32,
    /// Canvas height at capture time.
    pub canvas_height: f32,
    /// Canvas background color at capture time.
    pub background_color: String,
}

impl Snapshot {
    /// Capture the current state of a scene model.
    #[must_use]
    pub fn capture(model: &SceneModel) -> Self {
        Self {
            elements: model.list().into_iter().cloned().collect(),
            canvas_width: model.canvas_width,
            canvas_height: model.canvas_height,
            background_color: model.background_color.clone(),
        }
    }

    /// Restore this snapshot into a model, replacing the scene wholesale.
    pub fn restore(&self, model: &mut SceneModel) {
        model.load_template(
            self.elements.clone(),
            (self.canvas_width, self.canvas_height),
            self.background_color.clone(),
        );
    }
}

/// Bounded linear undo/redo stack.
///
/// ```
/// use pin_core::{History, SceneModel, Snapshot};
///
/// let model = SceneModel::default();
/// let mut history = History::default();
/// history.push(Snapshot::capture(&model));
/// assert!(!history.can_undo());
/// assert!(!history.can_redo());
/// ```
#[derive(Debug, Clone)]
pub struct History {
    /// Snapshots, oldest first.
    snapshots: Vec<Snapshot>,
    /// Index of the current snapshot within `snapshots`.
    cursor: usize,
    /// Maximum number of snapshots retained.
    capacity: usize,
}

impl History {
    /// Create a history with the given snapshot capacity (minimum 1).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            snapshots: Vec::new(),
            cursor: 0,
            capacity: capacity.max(1),
        }
    }

    /// Push a snapshot after a user-visible edit.
    ///
    /// Discards any redo branch beyond the cursor; evicts the oldest
    /// snapshot when over capacity.
    pub fn push(&mut self, snapshot: Snapshot) {
        if !self.snapshots.is_empty() {
            self.snapshots.truncate(self.cursor + 1);
        }
        self.snapshots.push(snapshot);
        if self.snapshots.len() > self.capacity {
            self.snapshots.remove(0);
        }
        self.cursor = self.snapshots.len() - 1;
    }

    /// Whether a step back is available.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// Whether a step forward is available.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    /// Step back and return the snapshot to restore.
    pub fn undo(&mut self) -> Option<&Snapshot> {
        if self.can_undo() {
            self.cursor -= 1;
            self.snapshots.get(self.cursor)
        } else {
            None
        }
    }

    /// Step forward and return the snapshot to restore.
    pub fn redo(&mut self) -> Option<&Snapshot> {
        if self.can_redo() {
            self.cursor += 1;
            self.snapshots.get(self.cursor)
        } else {
            None
        }
    }

    /// The snapshot under the cursor, if any.
    #[must_use]
    pub fn current(&self) -> Option<&Snapshot> {
        self.snapshots.get(self.cursor)
    }

    /// Number of snapshots held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Check if the history is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Drop all snapshots, e.g. after loading an unrelated template.
    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.cursor = 0;
    }
}

impl Default for History {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

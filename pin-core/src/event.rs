//! Change notifications emitted by the scene model.
//!
//! Presentation layers subscribe to a broadcast channel instead of polling.
//! Every event carries the [`UpdateOrigin`] tag that the synchronization
//! bridge uses to break feedback loops between the model and live render
//! objects.

use serde::{Deserialize, Serialize};

use crate::ElementId;

/// Where a model mutation originated.
///
/// An update folded back from direct manipulation of a render object is
/// tagged [`UpdateOrigin::Render`] so the forward reconciliation path treats
/// it as already applied and performs no redundant backend write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateOrigin {
    /// A programmatic or UI-panel edit of the model.
    Model,
    /// A read-back from direct manipulation (drag/resize/rotate).
    Render,
}

/// A change notification from the scene model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ModelEvent {
    /// An element was inserted.
    ElementAdded {
        /// The new element's ID.
        id: ElementId,
    },
    /// An element was patched.
    ElementChanged {
        /// The changed element's ID.
        id: ElementId,
        /// Direction the change came from.
        origin: UpdateOrigin,
    },
    /// An element was removed.
    ElementRemoved {
        /// The removed element's ID.
        id: ElementId,
    },
    /// The whole scene was replaced (template load, undo/redo restore).
    SceneLoaded,
}

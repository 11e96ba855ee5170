//! # Pin Core
//!
//! Canonical element model for parametric pin templates: the serializable
//! source of truth that render objects, spatial indexes and batch jobs are
//! derived from.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 pin-core                    │
//! ├─────────────────────────────────────────────┤
//! │  Element Model   │  History Manager         │
//! │  - tagged union  │  - full-scene snapshots  │
//! │  - patch merge   │  - bounded undo/redo     │
//! │  - z compaction  │                          │
//! ├─────────────────────────────────────────────┤
//! │  Change events (broadcast, origin-tagged)   │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod element;
pub mod error;
pub mod event;
pub mod history;
pub mod model;

pub use element::{
    dynamic_field_from_name, is_placeholder, placeholder_for, AutoFit, ChangeSet, CropRect,
    Element, ElementId, ElementKind, ElementPatch, FitMode, FlowDirection, FontSpec, FrameAlign,
    FrameBody, ImageBody, Rect, ShapeBody, ShapeKind, ShapeStroke, TextAlign, TextBackground,
    TextBody, TextCase, TextShadow, TextStroke, Transform, DYNAMIC_NAME_MARKER, PLACEHOLDER_CLOSE,
    PLACEHOLDER_OPEN,
};
pub use error::{CoreError, CoreResult};
pub use event::{ModelEvent, UpdateOrigin};
pub use history::{History, Snapshot, DEFAULT_HISTORY_CAPACITY};
pub use model::SceneModel;

/// Pin core version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

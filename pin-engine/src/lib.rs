//! # Pinfab Engine
//!
//! Render-side engine for the pin template editor: keeps paint objects in
//! sync with the authoritative scene model, solves auto-fit text sizing,
//! indexes element positions for proximity queries, and preloads image
//! assets for batch jobs.
//!
//! ## Data flow
//!
//! ```text
//! ┌───────────┐  upsert   ┌────────────┐  diff/apply  ┌──────────────┐
//! │ edit      ├──────────►│ SceneModel ├─────────────►│ RenderObject │
//! │ (tagged)  │           │ (pin-core) │              │ + SpatialGrid│
//! └───────────┘           └────────────┘              └──────┬───────┘
//!       ▲                                   readback         │
//!       └────────────────────────────────────────────────────┘
//!                 (render-origin edits stop at the model)
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod autofit;
pub mod backend;
pub mod batch;
pub mod bridge;
pub mod error;
pub mod measure;
pub mod preload;
pub mod spatial;

pub use autofit::{fit_font_size, FitBounds, FitConstraints, TEXT_INSET};
pub use backend::{
    GeometryReadback, ImageProps, RenderObject, RenderPatch, RenderProps, ShapeProps, TextProps,
};
pub use batch::{collect_image_urls, resolve_placeholders, MAX_FIELD_URLS, MAX_JOB_URLS};
pub use bridge::{SyncBridge, SyncReport, SyncState};
pub use error::{EngineError, EngineResult};
pub use measure::{BlockMetrics, HeuristicMeasurer, MonoMeasurer, TextMeasurer};
pub use preload::{
    decode_data_uri, decode_image, AssetCache, AssetFetcher, CacheStats, DecodedImage,
    DEFAULT_LOAD_TIMEOUT,
};
#[cfg(feature = "http")]
pub use preload::HttpFetcher;
pub use spatial::{SpatialGrid, DEFAULT_CELL_SIZE};

/// Engine version, from the crate manifest.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

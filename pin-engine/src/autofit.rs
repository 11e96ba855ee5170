//! Auto-fit font sizing solver.
//!
//! Given display text and a fixed container, pick the largest integer font
//! size in `[min_font_size, max_font_size]` whose word-wrapped block fits
//! the container after the fixed internal inset. Pure function: the same
//! inputs always produce the same size, and the computed size is derived
//! presentation state that never flows back into the stored model value.

use pin_core::{AutoFit, FontSpec, TextBody};

use crate::measure::TextMeasurer;

/// Fixed internal padding subtracted from the container on all sides.
pub const TEXT_INSET: f32 = 4.0;

/// Container dimensions the text must fit into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitBounds {
    /// Container width in canvas units.
    pub width: f32,
    /// Container height in canvas units.
    pub height: f32,
}

impl FitBounds {
    /// Create fit bounds.
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Solver constraints, combining auto-fit bounds with text-style inputs
/// that affect wrapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitConstraints {
    /// Smallest size the solver may return.
    pub min_font_size: u32,
    /// Largest size the solver may return.
    pub max_font_size: u32,
    /// Optional cap on wrapped line count.
    pub max_lines: Option<u32>,
    /// Line height multiplier.
    pub line_height: f32,
    /// Additional spacing per glyph.
    pub letter_spacing: f32,
}

impl FitConstraints {
    /// Build constraints from a text element's auto-fit parameters and style.
    #[must_use]
    pub fn from_text(body: &TextBody) -> Self {
        Self::from_parts(&body.auto_fit, body.line_height, body.letter_spacing)
    }

    /// Build constraints from raw parts.
    #[must_use]
    pub fn from_parts(auto_fit: &AutoFit, line_height: f32, letter_spacing: f32) -> Self {
        Self {
            min_font_size: auto_fit.min_font_size,
            max_font_size: auto_fit.max_font_size.max(auto_fit.min_font_size),
            max_lines: auto_fit.max_lines,
            line_height,
            letter_spacing,
        }
    }
}

/// Find the largest integer font size whose wrapped block fits the bounds.
///
/// Binary search over `[min_font_size, max_font_size]`; a candidate is
/// feasible when the wrapped height and widest line fit the inset container
/// and the line count respects `max_lines`. If no candidate is feasible the
/// floor `min_font_size` is returned - the text may overflow, but the size
/// never drops below the configured minimum. Empty text trivially fits at
/// `max_font_size`.
#[must_use]
pub fn fit_font_size(
    text: &str,
    bounds: FitBounds,
    font: &FontSpec,
    constraints: &FitConstraints,
    measurer: &dyn TextMeasurer,
) -> u32 {
    let min = constraints.min_font_size;
    let max = constraints.max_font_size.max(min);
    if text.trim().is_empty() {
        return max;
    }

    let padded_width = (bounds.width - 2.0 * TEXT_INSET).max(0.0);
    let padded_height = (bounds.height - 2.0 * TEXT_INSET).max(0.0);

    let mut lo = min;
    let mut hi = max;
    let mut best = None;
    while lo <= hi {
        let mid = lo + (hi - lo) / 2;
        #[allow(clippy::cast_precision_loss)]
        let metrics = measurer.measure_block(
            text,
            font,
            mid as f32,
            padded_width,
            constraints.line_height,
            constraints.letter_spacing,
        );
        let feasible = metrics.height <= padded_height
            && metrics.max_line_width <= padded_width
            && constraints
                .max_lines
                .is_none_or(|cap| metrics.line_count <= cap);
        if feasible {
            best = Some(mid);
            lo = mid + 1;
        } else {
            if mid == 0 {
                break;
            }
            hi = mid - 1;
        }
    }
    best.unwrap_or(min)
}

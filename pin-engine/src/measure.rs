//! Text measurement with shared line-breaking rules.
//!
//! The auto-fit solver and the paint path must agree on how text wraps, or a
//! size chosen by the solver can still overflow at paint time. To make that
//! structurally impossible, implementors of [`TextMeasurer`] only supply
//! per-glyph advances; the wrapping itself lives in the trait's provided
//! [`TextMeasurer::measure_block`] and is identical for every measurer.
//!
//! Wrapping is word-boundary only: a word wider than the container is placed
//! on its own line and overflows horizontally rather than breaking mid-word.

use pin_core::FontSpec;

/// Measured dimensions of a wrapped text block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockMetrics {
    /// Number of wrapped lines.
    pub line_count: u32,
    /// Total block height: `line_count * font_size * line_height`.
    pub height: f32,
    /// Width of the widest line.
    pub max_line_width: f32,
}

impl BlockMetrics {
    /// Metrics of an empty block.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            line_count: 0,
            height: 0.0,
            max_line_width: 0.0,
        }
    }
}

/// Per-glyph advance source with provided word-boundary wrapping.
pub trait TextMeasurer {
    /// Horizontal advance of one glyph at the given size, excluding
    /// letter-spacing.
    fn char_advance(&self, c: char, font: &FontSpec, font_size: f32) -> f32;

    /// Measure a word's width including per-glyph letter-spacing.
    fn word_width(&self, word: &str, font: &FontSpec, font_size: f32, letter_spacing: f32) -> f32 {
        word.chars()
            .map(|c| self.char_advance(c, font, font_size) + letter_spacing)
            .sum()
    }

    /// Wrap text at word boundaries into `max_width` and measure the block.
    ///
    /// Explicit newlines start new lines; empty input measures as an empty
    /// block. These rules are shared by the solver and the paint path.
    fn measure_block(
        &self,
        text: &str,
        font: &FontSpec,
        font_size: f32,
        max_width: f32,
        line_height: f32,
        letter_spacing: f32,
    ) -> BlockMetrics {
        if text.is_empty() {
            return BlockMetrics::empty();
        }

        let space_width = self.char_advance(' ', font, font_size) + letter_spacing;
        let mut line_count: u32 = 0;
        let mut max_line_width: f32 = 0.0;

        for paragraph in text.split('\n') {
            let mut current_width: Option<f32> = None;
            for word in paragraph.split_whitespace() {
                let word_width = self.word_width(word, font, font_size, letter_spacing);
                match current_width {
                    None => current_width = Some(word_width),
                    Some(width) if width + space_width + word_width <= max_width => {
                        current_width = Some(width + space_width + word_width);
                    }
                    Some(width) => {
                        // Line is full; the next word starts a new one.
                        line_count += 1;
                        max_line_width = max_line_width.max(width);
                        current_width = Some(word_width);
                    }
                }
            }
            // Blank paragraphs still occupy one line.
            line_count += 1;
            max_line_width = max_line_width.max(current_width.unwrap_or(0.0));
        }

        #[allow(clippy::cast_precision_loss)]
        let height = line_count as f32 * font_size * line_height;
        BlockMetrics {
            line_count,
            height,
            max_line_width,
        }
    }
}

/// Advance factor for narrow glyphs (em fraction).
const NARROW_FACTOR: f32 = 0.30;

/// Advance factor for wide glyphs.
const WIDE_FACTOR: f32 = 0.92;

/// Advance factor for capitals and digits.
const CAPS_FACTOR: f32 = 0.66;

/// Advance factor for the space glyph.
const SPACE_FACTOR: f32 = 0.33;

/// Default advance factor.
const REGULAR_FACTOR: f32 = 0.52;

/// Extra width multiplier for bold weights.
const BOLD_MULTIPLIER: f32 = 1.06;

/// Deterministic advance table approximating proportional fonts.
///
/// Used when no font backend is wired in; batch rendering servers that need
/// pixel parity substitute a measurer backed by real font metrics, and the
/// shared wrapping rules guarantee identical line breaks.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicMeasurer;

impl TextMeasurer for HeuristicMeasurer {
    fn char_advance(&self, c: char, font: &FontSpec, font_size: f32) -> f32 {
        let factor = if c == ' ' {
            SPACE_FACTOR
        } else if matches!(c, 'i' | 'j' | 'l' | 't' | 'f' | 'I' | '.' | ',' | ':' | ';' | '\''
            | '!' | '|')
        {
            NARROW_FACTOR
        } else if matches!(c, 'm' | 'w' | 'M' | 'W' | '@') {
            WIDE_FACTOR
        } else if c.is_ascii_uppercase() || c.is_ascii_digit() {
            CAPS_FACTOR
        } else {
            REGULAR_FACTOR
        };
        let weight = if font.weight >= 600 {
            BOLD_MULTIPLIER
        } else {
            1.0
        };
        font_size * factor * weight
    }
}

/// Fixed-advance measurer: every glyph is the same em fraction wide.
///
/// Handy for tests and for reasoning about wrap behavior with exact numbers.
#[derive(Debug, Clone, Copy)]
pub struct MonoMeasurer {
    /// Advance per glyph as a fraction of the font size.
    pub advance_em: f32,
}

impl Default for MonoMeasurer {
    fn default() -> Self {
        Self { advance_em: 0.5 }
    }
}

impl TextMeasurer for MonoMeasurer {
    fn char_advance(&self, _c: char, _font: &FontSpec, font_size: f32) -> f32 {
        font_size * self.advance_em
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn font() -> FontSpec {
        FontSpec::default()
    }

    #[test]
    fn test_empty_text_measures_empty() {
        let m = MonoMeasurer::default();
        let metrics = m.measure_block("", &font(), 20.0, 100.0, 1.2, 0.0);
        assert_eq!(metrics, BlockMetrics::empty());
    }

    #[test]
    fn test_single_line_fits() {
        let m = MonoMeasurer::default();
        // "abcd" at 10px mono 0.5em = 20px wide.
        let metrics = m.measure_block("abcd", &font(), 10.0, 100.0, 1.0, 0.0);
        assert_eq!(metrics.line_count, 1);
        assert!((metrics.height - 10.0).abs() < f32::EPSILON);
        assert!((metrics.max_line_width - 20.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_wraps_at_word_boundaries() {
        let m = MonoMeasurer::default();
        // Each word 20px, space ~5px + word 20px does not fit into 30px.
        let metrics = m.measure_block("abcd efgh ijkl", &font(), 10.0, 30.0, 1.0, 0.0);
        assert_eq!(metrics.line_count, 3);
    }

    #[test]
    fn test_never_breaks_mid_word() {
        let m = MonoMeasurer::default();
        // One 12-glyph word = 60px into a 30px container: one overflowing line.
        let metrics = m.measure_block("abcdefghijkl", &font(), 10.0, 30.0, 1.0, 0.0);
        assert_eq!(metrics.line_count, 1);
        assert!(metrics.max_line_width > 30.0);
    }

    #[test]
    fn test_explicit_newlines_start_lines() {
        let m = MonoMeasurer::default();
        let metrics = m.measure_block("ab\n\ncd", &font(), 10.0, 100.0, 1.0, 0.0);
        assert_eq!(metrics.line_count, 3);
    }

    #[test]
    fn test_measure_is_deterministic() {
        let m = HeuristicMeasurer;
        let a = m.measure_block("The same sentence", &font(), 17.0, 120.0, 1.3, 0.4);
        let b = m.measure_block("The same sentence", &font(), 17.0, 120.0, 1.3, 0.4);
        assert_eq!(a, b);
    }

    #[test]
    fn test_bold_is_wider() {
        let m = HeuristicMeasurer;
        let regular = font();
        let bold = FontSpec {
            weight: 700,
            ..font()
        };
        let a = m.word_width("weight", &regular, 20.0, 0.0);
        let b = m.word_width("weight", &bold, 20.0, 0.0);
        assert!(b > a);
    }

    #[test]
    fn test_wider_container_never_adds_lines() {
        let m = HeuristicMeasurer;
        let text = "a handful of words that wrap a few times over";
        let mut previous = u32::MAX;
        for width in [60.0, 90.0, 120.0, 200.0, 400.0] {
            let metrics = m.measure_block(text, &font(), 14.0, width, 1.2, 0.0);
            assert!(metrics.line_count <= previous);
            previous = metrics.line_count;
        }
    }
}

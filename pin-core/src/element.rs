//! Template elements - the building blocks of a pin design.
//!
//! An [`Element`] is the canonical, serializable description of one design
//! object. It carries no behavior beyond validation and patch application;
//! everything else (rendering, layout, history) is derived from it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

/// Marker prefix that binds an element name to a dynamic data field.
///
/// An element named `#title` is bound to the `title` column of the batch
/// data; its content becomes the `{{title}}` placeholder.
pub const DYNAMIC_NAME_MARKER: char = '#';

/// Opening token of a dynamic-field placeholder.
pub const PLACEHOLDER_OPEN: &str = "{{";

/// Closing token of a dynamic-field placeholder.
pub const PLACEHOLDER_CLOSE: &str = "}}";

/// Unique identifier for an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId(Uuid);

impl ElementId {
    /// Create a new unique element ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Extract the dynamic field name encoded in a display name, if any.
///
/// Returns `Some("title")` for `#title`, `None` for ordinary names.
#[must_use]
pub fn dynamic_field_from_name(name: &str) -> Option<&str> {
    let field = name.strip_prefix(DYNAMIC_NAME_MARKER)?;
    let field = field.trim();
    if field.is_empty() {
        None
    } else {
        Some(field)
    }
}

/// Build the `{{field}}` placeholder for a dynamic field name.
#[must_use]
pub fn placeholder_for(field: &str) -> String {
    format!("{PLACEHOLDER_OPEN}{field}{PLACEHOLDER_CLOSE}")
}

/// Check whether a string starts with a placeholder marker.
#[must_use]
pub fn is_placeholder(text: &str) -> bool {
    text.trim_start().starts_with(PLACEHOLDER_OPEN)
}

/// Axis-aligned rectangle in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width in canvas units.
    pub width: f32,
    /// Height in canvas units.
    pub height: f32,
}

impl Rect {
    /// Create a new rectangle.
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Check whether two rectangles overlap.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }

    /// Check if a point lies within this rectangle.
    #[must_use]
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

/// Position, size and stacking for an element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// X position (canvas units from left).
    pub x: f32,
    /// Y position (canvas units from top).
    pub y: f32,
    /// Width in canvas units.
    pub width: f32,
    /// Height in canvas units.
    pub height: f32,
    /// Rotation in degrees.
    pub rotation: f32,
    /// Z-index for paint order. Compacted to a dense `0..N-1` by the model.
    pub z_index: i32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
            rotation: 0.0,
            z_index: 0,
        }
    }
}

/// Font family, weight and style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontSpec {
    /// Font family name.
    pub family: String,
    /// Numeric weight (400 regular, 700 bold).
    pub weight: u16,
    /// Italic flag.
    pub italic: bool,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            family: "Inter".to_string(),
            weight: 400,
            italic: false,
        }
    }
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    /// Align to the left edge.
    #[default]
    Left,
    /// Center within the container.
    Center,
    /// Align to the right edge.
    Right,
}

/// Letter-casing transform applied at paint time.
///
/// The stored content is never rewritten; the transform is applied to the
/// display text only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextCase {
    /// No transform.
    #[default]
    None,
    /// ALL UPPERCASE.
    Upper,
    /// all lowercase.
    Lower,
    /// First Letter Of Each Word.
    Title,
}

impl TextCase {
    /// Apply the casing transform to display text.
    #[must_use]
    pub fn apply(self, text: &str) -> String {
        match self {
            Self::None => text.to_string(),
            Self::Upper => text.to_uppercase(),
            Self::Lower => text.to_lowercase(),
            Self::Title => text
                .split_inclusive(char::is_whitespace)
                .map(|word| {
                    let mut chars = word.chars();
                    match chars.next() {
                        Some(first) => {
                            first.to_uppercase().collect::<String>() + chars.as_str()
                        }
                        None => String::new(),
                    }
                })
                .collect(),
        }
    }
}

/// Drop shadow styling for text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextShadow {
    /// Shadow color as hex.
    pub color: String,
    /// Blur radius.
    pub blur: f32,
    /// Horizontal offset.
    pub offset_x: f32,
    /// Vertical offset.
    pub offset_y: f32,
}

/// Outline stroke styling for text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStroke {
    /// Stroke color as hex.
    pub color: String,
    /// Stroke width in canvas units.
    pub width: f32,
}

/// Background box painted behind a text block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBackground {
    /// Box fill color as hex.
    pub color: String,
    /// Padding around the text on all sides.
    pub padding: f32,
    /// Corner radius of the box.
    pub corner_radius: f32,
}

/// Auto-fit sizing parameters for a text element.
///
/// When enabled, the render-side solver picks the largest integer font size
/// in `[min_font_size, max_font_size]` that fits the container. The stored
/// [`TextBody::font_size`] stays the user-configured value; the computed
/// size lives on the render object only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoFit {
    /// Whether auto-fit is active.
    pub enabled: bool,
    /// Smallest size the solver may return.
    pub min_font_size: u32,
    /// Largest size the solver may return.
    pub max_font_size: u32,
    /// Optional cap on wrapped line count.
    pub max_lines: Option<u32>,
}

impl Default for AutoFit {
    fn default() -> Self {
        Self {
            enabled: false,
            min_font_size: 10,
            max_font_size: 120,
            max_lines: None,
        }
    }
}

/// Text element payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBody {
    /// Text content. Holds a `{{field}}` placeholder when dynamically bound.
    pub content: String,
    /// Font selection.
    pub font: FontSpec,
    /// User-configured font size. Never overwritten by the auto-fit solver.
    pub font_size: f32,
    /// Fill color as hex.
    pub fill: String,
    /// Horizontal alignment.
    pub align: TextAlign,
    /// Line height multiplier.
    pub line_height: f32,
    /// Additional spacing per glyph, canvas units.
    pub letter_spacing: f32,
    /// Optional drop shadow.
    pub shadow: Option<TextShadow>,
    /// Optional outline stroke.
    pub stroke: Option<TextStroke>,
    /// Optional background box.
    pub background: Option<TextBackground>,
    /// Letter-casing transform applied at paint time.
    pub case: TextCase,
    /// Auto-fit sizing parameters.
    pub auto_fit: AutoFit,
    /// Preview text painted instead of a raw placeholder while editing.
    pub preview: Option<String>,
}

impl TextBody {
    /// Create a text payload with default styling.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            font: FontSpec::default(),
            font_size: 24.0,
            fill: "#000000".to_string(),
            align: TextAlign::Left,
            line_height: 1.2,
            letter_spacing: 0.0,
            shadow: None,
            stroke: None,
            background: None,
            case: TextCase::None,
            auto_fit: AutoFit::default(),
            preview: None,
        }
    }
}

/// How an image is scaled into its container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Scale to cover the container, cropping overflow.
    #[default]
    Cover,
    /// Scale to fit entirely inside the container.
    Contain,
    /// Stretch to the container, ignoring aspect ratio.
    Fill,
}

/// Normalized crop rectangle (components in `0..=1` of the source image).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    /// Left edge, fraction of source width.
    pub x: f32,
    /// Top edge, fraction of source height.
    pub y: f32,
    /// Crop width, fraction of source width.
    pub width: f32,
    /// Crop height, fraction of source height.
    pub height: f32,
}

/// Image element payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageBody {
    /// Source URL. Empty string renders as a placeholder. Holds a
    /// `{{field}}` placeholder when dynamically bound.
    pub src: String,
    /// Scaling mode.
    pub fit: FitMode,
    /// Corner radius in canvas units.
    pub corner_radius: f32,
    /// Optional crop rectangle.
    pub crop: Option<CropRect>,
}

impl ImageBody {
    /// Create an image payload for a source URL.
    #[must_use]
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            fit: FitMode::Cover,
            corner_radius: 0.0,
            crop: None,
        }
    }
}

/// Geometric primitive of a shape element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ShapeKind {
    /// Axis-aligned rectangle filling the element bounds.
    Rect,
    /// Ellipse inscribed in the element bounds.
    Circle,
    /// Arbitrary path in SVG path syntax.
    Path {
        /// SVG path data. Must not be empty.
        data: String,
    },
}

/// Outline stroke styling for shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeStroke {
    /// Stroke color as hex.
    pub color: String,
    /// Stroke width in canvas units.
    pub width: f32,
}

/// Shape element payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeBody {
    /// Geometric primitive.
    pub shape: ShapeKind,
    /// Fill color as hex.
    pub fill: String,
    /// Optional outline stroke.
    pub stroke: Option<ShapeStroke>,
    /// Corner radius (rect shapes only).
    pub corner_radius: f32,
}

impl ShapeBody {
    /// Create a shape payload.
    #[must_use]
    pub fn new(shape: ShapeKind) -> Self {
        Self {
            shape,
            fill: "#CCCCCC".to_string(),
            stroke: None,
            corner_radius: 0.0,
        }
    }
}

/// Layout direction for frame children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowDirection {
    /// Children flow top to bottom.
    #[default]
    Column,
    /// Children flow left to right.
    Row,
}

/// Cross-axis alignment of frame children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameAlign {
    /// Pack against the leading edge.
    #[default]
    Start,
    /// Center on the cross axis.
    Center,
    /// Pack against the trailing edge.
    End,
}

/// Frame element payload - rudimentary auto-layout container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameBody {
    /// Ordered child element IDs.
    pub children: Vec<ElementId>,
    /// Layout direction.
    pub direction: FlowDirection,
    /// Gap between children in canvas units.
    pub gap: f32,
    /// Padding inside the frame on all sides.
    pub padding: f32,
    /// Cross-axis alignment.
    pub align: FrameAlign,
}

/// The type of content an element contains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ElementKind {
    /// A text block.
    Text(TextBody),
    /// An image.
    Image(ImageBody),
    /// A vector shape.
    Shape(ShapeBody),
    /// A container frame with auto-layout.
    Frame(FrameBody),
}

/// A template element with content, geometry and binding metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Unique identifier, immutable for the element's lifetime.
    pub id: ElementId,
    /// Display label. A `#field` name encodes a dynamic binding.
    pub name: String,
    /// Position, size and stacking.
    pub transform: Transform,
    /// Opacity in `0..=1`.
    pub opacity: f32,
    /// Locked against interactive manipulation. Programmatic updates are
    /// still permitted.
    pub locked: bool,
    /// Visibility flag.
    pub visible: bool,
    /// Whether this element is bound to a dynamic data field.
    pub is_dynamic: bool,
    /// Bound field name, meaningful only when `is_dynamic` is set.
    pub dynamic_field: Option<String>,
    /// Optional data-source label, meaningful only when `is_dynamic` is set.
    pub dynamic_source: Option<String>,
    /// Element content.
    pub kind: ElementKind,
}

impl Element {
    /// Create a new element with the given name and kind.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ElementKind) -> Self {
        Self {
            id: ElementId::new(),
            name: name.into(),
            transform: Transform::default(),
            opacity: 1.0,
            locked: false,
            visible: true,
            is_dynamic: false,
            dynamic_field: None,
            dynamic_source: None,
            kind,
        }
    }

    /// Set the transform.
    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Text payload, if this is a text element.
    #[must_use]
    pub fn as_text(&self) -> Option<&TextBody> {
        match &self.kind {
            ElementKind::Text(body) => Some(body),
            _ => None,
        }
    }

    /// Image payload, if this is an image element.
    #[must_use]
    pub fn as_image(&self) -> Option<&ImageBody> {
        match &self.kind {
            ElementKind::Image(body) => Some(body),
            _ => None,
        }
    }

    /// Shape payload, if this is a shape element.
    #[must_use]
    pub fn as_shape(&self) -> Option<&ShapeBody> {
        match &self.kind {
            ElementKind::Shape(body) => Some(body),
            _ => None,
        }
    }

    /// Frame payload, if this is a frame element.
    #[must_use]
    pub fn as_frame(&self) -> Option<&FrameBody> {
        match &self.kind {
            ElementKind::Frame(body) => Some(body),
            _ => None,
        }
    }

    /// Axis-aligned bounding box (rotation ignored).
    #[must_use]
    pub fn bounds(&self) -> Rect {
        let t = &self.transform;
        Rect::new(t.x, t.y, t.width, t.height)
    }

    /// Validate the element for rendering.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] for malformed data: empty path
    /// shapes, non-finite or non-positive dimensions, or inverted auto-fit
    /// bounds. A rejected element stays in the model but renders as absent.
    pub fn validate(&self) -> CoreResult<()> {
        let t = &self.transform;
        if !t.x.is_finite() || !t.y.is_finite() || !t.width.is_finite() || !t.height.is_finite() {
            return Err(CoreError::Validation(format!(
                "element {} has non-finite geometry",
                self.id
            )));
        }
        if t.width <= 0.0 || t.height <= 0.0 {
            return Err(CoreError::Validation(format!(
                "element {} has non-positive dimensions {}x{}",
                self.id, t.width, t.height
            )));
        }
        match &self.kind {
            ElementKind::Shape(body) => {
                if let ShapeKind::Path { data } = &body.shape {
                    if data.trim().is_empty() {
                        return Err(CoreError::Validation(format!(
                            "path shape {} has empty path data",
                            self.id
                        )));
                    }
                }
            }
            ElementKind::Text(body) => {
                let fit = &body.auto_fit;
                if fit.enabled && fit.min_font_size > fit.max_font_size {
                    return Err(CoreError::Validation(format!(
                        "text {} has inverted auto-fit bounds {}..{}",
                        self.id, fit.min_font_size, fit.max_font_size
                    )));
                }
            }
            ElementKind::Image(_) | ElementKind::Frame(_) => {}
        }
        Ok(())
    }

    /// Apply a shallow partial update, returning which facets changed.
    ///
    /// Fields that do not apply to this element's kind are ignored without
    /// error: the model stays authoritative and nothing is lost.
    pub fn apply_patch(&mut self, patch: &ElementPatch) -> ChangeSet {
        let mut changes = ChangeSet::default();

        if let Some(name) = &patch.name {
            if *name != self.name {
                self.name.clone_from(name);
                changes.name = true;
            }
        }
        if let Some(x) = patch.x {
            changes.geometry |= ne(self.transform.x, x);
            self.transform.x = x;
        }
        if let Some(y) = patch.y {
            changes.geometry |= ne(self.transform.y, y);
            self.transform.y = y;
        }
        if let Some(width) = patch.width {
            let resized = ne(self.transform.width, width);
            changes.geometry |= resized;
            changes.size |= resized;
            self.transform.width = width;
        }
        if let Some(height) = patch.height {
            let resized = ne(self.transform.height, height);
            changes.geometry |= resized;
            changes.size |= resized;
            self.transform.height = height;
        }
        if let Some(rotation) = patch.rotation {
            changes.geometry |= ne(self.transform.rotation, rotation);
            self.transform.rotation = rotation;
        }
        if let Some(opacity) = patch.opacity {
            changes.style |= ne(self.opacity, opacity);
            self.opacity = opacity;
        }
        if let Some(locked) = patch.locked {
            changes.meta |= locked != self.locked;
            self.locked = locked;
        }
        if let Some(visible) = patch.visible {
            changes.visibility |= visible != self.visible;
            self.visible = visible;
        }
        if let Some(z_index) = patch.z_index {
            changes.z_order |= z_index != self.transform.z_index;
            self.transform.z_index = z_index;
        }
        if let Some(source) = &patch.dynamic_source {
            if self.dynamic_source.as_deref() != Some(source.as_str()) {
                self.dynamic_source = Some(source.clone());
                changes.meta = true;
            }
        }

        self.apply_kind_patch(patch, &mut changes);
        changes
    }

    /// Apply the kind-specific portion of a patch.
    #[allow(clippy::too_many_lines)]
    fn apply_kind_patch(&mut self, patch: &ElementPatch, changes: &mut ChangeSet) {
        match &mut self.kind {
            ElementKind::Text(body) => {
                if let Some(content) = &patch.content {
                    if *content != body.content {
                        body.content.clone_from(content);
                        changes.content = true;
                    }
                }
                if let Some(family) = &patch.font_family {
                    if *family != body.font.family {
                        body.font.family.clone_from(family);
                        changes.font_family = true;
                    }
                }
                if let Some(weight) = patch.font_weight {
                    changes.style |= weight != body.font.weight;
                    body.font.weight = weight;
                }
                if let Some(italic) = patch.italic {
                    changes.style |= italic != body.font.italic;
                    body.font.italic = italic;
                }
                if let Some(font_size) = patch.font_size {
                    changes.font_size |= ne(body.font_size, font_size);
                    body.font_size = font_size;
                }
                if let Some(fill) = &patch.fill {
                    changes.style |= *fill != body.fill;
                    body.fill.clone_from(fill);
                }
                if let Some(align) = patch.align {
                    changes.style |= align != body.align;
                    body.align = align;
                }
                if let Some(line_height) = patch.line_height {
                    changes.style |= ne(body.line_height, line_height);
                    body.line_height = line_height;
                }
                if let Some(letter_spacing) = patch.letter_spacing {
                    changes.style |= ne(body.letter_spacing, letter_spacing);
                    body.letter_spacing = letter_spacing;
                }
                if let Some(case) = patch.case {
                    changes.content |= case != body.case;
                    body.case = case;
                }
                if let Some(auto_fit) = patch.auto_fit {
                    changes.auto_fit |= auto_fit != body.auto_fit;
                    body.auto_fit = auto_fit;
                }
                if let Some(preview) = &patch.preview {
                    if body.preview.as_deref() != Some(preview.as_str()) {
                        body.preview = Some(preview.clone());
                        changes.content = true;
                    }
                }
            }
            ElementKind::Image(body) => {
                if let Some(src) = &patch.src {
                    if *src != body.src {
                        body.src.clone_from(src);
                        changes.src = true;
                    }
                }
                if let Some(fit) = patch.fit {
                    changes.style |= fit != body.fit;
                    body.fit = fit;
                }
                if let Some(corner_radius) = patch.corner_radius {
                    changes.style |= ne(body.corner_radius, corner_radius);
                    body.corner_radius = corner_radius;
                }
                if let Some(crop) = patch.crop {
                    changes.style |= crop != body.crop;
                    body.crop = crop;
                }
            }
            ElementKind::Shape(body) => {
                if let Some(fill) = &patch.fill {
                    changes.style |= *fill != body.fill;
                    body.fill.clone_from(fill);
                }
                if let Some(corner_radius) = patch.corner_radius {
                    changes.style |= ne(body.corner_radius, corner_radius);
                    body.corner_radius = corner_radius;
                }
                if let Some(data) = &patch.path_data {
                    if let ShapeKind::Path { data: existing } = &mut body.shape {
                        changes.style |= *data != *existing;
                        existing.clone_from(data);
                    }
                }
            }
            ElementKind::Frame(body) => {
                if let Some(children) = &patch.children {
                    body.children.clone_from(children);
                    changes.style = true;
                }
                if let Some(direction) = patch.direction {
                    changes.style |= direction != body.direction;
                    body.direction = direction;
                }
                if let Some(gap) = patch.gap {
                    changes.style |= ne(body.gap, gap);
                    body.gap = gap;
                }
                if let Some(padding) = patch.padding {
                    changes.style |= ne(body.padding, padding);
                    body.padding = padding;
                }
            }
        }
    }
}

/// Float inequality with an epsilon guard.
fn ne(a: f32, b: f32) -> bool {
    (a - b).abs() > f32::EPSILON
}

/// Shallow partial update over an [`Element`].
///
/// `None` fields are left untouched. Kind-specific fields are ignored when
/// the target element is of a different kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementPatch {
    /// New display name. May trigger dynamic-binding promotion/demotion.
    pub name: Option<String>,
    /// New X position.
    pub x: Option<f32>,
    /// New Y position.
    pub y: Option<f32>,
    /// New width.
    pub width: Option<f32>,
    /// New height.
    pub height: Option<f32>,
    /// New rotation in degrees.
    pub rotation: Option<f32>,
    /// New opacity.
    pub opacity: Option<f32>,
    /// New lock flag.
    pub locked: Option<bool>,
    /// New visibility flag.
    pub visible: Option<bool>,
    /// New z-index. Triggers compaction.
    pub z_index: Option<i32>,
    /// New data-source label.
    pub dynamic_source: Option<String>,
    /// New text content.
    pub content: Option<String>,
    /// New font family.
    pub font_family: Option<String>,
    /// New font weight.
    pub font_weight: Option<u16>,
    /// New italic flag.
    pub italic: Option<bool>,
    /// New user-configured font size.
    pub font_size: Option<f32>,
    /// New fill color (text and shape elements).
    pub fill: Option<String>,
    /// New text alignment.
    pub align: Option<TextAlign>,
    /// New line height multiplier.
    pub line_height: Option<f32>,
    /// New letter spacing.
    pub letter_spacing: Option<f32>,
    /// New casing transform.
    pub case: Option<TextCase>,
    /// New auto-fit parameters.
    pub auto_fit: Option<AutoFit>,
    /// New preview text for dynamic elements.
    pub preview: Option<String>,
    /// New image source URL.
    pub src: Option<String>,
    /// New image fit mode.
    pub fit: Option<FitMode>,
    /// New corner radius (image and shape elements).
    pub corner_radius: Option<f32>,
    /// New crop rectangle. `Some(None)` clears an existing crop.
    pub crop: Option<Option<CropRect>>,
    /// New path data (path shapes only).
    pub path_data: Option<String>,
    /// New frame children.
    pub children: Option<Vec<ElementId>>,
    /// New frame layout direction.
    pub direction: Option<FlowDirection>,
    /// New frame gap.
    pub gap: Option<f32>,
    /// New frame padding.
    pub padding: Option<f32>,
}

impl ElementPatch {
    /// A patch that only moves an element.
    #[must_use]
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    /// A patch that only resizes an element.
    #[must_use]
    pub fn sized(width: f32, height: f32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Self::default()
        }
    }
}

/// Which facets of an element a patch actually changed.
///
/// Drives the bridge's reconciliation triggers: the auto-fit solver re-runs
/// on `content`, `size`, `font_family` or `auto_fit` changes but never
/// on `font_size` alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Position, size or rotation changed.
    pub geometry: bool,
    /// Width or height changed. Subset of `geometry`.
    pub size: bool,
    /// Text content, casing or preview changed.
    pub content: bool,
    /// Font family changed.
    pub font_family: bool,
    /// User-configured font size changed.
    pub font_size: bool,
    /// Paint-only styling changed.
    pub style: bool,
    /// Z-index changed.
    pub z_order: bool,
    /// Display name changed.
    pub name: bool,
    /// Visibility changed.
    pub visibility: bool,
    /// Auto-fit parameters changed.
    pub auto_fit: bool,
    /// Image source changed.
    pub src: bool,
    /// Lock flag or data-source label changed.
    pub meta: bool,
}

impl ChangeSet {
    /// Whether anything changed at all.
    #[must_use]
    pub fn any(&self) -> bool {
        self.geometry
            || self.size
            || self.content
            || self.font_family
            || self.font_size
            || self.style
            || self.z_order
            || self.name
            || self.visibility
            || self.auto_fit
            || self.src
            || self.meta
    }
}

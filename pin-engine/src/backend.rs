//! Render-backend object state.
//!
//! The model is authoritative; each visible element gets at most one
//! [`RenderObject`] mirroring it on the paint side. Writes to an object go
//! through [`RenderProps::diff`] so that only genuinely changed fields are
//! touched, and any geometric write marks the object for an explicit
//! geometry recompute before the next layout-dependent read.

use pin_core::{
    Element, ElementKind, FitMode, FontSpec, Rect, ShapeKind, ShapeStroke, TextAlign,
};
use serde::{Deserialize, Serialize};

use crate::error::EngineResult;

/// Float inequality with an epsilon guard.
fn ne(a: f32, b: f32) -> bool {
    (a - b).abs() > f32::EPSILON
}

/// Paint properties of a text object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextProps {
    /// Text as painted: preview or placeholder resolution plus casing
    /// already applied.
    pub display_text: String,
    /// Font face.
    pub font: FontSpec,
    /// Effective font size. Holds the auto-fit solver output when auto-fit
    /// is enabled; the model's stored size is never overwritten by it.
    pub font_size: f32,
    /// Fill color as hex.
    pub fill: String,
    /// Horizontal alignment.
    pub align: TextAlign,
    /// Line height multiplier.
    pub line_height: f32,
    /// Additional spacing per glyph.
    pub letter_spacing: f32,
}

/// Paint properties of an image object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageProps {
    /// Source URL.
    pub src: String,
    /// Scaling mode.
    pub fit: FitMode,
    /// Corner radius in canvas units.
    pub corner_radius: f32,
    /// Painted as a placeholder because the asset failed to load.
    pub degraded: bool,
}

/// Paint properties of a shape object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeProps {
    /// Geometric primitive.
    pub shape: ShapeKind,
    /// Fill color as hex.
    pub fill: String,
    /// Optional outline stroke.
    pub stroke: Option<ShapeStroke>,
    /// Corner radius (rect shapes only).
    pub corner_radius: f32,
}

/// Complete paint-property set of one render object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderProps {
    /// X position in canvas units.
    pub x: f32,
    /// Y position in canvas units.
    pub y: f32,
    /// Width in canvas units.
    pub width: f32,
    /// Height in canvas units.
    pub height: f32,
    /// Rotation in degrees.
    pub rotation: f32,
    /// Stacking position.
    pub z_index: i32,
    /// Opacity in `0..=1`.
    pub opacity: f32,
    /// Visibility flag.
    pub visible: bool,
    /// Text payload, for text elements.
    pub text: Option<TextProps>,
    /// Image payload, for image elements.
    pub image: Option<ImageProps>,
    /// Shape payload, for shape elements.
    pub shape: Option<ShapeProps>,
}

impl RenderProps {
    /// Build the desired paint properties for an element.
    ///
    /// `computed_font_size` carries the auto-fit solver output when it ran;
    /// `display_text` carries the resolved display text for text elements.
    #[must_use]
    pub fn from_element(
        element: &Element,
        computed_font_size: Option<f32>,
        display_text: Option<String>,
    ) -> Self {
        let t = &element.transform;
        let text = element.as_text().map(|body| TextProps {
            display_text: display_text.unwrap_or_else(|| body.content.clone()),
            font: body.font.clone(),
            font_size: computed_font_size.unwrap_or(body.font_size),
            fill: body.fill.clone(),
            align: body.align,
            line_height: body.line_height,
            letter_spacing: body.letter_spacing,
        });
        let image = element.as_image().map(|body| ImageProps {
            src: body.src.clone(),
            fit: body.fit,
            corner_radius: body.corner_radius,
            degraded: false,
        });
        let shape = element.as_shape().map(|body| ShapeProps {
            shape: body.shape.clone(),
            fill: body.fill.clone(),
            stroke: body.stroke.clone(),
            corner_radius: body.corner_radius,
        });
        Self {
            x: t.x,
            y: t.y,
            width: t.width,
            height: t.height,
            rotation: t.rotation,
            z_index: t.z_index,
            opacity: element.opacity,
            visible: element.visible,
            text,
            image,
            shape,
        }
    }

    /// Field-level diff from `self` (current) to `desired`.
    ///
    /// Only fields that genuinely differ are populated, so applying the
    /// result writes the minimal set of backend properties. Identical props
    /// produce an empty patch.
    #[must_use]
    pub fn diff(&self, desired: &Self) -> RenderPatch {
        let mut patch = RenderPatch::default();
        if ne(self.x, desired.x) {
            patch.x = Some(desired.x);
        }
        if ne(self.y, desired.y) {
            patch.y = Some(desired.y);
        }
        if ne(self.width, desired.width) {
            patch.width = Some(desired.width);
        }
        if ne(self.height, desired.height) {
            patch.height = Some(desired.height);
        }
        if ne(self.rotation, desired.rotation) {
            patch.rotation = Some(desired.rotation);
        }
        if self.z_index != desired.z_index {
            patch.z_index = Some(desired.z_index);
        }
        if ne(self.opacity, desired.opacity) {
            patch.opacity = Some(desired.opacity);
        }
        if self.visible != desired.visible {
            patch.visible = Some(desired.visible);
        }
        if self.text != desired.text {
            patch.text = desired.text.clone();
        }
        if self.image != desired.image {
            patch.image = desired.image.clone();
        }
        if self.shape != desired.shape {
            patch.shape = desired.shape.clone();
        }
        patch
    }
}

/// Minimal write set produced by [`RenderProps::diff`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderPatch {
    /// New X position.
    pub x: Option<f32>,
    /// New Y position.
    pub y: Option<f32>,
    /// New width.
    pub width: Option<f32>,
    /// New height.
    pub height: Option<f32>,
    /// New rotation.
    pub rotation: Option<f32>,
    /// New stacking position.
    pub z_index: Option<i32>,
    /// New opacity.
    pub opacity: Option<f32>,
    /// New visibility.
    pub visible: Option<bool>,
    /// Replacement text payload.
    pub text: Option<TextProps>,
    /// Replacement image payload.
    pub image: Option<ImageProps>,
    /// Replacement shape payload.
    pub shape: Option<ShapeProps>,
}

impl RenderPatch {
    /// Whether the patch writes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether the patch writes any layout-affecting field.
    #[must_use]
    pub fn touches_geometry(&self) -> bool {
        self.x.is_some()
            || self.y.is_some()
            || self.width.is_some()
            || self.height.is_some()
            || self.rotation.is_some()
    }
}

/// Geometry read back from the render side after direct manipulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometryReadback {
    /// X position.
    pub x: f32,
    /// Y position.
    pub y: f32,
    /// Effective width: stored width with the internal scale multiplied out.
    pub width: f32,
    /// Effective height: stored height with the internal scale multiplied
    /// out.
    pub height: f32,
    /// Rotation in degrees.
    pub rotation: f32,
    /// Internal X scale at readback time.
    pub scale_x: f32,
    /// Internal Y scale at readback time.
    pub scale_y: f32,
}

/// Live paint-side mirror of one element.
#[derive(Debug, Clone)]
pub struct RenderObject {
    /// Last model state this object was reconciled against.
    element: Element,
    /// Current paint properties.
    props: RenderProps,
    /// Set when a geometric field was written and the explicit recompute
    /// has not run yet.
    geometry_dirty: bool,
    /// Internal X scale applied by the render side (e.g. corner-handle
    /// resize gestures scale before committing).
    scale_x: f32,
    /// Internal Y scale.
    scale_y: f32,
}

impl RenderObject {
    /// Create a render object for a validated element.
    ///
    /// # Errors
    ///
    /// Returns the element's validation error; malformed elements get no
    /// render object and stay absent from the canvas.
    pub fn new(
        element: &Element,
        computed_font_size: Option<f32>,
        display_text: Option<String>,
    ) -> EngineResult<Self> {
        element.validate()?;
        Ok(Self {
            element: element.clone(),
            props: RenderProps::from_element(element, computed_font_size, display_text),
            geometry_dirty: false,
            scale_x: 1.0,
            scale_y: 1.0,
        })
    }

    /// Last reconciled model snapshot.
    #[must_use]
    pub fn element(&self) -> &Element {
        &self.element
    }

    /// Current paint properties.
    #[must_use]
    pub fn props(&self) -> &RenderProps {
        &self.props
    }

    /// Whether a geometric write is awaiting recompute.
    #[must_use]
    pub fn is_geometry_dirty(&self) -> bool {
        self.geometry_dirty
    }

    /// Replace the model snapshot without touching paint properties.
    ///
    /// Used for render-originated updates, where the paint side already
    /// shows the new state and writing it back would echo.
    pub fn refresh_snapshot(&mut self, element: &Element) {
        self.element = element.clone();
    }

    /// Apply a write set, marking geometry dirty on geometric fields.
    pub fn apply(&mut self, patch: &RenderPatch) {
        if patch.touches_geometry() {
            self.geometry_dirty = true;
        }
        if let Some(x) = patch.x {
            self.props.x = x;
        }
        if let Some(y) = patch.y {
            self.props.y = y;
        }
        if let Some(width) = patch.width {
            self.props.width = width;
        }
        if let Some(height) = patch.height {
            self.props.height = height;
        }
        if let Some(rotation) = patch.rotation {
            self.props.rotation = rotation;
        }
        if let Some(z_index) = patch.z_index {
            self.props.z_index = z_index;
        }
        if let Some(opacity) = patch.opacity {
            self.props.opacity = opacity;
        }
        if let Some(visible) = patch.visible {
            self.props.visible = visible;
        }
        if let Some(text) = &patch.text {
            self.props.text = Some(text.clone());
        }
        if let Some(image) = &patch.image {
            self.props.image = Some(image.clone());
        }
        if let Some(shape) = &patch.shape {
            self.props.shape = Some(shape.clone());
        }
    }

    /// Run the explicit post-write geometry recompute.
    ///
    /// Clears the dirty flag and returns the object's current bounding box
    /// for spatial-index maintenance.
    pub fn recompute_geometry(&mut self) -> Rect {
        self.geometry_dirty = false;
        self.bounds()
    }

    /// Current axis-aligned bounding box (effective dimensions).
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::new(
            self.props.x,
            self.props.y,
            self.props.width * self.scale_x,
            self.props.height * self.scale_y,
        )
    }

    /// Read back geometry after direct manipulation.
    ///
    /// Width and height are effective: the internal scale is multiplied out
    /// so the model can store plain dimensions.
    #[must_use]
    pub fn readback(&self) -> GeometryReadback {
        GeometryReadback {
            x: self.props.x,
            y: self.props.y,
            width: self.props.width * self.scale_x,
            height: self.props.height * self.scale_y,
            rotation: self.props.rotation,
            scale_x: self.scale_x,
            scale_y: self.scale_y,
        }
    }

    /// Set the internal scale the render side applies during gestures.
    pub fn set_scale(&mut self, scale_x: f32, scale_y: f32) {
        self.scale_x = scale_x;
        self.scale_y = scale_y;
        self.geometry_dirty = true;
    }

    /// Move and resize directly on the paint side, as a gesture does.
    pub fn set_geometry(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.props.x = x;
        self.props.y = y;
        self.props.width = width;
        self.props.height = height;
        self.geometry_dirty = true;
    }

    /// Reset the internal scale after its effect was folded into dimensions.
    pub fn reset_scale(&mut self) {
        self.scale_x = 1.0;
        self.scale_y = 1.0;
    }

    /// Mark or clear the degraded placeholder state on an image object.
    pub fn set_degraded(&mut self, degraded: bool) {
        if let Some(image) = &mut self.props.image {
            image.degraded = degraded;
        }
    }
}

/// Marker for which body kind an element carries. Used in logs.
#[must_use]
pub fn kind_label(element: &Element) -> &'static str {
    match element.kind {
        ElementKind::Text(_) => "text",
        ElementKind::Image(_) => "image",
        ElementKind::Shape(_) => "shape",
        ElementKind::Frame(_) => "frame",
    }
}

#[cfg(test)]
mod tests {
    use pin_core::{ImageBody, TextBody, Transform};

    use super::*;

    fn text_element() -> Element {
        Element::new("caption", ElementKind::Text(TextBody::new("Hello"))).with_transform(
            Transform {
                x: 10.0,
                y: 20.0,
                width: 200.0,
                height: 60.0,
                rotation: 0.0,
                z_index: 0,
            },
        )
    }

    #[test]
    fn test_identical_props_diff_empty() {
        let element = text_element();
        let props = RenderProps::from_element(&element, None, None);
        assert!(props.diff(&props.clone()).is_empty());
    }

    #[test]
    fn test_diff_populates_only_changed_fields() {
        let element = text_element();
        let current = RenderProps::from_element(&element, None, None);
        let mut desired = current.clone();
        desired.opacity = 0.5;

        let patch = current.diff(&desired);
        assert_eq!(patch.opacity, Some(0.5));
        assert!(patch.x.is_none());
        assert!(patch.text.is_none());
        assert!(!patch.touches_geometry());
    }

    #[test]
    fn test_geometry_patch_marks_dirty_until_recompute() {
        let element = text_element();
        let mut object = RenderObject::new(&element, None, None).expect("valid");
        assert!(!object.is_geometry_dirty());

        let patch = RenderPatch {
            x: Some(50.0),
            ..RenderPatch::default()
        };
        object.apply(&patch);
        assert!(object.is_geometry_dirty());

        let bounds = object.recompute_geometry();
        assert!(!object.is_geometry_dirty());
        assert!((bounds.x - 50.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_non_geometry_patch_leaves_clean() {
        let element = text_element();
        let mut object = RenderObject::new(&element, None, None).expect("valid");
        let patch = RenderPatch {
            opacity: Some(0.3),
            ..RenderPatch::default()
        };
        object.apply(&patch);
        assert!(!object.is_geometry_dirty());
    }

    #[test]
    fn test_readback_multiplies_out_scale() {
        let element = text_element();
        let mut object = RenderObject::new(&element, None, None).expect("valid");
        object.set_scale(2.0, 0.5);

        let readback = object.readback();
        assert!((readback.width - 400.0).abs() < f32::EPSILON);
        assert!((readback.height - 30.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_invalid_element_gets_no_object() {
        let mut element = text_element();
        element.transform.width = 0.0;
        assert!(RenderObject::new(&element, None, None).is_err());
    }

    #[test]
    fn test_computed_font_size_lands_in_props_only() {
        let element = text_element();
        let object = RenderObject::new(&element, Some(31.0), None).expect("valid");
        let text = object.props().text.as_ref().expect("text props");
        assert!((text.font_size - 31.0).abs() < f32::EPSILON);
        // The snapshot keeps the stored model size.
        let stored = object.element().as_text().expect("text").font_size;
        assert!((stored - text.font_size).abs() > f32::EPSILON);
    }

    #[test]
    fn test_degraded_flag_set_on_image() {
        let element = Element::new(
            "photo",
            ElementKind::Image(ImageBody::new("https://img.example/x.png")),
        )
        .with_transform(Transform {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
            rotation: 0.0,
            z_index: 0,
        });
        let mut object = RenderObject::new(&element, None, None).expect("valid");
        object.set_degraded(true);
        assert!(object.props().image.as_ref().expect("image").degraded);
    }
}

//! Canonical scene model - the single mutable source of truth.
//!
//! Render objects and the spatial index are derived caches that must be
//! rebuildable from this model at any time. Mutations go through
//! [`SceneModel::insert`], [`SceneModel::upsert`] and [`SceneModel::remove`];
//! each emits a [`ModelEvent`] on a broadcast channel so presentation layers
//! can re-render without polling.

use std::collections::HashMap;

use tokio::sync::broadcast;

use crate::element::{
    dynamic_field_from_name, is_placeholder, placeholder_for, ChangeSet, Element, ElementId,
    ElementKind, ElementPatch,
};
use crate::error::{CoreError, CoreResult};
use crate::event::{ModelEvent, UpdateOrigin};

/// Default canvas width for a new pin template (2:3 portrait).
const DEFAULT_CANVAS_WIDTH: f32 = 1000.0;

/// Default canvas height for a new pin template.
const DEFAULT_CANVAS_HEIGHT: f32 = 1500.0;

/// Capacity of the change-notification channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// The scene model holding all elements of one template.
#[derive(Debug)]
pub struct SceneModel {
    /// All elements, indexed by ID.
    elements: HashMap<ElementId, Element>,
    /// Insertion order, used to break z-index ties during compaction.
    order: Vec<ElementId>,
    /// Canvas width in canvas units.
    pub canvas_width: f32,
    /// Canvas height in canvas units.
    pub canvas_height: f32,
    /// Canvas background color as hex.
    pub background_color: String,
    /// Change-notification channel.
    events: broadcast::Sender<ModelEvent>,
}

impl SceneModel {
    /// Create an empty model with the given canvas size and background.
    #[must_use]
    pub fn new(canvas_width: f32, canvas_height: f32, background_color: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            elements: HashMap::new(),
            order: Vec::new(),
            canvas_width,
            canvas_height,
            background_color: background_color.into(),
            events,
        }
    }

    /// Subscribe to change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ModelEvent> {
        self.events.subscribe()
    }

    /// Get an element by ID.
    #[must_use]
    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    /// All elements in unspecified order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    /// All elements ordered by paint order (z-index, insertion order ties).
    #[must_use]
    pub fn list(&self) -> Vec<&Element> {
        let mut ordered: Vec<&Element> = self
            .order
            .iter()
            .filter_map(|id| self.elements.get(id))
            .collect();
        ordered.sort_by_key(|e| e.transform.z_index);
        ordered
    }

    /// Number of elements in the model.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Check if the model is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Insert a new element, stacking it on top.
    ///
    /// The element is accepted even if it fails render validation; malformed
    /// elements stay in the model and render as absent.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if an element with the same ID
    /// already exists.
    pub fn insert(&mut self, mut element: Element) -> CoreResult<ElementId> {
        let id = element.id;
        if self.elements.contains_key(&id) {
            return Err(CoreError::Validation(format!(
                "element {id} already exists"
            )));
        }
        // Stack on top; compaction makes the ordering dense.
        element.transform.z_index = i32::try_from(self.order.len()).unwrap_or(i32::MAX);
        apply_naming_convention(&mut element);
        self.elements.insert(id, element);
        self.order.push(id);
        self.compact_z();
        let _ = self.events.send(ModelEvent::ElementAdded { id });
        Ok(id)
    }

    /// Apply a partial update to an element.
    ///
    /// Fields absent from the patch are unchanged. Renaming to/from the
    /// `#field` convention promotes/demotes the dynamic binding. Locked
    /// elements accept programmatic updates; the lock only affects
    /// interactive manipulation.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ElementNotFound`] if the ID is unknown.
    pub fn upsert(
        &mut self,
        id: ElementId,
        patch: &ElementPatch,
        origin: UpdateOrigin,
    ) -> CoreResult<(Element, ChangeSet)> {
        let element = self
            .elements
            .get_mut(&id)
            .ok_or_else(|| CoreError::ElementNotFound(id.to_string()))?;

        let mut changes = element.apply_patch(patch);
        if changes.name {
            let (content_rewritten, src_rewritten) = apply_naming_convention(element);
            changes.content |= content_rewritten;
            changes.src |= src_rewritten;
        }
        let updated = element.clone();
        if changes.z_order {
            self.compact_z();
        }
        if changes.any() {
            let _ = self.events.send(ModelEvent::ElementChanged { id, origin });
        }
        Ok((updated, changes))
    }

    /// Remove an element.
    ///
    /// The element's ID is also dropped from any frame's child list.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ElementNotFound`] if the ID is unknown.
    pub fn remove(&mut self, id: ElementId) -> CoreResult<Element> {
        let removed = self
            .elements
            .remove(&id)
            .ok_or_else(|| CoreError::ElementNotFound(id.to_string()))?;
        self.order.retain(|&eid| eid != id);
        for element in self.elements.values_mut() {
            if let ElementKind::Frame(frame) = &mut element.kind {
                frame.children.retain(|&child| child != id);
            }
        }
        self.compact_z();
        let _ = self.events.send(ModelEvent::ElementRemoved { id });
        Ok(removed)
    }

    /// Replace the whole scene from a persisted template.
    ///
    /// Resets elements, canvas size and background; derived caches (render
    /// objects, spatial index, history) must be rebuilt by their owners.
    pub fn load_template(
        &mut self,
        elements: Vec<Element>,
        canvas_size: (f32, f32),
        background_color: impl Into<String>,
    ) {
        self.elements.clear();
        self.order.clear();
        self.canvas_width = canvas_size.0;
        self.canvas_height = canvas_size.1;
        self.background_color = background_color.into();
        for element in elements {
            let id = element.id;
            if self.elements.insert(id, element).is_some() {
                tracing::warn!("duplicate element {id} in template, keeping last");
            } else {
                self.order.push(id);
            }
        }
        self.compact_z();
        let _ = self.events.send(ModelEvent::SceneLoaded);
    }

    /// Rewrite z-indices to a dense `0..N-1`, ties broken by insertion order.
    fn compact_z(&mut self) {
        let mut ranked: Vec<(i32, usize, ElementId)> = self
            .order
            .iter()
            .enumerate()
            .filter_map(|(pos, id)| {
                self.elements
                    .get(id)
                    .map(|e| (e.transform.z_index, pos, *id))
            })
            .collect();
        ranked.sort_by_key(|&(z, pos, _)| (z, pos));
        for (new_z, (_, _, id)) in ranked.into_iter().enumerate() {
            if let Some(element) = self.elements.get_mut(&id) {
                element.transform.z_index = i32::try_from(new_z).unwrap_or(i32::MAX);
            }
        }
    }
}

impl Default for SceneModel {
    fn default() -> Self {
        Self::new(DEFAULT_CANVAS_WIDTH, DEFAULT_CANVAS_HEIGHT, "#FFFFFF")
    }
}

/// Re-evaluate the dynamic-binding naming convention after a rename.
///
/// Returns `(content_rewritten, src_rewritten)` so callers can fold the
/// rewrite into their change flags. Only text and image elements carry
/// bindings; other kinds are untouched.
fn apply_naming_convention(element: &mut Element) -> (bool, bool) {
    if !matches!(
        element.kind,
        ElementKind::Text(_) | ElementKind::Image(_)
    ) {
        return (false, false);
    }

    if let Some(field) = dynamic_field_from_name(&element.name).map(str::to_string) {
        let placeholder = placeholder_for(&field);
        element.is_dynamic = true;
        element.dynamic_field = Some(field);
        match &mut element.kind {
            ElementKind::Text(body) => {
                if body.content != placeholder {
                    body.content = placeholder;
                    return (true, false);
                }
            }
            ElementKind::Image(body) => {
                if body.src != placeholder {
                    body.src = placeholder;
                    return (false, true);
                }
            }
            _ => {}
        }
    } else if element.is_dynamic {
        element.is_dynamic = false;
        let field = element.dynamic_field.take().unwrap_or_default();
        match &mut element.kind {
            ElementKind::Text(body) => {
                // Only placeholder content is replaced with literal sample
                // text; anything the user typed over it is preserved.
                if is_placeholder(&body.content) {
                    body.content = field;
                    return (true, false);
                }
            }
            ElementKind::Image(body) => {
                if is_placeholder(&body.src) {
                    body.src = String::new();
                    return (false, true);
                }
            }
            _ => {}
        }
    }
    (false, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ImageBody, ShapeBody, ShapeKind, TextBody};

    fn text_element(name: &str, content: &str) -> Element {
        Element::new(name, ElementKind::Text(TextBody::new(content)))
    }

    #[test]
    fn test_upsert_merges_exactly() {
        let mut model = SceneModel::default();
        let id = model.insert(text_element("label", "Hi")).expect("insert");

        let patch = ElementPatch {
            x: Some(12.0),
            opacity: Some(0.5),
            ..ElementPatch::default()
        };
        let (updated, changes) = model
            .upsert(id, &patch, UpdateOrigin::Model)
            .expect("upsert");

        assert!(changes.geometry);
        assert!((updated.transform.x - 12.0).abs() < f32::EPSILON);
        assert!((updated.opacity - 0.5).abs() < f32::EPSILON);
        // Unspecified fields reflect the prior value.
        assert_eq!(updated.name, "label");
        assert_eq!(model.get(id).expect("get"), &updated);
    }

    #[test]
    fn test_upsert_unknown_id_fails() {
        let mut model = SceneModel::default();
        let result = model.upsert(
            ElementId::new(),
            &ElementPatch::default(),
            UpdateOrigin::Model,
        );
        assert!(matches!(result, Err(CoreError::ElementNotFound(_))));
    }

    #[test]
    fn test_locked_element_accepts_programmatic_resize() {
        let mut model = SceneModel::default();
        let mut element = text_element("label", "Hi");
        element.locked = true;
        let id = model.insert(element).expect("insert");

        let (updated, _) = model
            .upsert(id, &ElementPatch::sized(300.0, 120.0), UpdateOrigin::Model)
            .expect("upsert");
        assert!((updated.transform.width - 300.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_z_indices_dense_after_remove() {
        let mut model = SceneModel::default();
        let a = model.insert(text_element("a", "a")).expect("insert");
        let b = model.insert(text_element("b", "b")).expect("insert");
        let c = model.insert(text_element("c", "c")).expect("insert");

        model.remove(b).expect("remove");

        let zs: Vec<i32> = model.list().iter().map(|e| e.transform.z_index).collect();
        assert_eq!(zs, vec![0, 1]);
        assert_eq!(model.list()[0].id, a);
        assert_eq!(model.list()[1].id, c);
    }

    #[test]
    fn test_duplicate_z_resolved_by_insertion_order() {
        let mut model = SceneModel::default();
        let a = model.insert(text_element("a", "a")).expect("insert");
        let b = model.insert(text_element("b", "b")).expect("insert");

        // Force both to the same z, then mutate to trigger compaction.
        let patch = ElementPatch {
            z_index: Some(5),
            ..ElementPatch::default()
        };
        model.upsert(a, &patch, UpdateOrigin::Model).expect("upsert");
        model.upsert(b, &patch, UpdateOrigin::Model).expect("upsert");

        let ordered = model.list();
        assert_eq!(ordered[0].id, a);
        assert_eq!(ordered[1].id, b);
        assert_eq!(ordered[0].transform.z_index, 0);
        assert_eq!(ordered[1].transform.z_index, 1);
    }

    #[test]
    fn test_rename_promotes_to_dynamic() {
        let mut model = SceneModel::default();
        let id = model.insert(text_element("label", "Sale!")).expect("insert");

        let patch = ElementPatch {
            name: Some("#title".to_string()),
            ..ElementPatch::default()
        };
        let (updated, changes) = model
            .upsert(id, &patch, UpdateOrigin::Model)
            .expect("upsert");

        assert!(changes.content);
        assert!(updated.is_dynamic);
        assert_eq!(updated.dynamic_field.as_deref(), Some("title"));
        assert_eq!(
            updated.as_text().map(|t| t.content.as_str()),
            Some("{{title}}")
        );
    }

    #[test]
    fn test_rename_demotes_and_preserves_typed_text() {
        let mut model = SceneModel::default();
        let id = model.insert(text_element("#title", "ignored")).expect("insert");
        // Promotion on insert rewrote the content to the placeholder.
        assert!(model.get(id).expect("get").is_dynamic);

        // User types literal content over the placeholder, then renames away.
        let patch = ElementPatch {
            content: Some("Hand-written".to_string()),
            ..ElementPatch::default()
        };
        model.upsert(id, &patch, UpdateOrigin::Model).expect("typed");

        let rename = ElementPatch {
            name: Some("plain".to_string()),
            ..ElementPatch::default()
        };
        let (updated, _) = model
            .upsert(id, &rename, UpdateOrigin::Model)
            .expect("rename");

        assert!(!updated.is_dynamic);
        assert_eq!(updated.dynamic_field, None);
        assert_eq!(
            updated.as_text().map(|t| t.content.as_str()),
            Some("Hand-written")
        );
    }

    #[test]
    fn test_demotion_replaces_placeholder_with_sample() {
        let mut model = SceneModel::default();
        let id = model.insert(text_element("#price", "x")).expect("insert");
        let rename = ElementPatch {
            name: Some("price label".to_string()),
            ..ElementPatch::default()
        };
        let (updated, _) = model
            .upsert(id, &rename, UpdateOrigin::Model)
            .expect("rename");
        assert_eq!(updated.as_text().map(|t| t.content.as_str()), Some("price"));
    }

    #[test]
    fn test_image_rename_promotes_src() {
        let mut model = SceneModel::default();
        let element = Element::new("photo", ElementKind::Image(ImageBody::new("a.png")));
        let id = model.insert(element).expect("insert");

        let patch = ElementPatch {
            name: Some("#product_image".to_string()),
            ..ElementPatch::default()
        };
        let (updated, changes) = model
            .upsert(id, &patch, UpdateOrigin::Model)
            .expect("upsert");

        assert!(changes.src);
        assert_eq!(
            updated.as_image().map(|i| i.src.as_str()),
            Some("{{product_image}}")
        );
    }

    #[test]
    fn test_shape_name_marker_has_no_binding_effect() {
        let mut model = SceneModel::default();
        let element = Element::new("#blob", ElementKind::Shape(ShapeBody::new(ShapeKind::Rect)));
        let id = model.insert(element).expect("insert");
        assert!(!model.get(id).expect("get").is_dynamic);
    }

    #[test]
    fn test_load_template_resets_model() {
        let mut model = SceneModel::default();
        model.insert(text_element("old", "old")).expect("insert");

        let fresh = vec![text_element("new", "new")];
        model.load_template(fresh, (800.0, 1200.0), "#FAFAFA");

        assert_eq!(model.element_count(), 1);
        assert!((model.canvas_width - 800.0).abs() < f32::EPSILON);
        assert_eq!(model.background_color, "#FAFAFA");
        assert_eq!(model.list()[0].name, "new");
    }

    #[test]
    fn test_events_emitted_with_origin() {
        let mut model = SceneModel::default();
        let mut events = model.subscribe();

        let id = model.insert(text_element("label", "Hi")).expect("insert");
        assert_eq!(
            events.try_recv().expect("added event"),
            ModelEvent::ElementAdded { id }
        );

        model
            .upsert(id, &ElementPatch::at(1.0, 2.0), UpdateOrigin::Render)
            .expect("upsert");
        assert_eq!(
            events.try_recv().expect("changed event"),
            ModelEvent::ElementChanged {
                id,
                origin: UpdateOrigin::Render
            }
        );

        model.remove(id).expect("remove");
        assert_eq!(
            events.try_recv().expect("removed event"),
            ModelEvent::ElementRemoved { id }
        );
    }

    #[test]
    fn test_noop_patch_emits_nothing() {
        let mut model = SceneModel::default();
        let id = model.insert(text_element("label", "Hi")).expect("insert");
        let mut events = model.subscribe();

        model
            .upsert(id, &ElementPatch::default(), UpdateOrigin::Model)
            .expect("upsert");
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_lock_change_emits_event() {
        let mut model = SceneModel::default();
        let id = model.insert(text_element("label", "Hi")).expect("insert");
        let mut events = model.subscribe();

        let patch = ElementPatch {
            locked: Some(true),
            ..ElementPatch::default()
        };
        let (updated, changes) = model
            .upsert(id, &patch, UpdateOrigin::Model)
            .expect("upsert");

        assert!(updated.locked);
        assert!(changes.meta);
        assert_eq!(
            events.try_recv().expect("changed event"),
            ModelEvent::ElementChanged {
                id,
                origin: UpdateOrigin::Model
            }
        );
    }

    #[test]
    fn test_remove_prunes_frame_children() {
        let mut model = SceneModel::default();
        let child = model.insert(text_element("child", "c")).expect("insert");
        let mut frame = Element::new(
            "frame",
            ElementKind::Frame(crate::element::FrameBody {
                children: vec![child],
                ..crate::element::FrameBody::default()
            }),
        );
        frame.transform.width = 400.0;
        frame.transform.height = 400.0;
        let frame_id = model.insert(frame).expect("insert frame");

        model.remove(child).expect("remove child");

        let frame = model.get(frame_id).expect("frame");
        assert!(frame.as_frame().expect("frame body").children.is_empty());
    }
}

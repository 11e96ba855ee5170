//! Bidirectional model/render synchronization.
//!
//! The scene model owns the truth; render objects mirror it. Every edit
//! flows through [`SyncBridge::apply_update`], which writes the model first
//! and then reconciles the paint side. Updates tagged with a render origin
//! stop at the model: the paint side already shows them, and writing them
//! back would echo into an infinite loop.
//!
//! Reconciliation is synchronous and atomic per edit. The only async
//! surface of the engine lives in the asset cache.

use std::collections::HashMap;

use pin_core::{
    is_placeholder, ChangeSet, Element, ElementId, ElementPatch, SceneModel, UpdateOrigin,
};
use serde::{Deserialize, Serialize};

use crate::autofit::{fit_font_size, FitBounds, FitConstraints};
use crate::backend::{kind_label, RenderObject, RenderProps};
use crate::error::{EngineError, EngineResult};
use crate::measure::{HeuristicMeasurer, TextMeasurer};
use crate::spatial::SpatialGrid;

/// Synchronization state of one live render object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncState {
    /// Model and render sides agree.
    Synced,
    /// A model edit is being pushed to the render side.
    DirtyFromModel,
    /// The render side is being manipulated directly and will be read back.
    DirtyFromRender,
}

/// What one reconciliation pass actually did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// A non-empty property patch was written to the render object.
    pub wrote_backend: bool,
    /// The explicit geometry recompute ran after a geometric write.
    pub geometry_recomputed: bool,
    /// The auto-fit solver ran this pass.
    pub autofit_ran: bool,
    /// The solver's output, when it ran.
    pub computed_font_size: Option<u32>,
}

/// Keeps the render side consistent with the scene model.
pub struct SyncBridge {
    /// Live render objects by element ID. Absent entry means the element
    /// is malformed or removed and paints nothing.
    objects: HashMap<ElementId, RenderObject>,
    /// Per-object synchronization state.
    states: HashMap<ElementId, SyncState>,
    /// Spatial index over live object bounds.
    grid: SpatialGrid,
    /// Text measurer shared by auto-fit and paint.
    measurer: Box<dyn TextMeasurer>,
}

impl SyncBridge {
    /// Create a bridge with the default heuristic text measurer.
    #[must_use]
    pub fn new(canvas_width: f32, canvas_height: f32) -> Self {
        Self::with_measurer(canvas_width, canvas_height, Box::new(HeuristicMeasurer))
    }

    /// Create a bridge with a custom text measurer.
    #[must_use]
    pub fn with_measurer(
        canvas_width: f32,
        canvas_height: f32,
        measurer: Box<dyn TextMeasurer>,
    ) -> Self {
        Self {
            objects: HashMap::new(),
            states: HashMap::new(),
            grid: SpatialGrid::new(canvas_width, canvas_height),
            measurer,
        }
    }

    /// The render object for an element, if it has one.
    #[must_use]
    pub fn object(&self, id: ElementId) -> Option<&RenderObject> {
        self.objects.get(&id)
    }

    /// The synchronization state for an element, if it has an object.
    #[must_use]
    pub fn state(&self, id: ElementId) -> Option<SyncState> {
        self.states.get(&id).copied()
    }

    /// Number of live render objects.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Rebuild the render side from the model.
    ///
    /// Drops objects for removed elements, creates objects for new valid
    /// ones, and rebuilds the spatial index. Malformed elements are logged
    /// and stay absent.
    pub fn sync_scene(&mut self, model: &SceneModel) {
        self.objects
            .retain(|id, _| model.get(*id).is_some());
        self.states.retain(|id, _| model.get(*id).is_some());

        for element in model.elements() {
            if self.objects.contains_key(&element.id) {
                continue;
            }
            self.create_object(element);
        }

        self.grid.rebuild(model.canvas_width, model.canvas_height);
        for (id, object) in &self.objects {
            self.grid.insert(*id, object.bounds());
        }
    }

    /// Insert a new element into the model and mirror it on the render side.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Core`] if the ID already exists in the model.
    pub fn add_element(
        &mut self,
        model: &mut SceneModel,
        element: Element,
    ) -> EngineResult<ElementId> {
        let id = model.insert(element)?;
        if let Some(stored) = model.get(id) {
            self.create_object(stored);
            if let Some(object) = self.objects.get(&id) {
                self.grid.insert(id, object.bounds());
            }
        }
        Ok(id)
    }

    /// Apply a partial update, model first, then reconcile the render side.
    ///
    /// Render-originated updates refresh the object's model snapshot and
    /// write nothing back. Model-originated updates run forward
    /// reconciliation: auto-fit re-runs only on its triggers (content,
    /// container size, font family or auto-fit config changes, never a
    /// stored font-size change alone), the display text is resolved, and a
    /// field-level diff writes the minimal property set. An empty diff
    /// writes nothing and skips the geometry recompute.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Core`] if the element is not in the model.
    pub fn apply_update(
        &mut self,
        model: &mut SceneModel,
        id: ElementId,
        patch: &ElementPatch,
        origin: UpdateOrigin,
    ) -> EngineResult<SyncReport> {
        let (updated, changes) = model.upsert(id, patch, origin)?;
        let mut report = SyncReport::default();

        if origin == UpdateOrigin::Render {
            tracing::debug!("render-origin update for {id}, skipping backend write");
            if let Some(object) = self.objects.get_mut(&id) {
                object.refresh_snapshot(&updated);
                self.states.insert(id, SyncState::Synced);
            }
            return Ok(report);
        }

        if !changes.any() {
            return Ok(report);
        }
        if self.objects.contains_key(&id) {
            self.states.insert(id, SyncState::DirtyFromModel);
        }
        self.reconcile(&updated, &changes, &mut report);
        Ok(report)
    }

    /// Push one updated element to its render object.
    fn reconcile(&mut self, updated: &Element, changes: &ChangeSet, report: &mut SyncReport) {
        let id = updated.id;
        if updated.validate().is_err() {
            // The patch made the element malformed; it paints nothing
            // until a further edit fixes it.
            if self.objects.remove(&id).is_some() {
                self.states.remove(&id);
                self.grid.remove(id);
                tracing::warn!("element {id} became invalid, dropping its render object");
            }
            return;
        }

        if !self.objects.contains_key(&id) {
            // New or newly-valid element.
            self.create_object(updated);
            if let Some(object) = self.objects.get(&id) {
                self.grid.insert(id, object.bounds());
                report.wrote_backend = true;
            }
            return;
        }

        let display = display_text(updated);
        let computed = self.computed_font_size(updated, changes, report);

        let mut desired =
            RenderProps::from_element(updated, computed, display);
        let Some(object) = self.objects.get_mut(&id) else {
            return;
        };
        // An asset failure outlives unrelated edits; only a source change
        // resets the placeholder state.
        if let (Some(desired_image), Some(current_image)) =
            (desired.image.as_mut(), object.props().image.as_ref())
        {
            if desired_image.src == current_image.src {
                desired_image.degraded = current_image.degraded;
            }
        }

        let patch = object.props().diff(&desired);
        object.refresh_snapshot(updated);
        if patch.is_empty() {
            tracing::debug!("no effective property change for {id}");
            self.states.insert(id, SyncState::Synced);
            return;
        }
        tracing::debug!(
            "writing properties for {id} (geometry: {})",
            patch.touches_geometry()
        );

        let touches_geometry = patch.touches_geometry();
        object.apply(&patch);
        report.wrote_backend = true;
        if touches_geometry {
            let bounds = object.recompute_geometry();
            self.grid.update(id, bounds);
            report.geometry_recomputed = true;
        }
        self.states.insert(id, SyncState::Synced);
    }

    /// Decide the effective font size for a text element.
    ///
    /// Runs the solver only when auto-fit is enabled and a trigger fired;
    /// otherwise the object's current effective size is carried forward so
    /// a stored font-size edit alone cannot disturb an auto-fitted element.
    fn computed_font_size(
        &self,
        updated: &Element,
        changes: &ChangeSet,
        report: &mut SyncReport,
    ) -> Option<f32> {
        let body = updated.as_text()?;
        if !body.auto_fit.enabled {
            return None;
        }
        let triggered =
            changes.content || changes.size || changes.font_family || changes.auto_fit;
        if triggered {
            let display = display_text(updated).unwrap_or_default();
            let size = fit_font_size(
                &display,
                FitBounds::new(updated.transform.width, updated.transform.height),
                &body.font,
                &FitConstraints::from_text(body),
                self.measurer.as_ref(),
            );
            report.autofit_ran = true;
            report.computed_font_size = Some(size);
            #[allow(clippy::cast_precision_loss)]
            return Some(size as f32);
        }
        self.objects
            .get(&updated.id)
            .and_then(|object| object.props().text.as_ref())
            .map(|text| text.font_size)
    }

    /// Enter direct manipulation (drag or resize gesture) on an element.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ElementNotFound`] if the element has no
    /// render object, or [`EngineError::Validation`] if it is locked.
    pub fn begin_direct_manipulation(&mut self, id: ElementId) -> EngineResult<()> {
        let object = self
            .objects
            .get(&id)
            .ok_or_else(|| EngineError::ElementNotFound(id.to_string()))?;
        if object.element().locked {
            return Err(EngineError::Validation(format!(
                "element {id} is locked against interactive manipulation"
            )));
        }
        self.states.insert(id, SyncState::DirtyFromRender);
        Ok(())
    }

    /// Direct access to a render object during manipulation.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ElementNotFound`] if the element has no
    /// render object.
    pub fn object_mut(&mut self, id: ElementId) -> EngineResult<&mut RenderObject> {
        self.objects
            .get_mut(&id)
            .ok_or_else(|| EngineError::ElementNotFound(id.to_string()))
    }

    /// Finish direct manipulation: read back geometry and merge it into
    /// the model.
    ///
    /// The readback folds any internal scale into effective width and
    /// height, and enters the model as a geometry-only patch tagged with a
    /// render origin, so every non-geometric facet (dynamic binding,
    /// placeholder text, auto-fit config, lock state) survives the gesture
    /// untouched. A resized auto-fit text element re-solves against its new
    /// container on the render side only; the stored height is overwritten
    /// by the gesture like any other dimension.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ElementNotFound`] if the element has no
    /// render object, or [`EngineError::Core`] if it left the model.
    pub fn complete_direct_manipulation(
        &mut self,
        model: &mut SceneModel,
        id: ElementId,
    ) -> EngineResult<Element> {
        let object = self
            .objects
            .get_mut(&id)
            .ok_or_else(|| EngineError::ElementNotFound(id.to_string()))?;
        let readback = object.readback();
        object.set_geometry(readback.x, readback.y, readback.width, readback.height);
        object.reset_scale();

        let patch = ElementPatch {
            x: Some(readback.x),
            y: Some(readback.y),
            width: Some(readback.width),
            height: Some(readback.height),
            rotation: Some(readback.rotation),
            ..ElementPatch::default()
        };
        let (updated, changes) = model.upsert(id, &patch, UpdateOrigin::Render)?;
        object.refresh_snapshot(&updated);

        // Re-solve auto-fit against the new container, render side only.
        let mut report = SyncReport::default();
        let computed = self.computed_font_size(&updated, &changes, &mut report);
        if let Some(object) = self.objects.get_mut(&id) {
            let mut desired = RenderProps::from_element(&updated, computed, display_text(&updated));
            if let (Some(desired_image), Some(current_image)) =
                (desired.image.as_mut(), object.props().image.as_ref())
            {
                desired_image.degraded = current_image.degraded;
            }
            let prop_patch = object.props().diff(&desired);
            if !prop_patch.is_empty() {
                object.apply(&prop_patch);
            }
            let bounds = object.recompute_geometry();
            self.grid.update(id, bounds);
        }
        self.states.insert(id, SyncState::Synced);
        Ok(updated)
    }

    /// Remove an element from the model and the render side.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Core`] if the element is not in the model.
    pub fn remove_element(
        &mut self,
        model: &mut SceneModel,
        id: ElementId,
    ) -> EngineResult<Element> {
        let removed = model.remove(id)?;
        self.objects.remove(&id);
        self.states.remove(&id);
        self.grid.remove(id);
        Ok(removed)
    }

    /// Degrade every image object showing a failed asset to a placeholder.
    pub fn note_asset_failure(&mut self, url: &str) {
        for (id, object) in &mut self.objects {
            let matches = object
                .props()
                .image
                .as_ref()
                .is_some_and(|image| image.src == url);
            if matches {
                tracing::warn!("asset {url} failed, degrading element {id} to placeholder");
                object.set_degraded(true);
            }
        }
    }

    /// Elements near the given one, for alignment guides and snapping.
    #[must_use]
    pub fn snap_candidates(&self, id: ElementId) -> Vec<ElementId> {
        self.grid.query_nearby(id).into_iter().collect()
    }

    /// Create a render object for a valid element, logging rejects.
    fn create_object(&mut self, element: &Element) {
        let display = display_text(element);
        let mut report = SyncReport::default();
        let changes = ChangeSet {
            content: true,
            ..ChangeSet::default()
        };
        let computed = self.computed_font_size(element, &changes, &mut report);
        match RenderObject::new(element, computed, display) {
            Ok(object) => {
                self.objects.insert(element.id, object);
                self.states.insert(element.id, SyncState::Synced);
            }
            Err(e) => {
                tracing::warn!("{} element {} rejected: {e}", kind_label(element), element.id);
            }
        }
    }
}

/// Resolve the text painted for an element.
///
/// Dynamic elements whose content is still a raw `{{field}}` placeholder
/// show their preview text when present; the casing transform applies last.
#[must_use]
fn display_text(element: &Element) -> Option<String> {
    let body = element.as_text()?;
    let raw = if element.is_dynamic && is_placeholder(body.content.trim()) {
        body.preview.as_deref().unwrap_or(&body.content)
    } else {
        &body.content
    };
    Some(body.case.apply(raw))
}

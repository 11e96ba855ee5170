//! Uniform-grid spatial index for proximity queries.
//!
//! Backs alignment guides and collision-style features: "which elements are
//! near this box" answers in O(k) where k is the number of elements sharing
//! nearby cells, not the total element count. The grid is a derived cache of
//! the scene model and must be treated as rebuildable from it at any time.

use std::collections::{HashMap, HashSet};

use pin_core::{ElementId, Rect};

/// Default grid cell size in canvas units.
pub const DEFAULT_CELL_SIZE: f32 = 128.0;

/// A uniform grid over the canvas.
///
/// Each element is registered into every cell its axis-aligned bounding box
/// overlaps, clamped to the grid bounds.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    /// Cell edge length in canvas units.
    cell_size: f32,
    /// Number of grid columns.
    cols: usize,
    /// Number of grid rows.
    rows: usize,
    /// Occupied cells, keyed by `row * cols + col`. Emptied cells are
    /// pruned lazily on removal.
    cells: HashMap<usize, HashSet<ElementId>>,
    /// Reverse map: which cells each element occupies.
    memberships: HashMap<ElementId, Vec<usize>>,
}

impl SpatialGrid {
    /// Create a grid covering the given canvas with the default cell size.
    #[must_use]
    pub fn new(canvas_width: f32, canvas_height: f32) -> Self {
        Self::with_cell_size(canvas_width, canvas_height, DEFAULT_CELL_SIZE)
    }

    /// Create a grid with a custom cell size.
    #[must_use]
    pub fn with_cell_size(canvas_width: f32, canvas_height: f32, cell_size: f32) -> Self {
        let cell_size = if cell_size > 0.0 {
            cell_size
        } else {
            DEFAULT_CELL_SIZE
        };
        Self {
            cell_size,
            cols: cell_count(canvas_width, cell_size),
            rows: cell_count(canvas_height, cell_size),
            cells: HashMap::new(),
            memberships: HashMap::new(),
        }
    }

    /// Register an element's bounding box.
    ///
    /// Re-inserting an already-registered ID first clears its previous cell
    /// memberships, so no stale cells remain.
    pub fn insert(&mut self, id: ElementId, bounds: Rect) {
        self.remove(id);
        let cells = self.overlapped_cells(bounds);
        for &cell in &cells {
            self.cells.entry(cell).or_default().insert(id);
        }
        self.memberships.insert(id, cells);
    }

    /// Unregister an element, pruning cells it leaves empty.
    pub fn remove(&mut self, id: ElementId) {
        let Some(cells) = self.memberships.remove(&id) else {
            return;
        };
        for cell in cells {
            if let Some(occupants) = self.cells.get_mut(&cell) {
                occupants.remove(&id);
                if occupants.is_empty() {
                    self.cells.remove(&cell);
                }
            }
        }
    }

    /// Move an element to a new bounding box.
    ///
    /// Remove-then-insert baseline: correct by construction, touching only
    /// changed cells is a later optimization.
    pub fn update(&mut self, id: ElementId, bounds: Rect) {
        self.remove(id);
        self.insert(id, bounds);
    }

    /// Elements sharing a cell with the given element, excluding itself.
    ///
    /// Returns an empty set for unregistered IDs.
    #[must_use]
    pub fn query_nearby(&self, id: ElementId) -> HashSet<ElementId> {
        let mut result = HashSet::new();
        let Some(cells) = self.memberships.get(&id) else {
            return result;
        };
        for cell in cells {
            if let Some(occupants) = self.cells.get(cell) {
                result.extend(occupants.iter().copied());
            }
        }
        result.remove(&id);
        result
    }

    /// Elements registered in any cell overlapped by the given box.
    #[must_use]
    pub fn query_rect(&self, bounds: Rect) -> HashSet<ElementId> {
        let mut result = HashSet::new();
        for cell in self.overlapped_cells(bounds) {
            if let Some(occupants) = self.cells.get(&cell) {
                result.extend(occupants.iter().copied());
            }
        }
        result
    }

    /// Resize the grid for new canvas dimensions.
    ///
    /// Clears all entries; callers must re-insert every element.
    pub fn rebuild(&mut self, canvas_width: f32, canvas_height: f32) {
        self.cols = cell_count(canvas_width, self.cell_size);
        self.rows = cell_count(canvas_height, self.cell_size);
        self.cells.clear();
        self.memberships.clear();
    }

    /// Number of elements currently registered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.memberships.len()
    }

    /// Check if the grid holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.memberships.is_empty()
    }

    /// Cell indices overlapped by a box, clamped to the grid bounds.
    fn overlapped_cells(&self, bounds: Rect) -> Vec<usize> {
        let col_lo = self.clamp_axis(bounds.x, self.cols);
        let col_hi = self.clamp_axis(bounds.x + bounds.width, self.cols);
        let row_lo = self.clamp_axis(bounds.y, self.rows);
        let row_hi = self.clamp_axis(bounds.y + bounds.height, self.rows);

        let mut cells = Vec::with_capacity((col_hi - col_lo + 1) * (row_hi - row_lo + 1));
        for row in row_lo..=row_hi {
            for col in col_lo..=col_hi {
                cells.push(row * self.cols + col);
            }
        }
        cells
    }

    /// Convert a coordinate to a clamped cell index along one axis.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn clamp_axis(&self, coord: f32, count: usize) -> usize {
        let index = (coord / self.cell_size).floor().max(0.0) as usize;
        index.min(count.saturating_sub(1))
    }
}

/// Number of cells needed to cover a span (at least one).
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn cell_count(span: f32, cell_size: f32) -> usize {
    ((span / cell_size).ceil().max(1.0)) as usize
}

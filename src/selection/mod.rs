//! Selection state: selected cells, anchor/focus and the drag session.
//!
//! `SelectionEngine` is synchronous and owns no host resources. Each operation
//! takes the current model and geometry as arguments and returns whether the
//! selected set changed, so the caller decides when to notify observers.

mod keyboard;

pub use keyboard::jump_target;

use crate::geometry::{cells_in_box, hit_test};
use crate::model::GridModel;
use crate::types::{
    AnchorFocus, CellGeometry, CellRef, Coord, Modifiers, Point, PointerButton, Rect,
    SelectionSet,
};

/// State of an in-progress pointer drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    /// Where the primary button went down.
    pub origin: Point,
    /// Last pointer position seen.
    pub last: Point,
    /// Box between `origin` and `last` at the last recomputation.
    pub drag_box: Rect,
}

#[derive(Debug, Default)]
pub struct SelectionEngine {
    selection: SelectionSet,
    range: AnchorFocus,
    // Identities behind `range`, so coordinates can be re-derived after a
    // sort or filter moves the cells.
    anchor_cell: Option<CellRef>,
    focus_cell: Option<CellRef>,
    drag: Option<DragSession>,
}

impl SelectionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn anchor_focus(&self) -> AnchorFocus {
        self.range
    }

    pub fn focus_cell(&self) -> Option<&CellRef> {
        self.focus_cell.as_ref()
    }

    pub fn drag(&self) -> Option<&DragSession> {
        self.drag.as_ref()
    }

    pub fn drag_box(&self) -> Option<Rect> {
        self.drag.map(|d| d.drag_box)
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Replace the selection. Returns false when `next` equals the current set.
    pub fn set_selection(&mut self, next: SelectionSet) -> bool {
        if next == self.selection {
            return false;
        }
        self.selection = next;
        true
    }

    fn set_range(&mut self, model: &GridModel, anchor: Option<Coord>, focus: Option<Coord>) {
        self.range = AnchorFocus { anchor, focus };
        self.anchor_cell = anchor.and_then(|c| model.cell_at(c));
        self.focus_cell = focus.and_then(|c| model.cell_at(c));
    }

    fn clear_range(&mut self) {
        self.range.clear();
        self.anchor_cell = None;
        self.focus_cell = None;
    }

    /// Primary-button press at `point`.
    ///
    /// Starts a single-cell selection and a drag session when the point hits a
    /// visible cell and no modifier is held. Any other press is ignored.
    pub fn press(
        &mut self,
        point: Point,
        button: PointerButton,
        modifiers: Modifiers,
        model: &GridModel,
        cells: &[CellGeometry],
    ) -> bool {
        if button != PointerButton::Primary || modifiers.any() {
            return false;
        }
        let Some(hit) = hit_test(cells, point) else {
            return false;
        };
        let cell = hit.cell_ref();
        let Some(coord) = model.coord_of(&cell) else {
            return false;
        };
        self.set_range(model, Some(coord), Some(coord));
        self.drag = Some(DragSession {
            origin: point,
            last: point,
            drag_box: Rect::from_corners(point, point),
        });
        self.set_selection(SelectionSet::single(cell))
    }

    /// Record the latest pointer position of the drag. Does not recompute.
    pub fn drag_to(&mut self, point: Point) {
        if let Some(drag) = self.drag.as_mut() {
            drag.last = point;
        }
    }

    /// Select every cell whose box meets the drag box spanned by the press
    /// point and the last pointer point. Pure function of the drag state and
    /// `cells`, so running it twice is harmless.
    pub fn recompute_drag(&mut self, cells: &[CellGeometry]) -> bool {
        let Some(drag) = self.drag.as_mut() else {
            return false;
        };
        drag.drag_box = Rect::from_corners(drag.origin, drag.last);
        let covered: SelectionSet = cells_in_box(cells, &drag.drag_box).into_iter().collect();
        self.set_selection(covered)
    }

    /// End the drag with one final recomputation.
    pub fn release(&mut self, cells: &[CellGeometry]) -> bool {
        if self.drag.is_none() {
            return false;
        }
        let changed = self.recompute_drag(cells);
        self.drag = None;
        changed
    }

    /// Drop the drag session without recomputing (second touch point, teardown).
    pub fn abort_drag(&mut self) {
        self.drag = None;
    }

    /// Select every visible cell, anchored top-left with focus bottom-right.
    pub fn select_all(&mut self, model: &GridModel) -> bool {
        if model.is_empty() {
            return false;
        }
        let last = Coord::new(model.row_count() - 1, model.column_count() - 1);
        self.set_range(model, Some(Coord::new(0, 0)), Some(last));
        self.set_selection(rect_selection(model, Coord::new(0, 0), last))
    }

    /// Select one cell by identity, as a click would.
    pub fn select_cell(&mut self, model: &GridModel, cell: &CellRef) -> bool {
        let Some(coord) = model.coord_of(cell) else {
            return false;
        };
        self.set_range(model, Some(coord), Some(coord));
        self.set_selection(SelectionSet::single(cell.clone()))
    }

    /// Clear selection, anchor/focus and any drag.
    pub fn clear(&mut self) -> bool {
        self.drag = None;
        self.clear_range();
        self.set_selection(SelectionSet::new())
    }

    /// Drop cells whose row or column is no longer visible and re-derive
    /// anchor/focus coordinates from their identities.
    ///
    /// An empty row list clears everything. A selection emptied by the
    /// pruning also clears anchor and focus.
    pub fn revalidate(&mut self, model: &GridModel) -> bool {
        if model.rows.is_empty() {
            return self.clear();
        }
        let index = model.index();
        let mut next = self.selection.clone();
        next.retain(|cell| index.contains(cell));
        let changed = self.set_selection(next);

        if self.selection.is_empty() {
            self.clear_range();
            return changed;
        }

        let focus = self
            .focus_cell
            .as_ref()
            .and_then(|c| index.coord_of(c))
            .or_else(|| self.selection.iter().last().and_then(|c| index.coord_of(c)));
        let anchor = self
            .anchor_cell
            .as_ref()
            .and_then(|c| index.coord_of(c))
            .or(focus);
        self.set_range(model, anchor, focus);
        changed
    }
}

/// Cells of the inclusive rectangle between two coordinates, row-major.
pub fn rect_selection(model: &GridModel, a: Coord, b: Coord) -> SelectionSet {
    let (min_row, max_row) = (a.row_index.min(b.row_index), a.row_index.max(b.row_index));
    let (min_col, max_col) = (a.col_index.min(b.col_index), a.col_index.max(b.col_index));
    let mut set = SelectionSet::new();
    for row in min_row..=max_row {
        for col in min_col..=max_col {
            if let Some(cell) = model.cell_at(Coord::new(row, col)) {
                set.insert(cell);
            }
        }
    }
    set
}

/// Selected cells ordered by visual position: top to bottom, then left to right.
/// Cells no longer visible are dropped.
pub fn row_major(model: &GridModel, selection: &SelectionSet) -> Vec<CellRef> {
    let index = model.index();
    let mut cells: Vec<(Coord, &CellRef)> = selection
        .iter()
        .filter_map(|c| index.coord_of(c).map(|coord| (coord, c)))
        .collect();
    cells.sort_by_key(|(coord, _)| (coord.row_index, coord.col_index));
    cells.into_iter().map(|(_, c)| c.clone()).collect()
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;

    fn model(rows: usize, cols: usize) -> GridModel {
        GridModel::new(
            (0..rows).map(|r| format!("r{r}")).collect(),
            (0..cols).map(|c| format!("c{c}")).collect(),
        )
    }

    fn geometry(rows: usize, cols: usize) -> Vec<CellGeometry> {
        let mut out = Vec::new();
        for r in 0..rows {
            for c in 0..cols {
                out.push(CellGeometry::new(
                    format!("r{r}"),
                    format!("c{c}"),
                    Rect::new(c as f64 * 100.0, r as f64 * 20.0, 100.0, 20.0),
                ));
            }
        }
        out
    }

    #[test]
    fn test_press_starts_single_cell_drag() {
        let model = model(3, 3);
        let cells = geometry(3, 3);
        let mut engine = SelectionEngine::new();
        assert!(engine.press(
            Point::new(150.0, 30.0),
            PointerButton::Primary,
            Modifiers::NONE,
            &model,
            &cells
        ));
        assert!(engine.is_dragging());
        assert_eq!(engine.anchor_focus(), AnchorFocus::at(Coord::new(1, 1)));
        assert_eq!(engine.selection().as_slice(), &[CellRef::new("r1", "c1")]);
    }

    #[test]
    fn test_press_with_modifier_or_miss_is_ignored() {
        let model = model(2, 2);
        let cells = geometry(2, 2);
        let mut engine = SelectionEngine::new();
        assert!(!engine.press(
            Point::new(10.0, 10.0),
            PointerButton::Primary,
            Modifiers::shift(),
            &model,
            &cells
        ));
        assert!(!engine.press(
            Point::new(10.0, 10.0),
            PointerButton::Secondary,
            Modifiers::NONE,
            &model,
            &cells
        ));
        assert!(!engine.press(
            Point::new(900.0, 900.0),
            PointerButton::Primary,
            Modifiers::NONE,
            &model,
            &cells
        ));
        assert!(!engine.is_dragging());
        assert!(engine.selection().is_empty());
    }

    #[test]
    fn test_drag_recompute_and_release() {
        let model = model(4, 4);
        let cells = geometry(4, 4);
        let mut engine = SelectionEngine::new();
        engine.press(
            Point::new(10.0, 10.0),
            PointerButton::Primary,
            Modifiers::NONE,
            &model,
            &cells,
        );
        engine.drag_to(Point::new(150.0, 30.0));
        assert!(engine.recompute_drag(&cells));
        assert_eq!(engine.selection().len(), 4);
        // Same box again: no change.
        assert!(!engine.recompute_drag(&cells));

        engine.drag_to(Point::new(250.0, 30.0));
        assert!(engine.release(&cells));
        assert_eq!(engine.selection().len(), 6);
        assert!(!engine.is_dragging());
        assert!(engine.drag_box().is_none());
    }

    #[test]
    fn test_range_selection_is_symmetric() {
        let model = model(4, 5);
        let forward = rect_selection(&model, Coord::new(2, 3), Coord::new(0, 1));
        let backward = rect_selection(&model, Coord::new(0, 1), Coord::new(2, 3));
        assert_eq!(forward, backward);
        assert_eq!(forward.len(), 9);
        assert!(forward.contains(&CellRef::new("r0", "c1")));
        assert!(forward.contains(&CellRef::new("r2", "c3")));
        assert!(!forward.contains(&CellRef::new("r3", "c3")));
    }

    #[test]
    fn test_revalidate_drops_filtered_row_and_clears_range() {
        let mut model = model(3, 2);
        let mut engine = SelectionEngine::new();
        engine.select_cell(&model, &CellRef::new("r1", "c0"));
        model.rows.retain(|r| r != "r1");
        assert!(engine.revalidate(&model));
        assert!(engine.selection().is_empty());
        assert_eq!(engine.anchor_focus(), AnchorFocus::default());
    }

    #[test]
    fn test_revalidate_rederives_coords_after_sort() {
        let mut model = model(3, 2);
        let mut engine = SelectionEngine::new();
        engine.select_cell(&model, &CellRef::new("r2", "c1"));
        model.rows.reverse();
        assert!(!engine.revalidate(&model));
        assert_eq!(engine.anchor_focus(), AnchorFocus::at(Coord::new(0, 1)));
    }

    #[test]
    fn test_revalidate_empty_rows_clears_everything() {
        let mut model = model(2, 2);
        let mut engine = SelectionEngine::new();
        engine.select_all(&model);
        model.rows.clear();
        assert!(engine.revalidate(&model));
        assert!(engine.selection().is_empty());
        assert_eq!(engine.anchor_focus(), AnchorFocus::default());
    }

    #[test]
    fn test_row_major_orders_by_visual_position() {
        let model = model(2, 3);
        let selection: SelectionSet = [
            CellRef::new("r1", "c0"),
            CellRef::new("r0", "c2"),
            CellRef::new("r0", "c0"),
            CellRef::new("gone", "c0"),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            row_major(&model, &selection),
            vec![
                CellRef::new("r0", "c0"),
                CellRef::new("r0", "c2"),
                CellRef::new("r1", "c0"),
            ]
        );
    }
}

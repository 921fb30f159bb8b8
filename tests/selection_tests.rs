//! Drag selection, range selection, change notification and revalidation.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

mod common;

use cellgrid::geometry::cells_in_box;
use cellgrid::{
    rect_selection, AnchorFocus, CellRef, Coord, GeometryProvider, Modifiers, Point,
    PointerButton, Rect, SelectionEngine, SelectionSet,
};
use common::{grid_model, labels, Fixture, FakeHost};
use test_case::test_case;

// ============================================================================
// Box selection
// ============================================================================

#[test_case((10.0, 10.0), (150.0, 30.0), 4; "two by two")]
#[test_case((10.0, 10.0), (100.0, 20.0), 4; "touching edges count as overlap")]
#[test_case((10.0, 10.0), (10.0, 10.0), 1; "zero size box hits one cell")]
#[test_case((10.0, 10.0), (299.0, 10.0), 3; "full first row")]
#[test_case((50.0, 5.0), (50.0, 79.0), 4; "column slice")]
fn test_box_selection_is_direction_independent(a: (f64, f64), b: (f64, f64), expected: usize) {
    let forward = Fixture::new(grid_model(5, 3), None);
    forward.press(a.0, a.1);
    forward.controller.pointer_up(Some(Point::new(b.0, b.1)));

    let backward = Fixture::new(grid_model(5, 3), None);
    backward.press(b.0, b.1);
    backward.controller.pointer_up(Some(Point::new(a.0, a.1)));

    assert_eq!(forward.controller.selection().len(), expected);
    assert_eq!(forward.controller.selection(), backward.controller.selection());
}

#[test]
fn test_box_selection_matches_intersection_of_geometry() {
    let host = FakeHost::new(6, 4, None);
    let cells = host.cells_info();
    let drag_box = Rect::from_corners(Point::new(250.0, 75.0), Point::new(120.0, 21.0));
    let selected: Vec<String> = cells_in_box(&cells, &drag_box)
        .iter()
        .map(|c| format!("{}/{}", c.row_id, c.column_id))
        .collect();
    let expected: Vec<String> = cells
        .iter()
        .filter(|c| {
            !(c.x + c.width < 120.0 || c.x > 250.0 || c.y + c.height < 21.0 || c.y > 75.0)
        })
        .map(|c| format!("{}/{}", c.row_id, c.column_id))
        .collect();
    assert_eq!(selected, expected);
    assert_eq!(selected.len(), 6);
}

#[test]
fn test_drag_box_only_exists_while_dragging() {
    let fx = Fixture::new(grid_model(3, 3), None);
    assert!(fx.controller.drag_box().is_none());
    fx.press(10.0, 10.0);
    fx.controller.pointer_move(Point::new(150.0, 30.0));
    fx.scheduler.run_frame();
    let drag_box = fx.controller.drag_box().unwrap();
    assert_eq!(drag_box, Rect::new(10.0, 10.0, 140.0, 20.0));
    fx.controller.pointer_up(None);
    assert!(fx.controller.drag_box().is_none());
}

#[test]
fn test_modifier_press_does_not_start_drag() {
    let fx = Fixture::new(grid_model(3, 3), None);
    assert!(!fx
        .controller
        .pointer_down(Point::new(10.0, 10.0), PointerButton::Primary, Modifiers::ctrl()));
    assert!(!fx.controller.is_dragging());
    assert!(!fx.host.locked.get());
    assert_eq!(fx.notification_count(), 0);
}

#[test]
fn test_press_outside_cells_is_silent() {
    let fx = Fixture::new(grid_model(2, 2), None);
    assert!(!fx.press(5000.0, 5000.0));
    assert!(fx.controller.selection().is_empty());
    assert_eq!(fx.notification_count(), 0);
}

#[test]
fn test_pointer_moves_share_one_geometry_query_per_frame() {
    let fx = Fixture::new(grid_model(4, 4), None);
    fx.press(10.0, 10.0);
    let after_press = fx.host.queries.get();
    for x in [20.0, 60.0, 110.0, 160.0, 210.0] {
        fx.controller.pointer_move(Point::new(x, 50.0));
    }
    fx.scheduler.run_frame();
    assert_eq!(fx.host.queries.get(), after_press + 1);
    assert_eq!(
        labels(&fx.controller.selection()),
        vec!["r0/c0", "r0/c1", "r0/c2", "r1/c0", "r1/c1", "r1/c2", "r2/c0", "r2/c1", "r2/c2"]
    );
}

#[test]
fn test_touch_drives_the_same_selection() {
    let fx = Fixture::new(grid_model(3, 3), None);
    assert!(fx.controller.touch_start(Point::new(10.0, 10.0), 1));
    fx.controller.touch_move(Point::new(150.0, 30.0), 1);
    fx.scheduler.run_frame();
    fx.controller.touch_end(None);
    assert_eq!(fx.controller.selection().len(), 4);
    assert!(!fx.host.locked.get());
}

#[test]
fn test_second_touch_point_aborts_tracking() {
    let fx = Fixture::new(grid_model(3, 3), None);
    fx.controller.touch_start(Point::new(10.0, 10.0), 1);
    assert!(!fx.controller.touch_move(Point::new(150.0, 30.0), 2));
    assert!(!fx.controller.is_dragging());
    assert!(!fx.host.locked.get());
    assert_eq!(fx.scheduler.pending_frames(), 0);
    // The press selection stays; the aborted move never applied.
    assert_eq!(labels(&fx.controller.selection()), vec!["r0/c0"]);
}

// ============================================================================
// Range selection
// ============================================================================

#[test]
fn test_range_selection_symmetry() {
    let model = grid_model(4, 5);
    let a = rect_selection(&model, Coord::new(2, 3), Coord::new(0, 1));
    let b = rect_selection(&model, Coord::new(0, 1), Coord::new(2, 3));
    assert_eq!(a, b);
    let mut expected = SelectionSet::new();
    for r in 0..=2 {
        for c in 1..=3 {
            expected.insert(CellRef::new(format!("r{r}"), format!("c{c}")));
        }
    }
    assert_eq!(a, expected);
}

// ============================================================================
// Notification
// ============================================================================

#[test]
fn test_identical_selection_notifies_once() {
    let fx = Fixture::new(grid_model(3, 3), None);
    fx.press(10.0, 10.0);
    assert_eq!(fx.notification_count(), 1);

    // Two frames whose boxes cover the same cells.
    fx.controller.pointer_move(Point::new(150.0, 30.0));
    fx.scheduler.run_frame();
    fx.controller.pointer_move(Point::new(160.0, 35.0));
    fx.scheduler.run_frame();
    assert_eq!(fx.notification_count(), 2);

    // Final recompute on release covers the same cells again.
    fx.controller.pointer_up(None);
    assert_eq!(fx.notification_count(), 2);
}

#[test]
fn test_equality_ignores_order() {
    let mut engine = SelectionEngine::new();
    let forward: SelectionSet = [CellRef::new("r1", "a"), CellRef::new("r2", "b")]
        .into_iter()
        .collect();
    let backward: SelectionSet = [CellRef::new("r2", "b"), CellRef::new("r1", "a")]
        .into_iter()
        .collect();
    assert!(engine.set_selection(forward));
    assert!(!engine.set_selection(backward));
}

// ============================================================================
// Revalidation
// ============================================================================

#[test]
fn test_filtered_row_is_dropped_and_range_cleared() {
    let fx = Fixture::new(grid_model(10, 3), None);
    fx.controller.select_cell(&CellRef::new("r7", "c1"));
    let mut model = grid_model(10, 3);
    model.rows.retain(|r| r != "r7");
    fx.controller.set_model(model);
    assert!(fx.controller.selection().is_empty());
    assert_eq!(fx.controller.anchor_focus(), AnchorFocus::default());
    assert!(fx.notifications.borrow().last().unwrap().is_empty());
}

#[test]
fn test_partial_prune_keeps_remaining_cells() {
    let fx = Fixture::new(grid_model(10, 3), None);
    fx.press(10.0, 130.0);
    fx.controller.pointer_up(Some(Point::new(150.0, 150.0)));
    assert_eq!(labels(&fx.controller.selection()), vec!["r6/c0", "r6/c1", "r7/c0", "r7/c1"]);

    let model = fx.controller.model();
    model.borrow_mut().rows.retain(|r| r != "r7");
    fx.controller.model_changed();
    assert_eq!(labels(&fx.controller.selection()), vec!["r6/c0", "r6/c1"]);
    assert_eq!(fx.controller.anchor_focus(), AnchorFocus::at(Coord::new(6, 0)));
}

#[test]
fn test_hidden_column_is_dropped() {
    let fx = Fixture::new(grid_model(3, 3), None);
    fx.controller.select_all();
    let model = fx.controller.model();
    model.borrow_mut().columns.retain(|c| c != "c1");
    fx.controller.model_changed();
    assert_eq!(fx.controller.selection().len(), 6);
    assert!(!fx.controller.selection().contains(&CellRef::new("r0", "c1")));
}

#[test]
fn test_empty_row_list_clears_everything() {
    let fx = Fixture::new(grid_model(3, 3), None);
    fx.controller.select_all();
    fx.controller.set_model(grid_model(0, 3));
    assert!(fx.controller.selection().is_empty());
    assert_eq!(fx.controller.anchor_focus(), AnchorFocus::default());
}

#[test]
fn test_rows_emptied_mid_drag_unlocks_on_release() {
    let fx = Fixture::new(grid_model(3, 3), None);
    fx.press(10.0, 10.0);
    fx.controller.pointer_move(Point::new(150.0, 30.0));
    assert!(fx.host.locked.get());

    fx.controller.set_model(grid_model(0, 3));
    fx.controller.pointer_up(Some(Point::new(150.0, 30.0)));
    assert!(!fx.host.locked.get());
    assert!(!fx.controller.is_dragging());
    assert_eq!(fx.scheduler.pending_frames(), 0);

    // The next gesture starts from a clean session.
    fx.controller.set_model(grid_model(3, 3));
    assert!(fx.press(10.0, 10.0));
    assert!(fx.host.locked.get());
}

#[test]
fn test_large_select_all_survives_filter() {
    let fx = Fixture::new(grid_model(4000, 20), None);
    fx.controller.select_all();
    assert_eq!(fx.controller.selection().len(), 80_000);

    let model = fx.controller.model();
    model.borrow_mut().rows.retain(|r| r != "r1234");
    fx.controller.model_changed();
    let selection = fx.controller.selection();
    assert_eq!(selection.len(), 79_980);
    assert!(!selection.contains(&CellRef::new("r1234", "c0")));
    assert_eq!(fx.controller.anchor_focus().focus, Some(Coord::new(3998, 19)));
}

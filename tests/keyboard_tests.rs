//! Keyboard navigation, jumps, shortcuts and scroll-into-view.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

mod common;

use std::rc::Rc;

use cellgrid::{jump_target, AnchorFocus, CellRef, Coord, Direction, GridModel, Modifiers, Rect};
use common::{grid_model, labels, record, FakeContainer, Fixture};
use serde_json::json;
use test_case::test_case;

/// Single column "v" with one row per value; `None` leaves the field out.
fn column_model(values: &[Option<&str>]) -> GridModel {
    let mut model = GridModel::new(
        (0..values.len()).map(|r| format!("r{r}")).collect(),
        vec!["v".into()],
    );
    for (i, value) in values.iter().enumerate() {
        let row = match value {
            Some(v) => record(json!({ "v": v })),
            None => record(json!({})),
        };
        model.records.insert(format!("r{i}"), row);
    }
    model
}

// ============================================================================
// Jumps
// ============================================================================

#[test]
fn test_ctrl_down_from_empty_lands_on_first_value() {
    let model = column_model(&[None, None, Some("x"), None]);
    assert_eq!(
        jump_target(&model, Coord::new(0, 0), Direction::Down),
        Coord::new(2, 0)
    );
}

#[test]
fn test_ctrl_down_from_value_stops_before_gap() {
    let model = column_model(&[Some("a"), Some("b"), None, Some("c")]);
    assert_eq!(
        jump_target(&model, Coord::new(0, 0), Direction::Down),
        Coord::new(1, 0)
    );
}

#[test_case(Direction::Right, Coord::new(0, 3); "right runs to last value")]
#[test_case(Direction::Left, Coord::new(0, 0); "left at boundary stays")]
#[test_case(Direction::Up, Coord::new(0, 0); "up at boundary stays")]
#[test_case(Direction::Down, Coord::new(0, 0); "down with a gap below stays")]
fn test_jump_from_origin(direction: Direction, expected: Coord) {
    let model = GridModel::new(
        vec!["r0".into(), "r1".into()],
        vec!["a".into(), "b".into(), "c".into(), "d".into()],
    )
    .with_record("r0", record(json!({"a": 1, "b": 2, "c": 3, "d": 4})));
    assert_eq!(jump_target(&model, Coord::new(0, 0), direction), expected);
}

#[test]
fn test_zero_and_false_are_not_empty() {
    let mut model = column_model(&[Some("a"), None, None]);
    model.records.insert("r1".into(), record(json!({"v": 0})));
    model.records.insert("r2".into(), record(json!({"v": false})));
    assert_eq!(
        jump_target(&model, Coord::new(0, 0), Direction::Down),
        Coord::new(2, 0)
    );
}

// ============================================================================
// Controller keys
// ============================================================================

#[test]
fn test_ctrl_arrow_through_controller() {
    let fx = Fixture::new(column_model(&[None, None, Some("x"), None]), None);
    fx.controller.select_cell(&CellRef::new("r0", "v"));
    assert!(fx.controller.key_down("ArrowDown", Modifiers::ctrl()));
    assert_eq!(fx.controller.anchor_focus(), AnchorFocus::at(Coord::new(2, 0)));
    assert_eq!(labels(&fx.controller.selection()), vec!["r2/v"]);
}

#[test]
fn test_meta_counts_as_command() {
    let fx = Fixture::new(column_model(&[Some("a"), Some("b"), None, Some("c")]), None);
    fx.controller.select_cell(&CellRef::new("r0", "v"));
    let cmd = Modifiers {
        meta: true,
        ..Modifiers::NONE
    };
    fx.controller.key_down("ArrowDown", cmd);
    assert_eq!(fx.controller.focus_cell(), Some(CellRef::new("r1", "v")));
}

#[test]
fn test_arrow_without_focus_is_not_handled() {
    let fx = Fixture::new(grid_model(3, 3), None);
    assert!(!fx.controller.key_down("ArrowDown", Modifiers::NONE));
    assert_eq!(fx.notification_count(), 0);
}

#[test]
fn test_shift_arrows_then_plain_arrow_collapses() {
    let fx = Fixture::new(grid_model(5, 5), None);
    fx.controller.select_cell(&CellRef::new("r2", "c2"));
    fx.controller.key_down("ArrowRight", Modifiers::shift());
    fx.controller.key_down("ArrowDown", Modifiers::shift());
    assert_eq!(
        labels(&fx.controller.selection()),
        vec!["r2/c2", "r2/c3", "r3/c2", "r3/c3"]
    );
    let af = fx.controller.anchor_focus();
    assert_eq!(af.anchor, Some(Coord::new(2, 2)));
    assert_eq!(af.focus, Some(Coord::new(3, 3)));

    fx.controller.key_down("ArrowLeft", Modifiers::NONE);
    assert_eq!(labels(&fx.controller.selection()), vec!["r3/c2"]);
}

#[test]
fn test_select_all_and_escape() {
    let fx = Fixture::new(grid_model(3, 4), None);
    assert!(fx.controller.key_down("a", Modifiers::ctrl()));
    assert_eq!(fx.controller.selection().len(), 12);
    let af = fx.controller.anchor_focus();
    assert_eq!(af.anchor, Some(Coord::new(0, 0)));
    assert_eq!(af.focus, Some(Coord::new(2, 3)));

    assert!(fx.controller.key_down("Escape", Modifiers::NONE));
    assert!(fx.controller.selection().is_empty());
    assert_eq!(fx.controller.anchor_focus(), AnchorFocus::default());
    assert!(!fx.controller.key_down("Escape", Modifiers::NONE));
}

#[test]
fn test_plain_letter_is_not_handled() {
    let fx = Fixture::new(grid_model(2, 2), None);
    fx.controller.select_all();
    assert!(!fx.controller.key_down("a", Modifiers::NONE));
    assert!(!fx.controller.key_down("Enter", Modifiers::NONE));
}

// ============================================================================
// Scroll into view
// ============================================================================

#[test]
fn test_keyboard_move_scrolls_focus_out_of_margin() {
    let container = FakeContainer::new(Rect::new(0.0, 0.0, 400.0, 200.0), (0.0, 1000.0));
    let fx = Fixture::new(grid_model(50, 3), Some(Rc::clone(&container)));
    // r7 spans y 140..160 and crosses the 60px bottom margin.
    fx.controller.select_cell(&CellRef::new("r6", "c1"));
    fx.controller.key_down("ArrowDown", Modifiers::NONE);
    assert_eq!(*container.calls.borrow(), vec![(0.0, 20.0, true)]);
    assert_eq!(container.offset.get(), (0.0, 20.0));
}

#[test]
fn test_keyboard_move_inside_band_does_not_scroll() {
    let container = FakeContainer::new(Rect::new(0.0, 0.0, 400.0, 200.0), (0.0, 1000.0));
    let fx = Fixture::new(grid_model(50, 3), Some(Rc::clone(&container)));
    fx.controller.select_cell(&CellRef::new("r4", "c1"));
    fx.controller.key_down("ArrowDown", Modifiers::NONE);
    assert!(container.calls.borrow().is_empty());
}

#[test]
fn test_shift_ctrl_jump_extends_one_past_target() {
    let fx = Fixture::new(column_model(&[Some("a"), Some("b"), None, Some("c")]), None);
    fx.controller.select_cell(&CellRef::new("r0", "v"));
    fx.controller.key_down("ArrowDown", Modifiers::ctrl_shift());
    assert_eq!(fx.controller.focus_cell(), Some(CellRef::new("r1", "v")));
    assert_eq!(labels(&fx.controller.selection()), vec!["r0/v", "r1/v", "r2/v"]);
}

#[test]
fn test_ctrl_c_writes_selection_to_clipboard() {
    let mut model = grid_model(2, 2);
    model.records.insert("r0".into(), record(json!({"c0": "a", "c1": 1})));
    model.records.insert("r1".into(), record(json!({"c0": "b"})));
    let fx = Fixture::new(model, None);
    fx.controller.select_all();
    assert!(fx.controller.key_down("c", Modifiers::ctrl()));
    fx.scheduler.run_until_stalled();
    assert_eq!(*fx.clipboard.written.borrow(), vec!["a\t1\nb\t".to_string()]);
}

#[test]
fn test_ctrl_c_without_selection_is_not_handled() {
    let fx = Fixture::new(grid_model(2, 2), None);
    assert!(!fx.controller.key_down("c", Modifiers::ctrl()));
    assert_eq!(fx.scheduler.pending_futures(), 0);
}

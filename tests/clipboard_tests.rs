//! Copying selections as TSV through the controller.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use cellgrid::{serialize_tsv, CellRef, GridConfig, GridError, GridModel, Point};
use common::{grid_model, labels, record, Fixture};
use serde_json::json;

fn two_by_two() -> GridModel {
    GridModel::new(vec!["r1".into(), "r2".into()], vec!["a".into(), "b".into()])
        .with_record("r1", record(json!({"a": "1", "b": "2"})))
        .with_record("r2", record(json!({"a": "3", "b": "4"})))
}

#[test]
fn test_tsv_rows_and_tabs() {
    let cells = vec![
        CellRef::new("r1", "a"),
        CellRef::new("r1", "b"),
        CellRef::new("r2", "a"),
        CellRef::new("r2", "b"),
    ];
    assert_eq!(serialize_tsv(&cells, &two_by_two()), "1\t2\n3\t4");
}

#[test]
fn test_row_without_record_is_skipped() {
    let model = two_by_two();
    let cells = vec![
        CellRef::new("r1", "a"),
        CellRef::new("gone", "a"),
        CellRef::new("r2", "a"),
    ];
    assert_eq!(serialize_tsv(&cells, &model), "1\n3");
}

#[test]
fn test_values_print_like_strings() {
    let model = GridModel::new(vec!["r".into()], vec!["n".into(), "f".into(), "b".into(), "z".into()])
        .with_record("r", record(json!({"n": 42, "f": 1.5, "b": true, "z": null})));
    let cells: Vec<CellRef> = ["n", "f", "b", "z"]
        .iter()
        .map(|c| CellRef::new("r", *c))
        .collect();
    assert_eq!(serialize_tsv(&cells, &model), "42\t1.5\ttrue\t");
}

#[test]
fn test_drag_bottom_up_still_copies_in_visual_order() {
    let mut model = grid_model(2, 2);
    model.records.insert("r0".into(), record(json!({"c0": "1", "c1": "2"})));
    model.records.insert("r1".into(), record(json!({"c0": "3", "c1": "4"})));
    let fx = Fixture::new(model, None);

    fx.press(150.0, 30.0);
    fx.controller.pointer_up(Some(Point::new(10.0, 10.0)));
    assert_eq!(fx.controller.selection().len(), 4);

    let text = pollster::block_on(fx.controller.copy()).unwrap();
    assert_eq!(text.as_deref(), Some("1\t2\n3\t4"));
    assert_eq!(*fx.clipboard.written.borrow(), vec!["1\t2\n3\t4".to_string()]);
}

#[test]
fn test_copy_marks_cells_then_clears() {
    let fx = Fixture::new(grid_model(2, 2), None);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    fx.controller
        .on_copied_change(move |copied| sink.borrow_mut().push(copied.map(labels)));

    fx.controller.select_all();
    pollster::block_on(fx.controller.copy()).unwrap();
    assert_eq!(fx.controller.copied().unwrap().len(), 4);

    fx.scheduler.advance(599);
    assert!(fx.controller.copied().is_some());
    fx.scheduler.advance(1);
    assert!(fx.controller.copied().is_none());
    assert_eq!(seen.borrow().len(), 2);
    assert!(seen.borrow()[1].is_none());
}

#[test]
fn test_second_copy_restarts_the_flash() {
    let config = GridConfig {
        copied_flash_ms: 100,
        ..GridConfig::default()
    };
    let fx = Fixture::with_config(grid_model(2, 2), None, config);
    fx.controller.select_all();
    pollster::block_on(fx.controller.copy()).unwrap();
    fx.scheduler.advance(80);
    pollster::block_on(fx.controller.copy()).unwrap();
    fx.scheduler.advance(80);
    assert!(fx.controller.copied().is_some());
    assert_eq!(fx.scheduler.pending_timers(), 1);
    fx.scheduler.advance(20);
    assert!(fx.controller.copied().is_none());
}

#[test]
fn test_failed_copy_reports_and_marks_nothing() {
    let fx = Fixture::new(grid_model(2, 2), None);
    fx.clipboard.fail.set(true);
    fx.controller.select_all();
    let err = pollster::block_on(fx.controller.copy()).unwrap_err();
    assert!(matches!(err, GridError::Clipboard(ref msg) if msg == "permission denied"));
    assert!(fx.controller.copied().is_none());
    assert_eq!(fx.scheduler.pending_timers(), 0);
}

#[test]
fn test_copy_with_empty_selection_writes_nothing() {
    let fx = Fixture::new(grid_model(2, 2), None);
    let text = pollster::block_on(fx.controller.copy()).unwrap();
    assert!(text.is_none());
    assert!(fx.clipboard.written.borrow().is_empty());
}

//! Browser smoke tests for the DOM adapter.
//!
//! Run with: wasm-pack test --headless --firefox
#![cfg(target_arch = "wasm32")]
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use cellgrid::dom::{DomGeometry, DomScrollContainer, SCROLL_MARKER};
use cellgrid::{CellGrid, GeometryProvider, ScrollContainer};
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;
use web_sys::{Document, HtmlElement};

wasm_bindgen_test_configure!(run_in_browser);

fn document() -> Document {
    web_sys::window().unwrap().document().unwrap()
}

/// A scrolling wrapper holding a `rows` x `cols` grid of 80x20 cells.
fn mount(rows: usize, cols: usize) -> (HtmlElement, HtmlElement) {
    let doc = document();
    let wrapper: HtmlElement = doc.create_element("div").unwrap().unchecked_into();
    wrapper
        .set_attribute("style", "height:100px;width:200px;overflow:auto")
        .unwrap();
    let surface: HtmlElement = doc.create_element("div").unwrap().unchecked_into();
    for r in 0..rows {
        let row = doc.create_element("div").unwrap();
        row.set_attribute("style", "display:flex").unwrap();
        for c in 0..cols {
            let cell = doc.create_element("div").unwrap();
            cell.set_attribute("data-row-id", &format!("r{r}")).unwrap();
            cell.set_attribute("data-column-id", &format!("c{c}")).unwrap();
            cell.set_attribute("style", "width:80px;height:20px;flex:none")
                .unwrap();
            row.append_child(&cell).unwrap();
        }
        surface.append_child(&row).unwrap();
    }
    wrapper.append_child(&surface).unwrap();
    doc.body().unwrap().append_child(&wrapper).unwrap();
    (wrapper, surface)
}

#[wasm_bindgen_test]
fn geometry_reads_every_marked_cell() {
    let (wrapper, surface) = mount(4, 3);
    let cells = DomGeometry::new(surface.into()).cells_info();
    assert_eq!(cells.len(), 12);
    assert!(cells.iter().all(|c| (c.height - 20.0).abs() < 0.5));
    wrapper.remove();
}

#[wasm_bindgen_test]
fn overflow_ancestor_is_the_scroll_container() {
    let (wrapper, surface) = mount(20, 3);
    let container = DomScrollContainer::resolve(&surface).expect("container");
    let bounds = container.bounds();
    assert!((bounds.height - 100.0).abs() < 0.5);
    assert!(container.scroll_by(0.0, 40.0, false));
    assert_eq!(wrapper.scroll_top(), 40);
    wrapper.remove();
}

#[wasm_bindgen_test]
fn marker_attribute_wins() {
    let (wrapper, surface) = mount(2, 2);
    surface.set_attribute(SCROLL_MARKER, "").unwrap();
    assert!(DomScrollContainer::resolve(&surface).is_some());
    wrapper.remove();
}

#[wasm_bindgen_test]
fn grid_selects_all_and_detaches() {
    let (wrapper, surface) = mount(3, 2);
    let mut grid = CellGrid::new(surface, JsValue::UNDEFINED).unwrap();
    let model = js_sys::JSON::parse(
        r#"{"rows":["r0","r1","r2"],"columns":["c0","c1"],"records":{}}"#,
    )
    .unwrap();
    grid.set_model(model).unwrap();
    assert!(grid.select_all());
    let selection = grid.selection().unwrap();
    assert_eq!(js_sys::Array::from(&selection).length(), 6);
    grid.detach();
    wrapper.remove();
}

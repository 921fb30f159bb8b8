//! cellgrid - spreadsheet-style selection and editing for HTML data grids
//!
//! A headless interaction engine for dense, editable tables:
//! - Mouse/touch drag selection with frame-coalesced recomputation
//! - Edge auto-scroll while dragging
//! - Keyboard navigation with Ctrl/Cmd jumps across data regions
//! - Single-cell inline editing with Enter/arrow navigation
//! - Copy as TSV
//!
//! The engine only talks to the page through small traits (geometry,
//! scroll container, scheduler, clipboard), so everything runs under
//! `cargo test` with [`ManualScheduler`]. On wasm32 the [`dom`] module wires
//! it to real elements.
//!
//! # Usage (JavaScript)
//!
//! ```javascript
//! import init, { CellGrid, initLogging } from 'cellgrid';
//! await init();
//! initLogging('info');
//! const grid = new CellGrid(tableElement, { scrollStep: 24 });
//! grid.setModel({ rows, columns, records });
//! grid.onSelectionChange((cells) => render(cells));
//! grid.onCommit(async (rowId, columnId, value) => save(rowId, columnId, value));
//! ```

pub mod autoscroll;
pub mod clipboard;
pub mod config;
pub mod controller;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod model;
pub mod scheduler;
pub mod selection;
pub mod types;

#[cfg(target_arch = "wasm32")]
pub mod dom;

use wasm_bindgen::prelude::*;

pub use autoscroll::{scroll_velocity, AutoScrollConfig, AutoScroller, ScrollContainer};
pub use clipboard::{copy_cells, serialize_tsv, ClipboardWriter};
pub use config::GridConfig;
pub use controller::{GridController, GridHost};
pub use editor::{
    commit_fn, CommitFn, EditKey, EditNavigation, EditOutcome, EditState, InlineEditor,
    ModelNavigator,
};
pub use error::{CommitError, GridError, Result};
pub use geometry::GeometryProvider;
pub use model::{display_value, GridIndex, GridModel, RowLookup, RowRecord, SharedModel};
pub use scheduler::{FrameLoop, LocalFuture, ManualScheduler, Scheduler, TaskHandle};
pub use selection::{jump_target, rect_selection, row_major, SelectionEngine};
pub use types::*;

#[cfg(target_arch = "wasm32")]
pub use dom::CellGrid;

/// Install the panic hook and route `log` output to the browser console.
///
/// `level` is a `log` level name (`"debug"`, `"warn"`, ...); defaults to `info`.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(js_name = "initLogging")]
pub fn init(level: Option<String>) {
    console_error_panic_hook::set_once();
    let level = level
        .as_deref()
        .and_then(|l| l.parse::<log::LevelFilter>().ok())
        .unwrap_or(log::LevelFilter::Info);
    dom::install_logger(level);
}

/// Serialize a model's cells to TSV without touching the clipboard.
///
/// `model` is `{ rows, columns, records }`; `cells` is `[{ rowId, columnId }]`.
///
/// # Errors
/// Returns an error if either argument does not have the expected shape.
#[wasm_bindgen(js_name = "toTsv")]
pub fn to_tsv(model: JsValue, cells: JsValue) -> std::result::Result<String, JsValue> {
    let model: GridModel = serde_wasm_bindgen::from_value(model)
        .map_err(|e| JsValue::from_str(&format!("bad model: {e}")))?;
    let cells: Vec<CellRef> = serde_wasm_bindgen::from_value(cells)
        .map_err(|e| JsValue::from_str(&format!("bad cells: {e}")))?;
    Ok(serialize_tsv(&cells, &model))
}

/// Get the library version
#[must_use]
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

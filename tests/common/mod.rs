//! Common test doubles: a fake grid surface, scroll container and clipboard.
//!
//! The fake host lays cells out on a uniform grid and shifts them by the
//! container's scroll offset, so auto-scroll changes what is under a drag box
//! the same way a real scrolled table does.
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic,
    clippy::cast_precision_loss
)]

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use cellgrid::{
    CellGeometry, ClipboardWriter, GeometryProvider, GridConfig, GridController, GridError,
    GridHost, GridModel, LocalFuture, ManualScheduler, Modifiers, Point, PointerButton, Rect,
    RowRecord, Scheduler, ScrollContainer, SelectionSet,
};
use serde_json::Value;

pub const CELL_WIDTH: f64 = 100.0;
pub const CELL_HEIGHT: f64 = 20.0;

// ============================================================================
// Models
// ============================================================================

/// `rows` x `cols` model with ids `r0..` and `c0..` and no records.
pub fn grid_model(rows: usize, cols: usize) -> GridModel {
    GridModel::new(
        (0..rows).map(|r| format!("r{r}")).collect(),
        (0..cols).map(|c| format!("c{c}")).collect(),
    )
}

/// Build a record from a JSON object literal.
pub fn record(value: Value) -> RowRecord {
    let Value::Object(map) = value else {
        panic!("record must be a JSON object");
    };
    map
}

// ============================================================================
// Scroll container
// ============================================================================

pub struct FakeContainer {
    pub bounds: Rect,
    pub offset: Cell<(f64, f64)>,
    pub max_offset: (f64, f64),
    pub calls: RefCell<Vec<(f64, f64, bool)>>,
}

impl FakeContainer {
    pub fn new(bounds: Rect, max_offset: (f64, f64)) -> Rc<Self> {
        Rc::new(Self {
            bounds,
            offset: Cell::new((0.0, 0.0)),
            max_offset,
            calls: RefCell::new(Vec::new()),
        })
    }
}

impl ScrollContainer for FakeContainer {
    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn scroll_by(&self, dx: f64, dy: f64, smooth: bool) -> bool {
        self.calls.borrow_mut().push((dx, dy, smooth));
        let (x, y) = self.offset.get();
        let nx = (x + dx).clamp(0.0, self.max_offset.0);
        let ny = (y + dy).clamp(0.0, self.max_offset.1);
        self.offset.set((nx, ny));
        (nx - x).abs() > f64::EPSILON || (ny - y).abs() > f64::EPSILON
    }
}

// ============================================================================
// Host
// ============================================================================

pub struct FakeHost {
    pub rows: usize,
    pub cols: usize,
    pub container: Option<Rc<FakeContainer>>,
    pub locked: Cell<bool>,
    pub queries: Cell<usize>,
}

impl FakeHost {
    pub fn new(rows: usize, cols: usize, container: Option<Rc<FakeContainer>>) -> Rc<Self> {
        Rc::new(Self {
            rows,
            cols,
            container,
            locked: Cell::new(false),
            queries: Cell::new(0),
        })
    }
}

impl GeometryProvider for FakeHost {
    fn cells_info(&self) -> Vec<CellGeometry> {
        self.queries.set(self.queries.get() + 1);
        let (origin, (ox, oy)) = match &self.container {
            Some(c) => (c.bounds, c.offset.get()),
            None => (Rect::default(), (0.0, 0.0)),
        };
        let mut cells = Vec::with_capacity(self.rows * self.cols);
        for r in 0..self.rows {
            for c in 0..self.cols {
                cells.push(CellGeometry::new(
                    format!("r{r}"),
                    format!("c{c}"),
                    Rect::new(
                        origin.x + c as f64 * CELL_WIDTH - ox,
                        origin.y + r as f64 * CELL_HEIGHT - oy,
                        CELL_WIDTH,
                        CELL_HEIGHT,
                    ),
                ));
            }
        }
        cells
    }
}

impl GridHost for FakeHost {
    fn scroll_container(&self) -> Option<Rc<dyn ScrollContainer>> {
        self.container
            .as_ref()
            .map(|c| Rc::clone(c) as Rc<dyn ScrollContainer>)
    }

    fn set_text_selection_locked(&self, locked: bool) {
        self.locked.set(locked);
    }
}

// ============================================================================
// Clipboard
// ============================================================================

/// Clipboard that records writes. Clones share the record.
#[derive(Default, Clone)]
pub struct RecordingClipboard {
    pub fail: Rc<Cell<bool>>,
    pub written: Rc<RefCell<Vec<String>>>,
}

impl ClipboardWriter for RecordingClipboard {
    fn write_text(&self, text: String) -> LocalFuture<'static, cellgrid::Result<()>> {
        let fail = self.fail.get();
        let written = Rc::clone(&self.written);
        Box::pin(async move {
            if fail {
                return Err(GridError::Clipboard("permission denied".into()));
            }
            written.borrow_mut().push(text);
            Ok(())
        })
    }
}

// ============================================================================
// Futures
// ============================================================================

/// Future that stays pending until its flag is set. Polled by
/// `ManualScheduler::run_until_stalled`, which does not need wakeups.
pub struct Gate(pub Rc<Cell<bool>>);

impl Future for Gate {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        if self.0.get() {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

// ============================================================================
// Controller fixture
// ============================================================================

pub struct Fixture {
    pub controller: GridController,
    pub host: Rc<FakeHost>,
    pub scheduler: Rc<ManualScheduler>,
    pub clipboard: RecordingClipboard,
    pub notifications: Rc<RefCell<Vec<SelectionSet>>>,
}

impl Fixture {
    pub fn new(model: GridModel, container: Option<Rc<FakeContainer>>) -> Self {
        Self::with_config(model, container, GridConfig::default())
    }

    pub fn with_config(
        model: GridModel,
        container: Option<Rc<FakeContainer>>,
        config: GridConfig,
    ) -> Self {
        let host = FakeHost::new(model.row_count(), model.column_count(), container);
        let scheduler = ManualScheduler::new();
        let clipboard = RecordingClipboard::default();
        let controller = GridController::new(
            model.shared(),
            Rc::clone(&host) as Rc<dyn GridHost>,
            Rc::clone(&scheduler) as Rc<dyn Scheduler>,
            Rc::new(clipboard.clone()),
            config,
        );
        let notifications = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&notifications);
        controller.on_selection_change(move |selection| sink.borrow_mut().push(selection.clone()));
        Self {
            controller,
            host,
            scheduler,
            clipboard,
            notifications,
        }
    }

    pub fn press(&self, x: f64, y: f64) -> bool {
        self.controller
            .pointer_down(Point::new(x, y), PointerButton::Primary, Modifiers::NONE)
    }

    pub fn notification_count(&self) -> usize {
        self.notifications.borrow().len()
    }
}

/// Selection as sorted `"row/col"` strings for compact assertions.
pub fn labels(selection: &SelectionSet) -> Vec<String> {
    let mut out: Vec<String> = selection
        .iter()
        .map(|c| format!("{}/{}", c.row_id, c.column_id))
        .collect();
    out.sort();
    out
}

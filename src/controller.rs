//! Pointer, touch and keyboard handling for one grid surface.
//!
//! `GridController` feeds raw input into the [`SelectionEngine`], runs the
//! frame-coalesced drag recomputation and the edge auto-scroll loop, and
//! tells the host about selection changes. Host specifics (where cells are,
//! which element scrolls, how to block text selection) come in through a
//! [`GridHost`], and all deferred work goes through a [`Scheduler`], so the
//! whole thing runs headless under [`ManualScheduler`](crate::ManualScheduler).

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::autoscroll::{AutoScroller, ScrollContainer};
use crate::clipboard::{copy_cells, ClipboardWriter};
use crate::config::GridConfig;
use crate::error::Result;
use crate::geometry::{find_cell_rect, scroll_into_view_delta, GeometryProvider};
use crate::model::{GridModel, SharedModel};
use crate::scheduler::{Scheduler, TaskHandle};
use crate::selection::{row_major, SelectionEngine};
use crate::types::{
    AnchorFocus, CellRef, CopiedSet, Direction, Modifiers, Point, PointerButton, Rect,
    SelectionSet,
};

/// What the controller needs from the surface it is attached to.
pub trait GridHost: GeometryProvider {
    /// Nearest scrollable ancestor of the grid, if any.
    fn scroll_container(&self) -> Option<Rc<dyn ScrollContainer>>;

    /// Block or restore native text selection while a drag is in progress.
    fn set_text_selection_locked(&self, _locked: bool) {}
}

type SelectionListener = Rc<RefCell<dyn FnMut(&SelectionSet)>>;
type CopiedListener = Rc<RefCell<dyn FnMut(Option<&SelectionSet>)>>;

struct ControllerState {
    engine: SelectionEngine,
    model: SharedModel,
    config: GridConfig,
    auto_scroller: AutoScroller,
    /// Coalesced drag recomputation waiting for the next frame.
    pending_frame: Option<TaskHandle>,
    copied: CopiedSet,
    copied_timer: Option<TaskHandle>,
    ui_locked: bool,
    detached: bool,
    on_selection: Option<SelectionListener>,
    /// Selection changed while the selection listener was running.
    renotify: bool,
    on_copied: Option<CopiedListener>,
}

struct ControllerInner {
    state: RefCell<ControllerState>,
    host: Rc<dyn GridHost>,
    scheduler: Rc<dyn Scheduler>,
    clipboard: Rc<dyn ClipboardWriter>,
}

impl ControllerInner {
    fn drag_pointer(&self) -> Option<Point> {
        self.state.borrow().engine.drag().map(|d| d.last)
    }
}

/// Input controller for a single grid. Clones share state.
#[derive(Clone)]
pub struct GridController {
    inner: Rc<ControllerInner>,
}

impl GridController {
    pub fn new(
        model: SharedModel,
        host: Rc<dyn GridHost>,
        scheduler: Rc<dyn Scheduler>,
        clipboard: Rc<dyn ClipboardWriter>,
        config: GridConfig,
    ) -> Self {
        Self {
            inner: Rc::new(ControllerInner {
                state: RefCell::new(ControllerState {
                    engine: SelectionEngine::new(),
                    model,
                    config,
                    auto_scroller: AutoScroller::new(),
                    pending_frame: None,
                    copied: CopiedSet::default(),
                    copied_timer: None,
                    ui_locked: false,
                    detached: false,
                    on_selection: None,
                    renotify: false,
                    on_copied: None,
                }),
                host,
                scheduler,
                clipboard,
            }),
        }
    }

    fn from_weak(weak: &Weak<ControllerInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    // ---- observers ----

    /// Called synchronously with the new selection after every change.
    ///
    /// A change made from inside the listener is delivered after the
    /// listener returns, with the selection current at that point.
    pub fn on_selection_change(&self, listener: impl FnMut(&SelectionSet) + 'static) {
        let listener: SelectionListener = Rc::new(RefCell::new(listener));
        self.inner.state.borrow_mut().on_selection = Some(listener);
    }

    /// Called when the copied-cells marker is set (`Some`) or cleared (`None`).
    pub fn on_copied_change(&self, listener: impl FnMut(Option<&SelectionSet>) + 'static) {
        let listener: CopiedListener = Rc::new(RefCell::new(listener));
        self.inner.state.borrow_mut().on_copied = Some(listener);
    }

    fn notify(&self, changed: bool) {
        if !changed {
            return;
        }
        let (listener, selection) = {
            let s = self.inner.state.borrow();
            (s.on_selection.as_ref().map(Rc::clone), s.engine.selection().clone())
        };
        log::debug!("selection changed: {} cells", selection.len());
        let Some(listener) = listener else {
            return;
        };
        let Ok(mut callback) = listener.try_borrow_mut() else {
            // The outer call delivers this once the running callback returns.
            self.inner.state.borrow_mut().renotify = true;
            return;
        };
        (*callback)(&selection);
        while self.take_renotify() {
            let selection = self.selection();
            (*callback)(&selection);
        }
    }

    fn take_renotify(&self) -> bool {
        std::mem::take(&mut self.inner.state.borrow_mut().renotify)
    }

    fn notify_copied(&self) {
        let (listener, copied) = {
            let s = self.inner.state.borrow();
            (s.on_copied.as_ref().map(Rc::clone), s.copied.get().cloned())
        };
        if let Some(listener) = listener {
            if let Ok(mut listener) = listener.try_borrow_mut() {
                (*listener)(copied.as_ref());
            }
        }
    }

    // ---- accessors ----

    pub fn selection(&self) -> SelectionSet {
        self.inner.state.borrow().engine.selection().clone()
    }

    pub fn anchor_focus(&self) -> AnchorFocus {
        self.inner.state.borrow().engine.anchor_focus()
    }

    pub fn focus_cell(&self) -> Option<CellRef> {
        self.inner.state.borrow().engine.focus_cell().cloned()
    }

    /// Current drag rectangle, present only while dragging.
    pub fn drag_box(&self) -> Option<Rect> {
        self.inner.state.borrow().engine.drag_box()
    }

    pub fn is_dragging(&self) -> bool {
        self.inner.state.borrow().engine.is_dragging()
    }

    pub fn is_auto_scrolling(&self) -> bool {
        self.inner.state.borrow().auto_scroller.is_running()
    }

    /// Cells of the last successful copy, until the flash times out.
    pub fn copied(&self) -> Option<SelectionSet> {
        self.inner.state.borrow().copied.get().cloned()
    }

    pub fn model(&self) -> SharedModel {
        Rc::clone(&self.inner.state.borrow().model)
    }

    pub fn config(&self) -> GridConfig {
        self.inner.state.borrow().config.clone()
    }

    pub fn is_detached(&self) -> bool {
        self.inner.state.borrow().detached
    }

    // ---- model ----

    /// Replace the row/column model and drop selected cells that vanished.
    pub fn set_model(&self, model: GridModel) {
        {
            let s = self.inner.state.borrow();
            *s.model.borrow_mut() = model;
        }
        self.model_changed();
    }

    /// Re-check the selection after the shared model was mutated in place
    /// (sort, filter, column visibility).
    pub fn model_changed(&self) {
        let (changed, drag_dropped) = {
            let mut guard = self.inner.state.borrow_mut();
            let s = &mut *guard;
            let was_dragging = s.engine.is_dragging();
            let model = s.model.borrow();
            let changed = s.engine.revalidate(&model);
            (changed, was_dragging && !s.engine.is_dragging())
        };
        if drag_dropped {
            log::debug!("drag ended by model change");
            self.end_drag_session();
        }
        self.notify(changed);
    }

    // ---- programmatic selection ----

    pub fn select_all(&self) -> bool {
        let changed = {
            let mut guard = self.inner.state.borrow_mut();
            let s = &mut *guard;
            let model = s.model.borrow();
            s.engine.select_all(&model)
        };
        self.notify(changed);
        changed
    }

    pub fn select_cell(&self, cell: &CellRef) -> bool {
        let changed = {
            let mut guard = self.inner.state.borrow_mut();
            let s = &mut *guard;
            let model = s.model.borrow();
            s.engine.select_cell(&model, cell)
        };
        self.notify(changed);
        changed
    }

    pub fn clear_selection(&self) -> bool {
        if self.is_dragging() {
            self.end_drag_session();
        }
        let changed = self.inner.state.borrow_mut().engine.clear();
        self.notify(changed);
        changed
    }

    // ---- pointer ----

    /// Button press on the surface. Returns true when a drag selection began.
    pub fn pointer_down(&self, point: Point, button: PointerButton, modifiers: Modifiers) -> bool {
        if self.is_detached() {
            return false;
        }
        if self.is_dragging() {
            // Missed release from the previous gesture.
            self.abort_tracking();
        }
        let cells = self.inner.host.cells_info();
        let (changed, started) = {
            let mut guard = self.inner.state.borrow_mut();
            let s = &mut *guard;
            let model = s.model.borrow();
            let changed = s.engine.press(point, button, modifiers, &model, &cells);
            (changed, s.engine.is_dragging())
        };
        if started {
            log::debug!("drag started at ({}, {})", point.x, point.y);
            self.inner.state.borrow_mut().ui_locked = true;
            self.inner.host.set_text_selection_locked(true);
            self.start_auto_scroll();
        }
        self.notify(changed);
        started
    }

    /// Pointer motion. Recomputation is deferred to the next frame, and any
    /// number of moves before that frame share one recomputation.
    pub fn pointer_move(&self, point: Point) -> bool {
        {
            let mut s = self.inner.state.borrow_mut();
            if s.detached || !s.engine.is_dragging() {
                return false;
            }
            s.engine.drag_to(point);
            if s.pending_frame.is_some() {
                return true;
            }
        }
        let weak = Rc::downgrade(&self.inner);
        let handle = self.inner.scheduler.request_frame(Box::new(move || {
            let Some(this) = Self::from_weak(&weak) else {
                return;
            };
            this.inner.state.borrow_mut().pending_frame = None;
            this.recompute();
        }));
        self.inner.state.borrow_mut().pending_frame = Some(handle);
        true
    }

    /// Button release. `point` is the release position when known.
    pub fn pointer_up(&self, point: Option<Point>) -> bool {
        if !self.is_dragging() {
            return false;
        }
        if let Some(point) = point {
            self.inner.state.borrow_mut().engine.drag_to(point);
        }
        self.end_drag_session();
        let cells = self.inner.host.cells_info();
        let changed = self.inner.state.borrow_mut().engine.release(&cells);
        log::debug!("drag released");
        self.notify(changed);
        true
    }

    // ---- touch ----

    /// Touch start with `touches` points on the surface. Only a single touch
    /// starts a selection.
    pub fn touch_start(&self, point: Point, touches: usize) -> bool {
        if touches != 1 {
            self.abort_tracking();
            return false;
        }
        self.pointer_down(point, PointerButton::Primary, Modifiers::NONE)
    }

    /// Touch move. A second touch point abandons the drag.
    pub fn touch_move(&self, point: Point, touches: usize) -> bool {
        if touches > 1 {
            self.abort_tracking();
            return false;
        }
        self.pointer_move(point)
    }

    pub fn touch_end(&self, point: Option<Point>) -> bool {
        self.pointer_up(point)
    }

    pub fn touch_cancel(&self) {
        self.abort_tracking();
    }

    // ---- keyboard ----

    /// Key press while the grid has focus. Returns true when the key was
    /// handled and the host should suppress its default action.
    pub fn key_down(&self, key: &str, modifiers: Modifiers) -> bool {
        if self.is_detached() {
            return false;
        }
        if let Some(direction) = Direction::from_key(key) {
            return self.navigate(direction, modifiers);
        }
        match key {
            "a" | "A" if modifiers.command() => {
                self.select_all();
                true
            }
            "c" | "C" if modifiers.command() => {
                if self.selection().is_empty() {
                    return false;
                }
                let this = self.clone();
                self.inner.scheduler.spawn_local(Box::pin(async move {
                    // Failures are logged by `copy`.
                    let _ = this.copy().await;
                }));
                true
            }
            "Escape" | "Esc" => {
                let had_selection = !self.selection().is_empty();
                self.clear_selection();
                had_selection
            }
            _ => false,
        }
    }

    /// Arrow-key navigation followed by scrolling the focused cell into view.
    pub fn navigate(&self, direction: Direction, modifiers: Modifiers) -> bool {
        let handled = {
            let mut guard = self.inner.state.borrow_mut();
            let s = &mut *guard;
            if s.engine.is_dragging() || s.engine.anchor_focus().focus.is_none() {
                None
            } else {
                let model = s.model.borrow();
                Some(s.engine.navigate(direction, modifiers, &model))
            }
        };
        let Some(changed) = handled else {
            return false;
        };
        self.notify(changed);
        self.scroll_focus_into_view();
        true
    }

    fn scroll_focus_into_view(&self) {
        let (focus, margin) = {
            let s = self.inner.state.borrow();
            (s.engine.focus_cell().cloned(), s.config.keyboard_scroll_margin)
        };
        let Some(focus) = focus else {
            return;
        };
        let Some(container) = self.inner.host.scroll_container() else {
            return;
        };
        // A virtualised row that is not rendered has no geometry yet.
        let cells = self.inner.host.cells_info();
        let Some(rect) = find_cell_rect(&cells, &focus) else {
            return;
        };
        let (dx, dy) = scroll_into_view_delta(&rect, &container.bounds(), margin);
        if dx != 0.0 || dy != 0.0 {
            container.scroll_by(dx, dy, true);
        }
    }

    // ---- clipboard ----

    /// Copy the selection as TSV, cells ordered top-to-bottom, left-to-right.
    ///
    /// Resolves to `None` when nothing is selected. On success the copied
    /// cells are flagged for `copied_flash_ms`; on failure nothing changes.
    pub async fn copy(&self) -> Result<Option<String>> {
        let (write, snapshot) = {
            let s = self.inner.state.borrow();
            let model = s.model.borrow();
            let cells = row_major(&model, s.engine.selection());
            if cells.is_empty() {
                return Ok(None);
            }
            let snapshot: SelectionSet = cells.iter().cloned().collect();
            let write = copy_cells(self.inner.clipboard.as_ref(), &cells, &*model);
            (write, snapshot)
        };
        match write.await {
            Ok(text) => {
                self.flash_copied(snapshot);
                Ok(Some(text))
            }
            Err(e) => {
                log::warn!("copy failed: {e}");
                Err(e)
            }
        }
    }

    fn flash_copied(&self, cells: SelectionSet) {
        let (previous, delay) = {
            let mut s = self.inner.state.borrow_mut();
            if s.detached {
                return;
            }
            s.copied.set(cells);
            (s.copied_timer.take(), s.config.copied_flash_ms)
        };
        if let Some(handle) = previous {
            self.inner.scheduler.cancel(handle);
        }
        let weak = Rc::downgrade(&self.inner);
        let handle = self.inner.scheduler.set_timeout(
            delay,
            Box::new(move || {
                let Some(this) = Self::from_weak(&weak) else {
                    return;
                };
                {
                    let mut s = this.inner.state.borrow_mut();
                    s.copied_timer = None;
                    s.copied.clear();
                }
                this.notify_copied();
            }),
        );
        self.inner.state.borrow_mut().copied_timer = Some(handle);
        self.notify_copied();
    }

    // ---- drag session plumbing ----

    fn recompute(&self) {
        if !self.is_dragging() {
            return;
        }
        let cells = self.inner.host.cells_info();
        let changed = self.inner.state.borrow_mut().engine.recompute_drag(&cells);
        self.notify(changed);
    }

    fn start_auto_scroll(&self) {
        let Some(container) = self.inner.host.scroll_container() else {
            log::debug!("no scroll container; auto-scroll disabled for this drag");
            return;
        };
        let pointer = Rc::downgrade(&self.inner);
        let scrolled = Rc::downgrade(&self.inner);
        let mut s = self.inner.state.borrow_mut();
        let config = s.config.auto_scroll();
        s.auto_scroller.start(
            Rc::clone(&self.inner.scheduler),
            container,
            config,
            move || pointer.upgrade()?.drag_pointer(),
            move || {
                if let Some(this) = Self::from_weak(&scrolled) {
                    this.recompute();
                }
            },
        );
    }

    /// Stop the auto-scroll loop and pending frame, and release the UI lock.
    /// Leaves the engine's drag state alone.
    fn end_drag_session(&self) {
        let (pending, was_locked) = {
            let mut s = self.inner.state.borrow_mut();
            s.auto_scroller.stop();
            (s.pending_frame.take(), std::mem::take(&mut s.ui_locked))
        };
        if let Some(handle) = pending {
            self.inner.scheduler.cancel(handle);
        }
        if was_locked {
            self.inner.host.set_text_selection_locked(false);
        }
    }

    /// Abandon any drag without a final recomputation.
    fn abort_tracking(&self) {
        if !self.is_dragging() {
            return;
        }
        log::debug!("drag aborted");
        self.end_drag_session();
        self.inner.state.borrow_mut().engine.abort_drag();
    }

    /// Tear down: cancel every pending frame and timer and end any drag.
    /// Input received afterwards is ignored.
    pub fn detach(&self) {
        self.abort_tracking();
        let copied_timer = {
            let mut s = self.inner.state.borrow_mut();
            s.detached = true;
            s.copied.clear();
            s.copied_timer.take()
        };
        if let Some(handle) = copied_timer {
            self.inner.scheduler.cancel(handle);
        }
        log::debug!("grid controller detached");
    }
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
    use crate::scheduler::{LocalFuture, ManualScheduler};
    use crate::types::CellGeometry;
    use std::cell::Cell;

    struct Host {
        cells: Vec<CellGeometry>,
        locked: Cell<bool>,
    }

    impl GeometryProvider for Host {
        fn cells_info(&self) -> Vec<CellGeometry> {
            self.cells.clone()
        }
    }

    impl GridHost for Host {
        fn scroll_container(&self) -> Option<Rc<dyn ScrollContainer>> {
            None
        }

        fn set_text_selection_locked(&self, locked: bool) {
            self.locked.set(locked);
        }
    }

    struct NullClipboard;

    impl ClipboardWriter for NullClipboard {
        fn write_text(&self, _text: String) -> LocalFuture<'static, Result<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    fn setup() -> (GridController, Rc<Host>, Rc<ManualScheduler>) {
        let mut cells = Vec::new();
        for r in 0..3 {
            for c in 0..3 {
                cells.push(CellGeometry::new(
                    format!("r{r}"),
                    format!("c{c}"),
                    Rect::new(f64::from(c) * 100.0, f64::from(r) * 20.0, 100.0, 20.0),
                ));
            }
        }
        let host = Rc::new(Host {
            cells,
            locked: Cell::new(false),
        });
        let scheduler = ManualScheduler::new();
        let model = GridModel::new(
            vec!["r0".into(), "r1".into(), "r2".into()],
            vec!["c0".into(), "c1".into(), "c2".into()],
        )
        .shared();
        let controller = GridController::new(
            model,
            Rc::clone(&host) as Rc<dyn GridHost>,
            Rc::clone(&scheduler) as Rc<dyn Scheduler>,
            Rc::new(NullClipboard),
            GridConfig::default(),
        );
        (controller, host, scheduler)
    }

    #[test]
    fn test_moves_are_coalesced_per_frame() {
        let (controller, _host, scheduler) = setup();
        controller.pointer_down(Point::new(10.0, 10.0), PointerButton::Primary, Modifiers::NONE);
        controller.pointer_move(Point::new(150.0, 10.0));
        controller.pointer_move(Point::new(250.0, 10.0));
        controller.pointer_move(Point::new(250.0, 50.0));
        assert_eq!(scheduler.pending_frames(), 1);
        scheduler.run_frame();
        assert_eq!(controller.selection().len(), 9);
    }

    #[test]
    fn test_release_unlocks_and_clears_drag_box() {
        let (controller, host, scheduler) = setup();
        assert!(controller.pointer_down(
            Point::new(10.0, 10.0),
            PointerButton::Primary,
            Modifiers::NONE
        ));
        assert!(host.locked.get());
        controller.pointer_move(Point::new(150.0, 30.0));
        assert!(controller.pointer_up(None));
        assert!(!host.locked.get());
        assert!(controller.drag_box().is_none());
        assert_eq!(controller.selection().len(), 4);
        assert_eq!(scheduler.pending_frames(), 0);
    }

    #[test]
    fn test_emptied_model_during_drag_releases_lock() {
        let (controller, host, scheduler) = setup();
        controller.pointer_down(Point::new(10.0, 10.0), PointerButton::Primary, Modifiers::NONE);
        controller.pointer_move(Point::new(150.0, 30.0));
        assert!(host.locked.get());
        controller.set_model(GridModel::new(Vec::new(), vec!["c0".into()]));
        assert!(!controller.is_dragging());
        assert!(!host.locked.get());
        assert_eq!(scheduler.pending_frames(), 0);
        assert!(!controller.pointer_up(Some(Point::new(150.0, 30.0))));
        assert!(!host.locked.get());
        assert!(controller.selection().is_empty());
    }

    #[test]
    fn test_change_made_by_listener_is_delivered_after_it() {
        let (controller, _host, _scheduler) = setup();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let inner = controller.clone();
        controller.on_selection_change(move |selection| {
            sink.borrow_mut().push(selection.len());
            if selection.len() == 1 {
                inner.select_all();
            }
        });
        controller.select_cell(&CellRef::new("r0", "c0"));
        assert_eq!(*seen.borrow(), vec![1, 9]);
        assert_eq!(controller.selection().len(), 9);
    }

    #[test]
    fn test_detach_ignores_further_input() {
        let (controller, _host, scheduler) = setup();
        controller.pointer_down(Point::new(10.0, 10.0), PointerButton::Primary, Modifiers::NONE);
        controller.pointer_move(Point::new(150.0, 30.0));
        controller.detach();
        assert_eq!(scheduler.pending_frames(), 0);
        assert!(!controller.is_dragging());
        assert!(!controller.key_down("ArrowDown", Modifiers::NONE));
        assert!(!controller.pointer_down(
            Point::new(10.0, 10.0),
            PointerButton::Primary,
            Modifiers::NONE
        ));
    }
}

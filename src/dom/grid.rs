//! `CellGrid`: the JavaScript-facing grid object.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Function, Promise};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{future_to_promise, JsFuture};
use web_sys::{
    AddEventListenerOptions, Event, EventTarget, HtmlElement, KeyboardEvent, MouseEvent,
    TouchEvent,
};

use super::clipboard::NavigatorClipboard;
use super::host::DomHost;
use super::scheduler::BrowserScheduler;
use crate::config::GridConfig;
use crate::controller::{GridController, GridHost};
use crate::editor::{commit_fn, EditKey, EditNavigation, EditOutcome, InlineEditor, ModelNavigator};
use crate::error::{js_error_message, CommitError, GridError};
use crate::model::{GridModel, SharedModel};
use crate::scheduler::Scheduler;
use crate::types::{CellRef, Direction, Modifiers, Point, PointerButton};

#[derive(Default)]
struct JsCallbacks {
    on_commit: Option<Function>,
    on_navigate: Option<Function>,
}

/// A registered DOM listener, removed on detach.
struct Listener {
    target: EventTarget,
    kind: &'static str,
    closure: Closure<dyn FnMut(Event)>,
}

impl Listener {
    fn add<E>(
        target: &EventTarget,
        kind: &'static str,
        passive: bool,
        mut handler: impl FnMut(E) + 'static,
    ) -> Result<Self, GridError>
    where
        E: JsCast + 'static,
    {
        let closure = Closure::wrap(Box::new(move |event: Event| {
            if let Ok(event) = event.dyn_into::<E>() {
                handler(event);
            }
        }) as Box<dyn FnMut(Event)>);
        let options = AddEventListenerOptions::new();
        options.set_passive(passive);
        target
            .add_event_listener_with_callback_and_add_event_listener_options(
                kind,
                closure.as_ref().unchecked_ref(),
                &options,
            )
            .map_err(|e| GridError::Dom(format!("{kind} listener: {}", js_error_message(&e))))?;
        Ok(Self {
            target: target.clone(),
            kind,
            closure,
        })
    }

    fn remove(&self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.kind, self.closure.as_ref().unchecked_ref());
    }
}

fn modifiers_of_mouse(event: &MouseEvent) -> Modifiers {
    Modifiers {
        shift: event.shift_key(),
        ctrl: event.ctrl_key(),
        meta: event.meta_key(),
        alt: event.alt_key(),
    }
}

fn first_touch(event: &TouchEvent) -> Option<Point> {
    let touch = event.touches().get(0).or_else(|| event.changed_touches().get(0))?;
    Some(Point::new(f64::from(touch.client_x()), f64::from(touch.client_y())))
}

fn touch_count(event: &TouchEvent) -> usize {
    usize::try_from(event.touches().length()).unwrap_or(usize::MAX)
}

fn direction_name(direction: Direction) -> &'static str {
    match direction {
        Direction::Up => "up",
        Direction::Down => "down",
        Direction::Left => "left",
        Direction::Right => "right",
    }
}

/// Selection, copy and inline editing for one grid surface element.
///
/// Cells are the surface's descendants carrying `data-row-id` and
/// `data-column-id`. Listeners are scoped to this instance and removed by
/// `detach()` or when the object is freed.
#[wasm_bindgen]
pub struct CellGrid {
    controller: GridController,
    editor: InlineEditor,
    model: SharedModel,
    config: GridConfig,
    callbacks: Rc<RefCell<JsCallbacks>>,
    listeners: Vec<Listener>,
}

#[wasm_bindgen]
impl CellGrid {
    /// Attach to `surface`. `options` is an optional object of config
    /// overrides (`edgeThreshold`, `scrollStep`, ...).
    #[wasm_bindgen(constructor)]
    pub fn new(surface: HtmlElement, options: JsValue) -> Result<CellGrid, JsValue> {
        console_error_panic_hook::set_once();

        let config: GridConfig = if options.is_undefined() || options.is_null() {
            GridConfig::default()
        } else {
            serde_wasm_bindgen::from_value(options)
                .map_err(|e| GridError::Config(e.to_string()))?
        };
        config.validate()?;

        let scheduler: Rc<dyn Scheduler> = BrowserScheduler::new();
        let host = Rc::new(DomHost::new(surface.clone()));
        let model = GridModel::default().shared();
        let callbacks = Rc::new(RefCell::new(JsCallbacks::default()));

        let controller = GridController::new(
            Rc::clone(&model),
            Rc::clone(&host) as Rc<dyn GridHost>,
            Rc::clone(&scheduler),
            Rc::new(NavigatorClipboard),
            config.clone(),
        );

        let commit = {
            let callbacks = Rc::clone(&callbacks);
            commit_fn(move |cell: CellRef, value: String| {
                let handler = callbacks.borrow().on_commit.clone();
                let called = handler.map(|f| {
                    f.call3(
                        &JsValue::NULL,
                        &JsValue::from_str(&cell.row_id),
                        &JsValue::from_str(&cell.column_id),
                        &JsValue::from_str(&value),
                    )
                });
                async move {
                    let result = match called {
                        None => return Ok(()),
                        Some(result) => result.map_err(|e| CommitError::new(js_error_message(&e)))?,
                    };
                    if let Ok(promise) = result.dyn_into::<Promise>() {
                        JsFuture::from(promise)
                            .await
                            .map_err(|e| CommitError::new(js_error_message(&e)))?;
                    }
                    Ok::<(), CommitError>(())
                }
            })
        };
        let editor = InlineEditor::new(commit, scheduler);

        let mut grid = CellGrid {
            controller,
            editor,
            model,
            config,
            callbacks,
            listeners: Vec::new(),
        };
        grid.attach(&surface)?;
        log::debug!("cell grid attached");
        Ok(grid)
    }

    /// Replace the model: `{ rows: string[], columns: string[], records: { [rowId]: object } }`.
    #[wasm_bindgen(js_name = "setModel")]
    pub fn set_model(&self, model: JsValue) -> Result<(), JsValue> {
        let model: GridModel = serde_wasm_bindgen::from_value(model)
            .map_err(|e| GridError::Config(format!("bad model: {e}")))?;
        self.controller.set_model(model);
        Ok(())
    }

    /// Build the model from an array of row objects, using `idField` as the row id.
    #[wasm_bindgen(js_name = "setRows")]
    pub fn set_rows(&self, id_field: &str, columns: Vec<String>, rows: JsValue) -> Result<(), JsValue> {
        let records: Vec<crate::model::RowRecord> = serde_wasm_bindgen::from_value(rows)
            .map_err(|e| GridError::Config(format!("bad rows: {e}")))?;
        self.controller
            .set_model(GridModel::from_records(id_field, columns, records));
        Ok(())
    }

    /// Current selection as `[{ rowId, columnId }]`.
    pub fn selection(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.controller.selection())
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen(js_name = "selectAll")]
    pub fn select_all(&self) -> bool {
        self.controller.select_all()
    }

    #[wasm_bindgen(js_name = "clearSelection")]
    pub fn clear_selection(&self) -> bool {
        self.controller.clear_selection()
    }

    /// Copy the selection as TSV. Resolves to the text, or `null` when
    /// nothing is selected.
    pub fn copy(&self) -> Promise {
        let controller = self.controller.clone();
        future_to_promise(async move {
            match controller.copy().await {
                Ok(Some(text)) => Ok(JsValue::from_str(&text)),
                Ok(None) => Ok(JsValue::NULL),
                Err(e) => Err(e.into()),
            }
        })
    }

    #[wasm_bindgen(js_name = "startEdit")]
    pub fn start_edit(&self, row_id: &str, column_id: &str, initial: Option<String>) {
        let initial = initial.or_else(|| {
            let model = self.model.borrow();
            Some(model.text(row_id, column_id))
        });
        self.editor
            .start_editing(CellRef::new(row_id, column_id), initial.as_deref());
    }

    #[wasm_bindgen(js_name = "updateDraft")]
    pub fn update_draft(&self, text: String) {
        self.editor.update_draft(text);
    }

    /// Confirm the open edit. Resolves to `true` when the value was committed.
    #[wasm_bindgen(js_name = "confirmEdit")]
    pub fn confirm_edit(&self) -> Promise {
        let confirm = self.editor.confirm();
        future_to_promise(async move {
            let outcome = confirm.await.map_err(JsValue::from)?;
            Ok(JsValue::from_bool(matches!(outcome, EditOutcome::Committed(_))))
        })
    }

    #[wasm_bindgen(js_name = "cancelEdit")]
    pub fn cancel_edit(&self) {
        self.editor.cancel();
    }

    #[wasm_bindgen(js_name = "blurEdit")]
    pub fn blur_edit(&self) {
        self.editor.blur(self.config.blur_confirm_delay_ms);
    }

    /// Route a key pressed inside the editor. Returns true when handled.
    #[wasm_bindgen(js_name = "editKey")]
    pub fn edit_key(&self, key: &str) -> bool {
        let Some(key) = EditKey::from_key(key) else {
            return false;
        };
        if !self.editor.is_editing() {
            return false;
        }
        let work = self.editor.handle_key(key, self.navigation());
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(e) = work.await {
                log::warn!("edit key failed: {e}");
            }
        });
        true
    }

    /// `{ rowId, columnId }` of the open edit, or `null`.
    #[wasm_bindgen(js_name = "editingCell")]
    pub fn editing_cell(&self) -> JsValue {
        self.editor
            .editing_cell()
            .and_then(|cell| serde_wasm_bindgen::to_value(&cell).ok())
            .unwrap_or(JsValue::NULL)
    }

    #[wasm_bindgen(js_name = "onSelectionChange")]
    pub fn on_selection_change(&self, callback: Function) {
        self.controller.on_selection_change(move |selection| {
            match serde_wasm_bindgen::to_value(selection) {
                Ok(value) => {
                    if let Err(e) = callback.call1(&JsValue::NULL, &value) {
                        log::warn!("selection callback threw: {}", js_error_message(&e));
                    }
                }
                Err(e) => log::warn!("selection not serializable: {e}"),
            }
        });
    }

    /// `callback(cells | null)` when the copied marker appears or clears.
    #[wasm_bindgen(js_name = "onCopiedChange")]
    pub fn on_copied_change(&self, callback: Function) {
        self.controller.on_copied_change(move |copied| {
            let value = copied
                .and_then(|cells| serde_wasm_bindgen::to_value(cells).ok())
                .unwrap_or(JsValue::NULL);
            let _ = callback.call1(&JsValue::NULL, &value);
        });
    }

    /// `callback(rowId, columnId, value)`; may return a promise. Rejecting
    /// keeps the edit open.
    #[wasm_bindgen(js_name = "onCommit")]
    pub fn on_commit(&self, callback: Function) {
        self.callbacks.borrow_mut().on_commit = Some(callback);
    }

    /// `callback(direction, rowId, columnId)` after Enter/arrow commits.
    /// Without one, the editor moves through the current model.
    #[wasm_bindgen(js_name = "onNavigate")]
    pub fn on_navigate(&self, callback: Function) {
        self.callbacks.borrow_mut().on_navigate = Some(callback);
    }

    /// Remove listeners and cancel pending work. Safe to call twice.
    pub fn detach(&mut self) {
        for listener in self.listeners.drain(..) {
            listener.remove();
        }
        self.editor.dispose();
        self.controller.detach();
    }
}

impl CellGrid {
    fn attach(&mut self, surface: &HtmlElement) -> Result<(), GridError> {
        let window: EventTarget = web_sys::window()
            .ok_or_else(|| GridError::Dom("no window".to_string()))?
            .into();
        let target: &EventTarget = surface.as_ref();

        {
            let controller = self.controller.clone();
            let surface = surface.clone();
            self.listeners.push(Listener::add(target, "mousedown", false, move |event: MouseEvent| {
                let point = Point::new(f64::from(event.client_x()), f64::from(event.client_y()));
                let button = PointerButton::from_dom(event.button());
                if controller.pointer_down(point, button, modifiers_of_mouse(&event)) {
                    event.prevent_default();
                    let _ = surface.focus();
                }
            })?);
        }

        // Move and release are tracked on the window so a drag can leave the surface.
        {
            let controller = self.controller.clone();
            self.listeners.push(Listener::add(&window, "mousemove", true, move |event: MouseEvent| {
                if event.buttons() & 1 == 0 {
                    controller.pointer_up(None);
                    return;
                }
                controller.pointer_move(Point::new(
                    f64::from(event.client_x()),
                    f64::from(event.client_y()),
                ));
            })?);
        }
        {
            let controller = self.controller.clone();
            self.listeners.push(Listener::add(&window, "mouseup", true, move |event: MouseEvent| {
                controller.pointer_up(Some(Point::new(
                    f64::from(event.client_x()),
                    f64::from(event.client_y()),
                )));
            })?);
        }

        {
            let controller = self.controller.clone();
            self.listeners.push(Listener::add(target, "touchstart", false, move |event: TouchEvent| {
                let Some(point) = first_touch(&event) else {
                    return;
                };
                if controller.touch_start(point, touch_count(&event)) {
                    event.prevent_default();
                }
            })?);
        }
        {
            let controller = self.controller.clone();
            self.listeners.push(Listener::add(target, "touchmove", false, move |event: TouchEvent| {
                let Some(point) = first_touch(&event) else {
                    return;
                };
                if controller.touch_move(point, touch_count(&event)) {
                    event.prevent_default();
                }
            })?);
        }
        {
            let controller = self.controller.clone();
            self.listeners.push(Listener::add(target, "touchend", true, move |event: TouchEvent| {
                controller.touch_end(first_touch(&event));
            })?);
        }
        {
            let controller = self.controller.clone();
            self.listeners.push(Listener::add(target, "touchcancel", true, move |_event: TouchEvent| {
                controller.touch_cancel();
            })?);
        }

        {
            let controller = self.controller.clone();
            let editor = self.editor.clone();
            self.listeners.push(Listener::add(target, "keydown", false, move |event: KeyboardEvent| {
                // Keys typed into an open editor belong to the editor.
                if editor.is_editing() {
                    return;
                }
                let modifiers = Modifiers {
                    shift: event.shift_key(),
                    ctrl: event.ctrl_key(),
                    meta: event.meta_key(),
                    alt: event.alt_key(),
                };
                if controller.key_down(&event.key(), modifiers) {
                    event.prevent_default();
                }
            })?);
        }
        Ok(())
    }

    fn navigation(&self) -> Rc<dyn EditNavigation> {
        let callback = self.callbacks.borrow().on_navigate.clone();
        let Some(callback) = callback else {
            return Rc::new(ModelNavigator::new(
                Rc::clone(&self.model),
                self.editor.clone(),
            ));
        };
        Rc::new(move |direction: Direction, from: &CellRef| {
            let _ = callback.call3(
                &JsValue::NULL,
                &JsValue::from_str(direction_name(direction)),
                &JsValue::from_str(&from.row_id),
                &JsValue::from_str(&from.column_id),
            );
        })
    }
}

impl Drop for CellGrid {
    fn drop(&mut self) {
        self.detach();
    }
}

//! `requestAnimationFrame` / `setTimeout` backed scheduler.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;

use crate::scheduler::{LocalFuture, Scheduler, Task, TaskHandle};

#[derive(Clone, Copy)]
enum NativeId {
    Frame(i32),
    Timeout(i32),
}

#[derive(Default)]
struct Registry {
    live: HashMap<u64, (NativeId, Closure<dyn FnMut()>)>,
    /// Closures that already fired. They can't be freed from inside their
    /// own invocation, so they are dropped when the next callback runs.
    spent: Vec<Closure<dyn FnMut()>>,
}

/// Scheduler for the browser main thread.
pub struct BrowserScheduler {
    registry: Rc<RefCell<Registry>>,
    next_id: Cell<u64>,
}

impl BrowserScheduler {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            registry: Rc::new(RefCell::new(Registry::default())),
            next_id: Cell::new(0),
        })
    }

    fn wrap(registry: Weak<RefCell<Registry>>, id: u64, task: Task) -> Closure<dyn FnMut()> {
        let mut task = Some(task);
        Closure::wrap(Box::new(move || {
            if let Some(registry) = registry.upgrade() {
                let mut r = registry.borrow_mut();
                r.spent.clear();
                if let Some((_, closure)) = r.live.remove(&id) {
                    r.spent.push(closure);
                }
            }
            if let Some(task) = task.take() {
                task();
            }
        }) as Box<dyn FnMut()>)
    }

    fn schedule(&self, task: Task, delay_ms: Option<u32>) -> TaskHandle {
        let id = self.next_id.get().wrapping_add(1);
        self.next_id.set(id);
        let handle = TaskHandle(id);
        let Some(window) = web_sys::window() else {
            log::warn!("no window; task dropped");
            return handle;
        };

        let closure = Self::wrap(Rc::downgrade(&self.registry), id, task);
        let callback: &js_sys::Function = closure.as_ref().unchecked_ref();
        let native = match delay_ms {
            None => window.request_animation_frame(callback).map(NativeId::Frame),
            Some(delay) => window
                .set_timeout_with_callback_and_timeout_and_arguments_0(
                    callback,
                    i32::try_from(delay).unwrap_or(i32::MAX),
                )
                .map(NativeId::Timeout),
        };
        match native {
            Ok(native) => {
                self.registry.borrow_mut().live.insert(id, (native, closure));
            }
            Err(e) => log::warn!("scheduling failed: {}", crate::error::js_error_message(&e)),
        }
        handle
    }
}

impl Scheduler for BrowserScheduler {
    fn request_frame(&self, task: Task) -> TaskHandle {
        self.schedule(task, None)
    }

    fn set_timeout(&self, delay_ms: u32, task: Task) -> TaskHandle {
        self.schedule(task, Some(delay_ms))
    }

    fn cancel(&self, handle: TaskHandle) {
        let entry = self.registry.borrow_mut().live.remove(&handle.0);
        let Some((native, _closure)) = entry else {
            return;
        };
        let Some(window) = web_sys::window() else {
            return;
        };
        match native {
            NativeId::Frame(id) => {
                let _ = window.cancel_animation_frame(id);
            }
            NativeId::Timeout(id) => window.clear_timeout_with_handle(id),
        }
    }

    fn spawn_local(&self, future: LocalFuture<'static, ()>) {
        wasm_bindgen_futures::spawn_local(future);
    }
}

impl Drop for BrowserScheduler {
    fn drop(&mut self) {
        let ids: Vec<u64> = self.registry.borrow().live.keys().copied().collect();
        for id in ids {
            self.cancel(TaskHandle(id));
        }
    }
}

//! Frame, timer and future scheduling behind a trait.
//!
//! The engine never calls `requestAnimationFrame` or `setTimeout` directly.
//! In the browser it gets a `BrowserScheduler`; tests drive a
//! [`ManualScheduler`] one frame or one millisecond at a time.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Wake, Waker};

/// Boxed, non-`Send` future, as produced by host callbacks.
pub type LocalFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// One-shot task run by a scheduler.
pub type Task = Box<dyn FnOnce()>;

/// Opaque handle used to cancel a pending frame or timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(pub(crate) u64);

pub trait Scheduler {
    /// Run `task` before the next repaint.
    fn request_frame(&self, task: Task) -> TaskHandle;

    /// Run `task` after `delay_ms` milliseconds.
    fn set_timeout(&self, delay_ms: u32, task: Task) -> TaskHandle;

    /// Cancel a pending frame or timeout. Unknown or already-run handles are ignored.
    fn cancel(&self, handle: TaskHandle);

    /// Drive `future` to completion on the local event loop.
    fn spawn_local(&self, future: LocalFuture<'static, ()>);
}

struct LoopState {
    handle: Option<TaskHandle>,
    running: bool,
}

/// Cancellable repeating frame task.
///
/// `tick` runs once per frame until it returns `false` or [`FrameLoop::stop`]
/// is called. Stopping cancels the pending frame so no callback outlives the loop.
pub struct FrameLoop {
    scheduler: Rc<dyn Scheduler>,
    state: Rc<RefCell<LoopState>>,
}

impl FrameLoop {
    pub fn start(scheduler: Rc<dyn Scheduler>, tick: impl FnMut() -> bool + 'static) -> Self {
        let state = Rc::new(RefCell::new(LoopState {
            handle: None,
            running: true,
        }));
        let tick: Rc<RefCell<dyn FnMut() -> bool>> = Rc::new(RefCell::new(tick));
        Self::schedule(&scheduler, &state, tick);
        Self { scheduler, state }
    }

    fn schedule(
        scheduler: &Rc<dyn Scheduler>,
        state: &Rc<RefCell<LoopState>>,
        tick: Rc<RefCell<dyn FnMut() -> bool>>,
    ) {
        let weak_state = Rc::downgrade(state);
        let weak_scheduler = Rc::downgrade(scheduler);
        let handle = scheduler.request_frame(Box::new(move || {
            let Some(state) = weak_state.upgrade() else {
                return;
            };
            {
                let mut s = state.borrow_mut();
                s.handle = None;
                if !s.running {
                    return;
                }
            }
            // Borrow of the loop state is released: the tick may stop the loop.
            let keep_going = match tick.try_borrow_mut() {
                Ok(mut tick) => tick(),
                Err(_) => false,
            };
            let still_running = state.borrow().running;
            if keep_going && still_running {
                if let Some(scheduler) = weak_scheduler.upgrade() {
                    Self::schedule(&scheduler, &state, tick);
                    return;
                }
            }
            state.borrow_mut().running = false;
        }));
        state.borrow_mut().handle = Some(handle);
    }

    pub fn stop(&self) {
        let handle = {
            let mut s = self.state.borrow_mut();
            s.running = false;
            s.handle.take()
        };
        if let Some(handle) = handle {
            self.scheduler.cancel(handle);
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.borrow().running
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

struct NoopWake;

impl Wake for NoopWake {
    fn wake(self: Arc<Self>) {}
}

#[derive(Default)]
struct ManualInner {
    frames: Vec<(TaskHandle, Task)>,
    timers: Vec<(TaskHandle, u64, Task)>,
    futures: Vec<LocalFuture<'static, ()>>,
}

/// Deterministic scheduler for tests and headless hosts.
///
/// Nothing runs until the owner calls [`run_frame`](Self::run_frame),
/// [`advance`](Self::advance) or [`run_until_stalled`](Self::run_until_stalled).
#[derive(Default)]
pub struct ManualScheduler {
    inner: RefCell<ManualInner>,
    next_id: Cell<u64>,
    now_ms: Cell<u64>,
}

impl ManualScheduler {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    fn next_handle(&self) -> TaskHandle {
        let id = self.next_id.get().wrapping_add(1);
        self.next_id.set(id);
        TaskHandle(id)
    }

    /// Run every frame task queued before this call. Tasks queued while
    /// running wait for the next frame. Returns how many ran.
    pub fn run_frame(&self) -> usize {
        let frames = std::mem::take(&mut self.inner.borrow_mut().frames);
        let count = frames.len();
        for (_, task) in frames {
            task();
        }
        count
    }

    /// Run `n` frames back to back.
    pub fn run_frames(&self, n: usize) {
        for _ in 0..n {
            self.run_frame();
        }
    }

    /// Move the clock forward and fire every timer that comes due, in order.
    pub fn advance(&self, ms: u64) {
        let target = self.now_ms.get().saturating_add(ms);
        loop {
            let next = {
                let mut inner = self.inner.borrow_mut();
                let due = inner
                    .timers
                    .iter()
                    .enumerate()
                    .filter(|(_, (_, at, _))| *at <= target)
                    .min_by_key(|(_, (_, at, _))| *at)
                    .map(|(i, _)| i);
                due.map(|i| inner.timers.remove(i))
            };
            let Some((_, at, task)) = next else {
                break;
            };
            self.now_ms.set(at);
            task();
        }
        self.now_ms.set(target);
    }

    /// Poll spawned futures until none of them makes progress.
    pub fn run_until_stalled(&self) {
        let waker = Waker::from(Arc::new(NoopWake));
        let mut cx = Context::from_waker(&waker);
        loop {
            let futures = std::mem::take(&mut self.inner.borrow_mut().futures);
            if futures.is_empty() {
                break;
            }
            let before = futures.len();
            let mut pending = Vec::new();
            for mut fut in futures {
                if fut.as_mut().poll(&mut cx).is_pending() {
                    pending.push(fut);
                }
            }
            let mut inner = self.inner.borrow_mut();
            let spawned_meanwhile = !inner.futures.is_empty();
            let progressed = pending.len() < before || spawned_meanwhile;
            pending.append(&mut inner.futures);
            inner.futures = pending;
            if !progressed {
                break;
            }
        }
    }

    pub fn pending_frames(&self) -> usize {
        self.inner.borrow().frames.len()
    }

    pub fn pending_timers(&self) -> usize {
        self.inner.borrow().timers.len()
    }

    pub fn pending_futures(&self) -> usize {
        self.inner.borrow().futures.len()
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }
}

impl Scheduler for ManualScheduler {
    fn request_frame(&self, task: Task) -> TaskHandle {
        let handle = self.next_handle();
        self.inner.borrow_mut().frames.push((handle, task));
        handle
    }

    fn set_timeout(&self, delay_ms: u32, task: Task) -> TaskHandle {
        let handle = self.next_handle();
        let at = self.now_ms.get().saturating_add(u64::from(delay_ms));
        self.inner.borrow_mut().timers.push((handle, at, task));
        handle
    }

    fn cancel(&self, handle: TaskHandle) {
        let mut inner = self.inner.borrow_mut();
        inner.frames.retain(|(h, _)| *h != handle);
        inner.timers.retain(|(h, _, _)| *h != handle);
    }

    fn spawn_local(&self, future: LocalFuture<'static, ()>) {
        self.inner.borrow_mut().futures.push(future);
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

    #[test]
    fn test_frame_loop_runs_until_tick_returns_false() {
        let scheduler = ManualScheduler::new();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let frame_loop = FrameLoop::start(Rc::clone(&scheduler) as Rc<dyn Scheduler>, move || {
            c.set(c.get() + 1);
            c.get() < 3
        });
        scheduler.run_frames(5);
        assert_eq!(count.get(), 3);
        assert!(!frame_loop.is_running());
        assert_eq!(scheduler.pending_frames(), 0);
    }

    #[test]
    fn test_frame_loop_stop_cancels_pending_frame() {
        let scheduler = ManualScheduler::new();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let frame_loop = FrameLoop::start(Rc::clone(&scheduler) as Rc<dyn Scheduler>, move || {
            c.set(c.get() + 1);
            true
        });
        scheduler.run_frames(2);
        frame_loop.stop();
        assert_eq!(scheduler.pending_frames(), 0);
        scheduler.run_frames(2);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_dropping_frame_loop_stops_it() {
        let scheduler = ManualScheduler::new();
        let frame_loop = FrameLoop::start(Rc::clone(&scheduler) as Rc<dyn Scheduler>, || true);
        assert_eq!(scheduler.pending_frames(), 1);
        drop(frame_loop);
        assert_eq!(scheduler.pending_frames(), 0);
    }

    #[test]
    fn test_timers_fire_in_due_order_and_cancel() {
        let scheduler = ManualScheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let l1 = Rc::clone(&log);
        let l2 = Rc::clone(&log);
        let l3 = Rc::clone(&log);
        scheduler.set_timeout(20, Box::new(move || l1.borrow_mut().push("late")));
        scheduler.set_timeout(10, Box::new(move || l2.borrow_mut().push("early")));
        let cancelled = scheduler.set_timeout(5, Box::new(move || l3.borrow_mut().push("never")));
        scheduler.cancel(cancelled);
        scheduler.advance(15);
        assert_eq!(*log.borrow(), vec!["early"]);
        scheduler.advance(5);
        assert_eq!(*log.borrow(), vec!["early", "late"]);
        assert_eq!(scheduler.now_ms(), 20);
    }

    #[test]
    fn test_spawned_futures_run_until_stalled() {
        let scheduler = ManualScheduler::new();
        let done = Rc::new(Cell::new(false));
        let d = Rc::clone(&done);
        scheduler.spawn_local(Box::pin(async move { d.set(true) }));
        scheduler.run_until_stalled();
        assert!(done.get());
        assert_eq!(scheduler.pending_futures(), 0);
    }
}

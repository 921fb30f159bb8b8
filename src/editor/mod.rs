//! Single-cell inline editing.
//!
//! `InlineEditor` tracks which cell (if any) is being edited and its draft
//! text. It knows nothing about grid layout: keyboard navigation is handed
//! to an [`EditNavigation`] supplied by the caller, which decides what the
//! next cell is and starts editing it.
//!
//! States are `Idle` and `Editing`. Confirm is asynchronous; a second confirm
//! for the same edit while the first is outstanding is dropped, and a failed
//! commit leaves the cell in `Editing` with the draft intact.

mod navigation;

pub use navigation::{EditNavigation, ModelNavigator};

use std::cell::RefCell;
use std::future::Future;
use std::rc::{Rc, Weak};

use crate::error::{CommitError, GridError, Result};
use crate::scheduler::{LocalFuture, Scheduler, TaskHandle};
use crate::types::{CellRef, Direction};

/// Host callback that persists a confirmed value. Rejecting keeps the edit open.
pub type CommitFn =
    Rc<dyn Fn(CellRef, String) -> LocalFuture<'static, std::result::Result<(), CommitError>>>;

/// Wrap an async closure as a [`CommitFn`].
pub fn commit_fn<F, Fut>(f: F) -> CommitFn
where
    F: Fn(CellRef, String) -> Fut + 'static,
    Fut: Future<Output = std::result::Result<(), CommitError>> + 'static,
{
    Rc::new(move |cell, value| Box::pin(f(cell, value)))
}

/// Snapshot of the editor state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditState {
    Idle,
    Editing { cell: CellRef, draft: String },
}

/// What a confirm or routed key did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// The commit callback accepted the value for this cell.
    Committed(CellRef),
    /// Nothing was being edited.
    NotEditing,
    /// A confirm for this edit is already outstanding; this one was dropped.
    InFlight,
    /// The edit was cancelled.
    Cancelled,
}

/// Keys the editor reacts to while a cell is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKey {
    Enter,
    Tab,
    Escape,
    Arrow(Direction),
}

impl EditKey {
    /// Map a `KeyboardEvent.key` value.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "Enter" => Some(Self::Enter),
            "Tab" => Some(Self::Tab),
            "Escape" | "Esc" => Some(Self::Escape),
            other => Direction::from_key(other).map(Self::Arrow),
        }
    }
}

#[derive(Default)]
struct EditorInner {
    editing: Option<(CellRef, String)>,
    /// Bumped on every start and cancel; stale confirms and blurs compare against it.
    generation: u64,
    /// Generation of the edit whose confirm is outstanding.
    in_flight: Option<u64>,
    blur_timer: Option<TaskHandle>,
}

/// Clears the in-flight mark when a confirm future finishes or is dropped.
struct InFlightGuard {
    inner: Weak<RefCell<EditorInner>>,
    generation: u64,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            if let Ok(mut s) = inner.try_borrow_mut() {
                if s.in_flight == Some(self.generation) {
                    s.in_flight = None;
                }
            }
        }
    }
}

/// Cheap handle; clones share the same edit state.
#[derive(Clone)]
pub struct InlineEditor {
    inner: Rc<RefCell<EditorInner>>,
    commit: CommitFn,
    scheduler: Rc<dyn Scheduler>,
}

impl InlineEditor {
    pub fn new(commit: CommitFn, scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(EditorInner::default())),
            commit,
            scheduler,
        }
    }

    pub fn state(&self) -> EditState {
        match &self.inner.borrow().editing {
            Some((cell, draft)) => EditState::Editing {
                cell: cell.clone(),
                draft: draft.clone(),
            },
            None => EditState::Idle,
        }
    }

    pub fn is_editing(&self) -> bool {
        self.inner.borrow().editing.is_some()
    }

    pub fn editing_cell(&self) -> Option<CellRef> {
        self.inner.borrow().editing.as_ref().map(|(c, _)| c.clone())
    }

    pub fn draft(&self) -> Option<String> {
        self.inner.borrow().editing.as_ref().map(|(_, d)| d.clone())
    }

    /// True while a confirm for the current edit is outstanding.
    pub fn is_confirming(&self) -> bool {
        let s = self.inner.borrow();
        s.editing.is_some() && s.in_flight == Some(s.generation)
    }

    fn cancel_blur_timer(&self, s: &mut EditorInner) {
        if let Some(handle) = s.blur_timer.take() {
            self.scheduler.cancel(handle);
        }
    }

    /// Open `cell` for editing. Any other open edit is abandoned without
    /// committing. Missing or empty initial values become an empty draft.
    pub fn start_editing(&self, cell: CellRef, initial: Option<&str>) {
        let mut s = self.inner.borrow_mut();
        self.cancel_blur_timer(&mut s);
        if let Some((prev, _)) = &s.editing {
            log::debug!("abandoning edit of {}/{}", prev.row_id, prev.column_id);
        }
        s.generation = s.generation.wrapping_add(1);
        log::debug!("editing {}/{}", cell.row_id, cell.column_id);
        s.editing = Some((cell, initial.unwrap_or_default().to_string()));
    }

    /// Replace the draft text. No effect when idle.
    pub fn update_draft(&self, text: impl Into<String>) {
        if let Some((_, draft)) = self.inner.borrow_mut().editing.as_mut() {
            *draft = text.into();
        }
    }

    /// Discard the draft and go idle without committing. No-op when idle.
    pub fn cancel(&self) {
        let mut s = self.inner.borrow_mut();
        self.cancel_blur_timer(&mut s);
        if s.editing.take().is_some() {
            s.generation = s.generation.wrapping_add(1);
            log::debug!("edit cancelled");
        }
    }

    /// Commit the trimmed draft through the commit callback.
    ///
    /// The callback is invoked before this returns, so it runs exactly once
    /// per accepted confirm even if the returned future is never polled.
    /// On success the editor goes idle, unless a different edit was started
    /// in the meantime. On failure the edit stays open with its draft.
    pub fn confirm(&self) -> LocalFuture<'static, Result<EditOutcome>> {
        let begun = {
            let mut guard = self.inner.borrow_mut();
            let s = &mut *guard;
            self.cancel_blur_timer(s);
            let generation = s.generation;
            let in_flight = s.in_flight == Some(generation);
            match &s.editing {
                None => Err(EditOutcome::NotEditing),
                Some(_) if in_flight => Err(EditOutcome::InFlight),
                Some((cell, draft)) => {
                    let begun = (cell.clone(), draft.trim().to_string(), generation);
                    s.in_flight = Some(generation);
                    Ok(begun)
                }
            }
        };

        let (cell, value, generation) = match begun {
            Ok(begun) => begun,
            Err(outcome) => {
                if outcome == EditOutcome::InFlight {
                    log::debug!("confirm already in flight; ignoring");
                }
                return Box::pin(async move { Ok(outcome) });
            }
        };

        let guard = InFlightGuard {
            inner: Rc::downgrade(&self.inner),
            generation,
        };
        let pending = (self.commit)(cell.clone(), value);
        let inner = Rc::clone(&self.inner);
        Box::pin(async move {
            let result = pending.await;
            drop(guard);
            match result {
                Ok(()) => {
                    let mut s = inner.borrow_mut();
                    if s.generation == generation {
                        s.editing = None;
                        s.generation = s.generation.wrapping_add(1);
                    }
                    Ok(EditOutcome::Committed(cell))
                }
                Err(source) => {
                    log::warn!(
                        "commit failed for {}/{}: {}",
                        cell.row_id,
                        cell.column_id,
                        source
                    );
                    Err(GridError::Commit {
                        row_id: cell.row_id,
                        column_id: cell.column_id,
                        source,
                    })
                }
            }
        })
    }

    /// Focus left the editor: confirm, after `delay_ms` if non-zero.
    ///
    /// The delayed confirm is dropped if the edit is cancelled, replaced or
    /// disposed first. Failures are logged; the edit stays open.
    pub fn blur(&self, delay_ms: u32) {
        let generation = {
            let mut s = self.inner.borrow_mut();
            if s.editing.is_none() {
                return;
            }
            self.cancel_blur_timer(&mut s);
            s.generation
        };
        if delay_ms == 0 {
            self.spawn_confirm();
            return;
        }
        let weak = self.downgrade();
        let handle = self.scheduler.set_timeout(
            delay_ms,
            Box::new(move || {
                let Some(editor) = weak.upgrade() else {
                    return;
                };
                let current = {
                    let mut s = editor.inner.borrow_mut();
                    s.blur_timer = None;
                    s.editing.is_some() && s.generation == generation
                };
                if current {
                    editor.spawn_confirm();
                }
            }),
        );
        self.inner.borrow_mut().blur_timer = Some(handle);
    }

    fn spawn_confirm(&self) {
        let confirm = self.confirm();
        self.scheduler.spawn_local(Box::pin(async move {
            if let Err(e) = confirm.await {
                log::warn!("blur confirm failed: {e}");
            }
        }));
    }

    /// Route a key pressed inside the editor.
    ///
    /// Enter confirms and then asks `nav` for the next row in the same
    /// column; arrows confirm and then navigate in their direction; Tab only
    /// confirms; Escape cancels. Navigation receives the cell that was being
    /// edited and only happens after a successful commit.
    pub fn handle_key(
        &self,
        key: EditKey,
        nav: Rc<dyn EditNavigation>,
    ) -> LocalFuture<'static, Result<EditOutcome>> {
        let direction = match key {
            EditKey::Escape => {
                let was_editing = self.is_editing();
                self.cancel();
                let outcome = if was_editing {
                    EditOutcome::Cancelled
                } else {
                    EditOutcome::NotEditing
                };
                return Box::pin(async move { Ok(outcome) });
            }
            EditKey::Tab => return self.confirm(),
            EditKey::Enter => Direction::Down,
            EditKey::Arrow(direction) => direction,
        };
        let confirm = self.confirm();
        Box::pin(async move {
            let outcome = confirm.await?;
            if let EditOutcome::Committed(cell) = &outcome {
                nav.navigate(direction, cell);
            }
            Ok(outcome)
        })
    }

    /// Cancel any pending delayed blur. Call when the owning surface is torn down.
    pub fn dispose(&self) {
        let mut s = self.inner.borrow_mut();
        self.cancel_blur_timer(&mut s);
    }

    fn downgrade(&self) -> WeakEditor {
        WeakEditor {
            inner: Rc::downgrade(&self.inner),
            commit: Rc::clone(&self.commit),
            scheduler: Rc::clone(&self.scheduler),
        }
    }
}

struct WeakEditor {
    inner: Weak<RefCell<EditorInner>>,
    commit: CommitFn,
    scheduler: Rc<dyn Scheduler>,
}

impl WeakEditor {
    fn upgrade(&self) -> Option<InlineEditor> {
        Some(InlineEditor {
            inner: self.inner.upgrade()?,
            commit: Rc::clone(&self.commit),
            scheduler: Rc::clone(&self.scheduler),
        })
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
    use crate::scheduler::ManualScheduler;
    use std::cell::Cell;

    fn ok_commit(calls: Rc<RefCell<Vec<(CellRef, String)>>>) -> CommitFn {
        commit_fn(move |cell, value| {
            calls.borrow_mut().push((cell, value));
            async { Ok(()) }
        })
    }

    #[test]
    fn test_start_normalizes_missing_initial_value() {
        let scheduler = ManualScheduler::new();
        let editor = InlineEditor::new(ok_commit(Rc::default()), scheduler);
        editor.start_editing(CellRef::new("r1", "name"), None);
        assert_eq!(
            editor.state(),
            EditState::Editing {
                cell: CellRef::new("r1", "name"),
                draft: String::new()
            }
        );
    }

    #[test]
    fn test_confirm_sends_trimmed_draft() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let editor = InlineEditor::new(ok_commit(Rc::clone(&calls)), ManualScheduler::new());
        editor.start_editing(CellRef::new("r1", "name"), Some("Ann"));
        editor.update_draft("  Anna \n");
        let outcome = pollster::block_on(editor.confirm()).unwrap();
        assert_eq!(outcome, EditOutcome::Committed(CellRef::new("r1", "name")));
        assert_eq!(calls.borrow()[0].1, "Anna");
        assert_eq!(editor.state(), EditState::Idle);
    }

    #[test]
    fn test_new_start_abandons_previous_draft() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let editor = InlineEditor::new(ok_commit(Rc::clone(&calls)), ManualScheduler::new());
        editor.start_editing(CellRef::new("r1", "a"), Some("x"));
        editor.update_draft("changed");
        editor.start_editing(CellRef::new("r2", "a"), Some("y"));
        assert!(calls.borrow().is_empty());
        assert_eq!(editor.draft().as_deref(), Some("y"));
    }

    #[test]
    fn test_delayed_blur_dropped_after_cancel() {
        let scheduler = ManualScheduler::new();
        let calls = Rc::new(RefCell::new(Vec::new()));
        let editor = InlineEditor::new(ok_commit(Rc::clone(&calls)), scheduler.clone());
        editor.start_editing(CellRef::new("r1", "a"), Some("x"));
        editor.blur(100);
        editor.cancel();
        scheduler.advance(200);
        scheduler.run_until_stalled();
        assert!(calls.borrow().is_empty());
        assert_eq!(scheduler.pending_timers(), 0);
    }

    #[test]
    fn test_delayed_blur_dropped_after_new_start() {
        let scheduler = ManualScheduler::new();
        let calls = Rc::new(RefCell::new(Vec::new()));
        let editor = InlineEditor::new(ok_commit(Rc::clone(&calls)), scheduler.clone());
        editor.start_editing(CellRef::new("r1", "a"), Some("x"));
        editor.blur(50);
        editor.start_editing(CellRef::new("r2", "a"), Some("y"));
        scheduler.advance(100);
        scheduler.run_until_stalled();
        assert!(calls.borrow().is_empty());
        assert!(editor.is_editing());
    }

    #[test]
    fn test_delayed_blur_confirms() {
        let scheduler = ManualScheduler::new();
        let calls = Rc::new(RefCell::new(Vec::new()));
        let editor = InlineEditor::new(ok_commit(Rc::clone(&calls)), scheduler.clone());
        editor.start_editing(CellRef::new("r1", "a"), Some("x"));
        editor.blur(50);
        scheduler.advance(49);
        assert!(calls.borrow().is_empty());
        scheduler.advance(1);
        scheduler.run_until_stalled();
        assert_eq!(calls.borrow().len(), 1);
        assert_eq!(editor.state(), EditState::Idle);
    }

    #[test]
    fn test_escape_cancels_without_commit() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let editor = InlineEditor::new(ok_commit(Rc::clone(&calls)), ManualScheduler::new());
        let moved = Rc::new(Cell::new(false));
        let m = Rc::clone(&moved);
        let nav: Rc<dyn EditNavigation> = Rc::new(move |_: Direction, _: &CellRef| m.set(true));
        editor.start_editing(CellRef::new("r1", "a"), Some("x"));
        let outcome = pollster::block_on(editor.handle_key(EditKey::Escape, nav)).unwrap();
        assert_eq!(outcome, EditOutcome::Cancelled);
        assert!(calls.borrow().is_empty());
        assert!(!moved.get());
    }

    #[test]
    fn test_edit_key_parsing() {
        assert_eq!(EditKey::from_key("Enter"), Some(EditKey::Enter));
        assert_eq!(EditKey::from_key("ArrowLeft"), Some(EditKey::Arrow(Direction::Left)));
        assert_eq!(EditKey::from_key("a"), None);
    }
}

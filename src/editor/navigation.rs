//! Where the editor goes after Enter or an arrow key.

use super::InlineEditor;
use crate::model::SharedModel;
use crate::types::{CellRef, Direction};

/// Directional navigation requested by the editor after a successful commit.
///
/// `from` is the cell that was being edited before the step. Implementations
/// bounds-check and, if there is a destination, start editing it.
pub trait EditNavigation {
    fn navigate(&self, direction: Direction, from: &CellRef);
}

impl<F> EditNavigation for F
where
    F: Fn(Direction, &CellRef),
{
    fn navigate(&self, direction: Direction, from: &CellRef) {
        self(direction, from)
    }
}

/// Navigation over the live row/column model.
///
/// Reads the model when a step happens, so a re-sort or a column hidden
/// while editing is respected. Steps off the grid are no-ops.
pub struct ModelNavigator {
    model: SharedModel,
    editor: InlineEditor,
}

impl ModelNavigator {
    pub fn new(model: SharedModel, editor: InlineEditor) -> Self {
        Self { model, editor }
    }

    /// Destination of one step from `from`, if it exists.
    pub fn destination(&self, direction: Direction, from: &CellRef) -> Option<(CellRef, String)> {
        let model = self.model.borrow();
        let coord = model.coord_of(from)?;
        let next = coord.step(direction, model.row_count(), model.column_count())?;
        let cell = model.cell_at(next)?;
        let text = model.text(&cell.row_id, &cell.column_id);
        Some((cell, text))
    }
}

impl EditNavigation for ModelNavigator {
    fn navigate(&self, direction: Direction, from: &CellRef) {
        let Some((cell, text)) = self.destination(direction, from) else {
            log::debug!("no cell {direction:?} of {}/{}", from.row_id, from.column_id);
            return;
        };
        self.editor.start_editing(cell, Some(&text));
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
    use crate::editor::{commit_fn, EditKey, EditOutcome, EditState};
    use crate::model::{GridModel, RowRecord};
    use crate::scheduler::ManualScheduler;
    use serde_json::json;
    use std::rc::Rc;

    fn model() -> SharedModel {
        let mut model = GridModel::new(
            vec!["r1".into(), "r2".into()],
            vec!["name".into(), "city".into()],
        );
        let mut r2 = RowRecord::new();
        r2.insert("name".into(), json!("Bo"));
        model.records.insert("r2".into(), r2);
        model.shared()
    }

    fn editor() -> InlineEditor {
        InlineEditor::new(
            commit_fn(|_, _| async { Ok(()) }),
            ManualScheduler::new(),
        )
    }

    #[test]
    fn test_enter_moves_to_next_row_same_column() {
        let model = model();
        let editor = editor();
        let nav = Rc::new(ModelNavigator::new(Rc::clone(&model), editor.clone()));
        editor.start_editing(CellRef::new("r1", "name"), Some("Ann"));
        let outcome = pollster::block_on(editor.handle_key(EditKey::Enter, nav)).unwrap();
        assert_eq!(outcome, EditOutcome::Committed(CellRef::new("r1", "name")));
        assert_eq!(
            editor.state(),
            EditState::Editing {
                cell: CellRef::new("r2", "name"),
                draft: "Bo".into()
            }
        );
    }

    #[test]
    fn test_step_off_grid_is_noop() {
        let model = model();
        let editor = editor();
        let nav = Rc::new(ModelNavigator::new(Rc::clone(&model), editor.clone()));
        editor.start_editing(CellRef::new("r2", "city"), None);
        pollster::block_on(editor.handle_key(EditKey::Arrow(Direction::Right), nav)).unwrap();
        assert_eq!(editor.state(), EditState::Idle);
    }

    #[test]
    fn test_navigation_reads_current_column_order() {
        let model = model();
        let editor = editor();
        let nav = Rc::new(ModelNavigator::new(Rc::clone(&model), editor.clone()));
        editor.start_editing(CellRef::new("r1", "city"), None);
        model.borrow_mut().columns.reverse();
        pollster::block_on(editor.handle_key(EditKey::Arrow(Direction::Right), nav)).unwrap();
        assert_eq!(editor.editing_cell(), Some(CellRef::new("r1", "name")));
    }
}

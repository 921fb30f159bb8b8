//! Arrow-key navigation, including Ctrl/Cmd jumps across data regions.

use super::{rect_selection, SelectionEngine};
use crate::model::GridModel;
use crate::types::{Coord, Direction, Modifiers, SelectionSet};

/// Where a Ctrl/Cmd+Arrow jump from `from` lands.
///
/// From an empty cell the walk crosses empty cells and lands on the first
/// non-empty one, or on the last in-bounds cell. From a non-empty cell it
/// crosses non-empty cells and stops on the last one before a gap or the
/// boundary. If the first step already leaves the grid, `from` is returned.
pub fn jump_target(model: &GridModel, from: Coord, direction: Direction) -> Coord {
    let (rows, cols) = (model.row_count(), model.column_count());
    let Some(mut current) = from.step(direction, rows, cols) else {
        return from;
    };

    if model.is_empty_at(from) {
        loop {
            if !model.is_empty_at(current) {
                return current;
            }
            match current.step(direction, rows, cols) {
                Some(next) => current = next,
                None => return current,
            }
        }
    }

    let mut last = from;
    loop {
        if model.is_empty_at(current) {
            return last;
        }
        last = current;
        match current.step(direction, rows, cols) {
            Some(next) => current = next,
            None => return last,
        }
    }
}

impl SelectionEngine {
    /// Handle an arrow key. Needs an existing focus; without one this is a no-op.
    ///
    /// - plain: move focus one cell (clamped) and select just that cell
    /// - Shift: keep the anchor, move focus, select the anchor/focus rectangle
    /// - Ctrl/Cmd: jump focus with [`jump_target`] and select that cell
    /// - Ctrl/Cmd+Shift: jump focus, then extend the selected rectangle one
    ///   cell past the jump target when that cell is in bounds
    ///
    /// Returns whether the selected set changed.
    pub fn navigate(&mut self, direction: Direction, modifiers: Modifiers, model: &GridModel) -> bool {
        let Some(focus) = self.range.focus else {
            return false;
        };
        let (rows, cols) = (model.row_count(), model.column_count());
        if focus.row_index >= rows || focus.col_index >= cols {
            return false;
        }

        let target = if modifiers.command() {
            jump_target(model, focus, direction)
        } else {
            focus.step_clamped(direction, rows, cols)
        };

        if !modifiers.shift {
            self.set_range(model, Some(target), Some(target));
            let next = model
                .cell_at(target)
                .map(SelectionSet::single)
                .unwrap_or_default();
            return self.set_selection(next);
        }

        let anchor = self.range.anchor.unwrap_or(focus);
        self.set_range(model, Some(anchor), Some(target));
        let range_end = if modifiers.command() {
            // Shift+Ctrl/Cmd jumps reach one cell beyond the landing cell.
            target.step(direction, rows, cols).unwrap_or(target)
        } else {
            target
        };
        self.set_selection(rect_selection(model, anchor, range_end))
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
    use crate::model::RowRecord;
    use crate::types::{AnchorFocus, CellRef};
    use serde_json::{json, Value};
    use test_case::test_case;

    /// Single-column model "v" whose rows hold `values` (None = missing).
    fn column(values: &[Option<&str>]) -> GridModel {
        let mut model = GridModel::new(
            (0..values.len()).map(|r| format!("r{r}")).collect(),
            vec!["v".into()],
        );
        for (i, v) in values.iter().enumerate() {
            let mut record = RowRecord::new();
            if let Some(v) = v {
                record.insert("v".into(), Value::String((*v).to_string()));
            }
            model.records.insert(format!("r{i}"), record);
        }
        model
    }

    #[test_case(&[None, None, Some("x"), None], 0, 2; "empty start lands on first value")]
    #[test_case(&[Some("a"), Some("b"), None, Some("c")], 0, 1; "value start stops before gap")]
    #[test_case(&[None, None, None], 0, 2; "all empty runs to boundary")]
    #[test_case(&[Some("a"), Some("b"), Some("c")], 0, 2; "all values runs to boundary")]
    #[test_case(&[Some("a"), None, Some("b")], 2, 2; "first step out of bounds stays")]
    #[test_case(&[Some("a"), Some(""), Some("b")], 0, 0; "empty string counts as gap")]
    fn test_jump_down(values: &[Option<&str>], from: usize, expected: usize) {
        let model = column(values);
        let target = jump_target(&model, Coord::new(from, 0), Direction::Down);
        assert_eq!(target, Coord::new(expected, 0));
    }

    #[test]
    fn test_jump_up_over_null_values() {
        let mut model = column(&[Some("a"), None, None, None]);
        let mut record = RowRecord::new();
        record.insert("v".into(), json!(null));
        model.records.insert("r2".into(), record);
        assert_eq!(jump_target(&model, Coord::new(3, 0), Direction::Up), Coord::new(0, 0));
    }

    fn grid(rows: usize, cols: usize) -> GridModel {
        GridModel::new(
            (0..rows).map(|r| format!("r{r}")).collect(),
            (0..cols).map(|c| format!("c{c}")).collect(),
        )
    }

    #[test]
    fn test_arrow_without_focus_is_noop() {
        let model = grid(3, 3);
        let mut engine = SelectionEngine::new();
        assert!(!engine.navigate(Direction::Down, Modifiers::NONE, &model));
        assert_eq!(engine.anchor_focus(), AnchorFocus::default());
    }

    #[test]
    fn test_plain_arrow_moves_and_clamps() {
        let model = grid(3, 3);
        let mut engine = SelectionEngine::new();
        engine.select_cell(&model, &CellRef::new("r0", "c0"));
        assert!(engine.navigate(Direction::Right, Modifiers::NONE, &model));
        assert_eq!(engine.anchor_focus(), AnchorFocus::at(Coord::new(0, 1)));
        assert!(!engine.navigate(Direction::Up, Modifiers::NONE, &model));
        assert_eq!(engine.selection().as_slice(), &[CellRef::new("r0", "c1")]);
    }

    #[test]
    fn test_shift_arrow_extends_rectangle() {
        let model = grid(4, 4);
        let mut engine = SelectionEngine::new();
        engine.select_cell(&model, &CellRef::new("r1", "c1"));
        engine.navigate(Direction::Down, Modifiers::shift(), &model);
        engine.navigate(Direction::Left, Modifiers::shift(), &model);
        let af = engine.anchor_focus();
        assert_eq!(af.anchor, Some(Coord::new(1, 1)));
        assert_eq!(af.focus, Some(Coord::new(2, 0)));
        assert_eq!(engine.selection().len(), 4);
        assert!(engine.selection().contains(&CellRef::new("r1", "c0")));
    }

    #[test]
    fn test_ctrl_shift_jump_extends_one_past_target() {
        let model = column(&[Some("a"), Some("b"), None, None, Some("c")]);
        let mut engine = SelectionEngine::new();
        engine.select_cell(&model, &CellRef::new("r0", "v"));
        engine.navigate(Direction::Down, Modifiers::ctrl_shift(), &model);
        assert_eq!(engine.anchor_focus().focus, Some(Coord::new(1, 0)));
        assert_eq!(engine.selection().len(), 3);
        assert!(engine.selection().contains(&CellRef::new("r2", "v")));
    }

    #[test]
    fn test_ctrl_jump_collapses_to_single_cell() {
        let model = column(&[None, None, Some("x"), None]);
        let mut engine = SelectionEngine::new();
        engine.select_cell(&model, &CellRef::new("r0", "v"));
        assert!(engine.navigate(Direction::Down, Modifiers::ctrl(), &model));
        assert_eq!(engine.anchor_focus(), AnchorFocus::at(Coord::new(2, 0)));
        assert_eq!(engine.selection().as_slice(), &[CellRef::new("r2", "v")]);
    }
}

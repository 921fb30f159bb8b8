use serde::{Deserialize, Serialize};

/// Logical identity of a cell, independent of where it is drawn.
///
/// Row and column ids survive sorting and re-rendering; screen position does not.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellRef {
    pub row_id: String,
    pub column_id: String,
}

impl CellRef {
    pub fn new(row_id: impl Into<String>, column_id: impl Into<String>) -> Self {
        Self {
            row_id: row_id.into(),
            column_id: column_id.into(),
        }
    }
}

/// Visual position of a cell (0-indexed) in the current row/column order.
///
/// Only valid for the model it was computed against; recompute after any
/// sort, filter or column change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coord {
    pub row_index: usize,
    pub col_index: usize,
}

impl Coord {
    pub fn new(row_index: usize, col_index: usize) -> Self {
        Self {
            row_index,
            col_index,
        }
    }

    /// Step one cell in `direction`, returning `None` when the step leaves
    /// a grid of `rows` x `cols`.
    pub fn step(self, direction: Direction, rows: usize, cols: usize) -> Option<Coord> {
        let (row, col) = (self.row_index, self.col_index);
        let (row, col) = match direction {
            Direction::Up => (row.checked_sub(1)?, col),
            Direction::Down => (row.checked_add(1)?, col),
            Direction::Left => (row, col.checked_sub(1)?),
            Direction::Right => (row, col.checked_add(1)?),
        };
        (row < rows && col < cols).then_some(Coord::new(row, col))
    }

    /// Step one cell in `direction`, staying on the boundary when the step
    /// would leave the grid.
    pub fn step_clamped(self, direction: Direction, rows: usize, cols: usize) -> Coord {
        self.step(direction, rows, cols).unwrap_or(self)
    }
}

/// One of the four arrow directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Map a `KeyboardEvent.key` value to a direction.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "ArrowUp" => Some(Self::Up),
            "ArrowDown" => Some(Self::Down),
            "ArrowLeft" => Some(Self::Left),
            "ArrowRight" => Some(Self::Right),
            _ => None,
        }
    }
}

use std::collections::HashSet;

use serde::{Serialize, Serializer};

use super::{CellRef, Coord};

/// Unordered collection of unique selected cells.
///
/// Insertion order is kept for iteration (box selection yields geometry order),
/// but equality ignores it: two sets are equal when they hold the same cells.
#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    cells: Vec<CellRef>,
    index: HashSet<CellRef>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(cell: CellRef) -> Self {
        let mut set = Self::new();
        set.insert(cell);
        set
    }

    /// Returns false if the cell was already present.
    pub fn insert(&mut self, cell: CellRef) -> bool {
        if self.index.contains(&cell) {
            return false;
        }
        self.index.insert(cell.clone());
        self.cells.push(cell);
        true
    }

    pub fn contains(&self, cell: &CellRef) -> bool {
        self.index.contains(cell)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CellRef> {
        self.cells.iter()
    }

    pub fn as_slice(&self) -> &[CellRef] {
        &self.cells
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.index.clear();
    }

    /// Keep only the cells for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&CellRef) -> bool) {
        let index = &mut self.index;
        self.cells.retain(|cell| {
            let kept = keep(cell);
            if !kept {
                index.remove(cell);
            }
            kept
        });
    }
}

impl PartialEq for SelectionSet {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl Eq for SelectionSet {}

impl FromIterator<CellRef> for SelectionSet {
    fn from_iter<I: IntoIterator<Item = CellRef>>(iter: I) -> Self {
        let mut set = Self::new();
        for cell in iter {
            set.insert(cell);
        }
        set
    }
}

impl<'a> IntoIterator for &'a SelectionSet {
    type Item = &'a CellRef;
    type IntoIter = std::slice::Iter<'a, CellRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.cells.iter()
    }
}

impl Serialize for SelectionSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.cells.serialize(serializer)
    }
}

/// Start and active end of the last range gesture.
///
/// Both are `None` when nothing is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnchorFocus {
    pub anchor: Option<Coord>,
    pub focus: Option<Coord>,
}

impl AnchorFocus {
    pub fn at(coord: Coord) -> Self {
        Self {
            anchor: Some(coord),
            focus: Some(coord),
        }
    }

    pub fn clear(&mut self) {
        self.anchor = None;
        self.focus = None;
    }
}

/// Echo of the last successful copy, kept only to drive the "copied" flash.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopiedSet {
    cells: Option<SelectionSet>,
}

impl CopiedSet {
    pub fn set(&mut self, cells: SelectionSet) {
        self.cells = Some(cells);
    }

    pub fn clear(&mut self) {
        self.cells = None;
    }

    pub fn get(&self) -> Option<&SelectionSet> {
        self.cells.as_ref()
    }
}

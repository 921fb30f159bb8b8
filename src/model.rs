//! Row/column model the engine reads at call time.
//!
//! The host owns the visible row order, the visible column order and the row
//! records. The engine never snapshots them: every transition takes the model
//! as a parameter or reads it through a [`SharedModel`] when it runs.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::Deserialize;
use serde_json::Value;

use crate::types::{CellRef, Coord};

/// One row's full data record, keyed by column id.
pub type RowRecord = serde_json::Map<String, Value>;

/// Model handle shared between the host and the engine's callbacks.
pub type SharedModel = Rc<RefCell<GridModel>>;

/// Anything that can resolve a row id to its record.
pub trait RowLookup {
    fn record(&self, row_id: &str) -> Option<&RowRecord>;
}

impl RowLookup for HashMap<String, RowRecord> {
    fn record(&self, row_id: &str) -> Option<&RowRecord> {
        self.get(row_id)
    }
}

/// Visible rows and columns in display order plus the row records.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GridModel {
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    pub records: HashMap<String, RowRecord>,
}

impl GridModel {
    pub fn new(rows: Vec<String>, columns: Vec<String>) -> Self {
        Self {
            rows,
            columns,
            records: HashMap::new(),
        }
    }

    /// Build a model from records in display order, taking each row id from
    /// `id_field`. Records without a string or numeric id are skipped.
    pub fn from_records(id_field: &str, columns: Vec<String>, records: Vec<RowRecord>) -> Self {
        let mut model = Self::new(Vec::with_capacity(records.len()), columns);
        for record in records {
            let Some(id) = record.get(id_field).map(display_value) else {
                continue;
            };
            if id.is_empty() {
                continue;
            }
            model.rows.push(id.clone());
            model.records.insert(id, record);
        }
        model
    }

    pub fn with_record(mut self, row_id: impl Into<String>, record: RowRecord) -> Self {
        self.records.insert(row_id.into(), record);
        self
    }

    pub fn shared(self) -> SharedModel {
        Rc::new(RefCell::new(self))
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }

    pub fn row_index(&self, row_id: &str) -> Option<usize> {
        self.rows.iter().position(|r| r == row_id)
    }

    pub fn column_index(&self, column_id: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column_id)
    }

    /// Visual position of a cell, if both its row and column are visible.
    pub fn coord_of(&self, cell: &CellRef) -> Option<Coord> {
        Some(Coord::new(
            self.row_index(&cell.row_id)?,
            self.column_index(&cell.column_id)?,
        ))
    }

    /// Logical identity of the cell at a visual position.
    pub fn cell_at(&self, coord: Coord) -> Option<CellRef> {
        let row = self.rows.get(coord.row_index)?;
        let column = self.columns.get(coord.col_index)?;
        Some(CellRef::new(row.clone(), column.clone()))
    }

    /// Raw value of a cell; `None` for a missing row or field.
    pub fn value(&self, row_id: &str, column_id: &str) -> Option<&Value> {
        self.records.get(row_id)?.get(column_id)
    }

    pub fn value_at(&self, coord: Coord) -> Option<&Value> {
        let row = self.rows.get(coord.row_index)?;
        let column = self.columns.get(coord.col_index)?;
        self.value(row, column)
    }

    /// Display text of a cell, empty for missing values.
    pub fn text(&self, row_id: &str, column_id: &str) -> String {
        self.value(row_id, column_id)
            .map(display_value)
            .unwrap_or_default()
    }

    pub fn is_empty_at(&self, coord: Coord) -> bool {
        is_empty_value(self.value_at(coord))
    }

    /// Hashed id lookup for bulk work over many cells.
    pub fn index(&self) -> GridIndex<'_> {
        GridIndex::new(self)
    }
}

/// Id-to-position maps over the current row and column order.
///
/// Borrows the model, so the order cannot change while an index is alive.
/// A duplicated id resolves to its first position, as `row_index` does.
#[derive(Debug)]
pub struct GridIndex<'a> {
    rows: HashMap<&'a str, usize>,
    columns: HashMap<&'a str, usize>,
}

impl<'a> GridIndex<'a> {
    pub fn new(model: &'a GridModel) -> Self {
        fn positions(ids: &[String]) -> HashMap<&str, usize> {
            let mut map = HashMap::with_capacity(ids.len());
            for (i, id) in ids.iter().enumerate() {
                map.entry(id.as_str()).or_insert(i);
            }
            map
        }
        Self {
            rows: positions(&model.rows),
            columns: positions(&model.columns),
        }
    }

    pub fn coord_of(&self, cell: &CellRef) -> Option<Coord> {
        Some(Coord::new(
            *self.rows.get(cell.row_id.as_str())?,
            *self.columns.get(cell.column_id.as_str())?,
        ))
    }

    /// True when both the cell's row and column are visible.
    pub fn contains(&self, cell: &CellRef) -> bool {
        self.rows.contains_key(cell.row_id.as_str())
            && self.columns.contains_key(cell.column_id.as_str())
    }
}

impl RowLookup for GridModel {
    fn record(&self, row_id: &str) -> Option<&RowRecord> {
        self.records.get(row_id)
    }
}

/// Null, missing and `""` count as empty; everything else has content.
pub fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// Text form of a cell value, following the host platform's string
/// conversion: null becomes `""`, integral numbers print without a fraction,
/// very small and very large numbers use exponent form (`1e-7`, `1e+21`),
/// arrays are comma-joined and objects print as `[object Object]`.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                format_float(n.as_f64().unwrap_or_default())
            }
        }
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Shortest round-trip digits, switching to exponent form below 1e-6 and
/// from 1e21 up, with an explicit `+` on positive exponents.
fn format_float(f: f64) -> String {
    let magnitude = f.abs();
    if magnitude == 0.0 {
        return "0".to_string();
    }
    if magnitude < 1e-6 || magnitude >= 1e21 {
        let exp = format!("{f:e}");
        return match exp.split_once('e') {
            Some((mantissa, power)) if !power.starts_with('-') => format!("{mantissa}e+{power}"),
            _ => exp,
        };
    }
    if f.fract() == 0.0 {
        format!("{f:.0}")
    } else {
        f.to_string()
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
    use serde_json::json;

    fn record(value: Value) -> RowRecord {
        match value {
            Value::Object(map) => map,
            _ => panic!("record must be an object"),
        }
    }

    #[test]
    fn test_display_value_matches_string_conversion() {
        assert_eq!(display_value(&json!(null)), "");
        assert_eq!(display_value(&json!("abc")), "abc");
        assert_eq!(display_value(&json!(42)), "42");
        assert_eq!(display_value(&json!(3.0)), "3");
        assert_eq!(display_value(&json!(2.5)), "2.5");
        assert_eq!(display_value(&json!(true)), "true");
        assert_eq!(display_value(&json!([1, "a", null])), "1,a,");
        assert_eq!(display_value(&json!({"k": 1})), "[object Object]");
    }

    #[test]
    fn test_display_value_exponent_range() {
        assert_eq!(display_value(&json!(1e-7)), "1e-7");
        assert_eq!(display_value(&json!(-1.5e-10)), "-1.5e-10");
        assert_eq!(display_value(&json!(0.000001)), "0.000001");
        assert_eq!(display_value(&json!(1e21)), "1e+21");
        assert_eq!(display_value(&json!(2.5e25)), "2.5e+25");
        assert_eq!(display_value(&json!(1e20)), "100000000000000000000");
        assert_eq!(display_value(&json!(-0.0)), "0");
    }

    #[test]
    fn test_index_matches_linear_lookup() {
        let mut model = GridModel::new(
            vec!["r1".into(), "r2".into(), "r1".into()],
            vec!["a".into(), "b".into()],
        );
        model.rows.reverse();
        let index = model.index();
        for cell in [
            CellRef::new("r1", "a"),
            CellRef::new("r2", "b"),
            CellRef::new("r3", "a"),
            CellRef::new("r1", "z"),
        ] {
            assert_eq!(index.coord_of(&cell), model.coord_of(&cell));
            assert_eq!(index.contains(&cell), model.coord_of(&cell).is_some());
        }
    }

    #[test]
    fn test_emptiness() {
        assert!(is_empty_value(None));
        assert!(is_empty_value(Some(&json!(null))));
        assert!(is_empty_value(Some(&json!(""))));
        assert!(!is_empty_value(Some(&json!(" "))));
        assert!(!is_empty_value(Some(&json!(0))));
        assert!(!is_empty_value(Some(&json!(false))));
    }

    #[test]
    fn test_coord_round_trip_through_ids() {
        let model = GridModel::new(
            vec!["r1".into(), "r2".into()],
            vec!["a".into(), "b".into(), "c".into()],
        );
        let cell = CellRef::new("r2", "c");
        let coord = model.coord_of(&cell).unwrap();
        assert_eq!(coord, Coord::new(1, 2));
        assert_eq!(model.cell_at(coord), Some(cell));
        assert_eq!(model.cell_at(Coord::new(2, 0)), None);
        assert_eq!(model.coord_of(&CellRef::new("r9", "a")), None);
    }

    #[test]
    fn test_from_records_uses_id_field() {
        let model = GridModel::from_records(
            "id",
            vec!["name".into()],
            vec![
                record(json!({"id": 7, "name": "Ann"})),
                record(json!({"name": "no id"})),
                record(json!({"id": "x", "name": "Bo"})),
            ],
        );
        assert_eq!(model.rows, vec!["7".to_string(), "x".to_string()]);
        assert_eq!(model.text("7", "name"), "Ann");
        assert_eq!(model.text("x", "missing"), "");
    }
}

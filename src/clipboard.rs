//! TSV serialization of selected cells and the clipboard write.

use std::collections::HashMap;

use crate::error::{GridError, Result};
use crate::model::{display_value, RowLookup};
use crate::scheduler::LocalFuture;
use crate::types::CellRef;

/// Write-text primitive of the system clipboard. May reject.
pub trait ClipboardWriter {
    fn write_text(&self, text: String) -> LocalFuture<'static, Result<()>>;
}

/// Serialize cells as tab-separated rows.
///
/// Cells are grouped by row id in the order rows are first seen; within a
/// row, cells keep the order they were given in. Each cell prints the row
/// record's field for its column (missing or null prints as empty). Rows
/// whose id has no record are skipped entirely.
pub fn serialize_tsv(cells: &[CellRef], lookup: &dyn RowLookup) -> String {
    let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();
    let mut slots: HashMap<&str, usize> = HashMap::new();
    for cell in cells {
        let slot = *slots.entry(cell.row_id.as_str()).or_insert_with(|| {
            groups.push((cell.row_id.as_str(), Vec::new()));
            groups.len() - 1
        });
        if let Some((_, columns)) = groups.get_mut(slot) {
            columns.push(cell.column_id.as_str());
        }
    }

    groups
        .into_iter()
        .filter_map(|(row_id, columns)| {
            let record = lookup.record(row_id)?;
            Some(
                columns
                    .into_iter()
                    .map(|col| record.get(col).map(display_value).unwrap_or_default())
                    .collect::<Vec<_>>()
                    .join("\t"),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Serialize `cells` and write them to the clipboard.
///
/// Serialization happens before this returns, so the lookup is not held
/// while the write is pending. The future yields the text written. A
/// rejected write is returned as [`GridError::Clipboard`] and is not retried.
pub fn copy_cells(
    writer: &dyn ClipboardWriter,
    cells: &[CellRef],
    lookup: &dyn RowLookup,
) -> LocalFuture<'static, Result<String>> {
    let text = serialize_tsv(cells, lookup);
    let count = cells.len();
    let write = writer.write_text(text.clone());
    Box::pin(async move {
        write.await.map_err(|e| match e {
            GridError::Clipboard(_) => e,
            other => GridError::Clipboard(other.to_string()),
        })?;
        log::debug!("copied {count} cells ({} bytes)", text.len());
        Ok(text)
    })
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
    use serde_json::{json, Value};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    fn rows(entries: &[(&str, Value)]) -> HashMap<String, RowRecord> {
        entries
            .iter()
            .map(|(id, v)| {
                let Value::Object(map) = v.clone() else {
                    panic!("row must be an object");
                };
                ((*id).to_string(), map)
            })
            .collect()
    }

    fn cells(pairs: &[(&str, &str)]) -> Vec<CellRef> {
        pairs.iter().map(|(r, c)| CellRef::new(*r, *c)).collect()
    }

    #[test]
    fn test_tsv_shape() {
        let data = rows(&[
            ("r1", json!({"a": "1", "b": "2"})),
            ("r2", json!({"a": "3", "b": "4"})),
        ]);
        let sel = cells(&[("r1", "a"), ("r1", "b"), ("r2", "a"), ("r2", "b")]);
        assert_eq!(serialize_tsv(&sel, &data), "1\t2\n3\t4");
    }

    #[test]
    fn test_missing_row_is_skipped_without_blank_line() {
        let data = rows(&[("r1", json!({"a": "1"})), ("r3", json!({"a": "3"}))]);
        let sel = cells(&[("r1", "a"), ("r2", "a"), ("r3", "a")]);
        assert_eq!(serialize_tsv(&sel, &data), "1\n3");
    }

    #[test]
    fn test_missing_and_null_fields_print_empty() {
        let data = rows(&[("r1", json!({"a": null, "c": 5}))]);
        let sel = cells(&[("r1", "a"), ("r1", "b"), ("r1", "c")]);
        assert_eq!(serialize_tsv(&sel, &data), "\t\t5");
    }

    #[test]
    fn test_caller_order_within_row_is_kept() {
        let data = rows(&[("r1", json!({"a": "x", "b": "y"}))]);
        let sel = cells(&[("r1", "b"), ("r1", "a")]);
        assert_eq!(serialize_tsv(&sel, &data), "y\tx");
    }

    #[test]
    fn test_interleaved_rows_group_in_first_seen_order() {
        let data = rows(&[
            ("r1", json!({"a": "1", "b": "2"})),
            ("r2", json!({"a": "3", "b": "4"})),
        ]);
        let sel = cells(&[("r2", "a"), ("r1", "b"), ("r2", "b"), ("r1", "a")]);
        assert_eq!(serialize_tsv(&sel, &data), "3\t4\n2\t1");
    }

    struct Recorder {
        fail: bool,
        written: Rc<RefCell<Vec<String>>>,
    }

    impl ClipboardWriter for Recorder {
        fn write_text(&self, text: String) -> LocalFuture<'static, Result<()>> {
            let fail = self.fail;
            let written = Rc::clone(&self.written);
            Box::pin(async move {
                if fail {
                    return Err(GridError::Other("denied".into()));
                }
                written.borrow_mut().push(text);
                Ok(())
            })
        }
    }

    #[test]
    fn test_copy_cells_writes_text() {
        let data = rows(&[("r1", json!({"a": "1"}))]);
        let written = Rc::new(RefCell::new(Vec::new()));
        let writer = Recorder {
            fail: false,
            written: Rc::clone(&written),
        };
        let text = pollster::block_on(copy_cells(&writer, &cells(&[("r1", "a")]), &data)).unwrap();
        assert_eq!(text, "1");
        assert_eq!(*written.borrow(), vec!["1".to_string()]);
    }

    #[test]
    fn test_copy_cells_reports_rejection() {
        let data = rows(&[("r1", json!({"a": "1"}))]);
        let writer = Recorder {
            fail: true,
            written: Rc::new(RefCell::new(Vec::new())),
        };
        let err = pollster::block_on(copy_cells(&writer, &cells(&[("r1", "a")]), &data)).unwrap_err();
        assert!(matches!(err, GridError::Clipboard(msg) if msg == "denied"));
    }
}

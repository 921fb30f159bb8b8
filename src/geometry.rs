//! Geometry queries and the pure rectangle math behind box selection.

use crate::types::{CellGeometry, CellRef, Point, Rect};

/// Reports where every visible cell is on screen right now.
///
/// Called on demand; the engine never caches the answer because scrolling,
/// resizing and re-sorting all move cells.
pub trait GeometryProvider {
    fn cells_info(&self) -> Vec<CellGeometry>;
}

impl GeometryProvider for Vec<CellGeometry> {
    fn cells_info(&self) -> Vec<CellGeometry> {
        self.clone()
    }
}

impl<F> GeometryProvider for F
where
    F: Fn() -> Vec<CellGeometry>,
{
    fn cells_info(&self) -> Vec<CellGeometry> {
        self()
    }
}

/// First cell whose box contains `point` (edges inclusive).
pub fn hit_test(cells: &[CellGeometry], point: Point) -> Option<&CellGeometry> {
    cells.iter().find(|cell| cell.rect().contains(point))
}

/// Every cell whose box overlaps `drag_box`, in geometry order.
pub fn cells_in_box(cells: &[CellGeometry], drag_box: &Rect) -> Vec<CellRef> {
    cells
        .iter()
        .filter(|cell| cell.rect().intersects(drag_box))
        .map(CellGeometry::cell_ref)
        .collect()
}

/// Screen box of one cell, if it is currently rendered.
pub fn find_cell_rect(cells: &[CellGeometry], cell: &CellRef) -> Option<Rect> {
    cells.iter().find(|g| g.is(cell)).map(CellGeometry::rect)
}

/// Smallest scroll that moves `cell` at least `margin` px inside `container`,
/// computed independently per axis. `(0, 0)` when already clear of the margin.
pub fn scroll_into_view_delta(cell: &Rect, container: &Rect, margin: f64) -> (f64, f64) {
    let dx = axis_delta(
        cell.left(),
        cell.right(),
        container.left() + margin,
        container.right() - margin,
    );
    let dy = axis_delta(
        cell.top(),
        cell.bottom(),
        container.top() + margin,
        container.bottom() - margin,
    );
    (dx, dy)
}

fn axis_delta(start: f64, end: f64, min: f64, max: f64) -> f64 {
    if start < min {
        start - min
    } else if end > max {
        end - max
    } else {
        0.0
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

    fn grid(rows: usize, cols: usize, w: f64, h: f64) -> Vec<CellGeometry> {
        let mut out = Vec::new();
        for r in 0..rows {
            for c in 0..cols {
                out.push(CellGeometry::new(
                    format!("r{r}"),
                    format!("c{c}"),
                    Rect::new(c as f64 * w, r as f64 * h, w, h),
                ));
            }
        }
        out
    }

    #[test]
    fn test_hit_test_inside_and_outside() {
        let cells = grid(2, 2, 100.0, 20.0);
        let hit = hit_test(&cells, Point::new(150.0, 5.0)).unwrap();
        assert_eq!((hit.row_id.as_str(), hit.column_id.as_str()), ("r0", "c1"));
        assert!(hit_test(&cells, Point::new(250.0, 5.0)).is_none());
    }

    #[test]
    fn test_shared_edge_counts_as_overlap() {
        let cells = grid(1, 3, 100.0, 20.0);
        // Box ends exactly on the left edge of c1.
        let selected = cells_in_box(&cells, &Rect::new(10.0, 5.0, 90.0, 5.0));
        assert_eq!(
            selected,
            vec![CellRef::new("r0", "c0"), CellRef::new("r0", "c1")]
        );
    }

    #[test]
    fn test_box_selection_is_direction_independent() {
        let cells = grid(5, 5, 50.0, 20.0);
        let a = Point::new(30.0, 25.0);
        let b = Point::new(120.0, 70.0);
        let forward = cells_in_box(&cells, &Rect::from_corners(a, b));
        let backward = cells_in_box(&cells, &Rect::from_corners(b, a));
        assert_eq!(forward, backward);
        assert_eq!(forward.len(), 9);
    }

    #[test]
    fn test_scroll_into_view_delta_per_axis() {
        let container = Rect::new(0.0, 0.0, 400.0, 300.0);
        let inside = Rect::new(100.0, 100.0, 50.0, 20.0);
        assert_eq!(scroll_into_view_delta(&inside, &container, 60.0), (0.0, 0.0));

        let near_bottom_right = Rect::new(320.0, 260.0, 50.0, 20.0);
        assert_eq!(
            scroll_into_view_delta(&near_bottom_right, &container, 60.0),
            (30.0, 40.0)
        );

        let near_top = Rect::new(100.0, 10.0, 50.0, 20.0);
        assert_eq!(scroll_into_view_delta(&near_top, &container, 60.0), (0.0, -50.0));
    }
}

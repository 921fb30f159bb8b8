//! Benchmarks for the hot paths of a drag: box intersection, revalidation
//! and TSV serialization, plus select-all and copy on a large grid.
//!
//! Run with: cargo bench
//!
//! Results are saved to `target/criterion/` with HTML reports.
#![allow(clippy::expect_used, clippy::cast_precision_loss)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::{Map, Value};

use cellgrid::geometry::cells_in_box;
use cellgrid::{
    row_major, serialize_tsv, CellGeometry, GridModel, Point, Rect, SelectionEngine, SelectionSet,
};

const CELL_WIDTH: f64 = 100.0;
const CELL_HEIGHT: f64 = 24.0;

fn geometry(rows: usize, cols: usize) -> Vec<CellGeometry> {
    let mut cells = Vec::with_capacity(rows * cols);
    for r in 0..rows {
        for c in 0..cols {
            cells.push(CellGeometry::new(
                format!("r{r}"),
                format!("c{c}"),
                Rect::new(
                    c as f64 * CELL_WIDTH,
                    r as f64 * CELL_HEIGHT,
                    CELL_WIDTH,
                    CELL_HEIGHT,
                ),
            ));
        }
    }
    cells
}

fn model(rows: usize, cols: usize) -> GridModel {
    let columns: Vec<String> = (0..cols).map(|c| format!("c{c}")).collect();
    let mut model = GridModel::new((0..rows).map(|r| format!("r{r}")).collect(), columns.clone());
    for r in 0..rows {
        let record: Map<String, Value> = columns
            .iter()
            .enumerate()
            .map(|(c, col)| (col.clone(), Value::from(format!("v{r}.{c}"))))
            .collect();
        model.records.insert(format!("r{r}"), record);
    }
    model
}

/// One drag frame over grids of increasing size, box covering a quarter.
fn bench_cells_in_box(c: &mut Criterion) {
    let mut group = c.benchmark_group("cells_in_box");
    for (rows, cols) in [(50, 10), (200, 20), (1000, 30)] {
        let cells = geometry(rows, cols);
        let drag_box = Rect::from_corners(
            Point::new(10.0, 10.0),
            Point::new(cols as f64 * CELL_WIDTH / 2.0, rows as f64 * CELL_HEIGHT / 2.0),
        );
        group.throughput(Throughput::Elements(cells.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{rows}x{cols}")),
            &cells,
            |b, cells| b.iter(|| cells_in_box(black_box(cells), black_box(&drag_box))),
        );
    }
    group.finish();
}

/// Revalidating a full-grid selection after one row is filtered out.
fn bench_revalidate(c: &mut Criterion) {
    let full = model(1000, 30);
    let mut filtered = full.clone();
    filtered.rows.retain(|r| r != "r500");

    c.bench_function("revalidate_1000x30", |b| {
        b.iter_batched(
            || {
                let mut engine = SelectionEngine::new();
                engine.select_all(&full);
                engine
            },
            |mut engine| engine.revalidate(black_box(&filtered)),
            criterion::BatchSize::LargeInput,
        )
    });
}

/// Ordering and serializing a large selection for copy.
fn bench_copy(c: &mut Criterion) {
    let model = model(1000, 30);
    let mut engine = SelectionEngine::new();
    engine.select_all(&model);
    let selection: SelectionSet = engine.selection().clone();

    let mut group = c.benchmark_group("copy");
    group.throughput(Throughput::Elements(selection.len() as u64));
    group.bench_function("row_major_1000x30", |b| {
        b.iter(|| row_major(black_box(&model), black_box(&selection)))
    });
    let ordered = row_major(&model, &selection);
    group.bench_function("serialize_tsv_1000x30", |b| {
        b.iter(|| serialize_tsv(black_box(&ordered), black_box(&model)))
    });
    group.finish();
}

/// Ctrl+A then Ctrl+C on a tall grid: select all, order and serialize.
fn bench_select_all_copy(c: &mut Criterion) {
    let model = model(5000, 20);
    let mut group = c.benchmark_group("select_all_copy");
    group.sample_size(10);
    group.throughput(Throughput::Elements(100_000));
    group.bench_function("5000x20", |b| {
        b.iter(|| {
            let mut engine = SelectionEngine::new();
            engine.select_all(black_box(&model));
            engine.revalidate(&model);
            let ordered = row_major(&model, engine.selection());
            serialize_tsv(&ordered, &model)
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_cells_in_box,
    bench_revalidate,
    bench_copy,
    bench_select_all_copy
);

criterion_main!(benches);

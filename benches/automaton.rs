//! Benchmarks for the cellular automaton on layered relation graphs.
//!
//! Run with: `cargo bench --bench automaton`

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use wiretrack::CellularAutomaton;

/// A layered DAG shaped like the facet graphs: `layers` stages of `width`
/// cells each, every cell related to a handful of cells in the next stage.
fn layered_graph(layers: usize, width: usize, fanout: usize) -> CellularAutomaton {
    let mut rng = StdRng::seed_from_u64(42);
    let mut ca = CellularAutomaton::new(vec![3.0; layers * width]);

    for layer in 0..layers - 1 {
        for slot in 0..width {
            let from = layer * width + slot;
            for _ in 0..fanout {
                let to = (layer + 1) * width + rng.gen_range(0..width);
                ca.add_relation(from, to, rng.gen_range(0.0..1.0));
            }
        }
    }
    ca
}

fn bench_relax_and_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("automaton");
    for (layers, width) in [(6, 50), (10, 200), (54, 500)] {
        group.bench_with_input(
            BenchmarkId::new("find_paths", format!("{}x{}", layers, width)),
            &(layers, width),
            |b, &(layers, width)| {
                b.iter_batched(
                    || layered_graph(layers, width, 3),
                    |mut ca| ca.find_paths(0.0),
                    criterion::BatchSize::SmallInput,
                );
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_relax_and_extract);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndarray::Array2;
use rand::prelude::*;
use worldtrack::AssignmentSolver;

fn generate_random_cost_matrix(tracks: usize, detections: usize) -> Array2<f32> {
    let mut rng = thread_rng();
    Array2::from_shape_fn((tracks, detections), |_| rng.gen_range(0.0..5.0))
}

fn bench_assignment_small(c: &mut Criterion) {
    let cost_matrix = generate_random_cost_matrix(10, 10);

    c.bench_function("assignment_10x10", |b| {
        b.iter(|| AssignmentSolver::solve(black_box(cost_matrix.view()), black_box(2.5)))
    });
}

fn bench_assignment_medium(c: &mut Criterion) {
    let cost_matrix = generate_random_cost_matrix(50, 50);

    c.bench_function("assignment_50x50", |b| {
        b.iter(|| AssignmentSolver::solve(black_box(cost_matrix.view()), black_box(2.5)))
    });
}

fn bench_assignment_rectangular(c: &mut Criterion) {
    let cost_matrix = generate_random_cost_matrix(40, 15);

    c.bench_function("assignment_40x15", |b| {
        b.iter(|| AssignmentSolver::solve(black_box(cost_matrix.view()), black_box(2.5)))
    });
}

fn bench_assignment_sparse(c: &mut Criterion) {
    // Mostly type-incompatible pairs, as in mixed-class frames
    let mut rng = thread_rng();
    let cost_matrix = Array2::from_shape_fn((50, 50), |_| {
        if rng.gen_bool(0.8) {
            f32::INFINITY
        } else {
            rng.gen_range(0.0..5.0)
        }
    });

    c.bench_function("assignment_sparse_50x50", |b| {
        b.iter(|| AssignmentSolver::solve(black_box(cost_matrix.view()), black_box(2.5)))
    });
}

criterion_group!(
    benches,
    bench_assignment_small,
    bench_assignment_medium,
    bench_assignment_rectangular,
    bench_assignment_sparse
);
criterion_main!(benches);

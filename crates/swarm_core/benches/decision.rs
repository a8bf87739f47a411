//! Decision benchmarks for swarm_core.
//!
//! Run with: `cargo bench -p swarm_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use swarm_core::config::{EngineConfig, MovementMode};
use swarm_core::engine::DecisionEngine;
use swarm_core::snapshot::WorldSnapshot;
use swarm_test_utils::fixtures::{SnapshotBuilder, ENEMY_TEAM};

/// A square world with `units` units of ours spread over it.
fn crowded_world(size: u32, units: i32, tick: u64) -> WorldSnapshot {
    let side = i32::try_from(size).unwrap_or(i32::MAX);
    let mut builder = SnapshotBuilder::new(size, size).tick(tick).pool(300);
    for i in 0..size as usize {
        builder = builder.nutrients((i * 13) % size as usize, (i * 7) % size as usize, 5 + (i as u32 % 20));
    }
    for i in 0..units {
        builder = builder.unit(&format!("u{i}"), (i * 5) % side, (i * 3) % side, 8 + (i as u32 % 5) * 4);
    }
    for i in 0..units / 2 {
        builder = builder.team_unit(ENEMY_TEAM, &format!("e{i}"), side - 1 - (i % side), (i * 11) % side, 12);
    }
    builder.facility("f1", 1, 1).facility("f2", side / 2, side / 2).build()
}

/// Runs one full tick on growing worlds, in every phase.
pub fn decision_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("decide");
    for &(size, units) in &[(32_u32, 20_i32), (64, 60), (100, 120)] {
        for &(label, tick) in &[("expand", 10_u64), ("converge", 150), ("attack", 300)] {
            let snapshot = crowded_world(size, units, tick);
            group.bench_with_input(
                BenchmarkId::new(label, format!("{size}x{size}/{units}")),
                &snapshot,
                |b, snap| {
                    b.iter(|| {
                        let mut engine = DecisionEngine::new(EngineConfig::default()).unwrap();
                        black_box(engine.decide(black_box(snap)))
                    });
                },
            );
        }
    }
    group.finish();

    let snapshot = crowded_world(64, 60, 10);
    c.bench_function("decide_single_step_64", |b| {
        let config = EngineConfig {
            movement: MovementMode::SingleStep,
            ..EngineConfig::default()
        };
        b.iter(|| {
            let mut engine = DecisionEngine::new(config.clone()).unwrap();
            black_box(engine.decide(black_box(&snapshot)))
        });
    });
}

criterion_group!(benches, decision_benchmark);
criterion_main!(benches);

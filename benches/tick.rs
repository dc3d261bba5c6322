//! Tick pipeline benchmarks
//!
//! Measures physics, collision and full game-loop ticks at several asteroid counts.
//!
//! Run with: cargo bench --bench tick

use asteroid_arena::config::SimConfig;
use asteroid_arena::controller::builtin::SpinShooter;
use asteroid_arena::game::game_loop::GameLoop;
use asteroid_arena::game::scenario::{max_asteroids, Scenario};
use asteroid_arena::game::score::Score;
use asteroid_arena::game::spatial::AsteroidGrid;
use asteroid_arena::game::state::World;
use asteroid_arena::game::systems::{collision, physics};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};

const DT: f32 = 1.0 / 60.0;
const COUNTS: [usize; 4] = [10, 100, 500, 1000];

/// Seeded world with `count` random asteroids, a ring of ships and some bullets in flight
fn create_world(count: usize) -> World {
    let scenario = Scenario::builder(format!("bench_{}", count))
        .num_asteroids(count)
        .seed(count as u64)
        .build()
        .expect("valid bench scenario");
    let mut world = scenario.materialize(3);

    for i in 0..count / 10 {
        let heading = (i as f32 * 37.0) % 360.0 - 180.0;
        let center = world.map.center();
        world.add_bullet(1, center, heading);
    }
    world
}

fn bench_physics(c: &mut Criterion) {
    let mut group = c.benchmark_group("physics");
    group.sample_size(50);

    for count in COUNTS {
        let mut world = create_world(count);

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("parallel", count), &count, |b, _| {
            b.iter(|| physics::update(&mut world, black_box(DT)))
        });
    }
    group.finish();
}

fn bench_collision(c: &mut Criterion) {
    let mut group = c.benchmark_group("collision");
    group.sample_size(50);

    for count in COUNTS {
        let world = create_world(count);
        let score = Score::new(max_asteroids(&world.asteroids), &world.ships, false);

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("spatial_grid", count), &count, |b, _| {
            b.iter_batched(
                || (world.clone(), score.clone()),
                |(mut world, mut score)| black_box(collision::update(&mut world, &mut score)),
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_spatial_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("spatial_grid");
    group.sample_size(50);

    for count in COUNTS {
        let world = create_world(count);
        let mut grid = AsteroidGrid::default();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("rebuild", count), &count, |b, _| {
            b.iter(|| {
                grid.rebuild(&world.asteroids);
                black_box(grid.query(world.map.center(), 20.0))
            })
        });
    }
    group.finish();
}

/// Full ticks through the game loop, including the inline controller call
fn bench_full_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_tick");
    group.sample_size(30);

    for count in COUNTS {
        let scenario = Scenario::builder(format!("tick_{}", count))
            .num_asteroids(count)
            .seed(7)
            .build()
            .expect("valid bench scenario");

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("complete", count), &count, |b, _| {
            b.iter_batched(
                || {
                    let mut game = GameLoop::new(scenario.clone(), SimConfig::headless()).expect("valid config");
                    game.add_controller_for_all(SpinShooter::default()).expect("ship exists");
                    game
                },
                |mut game| {
                    for _ in 0..10 {
                        black_box(game.step().expect("tick"));
                    }
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_physics, bench_collision, bench_spatial_grid, bench_full_tick);

criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use voxel_ecs::prelude::*;

#[derive(Debug, Default, Clone)]
struct Position {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Debug, Default, Clone)]
struct Velocity {
    dx: f32,
    dy: f32,
    dz: f32,
}

fn spawn_entities(world: &mut World, count: usize) {
    for i in 0..count {
        let e = world.create();
        world.add(e, Position { x: i as f32, y: 0.0, z: 0.0 }).unwrap();
        world.add(e, Velocity { dx: 1.0, dy: 0.0, dz: 0.0 }).unwrap();
    }
}

fn bench_spawn(c: &mut Criterion) {
    c.bench_function("spawn_10k_entities", |b| {
        b.iter(|| {
            let mut world = World::new();
            spawn_entities(&mut world, black_box(10_000));
            world
        });
    });
}

fn bench_query_iteration(c: &mut Criterion) {
    let mut world = World::new();
    spawn_entities(&mut world, 10_000);
    let mut query = Query::new()
        .with::<Position>(&mut world)
        .with::<Velocity>(&mut world)
        .build();
    query.update(&world);

    c.bench_function("query_iterate_10k_rows", |b| {
        b.iter(|| {
            let mut sum = 0.0f32;
            for row in query.iter(&world) {
                sum += row.get::<Position>().unwrap().x;
            }
            black_box(sum)
        });
    });
}

criterion_group!(benches, bench_spawn, bench_query_iteration);
criterion_main!(benches);

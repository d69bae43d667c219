//! Basic ECS usage: spawning, querying, removing a component, and destroying an entity.

use voxel_ecs::prelude::*;

#[derive(Debug, Default, Clone)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Debug, Default, Clone)]
struct Velocity {
    dx: f32,
    dy: f32,
}

fn main() -> Result<()> {
    let mut world = World::new();

    for i in 0..10 {
        world.spawn((
            Position { x: i as f32, y: 0.0 },
            Velocity { dx: 0.1, dy: 0.0 },
        ))?;
    }
    println!("spawned {} entities", world.len());

    let mut moving = Query::new()
        .with::<Position>(&mut world)
        .with::<Velocity>(&mut world)
        .build();
    moving.update(&world);
    println!("{} entities have both Position and Velocity", moving.iter(&world).count());

    let stationary = world.create();
    world.add(stationary, Position { x: 100.0, y: 0.0 })?;
    println!("entity {stationary} has no velocity: {}", !world.has::<Velocity>(stationary));

    world.destroy(stationary)?;
    println!("{} entities remain", world.len());
    Ok(())
}

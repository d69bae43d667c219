//! Registering a system that reads `Velocity` and writes `Position` through its command buffer,
//! then running a few frames through `App`.

use voxel_ecs::prelude::*;

#[derive(Debug, Default, Clone, Copy)]
struct Position {
    x: f32,
}

#[derive(Debug, Default, Clone, Copy)]
struct Velocity {
    dx: f32,
}

fn main() -> Result<()> {
    let mut app = App::new();
    for i in 0..5 {
        app.world.spawn((Position { x: i as f32 }, Velocity { dx: 1.0 }))?;
    }

    let mut moving = Query::new()
        .with::<Position>(&mut app.world)
        .with::<Velocity>(&mut app.world)
        .build();

    app.add_system(FnSystem::boxed(
        "apply_velocity",
        SystemAccess::empty().read::<Velocity>().write::<Position>(),
        move |world, commands| {
            moving.update(world);
            let dt = world.resource::<DeltaTime>().copied().unwrap_or_default().0;
            for row in moving.iter(world) {
                let entity = row.entity();
                let dx = row.get::<Velocity>().expect("matched Velocity").dx;
                commands.add_custom(move |w: &mut World, _resolver| {
                    if let Ok(pos) = w.get_mut::<Position>(entity) {
                        pos.x += dx * dt;
                    }
                    Ok(())
                });
            }
            Ok(())
        },
    ));

    for frame in 0..3 {
        app.update()?;
        println!("frame {frame} complete");
    }
    println!("{} systems registered", app.schedule.system_count());
    Ok(())
}

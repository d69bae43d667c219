//! Parent/child attachment via the built-in `ChildOf` tree relation, and a simple event channel.

use voxel_ecs::prelude::*;

#[derive(Debug, Default, Clone, Copy)]
struct Damaged {
    amount: i32,
}

fn main() -> Result<()> {
    let mut world = World::new();

    let torso = world.create();
    let arm = world.create();
    let hand = world.create();
    attach(&mut world, arm, torso)?;
    attach(&mut world, hand, arm)?;

    println!("torso's children: {:?}", children_of(&world, torso));
    println!("hand's ancestors: {:?}", ancestors(&world, hand));
    println!("torso's descendants: {:?}", descendants(&world, torso));

    world.insert_resource(Events::<Damaged>::new())?;
    let events = world.resource_mut::<Events<Damaged>>().expect("just inserted");
    let reader = events.register_reader();
    events.send(Damaged { amount: 5 });
    for event in events.read(reader) {
        println!("took {} damage", event.amount);
    }

    Ok(())
}

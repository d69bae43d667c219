// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Plugins bundle system/tag registrations so higher-level code can compose a world's behaviour
//! out of reusable pieces instead of one monolithic setup function.

use crate::schedule::Schedule;
use crate::world::World;

/// Receives the world and its schedule at startup and registers whatever it needs into both.
pub trait Plugin {
    fn build(&self, world: &mut World, schedule: &mut Schedule);
}

impl<F> Plugin for F
where
    F: Fn(&mut World, &mut Schedule),
{
    fn build(&self, world: &mut World, schedule: &mut Schedule) {
        self(world, schedule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::{FnSystem, SystemAccess};

    struct CountingPlugin;

    impl Plugin for CountingPlugin {
        fn build(&self, world: &mut World, schedule: &mut Schedule) {
            world.insert_resource(0u32).ok();
            schedule.add_system(FnSystem::boxed("noop", SystemAccess::empty(), |_, _| Ok(())));
        }
    }

    #[test]
    fn plugin_registers_into_world_and_schedule() {
        let mut world = World::new();
        let mut schedule = Schedule::new();
        CountingPlugin.build(&mut world, &mut schedule);
        assert_eq!(world.resource::<u32>(), Some(&0));
        assert_eq!(schedule.system_count(), 1);
    }

    #[test]
    fn closure_implements_plugin() {
        let mut world = World::new();
        let mut schedule = Schedule::new();
        let plugin = |world: &mut World, _schedule: &mut Schedule| {
            world.insert_resource("hello").ok();
        };
        plugin.build(&mut world, &mut schedule);
        assert_eq!(world.resource::<&str>(), Some(&"hello"));
    }
}

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

//! Thin harness gluing a [`World`] and a [`Schedule`] into a frame loop. `App` owns the only
//! clock in the crate and is the sole producer of the `DeltaTime` resource systems read.

use crate::config::Config;
use crate::error::Result;
use crate::event::Events;
use crate::plugin::Plugin;
use crate::schedule::Schedule;
use crate::system::BoxedSystem;
use crate::time::{DeltaTime, Time};
use crate::world::World;

pub struct App {
    pub world: World,
    pub schedule: Schedule,
    time: Time,
    event_sweepers: Vec<Box<dyn FnMut(&mut World) + Send>>,
}

impl App {
    pub fn new() -> Self {
        Self::from_world(World::new())
    }

    pub fn with_config(config: Config) -> Self {
        Self::from_world(World::with_config(config))
    }

    fn from_world(mut world: World) -> Self {
        world.insert_resource(DeltaTime::default()).expect("fresh world has no resources yet");
        Self {
            world,
            schedule: Schedule::new(),
            time: Time::new(),
            event_sweepers: Vec::new(),
        }
    }

    /// Lets `plugin` register its systems and world state.
    pub fn add_plugin<P: Plugin>(&mut self, plugin: P) -> &mut Self {
        plugin.build(&mut self.world, &mut self.schedule);
        self
    }

    pub fn add_system(&mut self, system: BoxedSystem) -> &mut Self {
        self.schedule.add_system(system);
        self
    }

    /// Registers an `Events<T>` channel and arranges for it to be swept at the end of every
    /// frame, dropping values every reader has already seen.
    pub fn add_event<T: 'static + Send + Sync>(&mut self) -> &mut Self {
        self.world.insert_resource(Events::<T>::new()).ok();
        self.event_sweepers.push(Box::new(|world: &mut World| {
            if let Some(events) = world.resource_mut::<Events<T>>() {
                events.update();
            }
        }));
        self
    }

    /// Runs exactly one frame: refreshes the clock, runs the schedule once, then sweeps every
    /// registered event channel.
    pub fn update(&mut self) -> Result<()> {
        self.time.update();
        if let Some(dt) = self.world.resource_mut::<DeltaTime>() {
            *dt = DeltaTime(self.time.delta_seconds());
        }
        self.schedule.run(&mut self.world)?;
        for sweep in &mut self.event_sweepers {
            sweep(&mut self.world);
        }
        Ok(())
    }

    /// Runs frames back to back until a system returns an error.
    pub fn run(&mut self) -> Result<()> {
        loop {
            self.update()?;
        }
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
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
    fn add_plugin_registers_into_world_and_schedule() {
        let mut app = App::new();
        app.add_plugin(CountingPlugin);
        assert_eq!(app.world.resource::<u32>(), Some(&0));
        assert_eq!(app.schedule.system_count(), 1);
    }

    #[test]
    fn update_publishes_a_nonzero_delta_time_after_the_first_frame() {
        let mut app = App::new();
        app.update().unwrap();
        assert!(app.world.resource::<DeltaTime>().is_some());
    }

    #[test]
    fn add_event_then_update_sweeps_fully_read_values() {
        #[derive(Clone)]
        struct Tick;

        let mut app = App::new();
        app.add_event::<Tick>();
        let reader = app
            .world
            .resource_mut::<Events<Tick>>()
            .unwrap()
            .register_reader();
        app.world.resource_mut::<Events<Tick>>().unwrap().send(Tick);

        app.update().unwrap();
        assert_eq!(app.world.resource_mut::<Events<Tick>>().unwrap().len(), 1);

        app.world.resource_mut::<Events<Tick>>().unwrap().read(reader);
        app.update().unwrap();
        assert_eq!(app.world.resource_mut::<Events<Tick>>().unwrap().len(), 0);
    }
}

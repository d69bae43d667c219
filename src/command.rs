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

//! Command buffer: captures a sequence of intended world mutations and applies them atomically
//! later, so structural changes can be deferred out of query iteration.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use crate::entity::Entity;
use crate::error::Result;
pub use crate::world::World;

/// An entity that may not exist yet: either a real, already-allocated [`Entity`], or a reference
/// to a `create` command recorded earlier in the same buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Real(Entity),
    Temp(u32),
}

impl From<Entity> for EntityRef {
    fn from(e: Entity) -> Self {
        EntityRef::Real(e)
    }
}

/// Resolves [`EntityRef::Temp`] ids created earlier in the same buffer application.
pub struct TempResolver<'a> {
    resolved: &'a FxHashMap<u32, Option<Entity>>,
}

impl TempResolver<'_> {
    /// Resolves a reference. Returns `None` if it refers to a `create` that failed.
    pub fn resolve(&self, r: EntityRef) -> Option<Entity> {
        match r {
            EntityRef::Real(e) => Some(e),
            EntityRef::Temp(id) => self.resolved.get(&id).copied().flatten(),
        }
    }
}

type Mutation = Box<dyn FnOnce(&mut World, &TempResolver) -> Result<()> + Send>;

enum Command {
    Create(u32),
    Destroy(EntityRef),
    Mutate(Mutation),
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Create(id) => f.debug_tuple("Create").field(id).finish(),
            Command::Destroy(r) => f.debug_tuple("Destroy").field(r).finish(),
            Command::Mutate(_) => write!(f, "Mutate(...)"),
        }
    }
}

/// Deferred world mutations, applied together via [`apply`](CommandBuffer::apply).
#[derive(Default)]
pub struct CommandBuffer {
    commands: Vec<Command>,
    next_temp: u32,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            commands: Vec::with_capacity(capacity),
            next_temp: 0,
        }
    }

    /// Records an entity creation, returning a temporary reference other commands in this same
    /// buffer can target before the buffer is applied.
    pub fn create(&mut self) -> EntityRef {
        let id = self.next_temp;
        self.next_temp += 1;
        self.commands.push(Command::Create(id));
        EntityRef::Temp(id)
    }

    pub fn destroy(&mut self, entity: impl Into<EntityRef>) {
        self.commands.push(Command::Destroy(entity.into()));
    }

    pub fn add<T: crate::component::Component>(&mut self, entity: impl Into<EntityRef>, value: T) {
        let entity = entity.into();
        self.commands.push(Command::Mutate(Box::new(move |world, r| {
            let e = match r.resolve(entity) {
                Some(e) => e,
                None => return Ok(()),
            };
            world.add(e, value)
        })));
    }

    pub fn remove<T: crate::component::Component>(&mut self, entity: impl Into<EntityRef>) {
        let entity = entity.into();
        self.commands.push(Command::Mutate(Box::new(move |world, r| {
            let e = match r.resolve(entity) {
                Some(e) => e,
                None => return Ok(()),
            };
            world.remove::<T>(e).map(|_| ())
        })));
    }

    pub fn relate<T: crate::component::Component>(
        &mut self,
        from: impl Into<EntityRef>,
        to: impl Into<EntityRef>,
        value: T,
    ) {
        let (from, to) = (from.into(), to.into());
        self.commands.push(Command::Mutate(Box::new(move |world, r| {
            let (Some(from), Some(to)) = (r.resolve(from), r.resolve(to)) else {
                return Ok(());
            };
            world.relate(from, to, value)
        })));
    }

    pub fn unrelate<T: crate::component::Component>(
        &mut self,
        from: impl Into<EntityRef>,
        to: impl Into<EntityRef>,
    ) {
        let (from, to) = (from.into(), to.into());
        self.commands.push(Command::Mutate(Box::new(move |world, r| {
            let (Some(from), Some(to)) = (r.resolve(from), r.resolve(to)) else {
                return Ok(());
            };
            world.unrelate::<T>(from, to)
        })));
    }

    /// Records an arbitrary world mutation, given a resolver for any temp references it closed
    /// over.
    pub fn add_custom<F>(&mut self, f: F)
    where
        F: FnOnce(&mut World, &TempResolver) -> Result<()> + Send + 'static,
    {
        self.commands.push(Command::Mutate(Box::new(f)));
    }

    /// Applies every recorded command to `world`, in insertion order. A failing command is
    /// logged and skipped rather than aborting the rest of the buffer; later commands that
    /// reference a failed `create` silently no-op. Command buffers produced by observers
    /// triggered during application are drained iteratively, not recursively.
    pub fn apply(&mut self, world: &mut World) -> Result<()> {
        let mut resolved: FxHashMap<u32, Option<Entity>> = FxHashMap::default();
        let mut queue: VecDeque<Command> = self.commands.drain(..).collect();

        while let Some(command) = queue.pop_front() {
            match command {
                Command::Create(id) => {
                    let entity = world.create();
                    resolved.insert(id, Some(entity));
                }
                Command::Destroy(target) => {
                    let resolver = TempResolver {
                        resolved: &resolved,
                    };
                    if let Some(entity) = resolver.resolve(target) {
                        if let Err(err) = world.destroy(entity) {
                            tracing::warn!(error = %err, entity = %entity, "destroy command failed");
                        }
                    }
                }
                Command::Mutate(mutation) => {
                    let resolver = TempResolver {
                        resolved: &resolved,
                    };
                    if let Err(err) = mutation(world, &resolver) {
                        tracing::warn!(error = %err, "command failed, skipping");
                    }
                }
            }
        }

        self.next_temp = 0;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
        self.next_temp = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, Clone)]
    struct Marker;

    #[test]
    fn empty_buffer_applies_cleanly() {
        let mut buffer = CommandBuffer::new();
        assert!(buffer.is_empty());
        let mut world = World::new();
        buffer.apply(&mut world).unwrap();
    }

    #[test]
    fn create_then_add_resolves_temp_reference() {
        let mut buffer = CommandBuffer::new();
        let temp = buffer.create();
        buffer.add(temp, Marker);
        let mut world = World::new();
        buffer.apply(&mut world).unwrap();
        assert_eq!(world.len(), 1);
    }

    #[test]
    fn destroy_removes_entity() {
        let mut world = World::new();
        let e = world.create();
        let mut buffer = CommandBuffer::new();
        buffer.destroy(e);
        buffer.apply(&mut world).unwrap();
        assert!(!world.contains(e));
    }
}

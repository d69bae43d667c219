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

//! Entity identifiers and the pool that allocates, recycles and locates them.

use std::collections::VecDeque;

use crate::archetype::ArchetypeId;

/// A generational handle identifying a slot in the [`EntityPool`].
///
/// Alive iff the pool slot at `index` currently stores `generation`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    pub index: u32,
    pub generation: u32,
}

impl Entity {
    /// Sentinel meaning "no entity". Never returned by [`EntityPool::create`].
    pub const NONE: Entity = Entity {
        index: u32::MAX,
        generation: u32::MAX,
    };

    pub fn is_none(&self) -> bool {
        *self == Entity::NONE
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({}#{})", self.index, self.generation)
    }
}

#[derive(Clone, Debug)]
struct Entry {
    generation: u32,
    archetype: ArchetypeId,
    /// `false` while the slot sits in the free queue.
    alive: bool,
}

/// Manages the creation and destruction of entity identifiers, and stores the archetype each
/// live entity currently belongs to.
#[derive(Clone, Debug, Default)]
pub struct EntityPool {
    entries: Vec<Entry>,
    free: VecDeque<u32>,
}

impl EntityPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new entity on the given archetype, reusing a free slot (bumping its
    /// generation) when one is available, otherwise appending a new slot.
    pub fn create(&mut self, archetype: ArchetypeId) -> Entity {
        if let Some(index) = self.free.pop_front() {
            let entry = &mut self.entries[index as usize];
            entry.archetype = archetype;
            entry.alive = true;
            Entity {
                index,
                generation: entry.generation,
            }
        } else {
            let index = self.entries.len() as u32;
            self.entries.push(Entry {
                generation: 0,
                archetype,
                alive: true,
            });
            Entity {
                index,
                generation: 0,
            }
        }
    }

    /// Removes an entity from the world, incrementing its generation and freeing the slot.
    /// The caller must have already dropped all component/relation data for it.
    pub fn destroy(&mut self, index: u32) {
        let entry = &mut self.entries[index as usize];
        entry.alive = false;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push_back(index);
    }

    /// Changes the archetype of a live entity index.
    pub fn set_archetype(&mut self, index: u32, archetype: ArchetypeId) {
        self.entries[index as usize].archetype = archetype;
    }

    /// Current archetype of a live entity index.
    pub fn archetype(&self, index: u32) -> ArchetypeId {
        self.entries[index as usize].archetype
    }

    /// Current generation of an entity index, alive or not.
    pub fn generation(&self, index: u32) -> u32 {
        self.entries
            .get(index as usize)
            .map(|e| e.generation)
            .unwrap_or(u32::MAX)
    }

    /// Whether `entity` is alive: its index is in range and its generation matches.
    pub fn contains(&self, entity: Entity) -> bool {
        self.entries
            .get(entity.index as usize)
            .is_some_and(|e| e.alive && e.generation == entity.generation)
    }

    /// Number of currently alive entities.
    pub fn len(&self) -> usize {
        self.entries.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates every currently alive entity, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entries.iter().enumerate().filter_map(|(i, e)| {
            e.alive.then_some(Entity {
                index: i as u32,
                generation: e.generation,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_destroy_roundtrip() {
        let mut pool = EntityPool::new();
        let e = pool.create(ArchetypeId::EMPTY);
        assert!(pool.contains(e));
        pool.destroy(e.index);
        assert!(!pool.contains(e));
    }

    #[test]
    fn reused_slot_bumps_generation() {
        let mut pool = EntityPool::new();
        let e1 = pool.create(ArchetypeId::EMPTY);
        pool.destroy(e1.index);
        let e2 = pool.create(ArchetypeId::EMPTY);
        assert_eq!(e1.index, e2.index);
        assert_ne!(e1.generation, e2.generation);
        assert!(!pool.contains(e1));
        assert!(pool.contains(e2));
    }

    #[test]
    fn archetype_tracking() {
        let mut pool = EntityPool::new();
        let e = pool.create(ArchetypeId::EMPTY);
        let other = ArchetypeId(7);
        pool.set_archetype(e.index, other);
        assert_eq!(pool.archetype(e.index), other);
    }
}

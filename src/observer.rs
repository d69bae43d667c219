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

//! Observers react to changes in an entity's column set.
//!
//! Each observer is scoped to one `(column, event)` pair and runs with its own command buffer;
//! the emitted commands are applied before the next observer for the same event runs, so
//! observer ordering is directly observable. Observers may themselves trigger further observers;
//! this is bounded by [`Config::observer_recursion_limit`](crate::config::Config).

use rustc_hash::FxHashMap;

use crate::archetype::ColumnId;
use crate::command::CommandBuffer;
use crate::entity::Entity;
use crate::error::{EcsError, Result};
use crate::world::World;

/// Which structural change an observer reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObserverEvent {
    OnAdd,
    OnRemove,
    OnRelated,
    OnUnrelated,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u32);

type ObserverFn = Box<dyn FnMut(&mut World, Entity, &mut CommandBuffer) + Send>;

struct Registered {
    id: ObserverId,
    callback: ObserverFn,
}

/// Stores observer callbacks keyed by `(column, event)` and enforces the recursion limit.
#[derive(Default)]
pub struct ObserverRegistry {
    next_id: u32,
    by_key: FxHashMap<(ColumnId, ObserverEvent), Vec<Registered>>,
    depth: usize,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` to run whenever `event` fires for `column`. Returns an id usable
    /// with [`unhook`](Self::unhook).
    pub fn hook<F>(&mut self, event: ObserverEvent, column: ColumnId, callback: F) -> ObserverId
    where
        F: FnMut(&mut World, Entity, &mut CommandBuffer) + Send + 'static,
    {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.by_key
            .entry((column, event))
            .or_default()
            .push(Registered {
                id,
                callback: Box::new(callback),
            });
        id
    }

    pub fn unhook(&mut self, id: ObserverId) {
        for observers in self.by_key.values_mut() {
            observers.retain(|r| r.id != id);
        }
    }

    /// Runs every observer hooked to `(column, event)`, in registration order, for `entity`.
    /// Each observer's emitted commands are applied to `world` before the next observer runs.
    pub fn notify(
        &mut self,
        world: &mut World,
        event: ObserverEvent,
        column: ColumnId,
        entity: Entity,
        recursion_limit: usize,
    ) -> Result<()> {
        if self
            .by_key
            .get(&(column, event))
            .map(|v| v.is_empty())
            .unwrap_or(true)
        {
            return Ok(());
        }

        if self.depth >= recursion_limit {
            return Err(EcsError::ObserverRecursionLimitExceeded {
                limit: recursion_limit,
            });
        }
        self.depth += 1;

        // Callbacks are taken out one at a time and put back, so the registry can be re-entered
        // by a nested notification triggered from within a callback.
        let count = self
            .by_key
            .get(&(column, event))
            .map(|v| v.len())
            .unwrap_or(0);
        for i in 0..count {
            let mut callback = {
                let list = self.by_key.get_mut(&(column, event));
                match list.and_then(|l| l.get_mut(i)) {
                    Some(r) => std::mem::replace(&mut r.callback, Box::new(|_, _, _| {})),
                    None => continue,
                }
            };

            let mut buffer = CommandBuffer::new();
            callback(world, entity, &mut buffer);
            let result = buffer.apply(world);

            if let Some(list) = self.by_key.get_mut(&(column, event)) {
                if let Some(r) = list.get_mut(i) {
                    r.callback = callback;
                }
            }
            result?;
        }

        self.depth -= 1;
        Ok(())
    }

    pub fn observer_count(&self) -> usize {
        self.by_key.values().map(|v| v.len()).sum()
    }
}

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

//! System trait and statically-computed access metadata.
//!
//! A system observes the world immutably and records intended mutations into a
//! [`CommandBuffer`]; the scheduler applies that buffer once the system returns. This keeps
//! conflict detection a pure function of each system's declared [`SystemAccess`] rather than a
//! property of what it does at runtime.

use std::any::TypeId;

use crate::command::CommandBuffer;
use crate::error::Result;
use crate::world::World;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SystemId(pub(crate) u32);

/// Declared read/write access of one system, computed from its query and resource arguments when
/// it is registered with a [`Schedule`](crate::schedule::Schedule).
#[derive(Debug, Clone, Default)]
pub struct SystemAccess {
    pub reads: Vec<TypeId>,
    pub writes: Vec<TypeId>,
    /// Set for a system that captures the whole world; conflicts with everything.
    pub whole_world: bool,
}

impl SystemAccess {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn whole_world() -> Self {
        Self {
            whole_world: true,
            ..Self::default()
        }
    }

    pub fn read<T: 'static>(mut self) -> Self {
        self.reads.push(TypeId::of::<T>());
        self
    }

    pub fn write<T: 'static>(mut self) -> Self {
        self.writes.push(TypeId::of::<T>());
        self
    }

    /// True if running `self` and `other` in either order could observe different results: a
    /// write overlapping either side's accesses, or either side claiming the whole world.
    pub fn conflicts_with(&self, other: &SystemAccess) -> bool {
        if self.whole_world || other.whole_world {
            return true;
        }
        self.writes
            .iter()
            .any(|w| other.writes.contains(w) || other.reads.contains(w))
            || self.reads.iter().any(|r| other.writes.contains(r))
    }
}

/// A schedulable unit of frame logic.
pub trait System: Send + Sync {
    fn name(&self) -> &str;
    fn access(&self) -> SystemAccess;
    fn run(&mut self, world: &World, commands: &mut CommandBuffer) -> Result<()>;
}

pub type BoxedSystem = Box<dyn System>;

/// Adapts a plain closure plus its declared name and access into a [`System`], so callers don't
/// need to hand-write a struct for every system.
pub struct FnSystem<F> {
    name: &'static str,
    access: SystemAccess,
    func: F,
}

impl<F> FnSystem<F>
where
    F: FnMut(&World, &mut CommandBuffer) -> Result<()> + Send + Sync + 'static,
{
    pub fn new(name: &'static str, access: SystemAccess, func: F) -> Self {
        Self { name, access, func }
    }

    pub fn boxed(name: &'static str, access: SystemAccess, func: F) -> BoxedSystem {
        Box::new(Self::new(name, access, func))
    }
}

impl<F> System for FnSystem<F>
where
    F: FnMut(&World, &mut CommandBuffer) -> Result<()> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        self.name
    }

    fn access(&self) -> SystemAccess {
        self.access.clone()
    }

    fn run(&mut self, world: &World, commands: &mut CommandBuffer) -> Result<()> {
        (self.func)(world, commands)
    }
}

/// A run-condition, evaluated before its system(s) and cached per frame by [`ConditionId`] so a
/// condition shared by many systems runs once.
pub type ConditionFn = Box<dyn FnMut(&World) -> bool + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConditionId(pub(crate) u32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_write_conflicts() {
        let a = SystemAccess::empty().write::<i32>();
        let b = SystemAccess::empty().write::<i32>();
        assert!(a.conflicts_with(&b));
    }

    #[test]
    fn read_read_does_not_conflict() {
        let a = SystemAccess::empty().read::<i32>();
        let b = SystemAccess::empty().read::<i32>();
        assert!(!a.conflicts_with(&b));
    }

    #[test]
    fn write_read_conflicts() {
        let a = SystemAccess::empty().write::<i32>();
        let b = SystemAccess::empty().read::<i32>();
        assert!(a.conflicts_with(&b));
    }

    #[test]
    fn whole_world_conflicts_with_anything() {
        let a = SystemAccess::whole_world();
        let b = SystemAccess::empty();
        assert!(a.conflicts_with(&b));
    }
}

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

//! System registry and scheduler: resolves ordering constraints and tags into a total order,
//! then runs systems each frame, applying each one's command buffer before the next starts.

use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};

use rustc_hash::FxHashMap;

use crate::command::CommandBuffer;
use crate::config::AmbiguityPolicy;
use crate::error::{EcsError, Result};
use crate::system::{BoxedSystem, ConditionFn, ConditionId, SystemAccess, SystemId};
use crate::world::World;

/// Something an ordering constraint can point at.
#[derive(Clone, Debug)]
pub enum OrderTarget {
    System(String),
    Tag(String),
}

impl From<&str> for OrderTarget {
    fn from(name: &str) -> Self {
        OrderTarget::System(name.to_string())
    }
}

impl From<String> for OrderTarget {
    fn from(name: String) -> Self {
        OrderTarget::System(name)
    }
}

/// Names a tag rather than a system for use as an ordering target.
pub fn tag(name: impl Into<String>) -> OrderTarget {
    OrderTarget::Tag(name.into())
}

/// Before/after constraints attached to a tag itself, inherited transitively by every system
/// carrying that tag.
#[derive(Default)]
struct TagConstraints {
    before: Vec<OrderTarget>,
    after: Vec<OrderTarget>,
}

struct SystemEntry {
    name: String,
    system: BoxedSystem,
    access: SystemAccess,
    before: Vec<OrderTarget>,
    after: Vec<OrderTarget>,
    tags: Vec<String>,
    conditions: Vec<ConditionId>,
}

/// Registered systems, conditions and tags, plus the cached execution order derived from them.
pub struct Schedule {
    entries: Vec<SystemEntry>,
    conditions: Vec<ConditionFn>,
    tags: FxHashMap<String, TagConstraints>,
    order: Option<Vec<usize>>,
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new()
    }
}

impl Schedule {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            conditions: Vec::new(),
            tags: FxHashMap::default(),
            order: None,
        }
    }

    /// Registers a system, computing its access set up front. Returns an id for attaching
    /// ordering constraints, tags and run-conditions.
    pub fn add_system(&mut self, system: BoxedSystem) -> SystemId {
        let id = SystemId(self.entries.len() as u32);
        let name = system.name().to_string();
        let access = system.access();
        self.entries.push(SystemEntry {
            name,
            system,
            access,
            before: Vec::new(),
            after: Vec::new(),
            tags: Vec::new(),
            conditions: Vec::new(),
        });
        self.invalidate();
        id
    }

    pub fn before(&mut self, id: SystemId, target: impl Into<OrderTarget>) -> &mut Self {
        self.entry_mut(id).before.push(target.into());
        self.invalidate();
        self
    }

    pub fn after(&mut self, id: SystemId, target: impl Into<OrderTarget>) -> &mut Self {
        self.entry_mut(id).after.push(target.into());
        self.invalidate();
        self
    }

    /// Attaches `name` to a system; tags compose transitively with the system's own constraints.
    pub fn tag(&mut self, id: SystemId, name: impl Into<String>) -> &mut Self {
        self.entry_mut(id).tags.push(name.into());
        self.invalidate();
        self
    }

    /// Constrains every system carrying `tag_name`, present or future, to run before `target`.
    pub fn tag_before(&mut self, tag_name: impl Into<String>, target: impl Into<OrderTarget>) -> &mut Self {
        self.tags
            .entry(tag_name.into())
            .or_default()
            .before
            .push(target.into());
        self.invalidate();
        self
    }

    /// Constrains every system carrying `tag_name`, present or future, to run after `target`.
    pub fn tag_after(&mut self, tag_name: impl Into<String>, target: impl Into<OrderTarget>) -> &mut Self {
        self.tags
            .entry(tag_name.into())
            .or_default()
            .after
            .push(target.into());
        self.invalidate();
        self
    }

    /// Registers a run-condition, returning an id other systems can share so it evaluates once
    /// per frame regardless of how many systems depend on it.
    pub fn add_condition(&mut self, condition: ConditionFn) -> ConditionId {
        let id = ConditionId(self.conditions.len() as u32);
        self.conditions.push(condition);
        id
    }

    pub fn run_if(&mut self, id: SystemId, condition: ConditionId) -> &mut Self {
        self.entry_mut(id).conditions.push(condition);
        self
    }

    pub fn system_count(&self) -> usize {
        self.entries.len()
    }

    fn entry_mut(&mut self, id: SystemId) -> &mut SystemEntry {
        &mut self.entries[id.0 as usize]
    }

    fn invalidate(&mut self) {
        self.order = None;
    }

    fn index_of_name(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    fn resolve_target(&self, target: &OrderTarget) -> Vec<usize> {
        match target {
            OrderTarget::System(name) => self.index_of_name(name).into_iter().collect(),
            OrderTarget::Tag(name) => self
                .entries
                .iter()
                .enumerate()
                .filter(|(_, e)| e.tags.iter().any(|t| t == name))
                .map(|(i, _)| i)
                .collect(),
        }
    }

    /// Resolves tags and ordering constraints into a directed "must run before" graph, detects
    /// cycles, and computes a deterministic topological order tie-broken by registration order.
    /// Also runs the one-time ambiguity check over conflicting, unordered pairs.
    pub fn build(&mut self, ambiguity: AmbiguityPolicy) -> Result<()> {
        let n = self.entries.len();
        let mut edges: Vec<Vec<usize>> = vec![Vec::new(); n];

        for i in 0..n {
            let mut before_targets: Vec<usize> = self.entries[i]
                .before
                .iter()
                .flat_map(|t| self.resolve_target(t))
                .collect();
            let mut after_targets: Vec<usize> = self.entries[i]
                .after
                .iter()
                .flat_map(|t| self.resolve_target(t))
                .collect();

            for tag_name in &self.entries[i].tags {
                if let Some(constraints) = self.tags.get(tag_name) {
                    before_targets.extend(constraints.before.iter().flat_map(|t| self.resolve_target(t)));
                    after_targets.extend(constraints.after.iter().flat_map(|t| self.resolve_target(t)));
                }
            }

            for j in before_targets {
                if j != i {
                    edges[i].push(j);
                }
            }
            for j in after_targets {
                if j != i {
                    edges[j].push(i);
                }
            }
        }
        for list in &mut edges {
            list.sort_unstable();
            list.dedup();
        }

        let mut in_degree = vec![0usize; n];
        for list in &edges {
            for &j in list {
                in_degree[j] += 1;
            }
        }

        let mut remaining = in_degree;
        let mut ready: BTreeSet<usize> = (0..n).filter(|&i| remaining[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(&next) = ready.iter().next() {
            ready.remove(&next);
            order.push(next);
            for &j in &edges[next] {
                remaining[j] -= 1;
                if remaining[j] == 0 {
                    ready.insert(j);
                }
            }
        }

        if order.len() != n {
            return Err(EcsError::SchedulerCycle);
        }

        self.check_ambiguities(&edges, ambiguity)?;
        self.order = Some(order);
        Ok(())
    }

    /// Two conflicting systems with no path between them in the constraint graph have an
    /// unspecified relative order, reported per the configured [`AmbiguityPolicy`].
    fn check_ambiguities(&self, edges: &[Vec<usize>], policy: AmbiguityPolicy) -> Result<()> {
        let n = self.entries.len();
        let mut reachable = vec![vec![false; n]; n];
        for start in 0..n {
            let mut stack = edges[start].clone();
            while let Some(node) = stack.pop() {
                if !reachable[start][node] {
                    reachable[start][node] = true;
                    stack.extend(edges[node].iter().copied());
                }
            }
        }

        for i in 0..n {
            for j in (i + 1)..n {
                if !self.entries[i].access.conflicts_with(&self.entries[j].access) {
                    continue;
                }
                if reachable[i][j] || reachable[j][i] {
                    continue;
                }
                let (system_a, system_b) = (self.entries[i].name.clone(), self.entries[j].name.clone());
                match policy {
                    AmbiguityPolicy::Warn => {
                        tracing::warn!(system_a = %system_a, system_b = %system_b, "systems conflict with no declared order");
                    }
                    AmbiguityPolicy::Error => {
                        return Err(EcsError::AmbiguousOrder { system_a, system_b });
                    }
                }
            }
        }
        Ok(())
    }

    /// Runs every system once in dependency order. Each system's run-conditions are evaluated
    /// (and cached for this call by [`ConditionId`]); a panicking system is logged and the rest of
    /// the frame still runs. Each system's command buffer is applied immediately after it
    /// returns, which also drains any observer-triggered buffers nested within that application.
    pub fn run(&mut self, world: &mut World) -> Result<()> {
        if self.order.is_none() {
            self.build(world.config().scheduler_ambiguity)?;
        }
        let order = self.order.clone().expect("just built");

        let mut condition_cache: FxHashMap<ConditionId, bool> = FxHashMap::default();

        for index in order {
            let should_run = {
                let conditions = &self.entries[index].conditions;
                let mut should_run = true;
                for &cond_id in conditions {
                    let cached = condition_cache.get(&cond_id).copied();
                    let result = match cached {
                        Some(value) => value,
                        None => {
                            let value = (self.conditions[cond_id.0 as usize])(&*world);
                            condition_cache.insert(cond_id, value);
                            value
                        }
                    };
                    if !result {
                        should_run = false;
                        break;
                    }
                }
                should_run
            };
            if !should_run {
                continue;
            }

            let mut buffer = CommandBuffer::new();
            let entry = &mut self.entries[index];
            let name = entry.name.clone();
            let system = &mut entry.system;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| system.run(&*world, &mut buffer)));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(err)) => tracing::warn!(system = %name, error = %err, "system returned an error"),
                Err(_) => tracing::error!(system = %name, "system panicked"),
            }
            buffer.apply(world)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::FnSystem;

    fn noop(name: &'static str) -> BoxedSystem {
        FnSystem::boxed(name, SystemAccess::empty(), |_, _| Ok(()))
    }

    #[test]
    fn systems_run_in_registration_order_when_unconstrained() {
        use std::sync::{Arc, Mutex};
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut schedule = Schedule::new();
        for name in ["a", "b", "c"] {
            let log = log.clone();
            schedule.add_system(FnSystem::boxed(name, SystemAccess::empty(), move |_, _| {
                log.lock().unwrap().push(name);
                Ok(())
            }));
        }
        let mut world = World::new();
        schedule.run(&mut world).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn after_constraint_reorders_execution() {
        use std::sync::{Arc, Mutex};
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut schedule = Schedule::new();
        {
            let log = log.clone();
            schedule.add_system(FnSystem::boxed("first", SystemAccess::empty(), move |_, _| {
                log.lock().unwrap().push("first");
                Ok(())
            }));
        }
        let second = {
            let log = log.clone();
            schedule.add_system(FnSystem::boxed("second", SystemAccess::empty(), move |_, _| {
                log.lock().unwrap().push("second");
                Ok(())
            }))
        };
        schedule.after(second, "first");

        let mut world = World::new();
        schedule.run(&mut world).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn cyclic_constraint_is_rejected() {
        let mut schedule = Schedule::new();
        let a = schedule.add_system(noop("a"));
        let b = schedule.add_system(noop("b"));
        schedule.before(a, "b");
        schedule.before(b, "a");
        let mut world = World::new();
        assert_eq!(schedule.run(&mut world), Err(EcsError::SchedulerCycle));
    }

    #[test]
    fn ambiguous_conflict_errors_under_error_policy() {
        let mut schedule = Schedule::new();
        schedule.add_system(FnSystem::boxed(
            "writer-a",
            SystemAccess::empty().write::<i32>(),
            |_, _| Ok(()),
        ));
        schedule.add_system(FnSystem::boxed(
            "writer-b",
            SystemAccess::empty().write::<i32>(),
            |_, _| Ok(()),
        ));
        let err = schedule.build(AmbiguityPolicy::Error).unwrap_err();
        assert!(matches!(err, EcsError::AmbiguousOrder { .. }));
    }

    #[test]
    fn run_condition_is_cached_across_systems_in_one_frame() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let calls = Arc::new(AtomicUsize::new(0));
        let mut schedule = Schedule::new();
        let calls_clone = calls.clone();
        let condition = schedule.add_condition(Box::new(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            true
        }));
        let a = schedule.add_system(noop("a"));
        let b = schedule.add_system(noop("b"));
        schedule.run_if(a, condition);
        schedule.run_if(b, condition);

        let mut world = World::new();
        schedule.run(&mut world).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_system_does_not_stop_later_systems() {
        use std::sync::{Arc, Mutex};
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut schedule = Schedule::new();
        schedule.add_system(FnSystem::boxed("boom", SystemAccess::empty(), |_, _| {
            panic!("intentional");
        }));
        let log_clone = log.clone();
        schedule.add_system(FnSystem::boxed("after-boom", SystemAccess::empty(), move |_, _| {
            log_clone.lock().unwrap().push("ran");
            Ok(())
        }));

        let mut world = World::new();
        schedule.run(&mut world).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["ran"]);
    }
}

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

//! Parent/child structure expressed as a built-in tree relation rather than `Parent`/`Children`
//! components, so attaching and detaching reuses the forest cycle-detection the relation table
//! already provides instead of re-implementing it here.

use crate::entity::Entity;
use crate::error::Result;
use crate::world::World;

/// Marker relation type: `relate(child, parent, ChildOf)` means `child`'s parent is `parent`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChildOf;

/// Attaches `child` under `parent`, replacing any prior parent of `child`. Registers `ChildOf`
/// as a tree relation on first use. Errors if this would create a cycle.
pub fn attach(world: &mut World, child: Entity, parent: Entity) -> Result<()> {
    world.register_tree_relation::<ChildOf>();
    world.relate(child, parent, ChildOf)
}

/// Detaches `child` from its current parent, if any. A no-op if `child` has no parent.
pub fn detach(world: &mut World, child: Entity) -> Result<()> {
    match parent_of(world, child) {
        Some(parent) => world.unrelate::<ChildOf>(child, parent),
        None => Ok(()),
    }
}

/// The direct parent of `entity`, if attached to one.
pub fn parent_of(world: &World, entity: Entity) -> Option<Entity> {
    let ty = world.types().id_of::<ChildOf>()?;
    world.relations().outgoing(ty, entity).next().map(|(to, _)| to)
}

/// The direct children of `entity`, in no particular order.
pub fn children_of(world: &World, entity: Entity) -> Vec<Entity> {
    let Some(ty) = world.types().id_of::<ChildOf>() else {
        return Vec::new();
    };
    world.relations().incoming(ty, entity).map(|(from, _)| from).collect()
}

/// Walks from `entity` up through successive parents to the root of its tree.
pub fn ancestors(world: &World, entity: Entity) -> Vec<Entity> {
    let mut result = Vec::new();
    let mut current = entity;
    while let Some(parent) = parent_of(world, current) {
        result.push(parent);
        current = parent;
    }
    result
}

/// Every descendant of `entity`, breadth-first, nearest generation first. Does not include
/// `entity` itself.
pub fn descendants(world: &World, entity: Entity) -> Vec<Entity> {
    let Some(ty) = world.types().id_of::<ChildOf>() else {
        return Vec::new();
    };
    world
        .relations()
        .recompute_depths(ty, entity)
        .into_iter()
        .skip(1)
        .map(|(index, _)| Entity {
            index,
            generation: world.generation(index),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attach_then_parent_and_children_agree() {
        let mut world = World::new();
        let parent = world.create();
        let child = world.create();
        attach(&mut world, child, parent).unwrap();

        assert_eq!(parent_of(&world, child), Some(parent));
        assert_eq!(children_of(&world, parent), vec![child]);
    }

    #[test]
    fn reattaching_replaces_old_parent() {
        let mut world = World::new();
        let first = world.create();
        let second = world.create();
        let child = world.create();
        attach(&mut world, child, first).unwrap();
        attach(&mut world, child, second).unwrap();

        assert_eq!(parent_of(&world, child), Some(second));
        assert!(children_of(&world, first).is_empty());
    }

    #[test]
    fn detach_clears_parent() {
        let mut world = World::new();
        let parent = world.create();
        let child = world.create();
        attach(&mut world, child, parent).unwrap();
        detach(&mut world, child).unwrap();

        assert_eq!(parent_of(&world, child), None);
        assert!(children_of(&world, parent).is_empty());
    }

    #[test]
    fn cycle_is_rejected() {
        let mut world = World::new();
        let a = world.create();
        let b = world.create();
        attach(&mut world, b, a).unwrap();
        assert!(attach(&mut world, a, b).is_err());
    }

    #[test]
    fn ancestors_walks_to_root() {
        let mut world = World::new();
        let grandparent = world.create();
        let parent = world.create();
        let child = world.create();
        attach(&mut world, parent, grandparent).unwrap();
        attach(&mut world, child, parent).unwrap();

        assert_eq!(ancestors(&world, child), vec![parent, grandparent]);
    }

    #[test]
    fn descendants_collects_whole_subtree() {
        let mut world = World::new();
        let root = world.create();
        let mid = world.create();
        let leaf = world.create();
        attach(&mut world, mid, root).unwrap();
        attach(&mut world, leaf, mid).unwrap();

        let mut found = descendants(&world, root);
        found.sort_by_key(|e| e.index);
        let mut expected = vec![mid, leaf];
        expected.sort_by_key(|e| e.index);
        assert_eq!(found, expected);
    }
}

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

//! Declarative query engine.
//!
//! A query is a conjunction over one or two bound entity targets of `With`/`Without`/`Optional`
//! clauses and, for two-target queries, a `Relation` clause joining them. Compilation produces an
//! [`ArchetypeNode`] per target, incrementally updated by [`ArchetypeGraph::collect`] so newly
//! created archetypes are picked up without rebuilding the query, and for relation queries the
//! join walks from whichever endpoint is cheaper to enumerate.

use std::collections::HashSet;

use crate::archetype::{ArchetypeGraph, ArchetypeId, ColumnId};
use crate::entity::Entity;
use crate::types::DataTypeId;
use crate::world::World;

/// Enumerates archetypes matching a conjunction of `with`/`without` column constraints for one
/// query target, picking up newly discovered archetypes via a remembered cursor.
pub struct ArchetypeNode {
    with_cols: Vec<ColumnId>,
    without_cols: Vec<ColumnId>,
    matches: Vec<ArchetypeId>,
    cursor: usize,
}

impl ArchetypeNode {
    pub fn new(with_cols: Vec<ColumnId>, without_cols: Vec<ColumnId>) -> Self {
        Self {
            with_cols,
            without_cols,
            matches: Vec::new(),
            cursor: 0,
        }
    }

    /// Re-synchronises `matches` against every archetype discovered since the last call. `collect`
    /// enumerates supersets of the empty archetype (i.e. everything new), so only the
    /// `with`/`without` filter below is needed to narrow that down.
    pub fn update(&mut self, graph: &ArchetypeGraph) {
        let mut candidates = Vec::new();
        self.cursor = graph.collect(ArchetypeId::EMPTY, &mut candidates, self.cursor);
        for candidate in candidates {
            if self.with_cols.iter().all(|c| graph.contains(candidate, *c))
                && self.without_cols.iter().all(|c| !graph.contains(candidate, *c))
            {
                self.matches.push(candidate);
            }
        }
    }

    /// Upper-bound row-count estimate used by the planner to pick join order: the number of
    /// matching archetypes stands in for true row counts, since exact counts require visiting
    /// every table.
    pub fn estimate(&self) -> usize {
        self.matches.len()
    }

    pub fn archetypes(&self) -> &[ArchetypeId] {
        &self.matches
    }
}

/// One matched row: present components are guaranteed, `Optional` ones may be absent.
pub struct Row<'w> {
    world: &'w World,
    archetype: ArchetypeId,
    row: usize,
}

impl<'w> Row<'w> {
    pub fn entity(&self) -> Entity {
        let table = self
            .world
            .tables()
            .get(self.archetype)
            .expect("matched archetype has a table");
        let index = table.entity_index_at(self.row);
        Entity {
            index,
            generation: self.world.generation(index),
        }
    }

    pub fn get<T: crate::component::Component>(&self) -> Option<&'w T> {
        let ty = self.world.types().id_of::<T>()?;
        let col = ColumnId::make(ty);
        let table = self.world.tables().get(self.archetype)?;
        let ptr = table.row_ptr(col, self.row)?;
        Some(unsafe { &*(ptr as *const T) })
    }
}

/// A single-target query: every entity whose archetype satisfies the `With`/`Without` clauses.
pub struct Query {
    node: ArchetypeNode,
}

impl Query {
    pub fn new() -> QueryBuilder {
        QueryBuilder::default()
    }

    /// Re-synchronises against archetypes created since the query was last run.
    pub fn update(&mut self, world: &World) {
        self.node.update(world.archetype_graph());
    }

    /// Iterates every matching row. Structural mutation of `world` during iteration is forbidden;
    /// route mutations through a [`CommandBuffer`](crate::command::CommandBuffer) instead.
    pub fn iter<'w>(&'w self, world: &'w World) -> impl Iterator<Item = Row<'w>> + 'w {
        self.node.archetypes().iter().flat_map(move |&archetype| {
            let len = world.tables().get(archetype).map(|t| t.len()).unwrap_or(0);
            (0..len).map(move |row| Row {
                world,
                archetype,
                row,
            })
        })
    }

    pub fn estimate(&self) -> usize {
        self.node.estimate()
    }

    /// Splits matched archetypes across the rayon global pool and runs `f` over every row,
    /// one archetype per task. Ordering across archetypes is not guaranteed; within an archetype
    /// rows are visited in table order.
    #[cfg(feature = "parallel")]
    pub fn par_for_each<F>(&self, world: &World, f: F)
    where
        F: Fn(Row) + Sync + Send,
    {
        use rayon::prelude::*;

        self.node.archetypes().par_iter().for_each(|&archetype| {
            let len = world.tables().get(archetype).map(|t| t.len()).unwrap_or(0);
            for row in 0..len {
                f(Row { world, archetype, row });
            }
        });
    }
}

#[derive(Default)]
pub struct QueryBuilder {
    with_cols: Vec<ColumnId>,
    without_cols: Vec<ColumnId>,
}

impl QueryBuilder {
    pub fn with<T: crate::component::Component>(mut self, world: &mut World) -> Self {
        let ty = world.register_component::<T>();
        self.with_cols.push(ColumnId::make(ty));
        self
    }

    pub fn without<T: crate::component::Component>(mut self, world: &mut World) -> Self {
        let ty = world.register_component::<T>();
        self.without_cols.push(ColumnId::make(ty));
        self
    }

    pub fn build(self) -> Query {
        Query {
            node: ArchetypeNode::new(self.with_cols, self.without_cols),
        }
    }
}

/// A two-target query joined by a relation: `Relation(type, from, to)`.
///
/// The `from` and `to` archetype nodes are each intersected against the sparse relation table, by
/// walking whichever endpoint's node has the smaller [`ArchetypeNode::estimate`].
pub struct RelationQuery {
    data_type: DataTypeId,
    from: ArchetypeNode,
    to: ArchetypeNode,
}

impl RelationQuery {
    pub fn new(data_type: DataTypeId, from: ArchetypeNode, to: ArchetypeNode) -> Self {
        Self { data_type, from, to }
    }

    pub fn update(&mut self, world: &World) {
        self.from.update(world.archetype_graph());
        self.to.update(world.archetype_graph());
    }

    /// Iterates `(from_entity, to_entity, relation_bytes)` triples satisfying both endpoint
    /// constraints, walking from whichever side has fewer candidate archetypes.
    pub fn iter<'w>(&'w self, world: &'w World) -> Vec<(Entity, Entity, &'w [u8])> {
        let from_set: HashSet<ArchetypeId> = self.from.archetypes().iter().copied().collect();
        let to_set: HashSet<ArchetypeId> = self.to.archetypes().iter().copied().collect();

        let mut results = Vec::new();
        if self.from.estimate() <= self.to.estimate() {
            for &archetype in self.from.archetypes() {
                let Some(table) = world.tables().get(archetype) else {
                    continue;
                };
                for row in 0..table.len() {
                    let index = table.entity_index_at(row);
                    let from_entity = Entity {
                        index,
                        generation: world.generation(index),
                    };
                    for (to_entity, value) in world.relations().outgoing(self.data_type, from_entity) {
                        if to_set.contains(&world.pool_archetype_of(to_entity)) {
                            results.push((from_entity, to_entity, value));
                        }
                    }
                }
            }
        } else {
            for &archetype in self.to.archetypes() {
                let Some(table) = world.tables().get(archetype) else {
                    continue;
                };
                for row in 0..table.len() {
                    let index = table.entity_index_at(row);
                    let to_entity = Entity {
                        index,
                        generation: world.generation(index),
                    };
                    for (from_entity, value) in world.relations().incoming(self.data_type, to_entity) {
                        if from_set.contains(&world.pool_archetype_of(from_entity)) {
                            results.push((from_entity, to_entity, value));
                        }
                    }
                }
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Position {
        x: f32,
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Velocity {
        dx: f32,
    }

    #[test]
    fn query_finds_matching_entities() {
        let mut world = World::new();
        let e1 = world.create();
        world.add(e1, Position { x: 1.0 }).unwrap();
        let e2 = world.create();
        world.add(e2, Position { x: 2.0 }).unwrap();
        world.add(e2, Velocity { dx: 9.0 }).unwrap();

        let mut query = Query::new().with::<Position>(&mut world).build();
        query.update(&world);
        let xs: Vec<f32> = query
            .iter(&world)
            .map(|row| row.get::<Position>().unwrap().x)
            .collect();
        assert_eq!(xs.len(), 2);
        assert!(xs.contains(&1.0));
        assert!(xs.contains(&2.0));
    }

    #[test]
    fn without_excludes_matching_archetype() {
        let mut world = World::new();
        let e1 = world.create();
        world.add(e1, Position { x: 1.0 }).unwrap();
        let e2 = world.create();
        world.add(e2, Position { x: 2.0 }).unwrap();
        world.add(e2, Velocity { dx: 9.0 }).unwrap();

        let mut query = Query::new()
            .with::<Position>(&mut world)
            .without::<Velocity>(&mut world)
            .build();
        query.update(&world);
        assert_eq!(query.iter(&world).count(), 1);
    }

    #[test]
    fn query_picks_up_archetypes_created_after_first_update() {
        let mut world = World::new();
        let mut query = Query::new().with::<Position>(&mut world).build();
        query.update(&world);
        assert_eq!(query.iter(&world).count(), 0);

        let e = world.create();
        world.add(e, Position { x: 3.0 }).unwrap();
        query.update(&world);
        assert_eq!(query.iter(&world).count(), 1);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn par_for_each_visits_every_matching_row() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let mut world = World::new();
        for i in 0..64 {
            let e = world.create();
            world.add(e, Position { x: i as f32 }).unwrap();
        }
        let mut query = Query::new().with::<Position>(&mut world).build();
        query.update(&world);

        let total = AtomicUsize::new(0);
        query.par_for_each(&world, |row| {
            total.fetch_add(row.get::<Position>().unwrap().x as usize, Ordering::Relaxed);
        });
        assert_eq!(total.load(Ordering::Relaxed), (0..64).sum::<usize>());
    }
}

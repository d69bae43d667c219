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

//! Sparse storage for relation triples, indexed so both endpoints can be queried.
//!
//! A relation table is keyed the way the engine this model is descended from keys its sparse
//! relation tables: by data type plus the archetype of each endpoint plus a tree depth (always 0
//! for non-tree relations). Three sub-kinds share this key shape: plain (asymmetric), symmetric
//! (endpoints canonicalised lower-index-first) and tree (each `from` has at most one outgoing
//! edge, forming a forest).

use rustc_hash::FxHashMap;

use crate::archetype::ArchetypeId;
use crate::entity::Entity;
use crate::error::{EcsError, Result};
use crate::types::{DataTypeId, TypeKind, TypeRegistry};

/// Key identifying one sparse relation table: a relation type plus the archetype of each
/// endpoint plus a tree depth.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SparseRelationTableId {
    pub data_type: DataTypeId,
    pub from_archetype: ArchetypeId,
    pub to_archetype: ArchetypeId,
    pub depth: u32,
}

struct Triple {
    from: Entity,
    to: Entity,
    value: Box<[u8]>,
    drop_fn: unsafe fn(*mut u8),
}

impl Triple {
    fn drop_value(&mut self) {
        if !self.value.is_empty() {
            unsafe {
                (self.drop_fn)(self.value.as_mut_ptr());
            }
        }
    }
}

impl Drop for Triple {
    fn drop(&mut self) {
        self.drop_value();
    }
}

/// One sparse table's triples plus the two secondary indices (`from` entity index -> row,
/// `to` entity index -> row) the join planner needs to estimate and walk either endpoint
/// without scanning every triple in the table.
#[derive(Default)]
struct RelationTable {
    triples: Vec<Triple>,
    by_from: FxHashMap<u32, Vec<usize>>,
    by_to: FxHashMap<u32, Vec<usize>>,
}

impl RelationTable {
    /// Recomputes both indices from `triples`. Called after any structural change (insert,
    /// retain-based removal, or a split during archetype migration) since row positions shift.
    fn rebuild_indices(&mut self) {
        self.by_from.clear();
        self.by_to.clear();
        for (row, triple) in self.triples.iter().enumerate() {
            self.by_from.entry(triple.from.index).or_default().push(row);
            self.by_to.entry(triple.to.index).or_default().push(row);
        }
    }

    fn rows_from(&self, index: u32) -> &[usize] {
        self.by_from.get(&index).map(Vec::as_slice).unwrap_or(&[])
    }

    fn rows_to(&self, index: u32) -> &[usize] {
        self.by_to.get(&index).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Owns every relation triple in the world, grouped into sparse tables by
/// [`SparseRelationTableId`].
#[derive(Default)]
pub struct SparseRelationTableRegistry {
    tables: FxHashMap<SparseRelationTableId, RelationTable>,
    /// Outgoing tree edge per `from` entity index, for cycle detection and depth recomputation.
    tree_parent: FxHashMap<(DataTypeId, u32), u32>,
    /// Children of a tree node, for breadth-first depth recomputation.
    tree_children: FxHashMap<(DataTypeId, u32), Vec<u32>>,
    /// Kind of each relation type ever inserted, so `outgoing`/`incoming` know whether a
    /// symmetric type's canonical triple must be matched from either endpoint.
    kinds: FxHashMap<DataTypeId, TypeKind>,
}

impl SparseRelationTableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn canonical_endpoints(
        kind: TypeKind,
        mut from: Entity,
        mut to: Entity,
    ) -> (Entity, Entity) {
        if kind == TypeKind::SymmetricRelation && from.index > to.index {
            std::mem::swap(&mut from, &mut to);
        }
        (from, to)
    }

    /// Inserts or replaces the triple `(from, type, to) -> value`. For tree relations, removes
    /// any prior outgoing edge of `from` first, and refuses insertions that would create a cycle.
    #[allow(clippy::too_many_arguments)]
    pub fn insert(
        &mut self,
        registry: &TypeRegistry,
        data_type: DataTypeId,
        from: Entity,
        to: Entity,
        from_archetype: ArchetypeId,
        to_archetype: ArchetypeId,
        value: Box<[u8]>,
    ) -> Result<()> {
        let kind = registry
            .kind(data_type)
            .ok_or(EcsError::UnknownType(data_type))?;
        self.kinds.insert(data_type, kind);

        if kind == TypeKind::TreeRelation {
            if self.would_create_cycle(data_type, from, to) {
                return Err(EcsError::CyclicRelation);
            }
            self.remove_outgoing_tree_edge(data_type, from);
            self.tree_parent.insert((data_type, from.index), to.index);
            self.tree_children
                .entry((data_type, to.index))
                .or_default()
                .push(from.index);
        }

        let (from, to) = Self::canonical_endpoints(kind, from, to);
        let drop_fn = registry
            .type_info(data_type)
            .ok_or(EcsError::UnknownType(data_type))?
            .drop_fn;
        let key = SparseRelationTableId {
            data_type,
            from_archetype,
            to_archetype,
            depth: 0,
        };
        let table = self.tables.entry(key).or_default();
        if let Some(existing) = table
            .triples
            .iter_mut()
            .find(|t| t.from == from && t.to == to)
        {
            existing.drop_value();
            existing.value = value;
        } else {
            table.triples.push(Triple {
                from,
                to,
                value,
                drop_fn,
            });
            table.rebuild_indices();
        }
        Ok(())
    }

    fn would_create_cycle(&self, data_type: DataTypeId, from: Entity, to: Entity) -> bool {
        let mut current = to.index;
        loop {
            if current == from.index {
                return true;
            }
            match self.tree_parent.get(&(data_type, current)) {
                Some(&parent) => current = parent,
                None => return false,
            }
        }
    }

    fn remove_outgoing_tree_edge(&mut self, data_type: DataTypeId, from: Entity) {
        if let Some(old_parent) = self.tree_parent.remove(&(data_type, from.index)) {
            if let Some(children) = self.tree_children.get_mut(&(data_type, old_parent)) {
                children.retain(|&c| c != from.index);
            }
        }
    }

    pub fn erase(&mut self, data_type: DataTypeId, kind: TypeKind, from: Entity, to: Entity) {
        let (from, to) = Self::canonical_endpoints(kind, from, to);
        if kind == TypeKind::TreeRelation {
            self.remove_outgoing_tree_edge(data_type, from);
        }
        self.tables.retain(|key, table| {
            if key.data_type != data_type {
                return true;
            }
            let before = table.triples.len();
            table.triples.retain(|t| !(t.from == from && t.to == to));
            if table.triples.len() != before {
                table.rebuild_indices();
            }
            true
        });
    }

    /// Removes every triple referencing `entity`, called on entity destruction.
    pub fn erase_any(&mut self, entity: Entity) {
        for table in self.tables.values_mut() {
            let before = table.triples.len();
            table
                .triples
                .retain(|t| t.from != entity && t.to != entity);
            if table.triples.len() != before {
                table.rebuild_indices();
            }
        }
        self.tree_parent.retain(|&(_, idx), _| idx != entity.index);
        for children in self.tree_children.values_mut() {
            children.retain(|&idx| idx != entity.index);
        }
    }

    /// Migrates every triple referencing `entity` into the table keyed by its new archetype at
    /// the endpoint that moved. The depth of tree descendants is left untouched here; callers
    /// needing forest-depth tracking recompute it via [`recompute_depths`](Self::recompute_depths).
    pub fn on_archetype_change(&mut self, entity: Entity, old: ArchetypeId, new: ArchetypeId) {
        if old == new {
            return;
        }
        let keys: Vec<SparseRelationTableId> = self
            .tables
            .keys()
            .copied()
            .filter(|k| k.from_archetype == old || k.to_archetype == old)
            .collect();

        for key in keys {
            let table = self.tables.remove(&key).unwrap_or_default();
            let (moved_triples, kept_triples): (Vec<_>, Vec<_>) = table
                .triples
                .into_iter()
                .partition(|t| t.from == entity || t.to == entity);
            let mut table = RelationTable {
                triples: kept_triples,
                by_from: FxHashMap::default(),
                by_to: FxHashMap::default(),
            };
            table.rebuild_indices();
            if !table.triples.is_empty() {
                self.tables.insert(key, table);
            }
            if !moved_triples.is_empty() {
                let new_key = SparseRelationTableId {
                    data_type: key.data_type,
                    from_archetype: if key.from_archetype == old { new } else { key.from_archetype },
                    to_archetype: if key.to_archetype == old { new } else { key.to_archetype },
                    depth: key.depth,
                };
                let new_table = self.tables.entry(new_key).or_default();
                new_table.triples.extend(moved_triples);
                new_table.rebuild_indices();
            }
        }
    }

    /// Breadth-first depth recomputation for the forest rooted transitively below `from`,
    /// terminating because the forest invariant forbids cycles.
    pub fn recompute_depths(&self, data_type: DataTypeId, from: Entity) -> Vec<(u32, u32)> {
        let mut result = Vec::new();
        let mut queue = std::collections::VecDeque::new();
        queue.push_back((from.index, 0u32));
        while let Some((node, depth)) = queue.pop_front() {
            result.push((node, depth));
            if let Some(children) = self.tree_children.get(&(data_type, node)) {
                for &child in children {
                    queue.push_back((child, depth + 1));
                }
            }
        }
        result
    }

    /// Rows of `table` touching `index` on either side: just `rows_from` for an asymmetric
    /// relation, both index lookups deduplicated for a symmetric one (a self-relation row
    /// would otherwise appear in both).
    fn candidate_rows(table: &RelationTable, index: u32, symmetric: bool) -> Vec<usize> {
        if !symmetric {
            return table.rows_from(index).to_vec();
        }
        let mut rows: Vec<usize> = table.rows_from(index).to_vec();
        rows.extend_from_slice(table.rows_to(index));
        rows.sort_unstable();
        rows.dedup();
        rows
    }

    /// Lazily iterates every triple where `from_entity` is the outgoing endpoint. For a
    /// symmetric relation, the canonical triple may have stored `from_entity` as its `to`
    /// side instead, so that side is matched too and the opposite endpoint is yielded.
    pub fn outgoing(
        &self,
        data_type: DataTypeId,
        from_entity: Entity,
    ) -> impl Iterator<Item = (Entity, &[u8])> + '_ {
        let symmetric = self.kinds.get(&data_type) == Some(&TypeKind::SymmetricRelation);
        self.tables
            .iter()
            .filter(move |(key, _)| key.data_type == data_type)
            .flat_map(move |(_, table)| {
                Self::candidate_rows(table, from_entity.index, symmetric)
                    .into_iter()
                    .filter_map(move |row| {
                        let t = &table.triples[row];
                        if t.from == from_entity {
                            Some((t.to, t.value.as_ref()))
                        } else if symmetric && t.to == from_entity {
                            Some((t.from, t.value.as_ref()))
                        } else {
                            None
                        }
                    })
            })
    }

    /// Lazily iterates every triple where `to_entity` is the incoming endpoint. Symmetric
    /// relations are matched from either canonical side, mirroring [`Self::outgoing`].
    pub fn incoming(
        &self,
        data_type: DataTypeId,
        to_entity: Entity,
    ) -> impl Iterator<Item = (Entity, &[u8])> + '_ {
        let symmetric = self.kinds.get(&data_type) == Some(&TypeKind::SymmetricRelation);
        self.tables
            .iter()
            .filter(move |(key, _)| key.data_type == data_type)
            .flat_map(move |(_, table)| {
                Self::candidate_rows(table, to_entity.index, symmetric)
                    .into_iter()
                    .filter_map(move |row| {
                        let t = &table.triples[row];
                        if t.to == to_entity {
                            Some((t.from, t.value.as_ref()))
                        } else if symmetric && t.from == to_entity {
                            Some((t.to, t.value.as_ref()))
                        } else {
                            None
                        }
                    })
            })
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(index: u32) -> Entity {
        Entity {
            index,
            generation: 0,
        }
    }

    #[test]
    fn insert_then_outgoing_finds_it() {
        let mut registry = TypeRegistry::new();
        #[derive(Default, Clone)]
        struct ChildOf;
        let ty = registry.register_tree_relation::<ChildOf>();

        let mut relations = SparseRelationTableRegistry::new();
        relations
            .insert(
                &registry,
                ty,
                entity(1),
                entity(0),
                ArchetypeId::EMPTY,
                ArchetypeId::EMPTY,
                Box::new([]),
            )
            .unwrap();

        let found: Vec<_> = relations.outgoing(ty, entity(1)).map(|(e, _)| e).collect();
        assert_eq!(found, vec![entity(0)]);
    }

    #[test]
    fn tree_relation_rejects_cycle() {
        let mut registry = TypeRegistry::new();
        #[derive(Default, Clone)]
        struct ChildOf;
        let ty = registry.register_tree_relation::<ChildOf>();

        let mut relations = SparseRelationTableRegistry::new();
        relations
            .insert(&registry, ty, entity(1), entity(0), ArchetypeId::EMPTY, ArchetypeId::EMPTY, Box::new([]))
            .unwrap();
        let err = relations.insert(
            &registry,
            ty,
            entity(0),
            entity(1),
            ArchetypeId::EMPTY,
            ArchetypeId::EMPTY,
            Box::new([]),
        );
        assert_eq!(err, Err(EcsError::CyclicRelation));
    }

    #[test]
    fn symmetric_relation_canonicalizes_endpoints() {
        let mut registry = TypeRegistry::new();
        #[derive(Default, Clone)]
        struct Friend;
        let ty = registry.register_symmetric_relation::<Friend>();

        let mut relations = SparseRelationTableRegistry::new();
        relations
            .insert(&registry, ty, entity(5), entity(2), ArchetypeId::EMPTY, ArchetypeId::EMPTY, Box::new([]))
            .unwrap();
        let found: Vec<_> = relations.outgoing(ty, entity(2)).map(|(e, _)| e).collect();
        assert_eq!(found, vec![entity(5)]);
    }

    #[test]
    fn symmetric_relation_is_visible_from_the_non_canonical_side_too() {
        let mut registry = TypeRegistry::new();
        #[derive(Default, Clone)]
        struct Friend;
        let ty = registry.register_symmetric_relation::<Friend>();

        let mut relations = SparseRelationTableRegistry::new();
        // entity(2) < entity(5), so the canonical triple stores from=2, to=5.
        relations
            .insert(&registry, ty, entity(2), entity(5), ArchetypeId::EMPTY, ArchetypeId::EMPTY, Box::new([]))
            .unwrap();

        let from_higher: Vec<_> = relations.outgoing(ty, entity(5)).map(|(e, _)| e).collect();
        assert_eq!(from_higher, vec![entity(2)]);

        let incoming_lower: Vec<_> = relations.incoming(ty, entity(2)).map(|(e, _)| e).collect();
        assert_eq!(incoming_lower, vec![entity(5)]);
    }

    #[test]
    fn erase_any_removes_all_references() {
        let mut registry = TypeRegistry::new();
        #[derive(Default, Clone)]
        struct ChildOf;
        let ty = registry.register_tree_relation::<ChildOf>();

        let mut relations = SparseRelationTableRegistry::new();
        relations
            .insert(&registry, ty, entity(1), entity(0), ArchetypeId::EMPTY, ArchetypeId::EMPTY, Box::new([]))
            .unwrap();
        relations.erase_any(entity(1));
        assert_eq!(relations.outgoing(ty, entity(1)).count(), 0);
    }
}

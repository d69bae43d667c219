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

//! Column identifiers and the archetype graph: canonicalisation of column sets into
//! [`ArchetypeId`]s, with cached one-step add/remove transitions.

use rustc_hash::FxHashMap;

use crate::types::DataTypeId;

/// Identifies a data column type: a [`DataTypeId`] plus an index, which is always 0 for
/// component columns (relations never appear in an archetype's column set, so relation columns
/// never reach the graph below).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnId {
    data_type: DataTypeId,
    index: u32,
}

impl ColumnId {
    pub fn make(data_type: DataTypeId) -> Self {
        Self {
            data_type,
            index: 0,
        }
    }

    pub fn make_indexed(data_type: DataTypeId, index: u32) -> Self {
        Self { data_type, index }
    }

    pub fn data_type(self) -> DataTypeId {
        self.data_type
    }

    pub fn index(self) -> u32 {
        self.index
    }
}

/// Identifies an unordered set of component [`ColumnId`]s. The empty set is [`ArchetypeId::EMPTY`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArchetypeId(pub u32);

impl ArchetypeId {
    pub const EMPTY: ArchetypeId = ArchetypeId(0);

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

struct ArchetypeEntry {
    /// Columns in graph-construction order (see `ArchetypeGraph::column_rank`).
    columns: Vec<ColumnId>,
    with: FxHashMap<ColumnId, ArchetypeId>,
    without: FxHashMap<ColumnId, ArchetypeId>,
}

/// Canonicalises sets of [`ColumnId`]s into [`ArchetypeId`]s and caches add/remove transitions.
pub struct ArchetypeGraph {
    entries: Vec<ArchetypeEntry>,
    /// Canonical lookup from a sorted column set to its archetype id.
    by_columns: FxHashMap<Vec<ColumnId>, ArchetypeId>,
    /// Global rank of each column: the order in which it was first seen. Fixes the column
    /// enumeration order within every archetype that contains it.
    column_rank: FxHashMap<ColumnId, usize>,
}

impl Default for ArchetypeGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchetypeGraph {
    pub fn new() -> Self {
        let empty_entry = ArchetypeEntry {
            columns: Vec::new(),
            with: FxHashMap::default(),
            without: FxHashMap::default(),
        };
        let mut by_columns = FxHashMap::default();
        by_columns.insert(Vec::new(), ArchetypeId::EMPTY);
        Self {
            entries: vec![empty_entry],
            by_columns,
            column_rank: FxHashMap::default(),
        }
    }

    fn rank_of(&mut self, column: ColumnId) -> usize {
        let next = self.column_rank.len();
        *self.column_rank.entry(column).or_insert(next)
    }

    fn canonicalize(&mut self, mut columns: Vec<ColumnId>) -> ArchetypeId {
        for c in &columns {
            self.rank_of(*c);
        }
        columns.sort_by_key(|c| self.column_rank[c]);
        columns.dedup();

        if let Some(&id) = self.by_columns.get(&columns) {
            return id;
        }

        let id = ArchetypeId(self.entries.len() as u32);
        self.entries.push(ArchetypeEntry {
            columns: columns.clone(),
            with: FxHashMap::default(),
            without: FxHashMap::default(),
        });
        self.by_columns.insert(columns, id);
        id
    }

    /// Inserts `col` into `a`'s column set, returning the canonical resulting archetype.
    /// Idempotent if `col` is already present.
    pub fn with(&mut self, a: ArchetypeId, col: ColumnId) -> ArchetypeId {
        if let Some(&cached) = self.entries[a.index()].with.get(&col) {
            return cached;
        }
        if self.contains(a, col) {
            return a;
        }
        let mut columns = self.entries[a.index()].columns.clone();
        columns.push(col);
        let result = self.canonicalize(columns);
        self.entries[a.index()].with.insert(col, result);
        self.entries[result.index()].without.insert(col, a);
        result
    }

    /// Removes `col` from `a`'s column set, returning the canonical resulting archetype.
    /// Idempotent if `col` is absent.
    pub fn without(&mut self, a: ArchetypeId, col: ColumnId) -> ArchetypeId {
        if let Some(&cached) = self.entries[a.index()].without.get(&col) {
            return cached;
        }
        if !self.contains(a, col) {
            return a;
        }
        let columns: Vec<ColumnId> = self.entries[a.index()]
            .columns
            .iter()
            .copied()
            .filter(|c| *c != col)
            .collect();
        let result = self.canonicalize(columns);
        self.entries[a.index()].without.insert(col, result);
        self.entries[result.index()].with.insert(col, a);
        result
    }

    pub fn contains(&self, a: ArchetypeId, col: ColumnId) -> bool {
        self.entries[a.index()].columns.contains(&col)
    }

    /// Columns of `a`, in the graph's stable enumeration order.
    pub fn columns(&self, a: ArchetypeId) -> &[ColumnId] {
        &self.entries[a.index()].columns
    }

    pub fn archetype_count(&self) -> usize {
        self.entries.len()
    }

    /// Appends to `out` every archetype (discovered since `cursor`) whose column set is a
    /// superset of `base`'s, returning the new cursor.
    pub fn collect(&self, base: ArchetypeId, out: &mut Vec<ArchetypeId>, cursor: usize) -> usize {
        let base_columns = &self.entries[base.index()].columns;
        for (i, entry) in self.entries.iter().enumerate().skip(cursor) {
            if base_columns.iter().all(|c| entry.columns.contains(c)) {
                out.push(ArchetypeId(i as u32));
            }
        }
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(n: u32) -> ColumnId {
        ColumnId::make(DataTypeId(n))
    }

    fn extend(graph: &mut ArchetypeGraph, cols: &[ColumnId]) -> ArchetypeId {
        let mut a = ArchetypeId::EMPTY;
        for c in cols {
            a = graph.with(a, *c);
        }
        a
    }

    #[test]
    fn with_then_without_is_identity() {
        let mut graph = ArchetypeGraph::new();
        let a = graph.with(ArchetypeId::EMPTY, col(1));
        let back = graph.without(a, col(1));
        assert_eq!(back, ArchetypeId::EMPTY);
    }

    #[test]
    fn with_is_idempotent() {
        let mut graph = ArchetypeGraph::new();
        let a = graph.with(ArchetypeId::EMPTY, col(1));
        let a2 = graph.with(a, col(1));
        assert_eq!(a, a2);
    }

    #[test]
    fn same_column_set_different_insertion_order_canonicalizes() {
        let mut graph = ArchetypeGraph::new();
        let a = extend(&mut graph, &[col(1), col(2), col(0)]);
        let b = extend(&mut graph, &[col(2), col(1), col(0)]);
        assert_eq!(a, b);
    }

    #[test]
    fn collect_finds_supersets_since_cursor() {
        let mut graph = ArchetypeGraph::new();
        let with1 = graph.with(ArchetypeId::EMPTY, col(1));
        let mut out = Vec::new();
        let cursor = graph.collect(with1, &mut out, 0);
        assert_eq!(out, vec![with1]);

        let with_both = graph.with(with1, col(2));
        let mut out2 = Vec::new();
        graph.collect(with1, &mut out2, cursor);
        assert_eq!(out2, vec![with_both]);
    }
}

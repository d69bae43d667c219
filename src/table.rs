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

//! Dense, column-major storage for one archetype, and the registry that owns one table per
//! archetype. Rows move between tables on add/remove; a row's index in its table is not stable
//! across moves, so callers always resolve it through the owning entity.

use rustc_hash::FxHashMap;

use crate::archetype::{ArchetypeId, ColumnId};
use crate::types::{DataTypeId, TypeRegistry};

/// One type-erased, contiguous column of component data.
struct Column {
    data_type: DataTypeId,
    bytes: Vec<u8>,
    item_size: usize,
    /// Logical row count. For `item_size == 0` (zero-sized components) `bytes` never grows, so
    /// this is the only place the row count lives; tracked explicitly for every column rather
    /// than derived, so it stays correct in both cases.
    rows: usize,
    drop_fn: unsafe fn(*mut u8),
    default_fn: unsafe fn(*mut u8),
    clone_fn: unsafe fn(*const u8, *mut u8),
}

impl Column {
    fn new(data_type: DataTypeId, registry: &TypeRegistry, capacity: usize) -> Self {
        let info = registry
            .type_info(data_type)
            .expect("column created for unregistered type");
        let item_size = info.layout.size();
        Self {
            data_type,
            bytes: Vec::with_capacity(item_size * capacity),
            item_size,
            rows: 0,
            drop_fn: info.drop_fn,
            default_fn: info.default_fn,
            clone_fn: info.clone_fn,
        }
    }

    fn len(&self) -> usize {
        self.rows
    }

    /// Appends a default-constructed element, returning its row index.
    fn push_default(&mut self) -> usize {
        let row = self.rows;
        let old_len = self.bytes.len();
        self.bytes.resize(old_len + self.item_size, 0);
        unsafe {
            (self.default_fn)(self.bytes.as_mut_ptr().add(old_len));
        }
        self.rows += 1;
        row
    }

    /// Writes raw bytes for a newly-pushed row. Caller guarantees `bytes.len()` matches the
    /// registered layout and that the row was freshly default-constructed by `push_default`.
    unsafe fn write_row(&mut self, row: usize, bytes: &[u8]) {
        let offset = row * self.item_size;
        (self.drop_fn)(self.bytes.as_mut_ptr().add(offset));
        self.bytes[offset..offset + self.item_size].copy_from_slice(bytes);
    }

    fn row_ptr(&self, row: usize) -> *const u8 {
        unsafe { self.bytes.as_ptr().add(row * self.item_size) }
    }

    fn row_ptr_mut(&mut self, row: usize) -> *mut u8 {
        unsafe { self.bytes.as_mut_ptr().add(row * self.item_size) }
    }

    /// Removes `row` by swapping in the last row, dropping the removed value in place.
    /// Returns the index of the row that was moved into `row`'s place, if any.
    fn swap_remove(&mut self, row: usize) -> Option<usize> {
        let last = self.rows - 1;
        unsafe {
            (self.drop_fn)(self.row_ptr_mut(row));
        }
        let result = if row != last {
            if self.item_size > 0 {
                let dest_offset = row * self.item_size;
                let src_offset = last * self.item_size;
                self.bytes
                    .copy_within(src_offset..src_offset + self.item_size, dest_offset);
                self.bytes.truncate(src_offset);
            }
            Some(last)
        } else {
            self.bytes.truncate(row * self.item_size);
            None
        };
        self.rows -= 1;
        result
    }

    /// Clones the value at `row` into a fresh row appended to `dest`.
    fn clone_row_into(&self, row: usize, dest: &mut Column) {
        let dest_row = dest.push_default();
        unsafe {
            (self.clone_fn)(self.row_ptr(row), dest.row_ptr_mut(dest_row));
        }
    }
}

impl Drop for Column {
    fn drop(&mut self) {
        for row in 0..self.len() {
            unsafe {
                (self.drop_fn)(self.row_ptr_mut(row));
            }
        }
    }
}

/// Dense, SoA storage for every entity currently in one archetype.
pub struct DenseTable {
    archetype: ArchetypeId,
    columns: FxHashMap<ColumnId, Column>,
    /// Entity pool index at each row, in row order.
    rows: Vec<u32>,
}

impl DenseTable {
    fn new(archetype: ArchetypeId, columns: &[ColumnId], registry: &TypeRegistry, capacity: usize) -> Self {
        let mut map = FxHashMap::default();
        for &col in columns {
            map.insert(col, Column::new(col.data_type(), registry, capacity));
        }
        Self {
            archetype,
            columns: map,
            rows: Vec::with_capacity(capacity),
        }
    }

    pub fn archetype(&self) -> ArchetypeId {
        self.archetype
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn entity_index_at(&self, row: usize) -> u32 {
        self.rows[row]
    }

    pub fn has_column(&self, column: ColumnId) -> bool {
        self.columns.contains_key(&column)
    }

    /// Appends a new row, default-constructing every column. Returns the new row index.
    pub(crate) fn push_row(&mut self, entity_index: u32) -> usize {
        for column in self.columns.values_mut() {
            column.push_default();
        }
        self.rows.push(entity_index);
        self.rows.len() - 1
    }

    /// Overwrites column `column`'s value at `row` with raw bytes matching its registered layout.
    ///
    /// # Safety
    /// `bytes` must have exactly the length of `column`'s registered layout.
    pub(crate) unsafe fn set_raw(&mut self, row: usize, column: ColumnId, bytes: &[u8]) {
        if let Some(col) = self.columns.get_mut(&column) {
            col.write_row(row, bytes);
        }
    }

    /// Pointer to the value of `column` at `row`.
    pub fn row_ptr(&self, column: ColumnId, row: usize) -> Option<*const u8> {
        self.columns.get(&column).map(|c| c.row_ptr(row))
    }

    /// Mutable pointer to the value of `column` at `row`.
    pub fn row_ptr_mut(&mut self, column: ColumnId, row: usize) -> Option<*mut u8> {
        self.columns.get_mut(&column).map(|c| c.row_ptr_mut(row))
    }

    /// Overwrites the value at `column`/`row` with a fresh default-constructed value, without
    /// running the previous value's destructor. Used after the previous value has already been
    /// moved out by the caller (e.g. [`World::remove`](crate::world::World::remove)).
    ///
    /// # Safety
    /// The previous value at this slot must have already been logically moved out (e.g. via
    /// `ptr::read`), or its destructor will never run and it will leak.
    pub(crate) unsafe fn reinit_default(&mut self, column: ColumnId, row: usize) {
        if let Some(col) = self.columns.get_mut(&column) {
            (col.default_fn)(col.row_ptr_mut(row));
        }
    }

    pub fn item_size(&self, column: ColumnId) -> Option<usize> {
        self.columns.get(&column).map(|c| c.item_size)
    }

    /// Removes `row`, swapping the last row into its place. Returns the entity index that used
    /// to occupy the last row, if a swap occurred (the caller must update its row bookkeeping).
    pub(crate) fn swap_erase(&mut self, row: usize) -> Option<u32> {
        let moved_from = self.rows.len() - 1;
        for column in self.columns.values_mut() {
            column.swap_remove(row);
        }
        if row != moved_from {
            self.rows[row] = self.rows[moved_from];
            self.rows.pop();
            Some(self.rows[row])
        } else {
            self.rows.pop();
            None
        }
    }

    /// Moves the row at `src_row` of `self` into a fresh row of `dest`, cloning shared columns
    /// and default-constructing columns only present in `dest`. Leaves `self`'s row removed via
    /// [`swap_erase`](Self::swap_erase), which the caller must invoke separately.
    pub(crate) fn copy_row_into(&self, src_row: usize, dest: &mut DenseTable) -> usize {
        let dest_row = dest.push_row(self.rows[src_row]);
        for (&column, dest_col) in dest.columns.iter_mut() {
            if let Some(src_col) = self.columns.get(&column) {
                unsafe {
                    (dest_col.drop_fn)(dest_col.row_ptr_mut(dest_row));
                    (src_col.clone_fn)(src_col.row_ptr(src_row), dest_col.row_ptr_mut(dest_row));
                }
            }
        }
        dest_row
    }
}

/// Owns exactly one [`DenseTable`] per archetype that has ever held an entity.
#[derive(Default)]
pub struct DenseTableRegistry {
    tables: FxHashMap<ArchetypeId, DenseTable>,
}

impl DenseTableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the table for `archetype`, creating an empty one (with `columns`) if absent.
    pub fn get_or_create(
        &mut self,
        archetype: ArchetypeId,
        columns: &[ColumnId],
        registry: &TypeRegistry,
        default_capacity: usize,
    ) -> &mut DenseTable {
        self.tables
            .entry(archetype)
            .or_insert_with(|| DenseTable::new(archetype, columns, registry, default_capacity))
    }

    pub fn get(&self, archetype: ArchetypeId) -> Option<&DenseTable> {
        self.tables.get(&archetype)
    }

    pub fn get_mut(&mut self, archetype: ArchetypeId) -> Option<&mut DenseTable> {
        self.tables.get_mut(&archetype)
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Moves the clone helper used when an entity crosses from one archetype's table to
    /// another's: clones shared columns into the destination, leaves new-only columns
    /// default-constructed, and removes the source row (swap-erasing to keep it dense).
    pub(crate) fn move_row(
        &mut self,
        from: ArchetypeId,
        from_row: usize,
        to: ArchetypeId,
        to_columns: &[ColumnId],
        registry: &TypeRegistry,
        default_capacity: usize,
    ) -> (usize, Option<u32>) {
        self.tables
            .entry(to)
            .or_insert_with(|| DenseTable::new(to, to_columns, registry, default_capacity));

        let dest_row = {
            let src = self.tables.get(&from).expect("source table must exist");
            let dest = self.tables.get_mut(&to).expect("just inserted");
            src.copy_row_into(from_row, dest)
        };

        let src = self.tables.get_mut(&from).expect("source table must exist");
        let moved_entity = src.swap_erase(from_row);
        (dest_row, moved_entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archetype::ArchetypeGraph;

    #[derive(Default, Clone)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[test]
    fn push_and_read_row() {
        let mut registry = TypeRegistry::new();
        let pos_ty = registry.register_component::<Position>();
        let col = ColumnId::make(pos_ty);

        let mut tables = DenseTableRegistry::new();
        let table = tables.get_or_create(ArchetypeId::EMPTY, &[col], &registry, 4);
        let row = table.push_row(0);
        assert_eq!(row, 0);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn swap_erase_handles_zero_sized_columns() {
        #[derive(Default, Clone)]
        struct Tag;

        let mut registry = TypeRegistry::new();
        let tag_ty = registry.register_component::<Tag>();
        let tag_col = ColumnId::make(tag_ty);

        let mut tables = DenseTableRegistry::new();
        let table = tables.get_or_create(ArchetypeId::EMPTY, &[tag_col], &registry, 4);
        table.push_row(1);
        table.push_row(2);
        table.push_row(3);
        assert_eq!(table.len(), 3);

        let moved = table.swap_erase(0);
        assert_eq!(moved, Some(3));
        assert_eq!(table.len(), 2);
        assert_eq!(table.entity_index_at(0), 3);

        table.swap_erase(0);
        table.swap_erase(0);
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn move_row_clones_shared_and_defaults_new_columns() {
        let mut registry = TypeRegistry::new();
        let pos_ty = registry.register_component::<Position>();
        #[derive(Default, Clone)]
        struct Velocity {
            #[allow(dead_code)]
            dx: f32,
        }
        let vel_ty = registry.register_component::<Velocity>();
        let pos_col = ColumnId::make(pos_ty);
        let vel_col = ColumnId::make(vel_ty);

        let mut graph = ArchetypeGraph::new();
        let with_pos = graph.with(ArchetypeId::EMPTY, pos_col);
        let with_both = graph.with(with_pos, vel_col);

        let mut tables = DenseTableRegistry::new();
        {
            let src = tables.get_or_create(with_pos, &[pos_col], &registry, 4);
            src.push_row(42);
        }
        let (dest_row, moved) = tables.move_row(with_pos, 0, with_both, &[pos_col, vel_col], &registry, 4);
        assert_eq!(dest_row, 0);
        assert!(moved.is_none());
        assert_eq!(tables.get(with_pos).unwrap().len(), 0);
        assert_eq!(tables.get(with_both).unwrap().len(), 1);
        assert_eq!(tables.get(with_both).unwrap().entity_index_at(0), 42);
    }
}

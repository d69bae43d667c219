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

//! World: the sole mutable entry point to ECS state. Coordinates the entity pool, the archetype
//! graph, dense tables and sparse relation tables.

use std::any::{Any, TypeId};

use ahash::AHashMap;

use crate::archetype::{ArchetypeGraph, ArchetypeId, ColumnId};
use crate::component::{Bundle, Component};
use crate::config::Config;
use crate::entity::{Entity, EntityPool};
use crate::error::{EcsError, Result};
use crate::observer::{ObserverEvent, ObserverId, ObserverRegistry};
use crate::relation::SparseRelationTableRegistry;
use crate::table::DenseTableRegistry;
use crate::types::{DataTypeId, TypeRegistry};

pub struct World {
    config: Config,
    pool: EntityPool,
    graph: ArchetypeGraph,
    tables: DenseTableRegistry,
    relations: SparseRelationTableRegistry,
    types: TypeRegistry,
    observers: ObserverRegistry,
    /// Row of each live entity index within its current archetype's table.
    entity_row: AHashMap<u32, usize>,
    resources: AHashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        Self::with_config(Config::from_env())
    }

    pub fn with_config(config: Config) -> Self {
        let mut tables = DenseTableRegistry::new();
        let types = TypeRegistry::new();
        tables.get_or_create(ArchetypeId::EMPTY, &[], &types, config.default_table_capacity);
        Self {
            config,
            pool: EntityPool::new(),
            graph: ArchetypeGraph::new(),
            tables,
            relations: SparseRelationTableRegistry::new(),
            types,
            observers: ObserverRegistry::new(),
            entity_row: AHashMap::new(),
            resources: AHashMap::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // -- type registration -------------------------------------------------

    pub fn register_component<T: Component>(&mut self) -> DataTypeId {
        self.types.register_component::<T>()
    }

    pub fn register_symmetric_relation<T: Component>(&mut self) -> DataTypeId {
        self.types.register_symmetric_relation::<T>()
    }

    pub fn register_tree_relation<T: Component>(&mut self) -> DataTypeId {
        self.types.register_tree_relation::<T>()
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    // -- entity lifecycle ----------------------------------------------

    /// Creates a new entity in the empty archetype, with no components and no relations.
    pub fn create(&mut self) -> Entity {
        let entity = self.pool.create(ArchetypeId::EMPTY);
        let table = self.tables.get_or_create(
            ArchetypeId::EMPTY,
            &[],
            &self.types,
            self.config.default_table_capacity,
        );
        let row = table.push_row(entity.index);
        self.entity_row.insert(entity.index, row);
        entity
    }

    /// Spawns an entity with every component of `bundle` already attached.
    pub fn spawn<B: Bundle>(&mut self, bundle: B) -> Result<Entity> {
        let entity = self.create();
        bundle.add_to(self, entity)?;
        Ok(entity)
    }

    /// Drops every component row, removes every relation triple involving `entity`, then frees
    /// its pool slot.
    pub fn destroy(&mut self, entity: Entity) -> Result<()> {
        self.check_alive(entity)?;
        let archetype = self.pool.archetype(entity.index);
        self.relations.erase_any(entity);

        let row = self.entity_row.remove(&entity.index).expect("tracked row");
        let table = self.tables.get_mut(archetype).expect("archetype table exists");
        if let Some(moved_index) = table.swap_erase(row) {
            self.entity_row.insert(moved_index, row);
        }
        self.pool.destroy(entity.index);
        Ok(())
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.pool.contains(entity)
    }

    pub fn generation(&self, index: u32) -> u32 {
        self.pool.generation(index)
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    pub fn iter_entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.pool.iter()
    }

    /// Current archetype of a live entity, used by query joins to test endpoint membership.
    pub fn pool_archetype_of(&self, entity: Entity) -> ArchetypeId {
        self.pool.archetype(entity.index)
    }

    fn check_alive(&self, entity: Entity) -> Result<()> {
        if self.pool.contains(entity) {
            Ok(())
        } else {
            Err(EcsError::StaleEntity(entity))
        }
    }

    // -- components ------------------------------------------------------

    /// Moves `value` into the component column for `T` on `entity`. If `entity`'s archetype
    /// lacked that column, its row migrates to `graph.with(archetype, col)`'s table, triggering
    /// `on_add`. If the column already existed, the old value is dropped first and no observer
    /// runs.
    pub fn add<T: Component>(&mut self, entity: Entity, value: T) -> Result<()> {
        self.check_alive(entity)?;
        let ty = self.types.register_component::<T>();
        let col = ColumnId::make(ty);
        let old_archetype = self.pool.archetype(entity.index);

        if self.graph.contains(old_archetype, col) {
            let row = self.entity_row[&entity.index];
            let table = self.tables.get_mut(old_archetype).expect("table exists");
            Self::write_value(table, col, row, value);
            return Ok(());
        }

        let new_archetype = self.graph.with(old_archetype, col);
        let old_row = self.entity_row[&entity.index];
        let new_columns: Vec<ColumnId> = self.graph.columns(new_archetype).to_vec();
        let (dest_row, moved_entity) = self.tables.move_row(
            old_archetype,
            old_row,
            new_archetype,
            &new_columns,
            &self.types,
            self.config.default_table_capacity,
        );
        if let Some(moved_index) = moved_entity {
            self.entity_row.insert(moved_index, old_row);
        }
        self.entity_row.insert(entity.index, dest_row);
        self.pool.set_archetype(entity.index, new_archetype);

        {
            let table = self.tables.get_mut(new_archetype).expect("just created");
            Self::write_value(table, col, dest_row, value);
        }

        self.relations
            .on_archetype_change(entity, old_archetype, new_archetype);

        self.trigger(ObserverEvent::OnAdd, col, entity)
    }

    fn write_value<T: Component>(table: &mut crate::table::DenseTable, col: ColumnId, row: usize, value: T) {
        let bytes = unsafe {
            std::slice::from_raw_parts(
                (&value as *const T) as *const u8,
                std::mem::size_of::<T>(),
            )
        };
        unsafe {
            table.set_raw(row, col, bytes);
        }
        std::mem::forget(value);
    }

    /// Reverse migration to `graph.without(archetype, col)`, returning the removed value and
    /// triggering `on_remove`.
    pub fn remove<T: Component>(&mut self, entity: Entity) -> Result<T> {
        self.check_alive(entity)?;
        let ty = self
            .types
            .id_of::<T>()
            .ok_or_else(|| EcsError::NotFound(std::any::type_name::<T>().to_string()))?;
        let col = ColumnId::make(ty);
        let old_archetype = self.pool.archetype(entity.index);
        if !self.graph.contains(old_archetype, col) {
            return Err(EcsError::NotFound(format!(
                "entity {entity} has no component {}",
                std::any::type_name::<T>()
            )));
        }

        let row = self.entity_row[&entity.index];
        let value = {
            let table = self.tables.get_mut(old_archetype).expect("table exists");
            let ptr = table.row_ptr(col, row).expect("column present") as *const T;
            let value = unsafe { std::ptr::read(ptr) };
            unsafe {
                table.reinit_default(col, row);
            }
            value
        };

        let new_archetype = self.graph.without(old_archetype, col);
        let new_columns: Vec<ColumnId> = self.graph.columns(new_archetype).to_vec();
        let (dest_row, moved_entity) = self.tables.move_row(
            old_archetype,
            row,
            new_archetype,
            &new_columns,
            &self.types,
            self.config.default_table_capacity,
        );
        if let Some(moved_index) = moved_entity {
            self.entity_row.insert(moved_index, row);
        }
        self.entity_row.insert(entity.index, dest_row);
        self.pool.set_archetype(entity.index, new_archetype);

        self.relations
            .on_archetype_change(entity, old_archetype, new_archetype);

        self.trigger(ObserverEvent::OnRemove, col, entity)?;
        Ok(value)
    }

    pub fn get<T: Component>(&self, entity: Entity) -> Result<&T> {
        self.check_alive(entity)?;
        let ty = self
            .types
            .id_of::<T>()
            .ok_or(EcsError::NotFound(std::any::type_name::<T>().to_string()))?;
        let col = ColumnId::make(ty);
        let archetype = self.pool.archetype(entity.index);
        let row = self.entity_row[&entity.index];
        let table = self.tables.get(archetype).expect("table exists");
        let ptr = table
            .row_ptr(col, row)
            .ok_or_else(|| EcsError::NotFound(std::any::type_name::<T>().to_string()))?;
        Ok(unsafe { &*(ptr as *const T) })
    }

    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Result<&mut T> {
        self.check_alive(entity)?;
        let ty = self
            .types
            .id_of::<T>()
            .ok_or(EcsError::NotFound(std::any::type_name::<T>().to_string()))?;
        let col = ColumnId::make(ty);
        let archetype = self.pool.archetype(entity.index);
        let row = self.entity_row[&entity.index];
        let table = self.tables.get_mut(archetype).expect("table exists");
        let ptr = table
            .row_ptr_mut(col, row)
            .ok_or_else(|| EcsError::NotFound(std::any::type_name::<T>().to_string()))?;
        Ok(unsafe { &mut *(ptr as *mut T) })
    }

    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        let Some(ty) = self.types.id_of::<T>() else {
            return false;
        };
        if !self.pool.contains(entity) {
            return false;
        }
        let archetype = self.pool.archetype(entity.index);
        self.graph.contains(archetype, ColumnId::make(ty))
    }

    // -- relations ---------------------------------------------------------

    pub fn relate<T: Component>(&mut self, from: Entity, to: Entity, value: T) -> Result<()> {
        self.check_alive(from)?;
        self.check_alive(to)?;
        let ty = self.types.ensure_registered::<T>();
        let bytes = unsafe {
            std::slice::from_raw_parts(
                (&value as *const T) as *const u8,
                std::mem::size_of::<T>(),
            )
        };
        let boxed: Box<[u8]> = bytes.into();
        std::mem::forget(value);

        let from_archetype = self.pool.archetype(from.index);
        let to_archetype = self.pool.archetype(to.index);
        self.relations
            .insert(&self.types, ty, from, to, from_archetype, to_archetype, boxed)?;
        self.trigger(ObserverEvent::OnRelated, ColumnId::make(ty), from)
    }

    pub fn unrelate<T: Component>(&mut self, from: Entity, to: Entity) -> Result<()> {
        self.check_alive(from)?;
        self.check_alive(to)?;
        let ty = self
            .types
            .id_of::<T>()
            .ok_or_else(|| EcsError::NotFound(std::any::type_name::<T>().to_string()))?;
        let kind = self.types.kind(ty).expect("registered above");
        self.relations.erase(ty, kind, from, to);
        self.trigger(ObserverEvent::OnUnrelated, ColumnId::make(ty), from)
    }

    // -- observers -----------------------------------------------------

    pub fn hook<F>(&mut self, event: ObserverEvent, column: ColumnId, callback: F) -> ObserverId
    where
        F: FnMut(&mut World, Entity, &mut crate::command::CommandBuffer) + Send + 'static,
    {
        self.observers.hook(event, column, callback)
    }

    pub fn unhook(&mut self, id: ObserverId) {
        self.observers.unhook(id);
    }

    fn trigger(&mut self, event: ObserverEvent, column: ColumnId, entity: Entity) -> Result<()> {
        let mut observers = std::mem::take(&mut self.observers);
        let result = observers.notify(self, event, column, entity, self.config.observer_recursion_limit);
        self.observers = observers;
        result
    }

    // -- resources -------------------------------------------------------

    pub fn insert_resource<T: 'static + Send + Sync>(&mut self, value: T) -> Result<()> {
        let key = TypeId::of::<T>();
        if self.resources.contains_key(&key) {
            return Err(EcsError::ResourceAlreadyExists);
        }
        self.resources.insert(key, Box::new(value));
        Ok(())
    }

    pub fn resource<T: 'static + Send + Sync>(&self) -> Option<&T> {
        self.resources
            .get(&TypeId::of::<T>())
            .and_then(|b| b.downcast_ref())
    }

    pub fn resource_mut<T: 'static + Send + Sync>(&mut self) -> Option<&mut T> {
        self.resources
            .get_mut(&TypeId::of::<T>())
            .and_then(|b| b.downcast_mut())
    }

    pub fn remove_resource<T: 'static + Send + Sync>(&mut self) -> Option<T> {
        self.resources
            .remove(&TypeId::of::<T>())
            .and_then(|b| b.downcast().ok())
            .map(|b| *b)
    }

    pub fn archetype_graph(&self) -> &ArchetypeGraph {
        &self.graph
    }

    pub fn tables(&self) -> &DenseTableRegistry {
        &self.tables
    }

    pub fn relations(&self) -> &SparseRelationTableRegistry {
        &self.relations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Velocity {
        dx: f32,
    }

    #[derive(Default, Clone)]
    struct ChildOf;

    #[test]
    fn create_destroy_roundtrip() {
        let mut world = World::new();
        let e = world.create();
        assert!(world.contains(e));
        world.destroy(e).unwrap();
        assert!(!world.contains(e));
    }

    #[test]
    fn add_then_get_roundtrips_value() {
        let mut world = World::new();
        let e = world.create();
        world.add(e, Position { x: 1.0, y: 2.0 }).unwrap();
        assert_eq!(world.get::<Position>(e).unwrap(), &Position { x: 1.0, y: 2.0 });
    }

    #[test]
    fn add_second_component_migrates_archetype() {
        let mut world = World::new();
        let e = world.create();
        world.add(e, Position { x: 1.0, y: 0.0 }).unwrap();
        world.add(e, Velocity { dx: 3.0 }).unwrap();
        assert_eq!(world.get::<Position>(e).unwrap().x, 1.0);
        assert_eq!(world.get::<Velocity>(e).unwrap().dx, 3.0);
    }

    #[test]
    fn remove_returns_value_and_drops_column() {
        let mut world = World::new();
        let e = world.create();
        world.add(e, Position { x: 5.0, y: 5.0 }).unwrap();
        let removed = world.remove::<Position>(e).unwrap();
        assert_eq!(removed, Position { x: 5.0, y: 5.0 });
        assert!(!world.has::<Position>(e));
    }

    #[test]
    fn stale_entity_after_destroy_errors() {
        let mut world = World::new();
        let e = world.create();
        world.destroy(e).unwrap();
        assert_eq!(world.add(e, Position::default()), Err(EcsError::StaleEntity(e)));
    }

    #[test]
    fn relate_then_destroy_clears_relation() {
        let mut world = World::new();
        let parent = world.create();
        let child = world.create();
        world.relate(child, parent, ChildOf).unwrap();
        world.destroy(child).unwrap();
        assert_eq!(world.relations().table_count(), 0);
    }

    #[test]
    fn resources_roundtrip() {
        let mut world = World::new();
        world.insert_resource(42u32).unwrap();
        assert_eq!(world.resource::<u32>(), Some(&42));
        assert!(world.insert_resource(7u32).is_err());
    }

    #[test]
    fn observer_on_add_fires() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        let mut world = World::new();
        let ty = world.register_component::<Position>();
        let col = ColumnId::make(ty);
        let fired = Arc::new(AtomicBool::new(false));
        let fired_clone = fired.clone();
        world.hook(ObserverEvent::OnAdd, col, move |_, _, _| {
            fired_clone.store(true, Ordering::SeqCst);
        });

        let e = world.create();
        world.add(e, Position::default()).unwrap();
        assert!(fired.load(Ordering::SeqCst));
    }
}

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

//! The type registry: a stable bijection between Rust types and dense [`DataTypeId`]s.
//!
//! Replaces the `void*` + `std::type_index` reflection the engine this model is descended from
//! used for storages: every registered type carries its own size, alignment and
//! default/copy/drop function pointers instead of runtime type-name lookup, so move and drop
//! safety is verified once, at registration time, rather than re-checked on every access.

use std::any::TypeId;
use std::alloc::Layout;

use rustc_hash::FxHashMap;

use crate::error::{EcsError, Result};

/// Dense index into the [`TypeRegistry`]. `Invalid` is never assigned to a registered type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataTypeId(pub u32);

impl DataTypeId {
    pub const INVALID: DataTypeId = DataTypeId(u32::MAX);

    pub fn is_valid(self) -> bool {
        self != DataTypeId::INVALID
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// What kind of edge a registered type represents, if any.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeKind {
    /// An ordinary component, stored in dense tables.
    Component,
    /// A relation where `relate(a, b, v)` is observationally identical to `relate(b, a, v)`.
    SymmetricRelation,
    /// A relation where each entity has at most one outgoing edge, forming a forest.
    TreeRelation,
}

impl TypeKind {
    pub fn is_relation(self) -> bool {
        !matches!(self, TypeKind::Component)
    }
}

/// Layout and lifecycle metadata for a registered type, addressable through a [`DataTypeId`].
pub struct TypeInfo {
    pub name: &'static str,
    pub type_id: TypeId,
    pub layout: Layout,
    pub kind: TypeKind,
    pub(crate) drop_fn: unsafe fn(*mut u8),
    pub(crate) default_fn: unsafe fn(*mut u8),
    pub(crate) clone_fn: unsafe fn(*const u8, *mut u8),
}

impl TypeInfo {
    fn of<T: 'static + Default + Clone>(name: &'static str, kind: TypeKind) -> Self {
        unsafe fn drop_fn<T>(ptr: *mut u8) {
            std::ptr::drop_in_place(ptr as *mut T);
        }
        unsafe fn default_fn<T: Default>(dest: *mut u8) {
            std::ptr::write(dest as *mut T, T::default());
        }
        unsafe fn clone_fn<T: Clone>(src: *const u8, dest: *mut u8) {
            let value = (*(src as *const T)).clone();
            std::ptr::write(dest as *mut T, value);
        }

        Self {
            name,
            type_id: TypeId::of::<T>(),
            layout: Layout::new::<T>(),
            kind,
            drop_fn: drop_fn::<T>,
            default_fn: default_fn::<T>,
            clone_fn: clone_fn::<T>,
        }
    }
}

/// Registry assigning a stable, dense [`DataTypeId`] to every component and relation type.
///
/// Monotone: types are registered once, before any world mutation, and are never removed.
#[derive(Default)]
pub struct TypeRegistry {
    by_type_id: FxHashMap<TypeId, DataTypeId>,
    infos: Vec<TypeInfo>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` as a plain component. Idempotent: registering the same type twice returns
    /// the same id.
    pub fn register_component<T: 'static + Default + Clone>(&mut self) -> DataTypeId {
        self.register_with_kind::<T>(TypeKind::Component)
            .expect("component registration cannot fail structurally")
    }

    /// Registers `T` as a symmetric relation: `relate(a, b, v)` and `relate(b, a, v)` are
    /// observationally identical.
    pub fn register_symmetric_relation<T: 'static + Default + Clone>(&mut self) -> DataTypeId {
        self.register_with_kind::<T>(TypeKind::SymmetricRelation)
            .expect("symmetric relation registration cannot fail structurally")
    }

    /// Registers `T` as a tree relation: each source entity has at most one outgoing edge.
    pub fn register_tree_relation<T: 'static + Default + Clone>(&mut self) -> DataTypeId {
        self.register_with_kind::<T>(TypeKind::TreeRelation)
            .expect("tree relation registration cannot fail structurally")
    }

    fn register_with_kind<T: 'static + Default + Clone>(
        &mut self,
        kind: TypeKind,
    ) -> Result<DataTypeId> {
        let type_id = TypeId::of::<T>();
        if let Some(&existing) = self.by_type_id.get(&type_id) {
            let info = &self.infos[existing.index()];
            if info.kind != kind {
                return Err(EcsError::TypeRegistration(format!(
                    "{} already registered with a different kind",
                    info.name
                )));
            }
            return Ok(existing);
        }

        let id = DataTypeId(self.infos.len() as u32);
        self.infos
            .push(TypeInfo::of::<T>(std::any::type_name::<T>(), kind));
        self.by_type_id.insert(type_id, id);
        Ok(id)
    }

    /// Looks up the id of an already-registered type, if any.
    pub fn id_of<T: 'static>(&self) -> Option<DataTypeId> {
        self.by_type_id.get(&TypeId::of::<T>()).copied()
    }

    /// Returns `T`'s id under whatever kind it was already registered as, or registers it fresh
    /// as a plain component. Used where a relation value type may have been pre-registered as a
    /// symmetric or tree relation by the caller, and that choice must not be clobbered.
    pub fn ensure_registered<T: 'static + Default + Clone>(&mut self) -> DataTypeId {
        self.id_of::<T>().unwrap_or_else(|| self.register_component::<T>())
    }

    pub fn type_info(&self, id: DataTypeId) -> Option<&TypeInfo> {
        self.infos.get(id.index())
    }

    pub fn kind(&self, id: DataTypeId) -> Option<TypeKind> {
        self.type_info(id).map(|i| i.kind)
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, Clone)]
    struct Position {
        #[allow(dead_code)]
        x: f32,
    }

    #[derive(Default, Clone)]
    struct Friend;

    #[test]
    fn registering_twice_returns_same_id() {
        let mut registry = TypeRegistry::new();
        let a = registry.register_component::<Position>();
        let b = registry.register_component::<Position>();
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_types_get_distinct_dense_ids() {
        let mut registry = TypeRegistry::new();
        let pos = registry.register_component::<Position>();
        let friend = registry.register_symmetric_relation::<Friend>();
        assert_ne!(pos, friend);
        assert_eq!(registry.kind(friend), Some(TypeKind::SymmetricRelation));
    }

    #[test]
    fn conflicting_kind_registration_fails() {
        let mut registry = TypeRegistry::new();
        registry.register_component::<Position>();
        let err = registry.register_with_kind::<Position>(TypeKind::TreeRelation);
        assert!(err.is_err());
    }
}

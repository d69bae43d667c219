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

//! Component and Bundle traits.
//!
//! Components are plain data attached to entities. Bundles group several components so they can
//! be spawned onto one entity together, moving straight into their final archetype instead of
//! migrating one column at a time.

use smallvec::{smallvec, SmallVec};

use crate::entity::Entity;
use crate::error::Result;
use crate::types::DataTypeId;
use crate::world::World;

/// Maximum tuple arity supported by the [`Bundle`] impls below.
pub const MAX_BUNDLE_COMPONENTS: usize = 8;

/// Marker trait for component types. A component must own its data (`'static`), support being
/// default-constructed into a freshly-grown table row, and be cloneable for blueprint spawning.
pub trait Component: 'static + Default + Clone + Send + Sync {}

impl<T: 'static + Default + Clone + Send + Sync> Component for T {}

/// A group of components spawned onto one entity in a single archetype transition.
pub trait Bundle: Send + Sync + 'static {
    /// Registers every component type in the bundle, returning their ids in tuple order.
    fn register(world: &mut World) -> SmallVec<[DataTypeId; MAX_BUNDLE_COMPONENTS]>
    where
        Self: Sized;

    /// Adds every component in the bundle onto `entity`, in tuple order.
    fn add_to(self, world: &mut World, entity: Entity) -> Result<()>
    where
        Self: Sized;
}

macro_rules! impl_bundle {
    ($($T:ident),+) => {
        impl<$($T: Component),+> Bundle for ($($T,)+) {
            fn register(world: &mut World) -> SmallVec<[DataTypeId; MAX_BUNDLE_COMPONENTS]> {
                smallvec![$(world.register_component::<$T>()),+]
            }

            #[allow(non_snake_case)]
            fn add_to(self, world: &mut World, entity: Entity) -> Result<()> {
                let ($($T,)+) = self;
                $(world.add(entity, $T)?;)+
                Ok(())
            }
        }
    };
}

impl_bundle!(A);
impl_bundle!(A, B);
impl_bundle!(A, B, C);
impl_bundle!(A, B, C, D);
impl_bundle!(A, B, C, D, E);
impl_bundle!(A, B, C, D, E, F);
impl_bundle!(A, B, C, D, E, F, G);
impl_bundle!(A, B, C, D, E, F, G, H);

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

    #[test]
    fn single_component_bundle_spawns() {
        let mut world = World::new();
        let e = world.create();
        (Position { x: 1.0, y: 2.0 },).add_to(&mut world, e).unwrap();
        assert_eq!(
            world.get::<Position>(e).unwrap(),
            &Position { x: 1.0, y: 2.0 }
        );
    }

    #[test]
    fn multi_component_bundle_spawns_both() {
        let mut world = World::new();
        let e = world.create();
        (Position { x: 1.0, y: 0.0 }, Velocity { dx: 3.0 })
            .add_to(&mut world, e)
            .unwrap();
        assert!(world.has::<Position>(e));
        assert!(world.has::<Velocity>(e));
    }
}

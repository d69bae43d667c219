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

//! Archetype-based Entity Component System for a voxel game engine.
//!
//! Entities are rows in dense, column-major tables grouped by archetype (their exact component
//! set); adding or removing a component migrates a row between archetypes along a cached graph of
//! transitions. Relations between entities live in separate sparse tables, queried from either
//! endpoint. A deferred-mutation scheduler runs registered systems in dependency order, applying
//! each one's command buffer before the next begins.

pub mod app;
pub mod archetype;
pub mod bitset;
pub mod command;
pub mod component;
pub mod config;
pub mod debug;
pub mod entity;
pub mod error;
pub mod event;
pub mod hierarchy;
#[cfg(feature = "profiling")]
pub mod logging;
pub mod observer;
pub mod plugin;
pub mod prelude;
pub mod query;
pub mod relation;
pub mod schedule;
pub mod system;
pub mod table;
pub mod time;
pub mod transform;
pub mod types;
pub mod utils;
pub mod world;

pub use app::App;
pub use command::CommandBuffer;
pub use component::{Bundle, Component};
pub use entity::Entity;
pub use error::{EcsError, Result};
pub use hierarchy::ChildOf;
pub use plugin::Plugin;
pub use query::{Query, QueryBuilder, RelationQuery, Row};
pub use schedule::Schedule;
pub use system::{BoxedSystem, FnSystem, System, SystemAccess, SystemId};
pub use world::World;

//! Convenient re-exports of commonly used types.
//!
//! ```
//! use voxel_ecs::prelude::*;
//! ```

pub use crate::app::App;
pub use crate::command::CommandBuffer;
pub use crate::component::{Bundle, Component};
pub use crate::config::{AmbiguityPolicy, Config};
pub use crate::entity::Entity;
pub use crate::error::{EcsError, Result};
pub use crate::event::{Events, ReaderId};
pub use crate::hierarchy::{ancestors, attach, children_of, descendants, detach, parent_of, ChildOf};
pub use crate::plugin::Plugin;
pub use crate::query::{Query, QueryBuilder, RelationQuery, Row};
pub use crate::schedule::{tag, OrderTarget, Schedule};
pub use crate::system::{BoxedSystem, FnSystem, System, SystemAccess, SystemId};
pub use crate::time::{DeltaTime, FixedTime, Time};
pub use crate::transform::{GlobalTransform, Transform};
pub use crate::world::World;

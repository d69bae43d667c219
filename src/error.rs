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

//! Error types shared by every public, fallible entry point.

use std::fmt;

use crate::entity::Entity;
use crate::types::DataTypeId;

/// ECS error type.
#[derive(Debug, Clone, PartialEq)]
pub enum EcsError {
    /// A looked-up entity's generation does not match its pool slot.
    StaleEntity(Entity),

    /// A `DataTypeId` was used that was never registered.
    UnknownType(DataTypeId),

    /// Bytes handed to `add`/`relate` do not match the registered layout.
    TypeMismatch { expected: DataTypeId },

    /// A type was registered twice, or under a kind it cannot structurally support.
    TypeRegistration(String),

    /// Inserting a tree-relation triple would create a cycle.
    CyclicRelation,

    /// An observer chain recursed past the configured depth.
    ObserverRecursionLimitExceeded { limit: usize },

    /// The system ordering-constraint graph contains a cycle.
    SchedulerCycle,

    /// Two conflicting systems have no declared order between them.
    AmbiguousOrder { system_a: String, system_b: String },

    /// A requested component/relation/resource is absent on the given entity or world.
    NotFound(String),

    /// A named system was not found in the schedule.
    SystemNotFound(String),

    /// A resource of this type was already inserted.
    ResourceAlreadyExists,

    /// Attempted to spawn more entities in one batch than the configured cap.
    BatchTooLarge { attempted: usize, limit: usize },

    /// The archetype graph exceeded its safety cap.
    ArchetypeLimitExceeded { limit: usize },

    /// Host I/O surfaced at a blueprint/persistence boundary.
    Io(String),

    /// Detailed spawn-time failure.
    Spawn(SpawnError),
}

/// Detailed spawn error types.
#[derive(Debug, Clone, PartialEq)]
pub enum SpawnError {
    /// Entity capacity exhausted.
    EntityCapacityExhausted { attempted: usize, capacity: usize },
    /// Component registration failed.
    ComponentRegistrationFailed(String),
    /// Archetype creation failed.
    ArchetypeCreationFailed {
        component_count: usize,
        reason: String,
    },
}

impl fmt::Display for SpawnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpawnError::EntityCapacityExhausted {
                attempted,
                capacity,
            } => {
                write!(
                    f,
                    "entity capacity exhausted: attempted to spawn {attempted}, max is {capacity}"
                )
            }
            SpawnError::ComponentRegistrationFailed(reason) => {
                write!(f, "failed to register component: {reason}")
            }
            SpawnError::ArchetypeCreationFailed {
                component_count,
                reason,
            } => {
                write!(
                    f,
                    "failed to create archetype for {component_count} components: {reason}"
                )
            }
        }
    }
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::StaleEntity(entity) => {
                write!(f, "stale entity: {entity:?} no longer alive")
            }
            EcsError::UnknownType(id) => write!(f, "unknown data type: {id:?}"),
            EcsError::TypeMismatch { expected } => {
                write!(f, "value does not match registered layout for {expected:?}")
            }
            EcsError::TypeRegistration(msg) => write!(f, "type registration failed: {msg}"),
            EcsError::CyclicRelation => write!(f, "relation insert would create a cycle"),
            EcsError::ObserverRecursionLimitExceeded { limit } => {
                write!(f, "observer recursion exceeded configured limit of {limit}")
            }
            EcsError::SchedulerCycle => write!(f, "system ordering constraints form a cycle"),
            EcsError::AmbiguousOrder { system_a, system_b } => write!(
                f,
                "systems '{system_a}' and '{system_b}' conflict with no declared order between them"
            ),
            EcsError::NotFound(msg) => write!(f, "not found: {msg}"),
            EcsError::SystemNotFound(name) => write!(f, "system not found: {name}"),
            EcsError::ResourceAlreadyExists => write!(f, "resource already inserted"),
            EcsError::BatchTooLarge { attempted, limit } => write!(
                f,
                "batch size too large: attempted {attempted}, max is {limit}"
            ),
            EcsError::ArchetypeLimitExceeded { limit } => {
                write!(f, "archetype graph exceeded its cap of {limit}")
            }
            EcsError::Io(msg) => write!(f, "io error: {msg}"),
            EcsError::Spawn(err) => write!(f, "spawn error: {err}"),
        }
    }
}

impl std::error::Error for EcsError {}

impl From<std::io::Error> for EcsError {
    fn from(err: std::io::Error) -> Self {
        EcsError::Io(err.to_string())
    }
}

impl From<SpawnError> for EcsError {
    fn from(err: SpawnError) -> Self {
        EcsError::Spawn(err)
    }
}

/// Result type alias used by every fallible entry point.
pub type Result<T> = std::result::Result<T, EcsError>;

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

//! Environment-driven configuration, read once when a [`World`](crate::world::World) is built.

use std::env;

/// What the scheduler does when it finds a conflicting pair of systems with no declared order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AmbiguityPolicy {
    Warn,
    Error,
}

/// Tunables sourced from the environment, with programmatic override via [`ConfigBuilder`].
#[derive(Clone, Debug)]
pub struct Config {
    /// `ECS_OBSERVER_RECURSION_LIMIT`, default 64.
    pub observer_recursion_limit: usize,
    /// `ECS_DEFAULT_TABLE_CAPACITY`, default 32.
    pub default_table_capacity: usize,
    /// `ECS_SCHEDULER_AMBIGUITY`, default `warn`.
    pub scheduler_ambiguity: AmbiguityPolicy,
}

const DEFAULT_OBSERVER_RECURSION_LIMIT: usize = 64;
const DEFAULT_TABLE_CAPACITY: usize = 32;

impl Default for Config {
    fn default() -> Self {
        Self {
            observer_recursion_limit: DEFAULT_OBSERVER_RECURSION_LIMIT,
            default_table_capacity: DEFAULT_TABLE_CAPACITY,
            scheduler_ambiguity: AmbiguityPolicy::Warn,
        }
    }
}

impl Config {
    /// Reads `ECS_OBSERVER_RECURSION_LIMIT`, `ECS_DEFAULT_TABLE_CAPACITY` and
    /// `ECS_SCHEDULER_AMBIGUITY` from the environment, falling back to the default and logging a
    /// warning for any value that is missing or malformed.
    pub fn from_env() -> Self {
        let mut config = Config::default();

        if let Ok(raw) = env::var("ECS_OBSERVER_RECURSION_LIMIT") {
            match raw.parse() {
                Ok(value) => config.observer_recursion_limit = value,
                Err(_) => tracing::warn!(
                    value = %raw,
                    "ECS_OBSERVER_RECURSION_LIMIT is not a valid integer, using default"
                ),
            }
        }

        if let Ok(raw) = env::var("ECS_DEFAULT_TABLE_CAPACITY") {
            match raw.parse() {
                Ok(value) => config.default_table_capacity = value,
                Err(_) => tracing::warn!(
                    value = %raw,
                    "ECS_DEFAULT_TABLE_CAPACITY is not a valid integer, using default"
                ),
            }
        }

        if let Ok(raw) = env::var("ECS_SCHEDULER_AMBIGUITY") {
            match raw.as_str() {
                "warn" => config.scheduler_ambiguity = AmbiguityPolicy::Warn,
                "error" => config.scheduler_ambiguity = AmbiguityPolicy::Error,
                _ => tracing::warn!(
                    value = %raw,
                    "ECS_SCHEDULER_AMBIGUITY must be 'warn' or 'error', using default"
                ),
            }
        }

        config
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Programmatic override of the environment-sourced [`Config`], e.g. for tests.
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn observer_recursion_limit(mut self, limit: usize) -> Self {
        self.config.observer_recursion_limit = limit;
        self
    }

    pub fn default_table_capacity(mut self, capacity: usize) -> Self {
        self.config.default_table_capacity = capacity;
        self
    }

    pub fn scheduler_ambiguity(mut self, policy: AmbiguityPolicy) -> Self {
        self.config.scheduler_ambiguity = policy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

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

//! World introspection for debugging, emitted through `tracing` rather than stdout so it
//! composes with whatever subscriber the embedding application has installed.

use std::collections::VecDeque;

use crate::archetype::ArchetypeId;
use crate::world::World;

/// Per-archetype summary used by [`WorldInspector::archetype_summary`].
#[derive(Clone, Debug)]
pub struct ArchetypeInfo {
    pub id: u32,
    pub column_count: usize,
    pub relation_table_count: usize,
}

/// Snapshots of `World` state for logging, not a live view.
pub struct WorldInspector;

impl WorldInspector {
    pub fn entity_count(world: &World) -> usize {
        world.len()
    }

    pub fn archetype_summary(world: &World) -> Vec<ArchetypeInfo> {
        let graph = world.archetype_graph();
        (0..graph.archetype_count() as u32)
            .map(|id| ArchetypeInfo {
                id,
                column_count: graph.columns(ArchetypeId(id)).len(),
                relation_table_count: world.relations().table_count(),
            })
            .collect()
    }

    /// Logs a one-line summary of the world plus one line per archetype, at `info` level.
    pub fn log_summary(world: &World) {
        tracing::info!(
            entities = Self::entity_count(world),
            archetypes = world.archetype_graph().archetype_count(),
            relation_tables = world.relations().table_count(),
            "world summary"
        );
        for info in Self::archetype_summary(world) {
            tracing::debug!(
                archetype = info.id,
                columns = info.column_count,
                "archetype summary"
            );
        }
    }
}

/// Rolling average of recent frame times, for a HUD or periodic log line.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    frame_times: VecDeque<f32>,
    max_samples: usize,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self {
            frame_times: VecDeque::new(),
            max_samples: 60,
        }
    }

    pub fn record_frame_time(&mut self, time_ms: f32) {
        self.frame_times.push_back(time_ms);
        if self.frame_times.len() > self.max_samples {
            self.frame_times.pop_front();
        }
    }

    pub fn fps(&self) -> f32 {
        let avg = self.avg_frame_time();
        if avg > 0.0 {
            1000.0 / avg
        } else {
            0.0
        }
    }

    pub fn avg_frame_time(&self) -> f32 {
        if self.frame_times.is_empty() {
            return 0.0;
        }
        self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32
    }

    pub fn min_frame_time(&self) -> f32 {
        self.frame_times.iter().copied().fold(f32::INFINITY, f32::min)
    }

    pub fn max_frame_time(&self) -> f32 {
        self.frame_times.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    pub fn log(&self) {
        tracing::info!(
            fps = self.fps(),
            avg_ms = self.avg_frame_time(),
            min_ms = self.min_frame_time(),
            max_ms = self.max_frame_time(),
            "frame diagnostics"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_report_roughly_correct_fps() {
        let mut diag = Diagnostics::new();
        for _ in 0..10 {
            diag.record_frame_time(16.67);
        }
        assert!((diag.fps() - 60.0).abs() < 1.0);
        assert!((diag.avg_frame_time() - 16.67).abs() < 0.1);
    }

    #[test]
    fn world_inspector_counts_entities() {
        let mut world = World::new();
        assert_eq!(WorldInspector::entity_count(&world), 0);
        world.create();
        assert_eq!(WorldInspector::entity_count(&world), 1);
    }
}

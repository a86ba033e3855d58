//! World configuration.
//!
//! Every tunable the world uses is injected here at construction time: map
//! dimensions, scheduler batch sizes, the broadcast window, the deletion grace
//! window and pool limits.

use crate::error::{WorldError, WorldResult};
use crate::types::MapId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_batch_size() -> usize { 100 }
fn default_view_radius() -> u32 { 12 }
fn default_deletion_grace_ms() -> u64 { 30_000 }
fn default_deletion_queue_capacity() -> usize { 2000 }
fn default_marker_pool_preallocate() -> usize { 64 }
fn default_drop_stack_limit() -> usize { 10 }

/// Longest accepted deletion grace window: one day.
pub const MAX_DELETION_GRACE_MS: u64 = 86_400_000;

/// Dimensions of one map grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapDefinition {
    /// Map identifier
    pub id: MapId,
    /// Number of columns
    pub width: u32,
    /// Number of rows
    pub height: u32,
}

impl MapDefinition {
    pub const fn new(id: MapId, width: u32, height: u32) -> Self {
        Self { id, width, height }
    }
}

/// Configuration for a [`World`](crate::World).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Maps created when the world is constructed
    #[serde(default)]
    pub maps: Vec<MapDefinition>,
    /// Maximum active entities advanced per tick
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Maximum behavior handlers advanced per tick
    #[serde(default = "default_batch_size")]
    pub behavior_batch_size: usize,
    /// Half-width of the square broadcast window, in cells
    #[serde(default = "default_view_radius")]
    pub view_radius: u32,
    /// Delay between closing a marker and recycling it, in milliseconds
    #[serde(default = "default_deletion_grace_ms")]
    pub deletion_grace_ms: u64,
    /// Maximum number of closed markers awaiting recycle
    #[serde(default = "default_deletion_queue_capacity")]
    pub deletion_queue_capacity: usize,
    /// Markers constructed up front when the world starts
    #[serde(default = "default_marker_pool_preallocate")]
    pub marker_pool_preallocate: usize,
    /// Upper bound on markers checked out at once (None grows without limit)
    #[serde(default)]
    pub marker_pool_limit: Option<usize>,
    /// Drop-point candidates holding this many items or more are skipped
    #[serde(default = "default_drop_stack_limit")]
    pub drop_stack_limit: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            maps: Vec::new(),
            batch_size: default_batch_size(),
            behavior_batch_size: default_batch_size(),
            view_radius: default_view_radius(),
            deletion_grace_ms: default_deletion_grace_ms(),
            deletion_queue_capacity: default_deletion_queue_capacity(),
            marker_pool_preallocate: default_marker_pool_preallocate(),
            marker_pool_limit: None,
            drop_stack_limit: default_drop_stack_limit(),
        }
    }
}

impl WorldConfig {
    /// Grace window as a [`Duration`].
    pub fn deletion_grace(&self) -> Duration {
        Duration::from_millis(self.deletion_grace_ms)
    }

    /// Validates the configuration for consistency.
    pub fn validate(&self) -> WorldResult<()> {
        if self.batch_size == 0 {
            return Err(WorldError::InvalidConfig("batch_size must be at least 1".to_string()));
        }
        if self.behavior_batch_size == 0 {
            return Err(WorldError::InvalidConfig(
                "behavior_batch_size must be at least 1".to_string(),
            ));
        }
        if self.deletion_grace_ms > MAX_DELETION_GRACE_MS {
            return Err(WorldError::InvalidConfig(format!(
                "deletion_grace_ms ({}) exceeds {MAX_DELETION_GRACE_MS}",
                self.deletion_grace_ms
            )));
        }
        if self.deletion_queue_capacity == 0 {
            return Err(WorldError::InvalidConfig(
                "deletion_queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.drop_stack_limit == 0 {
            return Err(WorldError::InvalidConfig(
                "drop_stack_limit must be at least 1".to_string(),
            ));
        }
        if let Some(limit) = self.marker_pool_limit {
            if self.marker_pool_preallocate > limit {
                return Err(WorldError::InvalidConfig(format!(
                    "marker_pool_preallocate ({}) exceeds marker_pool_limit ({limit})",
                    self.marker_pool_preallocate
                )));
            }
        }

        let mut seen = std::collections::HashSet::new();
        for map in &self.maps {
            if map.width == 0 || map.height == 0 {
                return Err(WorldError::InvalidConfig(format!(
                    "{} has an empty dimension ({}x{})",
                    map.id, map.width, map.height
                )));
            }
            if !seen.insert(map.id) {
                return Err(WorldError::InvalidConfig(format!("{} is defined twice", map.id)));
            }
        }

        Ok(())
    }
}

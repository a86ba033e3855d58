//! Snapshot of world counters, serializable for periodic status logs.

use crate::broadcast::BroadcastStats;
use crate::pool::PoolStats;
use serde::{Deserialize, Serialize};

/// Point-in-time world statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldStats {
    /// Registered maps
    pub maps: usize,
    /// Live entities in the arena, placed or not
    pub entities: usize,
    /// Entities currently occupying a cell
    pub placed: usize,
    /// Entries in the active update list
    pub active: usize,
    /// Entries in the behavior update list
    pub behaviors: usize,
    /// Markers that are placed and not closed
    pub open_markers: usize,
    /// Closed markers waiting out their grace window
    pub pending_deletions: usize,
    /// Heartbeats processed
    pub ticks: u64,
    /// Per-entity updates run
    pub updates: u64,
    /// Per-entity updates that failed
    pub update_failures: u64,
    pub markers_created: u64,
    /// Marker creations refused (invalid point, duplicate or pool exhausted)
    pub markers_rejected: u64,
    pub markers_recycled: u64,
    /// Recycles that skipped the grace window because the queue was full
    pub early_recycles: u64,
    pub broadcast: BroadcastStats,
    pub marker_pool: PoolStats,
}

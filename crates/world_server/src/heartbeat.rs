//! The server heartbeat.
//!
//! One `tokio` interval drives [`World::tick`](world_index::World::tick):
//! each beat advances a bounded slice of the active entities and behavior
//! handlers and recycles markers whose grace window has passed. World
//! statistics are logged every `stats_interval_ticks` beats.

use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, trace};
use world_index::{SharedWorld, WorldStats};

/// Periodic driver for a [`SharedWorld`].
#[derive(Debug, Clone)]
pub struct Heartbeat {
    world: SharedWorld,
    period: Duration,
    stats_every: u64,
}

impl Heartbeat {
    /// # Arguments
    ///
    /// * `world` - World to tick
    /// * `period` - Time between beats
    /// * `stats_every` - Log statistics every this many beats (0 disables)
    pub fn new(world: SharedWorld, period: Duration, stats_every: u64) -> Self {
        Self {
            world,
            period,
            stats_every,
        }
    }

    /// Ticks until `shutdown` fires and returns the number of beats run.
    ///
    /// The first beat runs immediately. Beats that fall behind are delayed,
    /// not bunched up.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> u64 {
        let mut beats = interval(self.period);
        beats.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = 0u64;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                _ = beats.tick() => {
                    let report = self.world.tick().await;
                    ticks += 1;
                    trace!(
                        tick = ticks,
                        entities = report.entities.visited,
                        behaviors = report.behaviors.visited,
                        recycled = report.recycled,
                        "heartbeat"
                    );

                    if self.stats_every > 0 && ticks % self.stats_every == 0 {
                        log_stats(&self.world.stats().await);
                    }
                }
            }
        }

        info!("💓 Heartbeat stopped after {} ticks", ticks);
        ticks
    }
}

/// Logs one status line for `stats`.
pub fn log_stats(stats: &WorldStats) {
    info!(
        "📊 World status - {} entities | {} placed | {} active | {} behaviors | {} open markers | {} pending deletions",
        stats.entities,
        stats.placed,
        stats.active,
        stats.behaviors,
        stats.open_markers,
        stats.pending_deletions
    );

    if stats.update_failures > 0 || stats.broadcast.serialization_failures > 0 {
        info!(
            "⚠️ {} failed updates | {} unserializable broadcasts so far",
            stats.update_failures, stats.broadcast.serialization_failures
        );
    }
}

//! Heartbeat processing.

use super::World;
use crate::error::{WorldError, WorldResult};
use crate::object::{TickContext, TickOutcome};
use crate::scheduler::{ActiveList, BatchReport};
use crate::types::{EntityId, EntityKind};
use tokio::time::Instant;
use tracing::{debug, trace};

/// Work done by one heartbeat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Batch over the active entity list
    pub entities: BatchReport,
    /// Batch over the behavior handler list
    pub behaviors: BatchReport,
    /// Markers recycled by the deletion step
    pub recycled: usize,
}

fn active_list(world: &World) -> &ActiveList {
    &world.active
}

fn behavior_list(world: &World) -> &ActiveList {
    &world.behaviors
}

impl World {
    /// Runs one heartbeat at the current instant.
    pub fn tick(&mut self) -> TickReport {
        self.tick_at(Instant::now())
    }

    /// Runs one heartbeat: a batch of active entities, a batch of behavior
    /// handlers, then one deletion queue step.
    pub fn tick_at(&mut self, now: Instant) -> TickReport {
        self.counters.ticks += 1;

        let scheduler = self.entity_scheduler;
        let mut cursor = self.entity_cursor;
        let entities = scheduler.run_batch(self, &mut cursor, active_list, |world, id| {
            world.update_entity(id, now)
        });
        self.entity_cursor = cursor;

        let scheduler = self.behavior_scheduler;
        let mut cursor = self.behavior_cursor;
        let behaviors = scheduler.run_batch(self, &mut cursor, behavior_list, |world, id| {
            world.update_entity(id, now)
        });
        self.behavior_cursor = cursor;

        let mut recycled = 0;
        if let Some(entry) = self.deletions.step(now) {
            if self.recycle_marker(entry.id(), false) {
                recycled += 1;
            }
        }

        self.counters.updates += (entities.visited + behaviors.visited) as u64;
        self.counters.update_failures += (entities.failed + behaviors.failed) as u64;

        trace!(
            tick = self.counters.ticks,
            entities = entities.visited,
            behaviors = behaviors.visited,
            recycled,
            "Tick complete"
        );
        TickReport {
            entities,
            behaviors,
            recycled,
        }
    }

    fn update_entity(&mut self, id: EntityId, now: Instant) -> WorldResult<()> {
        let Some(record) = self.arena.get_mut(id) else {
            self.active.remove(id);
            self.behaviors.remove(id);
            return Err(WorldError::UnknownEntity(id));
        };

        let kind = record.kind;
        let ctx = TickContext {
            id,
            now,
            placement: record.placement,
        };
        let outcome = record.object.tick(&ctx)?;

        match outcome {
            TickOutcome::Continue => {}
            TickOutcome::Close | TickOutcome::Despawn if kind == EntityKind::VisibleEvent => {
                self.close_marker_at(id, now);
            }
            TickOutcome::Close => {
                debug!(entity = %id, "Entity closed itself");
                self.active.remove(id);
                self.behaviors.remove(id);
                if self.placement(id).is_some() {
                    self.try_remove(id)?;
                }
            }
            TickOutcome::Despawn => {
                debug!(entity = %id, "Entity despawned itself");
                self.despawn(id);
            }
        }
        Ok(())
    }
}

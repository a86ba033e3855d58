//! Map management, placement with visibility broadcast, and spatial queries.

use super::arena::EntityArena;
use super::World;
use crate::broadcast::{Notice, VisibilityBroadcaster};
use crate::config::MapDefinition;
use crate::error::{WorldError, WorldResult};
use crate::events::WorldEvent;
use crate::grid::MapCell;
use crate::marker::VisibleMarker;
use crate::object::{MessageContext, WorldObject};
use crate::registry::{RangeFilter, WorldMap};
use crate::types::{EntityId, EntityKind, MapId, Placement, Point};
use std::collections::HashSet;
use tracing::{debug, info, trace};

/// Sends the appear or disappear message of every subject to one observer.
fn show_to(
    broadcaster: &mut VisibilityBroadcaster,
    arena: &EntityArena,
    observer: EntityId,
    subjects: &[EntityId],
    notice: Notice,
) {
    for subject in subjects {
        let Some(record) = arena.get(*subject) else {
            continue;
        };
        let Some(placement) = record.placement else {
            continue;
        };
        let ctx = MessageContext {
            id: *subject,
            kind: record.kind,
            placement,
        };
        let message = match notice {
            Notice::Appear => record.object.appearance_message(&ctx),
            Notice::Disappear => record.object.disappearance_message(&ctx),
        };
        if let Some(bytes) = broadcaster.accept(*subject, notice, message) {
            broadcaster.deliver_to(&[observer], &bytes);
        }
    }
}

fn difference(left: &[EntityId], right: &[EntityId]) -> Vec<EntityId> {
    let right: HashSet<&EntityId> = right.iter().collect();
    left.iter().filter(|id| !right.contains(id)).copied().collect()
}

impl World {
    /// Registers a new, empty map.
    pub fn add_map(&mut self, definition: MapDefinition) -> WorldResult<()> {
        if definition.width == 0 || definition.height == 0 {
            return Err(WorldError::InvalidConfig(format!(
                "{} has empty dimensions {}x{}",
                definition.id, definition.width, definition.height
            )));
        }
        if self.maps.contains_key(&definition.id) {
            return Err(WorldError::InvalidConfig(format!("{} defined twice", definition.id)));
        }

        self.maps.insert(
            definition.id,
            WorldMap::new(definition.id, definition.width, definition.height),
        );
        info!(
            map = %definition.id,
            width = definition.width,
            height = definition.height,
            "🗺️ Map registered"
        );
        Ok(())
    }

    /// Empties every cell of `map` without broadcasting.
    ///
    /// Detached entities stay alive (and scheduled) but unplaced. Markers on
    /// the map are closed and recycled at once since there is nothing left for
    /// them to be visible on.
    pub fn reset_map(&mut self, map: MapId) -> bool {
        let Some(world_map) = self.maps.get_mut(&map) else {
            debug!(%map, "Reset of unknown map ignored");
            return false;
        };

        let detached = world_map.clear();
        let mut markers = Vec::new();
        for id in &detached {
            if let Some(record) = self.arena.get_mut(*id) {
                record.placement = None;
                if record.kind == EntityKind::VisibleEvent {
                    markers.push(*id);
                }
            }
        }
        for id in &markers {
            self.retire_marker(*id);
        }

        info!(%map, detached = detached.len(), markers = markers.len(), "🧹 Map reset");
        true
    }

    /// Hands an entity to the world. Tickable entities join the active
    /// update list immediately; placement is a separate step.
    pub fn spawn(&mut self, object: Box<dyn WorldObject>) -> EntityId {
        let tickable = object.is_tickable();
        let id = self.arena.insert(object);
        if tickable {
            self.active.insert(id);
        }
        trace!(entity = %id, tickable, "Entity spawned");
        id
    }

    /// Removes an entity from the world and returns it.
    ///
    /// A placed entity is removed from its map first, with the usual
    /// disappear broadcast. Visible markers are refused; they leave through
    /// [`close_visible_marker`](World::close_visible_marker).
    pub fn despawn(&mut self, id: EntityId) -> Option<Box<dyn WorldObject>> {
        let Some(record) = self.arena.get(id) else {
            debug!(entity = %id, "Despawn of unknown entity ignored");
            return None;
        };
        if record.kind == EntityKind::VisibleEvent {
            debug!(entity = %id, "Markers are closed, not despawned");
            return None;
        }
        if record.placement.is_some() {
            if let Err(err) = self.try_remove(id) {
                debug!(entity = %id, error = %err, "Detach before despawn failed");
            }
        }

        self.active.remove(id);
        self.behaviors.remove(id);
        self.arena.remove(id).map(|record| record.object)
    }

    /// Places an entity at `(x, y)` on `map` and announces it to nearby
    /// players. Returns `false` for an unknown entity or map, an
    /// out-of-bounds point, or an entity that is already placed.
    pub fn place_entity(&mut self, id: EntityId, map: MapId, x: i32, y: i32) -> bool {
        match self.try_place(id, map, Point::new(x, y)) {
            Ok(()) => true,
            Err(err) => {
                debug!(entity = %id, %map, x, y, error = %err, "Placement rejected");
                false
            }
        }
    }

    /// [`place_entity`](World::place_entity) with the failure reason.
    ///
    /// Every player in the broadcast window receives the entity's appearance
    /// message. A placed player additionally receives the appearance of
    /// everything already in its own window.
    pub fn try_place(&mut self, id: EntityId, map: MapId, point: Point) -> WorldResult<()> {
        let record = self.arena.get(id).ok_or(WorldError::UnknownEntity(id))?;
        if record.placement.is_some() {
            return Err(WorldError::AlreadyPlaced(id));
        }
        let world_map = self.maps.get_mut(&map).ok_or(WorldError::UnknownMap(map))?;

        let kind = record.kind;
        world_map.add_object(id, kind, record.object.event_flags(), point)?;

        let placement = Placement::new(map, point);
        let ctx = MessageContext { id, kind, placement };
        let message = record.object.appearance_message(&ctx);
        if let Some(record) = self.arena.get_mut(id) {
            record.placement = Some(placement);
        }

        self.broadcaster.broadcast(world_map, point, id, Notice::Appear, message);
        if kind.is_observer() {
            let visible = self.broadcaster.members_around(world_map, point, Some(id));
            show_to(&mut self.broadcaster, &self.arena, id, &visible, Notice::Appear);
        }

        trace!(entity = %id, %map, %point, "Entity placed");
        self.listeners.publish(&WorldEvent::EntityPlaced { id, kind, placement });
        Ok(())
    }

    /// Detaches an entity from its map, telling nearby players it is gone.
    /// Returns `false` if it was not placed.
    pub fn remove_entity(&mut self, id: EntityId) -> bool {
        match self.try_remove(id) {
            Ok(_) => true,
            Err(err) => {
                debug!(entity = %id, error = %err, "Removal rejected");
                false
            }
        }
    }

    /// [`remove_entity`](World::remove_entity) with the failure reason.
    ///
    /// The disappearance message is produced while the entity still has its
    /// position; the window around the vacated cell is notified after the
    /// entity has left it.
    pub fn try_remove(&mut self, id: EntityId) -> WorldResult<Placement> {
        let record = self.arena.get_mut(id).ok_or(WorldError::UnknownEntity(id))?;
        let placement = record.placement.ok_or(WorldError::NotPlaced(id))?;
        let world_map = self
            .maps
            .get_mut(&placement.map)
            .ok_or(WorldError::UnknownMap(placement.map))?;

        let kind = record.kind;
        let ctx = MessageContext { id, kind, placement };
        let message = record.object.disappearance_message(&ctx);

        world_map.remove_object(id);
        record.placement = None;
        self.broadcaster
            .broadcast(world_map, placement.point, id, Notice::Disappear, message);

        trace!(entity = %id, map = %placement.map, point = %placement.point, "Entity removed");
        self.listeners.publish(&WorldEvent::EntityRemoved { id, kind, placement });
        Ok(placement)
    }

    /// Moves a placed entity to `(x, y)` on the same map.
    pub fn move_entity(&mut self, id: EntityId, x: i32, y: i32) -> bool {
        match self.try_move(id, Point::new(x, y)) {
            Ok(()) => true,
            Err(err) => {
                debug!(entity = %id, x, y, error = %err, "Move rejected");
                false
            }
        }
    }

    /// [`move_entity`](World::move_entity) with the failure reason.
    ///
    /// Players that only saw the old position get a disappear message, every
    /// player around the new position gets a fresh appear. A moving player is
    /// likewise shown what entered its window and told what left it.
    pub fn try_move(&mut self, id: EntityId, to: Point) -> WorldResult<()> {
        let record = self.arena.get_mut(id).ok_or(WorldError::UnknownEntity(id))?;
        let from = record.placement.ok_or(WorldError::NotPlaced(id))?;
        let world_map = self
            .maps
            .get_mut(&from.map)
            .ok_or(WorldError::UnknownMap(from.map))?;
        if !world_map.contains_point(to) {
            return Err(WorldError::OutOfBounds {
                map: from.map,
                x: to.x,
                y: to.y,
            });
        }
        if from.point == to {
            return Ok(());
        }

        let kind = record.kind;
        let old_observers = self.broadcaster.observers_around(world_map, from.point, Some(id));
        let old_members = if kind.is_observer() {
            self.broadcaster.members_around(world_map, from.point, Some(id))
        } else {
            Vec::new()
        };
        let farewell = record
            .object
            .disappearance_message(&MessageContext { id, kind, placement: from });

        world_map.remove_object(id);
        if let Err(err) = world_map.add_object(id, kind, record.object.event_flags(), to) {
            record.placement = None;
            return Err(err);
        }
        let dest = Placement::new(from.map, to);
        record.placement = Some(dest);
        let greeting = record
            .object
            .appearance_message(&MessageContext { id, kind, placement: dest });

        let new_observers = self.broadcaster.observers_around(world_map, to, Some(id));
        let left = difference(&old_observers, &new_observers);
        if !left.is_empty() {
            if let Some(bytes) = self.broadcaster.accept(id, Notice::Disappear, farewell) {
                self.broadcaster.deliver_to(&left, &bytes);
            }
        }
        if let Some(bytes) = self.broadcaster.accept(id, Notice::Appear, greeting) {
            self.broadcaster.deliver_to(&new_observers, &bytes);
        }

        if kind.is_observer() {
            let new_members = self.broadcaster.members_around(world_map, to, Some(id));
            let lost = difference(&old_members, &new_members);
            let gained = difference(&new_members, &old_members);
            show_to(&mut self.broadcaster, &self.arena, id, &lost, Notice::Disappear);
            show_to(&mut self.broadcaster, &self.arena, id, &gained, Notice::Appear);
        }

        trace!(entity = %id, from = %from.point, %to, "Entity moved");
        self.listeners.publish(&WorldEvent::EntityMoved { id, from, to: dest });
        Ok(())
    }

    /// Cell at `(x, y)`, `None` for an unknown map or out-of-bounds point.
    pub fn cell_at(&self, map: MapId, x: i32, y: i32) -> Option<&MapCell> {
        self.maps.get(&map)?.cell(Point::new(x, y))
    }

    /// Entities within Chebyshev distance `radius` of `(x, y)`.
    pub fn entities_in_range(&self, map: MapId, x: i32, y: i32, radius: u32) -> Vec<EntityId> {
        self.entities_in_range_filtered(map, x, y, radius, RangeFilter::All)
    }

    pub fn entities_in_range_filtered(
        &self,
        map: MapId,
        x: i32,
        y: i32,
        radius: u32,
        filter: RangeFilter,
    ) -> Vec<EntityId> {
        self.maps
            .get(&map)
            .map(|world_map| world_map.objects_in_range(Point::new(x, y), radius, filter))
            .unwrap_or_default()
    }

    /// Live, non-defeated entities of `kind` at `(x, y)`.
    ///
    /// `None` when the terrain blocks the coordinate, the point lies outside
    /// the map or the map is unknown.
    pub fn count_duplicates_at(&self, map: MapId, x: i32, y: i32, kind: EntityKind) -> Option<usize> {
        let point = Point::new(x, y);
        let cell = self.maps.get(&map)?.cell(point)?;
        if self.oracle.is_blocked(map, point) {
            return None;
        }

        let count = cell
            .members()
            .iter()
            .filter_map(|member| self.arena.get(*member))
            .filter(|record| record.kind == kind && !record.object.is_defeated())
            .filter(|record| {
                record
                    .downcast_ref::<VisibleMarker>()
                    .map_or(true, |marker| !marker.is_closed())
            })
            .count();
        Some(count)
    }

    /// Up to `max` in-bounds, unblocked points around `(x, y)`, nearest ring
    /// first.
    pub fn find_valid_points(&self, map: MapId, x: i32, y: i32, max: usize) -> Vec<Point> {
        let Some(world_map) = self.maps.get(&map) else {
            return Vec::new();
        };
        self.search.valid_points(Point::new(x, y), max, |point| {
            world_map.contains_point(point) && !self.oracle.is_blocked(map, point)
        })
    }

    /// Up to `max` drop coordinates around `(x, y)`, spread over the cells
    /// holding the fewest items.
    pub fn find_drop_points(&self, map: MapId, x: i32, y: i32, max: usize) -> Vec<Point> {
        self.search.drop_points(Point::new(x, y), max, |point| {
            self.count_duplicates_at(map, point.x, point.y, EntityKind::Item)
        })
    }
}

//! Generational storage for world entities.

use crate::object::WorldObject;
use crate::types::{EntityId, EntityKind, Placement};

/// An entity owned by the world.
#[derive(Debug)]
pub struct EntityRecord {
    pub(crate) object: Box<dyn WorldObject>,
    pub(crate) kind: EntityKind,
    pub(crate) placement: Option<Placement>,
}

impl EntityRecord {
    pub fn object(&self) -> &dyn WorldObject {
        self.object.as_ref()
    }

    pub fn object_mut(&mut self) -> &mut dyn WorldObject {
        self.object.as_mut()
    }

    /// Kind captured when the entity was spawned.
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Current map and cell, `None` while detached.
    pub fn placement(&self) -> Option<Placement> {
        self.placement
    }

    /// Downcasts the object to a concrete type.
    pub fn downcast_ref<T: WorldObject>(&self) -> Option<&T> {
        self.object.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: WorldObject>(&mut self) -> Option<&mut T> {
        self.object.as_any_mut().downcast_mut::<T>()
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    record: Option<EntityRecord>,
}

/// Slot vector with a free list. Freed slots bump their generation so stale
/// handles stop resolving.
#[derive(Debug, Default)]
pub(crate) struct EntityArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl EntityArena {
    pub(crate) fn insert(&mut self, object: Box<dyn WorldObject>) -> EntityId {
        let record = EntityRecord {
            kind: object.kind(),
            object,
            placement: None,
        };
        self.live += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.record = Some(record);
            return EntityId::new(index, slot.generation);
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            record: Some(record),
        });
        EntityId::new(index, 0)
    }

    fn slot(&self, id: EntityId) -> Option<&Slot> {
        self.slots
            .get(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
    }

    pub(crate) fn get(&self, id: EntityId) -> Option<&EntityRecord> {
        self.slot(id)?.record.as_ref()
    }

    pub(crate) fn get_mut(&mut self, id: EntityId) -> Option<&mut EntityRecord> {
        self.slots
            .get_mut(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())?
            .record
            .as_mut()
    }

    pub(crate) fn remove(&mut self, id: EntityId) -> Option<EntityRecord> {
        let slot = self
            .slots
            .get_mut(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())?;
        let record = slot.record.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index());
        self.live -= 1;
        Some(record)
    }

    pub(crate) fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.live
    }

    pub(crate) fn records(&self) -> impl Iterator<Item = (EntityId, &EntityRecord)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.record
                .as_ref()
                .map(|record| (EntityId::new(index as u32, slot.generation), record))
        })
    }
}

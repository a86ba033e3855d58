//! # World Object Contract
//!
//! Every entity a world can hold implements [`WorldObject`]. The trait is a
//! small capability surface rather than a class hierarchy:
//!
//! - **Kind** - an explicit [`EntityKind`] discriminant used by the registry's
//!   category indices and by the broadcaster to find observers
//! - **Broadcastable** - production of the appear / disappear messages pushed
//!   to nearby players
//! - **Tickable** - an optional per-tick update driven by the scheduler
//!
//! Position is not part of the object: the world's arena owns each entity's
//! [`Placement`], which keeps the cell-membership invariant in one place.

use crate::error::WorldResult;
use crate::grid::CellFlags;
use crate::types::{EntityId, EntityKind, MapId, Placement};
use serde::Serialize;
use std::any::Any;
use std::fmt;
use tokio::time::Instant;

/// What a message is being produced about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageContext {
    pub id: EntityId,
    pub kind: EntityKind,
    pub placement: Placement,
}

#[derive(Serialize)]
struct Snapshot<'a> {
    event: &'a str,
    id: EntityId,
    kind: EntityKind,
    map: MapId,
    x: i32,
    y: i32,
}

/// Encodes the default JSON notification for `ctx`.
///
/// `event` is `"appear"` or `"disappear"`; objects that need richer payloads
/// override the [`Broadcastable`] methods instead.
pub fn snapshot_message(ctx: &MessageContext, event: &str) -> WorldResult<Vec<u8>> {
    let snapshot = Snapshot {
        event,
        id: ctx.id,
        kind: ctx.kind,
        map: ctx.placement.map,
        x: ctx.placement.point.x,
        y: ctx.placement.point.y,
    };
    Ok(serde_json::to_vec(&snapshot)?)
}

/// Production of visibility messages.
///
/// Both messages are built while the entity is still placed, so the context
/// always carries a valid position. An `Err` makes the broadcaster skip the
/// notification; it never reaches the caller of place or remove.
pub trait Broadcastable {
    fn appearance_message(&self, ctx: &MessageContext) -> WorldResult<Vec<u8>> {
        snapshot_message(ctx, "appear")
    }

    fn disappearance_message(&self, ctx: &MessageContext) -> WorldResult<Vec<u8>> {
        snapshot_message(ctx, "disappear")
    }
}

/// Per-invocation data handed to [`WorldObject::tick`].
#[derive(Debug, Clone, Copy)]
pub struct TickContext {
    pub id: EntityId,
    pub now: Instant,
    pub placement: Option<Placement>,
}

/// What the world should do with an entity after its update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Keep the entity scheduled
    Continue,
    /// Close the entity (markers enter the deletion grace window, other
    /// entities are detached from their map)
    Close,
    /// Remove the entity from the world entirely
    Despawn,
}

/// An entity that can live in a world.
pub trait WorldObject: Broadcastable + Send + fmt::Debug + Any {
    fn kind(&self) -> EntityKind;

    /// Cell flags this entity raises while it occupies a cell. Only honored
    /// for event-kind entities.
    fn event_flags(&self) -> CellFlags {
        CellFlags::NONE
    }

    /// Defeated entities are ignored when counting occupants.
    fn is_defeated(&self) -> bool {
        false
    }

    /// Whether [`spawn`](crate::World::spawn) should enroll this entity in the
    /// update scheduler.
    fn is_tickable(&self) -> bool {
        false
    }

    fn tick(&mut self, ctx: &TickContext) -> WorldResult<TickOutcome> {
        let _ = ctx;
        Ok(TickOutcome::Continue)
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Converts the boxed object for owned downcasting.
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

/// General-purpose entity for players, monsters, NPCs, items and plain events.
///
/// Game logic with real behavior implements [`WorldObject`] itself; `Actor`
/// covers entities that only need a name, a kind and a few flags.
#[derive(Debug, Clone)]
pub struct Actor {
    kind: EntityKind,
    name: String,
    defeated: bool,
    flags: CellFlags,
    tickable: bool,
    updates: u64,
}

impl Actor {
    pub fn new(kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            defeated: false,
            flags: CellFlags::NONE,
            tickable: false,
            updates: 0,
        }
    }

    pub fn player(name: impl Into<String>) -> Self {
        Self::new(EntityKind::Player, name)
    }

    pub fn monster(name: impl Into<String>) -> Self {
        Self::new(EntityKind::Monster, name)
    }

    pub fn npc(name: impl Into<String>) -> Self {
        Self::new(EntityKind::Npc, name)
    }

    pub fn item(name: impl Into<String>) -> Self {
        Self::new(EntityKind::Item, name)
    }

    /// An event entity raising `flags` on the cell it occupies.
    pub fn event(name: impl Into<String>, flags: CellFlags) -> Self {
        let mut actor = Self::new(EntityKind::Event, name);
        actor.flags = flags;
        actor
    }

    /// Enrolls the actor in the update scheduler when spawned.
    pub fn tickable(mut self) -> Self {
        self.tickable = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_defeated(&mut self, defeated: bool) {
        self.defeated = defeated;
    }

    /// Number of scheduler updates this actor has received.
    pub fn updates(&self) -> u64 {
        self.updates
    }
}

#[derive(Serialize)]
struct ActorMessage<'a> {
    event: &'a str,
    id: EntityId,
    kind: EntityKind,
    name: &'a str,
    map: MapId,
    x: i32,
    y: i32,
}

impl Actor {
    fn message(&self, ctx: &MessageContext, event: &str) -> WorldResult<Vec<u8>> {
        let message = ActorMessage {
            event,
            id: ctx.id,
            kind: self.kind,
            name: &self.name,
            map: ctx.placement.map,
            x: ctx.placement.point.x,
            y: ctx.placement.point.y,
        };
        Ok(serde_json::to_vec(&message)?)
    }
}

impl Broadcastable for Actor {
    fn appearance_message(&self, ctx: &MessageContext) -> WorldResult<Vec<u8>> {
        self.message(ctx, "appear")
    }

    fn disappearance_message(&self, ctx: &MessageContext) -> WorldResult<Vec<u8>> {
        self.message(ctx, "disappear")
    }
}

impl WorldObject for Actor {
    fn kind(&self) -> EntityKind {
        self.kind
    }

    fn event_flags(&self) -> CellFlags {
        self.flags
    }

    fn is_defeated(&self) -> bool {
        self.defeated
    }

    fn is_tickable(&self) -> bool {
        self.tickable
    }

    fn tick(&mut self, _ctx: &TickContext) -> WorldResult<TickOutcome> {
        self.updates += 1;
        Ok(TickOutcome::Continue)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point;

    fn context() -> MessageContext {
        MessageContext {
            id: EntityId::new(3, 1),
            kind: EntityKind::Monster,
            placement: Placement::new(MapId(2), Point::new(5, 6)),
        }
    }

    #[test]
    fn test_snapshot_is_json() {
        let bytes = snapshot_message(&context(), "appear").unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["event"], "appear");
        assert_eq!(value["kind"], "monster");
        assert_eq!(value["map"], 2);
        assert_eq!(value["x"], 5);
        assert_eq!(value["y"], 6);
    }

    #[test]
    fn test_actor_message_carries_name() {
        let actor = Actor::monster("poring");
        let bytes = actor.disappearance_message(&context()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["event"], "disappear");
        assert_eq!(value["name"], "poring");
    }

    #[test]
    fn test_actor_downcasts_through_any() {
        let boxed: Box<dyn WorldObject> = Box::new(Actor::item("apple"));
        let actor = boxed.as_any().downcast_ref::<Actor>().unwrap();
        assert_eq!(actor.name(), "apple");
        let owned = boxed.into_any().downcast::<Actor>().unwrap();
        assert_eq!(owned.kind(), EntityKind::Item);
    }
}

//! Appear / disappear delivery around placement, removal and movement.

use super::support::{recording_world, MAP};
use crate::{
    Actor, Broadcastable, EntityKind, MessageContext, WorldError, WorldEvent, WorldObject,
    WorldResult,
};
use std::any::Any;
use std::sync::{Arc, Mutex};

/// Entity whose messages can never be produced.
#[derive(Debug)]
struct Garbled;

impl Broadcastable for Garbled {
    fn appearance_message(&self, _ctx: &MessageContext) -> WorldResult<Vec<u8>> {
        Err(WorldError::Serialization("garbled".to_string()))
    }

    fn disappearance_message(&self, _ctx: &MessageContext) -> WorldResult<Vec<u8>> {
        Err(WorldError::Serialization("garbled".to_string()))
    }
}

impl WorldObject for Garbled {
    fn kind(&self) -> EntityKind {
        EntityKind::Monster
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

#[test]
fn test_nearby_players_see_placement_and_removal() {
    let (mut world, sink) = recording_world();
    let near = world.spawn(Box::new(Actor::player("near")));
    let edge = world.spawn(Box::new(Actor::player("edge")));
    let outside = world.spawn(Box::new(Actor::player("outside")));
    world.place_entity(near, MAP, 30, 30);
    world.place_entity(edge, MAP, 42, 18);
    world.place_entity(outside, MAP, 43, 30);
    sink.clear();

    let monster = world.spawn(Box::new(Actor::monster("poring")));
    world.place_entity(monster, MAP, 30, 30);
    world.remove_entity(monster);

    let expected = vec![
        ("appear".to_string(), monster),
        ("disappear".to_string(), monster),
    ];
    assert_eq!(sink.events(near), expected);
    assert_eq!(sink.events(edge), expected);
    assert!(sink.events(outside).is_empty());

    let appear = &sink.received(near)[0];
    assert_eq!(appear["name"], "poring");
    assert_eq!(appear["x"], 30);
}

#[test]
fn test_monsters_are_not_observers() {
    let (mut world, sink) = recording_world();
    let monster = world.spawn(Box::new(Actor::monster("poring")));
    world.place_entity(monster, MAP, 5, 5);
    let other = world.spawn(Box::new(Actor::npc("kafra")));
    world.place_entity(other, MAP, 6, 6);

    assert_eq!(sink.count(monster), 0);
    assert_eq!(sink.count(other), 0);
}

#[test]
fn test_placed_player_gets_initial_sight() {
    let (mut world, sink) = recording_world();
    let monster = world.spawn(Box::new(Actor::monster("poring")));
    let npc = world.spawn(Box::new(Actor::npc("kafra")));
    let distant = world.spawn(Box::new(Actor::npc("distant")));
    world.place_entity(monster, MAP, 10, 9);
    world.place_entity(npc, MAP, 11, 11);
    world.place_entity(distant, MAP, 50, 50);

    let player = world.spawn(Box::new(Actor::player("ayla")));
    world.place_entity(player, MAP, 10, 10);

    // row-major scan: (10, 9) comes before (11, 11)
    assert_eq!(
        sink.events(player),
        vec![("appear".to_string(), monster), ("appear".to_string(), npc)]
    );
}

#[test]
fn test_move_sends_disappear_to_observers_left_behind() {
    let (mut world, sink) = recording_world();
    let west = world.spawn(Box::new(Actor::player("west")));
    let east = world.spawn(Box::new(Actor::player("east")));
    world.place_entity(west, MAP, 2, 10);
    world.place_entity(east, MAP, 40, 10);

    let monster = world.spawn(Box::new(Actor::monster("poring")));
    world.place_entity(monster, MAP, 10, 10);
    sink.clear();

    assert!(world.move_entity(monster, 30, 10));
    assert_eq!(sink.events(west), vec![("disappear".to_string(), monster)]);
    assert_eq!(sink.events(east), vec![("appear".to_string(), monster)]);
    assert_eq!(sink.received(east)[0]["x"], 30);
}

#[test]
fn test_observers_in_both_windows_get_a_position_refresh() {
    let (mut world, sink) = recording_world();
    let watcher = world.spawn(Box::new(Actor::player("watcher")));
    world.place_entity(watcher, MAP, 20, 20);
    let monster = world.spawn(Box::new(Actor::monster("poring")));
    world.place_entity(monster, MAP, 21, 21);
    sink.clear();

    world.move_entity(monster, 22, 21);
    let received = sink.received(watcher);
    assert_eq!(received.len(), 1);
    assert_eq!(received[0]["event"], "appear");
    assert_eq!(received[0]["x"], 22);
}

#[test]
fn test_moving_player_sees_its_window_change() {
    let (mut world, sink) = recording_world();
    let left_behind = world.spawn(Box::new(Actor::monster("left")));
    let ahead = world.spawn(Box::new(Actor::monster("ahead")));
    let both = world.spawn(Box::new(Actor::npc("both")));
    world.place_entity(left_behind, MAP, 0, 10);
    world.place_entity(ahead, MAP, 40, 10);
    world.place_entity(both, MAP, 20, 10);

    let player = world.spawn(Box::new(Actor::player("ayla")));
    world.place_entity(player, MAP, 10, 10);
    sink.clear();

    world.move_entity(player, 30, 10);
    assert_eq!(
        sink.events(player),
        vec![("disappear".to_string(), left_behind), ("appear".to_string(), ahead)]
    );
}

#[test]
fn test_serialization_failure_skips_the_broadcast() {
    let (mut world, sink) = recording_world();
    let watcher = world.spawn(Box::new(Actor::player("watcher")));
    world.place_entity(watcher, MAP, 5, 5);
    sink.clear();

    let garbled = world.spawn(Box::new(Garbled));
    assert!(world.place_entity(garbled, MAP, 6, 6));
    assert!(world.remove_entity(garbled));

    assert_eq!(sink.count(watcher), 0);
    assert_eq!(world.stats().broadcast.serialization_failures, 2);
}

#[test]
fn test_listeners_see_placement_lifecycle() {
    let (mut world, _sink) = recording_world();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    world.subscribe(Arc::new(move |event: &WorldEvent| {
        log.lock().unwrap().push(*event);
    }));

    let monster = world.spawn(Box::new(Actor::monster("poring")));
    world.place_entity(monster, MAP, 3, 3);
    world.move_entity(monster, 4, 3);
    world.remove_entity(monster);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert!(matches!(seen[0], WorldEvent::EntityPlaced { kind: EntityKind::Monster, .. }));
    assert!(matches!(seen[1], WorldEvent::EntityMoved { .. }));
    assert!(matches!(seen[2], WorldEvent::EntityRemoved { .. }));
}

//! Visible marker lifecycle on a paused clock.

use super::support::{config_with_map, recording_world, world_with, MAP};
use crate::{
    Actor, MarkerBehavior, MarkerSpec, OpenTerrain, TickContext, TickOutcome, VisibleMarker,
    WorldEvent, WorldResult,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{advance, Instant};

#[derive(Debug)]
struct Pulse {
    runs: Arc<AtomicUsize>,
    limit: usize,
}

impl MarkerBehavior for Pulse {
    fn on_run(&mut self, marker: &VisibleMarker, _ctx: &TickContext) -> WorldResult<TickOutcome> {
        let runs = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
        assert_eq!(marker.param1(), 9);
        Ok(if runs >= self.limit {
            TickOutcome::Close
        } else {
            TickOutcome::Continue
        })
    }
}

#[test]
fn test_duplicate_marker_is_refused() {
    let (mut world, _sink) = recording_world();
    let spec = MarkerSpec::new(MAP, 5, 5, 100);

    let first = world.create_visible_marker(spec, None);
    assert!(first.is_some());
    assert!(world.create_visible_marker(spec, None).is_none());

    // a different view or a different cell is not a duplicate
    assert!(world.create_visible_marker(MarkerSpec::new(MAP, 5, 5, 101), None).is_some());
    assert!(world.create_visible_marker(MarkerSpec::new(MAP, 6, 5, 100), None).is_some());
    assert_eq!(world.stats().markers_rejected, 1);
    assert_eq!(world.stats().open_markers, 3);
}

#[test]
fn test_closed_marker_no_longer_blocks_its_cell() {
    let (mut world, _sink) = recording_world();
    let spec = MarkerSpec::new(MAP, 5, 5, 100);
    let first = world.create_visible_marker(spec, None).unwrap();
    assert!(world.close_visible_marker(first));
    assert!(world.create_visible_marker(spec, None).is_some());
}

#[test]
fn test_invalid_marker_points_are_refused() {
    let (mut world, _sink) = recording_world();
    assert!(world.create_visible_marker(MarkerSpec::new(MAP, 64, 5, 1), None).is_none());
    assert!(world.create_visible_marker(MarkerSpec::new(crate::MapId(8), 1, 1, 1), None).is_none());
    assert_eq!(world.stats().marker_pool.outstanding, 0);
}

#[tokio::test(start_paused = true)]
async fn test_closed_marker_waits_out_grace_window() {
    let (mut world, sink) = recording_world();
    let watcher = world.spawn(Box::new(Actor::player("watcher")));
    world.place_entity(watcher, MAP, 4, 4);

    let id = world.create_visible_marker(MarkerSpec::new(MAP, 5, 5, 100), None).unwrap();
    sink.clear();

    assert!(world.close_visible_marker(id));
    assert!(!world.close_visible_marker(id));
    assert!(world.marker(id).is_none());
    assert!(world.entity(id).is_some());
    assert!(world.entities_in_range(MAP, 5, 5, 0).is_empty());
    assert_eq!(sink.events(watcher), vec![("disappear".to_string(), id)]);
    assert_eq!(world.stats().pending_deletions, 1);

    advance(Duration::from_millis(29_999)).await;
    assert_eq!(world.tick().recycled, 0);
    assert!(world.entity(id).is_some());

    advance(Duration::from_millis(1)).await;
    assert_eq!(world.tick().recycled, 1);
    assert!(world.entity(id).is_none());
    assert_eq!(world.stats().pending_deletions, 0);
    assert_eq!(world.stats().marker_pool.outstanding, 0);
}

#[tokio::test(start_paused = true)]
async fn test_pool_limit_refuses_until_recycle() {
    let mut config = config_with_map(16, 16);
    config.marker_pool_preallocate = 1;
    config.marker_pool_limit = Some(1);
    let (mut world, _sink) = world_with(config, Arc::new(OpenTerrain));

    let first = world.create_visible_marker(MarkerSpec::new(MAP, 1, 1, 1), None).unwrap();
    let address = world.marker(first).unwrap() as *const VisibleMarker;
    assert!(world.create_visible_marker(MarkerSpec::new(MAP, 2, 2, 1), None).is_none());

    world.close_visible_marker(first);
    // still checked out while the grace window runs
    assert!(world.create_visible_marker(MarkerSpec::new(MAP, 2, 2, 1), None).is_none());

    advance(world.config().deletion_grace()).await;
    assert_eq!(world.tick().recycled, 1);

    let second = world.create_visible_marker(MarkerSpec::new(MAP, 2, 2, 1), None).unwrap();
    assert_ne!(second, first);
    assert_eq!(world.marker(second).unwrap() as *const VisibleMarker, address);
    assert_eq!(world.marker(second).unwrap().view(), 1);
    assert_eq!(world.stats().marker_pool.created, 1);
}

#[tokio::test(start_paused = true)]
async fn test_full_deletion_queue_recycles_immediately() {
    let mut config = config_with_map(16, 16);
    config.deletion_queue_capacity = 1;
    let (mut world, _sink) = world_with(config, Arc::new(OpenTerrain));

    let first = world.create_visible_marker(MarkerSpec::new(MAP, 1, 1, 1), None).unwrap();
    let second = world.create_visible_marker(MarkerSpec::new(MAP, 2, 2, 1), None).unwrap();
    world.close_visible_marker(first);
    world.close_visible_marker(second);

    let stats = world.stats();
    assert_eq!(stats.pending_deletions, 1);
    assert_eq!(stats.early_recycles, 1);
    assert_eq!(stats.markers_recycled, 1);
    assert!(world.entity(first).is_some());
    assert!(world.entity(second).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_behavior_markers_run_on_their_own_list() {
    let (mut world, sink) = recording_world();
    let watcher = world.spawn(Box::new(Actor::player("watcher")));
    world.place_entity(watcher, MAP, 10, 10);

    let runs = Arc::new(AtomicUsize::new(0));
    let spec = MarkerSpec::new(MAP, 12, 12, 3)
        .with_run_interval(Duration::from_secs(1))
        .with_params(9, 0);
    let id = world
        .create_visible_marker(spec, Some(Box::new(Pulse { runs: runs.clone(), limit: 2 })))
        .unwrap();

    let stats = world.stats();
    assert_eq!((stats.active, stats.behaviors), (0, 1));
    assert_eq!(world.tick().behaviors.visited, 1);
    assert_eq!(runs.load(Ordering::SeqCst), 0);

    advance(Duration::from_secs(1)).await;
    world.tick();
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(world.marker(id).is_some());

    advance(Duration::from_secs(1)).await;
    world.tick();
    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert!(world.marker(id).is_none());
    assert_eq!(world.stats().behaviors, 0);
    assert_eq!(sink.events(watcher).last(), Some(&("disappear".to_string(), id)));
}

#[tokio::test(start_paused = true)]
async fn test_ttl_closes_handlerless_marker() {
    let (mut world, _sink) = recording_world();
    let spec = MarkerSpec::new(MAP, 3, 3, 1).with_ttl(Duration::from_secs(2));
    let id = world.create_visible_marker(spec, None).unwrap();
    assert_eq!(world.stats().active, 1);

    world.tick();
    assert!(world.marker(id).is_some());
    advance(Duration::from_secs(2)).await;
    world.tick();
    assert!(world.marker(id).is_none());
    assert_eq!(world.stats().pending_deletions, 1);
}

#[tokio::test(start_paused = true)]
async fn test_lifecycle_events_are_published() {
    let (mut world, _sink) = recording_world();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    world.subscribe(Arc::new(move |event: &WorldEvent| {
        if matches!(
            event,
            WorldEvent::MarkerCreated { .. } | WorldEvent::MarkerClosed { .. } | WorldEvent::MarkerRecycled { .. }
        ) {
            log.lock().unwrap().push(*event);
        }
    }));

    let id = world.create_visible_marker(MarkerSpec::new(MAP, 1, 1, 1), None).unwrap();
    world.close_visible_marker(id);
    advance(world.config().deletion_grace()).await;
    world.tick();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert!(matches!(seen[0], WorldEvent::MarkerCreated { .. }));
    assert_eq!(seen[1], WorldEvent::MarkerClosed { id });
    assert_eq!(seen[2], WorldEvent::MarkerRecycled { id, early: false });
}

#[test]
fn test_flush_and_reset_recycle_without_grace() {
    let (mut world, _sink) = recording_world();
    let closed: Vec<_> = (0..3)
        .map(|n| world.create_visible_marker(MarkerSpec::new(MAP, n, 0, 1), None).unwrap())
        .collect();
    for id in &closed {
        world.close_visible_marker(*id);
    }
    let open = world.create_visible_marker(MarkerSpec::new(MAP, 9, 9, 1), None).unwrap();

    assert_eq!(world.flush_deletions(), 3);
    assert!(world.reset_map(MAP));
    assert!(world.entity(open).is_none());

    let stats = world.stats();
    assert_eq!(stats.markers_recycled, 4);
    assert_eq!(stats.marker_pool.outstanding, 0);
    assert_eq!(stats.active, 0);
}

#[test]
fn test_markers_cannot_be_despawned() {
    let (mut world, _sink) = recording_world();
    let id = world.create_visible_marker(MarkerSpec::new(MAP, 1, 1, 1), None).unwrap();
    assert!(world.despawn(id).is_none());
    assert!(world.marker(id).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_unbounded_ttl_never_closes_marker() {
    let (mut world, _sink) = recording_world();
    let spec = MarkerSpec::new(MAP, 5, 5, 1).with_ttl(Duration::MAX);
    let id = world.create_visible_marker(spec, None).unwrap();

    world.tick();
    advance(Duration::from_secs(86_400)).await;
    world.tick();
    assert!(world.marker(id).is_some());
    assert_eq!(world.stats().active, 1);

    assert!(world.close_visible_marker(id));
    assert!(world.marker(id).is_none());
}

#[test]
fn test_marker_timers_follow_caller_clock() {
    let (mut world, _sink) = recording_world();
    let start = Instant::now() + Duration::from_secs(3600);
    let ttl = Duration::from_secs(2);
    let id = world
        .create_visible_marker_at(MarkerSpec::new(MAP, 3, 3, 1).with_ttl(ttl), None, start)
        .unwrap();

    world.tick_at(start + Duration::from_secs(1));
    assert!(world.marker(id).is_some());
    world.tick_at(start + ttl);
    assert!(world.marker(id).is_none());
    assert_eq!(world.stats().pending_deletions, 1);
}

#[test]
fn test_discarded_marker_returns_to_pool_silently() {
    let (mut world, _sink) = recording_world();
    let recycled = Arc::new(AtomicUsize::new(0));
    let count = recycled.clone();
    world.subscribe(Arc::new(move |event: &WorldEvent| {
        if matches!(event, WorldEvent::MarkerRecycled { .. }) {
            count.fetch_add(1, Ordering::SeqCst);
        }
    }));

    let id = world.create_visible_marker(MarkerSpec::new(MAP, 2, 2, 1), None).unwrap();
    world.try_remove(id).unwrap();
    assert!(world.discard_marker(id));
    assert!(!world.discard_marker(id));

    let stats = world.stats();
    assert_eq!(recycled.load(Ordering::SeqCst), 0);
    assert_eq!(stats.markers_recycled, 0);
    assert_eq!(stats.marker_pool.outstanding, 0);
    assert_eq!(stats.active, 0);
    assert!(world.entity(id).is_none());
}

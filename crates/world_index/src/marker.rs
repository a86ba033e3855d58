//! # Visible Markers
//!
//! A visible marker is a transient, player-visible world object such as a
//! timed effect area. Markers are pooled: the world checks one out of an
//! [`ObjectPool`](crate::ObjectPool), initializes it with [`VisibleMarker::create`],
//! places it, and after [`close`](VisibleMarker::close) parks it in the
//! deferred deletion queue until the grace window passes and it is reset back
//! into the pool.
//!
//! Each marker carries two timers:
//!
//! - **run** - fires periodic logic through the attached [`MarkerBehavior`]
//! - **close** - the time to live; when it elapses the marker asks to be closed
//!
//! A zero duration leaves the corresponding timer disarmed.

use crate::error::WorldResult;
use crate::object::{Broadcastable, MessageContext, TickContext, TickOutcome, WorldObject};
use crate::pool::Poolable;
use crate::timer::IntervalTimer;
use crate::types::{EntityId, EntityKind, MapId, Point};
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Parameters for a new marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerSpec {
    pub map: MapId,
    pub point: Point,
    /// Visibility value, also part of the duplicate check
    pub view: u32,
    pub run_interval: Duration,
    pub ttl: Duration,
    pub param1: i64,
    pub param2: i64,
}

impl MarkerSpec {
    pub fn new(map: MapId, x: i32, y: i32, view: u32) -> Self {
        Self {
            map,
            point: Point::new(x, y),
            view,
            run_interval: Duration::ZERO,
            ttl: Duration::ZERO,
            param1: 0,
            param2: 0,
        }
    }

    pub fn with_run_interval(mut self, interval: Duration) -> Self {
        self.run_interval = interval;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_params(mut self, param1: i64, param2: i64) -> Self {
        self.param1 = param1;
        self.param2 = param2;
        self
    }
}

/// Periodic logic attached to a marker.
pub trait MarkerBehavior: Send + fmt::Debug {
    /// Runs each time the marker's run interval elapses. Returning
    /// [`TickOutcome::Close`] or [`TickOutcome::Despawn`] closes the marker.
    fn on_run(&mut self, marker: &VisibleMarker, ctx: &TickContext) -> WorldResult<TickOutcome>;

    /// Called once when the marker closes.
    fn on_close(&mut self, marker: &VisibleMarker) {
        let _ = marker;
    }
}

/// Pooled, player-visible world marker.
#[derive(Debug, Default)]
pub struct VisibleMarker {
    view: u32,
    param1: i64,
    param2: i64,
    run_timer: IntervalTimer,
    close_timer: IntervalTimer,
    closed: bool,
    behavior: Option<Box<dyn MarkerBehavior>>,
    runs: u64,
}

impl VisibleMarker {
    /// Initializes a pooled instance for a new life.
    pub fn create(&mut self, spec: &MarkerSpec, behavior: Option<Box<dyn MarkerBehavior>>, now: Instant) {
        self.view = spec.view;
        self.param1 = spec.param1;
        self.param2 = spec.param2;
        self.run_timer.arm(spec.run_interval, now);
        self.close_timer.arm(spec.ttl, now);
        self.closed = false;
        self.behavior = behavior;
        self.runs = 0;
    }

    /// Marks the marker closed and stops both timers.
    ///
    /// Returns `false` if it was already closed.
    pub fn close(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.closed = true;
        self.run_timer.disarm();
        self.close_timer.disarm();
        if let Some(mut behavior) = self.behavior.take() {
            behavior.on_close(self);
            self.behavior = Some(behavior);
        }
        true
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether this open marker blocks another with the same `view` at its cell.
    pub fn matches(&self, view: u32) -> bool {
        !self.closed && self.view == view
    }

    pub fn view(&self) -> u32 {
        self.view
    }

    pub fn param1(&self) -> i64 {
        self.param1
    }

    pub fn param2(&self) -> i64 {
        self.param2
    }

    pub fn has_behavior(&self) -> bool {
        self.behavior.is_some()
    }

    /// Number of times the run interval has fired.
    pub fn runs(&self) -> u64 {
        self.runs
    }

    pub fn run_timer(&self) -> &IntervalTimer {
        &self.run_timer
    }

    pub fn close_timer(&self) -> &IntervalTimer {
        &self.close_timer
    }
}

impl Poolable for VisibleMarker {
    fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Serialize)]
struct MarkerMessage<'a> {
    event: &'a str,
    id: EntityId,
    kind: EntityKind,
    map: MapId,
    x: i32,
    y: i32,
    view: u32,
    param1: i64,
    param2: i64,
}

impl VisibleMarker {
    fn message(&self, ctx: &MessageContext, event: &str) -> WorldResult<Vec<u8>> {
        let message = MarkerMessage {
            event,
            id: ctx.id,
            kind: EntityKind::VisibleEvent,
            map: ctx.placement.map,
            x: ctx.placement.point.x,
            y: ctx.placement.point.y,
            view: self.view,
            param1: self.param1,
            param2: self.param2,
        };
        Ok(serde_json::to_vec(&message)?)
    }
}

impl Broadcastable for VisibleMarker {
    fn appearance_message(&self, ctx: &MessageContext) -> WorldResult<Vec<u8>> {
        self.message(ctx, "appear")
    }

    fn disappearance_message(&self, ctx: &MessageContext) -> WorldResult<Vec<u8>> {
        self.message(ctx, "disappear")
    }
}

impl WorldObject for VisibleMarker {
    fn kind(&self) -> EntityKind {
        EntityKind::VisibleEvent
    }

    fn is_tickable(&self) -> bool {
        true
    }

    fn tick(&mut self, ctx: &TickContext) -> WorldResult<TickOutcome> {
        if self.closed {
            return Ok(TickOutcome::Continue);
        }
        if self.close_timer.has_elapsed(ctx.now) {
            return Ok(TickOutcome::Close);
        }
        if !self.run_timer.has_elapsed(ctx.now) {
            return Ok(TickOutcome::Continue);
        }

        self.run_timer.reset(ctx.now);
        self.runs += 1;
        let Some(mut behavior) = self.behavior.take() else {
            return Ok(TickOutcome::Continue);
        };
        let outcome = behavior.on_run(self, ctx);
        self.behavior = Some(behavior);
        outcome
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

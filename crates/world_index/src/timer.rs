//! Interval timers for marker run and close intervals.
//!
//! Timers never sleep; they only remember when they were armed and answer
//! whether the interval has passed at a caller-supplied instant. The instant
//! is a `tokio::time::Instant` so a paused test clock drives them too.

use std::time::Duration;
use tokio::time::Instant;

/// A restartable interval. A zero interval leaves the timer disarmed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntervalTimer {
    interval: Option<Duration>,
    started: Option<Instant>,
}

impl IntervalTimer {
    /// Creates a timer that never elapses.
    pub const fn disarmed() -> Self {
        Self {
            interval: None,
            started: None,
        }
    }

    /// Creates a timer armed at `now`.
    pub fn armed(interval: Duration, now: Instant) -> Self {
        let mut timer = Self::disarmed();
        timer.arm(interval, now);
        timer
    }

    /// Arms the timer with a new interval starting at `now`.
    pub fn arm(&mut self, interval: Duration, now: Instant) {
        if interval.is_zero() {
            *self = Self::disarmed();
        } else {
            self.interval = Some(interval);
            self.started = Some(now);
        }
    }

    /// Restarts the current interval at `now`. No-op while disarmed.
    pub fn reset(&mut self, now: Instant) {
        if self.interval.is_some() {
            self.started = Some(now);
        }
    }

    pub fn disarm(&mut self) {
        *self = Self::disarmed();
    }

    pub fn is_armed(&self) -> bool {
        self.interval.is_some()
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Instant the timer was last armed or reset.
    pub fn started_at(&self) -> Option<Instant> {
        self.started
    }

    /// `None` while disarmed or when the deadline lies past the end of the clock.
    pub fn deadline(&self) -> Option<Instant> {
        self.started?.checked_add(self.interval?)
    }

    /// Whether the interval has fully passed at `now`.
    pub fn has_elapsed(&self, now: Instant) -> bool {
        self.deadline().is_some_and(|deadline| now >= deadline)
    }

    /// Time left until the deadline, zero once elapsed.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline()
            .map(|deadline| deadline.saturating_duration_since(now))
    }
}

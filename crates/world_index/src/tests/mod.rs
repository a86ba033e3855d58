//! Scenario tests for the world façade.
//!
//! These drive a full [`World`](crate::World) through placement, broadcast,
//! scheduling and marker lifecycles:
//! - Cell membership and event flags under place / remove / move
//! - Appear and disappear delivery, including initial sight and move diffs
//! - Scheduler coverage and failure isolation across heartbeats
//! - Marker duplicates, grace windows and pool recycling on a paused clock
//! - Valid-point and drop-point search against terrain and item stacks

#[cfg(test)]
pub mod support;


#[cfg(test)]
pub mod visibility_test;


#[cfg(test)]
pub mod marker_test;

//! World lifecycle events.
//!
//! Game systems that care about placement or marker lifecycles (quest
//! triggers, logging, metrics) subscribe a [`WorldListener`] instead of being
//! called directly from the world. Events are published synchronously, after
//! the mutation they describe has completed, while the world is still borrowed;
//! listeners must not try to reach back into the world.

use crate::types::{EntityId, EntityKind, Placement};
use std::fmt;
use std::sync::Arc;

/// Something that happened in a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldEvent {
    EntityPlaced {
        id: EntityId,
        kind: EntityKind,
        placement: Placement,
    },
    EntityRemoved {
        id: EntityId,
        kind: EntityKind,
        placement: Placement,
    },
    EntityMoved {
        id: EntityId,
        from: Placement,
        to: Placement,
    },
    MarkerCreated {
        id: EntityId,
        placement: Placement,
    },
    MarkerClosed {
        id: EntityId,
    },
    /// The marker's storage went back to the pool. `early` is set when the
    /// grace window was skipped because the deletion queue was full.
    MarkerRecycled {
        id: EntityId,
        early: bool,
    },
}

impl WorldEvent {
    /// Entity the event is about.
    pub fn entity(&self) -> EntityId {
        match self {
            WorldEvent::EntityPlaced { id, .. }
            | WorldEvent::EntityRemoved { id, .. }
            | WorldEvent::EntityMoved { id, .. }
            | WorldEvent::MarkerCreated { id, .. }
            | WorldEvent::MarkerClosed { id }
            | WorldEvent::MarkerRecycled { id, .. } => *id,
        }
    }
}

/// Receiver of [`WorldEvent`]s.
pub trait WorldListener: Send + Sync {
    fn on_event(&self, event: &WorldEvent);
}

impl<F> WorldListener for F
where
    F: Fn(&WorldEvent) + Send + Sync,
{
    fn on_event(&self, event: &WorldEvent) {
        self(event)
    }
}

/// Handle returned by [`ListenerRegistry::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Ordered set of subscribed listeners.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: Vec<(ListenerId, Arc<dyn WorldListener>)>,
    next_id: u64,
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: Arc<dyn WorldListener>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Delivers `event` to every listener in subscription order.
    pub fn publish(&self, event: &WorldEvent) {
        for (_, listener) in &self.listeners {
            listener.on_event(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

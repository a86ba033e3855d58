//! Per-observer message queues.
//!
//! The world hands every appear/disappear message to an [`ObserverSink`]. In
//! the host that sink is an [`OutboxSink`]: each connected player registers an
//! unbounded channel and a session task drains the receiving half. Delivery
//! never blocks the heartbeat.

use crate::error::ServerError;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, trace};
use world_index::{EntityId, ObserverSink};

/// Observer sink backed by one `mpsc` channel per registered player.
#[derive(Debug, Default)]
pub struct OutboxSink {
    outboxes: DashMap<EntityId, mpsc::UnboundedSender<Vec<u8>>>,
}

impl OutboxSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `observer` and returns the receiving half of its outbox.
    ///
    /// Registering again replaces the previous channel; the old receiver
    /// sees its stream end.
    pub fn register(&self, observer: EntityId) -> mpsc::UnboundedReceiver<Vec<u8>> {
        let (sender, receiver) = mpsc::unbounded_channel();
        if self.outboxes.insert(observer, sender).is_some() {
            debug!("🔁 Replaced outbox for observer {}", observer);
        }
        receiver
    }

    pub fn unregister(&self, observer: EntityId) -> bool {
        self.outboxes.remove(&observer).is_some()
    }

    pub fn is_registered(&self, observer: EntityId) -> bool {
        self.outboxes.contains_key(&observer)
    }

    pub fn len(&self) -> usize {
        self.outboxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outboxes.is_empty()
    }

    /// Queues `message` for `observer`.
    ///
    /// A closed channel is unregistered before the error is returned.
    pub fn send_to(&self, observer: EntityId, message: &[u8]) -> Result<(), ServerError> {
        let sent = match self.outboxes.get(&observer) {
            Some(sender) => sender.send(message.to_vec()).is_ok(),
            None => return Err(ServerError::UnknownObserver(observer)),
        };

        if sent {
            Ok(())
        } else {
            self.outboxes.remove(&observer);
            Err(ServerError::ObserverClosed(observer))
        }
    }
}

impl ObserverSink for OutboxSink {
    fn deliver(&self, observer: EntityId, message: &[u8]) {
        if let Err(e) = self.send_to(observer, message) {
            trace!(error = %e, "Dropped message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use world_index::{Actor, MapDefinition, MapId, NullSink, OpenTerrain, World, WorldConfig};

    fn observer_ids(count: usize) -> Vec<EntityId> {
        let mut world = World::new(WorldConfig::default(), Arc::new(NullSink), Arc::new(OpenTerrain)).unwrap();
        (0..count)
            .map(|n| world.spawn(Box::new(Actor::player(format!("p{n}")))))
            .collect()
    }

    #[tokio::test]
    async fn test_register_and_deliver() {
        let outbox = OutboxSink::new();
        let observer = observer_ids(1)[0];
        let mut receiver = outbox.register(observer);

        outbox.deliver(observer, b"hello");
        assert_eq!(receiver.recv().await, Some(b"hello".to_vec()));
        assert!(outbox.is_registered(observer));
    }

    #[test]
    fn test_unknown_and_closed_observers() {
        let outbox = OutboxSink::new();
        let observer = observer_ids(1)[0];
        assert!(matches!(
            outbox.send_to(observer, b"x"),
            Err(ServerError::UnknownObserver(_))
        ));

        let receiver = outbox.register(observer);
        drop(receiver);
        assert!(matches!(
            outbox.send_to(observer, b"x"),
            Err(ServerError::ObserverClosed(_))
        ));
        assert!(outbox.is_empty());

        // delivery to a missing observer is silent
        outbox.deliver(observer, b"x");
    }

    #[test]
    fn test_unregister() {
        let outbox = OutboxSink::new();
        let observer = observer_ids(1)[0];
        let _receiver = outbox.register(observer);
        assert_eq!(outbox.len(), 1);
        assert!(outbox.unregister(observer));
        assert!(!outbox.unregister(observer));
    }

    #[tokio::test]
    async fn test_world_broadcasts_reach_outbox() {
        let outbox = Arc::new(OutboxSink::new());
        let mut config = WorldConfig::default();
        config.maps.push(MapDefinition::new(MapId(1), 32, 32));
        let mut world = World::new(config, outbox.clone(), Arc::new(OpenTerrain)).unwrap();

        let player = world.spawn(Box::new(Actor::player("ayla")));
        let mut receiver = outbox.register(player);
        world.place_entity(player, MapId(1), 5, 5);

        let monster = world.spawn(Box::new(Actor::monster("poring")));
        world.place_entity(monster, MapId(1), 6, 6);

        let message = receiver.recv().await.unwrap();
        let text = String::from_utf8(message).unwrap();
        assert!(text.contains("\"appear\""));
        assert!(text.contains("poring"));
        assert!(receiver.try_recv().is_err());
    }
}

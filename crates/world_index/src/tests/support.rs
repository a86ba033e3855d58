//! Shared fixtures: a recording sink and world builders.

use crate::{
    BlockingOracle, EntityId, MapDefinition, MapId, ObserverSink, OpenTerrain, World, WorldConfig,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const MAP: MapId = MapId(1);

/// Sink that captures every delivered message per observer.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub messages: Mutex<HashMap<EntityId, Vec<serde_json::Value>>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// All messages delivered to `observer`, oldest first.
    pub fn received(&self, observer: EntityId) -> Vec<serde_json::Value> {
        self.messages
            .lock()
            .unwrap()
            .get(&observer)
            .cloned()
            .unwrap_or_default()
    }

    /// `(event, subject)` pairs delivered to `observer`.
    pub fn events(&self, observer: EntityId) -> Vec<(String, EntityId)> {
        self.received(observer)
            .into_iter()
            .map(|message| {
                let event = message["event"].as_str().unwrap_or_default().to_string();
                let subject: EntityId = serde_json::from_value(message["id"].clone()).unwrap();
                (event, subject)
            })
            .collect()
    }

    pub fn count(&self, observer: EntityId) -> usize {
        self.received(observer).len()
    }

    pub fn clear(&self) {
        self.messages.lock().unwrap().clear();
    }
}

impl ObserverSink for RecordingSink {
    fn deliver(&self, observer: EntityId, message: &[u8]) {
        let value = serde_json::from_slice(message).unwrap();
        self.messages
            .lock()
            .unwrap()
            .entry(observer)
            .or_default()
            .push(value);
    }
}

pub fn config_with_map(width: u32, height: u32) -> WorldConfig {
    let mut config = WorldConfig::default();
    config.maps.push(MapDefinition::new(MAP, width, height));
    config
}

/// A 64×64 open world wired to a fresh recording sink.
pub fn recording_world() -> (World, Arc<RecordingSink>) {
    world_with(config_with_map(64, 64), Arc::new(OpenTerrain))
}

pub fn world_with(config: WorldConfig, oracle: Arc<dyn BlockingOracle>) -> (World, Arc<RecordingSink>) {
    let sink = RecordingSink::new();
    let world = World::new(config, sink.clone(), oracle).unwrap();
    (world, sink)
}

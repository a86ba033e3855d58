//! Configuration management for the world server.
//!
//! This module handles loading, validation, and conversion of server configuration
//! from TOML files. The `[world]` table is converted into a
//! [`WorldConfig`] for the index; everything else drives the host itself.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;
use world_index::{MapDefinition, MapId, WorldConfig};

/// Default tick interval for serde deserialization
fn default_tick_interval() -> u64 {
    50 // 20 ticks per second
}

fn default_stats_interval_ticks() -> u64 {
    200
}

fn default_flush_on_shutdown() -> bool {
    true
}

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Heartbeat settings
    #[serde(default)]
    pub server: ServerSettings,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Maps and tunables handed to the world index
    #[serde(default)]
    pub world: WorldSettings,
}

/// Heartbeat configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Server tick interval in milliseconds
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Log world statistics every this many ticks
    #[serde(default = "default_stats_interval_ticks")]
    pub stats_interval_ticks: u64,
    /// Recycle markers still waiting out their grace window at shutdown
    #[serde(default = "default_flush_on_shutdown")]
    pub flush_on_shutdown: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            stats_interval_ticks: default_stats_interval_ticks(),
            flush_on_shutdown: default_flush_on_shutdown(),
        }
    }
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// One `[[world.maps]]` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapSettings {
    pub id: u32,
    pub width: u32,
    pub height: u32,
}

/// World index tunables. Missing keys fall back to the index defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSettings {
    pub maps: Vec<MapSettings>,
    /// Active entities advanced per tick
    pub batch_size: usize,
    /// Marker behaviors advanced per tick
    pub behavior_batch_size: usize,
    /// Broadcast window half-width in cells
    pub view_radius: u32,
    /// Grace window before a closed marker is recycled, in milliseconds
    pub deletion_grace_ms: u64,
    pub deletion_queue_capacity: usize,
    pub marker_pool_preallocate: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker_pool_limit: Option<usize>,
    /// Items per cell before a drop search moves on
    pub drop_stack_limit: usize,
}

impl Default for WorldSettings {
    fn default() -> Self {
        let defaults = WorldConfig::default();
        Self {
            maps: vec![MapSettings {
                id: 1,
                width: 256,
                height: 256,
            }],
            batch_size: defaults.batch_size,
            behavior_batch_size: defaults.behavior_batch_size,
            view_radius: defaults.view_radius,
            deletion_grace_ms: defaults.deletion_grace_ms,
            deletion_queue_capacity: defaults.deletion_queue_capacity,
            marker_pool_preallocate: defaults.marker_pool_preallocate,
            marker_pool_limit: defaults.marker_pool_limit,
            drop_stack_limit: defaults.drop_stack_limit,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file, creating a default file if none exists.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// The loaded (or freshly written default) configuration, or an error if
    /// the file could not be read, parsed or created.
    pub async fn load_from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("📝 Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Builds the index configuration from the `[world]` table.
    pub fn to_world_config(&self) -> WorldConfig {
        let world = &self.world;
        WorldConfig {
            maps: world
                .maps
                .iter()
                .map(|map| MapDefinition::new(MapId(map.id), map.width, map.height))
                .collect(),
            batch_size: world.batch_size,
            behavior_batch_size: world.behavior_batch_size,
            view_radius: world.view_radius,
            deletion_grace_ms: world.deletion_grace_ms,
            deletion_queue_capacity: world.deletion_queue_capacity,
            marker_pool_preallocate: world.marker_pool_preallocate,
            marker_pool_limit: world.marker_pool_limit,
            drop_stack_limit: world.drop_stack_limit,
        }
    }

    /// Validates the configuration for consistency and correctness.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.tick_interval_ms == 0 {
            return Err("server.tick_interval_ms must be greater than 0".to_string());
        }

        if self.server.stats_interval_ticks == 0 {
            return Err("server.stats_interval_ticks must be greater than 0".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        if self.world.maps.is_empty() {
            return Err("world.maps must define at least one map".to_string());
        }

        self.to_world_config()
            .validate()
            .map_err(|e| format!("world: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();

        assert_eq!(config.server.tick_interval_ms, 50);
        assert_eq!(config.server.stats_interval_ticks, 200);
        assert!(config.server.flush_on_shutdown);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json_format);
        assert_eq!(config.world.maps.len(), 1);
        assert_eq!(config.world.batch_size, 100);
        assert_eq!(config.world.view_radius, 12);
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_load_from_nonexistent_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("world.toml");

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(config.server.tick_interval_ms, 50);
        assert!(path.exists());

        // the written default parses back to the same settings
        let reloaded = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(reloaded.world.maps, config.world.maps);
        assert_eq!(reloaded.world.marker_pool_limit, None);
    }

    #[tokio::test]
    async fn test_load_from_existing_file() {
        let toml_content = r#"
[server]
tick_interval_ms = 33

[logging]
level = "debug"
json_format = true

[world]
batch_size = 25
marker_pool_limit = 500

[[world.maps]]
id = 1
width = 64
height = 64

[[world.maps]]
id = 7
width = 300
height = 200
"#;
        let dir = tempdir().unwrap();
        let path = dir.path().join("world.toml");
        tokio::fs::write(&path, toml_content).await.unwrap();

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(config.server.tick_interval_ms, 33);
        assert_eq!(config.server.stats_interval_ticks, 200);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);
        assert_eq!(config.world.batch_size, 25);
        assert_eq!(config.world.behavior_batch_size, 100);
        assert_eq!(config.world.marker_pool_limit, Some(500));

        let world = config.to_world_config();
        assert_eq!(world.maps[1], MapDefinition::new(MapId(7), 300, 200));
        assert_eq!(world.batch_size, 25);
    }

    #[tokio::test]
    async fn test_load_rejects_malformed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        tokio::fs::write(&path, "[server\ntick_interval_ms = ").await.unwrap();

        assert!(AppConfig::load_from_file(&path).await.is_err());
    }

    #[test]
    fn test_validation_invalid_log_level() {
        let mut config = AppConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_valid_log_levels() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            let mut config = AppConfig::default();
            config.logging.level = level.to_string();
            assert!(config.validate().is_ok(), "level {level}");
        }
    }

    #[test]
    fn test_validation_zero_tick_interval() {
        let mut config = AppConfig::default();
        config.server.tick_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_world_settings() {
        let mut config = AppConfig::default();
        config.world.maps.clear();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.world.batch_size = 0;
        assert!(config.validate().unwrap_err().starts_with("world:"));

        let mut config = AppConfig::default();
        config.world.deletion_grace_ms = u64::MAX;
        assert!(config.validate().unwrap_err().contains("deletion_grace_ms"));

        let mut config = AppConfig::default();
        let first = config.world.maps[0];
        config.world.maps.push(first);
        assert!(config.validate().is_err());
    }
}

//! Main application logic and lifecycle management.
//!
//! The `Application` owns the loaded configuration, the shared world and the
//! observer outbox. `run` starts the heartbeat, waits for a termination
//! signal and shuts the heartbeat down before flushing pending deletions.

use crate::cli::CliArgs;
use crate::config::AppConfig;
use crate::error::ServerError;
use crate::heartbeat::{log_stats, Heartbeat};
use crate::logging::display_banner;
use crate::outbox::OutboxSink;
use crate::signals::{wait_for_signal, wait_for_signal_silent, Shutdown};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use world_index::{OpenTerrain, SharedWorld, World, WorldEvent};

/// How long shutdown waits for the heartbeat task to finish its current beat.
const HEARTBEAT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Main application struct.
pub struct Application {
    /// Loaded application configuration
    config: AppConfig,
    /// World shared with the heartbeat and session tasks
    world: SharedWorld,
    /// Observer delivery channels
    outbox: Arc<OutboxSink>,
    shutdown: Shutdown,
}

impl Application {
    /// Creates a new application instance.
    ///
    /// # Arguments
    ///
    /// * `args` - Parsed command-line arguments
    ///
    /// # Returns
    ///
    /// A configured `Application` ready to run, or an error if the
    /// configuration could not be loaded or is invalid.
    ///
    /// # Process
    ///
    /// 1. Load configuration from file (creating default if missing)
    /// 2. Apply command-line argument overrides
    /// 3. Validate merged configuration
    /// 4. Build the world
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path).await?;
        info!("✅ Configuration loaded successfully from {}", args.config_path.display());

        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }

        if args.json_logs {
            config.logging.json_format = true;
        }

        if let Some(tick_ms) = args.tick_ms {
            config.server.tick_interval_ms = tick_ms;
        }

        display_banner();

        Ok(Self::from_config(config)?)
    }

    /// Builds the application from an already merged configuration.
    pub fn from_config(config: AppConfig) -> Result<Self, ServerError> {
        config.validate().map_err(ServerError::InvalidConfig)?;
        info!("✅ Configuration validated successfully");

        let outbox = Arc::new(OutboxSink::new());
        let mut world = World::new(config.to_world_config(), outbox.clone(), Arc::new(OpenTerrain))?;
        world.subscribe(Arc::new(|event: &WorldEvent| match event {
            WorldEvent::MarkerRecycled { id, early: true } => {
                debug!("♻️ Marker {} recycled before its grace window ended", id)
            }
            WorldEvent::MarkerClosed { id } => debug!("🚪 Marker {} closed", id),
            _ => {}
        }));

        Ok(Self {
            config,
            world: SharedWorld::new(world),
            outbox,
            shutdown: Shutdown::new(),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Handle to the world for session tasks.
    pub fn world(&self) -> SharedWorld {
        self.world.clone()
    }

    pub fn outbox(&self) -> Arc<OutboxSink> {
        self.outbox.clone()
    }

    /// Runs until SIGINT or SIGTERM.
    ///
    /// A second signal during shutdown exits the process immediately.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let stop = async {
            if let Err(e) = wait_for_signal().await {
                error!("❌ Failed to wait for shutdown signal: {e}");
            }

            tokio::spawn(async move {
                if let Err(e) = wait_for_signal_silent().await {
                    error!("Failed to set up merciless shutdown signal handler: {e}");
                    return;
                }

                warn!("Shutdown handler received again! I'll make this quick.");
                std::process::exit(1);
            });
        };

        self.run_until(stop).await.map(|_| ())
    }

    /// Runs the heartbeat until `stop` resolves, then shuts down gracefully.
    ///
    /// # Returns
    ///
    /// The number of heartbeats that ran.
    pub async fn run_until<F>(self, stop: F) -> Result<u64, Box<dyn std::error::Error>>
    where
        F: Future<Output = ()>,
    {
        info!("🌟 Starting world server");
        self.log_configuration_summary();

        let heartbeat = Heartbeat::new(
            self.world.clone(),
            Duration::from_millis(self.config.server.tick_interval_ms),
            self.config.server.stats_interval_ticks,
        );
        let mut heartbeat_handle = tokio::spawn(heartbeat.run(self.shutdown.subscribe()));

        info!("✅ World server is now running!");
        info!("🛑 Press Ctrl+C to gracefully shutdown");

        stop.await;

        info!("🛑 Shutdown signal received, stopping heartbeat...");
        self.shutdown.trigger();

        let ticks = match tokio::time::timeout(HEARTBEAT_STOP_TIMEOUT, &mut heartbeat_handle).await {
            Ok(Ok(ticks)) => ticks,
            Ok(Err(e)) => {
                error!("❌ Heartbeat task failed: {e}");
                0
            }
            Err(_) => {
                warn!("⏰ Heartbeat did not stop within {:?}, aborting it", HEARTBEAT_STOP_TIMEOUT);
                heartbeat_handle.abort();
                0
            }
        };

        if self.config.server.flush_on_shutdown {
            let flushed = self.world.flush_deletions().await;
            info!("🧹 Recycled {} markers pending deletion", flushed);
        }

        info!("📊 Final Statistics:");
        log_stats(&self.world.stats().await);
        info!("✅ World server shutdown complete after {} ticks", ticks);

        Ok(ticks)
    }

    /// Logs the configuration summary at startup.
    fn log_configuration_summary(&self) {
        let world = &self.config.world;
        info!("📋 Configuration Summary:");
        info!("  ⏱️ Tick interval: {}ms", self.config.server.tick_interval_ms);
        for map in &world.maps {
            info!("  🗺️ Map {}: {}x{} cells", map.id, map.width, map.height);
        }
        info!(
            "  🔁 Batch sizes: {} entities | {} behaviors",
            world.batch_size, world.behavior_batch_size
        );
        info!(
            "  👁️ View window: {}x{} cells",
            world.view_radius * 2 + 1,
            world.view_radius * 2 + 1
        );
        info!("  🗑️ Deletion grace: {}ms", world.deletion_grace_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use world_index::{Actor, MapId, MarkerSpec};

    #[tokio::test]
    async fn test_new_applies_cli_overrides() {
        let dir = tempdir().unwrap();
        let args = CliArgs {
            config_path: dir.path().join("server.toml"),
            log_level: Some("debug".to_string()),
            json_logs: true,
            tick_ms: Some(20),
        };

        let app = Application::new(args.clone()).await.unwrap();
        assert!(args.config_path.exists());
        assert_eq!(app.config().logging.level, "debug");
        assert!(app.config().logging.json_format);
        assert_eq!(app.config().server.tick_interval_ms, 20);
    }

    #[tokio::test]
    async fn test_new_rejects_invalid_override() {
        let dir = tempdir().unwrap();
        let args = CliArgs {
            config_path: dir.path().join("server.toml"),
            tick_ms: Some(0),
            ..CliArgs::default()
        };

        assert!(Application::new(args).await.is_err());
    }

    #[tokio::test]
    async fn test_from_config_registers_maps() {
        let mut config = AppConfig::default();
        config.world.maps[0].width = 40;
        let app = Application::from_config(config).unwrap();
        let shared = app.world();
        let world = shared.lock().await;
        assert_eq!(world.map(MapId(1)).unwrap().grid().width(), 40);
        assert_eq!(world.map_ids().count(), 1);
    }

    #[test]
    fn test_from_config_rejects_invalid_world() {
        let mut config = AppConfig::default();
        config.world.view_radius = 4;
        config.world.deletion_queue_capacity = 0;
        assert!(matches!(
            Application::from_config(config),
            Err(ServerError::InvalidConfig(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_flushes_pending_deletions() {
        let app = Application::from_config(AppConfig::default()).unwrap();
        let world = app.world();

        let player = world.spawn(Box::new(Actor::player("ayla"))).await;
        let mut inbox = app.outbox().register(player);
        world.place_entity(player, MapId(1), 10, 10).await;

        let marker = world
            .create_visible_marker(MarkerSpec::new(MapId(1), 11, 11, 5), None)
            .await
            .unwrap();
        world.close_visible_marker(marker).await;

        let ticks = app
            .run_until(tokio::time::sleep(Duration::from_millis(175)))
            .await
            .unwrap();

        assert_eq!(ticks, 4);
        let stats = world.stats().await;
        assert_eq!(stats.pending_deletions, 0);
        assert_eq!(stats.early_recycles, 0);
        assert_eq!(stats.markers_recycled, 1);

        let appear = inbox.recv().await.unwrap();
        let disappear = inbox.recv().await.unwrap();
        assert!(String::from_utf8(appear).unwrap().contains("appear"));
        assert!(String::from_utf8(disappear).unwrap().contains("disappear"));
    }
}

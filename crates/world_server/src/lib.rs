//! # World Server - Main Entry Point
//!
//! Heartbeat host for the [`world_index`] crate. It parses the command line,
//! loads a TOML configuration, sets up logging, builds the world and drives
//! `World::tick` at a fixed period until SIGINT or SIGTERM.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration
//! world_server
//!
//! # Specify custom configuration
//! world_server --config production.toml
//!
//! # Override specific settings
//! world_server --tick-ms 25 --log-level debug
//!
//! # JSON logging for production
//! world_server --json-logs
//! ```
//!
//! ## Configuration
//!
//! The server loads configuration from a TOML file (default: `config.toml`).
//! If the file doesn't exist, a default configuration will be created.

use tracing::error;

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod heartbeat;
pub mod logging;
pub mod outbox;
pub mod signals;

use app::Application;
use cli::CliArgs;
use config::AppConfig;

/// Main entry point for the world server.
///
/// # Exit Codes
///
/// * **0**: Successful execution and shutdown
/// * **1**: Error during startup, configuration, or runtime
///
/// Called from `main` inside the `tokio` runtime.
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Load configuration to get logging settings
    let mut config = AppConfig::load_from_file(&args.config_path)
        .await
        .unwrap_or_default();
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }

    if let Err(e) = logging::setup_logging(&config.logging, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e:?}");
            std::process::exit(1);
        }
    }

    Ok(())
}

pub use config::{LoggingSettings, MapSettings, ServerSettings, WorldSettings};
pub use error::ServerError;
pub use heartbeat::Heartbeat;
pub use outbox::OutboxSink;

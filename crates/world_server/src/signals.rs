//! Signal handling for graceful server shutdown.
//!
//! A termination signal is turned into a message on a `tokio` broadcast
//! channel so that every long-running task can watch for it.

use tokio::signal;
use tokio::sync::broadcast;
use tracing::info;

/// Fan-out shutdown notification shared by the host's tasks.
#[derive(Debug, Clone)]
pub struct Shutdown {
    sender: broadcast::Sender<()>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self { sender }
    }

    /// A receiver that resolves once [`trigger`](Self::trigger) is called.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }

    /// Notifies every subscriber. Returns how many were listening.
    pub fn trigger(&self) -> usize {
        self.sender.send(()).unwrap_or(0)
    }
}

/// Waits for a termination signal and logs it.
///
/// Listens for SIGINT and SIGTERM on Unix and Ctrl+C on Windows.
pub async fn wait_for_signal() -> Result<(), Box<dyn std::error::Error>> {
    wait_for_signal_silent().await?;
    info!("📡 Received shutdown signal - initiating graceful shutdown");
    Ok(())
}

pub async fn wait_for_signal_silent() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(unix)]
    {
        use signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => (),
            _ = sigterm.recv() => ()
        }
    }

    #[cfg(windows)]
    signal::ctrl_c().await?;

    Ok(())
}

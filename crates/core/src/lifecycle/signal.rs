//! Shutdown (SIGINT/SIGTERM) and reload (SIGHUP) signal handling.

use tokio::sync::watch;

/// Listens for OS signals; flips the shutdown channel to `true` on exit.
pub struct SignalHandler {
    shutdown_tx: watch::Sender<bool>,
}

impl SignalHandler {
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { shutdown_tx: tx }, rx)
    }

    /// Run until a shutdown signal arrives, calling `on_reload` for every
    /// SIGHUP (unix only).
    pub async fn run<F>(self, on_reload: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        if let Err(e) = wait_for_shutdown(&on_reload).await {
            tracing::error!("Signal handling failed, shutting down: {e}");
        }
        self.trigger_shutdown();
    }

    fn trigger_shutdown(&self) {
        // send_replace works even when every receiver is gone
        self.shutdown_tx.send_replace(true);
    }
}

#[cfg(unix)]
async fn wait_for_shutdown<F: Fn()>(on_reload: &F) -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    loop {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res?;
                tracing::info!("Received SIGINT, initiating shutdown...");
                return Ok(());
            }
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, initiating shutdown...");
                return Ok(());
            }
            _ = sighup.recv() => {
                tracing::info!("Received SIGHUP, reloading configuration...");
                on_reload();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown<F: Fn()>(_on_reload: &F) -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    tracing::info!("Received Ctrl+C, initiating shutdown...");
    Ok(())
}

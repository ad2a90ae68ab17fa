//! Process lifecycle: logging setup, signal handling, and readiness
//! notification for foreground or systemd runs.

pub mod logging;
pub mod signal;

/// Lifecycle event notification (foreground vs systemd).
pub trait Lifecycle: Send + Sync {
    /// The listener is bound and accepting connections.
    fn on_ready(&self);
    fn on_reloading(&self);
    fn on_reloaded(&self);
    /// Shutdown has begun; in-flight requests are draining.
    fn on_stopping(&self);
}

/// Logs events only.
pub struct ForegroundLifecycle;

impl Lifecycle for ForegroundLifecycle {
    fn on_ready(&self) {
        tracing::info!("Relay ready");
    }

    fn on_reloading(&self) {
        tracing::info!("Relay reloading configuration...");
    }

    fn on_reloaded(&self) {
        tracing::info!("Relay configuration reloaded");
    }

    fn on_stopping(&self) {
        tracing::info!("Relay stopping...");
    }
}

/// Sends sd-notify state changes, then logs. Notification failures are
/// ignored: without a notify socket there is nobody to tell.
pub struct SystemdLifecycle;

impl SystemdLifecycle {
    fn notify(state: sd_notify::NotifyState<'_>) {
        if let Err(e) = sd_notify::notify(true, &[state]) {
            tracing::debug!("sd-notify failed: {e}");
        }
    }
}

impl Lifecycle for SystemdLifecycle {
    fn on_ready(&self) {
        Self::notify(sd_notify::NotifyState::Ready);
        tracing::info!("Relay ready (notified systemd)");
    }

    fn on_reloading(&self) {
        Self::notify(sd_notify::NotifyState::Reloading);
        tracing::info!("Relay reloading configuration (notified systemd)...");
    }

    fn on_reloaded(&self) {
        Self::notify(sd_notify::NotifyState::Ready);
        tracing::info!("Relay configuration reloaded (notified systemd)");
    }

    fn on_stopping(&self) {
        Self::notify(sd_notify::NotifyState::Stopping);
        tracing::info!("Relay stopping (notified systemd)...");
    }
}

/// `SystemdLifecycle` when `NOTIFY_SOCKET` is set, else `ForegroundLifecycle`.
pub fn detect_lifecycle() -> Box<dyn Lifecycle> {
    if std::env::var_os("NOTIFY_SOCKET").is_some() {
        Box::new(SystemdLifecycle)
    } else {
        Box::new(ForegroundLifecycle)
    }
}

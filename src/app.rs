//! Application struct that encapsulates server assembly and serving logic.

use crate::cli::RunArgs;
use arc_swap::ArcSwap;
use relay_core::config::{Config, ConfigWatcher};
use relay_core::lifecycle::signal::SignalHandler;
use relay_core::lifecycle::{self, Lifecycle};
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

pub struct Application {
    config: Arc<ArcSwap<Config>>,
    app_router: axum::Router,
    config_path: String,
    lifecycle: Arc<dyn Lifecycle>,
}

impl Application {
    /// Build the application from CLI args and the (possibly failed) config
    /// load done before logging was up.
    pub fn build(args: &RunArgs, loaded: anyhow::Result<Config>) -> anyhow::Result<Self> {
        let mut config = loaded.unwrap_or_else(|e| {
            tracing::warn!(
                "Failed to load config from '{}': {e}, using defaults",
                args.config.config
            );
            let mut config = Config::default();
            config.apply_env();
            config
        });

        // CLI overrides
        if let Some(ref host) = args.host {
            config.host = host.clone();
        }
        if let Some(port) = args.port {
            config.port = port;
        }

        config.validate()?;
        config.require_api_key()?;

        tracing::info!(
            upstream = %config.upstream.base_url,
            model = %config.defaults.model,
            fallback_model = %config.defaults.fallback_model,
            "Relay configured"
        );

        let config = Arc::new(ArcSwap::from_pointee(config));
        let state = relay_server::AppState {
            config: config.clone(),
            executor: relay_provider::build_executor(),
        };
        let app_router = relay_server::build_router(state);

        Ok(Self {
            config,
            app_router,
            config_path: args.config.config.clone(),
            lifecycle: Arc::from(lifecycle::detect_lifecycle()),
        })
    }

    /// Serve HTTP, handle signals, and drain gracefully.
    pub async fn serve(self) -> anyhow::Result<()> {
        let Self {
            config,
            app_router,
            config_path,
            lifecycle,
        } = self;

        // Hot reload is best-effort: without a config file there is nothing to watch.
        let _watcher = match ConfigWatcher::start(config_path.clone(), config.clone(), |new_cfg| {
            tracing::info!(
                upstream = %new_cfg.upstream.base_url,
                model = %new_cfg.defaults.model,
                fallback_model = %new_cfg.defaults.fallback_model,
                "Config file changed, reloaded"
            );
        }) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                tracing::debug!("Not watching '{config_path}': {e}");
                None
            }
        };

        let (signal_handler, shutdown_rx) = SignalHandler::new();

        let reload_config = config.clone();
        let reload_lifecycle = lifecycle.clone();
        let reload_path = config_path.clone();
        let reload_fn = move || {
            reload_from_file(&reload_path, &reload_config, &*reload_lifecycle);
        };
        tokio::spawn(signal_handler.run(reload_fn));

        let (addr, shutdown_timeout) = {
            let cfg = config.load();
            (format!("{}:{}", cfg.host, cfg.port), cfg.shutdown_timeout)
        };

        serve_http(&addr, app_router, shutdown_rx, &*lifecycle, shutdown_timeout).await?;

        tracing::info!("Server shut down.");
        Ok(())
    }
}

/// SIGHUP reload. The lifecycle always returns to ready, even when the file
/// is rejected and the running config stays in place.
fn reload_from_file(path: &str, config: &ArcSwap<Config>, lifecycle: &dyn Lifecycle) -> bool {
    lifecycle.on_reloading();
    let reloaded = match Config::load(path) {
        Ok(new_cfg) => {
            config.store(Arc::new(new_cfg));
            true
        }
        Err(e) => {
            tracing::error!("SIGHUP config reload failed, keeping current config: {e}");
            false
        }
    };
    lifecycle.on_reloaded();
    reloaded
}

async fn serve_http(
    addr: &str,
    app_router: axum::Router,
    shutdown_rx: tokio::sync::watch::Receiver<bool>,
    lifecycle: &dyn Lifecycle,
    shutdown_timeout: u64,
) -> anyhow::Result<()> {
    tracing::info!("Starting HTTP server on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    lifecycle.on_ready();

    let mut graceful_rx = shutdown_rx.clone();
    let server = axum::serve(listener, app_router)
        .with_graceful_shutdown(async move {
            let _ = graceful_rx.wait_for(|v| *v).await;
        })
        .into_future();

    // Upstream calls carry no timeout of their own, so the drain is bounded here.
    let mut drain_rx = shutdown_rx;
    let drain_deadline = async move {
        let _ = drain_rx.wait_for(|v| *v).await;
        tokio::time::sleep(Duration::from_secs(shutdown_timeout)).await;
    };

    tokio::select! {
        res = server => res?,
        _ = drain_deadline => {
            tracing::warn!("In-flight requests still running after {shutdown_timeout}s, exiting");
        }
    }

    lifecycle.on_stopping();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingLifecycle {
        events: Mutex<Vec<&'static str>>,
    }

    impl RecordingLifecycle {
        fn events(&self) -> Vec<&'static str> {
            self.events.lock().unwrap().clone()
        }
    }

    impl Lifecycle for RecordingLifecycle {
        fn on_ready(&self) {
            self.events.lock().unwrap().push("ready");
        }
        fn on_reloading(&self) {
            self.events.lock().unwrap().push("reloading");
        }
        fn on_reloaded(&self) {
            self.events.lock().unwrap().push("reloaded");
        }
        fn on_stopping(&self) {
            self.events.lock().unwrap().push("stopping");
        }
    }

    #[test]
    fn test_reload_swaps_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "upstream:\n  api-key: sk-reloaded\ndefaults:\n  model: gpt-4o\n",
        )
        .unwrap();
        let config = ArcSwap::from_pointee(Config::default());
        let lifecycle = RecordingLifecycle::default();

        assert!(reload_from_file(path.to_str().unwrap(), &config, &lifecycle));
        assert_eq!(config.load().defaults.model, "gpt-4o");
        assert_eq!(lifecycle.events(), vec!["reloading", "reloaded"]);
    }

    #[test]
    fn test_failed_reload_keeps_config_and_returns_to_ready() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "port: 0\n").unwrap();
        let config = ArcSwap::from_pointee(Config::default());
        let lifecycle = RecordingLifecycle::default();

        assert!(!reload_from_file(path.to_str().unwrap(), &config, &lifecycle));
        assert_eq!(config.load().port, 3000);
        assert_eq!(lifecycle.events(), vec!["reloading", "reloaded"]);

        let missing = dir.path().join("missing.yaml");
        assert!(!reload_from_file(missing.to_str().unwrap(), &config, &lifecycle));
        assert_eq!(
            lifecycle.events(),
            vec!["reloading", "reloaded", "reloading", "reloaded"]
        );
    }
}

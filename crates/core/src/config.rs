use arc_swap::ArcSwap;
use notify::{RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use sha2::Digest;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Environment variable consulted when `upstream.api-key` is empty.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

// ─── Config ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,

    // Request body size limit (MB)
    pub body_limit_mb: usize,

    // Seconds to wait for in-flight requests after a shutdown signal
    pub shutdown_timeout: u64,

    // Logging
    pub logging_to_file: bool,
    pub log_dir: Option<String>,
    pub log_format: LogFormat,

    // Upstream chat-completions API
    pub upstream: UpstreamConfig,

    // Values applied to fields missing from inbound requests
    pub defaults: ModelDefaults,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            body_limit_mb: 10,
            shutdown_timeout: 5,
            logging_to_file: false,
            log_dir: None,
            log_format: LogFormat::default(),
            upstream: UpstreamConfig::default(),
            defaults: ModelDefaults::default(),
        }
    }
}

impl Config {
    /// Load config from a YAML file, fill the API key from the environment,
    /// sanitize, and validate.
    pub fn load(path: &str) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = serde_yaml_ng::from_str(&contents)?;
        config.apply_env();
        config.sanitize();
        config.validate()?;
        Ok(config)
    }

    /// Use `OPENAI_API_KEY` when the file does not carry a key.
    pub fn apply_env(&mut self) {
        if self.upstream.api_key.trim().is_empty()
            && let Ok(key) = std::env::var(API_KEY_ENV)
        {
            self.upstream.api_key = key;
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        anyhow::ensure!(self.port != 0, "port must be non-zero");
        anyhow::ensure!(self.body_limit_mb > 0, "body-limit-mb must be positive");
        anyhow::ensure!(
            self.defaults.temperature.is_finite(),
            "defaults.temperature must be a finite number"
        );
        anyhow::ensure!(
            !self.defaults.model.is_empty() && !self.defaults.fallback_model.is_empty(),
            "defaults.model and defaults.fallback-model must be non-empty"
        );

        let base = url::Url::parse(&self.upstream.base_url)
            .map_err(|e| anyhow::anyhow!("invalid upstream base-url '{}': {e}", self.upstream.base_url))?;
        anyhow::ensure!(
            matches!(base.scheme(), "http" | "https"),
            "upstream base-url must be http or https, got '{}'",
            base.scheme()
        );

        if let Some(ref proxy) = self.upstream.proxy_url {
            crate::proxy::validate_proxy_url(proxy)?;
        }
        Ok(())
    }

    /// Fails when no upstream API key is available from file or environment.
    pub fn require_api_key(&self) -> Result<(), anyhow::Error> {
        anyhow::ensure!(
            !self.upstream.api_key.is_empty(),
            "no upstream API key: set upstream.api-key or {API_KEY_ENV}"
        );
        Ok(())
    }

    pub fn body_limit_bytes(&self) -> usize {
        self.body_limit_mb.saturating_mul(1024 * 1024)
    }

    /// Sanitize and normalize configuration.
    fn sanitize(&mut self) {
        self.upstream.api_key = self.upstream.api_key.trim().to_string();
        while self.upstream.base_url.ends_with('/') {
            self.upstream.base_url.pop();
        }
    }
}

// ─── Sub-configs ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("unknown log format: {s}")),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub api_key: String,
    /// Egress proxy (http/https/socks5). `None` connects directly.
    pub proxy_url: Option<String>,
    /// Seconds.
    pub connect_timeout: u64,
    /// Seconds for the whole call; 0 leaves upstream calls unbounded.
    pub request_timeout: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key: String::new(),
            proxy_url: None,
            connect_timeout: 30,
            request_timeout: 0,
        }
    }
}

impl UpstreamConfig {
    /// Full URL of the chat-completions endpoint.
    pub fn chat_completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

// Hand-written so the key never reaches logs.
impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("proxy_url", &self.proxy_url)
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Show only the last four characters of a secret.
pub fn redact(secret: &str) -> String {
    if secret.is_empty() {
        return "<unset>".to_string();
    }
    let tail: String = secret
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("***{tail}")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct ModelDefaults {
    pub model: String,
    pub fallback_model: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl Default for ModelDefaults {
    fn default() -> Self {
        Self {
            model: "gpt-5".to_string(),
            fallback_model: "gpt-4.1".to_string(),
            max_tokens: 500,
            temperature: 0.7,
        }
    }
}

// ─── Config Watcher ────────────────────────────────────────────────────────

pub struct ConfigWatcher {
    _watcher: notify::RecommendedWatcher,
}

impl ConfigWatcher {
    /// Watch a config file. On changes (debounced 150ms, SHA256 dedup) reload
    /// the config and swap it in via ArcSwap. Must be called inside a tokio
    /// runtime.
    pub fn start(
        path: String,
        config: Arc<ArcSwap<Config>>,
        on_reload: impl Fn(&Config) + Send + Sync + 'static,
    ) -> Result<Self, anyhow::Error> {
        let (tx, mut rx) = tokio::sync::mpsc::channel::<()>(16);

        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            if let Ok(event) = res
                && (event.kind.is_modify() || event.kind.is_create())
            {
                let _ = tx.blocking_send(());
            }
        })?;
        watcher.watch(Path::new(&path), RecursiveMode::NonRecursive)?;

        tokio::spawn(async move {
            let mut last_hash: Option<[u8; 32]> = None;
            let mut debounce: Option<tokio::time::Instant> = None;

            loop {
                tokio::select! {
                    event = rx.recv() => {
                        if event.is_none() {
                            break;
                        }
                        debounce = Some(tokio::time::Instant::now() + Duration::from_millis(150));
                    }
                    _ = async {
                        match debounce {
                            Some(deadline) => tokio::time::sleep_until(deadline).await,
                            None => std::future::pending::<()>().await,
                        }
                    } => {
                        debounce = None;
                        let contents = match std::fs::read(&path) {
                            Ok(contents) => contents,
                            Err(e) => {
                                tracing::error!("Config file read failed: {e}");
                                continue;
                            }
                        };
                        let hash: [u8; 32] = sha2::Sha256::digest(&contents).into();
                        if last_hash == Some(hash) {
                            continue;
                        }
                        last_hash = Some(hash);

                        match Config::load(&path) {
                            Ok(new_cfg) => {
                                on_reload(&new_cfg);
                                config.store(Arc::new(new_cfg));
                            }
                            Err(e) => tracing::error!("Config reload failed, keeping previous: {e}"),
                        }
                    }
                }
            }
        });

        Ok(Self { _watcher: watcher })
    }
}

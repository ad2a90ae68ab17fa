//! Tracing subscriber setup with optional daily-rotated file output.

use crate::config::LogFormat;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "relay.log";

#[derive(Debug, Clone)]
pub struct LogOptions<'a> {
    /// Filter used when `RUST_LOG` is unset.
    pub level: &'a str,
    pub format: LogFormat,
    pub to_file: bool,
    /// Defaults to `./logs`.
    pub dir: Option<&'a str>,
}

/// Install the global tracing subscriber.
///
/// The returned guard flushes the non-blocking file writer on drop and
/// **must be held** for the lifetime of the process. Stderr logging returns
/// `None`.
pub fn init_logging(opts: &LogOptions<'_>) -> Option<WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(opts.level));
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter);

    if !opts.to_file {
        match opts.format {
            LogFormat::Text => builder.init(),
            LogFormat::Json => builder.json().init(),
        }
        return None;
    }

    let dir = opts.dir.unwrap_or("./logs");
    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let builder = builder.with_writer(writer).with_ansi(false);

    match opts.format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
    Some(guard)
}

//! Structured logging setup using the `tracing` ecosystem.
//!
//! The CLI logs to stderr and to a daily-rotated file. The file is what
//! people attach when a channel keeps reconnecting, so it always carries
//! targets and source locations, and can be written as JSON for log
//! shippers.

use std::path::Path;

use tracing::Subscriber;
use tracing_appender::non_blocking::NonBlocking;
use tracing_appender::rolling;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;
use crate::error::NoticeResult;

/// Log file prefix. The appender adds the date, giving one
/// `admin-notice.log.YYYY-MM-DD` per day next to the config data.
const LOG_FILE_NAME: &str = "admin-notice.log";

/// Dependencies that log every frame or TLS record at debug level. They
/// are held at `warn` unless the filter names them explicitly.
const NOISY_TARGETS: &[&str] = &["tokio_tungstenite", "tungstenite", "rustls", "hyper_util", "reqwest"];

/// Initialize the global tracing subscriber with the given settings.
///
/// # Arguments
/// * `level` - Filter directive, e.g. "info" or "notice_socket=trace,info"
/// * `log_dir` - Directory for log files
/// * `json_output` - If true, use JSON format for file output
pub fn init_logging(level: &str, log_dir: &Path, json_output: bool) -> NoticeResult<LogGuard> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = rolling::daily(log_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact();

    tracing_subscriber::registry()
        .with(file_layer(non_blocking, json_output))
        .with(console_layer)
        .with(build_filter(level))
        .init();

    tracing::info!("logging initialized at level={level}, dir={}", log_dir.display());

    Ok(LogGuard { _guard: guard })
}

/// Initialize logging from the `[logging]` config section.
///
/// `verbose` forces the debug level regardless of the configured one.
pub fn init_from_config(config: &LoggingConfig, log_dir: &Path, verbose: bool) -> NoticeResult<LogGuard> {
    let level = if verbose { "debug" } else { config.level.as_str() };
    init_logging(level, log_dir, config.json_output)
}

/// Guard that keeps the non-blocking log writer alive.
/// Drop this to flush and close the log file.
pub struct LogGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Initialize a minimal console-only logger for tests or one-shot commands.
pub fn init_console_logging(level: &str) {
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).compact())
        .with(build_filter(level))
        .try_init();
}

fn file_layer<S>(writer: NonBlocking, json: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);
    if json {
        layer.json().boxed()
    } else {
        layer.with_ansi(false).boxed()
    }
}

/// Parse `level`, falling back to `info`, and quiet the noisy dependencies.
fn build_filter(level: &str) -> EnvFilter {
    let mut filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    for directive in quiet_directives(level) {
        if let Ok(directive) = directive.parse::<Directive>() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

/// `target=warn` for every noisy target the filter does not already name.
fn quiet_directives(level: &str) -> Vec<String> {
    let named: Vec<&str> = level
        .split(',')
        .filter_map(|d| d.split('=').next())
        .map(str::trim)
        .collect();
    NOISY_TARGETS
        .iter()
        .filter(|target| !named.contains(target))
        .map(|target| format!("{target}=warn"))
        .collect()
}

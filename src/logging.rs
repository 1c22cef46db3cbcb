//! `tracing` subscriber setup for the camkit binary and embedding applications

use crate::config::{LogRotation, LoggingOptions};
use crate::error::{Error, Result};
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::Subscriber;
use tracing_appender::non_blocking::{self, NonBlocking, WorkerGuard};
use tracing_appender::rolling;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

type FilteredRegistry = Layered<EnvFilter, Registry>;
type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// Install the global subscriber: UTC-stamped stdout output plus an optional
/// non-blocking file sink.
///
/// `RUST_LOG` takes precedence over `options.level`. A second call, or a call
/// after the host application installed its own subscriber, does nothing.
pub fn init(options: &LoggingOptions) -> Result<()> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let filter = env_filter(&options.level)?;
    let file = file_layer::<FilteredRegistry>(options)?;

    Registry::default()
        .with(filter)
        .with(file)
        .with(stdout_layer(options.color))
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to install tracing subscriber: {e}")))
}

fn env_filter(level: &str) -> Result<EnvFilter> {
    match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(&directives)
            .map_err(|e| Error::Config(format!("Invalid RUST_LOG '{directives}': {e}"))),
        _ => EnvFilter::try_new(level)
            .map_err(|e| Error::Config(format!("Invalid log level '{level}': {e}"))),
    }
}

/// Directory and file name of a log path, with the directory created
fn prepare_log_path(path: &Path) -> Result<(PathBuf, &std::ffi::OsStr)> {
    let file_name = path.file_name().ok_or_else(|| {
        Error::Config(format!(
            "Log file path '{}' must include a filename",
            path.display()
        ))
    })?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    std::fs::create_dir_all(&dir).map_err(|e| {
        Error::Config(format!(
            "Failed to create log directory {}: {e}",
            dir.display()
        ))
    })?;
    Ok((dir, file_name))
}

fn file_writer(path: &Path, rotation: Option<LogRotation>) -> Result<(NonBlocking, WorkerGuard)> {
    let (dir, file_name) = prepare_log_path(path)?;
    let builder = non_blocking::NonBlockingBuilder::default().lossy(false);

    Ok(match rotation {
        Some(LogRotation::Hourly) => builder.finish(rolling::hourly(dir, file_name)),
        Some(LogRotation::Daily) => builder.finish(rolling::daily(dir, file_name)),
        None => {
            let file = OpenOptions::new()
                .append(true)
                .create(true)
                .open(path)
                .map_err(|e| {
                    Error::Config(format!("Failed to open log file {}: {e}", path.display()))
                })?;
            builder.finish(file)
        }
    })
}

fn file_layer<S>(options: &LoggingOptions) -> Result<Option<BoxedLayer<S>>>
where
    S: Subscriber + for<'span> LookupSpan<'span> + Send + Sync + 'static,
{
    let Some(path) = options.file.as_deref() else {
        return Ok(None);
    };

    let (writer, guard) = file_writer(path, options.rotation)?;
    // The worker thread flushes for as long as the guard lives.
    let _ = FILE_GUARD.set(guard);

    Ok(Some(
        fmt::layer()
            .with_timer(UtcTime::rfc_3339())
            .with_ansi(false)
            .with_writer(writer)
            .with_target(true)
            .with_level(true)
            .boxed(),
    ))
}

fn stdout_layer<S>(color: bool) -> BoxedLayer<S>
where
    S: Subscriber + for<'span> LookupSpan<'span> + Send + Sync + 'static,
{
    fmt::layer()
        .with_timer(UtcTime::rfc_3339())
        .with_writer(io::stdout)
        .with_ansi(color)
        .with_target(true)
        .with_level(true)
        .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_directives_parse() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        assert!(env_filter("debug").is_ok());
        assert!(env_filter("camkit=trace,warn").is_ok());
    }

    #[test]
    fn test_log_path_without_file_name() {
        assert!(prepare_log_path(Path::new("/")).is_err());
    }
}

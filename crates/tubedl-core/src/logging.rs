//! Tracing setup for the interactive binary.
//!
//! Stdout belongs to prompts and the progress line, so logs go to
//! `~/.local/state/tubedl/tubedl.log`. When that file cannot be opened the
//! fallback writes to stderr and only shows warnings unless `RUST_LOG` says otherwise.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Where log lines end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSink {
    File,
    Stderr,
}

impl LogSink {
    /// Directives used when `RUST_LOG` is unset or empty.
    pub fn default_directives(self) -> &'static str {
        match self {
            LogSink::File => "info,tubedl=debug",
            // Shares the terminal with prompts and the `\r` progress line.
            LogSink::Stderr => "warn",
        }
    }
}

/// `rust_log` when it holds something, otherwise the sink's default.
pub fn filter_directives(sink: LogSink, rust_log: Option<&str>) -> String {
    match rust_log.map(str::trim) {
        Some(directives) if !directives.is_empty() => directives.to_string(),
        _ => sink.default_directives().to_string(),
    }
}

fn env_filter(sink: LogSink) -> EnvFilter {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    EnvFilter::try_new(filter_directives(sink, rust_log.as_deref())).unwrap_or_else(|e| {
        eprintln!("tubedl: ignoring invalid {}: {e}", EnvFilter::DEFAULT_ENV);
        EnvFilter::new(sink.default_directives())
    })
}

pub fn log_file_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("tubedl")?;
    xdg_dirs
        .place_state_file("tubedl.log")
        .context("creating log directory")
}

/// Appends structured logs to the state-dir log file and returns its path.
/// On failure the caller falls back to `init_logging_stderr`.
pub fn init_logging() -> Result<PathBuf> {
    let path = log_file_path()?;
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(LogSink::File))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("installing log subscriber: {e}"))?;

    tracing::info!(path = %path.display(), "tubedl logging initialized");
    Ok(path)
}

pub fn init_logging_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(LogSink::Stderr))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .without_time()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;
    use tracing_subscriber::registry::Registry;
    use tracing_subscriber::Layer;

    fn max_level(directives: &str) -> Option<LevelFilter> {
        Layer::<Registry>::max_level_hint(&EnvFilter::new(directives))
    }

    #[test]
    fn stderr_fallback_only_shows_warnings() {
        let directives = filter_directives(LogSink::Stderr, None);
        assert_eq!(directives, "warn");
        assert_eq!(max_level(&directives), Some(LevelFilter::WARN));
    }

    #[test]
    fn file_keeps_debug_detail() {
        let directives = filter_directives(LogSink::File, None);
        assert_eq!(max_level(&directives), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn rust_log_overrides_default() {
        assert_eq!(filter_directives(LogSink::Stderr, Some("debug")), "debug");
        assert_eq!(filter_directives(LogSink::Stderr, Some("  ")), "warn");
        assert_eq!(filter_directives(LogSink::File, Some("")), "info,tubedl=debug");
    }

    #[test]
    fn defaults_parse() {
        for sink in [LogSink::File, LogSink::Stderr] {
            assert!(EnvFilter::try_new(sink.default_directives()).is_ok());
        }
    }
}

//! Progress reporting for one transfer (bytes remaining, rate, ETA).
//!
//! The previous sample lives in a `ProgressTracker` owned by the transfer, so
//! sequential or concurrent transfers never share state.

use std::path::Path;
use std::time::{Duration, Instant};

pub const MIB: f64 = 1_048_576.0;

/// Snapshot emitted on every progress callback. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DownloadProgress {
    pub bytes_remaining: u64,
    /// Bytes per second between the two most recent samples.
    pub bytes_per_sec: f64,
}

impl DownloadProgress {
    pub fn mib_remaining(&self) -> u64 {
        self.bytes_remaining / (1024 * 1024)
    }

    pub fn mib_per_sec(&self) -> f64 {
        self.bytes_per_sec / MIB
    }

    /// Seconds remaining, rounded; `None` while the transfer is stalled.
    pub fn eta_secs(&self) -> Option<u64> {
        if !(self.bytes_per_sec > 0.0) || !self.bytes_per_sec.is_finite() {
            return None;
        }
        Some((self.bytes_remaining as f64 / self.bytes_per_sec).round() as u64)
    }
}

/// Previous (bytes remaining, time) sample for one transfer.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    started: Instant,
    previous: Option<(u64, Instant)>,
}

impl ProgressTracker {
    /// Starts tracking; `now` is the baseline time for the first sample.
    pub fn start(now: Instant) -> Self {
        Self {
            started: now,
            previous: None,
        }
    }

    /// Records a sample and returns the derived progress.
    ///
    /// The first sample is measured against `bytes_remaining + 1` at the start
    /// time. A zero elapsed interval yields a rate of zero.
    pub fn sample(&mut self, bytes_remaining: u64, now: Instant) -> DownloadProgress {
        let (prev_bytes, prev_time) = self
            .previous
            .unwrap_or((bytes_remaining.saturating_add(1), self.started));
        let elapsed = now.saturating_duration_since(prev_time);
        let delta = prev_bytes.saturating_sub(bytes_remaining);
        let bytes_per_sec = rate(delta, elapsed);
        self.previous = Some((bytes_remaining, now));
        DownloadProgress {
            bytes_remaining,
            bytes_per_sec,
        }
    }
}

fn rate(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    bytes as f64 / secs
}

/// Receives transfer events synchronously, on the transfer's own thread.
pub trait ProgressSink {
    fn on_progress(&mut self, progress: &DownloadProgress);
    /// The final, playable file is in place.
    fn on_complete(&mut self, path: &Path);
    /// Status line for the user (titles, fallbacks, per-item failures).
    fn on_message(&mut self, _message: &str) {}
}

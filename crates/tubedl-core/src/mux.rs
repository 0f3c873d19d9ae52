//! Combining separately downloaded video and audio with an external muxer.
//!
//! Failure is a value, not an error: the caller must choose the fallback.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MuxOutcome {
    Success,
    Failed { reason: String },
}

impl MuxOutcome {
    #[cfg(test)]
    pub fn is_success(&self) -> bool {
        matches!(self, MuxOutcome::Success)
    }
}

pub trait Muxer {
    /// Writes `output` from `audio` + `video`, overwriting any existing file.
    fn combine(&self, audio: &Path, video: &Path, output: &Path) -> MuxOutcome;
}

/// Runs `<binary> -y -i <audio> -i <video> <output>`; the output container
/// follows the output file's extension.
#[derive(Debug, Clone)]
pub struct FfmpegMuxer {
    binary: PathBuf,
    timeout: Option<Duration>,
}

const POLL_INTERVAL: Duration = Duration::from_millis(50);

impl FfmpegMuxer {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout: None,
        }
    }

    /// Kill the muxer and report failure after `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// True when `<binary> -version` runs and exits 0.
    pub fn is_available(&self) -> bool {
        let status = Command::new(&self.binary)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match status {
            Ok(s) if s.success() => true,
            Ok(s) => {
                tracing::info!(binary = %self.binary.display(), status = %s, "muxer returned failure status");
                false
            }
            Err(e) => {
                tracing::info!(binary = %self.binary.display(), "muxer not runnable: {}", e);
                false
            }
        }
    }

    fn wait(&self, child: &mut Child) -> std::io::Result<Option<ExitStatus>> {
        let Some(timeout) = self.timeout else {
            return child.wait().map(Some);
        };
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(Some(status));
            }
            if Instant::now() >= deadline {
                child.kill()?;
                child.wait()?;
                return Ok(None);
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Muxer for FfmpegMuxer {
    fn combine(&self, audio: &Path, video: &Path, output: &Path) -> MuxOutcome {
        tracing::info!(
            audio = %audio.display(),
            video = %video.display(),
            output = %output.display(),
            "muxing"
        );
        let spawned = Command::new(&self.binary)
            .arg("-y")
            .arg("-i")
            .arg(audio)
            .arg("-i")
            .arg(video)
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        let mut child = match spawned {
            Ok(c) => c,
            Err(e) => {
                return MuxOutcome::Failed {
                    reason: format!("could not start {}: {}", self.binary.display(), e),
                }
            }
        };
        let outcome = match self.wait(&mut child) {
            Ok(Some(status)) if status.success() => MuxOutcome::Success,
            Ok(Some(status)) => MuxOutcome::Failed {
                reason: format!("muxer exited with {status}"),
            },
            Ok(None) => MuxOutcome::Failed {
                reason: "muxer timed out".to_string(),
            },
            Err(e) => MuxOutcome::Failed {
                reason: format!("waiting for muxer: {e}"),
            },
        };
        tracing::debug!(?outcome, "mux finished");
        outcome
    }
}

//! Drives the byte transfer for one video: one progressive stream, or a
//! video-only plus audio-only pair for the muxer.

use crate::catalog::{StreamCatalog, StreamDescriptor};
use crate::naming::{self, AUDIO_PREFIX, VIDEO_PREFIX};
use crate::progress::{ProgressSink, ProgressTracker};
use crate::resolver::{StrategyDecision, StreamTarget};
use crate::transfer::{Fetcher, TransferError};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Files produced by a transfer, owned by the pipeline until final.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferResult {
    /// Directly playable file.
    Progressive { path: PathBuf },
    /// Intermediates awaiting the muxer, plus where the muxed file should go.
    Adaptive {
        video: PathBuf,
        audio: PathBuf,
        output: PathBuf,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    #[error("the video offers no progressive stream")]
    NoProgressiveStreamOffered,
    #[error("could not create {}: {source}", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("transfer to {} failed: {source}", path.display())]
    Transfer {
        path: PathBuf,
        #[source]
        source: TransferError,
    },
}

pub struct DownloadExecutor<F> {
    fetcher: F,
    adaptive_container: String,
    output_container: String,
}

impl<F: Fetcher> DownloadExecutor<F> {
    /// `adaptive_container` picks the adaptive video/audio family (e.g. `webm`);
    /// `output_container` is the muxed file's extension (e.g. `mp4`).
    pub fn new(fetcher: F, adaptive_container: impl Into<String>, output_container: impl Into<String>) -> Self {
        Self {
            fetcher,
            adaptive_container: adaptive_container.into(),
            output_container: output_container.into(),
        }
    }

    #[cfg(test)]
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Transfers the streams `decision` calls for into `dest_dir`.
    ///
    /// An adaptive decision whose video or audio stream is missing falls back
    /// to the progressive path.
    pub fn execute(
        &self,
        title: &str,
        catalog: &StreamCatalog,
        decision: &StrategyDecision,
        dest_dir: &Path,
        sink: &mut dyn ProgressSink,
    ) -> Result<TransferResult, ExecuteError> {
        std::fs::create_dir_all(dest_dir).map_err(|source| ExecuteError::Directory {
            path: dest_dir.to_path_buf(),
            source,
        })?;

        if !decision.use_progressive() {
            if let Some((video, audio)) = self.adaptive_pair(catalog, decision) {
                return self.adaptive(title, video, audio, dest_dir, sink);
            }
            tracing::info!(%decision, container = %self.adaptive_container, "adaptive streams missing; using progressive");
        }
        self.progressive(title, catalog, decision, dest_dir, sink)
    }

    fn adaptive_pair<'c>(
        &self,
        catalog: &'c StreamCatalog,
        decision: &StrategyDecision,
    ) -> Option<(&'c StreamDescriptor, &'c StreamDescriptor)> {
        let StreamTarget::Exact(resolution) = decision.target else {
            return None;
        };
        let video = catalog.adaptive_video(resolution, &self.adaptive_container)?;
        let audio = catalog.best_audio(&self.adaptive_container)?;
        Some((video, audio))
    }

    fn progressive(
        &self,
        title: &str,
        catalog: &StreamCatalog,
        decision: &StrategyDecision,
        dest_dir: &Path,
        sink: &mut dyn ProgressSink,
    ) -> Result<TransferResult, ExecuteError> {
        let stream = match decision.target {
            StreamTarget::Exact(r) => catalog.progressive_at(r).or_else(|| {
                tracing::info!(resolution = %r, "no progressive stream at resolution; using highest available");
                catalog.highest_progressive()
            }),
            StreamTarget::HighestProgressive => catalog.highest_progressive(),
        }
        .ok_or(ExecuteError::NoProgressiveStreamOffered)?;

        let path = dest_dir.join(naming::stream_filename(title, &stream.container));
        self.transfer(stream, &path, sink)?;
        sink.on_complete(&path);
        Ok(TransferResult::Progressive { path })
    }

    fn adaptive(
        &self,
        title: &str,
        video: &StreamDescriptor,
        audio: &StreamDescriptor,
        dest_dir: &Path,
        sink: &mut dyn ProgressSink,
    ) -> Result<TransferResult, ExecuteError> {
        let video_name = naming::stream_filename(title, &video.container);
        let video_path = dest_dir.join(format!("{VIDEO_PREFIX}{video_name}"));
        let audio_path = dest_dir.join(format!(
            "{AUDIO_PREFIX}{}",
            naming::stream_filename(title, &audio.container)
        ));
        let output = dest_dir.join(naming::with_container(&video_name, &self.output_container));

        self.transfer(video, &video_path, sink)?;
        if let Err(e) = self.transfer(audio, &audio_path, sink) {
            crate::cleanup::remove_intermediates([video_path.as_path()]);
            return Err(e);
        }
        Ok(TransferResult::Adaptive {
            video: video_path,
            audio: audio_path,
            output,
        })
    }

    fn transfer(&self, stream: &StreamDescriptor, path: &Path, sink: &mut dyn ProgressSink) -> Result<u64, ExecuteError> {
        let mut tracker = ProgressTracker::start(Instant::now());
        let mut on_remaining = |remaining: u64| {
            let progress = tracker.sample(remaining, Instant::now());
            sink.on_progress(&progress);
        };
        self.fetcher
            .fetch(stream, path, &mut on_remaining)
            .map_err(|source| ExecuteError::Transfer {
                path: path.to_path_buf(),
                source,
            })
    }
}

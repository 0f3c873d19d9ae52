//! Per-video pipeline and batch driver.
//!
//! Each video runs `Resolving → Transferring → [Muxing → Cleaning] → Done`.
//! A failed mux (or failed adaptive transfer) goes back to `Transferring` with
//! the progressive strategy exactly once; a second failure ends that video
//! only. Videos in a batch run strictly one after another.

use crate::catalog::{Collection, MetadataError, MetadataSource, VideoInfo};
use crate::cleanup;
use crate::executor::{DownloadExecutor, TransferResult};
use crate::mux::{MuxOutcome, Muxer};
use crate::naming;
use crate::progress::ProgressSink;
use crate::prompt::Prompt;
use crate::reference::{self, ReferenceKind};
use crate::resolver::{self, ResolutionChoice, ResolveError, StrategyDecision};
use crate::transfer::Fetcher;
use std::io;
use std::path::{Path, PathBuf};

/// How one video ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalStatus {
    Done { path: PathBuf },
    /// The user declined.
    Skipped,
    Failed { reason: String },
}

/// Tally for one processed reference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub done: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BatchReport {
    fn record(&mut self, status: &TerminalStatus) {
        match status {
            TerminalStatus::Done { .. } => self.done += 1,
            TerminalStatus::Skipped => self.skipped += 1,
            TerminalStatus::Failed { .. } => self.failed += 1,
        }
    }
}

/// Resolution state shared by the videos of one batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct Batch {
    /// Set by the first successful resolution (or preset); never replaced by a
    /// member's scoped re-resolution.
    pub choice: Option<ResolutionChoice>,
}

impl Batch {
    pub fn with_choice(choice: Option<ResolutionChoice>) -> Self {
        Self { choice }
    }
}

enum Phase {
    Transferring {
        decision: StrategyDecision,
        fallback_used: bool,
    },
    Muxing {
        decision: StrategyDecision,
        video: PathBuf,
        audio: PathBuf,
        output: PathBuf,
    },
    Cleaning {
        intermediates: [PathBuf; 2],
        result: PathBuf,
    },
    Done(PathBuf),
}

/// Collaborators the pipeline needs. All calls are synchronous.
pub struct DownloadOrchestrator<'a, F> {
    pub source: &'a dyn MetadataSource,
    pub prompt: &'a mut dyn Prompt,
    pub executor: &'a DownloadExecutor<F>,
    pub muxer: &'a dyn Muxer,
    pub sink: &'a mut dyn ProgressSink,
    pub muxer_available: bool,
    /// Root output directory; collections get a subdirectory.
    pub downloads_root: PathBuf,
    /// Choice applied to every batch instead of asking (e.g. from the CLI).
    pub preset: Option<ResolutionChoice>,
}

impl<'a, F: Fetcher> DownloadOrchestrator<'a, F> {
    /// Classifies `reference` and downloads the video, playlist or channel it names.
    /// Only prompt I/O failures are returned as errors; everything else is reported per item.
    pub fn process_reference(&mut self, reference: &str) -> io::Result<BatchReport> {
        let reference = reference.trim();
        match reference::classify(reference) {
            ReferenceKind::Video => self.single_video(reference),
            ReferenceKind::Playlist => {
                let listed = self.source.get_playlist(reference);
                self.collection(reference, listed, "playlist")
            }
            ReferenceKind::Channel => {
                let listed = self.source.get_channel(reference);
                self.collection(reference, listed, "channel")
            }
        }
    }

    fn single_video(&mut self, reference: &str) -> io::Result<BatchReport> {
        let mut report = BatchReport::default();
        let info = match self.source.get_video(reference) {
            Ok(info) => info,
            Err(e) => {
                let status = self.metadata_failure(reference, "video", &e);
                report.record(&status);
                return Ok(report);
            }
        };
        let question = format!("Do you want to download the video with the title \"{}\"?", info.title);
        let status = if self.prompt.ask_yes_no(&question)? {
            let root = self.downloads_root.clone();
            self.download(&info, &root, &mut Batch::with_choice(self.preset))?
        } else {
            TerminalStatus::Skipped
        };
        report.record(&status);
        Ok(report)
    }

    fn collection(
        &mut self,
        reference: &str,
        listed: Result<Collection, MetadataError>,
        noun: &str,
    ) -> io::Result<BatchReport> {
        let mut report = BatchReport::default();
        let collection = match listed {
            Ok(c) => c,
            Err(e) => {
                let status = self.metadata_failure(reference, noun, &e);
                report.record(&status);
                return Ok(report);
            }
        };
        let total = collection.members.len();
        let question = match noun {
            "channel" => format!(
                "Do you want to download all {total} (non-private) videos from the channel \"{}\"?",
                collection.title
            ),
            _ => format!(
                "Do you want to download all {total} (non-private) videos in the {noun} with the title \"{}\"?",
                collection.title
            ),
        };
        if !self.prompt.ask_yes_no(&question)? {
            return Ok(report);
        }

        let dest = self.downloads_root.join(naming::collection_dirname(&collection.title));
        tracing::info!(reference, total, dest = %dest.display(), "starting batch");
        let mut batch = Batch::with_choice(self.preset);
        for (i, member) in collection.members.iter().enumerate() {
            self.sink.on_message(&format!("Downloading video {} out of {}.", i + 1, total));
            let status = self.process_video(member, &dest, &mut batch)?;
            report.record(&status);
        }
        tracing::info!(reference, ?report, "batch finished");
        Ok(report)
    }

    /// Fetches one video's catalog and runs it through the pipeline.
    pub fn process_video(&mut self, video_ref: &str, dest_dir: &Path, batch: &mut Batch) -> io::Result<TerminalStatus> {
        match self.source.get_video(video_ref) {
            Ok(info) => {
                self.sink.on_message(&format!("Video title: \"{}\"", info.title));
                self.download(&info, dest_dir, batch)
            }
            Err(e) => Ok(self.metadata_failure(video_ref, "video", &e)),
        }
    }

    fn metadata_failure(&mut self, reference: &str, noun: &str, err: &MetadataError) -> TerminalStatus {
        let message = match err {
            MetadataError::InvalidReference(_) => format!("{reference} is not a valid {noun} url."),
            MetadataError::Unavailable(_, detail) if detail.to_lowercase().contains("private") => {
                format!("{reference} is a private {noun} and cannot be downloaded.")
            }
            MetadataError::Unavailable(..) if noun == "video" => {
                format!("{reference} is unavailable to us and cannot be downloaded.")
            }
            MetadataError::Unavailable(..) => {
                format!("{reference} is not available or is not a {noun} and cannot be downloaded.")
            }
            MetadataError::Tool(e) => format!("Could not look up {reference}: {e:#}"),
        };
        tracing::warn!(reference, "metadata lookup failed: {}", err);
        self.sink.on_message(&message);
        TerminalStatus::Failed { reason: message }
    }

    /// Runs the state machine for one already-fetched video.
    pub fn download(&mut self, info: &VideoInfo, dest_dir: &Path, batch: &mut Batch) -> io::Result<TerminalStatus> {
        tracing::debug!(video = %info.id, "resolving");
        let resolved = match resolver::resolve(&info.catalog, batch.choice, self.muxer_available, &mut *self.prompt) {
            Ok(r) => r,
            Err(ResolveError::Prompt(e)) => return Err(e),
            Err(e @ ResolveError::NoProgressiveStreamOffered) => {
                let reason = format!("\"{}\" cannot be downloaded: {e}", info.title);
                self.sink.on_message(&reason);
                tracing::warn!(video = %info.id, "{}", e);
                return Ok(TerminalStatus::Failed { reason });
            }
        };
        if batch.choice.is_none() {
            batch.choice = Some(resolved.choice);
        } else if resolved.prompted {
            tracing::info!(video = %info.id, choice = %resolved.choice, "re-resolved for this video only");
        }

        let mut phase = Phase::Transferring {
            decision: resolved.decision,
            fallback_used: false,
        };
        loop {
            phase = match phase {
                Phase::Transferring { decision, fallback_used } => {
                    tracing::debug!(video = %info.id, %decision, fallback_used, "transferring");
                    if !decision.use_progressive() {
                        self.sink.on_message("Downloading video and audio files...");
                    }
                    match self.executor.execute(&info.title, &info.catalog, &decision, dest_dir, &mut *self.sink) {
                        Ok(TransferResult::Progressive { path }) => Phase::Done(path),
                        Ok(TransferResult::Adaptive { video, audio, output }) => Phase::Muxing {
                            decision,
                            video,
                            audio,
                            output,
                        },
                        Err(e) if !decision.use_progressive() && !fallback_used => {
                            tracing::warn!(video = %info.id, "adaptive transfer failed, falling back to progressive: {}", e);
                            Phase::Transferring {
                                decision: decision.as_progressive(),
                                fallback_used: true,
                            }
                        }
                        Err(e) => {
                            let reason = format!("Downloading \"{}\" failed: {e}", info.title);
                            tracing::warn!(video = %info.id, "{}", reason);
                            self.sink.on_message(&reason);
                            return Ok(TerminalStatus::Failed { reason });
                        }
                    }
                }
                Phase::Muxing {
                    decision,
                    video,
                    audio,
                    output,
                } => {
                    self.sink.on_message("Combining video and audio files...");
                    match self.muxer.combine(&audio, &video, &output) {
                        MuxOutcome::Success => Phase::Cleaning {
                            intermediates: [video, audio],
                            result: output,
                        },
                        MuxOutcome::Failed { reason } => {
                            tracing::warn!(video = %info.id, "mux failed, retrying progressive: {}", reason);
                            self.sink.on_message("Combining failed; downloading a single-file version instead.");
                            if let Err(e) = cleanup::remove_if_exists(&output) {
                                tracing::warn!(path = %output.display(), "could not discard partial output: {}", e);
                            }
                            cleanup::remove_intermediates([video.as_path(), audio.as_path()]);
                            Phase::Transferring {
                                decision: decision.as_progressive(),
                                fallback_used: true,
                            }
                        }
                    }
                }
                Phase::Cleaning { intermediates, result } => {
                    self.sink.on_message("Removing the separate video and audio files...");
                    cleanup::remove_intermediates(intermediates.iter().map(PathBuf::as_path));
                    self.sink.on_complete(&result);
                    Phase::Done(result)
                }
                Phase::Done(path) => {
                    tracing::info!(video = %info.id, path = %path.display(), "done");
                    return Ok(TerminalStatus::Done { path });
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testing::sample_catalog;
    use crate::catalog::{StreamCatalog, TrackKind};
    use crate::executor::testing::{FakeFetcher, RecordingSink};
    use crate::resolution::Resolution;
    use crate::resolver::testing::ScriptedPrompt;
    use std::cell::RefCell;
    use std::collections::HashMap;

    struct FakeSource {
        videos: HashMap<String, VideoInfo>,
        playlist: Collection,
    }

    impl FakeSource {
        fn new(videos: Vec<VideoInfo>) -> Self {
            let members = videos.iter().map(|v| v.id.clone()).collect();
            Self {
                videos: videos.into_iter().map(|v| (v.id.clone(), v)).collect(),
                playlist: Collection {
                    title: "Mix/List".to_string(),
                    members,
                },
            }
        }
    }

    impl MetadataSource for FakeSource {
        fn get_video(&self, video_ref: &str) -> Result<VideoInfo, MetadataError> {
            if video_ref == "private" {
                return Err(MetadataError::Unavailable(video_ref.into(), "Private video".into()));
            }
            self.videos
                .get(video_ref)
                .cloned()
                .ok_or_else(|| MetadataError::InvalidReference(video_ref.into()))
        }

        fn get_playlist(&self, _playlist_ref: &str) -> Result<Collection, MetadataError> {
            Ok(self.playlist.clone())
        }

        fn get_channel(&self, channel_ref: &str) -> Result<Collection, MetadataError> {
            Err(MetadataError::InvalidReference(channel_ref.into()))
        }
    }

    /// Writes the output file on success; records every invocation.
    struct FakeMuxer {
        succeed: bool,
        calls: RefCell<Vec<PathBuf>>,
    }

    impl FakeMuxer {
        fn new(succeed: bool) -> Self {
            Self {
                succeed,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl Muxer for FakeMuxer {
        fn combine(&self, _audio: &Path, _video: &Path, output: &Path) -> MuxOutcome {
            self.calls.borrow_mut().push(output.to_path_buf());
            std::fs::write(output, b"partial").unwrap();
            if self.succeed {
                MuxOutcome::Success
            } else {
                MuxOutcome::Failed {
                    reason: "exit status: 1".into(),
                }
            }
        }
    }

    fn video(id: &str, catalog: StreamCatalog) -> VideoInfo {
        VideoInfo {
            id: id.to_string(),
            title: format!("Title {id}"),
            catalog,
        }
    }

    fn catalog_up_to(max_adaptive: u32) -> StreamCatalog {
        use crate::catalog::testing::stream;
        let mut streams: Vec<_> = [360, 720]
            .iter()
            .map(|h| stream(TrackKind::Progressive, "mp4", Some(*h)))
            .collect();
        for h in [1080, 1440, 2160].into_iter().filter(|h| *h <= max_adaptive) {
            streams.push(stream(TrackKind::VideoOnly, "webm", Some(h)));
        }
        streams.push(stream(TrackKind::AudioOnly, "webm", None));
        StreamCatalog::new(streams)
    }

    struct Harness {
        source: FakeSource,
        prompt: ScriptedPrompt,
        executor: DownloadExecutor<FakeFetcher>,
        muxer: FakeMuxer,
        sink: RecordingSink,
        dir: tempfile::TempDir,
    }

    impl Harness {
        fn new(videos: Vec<VideoInfo>, answers: &[&str], mux_ok: bool) -> Self {
            Self {
                source: FakeSource::new(videos),
                prompt: ScriptedPrompt::with_choices(answers),
                executor: DownloadExecutor::new(FakeFetcher::default(), "webm", "mp4"),
                muxer: FakeMuxer::new(mux_ok),
                sink: RecordingSink::default(),
                dir: tempfile::tempdir().unwrap(),
            }
        }

        fn run<T>(&mut self, muxer_available: bool, f: impl FnOnce(&mut DownloadOrchestrator<'_, FakeFetcher>) -> T) -> T {
            let mut orch = DownloadOrchestrator {
                source: &self.source,
                prompt: &mut self.prompt,
                executor: &self.executor,
                muxer: &self.muxer,
                sink: &mut self.sink,
                muxer_available,
                downloads_root: self.dir.path().to_path_buf(),
                preset: None,
            };
            f(&mut orch)
        }
    }

    #[test]
    fn adaptive_success_muxes_and_cleans() {
        let mut h = Harness::new(vec![video("v1", sample_catalog())], &["1080p"], true);
        let dest = h.dir.path().to_path_buf();
        let status = h
            .run(true, |o| o.process_video("v1", &dest, &mut Batch::default()))
            .unwrap();
        let output = dest.join("Title v1.mp4");
        assert_eq!(status, TerminalStatus::Done { path: output.clone() });
        assert!(!dest.join("video_Title v1.webm").exists());
        assert!(!dest.join("audio_Title v1.webm").exists());
        assert_eq!(h.sink.completed, [output]);
    }

    #[test]
    fn scenario_c_mux_failure_falls_back_once() {
        let mut h = Harness::new(vec![video("v1", sample_catalog())], &["1080p"], false);
        let dest = h.dir.path().to_path_buf();
        let status = h
            .run(true, |o| o.process_video("v1", &dest, &mut Batch::default()))
            .unwrap();
        // No progressive 1080p: the highest progressive stream is used.
        let path = dest.join("Title v1.mp4");
        assert_eq!(status, TerminalStatus::Done { path: path.clone() });
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "mp4-720-Progressive");
        assert!(!dest.join("video_Title v1.webm").exists());
        assert!(!dest.join("audio_Title v1.webm").exists());
        assert_eq!(h.muxer.calls.borrow().len(), 1);
        assert_eq!(
            *h.executor.fetcher().fetched.borrow(),
            ["webm-1080-VideoOnly", "audio-high", "mp4-720-Progressive"]
        );
    }

    #[test]
    fn partial_muxed_output_is_removed_before_fallback() {
        let mut h = Harness::new(vec![video("v1", sample_catalog())], &["1080p"], false);
        h.executor = DownloadExecutor::new(FakeFetcher::default(), "webm", "mkv");
        let dest = h.dir.path().to_path_buf();
        let status = h
            .run(true, |o| o.process_video("v1", &dest, &mut Batch::default()))
            .unwrap();
        let muxed = dest.join("Title v1.mkv");
        assert_eq!(*h.muxer.calls.borrow(), [muxed.clone()]);
        assert!(!muxed.exists());
        let path = dest.join("Title v1.mp4");
        assert_eq!(status, TerminalStatus::Done { path: path.clone() });
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "mp4-720-Progressive");
        assert_eq!(h.sink.completed, [path]);
    }

    #[test]
    fn progressive_failure_after_fallback_is_terminal() {
        let mut h = Harness::new(vec![video("v1", sample_catalog())], &["1080p"], false);
        h.executor = DownloadExecutor::new(FakeFetcher::failing(&["mp4-720-Progressive"]), "webm", "mp4");
        let dest = h.dir.path().to_path_buf();
        let status = h
            .run(true, |o| o.process_video("v1", &dest, &mut Batch::default()))
            .unwrap();
        assert!(matches!(status, TerminalStatus::Failed { .. }));
        assert_eq!(h.muxer.calls.borrow().len(), 1);
    }

    #[test]
    fn no_progressive_stream_fails_only_that_video() {
        let empty = StreamCatalog::default();
        let mut h = Harness::new(vec![video("v1", empty), video("v2", sample_catalog())], &["360"], true);
        let report = h
            .run(true, |o| o.process_reference("https://www.youtube.com/playlist?list=PL1"))
            .unwrap();
        assert_eq!(report, BatchReport { done: 1, failed: 1, skipped: 0 });
    }

    #[test]
    fn scenario_e_scoped_re_resolution() {
        let videos = vec![
            video("v1", catalog_up_to(1440)),
            video("v2", catalog_up_to(1080)),
            video("v3", catalog_up_to(1440)),
        ];
        let mut h = Harness::new(videos, &["1440p", "1080"], true);
        let report = h
            .run(true, |o| o.process_reference("https://www.youtube.com/playlist?list=PL1"))
            .unwrap();
        assert_eq!(report.done, 3);
        // Asked for video 1 and again for video 2 only.
        assert_eq!(h.prompt.choice_questions.len(), 2);
        let fetched = h.executor.fetcher().fetched.borrow().clone();
        let videos: Vec<&str> = fetched.iter().filter(|id| id.contains("VideoOnly")).map(String::as_str).collect();
        assert_eq!(videos, ["webm-1440-VideoOnly", "webm-1080-VideoOnly", "webm-1440-VideoOnly"]);
        let dest = h.dir.path().join("MixList");
        for id in ["v1", "v2", "v3"] {
            assert!(dest.join(format!("Title {id}.mp4")).exists());
        }
    }

    #[test]
    fn best_is_recomputed_per_video() {
        let videos = vec![video("v1", catalog_up_to(2160)), video("v2", catalog_up_to(1080))];
        let mut h = Harness::new(videos, &["best"], true);
        h.run(true, |o| o.process_reference("https://www.youtube.com/playlist?list=PL1"))
            .unwrap();
        assert_eq!(h.prompt.choice_questions.len(), 1);
        let fetched = h.executor.fetcher().fetched.borrow().clone();
        assert!(fetched.contains(&"webm-2160-VideoOnly".to_string()));
        assert!(fetched.contains(&"webm-1080-VideoOnly".to_string()));
    }

    #[test]
    fn muxer_unavailable_never_goes_adaptive() {
        let mut h = Harness::new(vec![video("v1", sample_catalog())], &["best"], true);
        let dest = h.dir.path().to_path_buf();
        let status = h
            .run(false, |o| o.process_video("v1", &dest, &mut Batch::default()))
            .unwrap();
        assert!(matches!(status, TerminalStatus::Done { .. }));
        assert!(h.muxer.calls.borrow().is_empty());
        assert_eq!(*h.executor.fetcher().fetched.borrow(), ["mp4-720-Progressive"]);
    }

    #[test]
    fn declined_single_video_is_skipped() {
        let mut h = Harness::new(vec![video("v1", sample_catalog())], &[], true);
        h.prompt.yes_no.push_back(false);
        let report = h.run(true, |o| o.process_reference("v1")).unwrap();
        assert_eq!(report, BatchReport { done: 0, failed: 0, skipped: 1 });
        assert!(h.prompt.yes_no_questions[0].contains("\"Title v1\""));
    }

    #[test]
    fn metadata_failures_are_reported_per_item() {
        let mut h = Harness::new(vec![], &[], true);
        let report = h.run(true, |o| o.process_reference("private")).unwrap();
        assert_eq!(report.failed, 1);
        let report = h
            .run(true, |o| o.process_reference("https://www.youtube.com/channel/UCx"))
            .unwrap();
        assert_eq!(report, BatchReport { done: 0, failed: 1, skipped: 0 });
        assert!(h.prompt.yes_no_questions.is_empty());
    }

    #[test]
    fn preset_choice_skips_prompt() {
        let mut h = Harness::new(vec![video("v1", sample_catalog())], &[], true);
        let status = h.run(true, |o| {
            o.preset = Some(ResolutionChoice::Explicit(Resolution::new(480)));
            o.process_reference("v1")
        });
        assert_eq!(status.unwrap().done, 1);
        assert!(h.prompt.choice_questions.is_empty());
    }

    #[test]
    fn prompt_eof_is_fatal() {
        let mut h = Harness::new(vec![video("v1", sample_catalog())], &[], true);
        let dest = h.dir.path().to_path_buf();
        let out = h.run(true, |o| o.process_video("v1", &dest, &mut Batch::default()));
        assert!(out.is_err());
    }
}

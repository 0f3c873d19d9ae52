//! Stream catalogs and the metadata collaborator interface.
//!
//! A catalog is fetched fresh for every video and discarded once the stream
//! decision has been made. The pipeline only depends on the `MetadataSource`
//! trait; `YtDlpSource` is the bundled implementation.

mod ytdlp;

pub use ytdlp::YtDlpSource;

use crate::resolution::Resolution;
use std::collections::BTreeSet;

/// What a single encoded stream carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    /// Video and audio muxed together; directly playable.
    Progressive,
    /// Video track only (adaptive).
    VideoOnly,
    /// Audio track only (adaptive).
    AudioOnly,
}

/// One entry of a video's stream catalog. Immutable once obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamDescriptor {
    /// Source-specific format identifier.
    pub id: String,
    /// Direct URL the bytes can be fetched from.
    pub url: String,
    /// Container / file extension, e.g. `mp4`, `webm`.
    pub container: String,
    pub kind: TrackKind,
    /// Absent for audio-only streams.
    pub resolution: Option<Resolution>,
    /// Average audio bitrate in kbit/s, when reported.
    pub audio_bitrate: Option<f64>,
}

/// The encodings one video offers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamCatalog {
    pub streams: Vec<StreamDescriptor>,
}

impl StreamCatalog {
    pub fn new(streams: Vec<StreamDescriptor>) -> Self {
        Self { streams }
    }

    fn of_kind(&self, kind: TrackKind) -> impl Iterator<Item = &StreamDescriptor> {
        self.streams.iter().filter(move |s| s.kind == kind)
    }

    /// Resolutions offered by progressive streams.
    pub fn progressive_resolutions(&self) -> BTreeSet<Resolution> {
        self.of_kind(TrackKind::Progressive)
            .filter_map(|s| s.resolution)
            .collect()
    }

    /// Resolutions offered by video-only adaptive streams.
    pub fn adaptive_resolutions(&self) -> BTreeSet<Resolution> {
        self.of_kind(TrackKind::VideoOnly)
            .filter_map(|s| s.resolution)
            .collect()
    }

    /// First progressive stream at exactly `resolution`.
    pub fn progressive_at(&self, resolution: Resolution) -> Option<&StreamDescriptor> {
        self.of_kind(TrackKind::Progressive)
            .find(|s| s.resolution == Some(resolution))
    }

    /// The "highest available progressive" shortcut.
    pub fn highest_progressive(&self) -> Option<&StreamDescriptor> {
        self.of_kind(TrackKind::Progressive)
            .filter(|s| s.resolution.is_some())
            .max_by_key(|s| s.resolution)
    }

    /// First video-only stream at `resolution` in `container`.
    pub fn adaptive_video(&self, resolution: Resolution, container: &str) -> Option<&StreamDescriptor> {
        self.of_kind(TrackKind::VideoOnly).find(|s| {
            s.resolution == Some(resolution) && s.container.eq_ignore_ascii_case(container)
        })
    }

    /// Highest-bitrate audio-only stream in `container`.
    pub fn best_audio(&self, container: &str) -> Option<&StreamDescriptor> {
        self.of_kind(TrackKind::AudioOnly)
            .filter(|s| s.container.eq_ignore_ascii_case(container))
            .max_by(|a, b| {
                let a = a.audio_bitrate.unwrap_or(0.0);
                let b = b.audio_bitrate.unwrap_or(0.0);
                a.total_cmp(&b)
            })
    }
}

/// A video as returned by the metadata collaborator.
#[derive(Debug, Clone)]
pub struct VideoInfo {
    pub id: String,
    pub title: String,
    pub catalog: StreamCatalog,
}

/// A playlist or channel: a title plus ordered member references.
#[derive(Debug, Clone)]
pub struct Collection {
    pub title: String,
    pub members: Vec<String>,
}

/// Failures reported by a metadata collaborator. Reported per item; never
/// abort a batch.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// Malformed URL or id.
    #[error("{0} is not a valid reference")]
    InvalidReference(String),
    /// Private, region-blocked or deleted.
    #[error("{0} is unavailable: {1}")]
    Unavailable(String, String),
    /// The collaborator itself could not run or produced garbage.
    #[error("metadata lookup failed: {0:#}")]
    Tool(#[from] anyhow::Error),
}

/// Retrieval of catalogs and collection membership from the remote service.
pub trait MetadataSource {
    fn get_video(&self, video_ref: &str) -> Result<VideoInfo, MetadataError>;
    fn get_playlist(&self, playlist_ref: &str) -> Result<Collection, MetadataError>;
    fn get_channel(&self, channel_ref: &str) -> Result<Collection, MetadataError>;
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn progressive_and_adaptive_sets() {
        let c = sample_catalog();
        let p: Vec<u32> = c.progressive_resolutions().iter().map(|r| r.height()).collect();
        assert_eq!(p, [360, 480, 720]);
        let a: Vec<u32> = c.adaptive_resolutions().iter().map(|r| r.height()).collect();
        assert_eq!(a, [360, 720, 1080, 1440]);
    }

    #[test]
    fn highest_progressive_is_numeric_max() {
        let c = sample_catalog();
        assert_eq!(
            c.highest_progressive().and_then(|s| s.resolution),
            Some(Resolution::new(720))
        );
    }

    #[test]
    fn adaptive_video_respects_container() {
        let c = sample_catalog();
        assert!(c.adaptive_video(Resolution::new(1080), "webm").is_some());
        assert!(c.adaptive_video(Resolution::new(1080), "mp4").is_none());
        assert!(c.adaptive_video(Resolution::new(480), "webm").is_none());
    }

    #[test]
    fn best_audio_prefers_bitrate_within_container() {
        let c = sample_catalog();
        assert_eq!(c.best_audio("webm").map(|s| s.id.as_str()), Some("audio-high"));
        assert!(c.best_audio("ogg").is_none());
    }

    #[test]
    fn empty_catalog_has_no_progressive() {
        let c = StreamCatalog::default();
        assert!(c.highest_progressive().is_none());
        assert!(c.progressive_resolutions().is_empty());
    }
}

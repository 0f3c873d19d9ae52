//! `MetadataSource` backed by the `yt-dlp` executable.
//!
//! Only metadata is requested (`--dump-single-json --skip-download`); the bytes
//! are fetched by the transfer engine from the direct format URLs.

use super::{Collection, MetadataError, MetadataSource, StreamCatalog, StreamDescriptor, TrackKind, VideoInfo};
use crate::resolution::Resolution;
use anyhow::Context;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Subset of the `--dump-single-json` payload for a single video.
#[derive(Debug, Deserialize)]
struct InfoJson {
    id: Option<String>,
    title: Option<String>,
    #[serde(default)]
    formats: Vec<FormatJson>,
}

#[derive(Debug, Deserialize)]
struct FormatJson {
    format_id: Option<String>,
    url: Option<String>,
    ext: Option<String>,
    height: Option<u32>,
    vcodec: Option<String>,
    acodec: Option<String>,
    abr: Option<f64>,
}

/// Subset of the `--flat-playlist --dump-single-json` payload.
#[derive(Debug, Deserialize)]
struct ListJson {
    title: Option<String>,
    channel: Option<String>,
    uploader: Option<String>,
    #[serde(default)]
    entries: Vec<EntryJson>,
}

#[derive(Debug, Deserialize)]
struct EntryJson {
    id: Option<String>,
    url: Option<String>,
}

fn has_codec(codec: Option<&str>) -> bool {
    matches!(codec, Some(c) if !c.is_empty() && c != "none")
}

impl FormatJson {
    fn into_descriptor(self) -> Option<StreamDescriptor> {
        let video = has_codec(self.vcodec.as_deref());
        let audio = has_codec(self.acodec.as_deref());
        let kind = match (video, audio) {
            (true, true) => TrackKind::Progressive,
            (true, false) => TrackKind::VideoOnly,
            (false, true) => TrackKind::AudioOnly,
            (false, false) => return None,
        };
        let resolution = match kind {
            TrackKind::AudioOnly => None,
            _ => Some(Resolution::new(self.height.filter(|h| *h > 0)?)),
        };
        Some(StreamDescriptor {
            id: self.format_id.unwrap_or_default(),
            url: self.url?,
            container: self.ext?,
            kind,
            resolution,
            audio_bitrate: self.abr,
        })
    }
}

fn video_from_json(raw: &str) -> anyhow::Result<VideoInfo> {
    let info: InfoJson = serde_json::from_str(raw).context("deserializing video metadata JSON")?;
    let streams = info
        .formats
        .into_iter()
        .filter_map(FormatJson::into_descriptor)
        .collect();
    let id = info.id.unwrap_or_default();
    Ok(VideoInfo {
        title: info.title.unwrap_or_else(|| id.clone()),
        id,
        catalog: StreamCatalog::new(streams),
    })
}

fn collection_from_json(raw: &str) -> anyhow::Result<Collection> {
    let list: ListJson = serde_json::from_str(raw).context("deserializing list metadata JSON")?;
    let title = list
        .title
        .or(list.channel)
        .or(list.uploader)
        .unwrap_or_else(|| "untitled".to_string());
    let members = list
        .entries
        .into_iter()
        .filter_map(|e| match (e.url, e.id) {
            (Some(url), _) if url.starts_with("http") => Some(url),
            (_, Some(id)) => Some(format!("https://www.youtube.com/watch?v={id}")),
            (url, None) => url,
        })
        .collect();
    Ok(Collection { title, members })
}

/// Maps yt-dlp's stderr on failure to the per-item error taxonomy.
fn classify_failure(reference: &str, stderr: &str) -> MetadataError {
    let lower = stderr.to_lowercase();
    let last_line = stderr
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("")
        .trim()
        .to_string();
    if lower.contains("is not a valid url")
        || lower.contains("unsupported url")
        || lower.contains("incomplete youtube id")
        || lower.contains("invalid url")
    {
        MetadataError::InvalidReference(reference.to_string())
    } else if lower.contains("private video")
        || lower.contains("unavailable")
        || lower.contains("not available")
        || lower.contains("has been removed")
        || lower.contains("does not exist")
    {
        MetadataError::Unavailable(reference.to_string(), last_line)
    } else {
        MetadataError::Tool(anyhow::anyhow!(
            "yt-dlp failed for {}: {}",
            reference,
            last_line
        ))
    }
}

/// Appends `/videos` to a channel URL so yt-dlp lists uploads rather than tabs.
fn channel_uploads_url(channel_ref: &str) -> String {
    match url::Url::parse(channel_ref) {
        Ok(mut parsed) => {
            let path = parsed.path().trim_end_matches('/').to_string();
            if path.ends_with("/videos") {
                parsed.set_path(&path);
            } else {
                parsed.set_path(&format!("{path}/videos"));
            }
            parsed.to_string()
        }
        Err(_) => channel_ref.to_string(),
    }
}

/// Runs `yt-dlp` to look up catalogs and collection members.
#[derive(Debug, Clone)]
pub struct YtDlpSource {
    binary: PathBuf,
}

impl YtDlpSource {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn dump_json(&self, reference: &str, flat: bool) -> Result<String, MetadataError> {
        let mut command = Command::new(&self.binary);
        command
            .arg("--dump-single-json")
            .arg("--skip-download")
            .arg("--no-warnings")
            .arg("--no-progress");
        if flat {
            command.arg("--flat-playlist");
        }
        command
            .arg(reference)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        tracing::debug!(reference, flat, "querying yt-dlp");
        let output = command
            .output()
            .with_context(|| format!("running {}", self.binary.display()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::debug!(reference, status = %output.status, "yt-dlp failed: {}", stderr.trim());
            return Err(classify_failure(reference, &stderr));
        }
        let raw = String::from_utf8(output.stdout).context("yt-dlp output is not UTF-8")?;
        Ok(raw)
    }
}

impl MetadataSource for YtDlpSource {
    fn get_video(&self, video_ref: &str) -> Result<VideoInfo, MetadataError> {
        let raw = self.dump_json(video_ref, false)?;
        Ok(video_from_json(&raw)?)
    }

    fn get_playlist(&self, playlist_ref: &str) -> Result<Collection, MetadataError> {
        let raw = self.dump_json(playlist_ref, true)?;
        Ok(collection_from_json(&raw)?)
    }

    fn get_channel(&self, channel_ref: &str) -> Result<Collection, MetadataError> {
        let raw = self.dump_json(&channel_uploads_url(channel_ref), true)?;
        Ok(collection_from_json(&raw)?)
    }
}

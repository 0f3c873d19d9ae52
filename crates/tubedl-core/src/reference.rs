//! Classifies a user-supplied reference as a video, playlist or channel.

use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Video,
    Playlist,
    Channel,
}

/// Playlist when the path names a playlist; channel for `/channel/…`,
/// `/user/…`, `/c/…` and `/@handle` paths; video otherwise. Strings that do not
/// parse as URLs fall back to substring checks.
pub fn classify(reference: &str) -> ReferenceKind {
    let reference = reference.trim();
    match Url::parse(reference) {
        Ok(url) => classify_url(&url),
        Err(_) => classify_text(reference),
    }
}

fn classify_url(url: &Url) -> ReferenceKind {
    let mut segments = url.path_segments().into_iter().flatten().filter(|s| !s.is_empty());
    match segments.next() {
        Some("playlist") => ReferenceKind::Playlist,
        Some("channel" | "user" | "c") => ReferenceKind::Channel,
        Some(s) if s.starts_with('@') => ReferenceKind::Channel,
        _ => ReferenceKind::Video,
    }
}

fn classify_text(reference: &str) -> ReferenceKind {
    if reference.contains("playlist") {
        ReferenceKind::Playlist
    } else if reference.contains("channel") || reference.contains("user") || reference.starts_with('@') {
        ReferenceKind::Channel
    } else {
        ReferenceKind::Video
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn videos() {
        for r in [
            "https://www.youtube.com/watch?v=L1Buw5XPj_k",
            "https://youtu.be/L1Buw5XPj_k",
            "https://www.youtube.com/watch?v=abc&list=PL123",
            "L1Buw5XPj_k",
        ] {
            assert_eq!(classify(r), ReferenceKind::Video, "{r}");
        }
    }

    #[test]
    fn playlists() {
        assert_eq!(
            classify("https://www.youtube.com/playlist?list=PL123"),
            ReferenceKind::Playlist
        );
        assert_eq!(classify("youtube.com/playlist?list=PL1"), ReferenceKind::Playlist);
    }

    #[test]
    fn channels() {
        for r in [
            "https://www.youtube.com/channel/UC123",
            "https://www.youtube.com/user/someone",
            "https://www.youtube.com/c/Someone/videos",
            "https://www.youtube.com/@someone",
            "www.youtube.com/channel/UC1",
        ] {
            assert_eq!(classify(r), ReferenceKind::Channel, "{r}");
        }
    }
}

//! Local filenames for downloaded streams and collection directories.

const NAME_MAX: usize = 255;
const FALLBACK_NAME: &str = "video";

/// Prefix for the adaptive video-only intermediate file.
pub const VIDEO_PREFIX: &str = "video_";
/// Prefix for the adaptive audio-only intermediate file.
pub const AUDIO_PREFIX: &str = "audio_";

/// Makes a title safe to use as a file or directory name.
///
/// - Drops characters reserved on common filesystems (`/ \ : * ? " < > |`) and control characters
/// - Collapses runs of whitespace into one space
/// - Trims leading/trailing spaces and dots
/// - Limits length to 255 bytes on a char boundary
pub fn sanitize_filename(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut prev_space = false;
    for c in title.chars() {
        if c.is_control() && !c.is_whitespace() {
            continue;
        }
        if matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') {
            continue;
        }
        if c.is_whitespace() {
            if !prev_space {
                out.push(' ');
            }
            prev_space = true;
        } else {
            out.push(c);
            prev_space = false;
        }
    }

    let trimmed = out.trim_matches(|c| c == ' ' || c == '.');
    let mut take = trimmed.len().min(NAME_MAX);
    while take > 0 && !trimmed.is_char_boundary(take) {
        take -= 1;
    }
    trimmed[..take].trim_end().to_string()
}

/// `<sanitized title>.<container>`, reserving room for the extension and the
/// intermediate prefixes.
pub fn stream_filename(title: &str, container: &str) -> String {
    let mut stem = sanitize_filename(title);
    if stem.is_empty() {
        stem = FALLBACK_NAME.to_string();
    }
    let budget = NAME_MAX.saturating_sub(container.len() + 1 + VIDEO_PREFIX.len().max(AUDIO_PREFIX.len()));
    if stem.len() > budget {
        let mut take = budget;
        while take > 0 && !stem.is_char_boundary(take) {
            take -= 1;
        }
        stem.truncate(take);
    }
    format!("{stem}.{container}")
}

/// Replaces the extension of `filename` with `container`.
pub fn with_container(filename: &str, container: &str) -> String {
    let stem = match filename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => filename,
    };
    format!("{stem}.{container}")
}

/// Directory name for a playlist or channel.
pub fn collection_dirname(title: &str) -> String {
    let name = sanitize_filename(title);
    if name.is_empty() || name == "." || name == ".." {
        "untitled".to_string()
    } else {
        name
    }
}

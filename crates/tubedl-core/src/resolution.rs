//! Resolution labels (`720p`) as a numeric value type.
//!
//! Labels are parsed once at the boundary (catalog ingestion, prompt input) so
//! every comparison inside the pipeline is numeric. `"1080p"` sorts above
//! `"720p"` here, unlike a plain string sort.

use std::fmt;
use std::str::FromStr;

/// Vertical pixel count of a video stream, canonically rendered as `<n>p`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Resolution(u32);

impl Resolution {
    pub const fn new(height: u32) -> Self {
        Resolution(height)
    }

    pub fn height(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}p", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid resolution label: {0:?}")]
pub struct ParseResolutionError(pub String);

impl FromStr for Resolution {
    type Err = ParseResolutionError;

    /// Accepts `"720"` and `"720p"` (surrounding whitespace ignored).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_suffix('p').unwrap_or(trimmed);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseResolutionError(s.to_string()));
        }
        digits
            .parse::<u32>()
            .ok()
            .filter(|h| *h > 0)
            .map(Resolution)
            .ok_or_else(|| ParseResolutionError(s.to_string()))
    }
}

/// Sorts resolutions by numeric magnitude and removes duplicates.
pub fn sort_resolutions<I>(resolutions: I, ascending: bool) -> Vec<Resolution>
where
    I: IntoIterator<Item = Resolution>,
{
    let mut out: Vec<Resolution> = resolutions.into_iter().collect();
    out.sort_unstable();
    out.dedup();
    if !ascending {
        out.reverse();
    }
    out
}

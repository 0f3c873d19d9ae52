//! Resolution resolution: turns a catalog plus the user's preference into one
//! concrete `StrategyDecision`.
//!
//! The offered set is progressive resolutions plus, when a muxer is available,
//! adaptive resolutions strictly above the progressive maximum. `best` and
//! `default` are always offered on top of that.

use crate::catalog::StreamCatalog;
use crate::prompt::Prompt;
use crate::resolution::{sort_resolutions, ParseResolutionError, Resolution};
use std::collections::BTreeSet;
use std::fmt;
use std::io;
use std::str::FromStr;

/// The user's resolution preference for a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionChoice {
    /// A concrete label.
    Explicit(Resolution),
    /// Highest eligible resolution, recomputed per video.
    Best,
    /// Highest progressive stream via the catalog shortcut, recomputed per video.
    Default,
}

impl FromStr for ResolutionChoice {
    type Err = ParseResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "best" => Ok(ResolutionChoice::Best),
            "default" => Ok(ResolutionChoice::Default),
            other => other.parse().map(ResolutionChoice::Explicit),
        }
    }
}

impl fmt::Display for ResolutionChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionChoice::Explicit(r) => write!(f, "{r}"),
            ResolutionChoice::Best => f.write_str("best"),
            ResolutionChoice::Default => f.write_str("default"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One muxed stream.
    Progressive,
    /// Separate video and audio streams combined by the muxer.
    Adaptive,
}

/// Which stream the executor should look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamTarget {
    Exact(Resolution),
    /// The catalog's own "highest progressive" shortcut.
    HighestProgressive,
}

/// Outcome of resolution for one video. Never supplied by the user directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyDecision {
    pub target: StreamTarget,
    pub strategy: Strategy,
}

impl StrategyDecision {
    pub fn use_progressive(&self) -> bool {
        self.strategy == Strategy::Progressive
    }

    pub fn resolution(&self) -> Option<Resolution> {
        match self.target {
            StreamTarget::Exact(r) => Some(r),
            StreamTarget::HighestProgressive => None,
        }
    }

    /// Same target, progressive strategy.
    pub fn as_progressive(self) -> Self {
        Self {
            strategy: Strategy::Progressive,
            ..self
        }
    }
}

impl fmt::Display for StrategyDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target {
            StreamTarget::Exact(r) => write!(f, "{r}")?,
            StreamTarget::HighestProgressive => f.write_str("highest progressive")?,
        }
        match self.strategy {
            Strategy::Progressive => f.write_str(" (progressive)"),
            Strategy::Adaptive => f.write_str(" (adaptive)"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("the video offers no progressive stream; cannot choose a resolution")]
    NoProgressiveStreamOffered,
    #[error("prompt failed: {0}")]
    Prompt(#[from] io::Error),
}

/// Resolutions one video offers, given muxer availability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferedResolutions {
    progressive: BTreeSet<Resolution>,
    adaptive: BTreeSet<Resolution>,
    progressive_max: Resolution,
    muxer_available: bool,
}

impl OfferedResolutions {
    pub fn from_catalog(catalog: &StreamCatalog, muxer_available: bool) -> Result<Self, ResolveError> {
        let progressive = catalog.progressive_resolutions();
        let progressive_max = *progressive
            .iter()
            .next_back()
            .ok_or(ResolveError::NoProgressiveStreamOffered)?;
        let adaptive = if muxer_available {
            catalog
                .adaptive_resolutions()
                .into_iter()
                .filter(|r| *r > progressive_max)
                .collect()
        } else {
            BTreeSet::new()
        };
        Ok(Self {
            progressive,
            adaptive,
            progressive_max,
            muxer_available,
        })
    }

    pub fn progressive_max(&self) -> Resolution {
        self.progressive_max
    }

    pub fn contains(&self, resolution: Resolution) -> bool {
        self.progressive.contains(&resolution) || self.adaptive.contains(&resolution)
    }

    /// Maximum over progressive ∪ qualifying adaptive.
    pub fn best(&self) -> Resolution {
        self.adaptive
            .iter()
            .next_back()
            .copied()
            .unwrap_or(self.progressive_max)
            .max(self.progressive_max)
    }

    pub fn descending(&self) -> Vec<Resolution> {
        sort_resolutions(self.progressive.iter().chain(&self.adaptive).copied(), false)
    }

    /// Answers the prompt accepts: `720`, `720p`, `best`, `default`.
    pub fn accepted_answers(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for r in self.progressive.iter().chain(&self.adaptive) {
            out.insert(r.to_string());
            out.insert(r.height().to_string());
        }
        out.insert("best".to_string());
        out.insert("default".to_string());
        out
    }

    pub fn options_line(&self) -> String {
        let mut labels: Vec<String> = self.descending().iter().map(|r| r.to_string()).collect();
        labels.push("best".to_string());
        labels.push("default".to_string());
        labels.join(", ")
    }

    pub fn prompt_text(&self) -> String {
        let mut text = String::from("At what resolution do you want to download the following video(s)?\n");
        text.push_str(&format!("The options are: {}\n", self.options_line()));
        if !self.adaptive.is_empty() {
            text.push_str(&format!(
                "Note: resolutions higher than {} use a different downloading method and take \
                 significantly longer to download.\n",
                self.progressive_max
            ));
        }
        text.push_str("Resolution: ");
        text
    }

    /// Applies `choice` to this video. `None` when an explicit label is not offered.
    pub fn decide(&self, choice: ResolutionChoice) -> Option<StrategyDecision> {
        let (target, resolution) = match choice {
            ResolutionChoice::Default => {
                return Some(StrategyDecision {
                    target: StreamTarget::HighestProgressive,
                    strategy: Strategy::Progressive,
                })
            }
            ResolutionChoice::Best => {
                let best = self.best();
                (StreamTarget::Exact(best), best)
            }
            ResolutionChoice::Explicit(r) if self.contains(r) => (StreamTarget::Exact(r), r),
            ResolutionChoice::Explicit(_) => return None,
        };
        let strategy = if !self.muxer_available || resolution <= self.progressive_max {
            Strategy::Progressive
        } else {
            Strategy::Adaptive
        };
        Some(StrategyDecision { target, strategy })
    }
}

/// Result of resolving one video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    /// The choice actually applied to this video.
    pub choice: ResolutionChoice,
    pub decision: StrategyDecision,
    /// True when the user had to be asked for this video.
    pub prompted: bool,
}

/// Resolves the strategy for one video.
///
/// `prior` is reused without asking when it applies to this catalog; otherwise
/// the user is asked until a valid, offered answer is given.
pub fn resolve(
    catalog: &StreamCatalog,
    prior: Option<ResolutionChoice>,
    muxer_available: bool,
    prompt: &mut dyn Prompt,
) -> Result<Resolved, ResolveError> {
    let offered = OfferedResolutions::from_catalog(catalog, muxer_available)?;

    if let Some(choice) = prior {
        if let Some(decision) = offered.decide(choice) {
            tracing::debug!(%choice, %decision, "reusing prior resolution choice");
            return Ok(Resolved {
                choice,
                decision,
                prompted: false,
            });
        }
        tracing::info!(%choice, "prior resolution not offered by this video; asking again");
    }

    let accepted = offered.accepted_answers();
    let text = offered.prompt_text();
    loop {
        let answer = prompt.ask_choice(&text, &accepted)?;
        let choice = match answer.parse::<ResolutionChoice>() {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!("rejected answer: {}", e);
                continue;
            }
        };
        if let Some(decision) = offered.decide(choice) {
            tracing::info!(%choice, %decision, "resolution chosen");
            return Ok(Resolved {
                choice,
                decision,
                prompted: true,
            });
        }
        tracing::debug!(%choice, "answer not offered for this video");
    }
}

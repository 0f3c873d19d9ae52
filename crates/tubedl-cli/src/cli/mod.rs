//! CLI for the tubedl video downloader.

mod commands;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tubedl_core::config;
use tubedl_core::resolver::ResolutionChoice;

use commands::run_session;

/// Top-level CLI for the tubedl video downloader.
#[derive(Debug, Parser)]
#[command(name = "tubedl")]
#[command(about = "tubedl: download videos, playlists and channels", long_about = None)]
pub struct Cli {
    /// Video, playlist or channel URL. Asked for interactively when omitted.
    pub reference: Option<String>,

    /// Root output directory (overrides `downloads_dir` in config.toml).
    #[arg(long, value_name = "DIR")]
    pub downloads_dir: Option<PathBuf>,

    /// Muxer executable (overrides `muxer_path` in config.toml).
    #[arg(long, value_name = "PATH")]
    pub muxer: Option<String>,

    /// Never combine adaptive streams; only progressive resolutions are offered.
    #[arg(long, conflicts_with = "muxer")]
    pub no_mux: bool,

    /// Resolution for every video (e.g. 720p, best, default) instead of asking.
    #[arg(long, value_name = "CHOICE")]
    pub resolution: Option<ResolutionChoice>,
}

impl Cli {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let mut cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        if let Some(dir) = &cli.downloads_dir {
            cfg.downloads_dir = dir.clone();
        }
        if let Some(muxer) = &cli.muxer {
            cfg.muxer_path = muxer.clone();
        }

        run_session(&cfg, &cli)
    }
}

#[cfg(test)]
mod tests;

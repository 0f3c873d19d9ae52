//! `tubedl [REFERENCE]` – interactive download session.

use super::ConsoleProgress;
use crate::cli::Cli;
use anyhow::{Context, Result};
use std::io;
use tubedl_core::catalog::YtDlpSource;
use tubedl_core::config::TubeConfig;
use tubedl_core::executor::DownloadExecutor;
use tubedl_core::mux::FfmpegMuxer;
use tubedl_core::orchestrator::{BatchReport, DownloadOrchestrator};
use tubedl_core::prompt::{Prompt, StdioPrompt};
use tubedl_core::retry::RetryPolicy;
use tubedl_core::transfer::{CurlOptions, HttpFetcher};

const URL_QUESTION: &str = "Enter the URL of the YouTube video/playlist/channel you want to download: ";

pub fn run_session(cfg: &TubeConfig, cli: &Cli) -> Result<()> {
    let source = YtDlpSource::new(&cfg.metadata_tool_path);
    let fetcher = HttpFetcher::new(
        CurlOptions {
            max_recv_speed: cfg.max_bytes_per_sec,
        },
        RetryPolicy::from(&cfg.retry_or_default()),
    );
    let executor = DownloadExecutor::new(fetcher, &cfg.adaptive_container, &cfg.output_container);
    let muxer = FfmpegMuxer::new(&cfg.muxer_path).with_timeout(cfg.mux_timeout());
    let muxer_available = !cli.no_mux && muxer.is_available();
    if !muxer_available {
        tracing::info!(muxer = %cfg.muxer_path, no_mux = cli.no_mux, "muxer unavailable; only progressive streams offered");
    }

    let mut prompt = StdioPrompt::stdio();
    let mut sink = ConsoleProgress::stdout();
    let mut first = cli.reference.clone();

    loop {
        let reference = match first.take() {
            Some(r) => r,
            None => match ask_reference(&mut prompt) {
                Ok(r) => r,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e).context("reading URL"),
            },
        };

        let mut orchestrator = DownloadOrchestrator {
            source: &source,
            prompt: &mut prompt,
            executor: &executor,
            muxer: &muxer,
            sink: &mut sink,
            muxer_available,
            downloads_root: cfg.downloads_dir.clone(),
            preset: cli.resolution,
        };
        match orchestrator.process_reference(&reference) {
            Ok(report) => println!("{}", summary(&reference, &report)),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e).with_context(|| format!("processing {reference}")),
        }

        match prompt.ask_yes_no("Do you want to download more?") {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }
    }
    tracing::info!("session finished");
    Ok(())
}

fn ask_reference(prompt: &mut dyn Prompt) -> io::Result<String> {
    loop {
        let answer = prompt.ask_line(URL_QUESTION)?;
        if !answer.is_empty() {
            return Ok(answer);
        }
    }
}

fn summary(reference: &str, report: &BatchReport) -> String {
    format!(
        "{reference}: {} downloaded, {} failed, {} skipped.",
        report.done, report.failed, report.skipped
    )
}

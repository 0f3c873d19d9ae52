//! Terminal rendering of transfer progress and status lines.

use std::io::{self, Write};
use std::path::Path;
use tubedl_core::progress::{DownloadProgress, ProgressSink};

/// Writes a single self-overwriting progress line, then status lines below it.
pub struct ConsoleProgress<W: Write> {
    out: W,
    /// A `\r` progress line is on screen and needs a newline before the next message.
    line_open: bool,
}

impl ConsoleProgress<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleProgress<W> {
    pub fn new(out: W) -> Self {
        Self { out, line_open: false }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn close_line(&mut self) {
        if self.line_open {
            let _ = writeln!(self.out);
            self.line_open = false;
        }
    }
}

pub fn progress_line(p: &DownloadProgress) -> String {
    let eta = p
        .eta_secs()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "?".to_string());
    format!(
        "\r{} MB remaining \tDownload speed: {:.1} MB/s \tEst. time remaining: {} s",
        p.mib_remaining(),
        p.mib_per_sec(),
        eta
    )
}

// Terminal write failures are not worth aborting a download over.
impl<W: Write> ProgressSink for ConsoleProgress<W> {
    fn on_progress(&mut self, progress: &DownloadProgress) {
        let _ = write!(self.out, "{}", progress_line(progress));
        let _ = self.out.flush();
        self.line_open = true;
    }

    fn on_complete(&mut self, path: &Path) {
        self.close_line();
        let _ = writeln!(self.out, "\nDownload complete. Video saved to {}", path.display());
    }

    fn on_message(&mut self, message: &str) {
        self.close_line();
        let _ = writeln!(self.out, "{message}");
    }
}

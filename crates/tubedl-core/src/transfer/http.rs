//! Single-stream HTTP GET via libcurl.

use super::{Fetcher, PartFile, TransferError};
use crate::catalog::StreamDescriptor;
use crate::retry::{run_with_retry, RetryPolicy};
use std::path::Path;
use std::time::Duration;

/// Per-transfer curl tuning.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurlOptions {
    /// Receive cap in bytes per second.
    pub max_recv_speed: Option<u64>,
}

/// Downloads streams with one GET each, retrying transient failures from zero.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    curl: CurlOptions,
    retry: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(curl: CurlOptions, retry: RetryPolicy) -> Self {
        Self { curl, retry }
    }

    fn fetch_once(
        &self,
        url: &str,
        dest: &Path,
        on_remaining: &mut dyn FnMut(u64),
    ) -> Result<u64, TransferError> {
        let mut part = PartFile::create(dest)?;
        let mut write_error: Option<std::io::Error> = None;
        let mut last_remaining: Option<u64> = None;

        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.connect_timeout(Duration::from_secs(30))?;
        easy.low_speed_limit(1024)?;
        easy.low_speed_time(Duration::from_secs(60))?;
        easy.progress(true)?;
        if let Some(speed) = self.curl.max_recv_speed {
            easy.max_recv_speed(speed)?;
        }

        let performed = {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| match part.write(data) {
                Ok(()) => Ok(data.len()),
                Err(e) => {
                    write_error = Some(e);
                    // Short count aborts the transfer.
                    Ok(0)
                }
            })?;
            transfer.progress_function(|total, now, _, _| {
                if total > 0.0 {
                    let remaining = (total - now).max(0.0) as u64;
                    if last_remaining != Some(remaining) {
                        last_remaining = Some(remaining);
                        on_remaining(remaining);
                    }
                }
                true
            })?;
            transfer.perform()
        };

        if let Some(e) = write_error {
            return Err(TransferError::Storage(e));
        }
        performed?;

        let code = easy.response_code()?;
        // file:// and similar report 0.
        if code != 0 && !(200..300).contains(&code) {
            return Err(TransferError::Http(code));
        }

        let received = part.written();
        let advertised = easy.content_length_download()?;
        if advertised >= 0.0 && advertised as u64 != received {
            return Err(TransferError::PartialTransfer {
                expected: advertised as u64,
                received,
            });
        }

        part.finish()?;
        Ok(received)
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(
        &self,
        stream: &StreamDescriptor,
        dest: &Path,
        on_remaining: &mut dyn FnMut(u64),
    ) -> Result<u64, TransferError> {
        tracing::debug!(stream = %stream.id, dest = %dest.display(), "starting transfer");
        let bytes = run_with_retry(&self.retry, || self.fetch_once(&stream.url, dest, &mut *on_remaining))?;
        tracing::info!(stream = %stream.id, bytes, dest = %dest.display(), "transfer complete");
        Ok(bytes)
    }
}

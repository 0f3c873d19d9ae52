//! Retry and backoff for stream transfers.
//!
//! Transient failures (timeouts, dropped connections, throttling, 5xx) are
//! retried with capped exponential backoff; everything else fails at once.

mod classify;
mod policy;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};

use crate::transfer::TransferError;

/// Runs `f` until it succeeds or the policy gives up. Each attempt starts from
/// scratch; `f` is responsible for discarding partial output.
pub fn run_with_retry<T, F>(policy: &RetryPolicy, mut f: F) -> Result<T, TransferError>
where
    F: FnMut() -> Result<T, TransferError>,
{
    let mut attempt = 1u32;
    loop {
        match f() {
            Ok(v) => return Ok(v),
            Err(e) => match policy.decide(attempt, classify(&e)) {
                RetryDecision::NoRetry => return Err(e),
                RetryDecision::RetryAfter(d) => {
                    tracing::warn!(attempt, delay_ms = d.as_millis() as u64, "transfer failed, retrying: {}", e);
                    std::thread::sleep(d);
                    attempt += 1;
                }
            },
        }
    }
}

//! Byte transfer of a single stream to a local file.
//!
//! `Fetcher` is the seam between the executor and the network; `HttpFetcher`
//! is the libcurl implementation.

mod error;
mod http;
mod part_file;

pub use error::TransferError;
pub use http::{CurlOptions, HttpFetcher};
use part_file::PartFile;

use crate::catalog::StreamDescriptor;
use std::path::Path;

/// Transfers one stream's bytes to `dest`.
pub trait Fetcher {
    /// Writes the stream to `dest` (replacing any existing file) and returns the
    /// number of bytes written. `on_remaining` is called with bytes-remaining
    /// whenever it changes, on the calling thread, in time order.
    fn fetch(
        &self,
        stream: &StreamDescriptor,
        dest: &Path,
        on_remaining: &mut dyn FnMut(u64),
    ) -> Result<u64, TransferError>;
}

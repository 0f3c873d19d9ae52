use std::io;

/// Failure of a single stream transfer, classified for retries.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("{0}")]
    Curl(#[from] curl::Error),
    #[error("HTTP {0}")]
    Http(u32),
    /// Server closed before the advertised length was received.
    #[error("partial transfer: expected {expected} bytes, got {received}")]
    PartialTransfer { expected: u64, received: u64 },
    #[error("storage: {0}")]
    Storage(#[from] io::Error),
}

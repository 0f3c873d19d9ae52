//! Map transfer failures onto retry error kinds.

use super::policy::ErrorKind;
use crate::transfer::TransferError;

pub fn classify_http_status(code: u32) -> ErrorKind {
    match code {
        429 | 503 => ErrorKind::Throttled,
        500..=599 => ErrorKind::Http5xx(code as u16),
        _ => ErrorKind::Other,
    }
}

pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        return ErrorKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
        || e.is_partial_file()
    {
        return ErrorKind::Connection;
    }
    ErrorKind::Other
}

pub fn classify(e: &TransferError) -> ErrorKind {
    match e {
        TransferError::Curl(ce) => classify_curl_error(ce),
        TransferError::Http(code) => classify_http_status(*code),
        TransferError::PartialTransfer { .. } => ErrorKind::Connection,
        TransferError::Storage(_) => ErrorKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttling_statuses() {
        assert_eq!(classify_http_status(429), ErrorKind::Throttled);
        assert_eq!(classify_http_status(503), ErrorKind::Throttled);
    }

    #[test]
    fn server_errors_are_retryable() {
        assert_eq!(classify_http_status(502), ErrorKind::Http5xx(502));
    }

    #[test]
    fn client_errors_and_disk_failures_are_final() {
        assert_eq!(classify_http_status(403), ErrorKind::Other);
        let disk = TransferError::Storage(std::io::Error::other("disk full"));
        assert_eq!(classify(&disk), ErrorKind::Other);
    }

    #[test]
    fn short_body_is_retryable() {
        let e = TransferError::PartialTransfer {
            expected: 10,
            received: 4,
        };
        assert_eq!(classify(&e), ErrorKind::Connection);
    }
}

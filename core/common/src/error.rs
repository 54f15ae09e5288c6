//! Common error types for PackMirror.

use std::fmt;

use thiserror::Error;

/// One failed attempt against a single origin during failover.
#[derive(Debug, Clone)]
pub struct OriginFailure {
    /// Base URL of the origin that was tried.
    pub origin: String,
    /// Error message produced by the attempt.
    pub reason: String,
}

impl fmt::Display for OriginFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.origin, self.reason)
    }
}

/// Top-level error type for PackMirror operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Local filesystem read/write/create/delete failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Origin unreachable, non-success HTTP status, or stream failure
    /// mid-download.
    #[error("Network error: {0}")]
    Network(String),

    /// Malformed or missing tree/profile data from a peer.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Every configured failover origin failed.
    #[error("Policy error: all origins failed: [{}]", format_failures(.0))]
    Failover(Vec<OriginFailure>),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

fn format_failures(failures: &[OriginFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failover_error_lists_every_origin() {
        let err = Error::Failover(vec![
            OriginFailure {
                origin: "http://a".to_string(),
                reason: "connection refused".to_string(),
            },
            OriginFailure {
                origin: "http://b".to_string(),
                reason: "status 503".to_string(),
            },
        ]);

        let message = err.to_string();
        assert!(message.contains("http://a: connection refused"));
        assert!(message.contains("http://b: status 503"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}

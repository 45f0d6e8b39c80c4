//! Transport failure taxonomy for backend calls

use thiserror::Error;

/// Failures raised by the HTTP client before any backend status is known.
///
/// This is a closed set so that the error mapper can match exhaustively;
/// anything the client cannot classify lands in [`TransportError::Other`]
/// with the raw failure text preserved for the problem-detail message.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The broker host name could not be resolved
    #[error("name resolution failed: {0}")]
    NameResolutionFailed(String),

    /// The backend did not answer within the configured timeout
    #[error("request timed out")]
    TimedOut,

    /// The backend refused the connection
    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    /// Any other transport-level failure
    #[error("transport failure: {0}")]
    Other(String),
}

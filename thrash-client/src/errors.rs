//! Client error taxonomy
//!
//! The engine cares about exactly one distinction: transient connectivity
//! failures are retried immediately and never surfaced, everything else is
//! fatal to the task that hit it.

use thiserror::Error;

/// Client result type
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors raised by control-plane operations
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection-level failure (refused, reset, broken pipe, dropped
    /// stream). Retryable.
    #[error("connection error: {0}")]
    Connection(String),

    /// Request or stream timed out. Retryable.
    #[error("timeout: {0}")]
    Timeout(String),

    /// The server answered with a non-success status. Fatal.
    #[error("api error: status {status}: {message}")]
    Api { status: u16, message: String },

    /// Malformed request, response, or stream payload. Fatal.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Credential loading or parsing failure. Fatal.
    #[error("credential error: {0}")]
    Credentials(String),
}

impl ClientError {
    /// Whether this is a transient connectivity error that the retry loop
    /// swallows
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::Connection(_) | ClientError::Timeout(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout(err.to_string())
        } else if err.is_builder() {
            // A malformed URL or header can never succeed on retry.
            ClientError::Protocol(err.to_string())
        } else if err.is_connect() || err.is_request() || err.is_body() || err.is_decode() {
            // Interrupted bodies and dropped connections all count as
            // transient; the whole point of the harness is to reconnect
            // immediately.
            ClientError::Connection(err.to_string())
        } else if let Some(status) = err.status() {
            ClientError::Api {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            ClientError::Protocol(err.to_string())
        }
    }
}

use reqwest::StatusCode;

/// Boxed error type used for transport-level failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Request URL could not be parsed.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    /// A request configuration function could not be applied.
    #[error("invalid request configuration: {0}")]
    Config(String),
    /// Request body value could not be encoded.
    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),
    /// Request body could not be read before the first attempt.
    ///
    /// Fatal precondition failure: the transport is never invoked.
    #[error("failed to read request body: {0}")]
    BodyRead(#[source] std::io::Error),
    /// Request body could not be rewound between retry attempts.
    ///
    /// Aborts the retry loop immediately, superseding the transport error
    /// that triggered the retry.
    #[error("failed to rewind request body: {0}")]
    BodyRewind(#[source] std::io::Error),
    /// Response body could not be drained.
    #[error("failed to read response body: {0}")]
    ResponseRead(#[source] std::io::Error),
    /// Network or protocol error from the underlying executor.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),
    /// Response status code was outside the acceptable set.
    #[error("{0}")]
    Status(StatusError),
    /// The call's cancellation signal fired.
    #[error("request cancelled")]
    Cancelled,
}

impl Error {
    /// Wraps an arbitrary error as a transport failure.
    pub fn transport(err: impl Into<BoxError>) -> Self {
        Self::Transport(err.into())
    }
}

/// HTTP exchange that completed with an unexpected status code.
///
/// Carries the already-drained response body for diagnostics; the response
/// itself is consumed when this error is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusError {
    /// Response status code.
    pub status: StatusCode,
    /// Canonical status text, e.g. `"Not Found"`.
    pub status_text: String,
    /// Drained response body bytes.
    pub body: Vec<u8>,
}

impl std::fmt::Display for StatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.status_text)
    }
}

impl std::error::Error for StatusError {}

//! Error types for the webhook forwarder.

use thiserror::Error;

/// Failure of a single delivery attempt sequence.
///
/// Serialization, request construction and cancellation end the sequence
/// immediately. Transport and status failures consume one attempt and are
/// retried until the retry budget runs out.
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// The batch could not be marshaled to a JSON array.
    #[error("marshal: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The outbound request could not be built (bad URL, bad scheme).
    #[error("new HTTP request: {0}")]
    RequestConstruction(String),

    /// Connection-level failure reaching the endpoint.
    #[error("http client request: {0}")]
    Transport(String),

    /// The endpoint answered outside [200,300).
    #[error("unexpected status code from post request got:{0} want:status code in [200,300)")]
    UnexpectedStatus(u16),

    /// The cancellation token fired before the sequence finished.
    #[error("delivery cancelled")]
    Cancelled,
}

impl DeliveryError {
    /// Whether another attempt may succeed where this one failed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::UnexpectedStatus(_))
    }
}

/// Crate-level error type. Terminal per-batch failures travel on the error
/// sink as `RetriesExhausted` or `Cancelled`.
#[derive(Error, Debug)]
pub enum ForwarderError {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client construction error
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed input record
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A batch could not be delivered.
    #[error("forward with retries exhausted: {source}")]
    RetriesExhausted {
        /// Last HTTP status observed, 0 if none.
        status: u16,
        /// Number of records in the failed batch.
        batch_size: usize,
        #[source]
        source: DeliveryError,
    },

    /// Delivery of a batch was abandoned because of cancellation.
    #[error("delivery cancelled with {batch_size} records undelivered")]
    Cancelled { batch_size: usize },

    /// The stdin reader thread could not be started.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The accumulator task panicked or was aborted.
    #[error("Accumulator task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result type for forwarder operations.
pub type ForwarderResult<T> = Result<T, ForwarderError>;

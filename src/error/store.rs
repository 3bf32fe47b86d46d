//! Ephemeral store error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Error returned by the Redis/Valkey client (connection, protocol, script).
    #[error(transparent)]
    Redis(#[from] fred::error::Error),
    /// Key holds a value of a different type than the operation expects.
    #[error("Key {0:?} holds a value of the wrong type")]
    WrongType(String),
    /// A single command inside a batch failed.
    #[error("Batch command {index} failed: {reason}")]
    BatchCommand { index: usize, reason: String },
}

impl StoreError {
    /// Whether the error is worth retrying: connectivity, timeouts, cancellation.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Redis(err) => matches!(
                err.kind(),
                fred::error::ErrorKind::IO
                    | fred::error::ErrorKind::Timeout
                    | fred::error::ErrorKind::Canceled
                    | fred::error::ErrorKind::Backpressure
            ),
            Self::WrongType(_) => false,
            Self::BatchCommand { .. } => false,
        }
    }
}

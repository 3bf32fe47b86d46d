//! Error types for the tandem account core.
//!
//! Each domain (authentication, validation, pairing, configuration, stores, ID generation)
//! has its own `thiserror` enum, aggregated into the single [`Error`] type returned by every
//! service. [`Error::kind`] maps any error onto the taxonomy callers branch on, while
//! [`Error::to_retry_strategy`](retry) decides whether an operation may be retried.

pub mod auth;
pub mod config;
pub mod id;
pub mod pairing;
pub mod retry;
pub mod store;
pub mod validation;

use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

use crate::error::{
    auth::AuthError, config::ConfigError, id::IdError, pairing::PairingError, store::StoreError,
    validation::ValidationError,
};

/// Main error type for the tandem account core.
///
/// Domain errors convert automatically through `#[from]`, so services can use `?` against
/// repositories, stores and the ID source alike.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (missing or invalid environment variables).
    #[error(transparent)]
    ConfigError(#[from] ConfigError),
    /// Authentication error (credentials, username reservation, identity provider).
    #[error(transparent)]
    AuthError(#[from] AuthError),
    /// Input rejected before reaching any store.
    #[error(transparent)]
    ValidationError(#[from] ValidationError),
    /// Pairing ticket error.
    #[error(transparent)]
    PairingError(#[from] PairingError),
    /// Ephemeral store error (Redis/Valkey or in-process store).
    #[error(transparent)]
    StoreError(#[from] StoreError),
    /// ID source error.
    #[error(transparent)]
    IdError(#[from] IdError),
    /// A lookup against the relational store found nothing.
    #[error("{0} not found")]
    NotFound(String),
    /// Writes are refused while the service runs in maintenance mode.
    #[error("Service is in maintenance mode, writes are disabled")]
    MaintenanceMode,
    /// Parse error (failed to parse a value from string or other format).
    #[error("Failed to parse value: {0:?}")]
    ParseError(String),
    /// Internal error indicating a bug or corrupted state.
    #[error("Internal error, this indicates a bug or corrupted state: {0:?}")]
    InternalError(String),
    /// Database error (query failures, connection issues, constraint violations).
    #[error(transparent)]
    DbErr(#[from] DbErr),
    /// Outbound HTTP error (identity provider).
    #[error(transparent)]
    HttpError(#[from] reqwest::Error),
}

impl From<fred::error::Error> for Error {
    fn from(err: fred::error::Error) -> Self {
        Self::StoreError(StoreError::Redis(err))
    }
}

/// Coarse error taxonomy shared by every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    UniqueConflict,
    InvalidInput,
    InvalidCredentials,
    SubscriptionExpired,
    SubscriptionGrace,
    Transient,
    Fatal,
}

impl Error {
    /// Maps the error onto the shared taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AuthError(err) => match err {
                AuthError::InvalidCredentials => ErrorKind::InvalidCredentials,
                AuthError::UsernameTaken(_) | AuthError::AccountConflict { .. } => {
                    ErrorKind::UniqueConflict
                }
                AuthError::SubscriptionExpired { .. } => ErrorKind::SubscriptionExpired,
                AuthError::SubscriptionGrace { .. } => ErrorKind::SubscriptionGrace,
                AuthError::TokenExchange(_) => ErrorKind::Transient,
            },
            Self::ValidationError(ValidationError::DeviceNameTaken(_)) => {
                ErrorKind::UniqueConflict
            }
            Self::ValidationError(_) => ErrorKind::InvalidInput,
            Self::PairingError(PairingError::Collision) => ErrorKind::UniqueConflict,
            Self::MaintenanceMode => ErrorKind::Transient,
            Self::DbErr(DbErr::RecordNotFound(_)) => ErrorKind::NotFound,
            Self::DbErr(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                ErrorKind::UniqueConflict
            }
            err => match err.to_retry_strategy() {
                retry::ErrorRetryStrategy::Retry => ErrorKind::Transient,
                retry::ErrorRetryStrategy::Fail => ErrorKind::Fatal,
            },
        }
    }
}

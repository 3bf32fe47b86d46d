use sea_orm::DbErr;

use super::{id::IdError, Error};

/// Strategy for handling errors in a retry context
pub enum ErrorRetryStrategy {
    /// Retry with exponential backoff (transient failures)
    Retry,
    /// Failed permanently
    Fail,
}

impl Error {
    /// Determine error retry strategy based upon application Error type
    pub fn to_retry_strategy(&self) -> ErrorRetryStrategy {
        match self {
            Self::DbErr(db_err) => match db_err {
                // Connection acquisition errors - pool exhausted or timed out, should retry
                DbErr::ConnectionAcquire(_) => ErrorRetryStrategy::Retry,
                // Connection errors - transient, should retry
                DbErr::Conn(_) => ErrorRetryStrategy::Retry,

                // Query errors, constraint violations, type conversion and missing records
                // won't resolve with a retry
                _ => ErrorRetryStrategy::Fail,
            },

            Self::StoreError(store_err) => {
                if store_err.is_transient() {
                    ErrorRetryStrategy::Retry
                } else {
                    ErrorRetryStrategy::Fail
                }
            }

            Self::IdError(IdError::Remote(reqwest_error)) => match reqwest_error.status() {
                // 5xx - generator temporarily unavailable
                Some(status) if status.is_server_error() => ErrorRetryStrategy::Retry,
                // 4xx - bad token or request, a configuration problem
                Some(_) => ErrorRetryStrategy::Fail,
                // Network error or connection issue
                None => ErrorRetryStrategy::Retry,
            },
            Self::IdError(IdError::SystemClock) => ErrorRetryStrategy::Retry,
            Self::IdError(IdError::InvalidResponse(_)) => ErrorRetryStrategy::Fail,

            Self::HttpError(reqwest_error) => match reqwest_error.status() {
                Some(status) if status.is_server_error() => ErrorRetryStrategy::Retry,
                Some(_) => ErrorRetryStrategy::Fail,
                None => ErrorRetryStrategy::Retry,
            },

            // Maintenance ends eventually, the caller decides when to come back
            Self::MaintenanceMode => ErrorRetryStrategy::Retry,

            Self::ConfigError(_) => ErrorRetryStrategy::Fail,
            Self::AuthError(_) => ErrorRetryStrategy::Fail,
            Self::ValidationError(_) => ErrorRetryStrategy::Fail,
            Self::PairingError(_) => ErrorRetryStrategy::Fail,
            Self::NotFound(_) => ErrorRetryStrategy::Fail,
            Self::ParseError(_) => ErrorRetryStrategy::Fail,
            Self::InternalError(_) => ErrorRetryStrategy::Fail,
        }
    }
}

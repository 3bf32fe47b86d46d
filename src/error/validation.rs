//! Input validation errors.
//!
//! Every variant maps to [`ErrorKind::InvalidInput`](super::ErrorKind::InvalidInput) except
//! [`ValidationError::DeviceNameTaken`], which is a uniqueness conflict on a reservation.

use thiserror::Error;

use crate::model::payment::PaymentStatus;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error(
        "Invalid username {0:?}: must be 3 to 20 characters of letters, digits, '_' or '-'"
    )]
    InvalidUsername(String),
    #[error("Email address is required")]
    MissingEmail,
    #[error("Campaign goal must not be negative, got {0}")]
    NegativeGoal(i64),
    #[error("Campaign title must not be empty")]
    EmptyTitle,
    #[error("Campaign description must not be empty")]
    EmptyDescription,
    #[error("Amount must not be negative, got {0}")]
    NegativeAmount(i64),
    #[error("Subscription extension must not be negative, got {0} days")]
    NegativeExtension(i64),
    #[error("Invalid payment status {0:?}")]
    InvalidPaymentStatus(String),
    #[error("Invalid payment status transition from {from} to {to}")]
    InvalidStatus {
        from: PaymentStatus,
        to: PaymentStatus,
    },
    #[error("Invalid client type {0:?}")]
    InvalidClientType(String),
    #[error("Invalid device name {0:?}: must be 1 to 64 characters")]
    InvalidDeviceName(String),
    #[error("Device name {0:?} is already in use")]
    DeviceNameTaken(String),
}

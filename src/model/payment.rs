use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{error::validation::ValidationError, model::id::Id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Charging,
    Success,
    Error,
    Retry,
    Refunding,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Charging => "charging",
            Self::Success => "success",
            Self::Error => "error",
            Self::Retry => "retry",
            Self::Refunding => "refunding",
            Self::Refunded => "refunded",
        }
    }

    /// Whether `next` may follow this status.
    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;

        matches!(
            (self, next),
            (Pending, Charging)
                | (Charging, Success)
                | (Charging, Error)
                | (Charging, Retry)
                | (Retry, Charging)
                | (Success, Refunding)
                | (Refunding, Refunded)
        )
    }

    /// Statuses at which the payment carries a completion time.
    pub fn is_completed(self) -> bool {
        matches!(self, Self::Success | Self::Error | Self::Refunded)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "charging" => Ok(Self::Charging),
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            "retry" => Ok(Self::Retry),
            "refunding" => Ok(Self::Refunding),
            "refunded" => Ok(Self::Refunded),
            other => Err(ValidationError::InvalidPaymentStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewPayment {
    /// Amount in cents.
    pub amount: i64,
    pub message: Option<String>,
    pub campaign: Id,
    pub funding_source_id: Option<String>,
    pub anonymous: bool,
}

/// Filter for payment listings. Empty filters match everything.
#[derive(Debug, Clone, Default)]
pub struct PaymentFilter {
    pub user: Option<Id>,
    pub campaign: Option<Id>,
    /// Any of these statuses; empty matches every status.
    pub statuses: Vec<PaymentStatus>,
}

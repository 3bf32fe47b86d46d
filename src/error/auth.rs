use chrono::NaiveDateTime;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    /// Wrong secret, unknown user, wrong email code or unknown pairing ticket.
    ///
    /// Deliberately carries no detail so callers cannot tell which case occurred.
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Username {0:?} is already taken")]
    UsernameTaken(String),
    #[error("Account for provider {provider:?} with foreign ID {foreign_id:?} already exists")]
    AccountConflict {
        provider: String,
        foreign_id: String,
    },
    #[error("Subscription expired at {expires}")]
    SubscriptionExpired { expires: NaiveDateTime },
    #[error("Subscription expired at {expires} and is within the grace period")]
    SubscriptionGrace { expires: NaiveDateTime },
    #[error("Failed to exchange authorization code with identity provider: {0}")]
    TokenExchange(String),
}

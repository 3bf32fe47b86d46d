use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    error::{auth::AuthError, Error},
    model::{db::UserModel, id::Id},
};

/// Input for registering a user.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub given_name: String,
    pub family_name: String,
    /// Whether the email still needs to be confirmed with the emailed code.
    pub email_unconfirmed: bool,
    pub is_admin: bool,
}

/// Partial update of a user's profile; `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
}

/// Subscription standing reported alongside a successful authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Ok,
    /// Subscription lapsed but is still inside the grace period.
    GraceWarning { expires: NaiveDateTime },
    /// Subscription lapsed and the grace period is over.
    Expired { expires: NaiveDateTime },
}

impl SubscriptionStatus {
    /// Converts a lapsed standing into the matching error, for operations that require an
    /// active subscription.
    pub fn into_result(self) -> Result<(), AuthError> {
        match self {
            Self::Ok => Ok(()),
            Self::GraceWarning { expires } => Err(AuthError::SubscriptionGrace { expires }),
            Self::Expired { expires } => Err(AuthError::SubscriptionExpired { expires }),
        }
    }
}

/// A freshly registered user together with its one-time visible credentials.
#[derive(Clone)]
pub struct RegisteredUser {
    pub user: UserModel,
    /// Hex secret, the only credential the user signs in with.
    pub secret: String,
}

impl std::fmt::Debug for RegisteredUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredUser")
            .field("user", &self.user)
            .field("secret", &"[redacted]")
            .finish()
    }
}

/// User as exposed outside the service, without secret or email code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDto {
    pub id: Id,
    pub username: String,
    pub email: String,
    pub email_unconfirmed: bool,
    pub given_name: String,
    pub family_name: String,
    pub joined: NaiveDateTime,
    pub last_active: NaiveDateTime,
    pub is_admin: bool,
}

impl From<&UserModel> for UserDto {
    fn from(user: &UserModel) -> Self {
        Self {
            id: Id::from(user.id),
            username: user.username.clone(),
            email: user.email.clone(),
            email_unconfirmed: user.email_unconfirmed,
            given_name: user.given_name.clone(),
            family_name: user.family_name.clone(),
            joined: user.joined,
            last_active: user.last_active,
            is_admin: user.is_admin,
        }
    }
}

impl UserDto {
    /// Hash fields of the cached record, each value encoded as JSON.
    pub fn to_fields(&self) -> Result<Vec<(String, String)>, Error> {
        let Value::Object(record) = serde_json::to_value(self).map_err(parse_error)? else {
            return Err(Error::InternalError(format!("User {} is not a record", self.id)));
        };

        record
            .into_iter()
            .map(|(field, value)| {
                serde_json::to_string(&value)
                    .map(|value| (field, value))
                    .map_err(parse_error)
            })
            .collect()
    }

    /// Rebuilds a user from the fields written by [`UserDto::to_fields`].
    pub fn from_fields(fields: HashMap<String, String>) -> Result<Self, Error> {
        let record = fields
            .into_iter()
            .map(|(field, value)| {
                serde_json::from_str::<Value>(&value)
                    .map(|value| (field, value))
                    .map_err(parse_error)
            })
            .collect::<Result<Map<String, Value>, Error>>()?;

        serde_json::from_value(Value::Object(record)).map_err(parse_error)
    }
}

fn parse_error(e: serde_json::Error) -> Error {
    Error::ParseError(format!("cached user record: {e}"))
}

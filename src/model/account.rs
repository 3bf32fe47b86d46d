use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::model::{
    db::{AccountModel, UserModel},
    id::Id,
};

pub const GOOGLE_PROVIDER: &str = "google";

/// Profile returned by the identity provider's userinfo endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderProfile {
    /// Stable subject identifier, stored as the account's foreign ID.
    pub sub: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub family_name: String,
    #[serde(default)]
    pub picture: String,
    #[serde(default)]
    pub locale: String,
    #[serde(default)]
    pub zoneinfo: String,
    #[serde(default)]
    pub gender: String,
}

/// Tokens obtained from the identity provider.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProviderTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires: Option<NaiveDateTime>,
}

impl ProviderTokens {
    /// Drops empty tokens so they are stored as SQL NULL.
    pub fn normalized(self) -> Self {
        Self {
            access_token: self.access_token.filter(|t| !t.is_empty()),
            refresh_token: self.refresh_token.filter(|t| !t.is_empty()),
            expires: self.expires,
        }
    }
}

impl std::fmt::Debug for ProviderTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderTokens")
            .field("access_token", &self.access_token.as_ref().map(|_| "[redacted]"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[redacted]"))
            .field("expires", &self.expires)
            .finish()
    }
}

/// Result of signing in through an identity provider.
#[derive(Clone)]
pub struct SignIn {
    pub user: UserModel,
    pub account: AccountModel,
    /// Secret of a user registered by this sign-in; `None` for returning users.
    pub secret: Option<String>,
}

impl std::fmt::Debug for SignIn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignIn")
            .field("user", &self.user)
            .field("account", &self.account)
            .field("secret", &self.secret.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

/// Account as exposed outside the service, without provider tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDto {
    pub id: Id,
    pub provider: String,
    pub foreign_id: String,
    pub added: NaiveDateTime,
    pub email: String,
    pub email_verified: bool,
    pub display_name: String,
    pub given_name: String,
    pub family_name: String,
    pub picture: String,
    pub locale: String,
    pub timezone: String,
    pub gender: String,
    pub user_id: Id,
}

impl From<&AccountModel> for AccountDto {
    fn from(account: &AccountModel) -> Self {
        Self {
            id: Id::from(account.id),
            provider: account.provider.clone(),
            foreign_id: account.foreign_id.clone(),
            added: account.added,
            email: account.email.clone(),
            email_verified: account.email_verified,
            display_name: account.display_name.clone(),
            given_name: account.given_name.clone(),
            family_name: account.family_name.clone(),
            picture: account.picture.clone(),
            locale: account.locale.clone(),
            timezone: account.timezone.clone(),
            gender: account.gender.clone(),
            user_id: Id::from(account.user_id),
        }
    }
}

//! Identity provider accounts linked to users.
//!
//! Signing in with a provider profile either refreshes the account already bound to the
//! profile's subject or registers a new user and links a fresh account to it.

use sea_orm::{ActiveValue, SqlErr};

use crate::{
    audit::{entity_key, AuditDelta},
    data::{account::AccountRepository, user::UserRepository},
    error::{auth::AuthError, Error},
    model::{
        account::{AccountDto, ProviderProfile, ProviderTokens, SignIn, GOOGLE_PROVIDER},
        context::RequestContext,
        db::AccountModel,
        id::Id,
        user::{NewUser, RegisteredUser},
    },
    service::user::UserService,
    util::{
        crypto, time,
        validation::{USERNAME_MAX_LEN, USERNAME_MIN_LEN},
    },
};

/// Sequential suffixes tried before falling back to a random one.
const USERNAME_ATTEMPTS: u32 = 10;
const RANDOM_SUFFIX_LEN: usize = 6;

/// Derives a candidate username from the local part of `email`.
///
/// Attempt 0 is the bare local part; later attempts append `attempt + 1`. The result always
/// passes username validation.
pub fn derive_username(email: &str, attempt: u32) -> String {
    let suffix = match attempt {
        0 => String::new(),
        n => (n + 1).to_string(),
    };
    candidate(email, &suffix)
}

fn candidate(email: &str, suffix: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let mut base: String = local
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();

    if base.is_empty() {
        base.push_str("user");
    }
    while base.len() + suffix.len() < USERNAME_MIN_LEN {
        base.push('_');
    }
    base.truncate(USERNAME_MAX_LEN - suffix.len());

    base + suffix
}

pub struct AccountService<'a> {
    ctx: &'a RequestContext,
}

impl<'a> AccountService<'a> {
    pub fn new(ctx: &'a RequestContext) -> Self {
        Self { ctx }
    }

    /// Signs in with a Google profile and the tokens obtained for it.
    ///
    /// # Returns
    /// - `Ok(SignIn)` - User and account, with the secret when a user was registered
    /// - `Err(Error::AuthError(AuthError::InvalidCredentials))` - Profile has no subject
    /// - `Err(Error::AuthError(AuthError::AccountConflict))` - A concurrent sign-in linked the
    ///   same subject first
    pub async fn sign_in(
        &self,
        profile: ProviderProfile,
        tokens: ProviderTokens,
    ) -> Result<SignIn, Error> {
        self.ctx.ensure_writable()?;
        if profile.sub.is_empty() {
            return Err(AuthError::InvalidCredentials.into());
        }

        let tokens = tokens.normalized();
        let existing = AccountRepository::new(self.ctx.db())
            .get_by_foreign_id(GOOGLE_PROVIDER, &profile.sub)
            .await?;

        match existing {
            Some(account) => self.refresh(account, profile, tokens).await,
            None => self.link_new_user(profile, tokens).await,
        }
    }

    /// Accounts linked to `user_id`, oldest first.
    pub async fn list_for_user(&self, user_id: Id) -> Result<Vec<AccountDto>, Error> {
        let accounts = AccountRepository::new(self.ctx.db())
            .list_for_user(user_id)
            .await?;
        Ok(accounts.iter().map(AccountDto::from).collect())
    }

    /// Removes the link to a provider account.
    ///
    /// # Returns
    /// - `Ok(true)` - Account was unlinked
    /// - `Ok(false)` - Account did not exist
    pub async fn unlink(&self, account_id: Id) -> Result<bool, Error> {
        self.ctx.ensure_writable()?;
        let repository = AccountRepository::new(self.ctx.db());
        let Some(account) = repository.get(account_id).await? else {
            return Ok(false);
        };

        let result = repository.delete(account_id).await?;
        if result.rows_affected == 0 {
            return Ok(false);
        }

        let mut delta = AuditDelta::new(entity_key("accounts", account_id));
        delta
            .deleted("provider", &account.provider)
            .deleted("foreign_id", &account.foreign_id)
            .deleted("user_id", &Id::from(account.user_id));
        self.ctx.audit().record(delta).await;

        Ok(true)
    }

    async fn refresh(
        &self,
        current: AccountModel,
        profile: ProviderProfile,
        tokens: ProviderTokens,
    ) -> Result<SignIn, Error> {
        let account_id = Id::from(current.id);

        // Providers only hand out a refresh token on the first consent
        let refresh_token = tokens.refresh_token.or_else(|| current.refresh_token.clone());
        let (access_token, token_expires) = match tokens.access_token {
            Some(access_token) => (Some(access_token), tokens.expires),
            None => (current.access_token.clone(), current.token_expires),
        };

        let changes = entity::account::ActiveModel {
            email: ActiveValue::Set(profile.email),
            email_verified: ActiveValue::Set(profile.email_verified),
            display_name: ActiveValue::Set(profile.name),
            given_name: ActiveValue::Set(profile.given_name),
            family_name: ActiveValue::Set(profile.family_name),
            picture: ActiveValue::Set(profile.picture),
            locale: ActiveValue::Set(profile.locale),
            timezone: ActiveValue::Set(profile.zoneinfo),
            gender: ActiveValue::Set(profile.gender),
            access_token: ActiveValue::Set(access_token),
            refresh_token: ActiveValue::Set(refresh_token),
            token_expires: ActiveValue::Set(token_expires),
            ..Default::default()
        };

        let updated = AccountRepository::new(self.ctx.db())
            .partial_update(account_id, changes)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Account {account_id}")))?;

        let mut delta = AuditDelta::new(entity_key("accounts", account_id));
        delta
            .change("email", &current.email, &updated.email)
            .change("email_verified", &current.email_verified, &updated.email_verified)
            .change("display_name", &current.display_name, &updated.display_name)
            .change("given_name", &current.given_name, &updated.given_name)
            .change("family_name", &current.family_name, &updated.family_name)
            .change("picture", &current.picture, &updated.picture)
            .change("locale", &current.locale, &updated.locale)
            .change("timezone", &current.timezone, &updated.timezone)
            .change("gender", &current.gender, &updated.gender)
            .change("token_expires", &current.token_expires, &updated.token_expires);
        if current.access_token != updated.access_token {
            delta.secret(
                "access_token",
                current.access_token.is_some(),
                updated.access_token.is_some(),
            );
        }
        if current.refresh_token != updated.refresh_token {
            delta.secret(
                "refresh_token",
                current.refresh_token.is_some(),
                updated.refresh_token.is_some(),
            );
        }
        self.ctx.audit().record(delta).await;

        let user = UserRepository::new(self.ctx.db())
            .get(Id::from(updated.user_id))
            .await?
            .ok_or_else(|| {
                Error::InternalError(format!(
                    "Account {} belongs to missing user {}",
                    updated.id, updated.user_id
                ))
            })?;

        Ok(SignIn {
            user,
            account: updated,
            secret: None,
        })
    }

    async fn link_new_user(
        &self,
        profile: ProviderProfile,
        tokens: ProviderTokens,
    ) -> Result<SignIn, Error> {
        let user_service = UserService::new(self.ctx);
        let registered = self.register_with_derived_username(&profile).await?;
        let user_id = Id::from(registered.user.id);

        let account_id = self.ctx.ids().next().await?;
        let account = AccountModel {
            id: i64::from(account_id),
            provider: GOOGLE_PROVIDER.to_string(),
            foreign_id: profile.sub,
            added: time::now(),
            email: profile.email,
            email_verified: profile.email_verified,
            display_name: profile.name,
            given_name: profile.given_name,
            family_name: profile.family_name,
            picture: profile.picture,
            locale: profile.locale,
            timezone: profile.zoneinfo,
            gender: profile.gender,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            token_expires: tokens.expires,
            user_id: registered.user.id,
        };

        let account = match AccountRepository::new(self.ctx.db()).create(account.clone()).await {
            Ok(account) => account,
            Err(e) => {
                if let Err(cleanup) = user_service.delete_user(user_id).await {
                    tracing::warn!(
                        "Failed to remove user {} after failed account link: {}",
                        user_id,
                        cleanup
                    );
                }
                if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                    return Err(AuthError::AccountConflict {
                        provider: account.provider,
                        foreign_id: account.foreign_id,
                    }
                    .into());
                }
                return Err(e.into());
            }
        };

        let mut delta = AuditDelta::new(entity_key("accounts", account_id));
        delta
            .created("provider", &account.provider)
            .created("foreign_id", &account.foreign_id)
            .created("email", &account.email)
            .created("user_id", &user_id)
            .secret("access_token", false, account.access_token.is_some())
            .secret("refresh_token", false, account.refresh_token.is_some());
        self.ctx.audit().record(delta).await;

        tracing::info!("Linked {} account to new user {}", account.provider, user_id);

        Ok(SignIn {
            user: registered.user,
            account,
            secret: Some(registered.secret),
        })
    }

    async fn register_with_derived_username(
        &self,
        profile: &ProviderProfile,
    ) -> Result<RegisteredUser, Error> {
        let user_service = UserService::new(self.ctx);
        let new_user = |username: String| NewUser {
            username,
            email: profile.email.clone(),
            given_name: profile.given_name.clone(),
            family_name: profile.family_name.clone(),
            email_unconfirmed: !profile.email_verified,
            is_admin: false,
        };

        for attempt in 0..USERNAME_ATTEMPTS {
            let username = derive_username(&profile.email, attempt);
            match user_service.register(new_user(username)).await {
                Err(Error::AuthError(AuthError::UsernameTaken(_))) => continue,
                result => return result,
            }
        }

        let suffix = crypto::random_string(b"0123456789", RANDOM_SUFFIX_LEN);
        user_service
            .register(new_user(candidate(&profile.email, &suffix)))
            .await
    }
}

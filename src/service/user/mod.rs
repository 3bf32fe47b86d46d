//! User service layer.
//!
//! Registration, secret-based authentication and profile maintenance. Usernames are unique
//! case-insensitively through a reservation in the ephemeral store, taken before any row is
//! written and released again if the registration fails afterwards.
//!
//! The public part of each user record is kept in the `users:{id}` hash of the ephemeral
//! store. Every write rewrites it and [`UserService::get_user`] reads through it.

#[cfg(test)]
mod tests;

use chrono::{Duration, NaiveDateTime};
use sea_orm::{ActiveValue, TransactionTrait};

use crate::{
    audit::{entity_key, AuditDelta},
    data::{
        account::AccountRepository, device::DeviceRepository,
        subscription::SubscriptionRepository, user::UserRepository,
    },
    error::{auth::AuthError, Error},
    model::{
        context::RequestContext,
        db::UserModel,
        id::Id,
        user::{NewUser, RegisteredUser, SubscriptionStatus, UserDto, UserUpdate},
    },
    service::{pairing::PairingService, subscription::SubscriptionService},
    store::{first_failure, keys, Command, SortOrder},
    util::{crypto, time, validation},
};

/// Service for managing user accounts.
pub struct UserService<'a> {
    ctx: &'a RequestContext,
}

impl<'a> UserService<'a> {
    /// Creates a new instance of UserService.
    ///
    /// # Arguments
    /// - `ctx` - Request the operations run on behalf of
    pub fn new(ctx: &'a RequestContext) -> Self {
        Self { ctx }
    }

    /// Authenticates a user by username and secret.
    ///
    /// Unknown usernames are compared against a placeholder secret of the same length so both
    /// failure paths do the same work and return the same error. On success the user's
    /// activity is refreshed unless the service is in maintenance mode.
    ///
    /// # Returns
    /// - `Ok((UserModel, SubscriptionStatus))` - Authenticated user and its standing
    /// - `Err(Error::AuthError(AuthError::InvalidCredentials))` - Unknown user or wrong secret
    pub async fn authenticate(
        &self,
        username: &str,
        secret: &str,
    ) -> Result<(UserModel, SubscriptionStatus), Error> {
        let user = UserRepository::new(self.ctx.db())
            .get_by_username(username)
            .await?;

        let placeholder = "0".repeat(crypto::SECRET_BYTES * 2);
        let expected = user.as_ref().map_or(placeholder.as_str(), |u| u.secret.as_str());
        let matches = crypto::constant_time_eq(expected, secret);

        let user = match user {
            Some(user) if matches => user,
            _ => {
                self.ctx.telemetry().record_auth_failure();
                tracing::debug!("Authentication failed from {}", self.ctx.ip());
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        let status = SubscriptionService::new(self.ctx).status_for(&user).await?;
        let user = self.touch(user).await?;

        Ok((user, status))
    }

    /// Registers a user with a fresh secret, email code and trial subscription.
    ///
    /// # Returns
    /// - `Ok(RegisteredUser)` - Created user with its secret
    /// - `Err(Error::ValidationError)` - Invalid username or missing email
    /// - `Err(Error::AuthError(AuthError::UsernameTaken))` - Username reserved by another user
    /// - `Err(Error::MaintenanceMode)` - Writes are disabled
    pub async fn register(&self, new_user: NewUser) -> Result<RegisteredUser, Error> {
        self.ctx.ensure_writable()?;
        validation::validate_username(&new_user.username)?;
        validation::validate_email(&new_user.email)?;

        let user_id = self.ctx.ids().next().await?;
        let subscription_id = self.ctx.ids().next().await?;
        let secret = crypto::random_hex(crypto::SECRET_BYTES);
        let email_code = crypto::random_hex(crypto::EMAIL_CODE_BYTES);

        self.reserve_username(&new_user.username, user_id).await?;

        let now = time::now();
        let user = UserModel {
            id: i64::from(user_id),
            username: new_user.username,
            email: new_user.email,
            email_unconfirmed: new_user.email_unconfirmed,
            email_code,
            secret: secret.clone(),
            joined: now,
            given_name: new_user.given_name,
            family_name: new_user.family_name,
            last_active: now,
            is_admin: new_user.is_admin,
            subscription_id: i64::from(subscription_id),
        };
        let expires = now + Duration::days(self.ctx.config().trial_period_days);

        let user = match self.persist_registration(user.clone(), expires).await {
            Ok(user) => user,
            Err(e) => {
                self.release_username(&user.username, user_id).await;
                return Err(e);
            }
        };

        if let Err(e) = self.index_registration(&user, expires).await {
            self.discard_registration(&user).await;
            return Err(e);
        }

        let mut delta = AuditDelta::new(entity_key("users", user_id));
        delta
            .created("username", &user.username)
            .created("email", &user.email)
            .created("email_unconfirmed", &user.email_unconfirmed)
            .created("given_name", &user.given_name)
            .created("family_name", &user.family_name)
            .created("joined", &user.joined)
            .created("is_admin", &user.is_admin)
            .created("subscription_id", &subscription_id)
            .secret("secret", false, true)
            .secret("email_code", false, true);
        self.ctx.audit().record(delta).await;

        let mut delta = AuditDelta::new(entity_key("subscriptions", subscription_id));
        delta.created("expires", &expires);
        self.ctx.audit().record(delta).await;

        tracing::info!("Registered user {} ({})", user.username, user_id);

        Ok(RegisteredUser { user, secret })
    }

    /// Applies a partial profile update and audits the fields that changed.
    ///
    /// A username change moves the reservation; the old name is released only once the
    /// new one is written.
    pub async fn update_user(&self, user_id: Id, update: UserUpdate) -> Result<UserModel, Error> {
        self.ctx.ensure_writable()?;
        let current = self.require(user_id).await?;

        if let Some(username) = &update.username {
            validation::validate_username(username)?;
        }
        if let Some(email) = &update.email {
            validation::validate_email(email)?;
        }

        let mut changes = entity::user::ActiveModel::default();
        let mut moved_reservation = false;

        if let Some(username) = update.username.filter(|u| *u != current.username) {
            if username.to_lowercase() != current.username.to_lowercase() {
                self.reserve_username(&username, user_id).await?;
                moved_reservation = true;
            }
            changes.username = ActiveValue::Set(username);
        }
        if let Some(email) = update.email.filter(|e| *e != current.email) {
            changes.email = ActiveValue::Set(email);
        }
        if let Some(given_name) = update.given_name.filter(|n| *n != current.given_name) {
            changes.given_name = ActiveValue::Set(given_name);
        }
        if let Some(family_name) = update.family_name.filter(|n| *n != current.family_name) {
            changes.family_name = ActiveValue::Set(family_name);
        }

        let new_username = match &changes.username {
            ActiveValue::Set(username) => Some(username.clone()),
            _ => None,
        };

        let updated = match self.apply(user_id, changes).await {
            Ok(updated) => updated,
            Err(e) => {
                if let (true, Some(username)) = (moved_reservation, &new_username) {
                    self.release_username(username, user_id).await;
                }
                return Err(e);
            }
        };

        if moved_reservation {
            self.release_username(&current.username, user_id).await;
        }
        self.cache_user(&updated).await?;

        let mut delta = AuditDelta::new(entity_key("users", user_id));
        delta
            .change("username", &current.username, &updated.username)
            .change("email", &current.email, &updated.email)
            .change("given_name", &current.given_name, &updated.given_name)
            .change("family_name", &current.family_name, &updated.family_name);
        self.ctx.audit().record(delta).await;

        Ok(updated)
    }

    /// Replaces the user's secret, returning the new one.
    pub async fn reset_secret(&self, user_id: Id) -> Result<String, Error> {
        self.ctx.ensure_writable()?;
        self.require(user_id).await?;

        let secret = crypto::random_hex(crypto::SECRET_BYTES);
        self.apply(
            user_id,
            entity::user::ActiveModel {
                secret: ActiveValue::Set(secret.clone()),
                ..Default::default()
            },
        )
        .await?;

        let mut delta = AuditDelta::new(entity_key("users", user_id));
        delta.secret("secret", true, true);
        self.ctx.audit().record(delta).await;

        Ok(secret)
    }

    /// Confirms the user's email address with the code sent to it.
    ///
    /// # Returns
    /// - `Ok(UserModel)` - User with a confirmed email
    /// - `Err(Error::AuthError(AuthError::InvalidCredentials))` - Code does not match
    pub async fn verify_email(&self, user_id: Id, code: &str) -> Result<UserModel, Error> {
        self.ctx.ensure_writable()?;
        let current = self.require(user_id).await?;

        if !crypto::constant_time_eq(&current.email_code, code) {
            self.ctx.telemetry().record_auth_failure();
            return Err(AuthError::InvalidCredentials.into());
        }

        let updated = self
            .apply(
                user_id,
                entity::user::ActiveModel {
                    email_unconfirmed: ActiveValue::Set(false),
                    ..Default::default()
                },
            )
            .await?;
        self.cache_user(&updated).await?;

        let mut delta = AuditDelta::new(entity_key("users", user_id));
        delta.change(
            "email_unconfirmed",
            &current.email_unconfirmed,
            &updated.email_unconfirmed,
        );
        self.ctx.audit().record(delta).await;

        Ok(updated)
    }

    pub async fn make_admin(&self, user_id: Id) -> Result<UserModel, Error> {
        self.set_admin(user_id, true).await
    }

    pub async fn strip_admin(&self, user_id: Id) -> Result<UserModel, Error> {
        self.set_admin(user_id, false).await
    }

    /// Looks a user up in the record cache, falling back to the database.
    ///
    /// A user found only in the database is written back to the cache.
    pub async fn get_user(&self, user_id: Id) -> Result<Option<UserDto>, Error> {
        let fields = self.ctx.cache().hash_get_all(&keys::user(user_id)).await?;
        if !fields.is_empty() {
            match UserDto::from_fields(fields) {
                Ok(user) => return Ok(Some(user)),
                Err(e) => tracing::warn!("Ignoring cached record of user {}: {}", user_id, e),
            }
        }

        let Some(user) = UserRepository::new(self.ctx.db()).get(user_id).await? else {
            return Ok(None);
        };
        self.cache_user(&user).await?;

        Ok(Some(UserDto::from(&user)))
    }

    /// Finds a user by username, ignoring case.
    pub async fn get_by_username(&self, username: &str) -> Result<Option<UserDto>, Error> {
        let user = UserRepository::new(self.ctx.db())
            .get_by_username(username)
            .await?;
        Ok(user.as_ref().map(UserDto::from))
    }

    /// Up to `count` users ordered by most recent activity.
    pub async fn recently_active(&self, count: usize) -> Result<Vec<UserDto>, Error> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let members = self
            .ctx
            .cache()
            .zrange_by_score(
                keys::USERS_BY_LAST_ACTIVE,
                f64::NEG_INFINITY,
                f64::INFINITY,
                SortOrder::Descending,
                Some(count),
            )
            .await?;
        let ids = members
            .into_iter()
            .map(|(member, _)| member.parse::<Id>())
            .collect::<Result<Vec<_>, _>>()?;

        let users = UserRepository::new(self.ctx.db()).get_many(&ids).await?;

        // Keep the activity order of the index
        Ok(ids
            .iter()
            .filter_map(|id| users.iter().find(|u| u.id == i64::from(*id)))
            .map(UserDto::from)
            .collect())
    }

    /// Deletes a user together with its accounts, devices and subscription.
    ///
    /// Reservations, index entries and live pairing tickets of the user are removed once the
    /// rows are gone.
    ///
    /// # Returns
    /// - `Ok(true)` - User was deleted
    /// - `Ok(false)` - User did not exist
    pub async fn delete_user(&self, user_id: Id) -> Result<bool, Error> {
        self.ctx.ensure_writable()?;
        let Some(user) = UserRepository::new(self.ctx.db()).get(user_id).await? else {
            return Ok(false);
        };
        let devices = DeviceRepository::new(self.ctx.db())
            .list_for_user(user_id)
            .await?;

        let txn = self.ctx.db().begin().await?;
        AccountRepository::new(&txn).delete_for_user(user_id).await?;
        DeviceRepository::new(&txn).delete_for_user(user_id).await?;
        let result = UserRepository::new(&txn).delete(user_id).await?;
        SubscriptionRepository::new(&txn)
            .delete(Id::from(user.subscription_id))
            .await?;
        txn.commit().await?;

        if result.rows_affected == 0 {
            return Ok(false);
        }

        self.release_username(&user.username, user_id).await;
        for device in &devices {
            self.ctx
                .cache()
                .hash_delete_if_eq(
                    keys::DEVICE_NAMES_TO_IDS,
                    &keys::device_name(user_id, &device.name),
                    &device.id.to_string(),
                )
                .await?;
        }

        let member = user_id.to_string();
        let commands = [
            keys::USERS_BY_LAST_ACTIVE,
            keys::USERS_BY_JOIN_DATE,
            keys::USERS_BY_SUBSCRIPTION_EXPIRATION,
        ]
        .into_iter()
        .map(|key| Command::SortedSetRemove {
            key: key.to_string(),
            member: member.clone(),
        })
        .chain([Command::Delete {
            key: keys::user(user_id),
        }])
        .collect();
        first_failure(self.ctx.cache().batch(commands).await?)?;

        PairingService::new(self.ctx).invalidate_user(user_id).await?;

        let mut delta = AuditDelta::new(entity_key("users", user_id));
        delta
            .deleted("username", &user.username)
            .deleted("email", &user.email)
            .deleted("given_name", &user.given_name)
            .deleted("family_name", &user.family_name)
            .deleted("is_admin", &user.is_admin)
            .deleted("subscription_id", &Id::from(user.subscription_id))
            .secret("secret", true, false)
            .secret("email_code", true, false);
        self.ctx.audit().record(delta).await;

        tracing::info!("Deleted user {} ({})", user.username, user_id);

        Ok(true)
    }

    async fn set_admin(&self, user_id: Id, is_admin: bool) -> Result<UserModel, Error> {
        self.ctx.ensure_writable()?;
        let current = self.require(user_id).await?;
        if current.is_admin == is_admin {
            return Ok(current);
        }

        let updated = self
            .apply(
                user_id,
                entity::user::ActiveModel {
                    is_admin: ActiveValue::Set(is_admin),
                    ..Default::default()
                },
            )
            .await?;
        self.cache_user(&updated).await?;

        let mut delta = AuditDelta::new(entity_key("users", user_id));
        delta.change("is_admin", &current.is_admin, &updated.is_admin);
        self.ctx.audit().record(delta).await;

        Ok(updated)
    }

    /// Refreshes `last_active` and the activity index. Not audited.
    async fn touch(&self, user: UserModel) -> Result<UserModel, Error> {
        if self.ctx.config().maintenance_mode {
            return Ok(user);
        }

        let user_id = Id::from(user.id);
        let now = time::now();
        let user = self
            .apply(
                user_id,
                entity::user::ActiveModel {
                    last_active: ActiveValue::Set(now),
                    ..Default::default()
                },
            )
            .await?;
        self.ctx
            .cache()
            .zadd(keys::USERS_BY_LAST_ACTIVE, &user_id.to_string(), time::score(now))
            .await?;
        self.cache_user(&user).await?;

        Ok(user)
    }

    /// Replaces the cached record of `user` with its current fields.
    async fn cache_user(&self, user: &UserModel) -> Result<(), Error> {
        first_failure(self.ctx.cache().batch(cache_commands(user)?).await?)?;
        Ok(())
    }

    async fn require(&self, user_id: Id) -> Result<UserModel, Error> {
        UserRepository::new(self.ctx.db())
            .get(user_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("User {user_id}")))
    }

    async fn apply(
        &self,
        user_id: Id,
        changes: entity::user::ActiveModel,
    ) -> Result<UserModel, Error> {
        UserRepository::new(self.ctx.db())
            .partial_update(user_id, changes)
            .await?
            .ok_or_else(|| Error::NotFound(format!("User {user_id}")))
    }

    async fn reserve_username(&self, username: &str, user_id: Id) -> Result<(), Error> {
        let reserved = self
            .ctx
            .cache()
            .hash_set_if_absent(
                keys::USERNAMES_TO_IDS,
                &username.to_lowercase(),
                &user_id.to_string(),
            )
            .await?;

        if !reserved {
            return Err(AuthError::UsernameTaken(username.to_string()).into());
        }
        Ok(())
    }

    /// Releases `username` if it is still reserved by `user_id`.
    async fn release_username(&self, username: &str, user_id: Id) {
        if let Err(e) = self
            .ctx
            .cache()
            .hash_delete_if_eq(
                keys::USERNAMES_TO_IDS,
                &username.to_lowercase(),
                &user_id.to_string(),
            )
            .await
        {
            tracing::warn!(
                "Failed to release username reservation of user {}: {}",
                user_id,
                e
            );
        }
    }

    async fn persist_registration(
        &self,
        user: UserModel,
        expires: NaiveDateTime,
    ) -> Result<UserModel, Error> {
        let txn = self.ctx.db().begin().await?;
        SubscriptionRepository::new(&txn)
            .create(Id::from(user.subscription_id), expires)
            .await?;
        let user = UserRepository::new(&txn).create(user).await?;
        txn.commit().await?;

        Ok(user)
    }

    async fn index_registration(
        &self,
        user: &UserModel,
        expires: NaiveDateTime,
    ) -> Result<(), Error> {
        let member = user.id.to_string();
        let mut commands = vec![
            Command::SortedSetAdd {
                key: keys::USERS_BY_JOIN_DATE.to_string(),
                member: member.clone(),
                score: time::score(user.joined),
            },
            Command::SortedSetAdd {
                key: keys::USERS_BY_SUBSCRIPTION_EXPIRATION.to_string(),
                member,
                score: time::score(expires),
            },
        ];
        commands.extend(cache_commands(user)?);

        first_failure(self.ctx.cache().batch(commands).await?)?;
        Ok(())
    }

    /// Removes the rows and reservation of a registration that could not be indexed.
    async fn discard_registration(&self, user: &UserModel) {
        let user_id = Id::from(user.id);
        let result = async {
            let txn = self.ctx.db().begin().await?;
            UserRepository::new(&txn).delete(user_id).await?;
            SubscriptionRepository::new(&txn)
                .delete(Id::from(user.subscription_id))
                .await?;
            txn.commit().await
        }
        .await;

        if let Err(e) = result {
            tracing::warn!("Failed to discard registration of user {}: {}", user_id, e);
        }
        if let Err(e) = self.ctx.cache().delete(&keys::user(user_id)).await {
            tracing::warn!("Failed to drop cached record of user {}: {}", user_id, e);
        }
        self.release_username(&user.username, user_id).await;
    }
}

/// Commands rewriting the `users:{id}` hash from `user`.
fn cache_commands(user: &UserModel) -> Result<Vec<Command>, Error> {
    let key = keys::user(Id::from(user.id));
    Ok(vec![
        Command::Delete { key: key.clone() },
        Command::HashSet {
            key,
            fields: UserDto::from(user).to_fields()?,
        },
    ])
}

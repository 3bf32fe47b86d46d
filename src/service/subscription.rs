//! Subscription standing and maintenance.
//!
//! Every user owns exactly one subscription row, created with the trial period at
//! registration. A subscription is active until `expires` and then spends
//! `grace_period_days` in a grace period before it counts as expired.

use chrono::{Duration, NaiveDateTime};
use sea_orm::ActiveValue;

use crate::{
    audit::{entity_key, AuditDelta},
    data::{subscription::SubscriptionRepository, user::UserRepository},
    error::{validation::ValidationError, Error},
    model::{
        context::RequestContext,
        db::{SubscriptionModel, UserModel},
        id::Id,
        user::SubscriptionStatus,
    },
    store::{keys, SortOrder},
    util::time,
};

/// Classifies a subscription expiring at `expires` as `(active, in_grace)` at `now`.
pub fn classify(expires: NaiveDateTime, grace_period_days: i64, now: NaiveDateTime) -> (bool, bool) {
    let active = now < expires;
    let in_grace = !active && now < expires + Duration::days(grace_period_days);
    (active, in_grace)
}

/// Maps [`classify`] onto the standing reported to callers.
pub fn status(expires: NaiveDateTime, grace_period_days: i64, now: NaiveDateTime) -> SubscriptionStatus {
    match classify(expires, grace_period_days, now) {
        (true, _) => SubscriptionStatus::Ok,
        (false, true) => SubscriptionStatus::GraceWarning { expires },
        (false, false) => SubscriptionStatus::Expired { expires },
    }
}

pub struct SubscriptionService<'a> {
    ctx: &'a RequestContext,
}

impl<'a> SubscriptionService<'a> {
    pub fn new(ctx: &'a RequestContext) -> Self {
        Self { ctx }
    }

    /// Loads the subscription of `user_id`, `None` when the user does not exist.
    pub async fn get_for_user(&self, user_id: Id) -> Result<Option<SubscriptionModel>, Error> {
        let Some(user) = UserRepository::new(self.ctx.db()).get(user_id).await? else {
            return Ok(None);
        };

        self.load(&user).await.map(Some)
    }

    /// Standing of `user` right now.
    ///
    /// Admins, and every user when subscriptions are disabled, are always
    /// [`SubscriptionStatus::Ok`] without touching the database.
    pub async fn status_for(&self, user: &UserModel) -> Result<SubscriptionStatus, Error> {
        if user.is_admin || !self.ctx.config().use_subscriptions {
            return Ok(SubscriptionStatus::Ok);
        }

        let subscription = self.load(user).await?;
        Ok(status(
            subscription.expires,
            self.ctx.config().grace_period_days,
            time::now(),
        ))
    }

    /// Pushes the expiry of `user_id`'s subscription `days` into the future.
    ///
    /// A lapsed subscription is extended from now rather than from its old expiry.
    ///
    /// # Returns
    /// - `Ok(SubscriptionModel)` - Updated subscription
    /// - `Err(Error::NotFound)` - User does not exist
    /// - `Err(Error::ValidationError)` - `days` is negative
    pub async fn extend(&self, user_id: Id, days: i64) -> Result<SubscriptionModel, Error> {
        self.ctx.ensure_writable()?;
        if days < 0 {
            return Err(ValidationError::NegativeExtension(days).into());
        }

        let (user, subscription) = self.load_for_user(user_id).await?;
        let base = subscription.expires.max(time::now());
        let expires = base + Duration::days(days);

        let updated = self
            .update(
                &subscription,
                entity::subscription::ActiveModel {
                    expires: ActiveValue::Set(expires),
                    ..Default::default()
                },
            )
            .await?;

        self.ctx
            .cache()
            .zadd(
                keys::USERS_BY_SUBSCRIPTION_EXPIRATION,
                &user.id.to_string(),
                time::score(updated.expires),
            )
            .await?;

        Ok(updated)
    }

    pub async fn set_auto_renew(
        &self,
        user_id: Id,
        auto_renew: bool,
    ) -> Result<SubscriptionModel, Error> {
        self.ctx.ensure_writable()?;
        let (_, subscription) = self.load_for_user(user_id).await?;

        self.update(
            &subscription,
            entity::subscription::ActiveModel {
                auto_renew: ActiveValue::Set(auto_renew),
                ..Default::default()
            },
        )
        .await
    }

    /// Sets or clears the payment provider's funding reference used for renewals.
    pub async fn set_funding(
        &self,
        user_id: Id,
        funding_id: Option<String>,
        funding_source: Option<String>,
    ) -> Result<SubscriptionModel, Error> {
        self.ctx.ensure_writable()?;
        let (_, subscription) = self.load_for_user(user_id).await?;

        self.update(
            &subscription,
            entity::subscription::ActiveModel {
                funding_id: ActiveValue::Set(funding_id),
                funding_source: ActiveValue::Set(funding_source),
                ..Default::default()
            },
        )
        .await
    }

    /// Users whose subscription expires strictly before `cutoff`, soonest first.
    pub async fn expiring_before(
        &self,
        cutoff: NaiveDateTime,
        limit: Option<usize>,
    ) -> Result<Vec<Id>, Error> {
        let cutoff = time::score(cutoff);
        let members = self
            .ctx
            .cache()
            .zrange_by_score(
                keys::USERS_BY_SUBSCRIPTION_EXPIRATION,
                f64::NEG_INFINITY,
                cutoff,
                SortOrder::Ascending,
                None,
            )
            .await?;

        let ids = members
            .into_iter()
            .filter(|(_, score)| *score < cutoff)
            .map(|(member, _)| member.parse::<Id>())
            .take(limit.unwrap_or(usize::MAX))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ids)
    }

    async fn load(&self, user: &UserModel) -> Result<SubscriptionModel, Error> {
        SubscriptionRepository::new(self.ctx.db())
            .get(Id::from(user.subscription_id))
            .await?
            .ok_or_else(|| {
                Error::InternalError(format!(
                    "Subscription {} of user {} is missing",
                    user.subscription_id, user.id
                ))
            })
    }

    async fn load_for_user(&self, user_id: Id) -> Result<(UserModel, SubscriptionModel), Error> {
        let user = UserRepository::new(self.ctx.db())
            .get(user_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("User {user_id}")))?;
        let subscription = self.load(&user).await?;

        Ok((user, subscription))
    }

    async fn update(
        &self,
        current: &SubscriptionModel,
        changes: entity::subscription::ActiveModel,
    ) -> Result<SubscriptionModel, Error> {
        let id = Id::from(current.id);
        let updated = SubscriptionRepository::new(self.ctx.db())
            .partial_update(id, changes)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Subscription {id}")))?;

        let mut delta = AuditDelta::new(entity_key("subscriptions", id));
        delta
            .change("expires", &current.expires, &updated.expires)
            .change("auto_renew", &current.auto_renew, &updated.auto_renew)
            .change("funding_id", &current.funding_id, &updated.funding_id)
            .change("funding_source", &current.funding_source, &updated.funding_source);
        self.ctx.audit().record(delta).await;

        Ok(updated)
    }
}

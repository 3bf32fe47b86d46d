use chrono::NaiveDateTime;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ConnectionTrait, DbErr, DeleteResult, EntityTrait,
};

use crate::model::{db::SubscriptionModel, id::Id};

pub struct SubscriptionRepository<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> SubscriptionRepository<'a, C> {
    /// Creates a new instance of [`SubscriptionRepository`]
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Creates a subscription expiring at `expires` with auto-renew off
    pub async fn create(
        &self,
        subscription_id: Id,
        expires: NaiveDateTime,
    ) -> Result<SubscriptionModel, DbErr> {
        let subscription = entity::subscription::ActiveModel {
            id: ActiveValue::Set(i64::from(subscription_id)),
            expires: ActiveValue::Set(expires),
            auto_renew: ActiveValue::Set(false),
            funding_id: ActiveValue::Set(None),
            funding_source: ActiveValue::Set(None),
        };

        subscription.insert(self.db).await
    }

    pub async fn get(&self, subscription_id: Id) -> Result<Option<SubscriptionModel>, DbErr> {
        entity::prelude::Subscription::find_by_id(i64::from(subscription_id))
            .one(self.db)
            .await
    }

    /// Writes only the fields set on `changes`
    ///
    /// Returns `Ok(None)` when the subscription does not exist.
    pub async fn partial_update(
        &self,
        subscription_id: Id,
        mut changes: entity::subscription::ActiveModel,
    ) -> Result<Option<SubscriptionModel>, DbErr> {
        if !changes.is_changed() {
            return self.get(subscription_id).await;
        }

        changes.id = ActiveValue::Unchanged(i64::from(subscription_id));
        match changes.update(self.db).await {
            Ok(subscription) => Ok(Some(subscription)),
            Err(DbErr::RecordNotUpdated) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn delete(&self, subscription_id: Id) -> Result<DeleteResult, DbErr> {
        entity::prelude::Subscription::delete_by_id(i64::from(subscription_id))
            .exec(self.db)
            .await
    }
}

#[cfg(test)]
mod tests {

    mod create {
        use chrono::{Duration, Utc};
        use tandem_test_utils::prelude::*;

        use crate::{data::subscription::SubscriptionRepository, model::id::Id};

        /// Expect the subscription to be stored with auto-renew off
        #[tokio::test]
        async fn creates_subscription() -> Result<(), TestError> {
            let test = test_setup_with_tables!(entity::prelude::Subscription)?;
            let expires = Utc::now().naive_utc() + Duration::days(14);

            let subscription_repository = SubscriptionRepository::new(&test.db);
            let created = subscription_repository.create(Id::new(10), expires).await?;
            let loaded = subscription_repository.get(Id::new(10)).await?;

            assert_eq!(created.expires, expires);
            assert!(!created.auto_renew);
            assert_eq!(loaded, Some(created));

            Ok(())
        }
    }
}

use chrono::NaiveDateTime;
use sea_orm::{ActiveModelTrait, IntoActiveModel};

use crate::{fixtures::factory, error::TestError, TestSetup};

impl TestSetup {
    pub fn user<'a>(&'a mut self) -> UserFixtures<'a> {
        UserFixtures { setup: self }
    }
}

pub struct UserFixtures<'a> {
    setup: &'a mut TestSetup,
}

impl<'a> UserFixtures<'a> {
    /// Inserts a subscription expiring at `expires` and a user referencing it.
    ///
    /// Only the relational rows are written; reservations and indices in the ephemeral store
    /// are left to the caller.
    pub async fn insert_user_with_subscription(
        &self,
        username: &str,
        expires: NaiveDateTime,
    ) -> Result<(entity::user::Model, entity::subscription::Model), TestError> {
        let subscription = factory::mock_subscription_model(expires)
            .into_active_model()
            .reset_all()
            .insert(&self.setup.db)
            .await?;
        let user = factory::mock_user_model(username, subscription.id)
            .into_active_model()
            .reset_all()
            .insert(&self.setup.db)
            .await?;

        Ok((user, subscription))
    }

    pub async fn insert_account(
        &self,
        user_id: i64,
        provider: &str,
        foreign_id: &str,
    ) -> Result<entity::account::Model, TestError> {
        Ok(factory::mock_account_model(user_id, provider, foreign_id)
            .into_active_model()
            .reset_all()
            .insert(&self.setup.db)
            .await?)
    }

    pub async fn insert_device(
        &self,
        user_id: i64,
        name: &str,
    ) -> Result<entity::device::Model, TestError> {
        Ok(factory::mock_device_model(user_id, name)
            .into_active_model()
            .reset_all()
            .insert(&self.setup.db)
            .await?)
    }
}

use chrono::NaiveDateTime;
use sea_orm::{ActiveModelTrait, IntoActiveModel};

use crate::{error::TestError, fixtures::factory, TestSetup};

impl TestSetup {
    pub fn campaign<'a>(&'a mut self) -> CampaignFixtures<'a> {
        CampaignFixtures { setup: self }
    }
}

pub struct CampaignFixtures<'a> {
    setup: &'a mut TestSetup,
}

impl<'a> CampaignFixtures<'a> {
    pub async fn insert_campaign(
        &self,
        starts: Option<NaiveDateTime>,
        ends: Option<NaiveDateTime>,
    ) -> Result<entity::campaign::Model, TestError> {
        Ok(factory::mock_campaign_model(starts, ends)
            .into_active_model()
            .reset_all()
            .insert(&self.setup.db)
            .await?)
    }

    pub async fn insert_payment(
        &self,
        user_id: i64,
        campaign: i64,
        amount: i64,
        status: &str,
        created: NaiveDateTime,
    ) -> Result<entity::payment::Model, TestError> {
        Ok(
            factory::mock_payment_model(user_id, campaign, amount, status, created)
                .into_active_model()
                .reset_all()
                .insert(&self.setup.db)
                .await?,
        )
    }
}

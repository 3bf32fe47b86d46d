//! Fundraising campaigns.

use chrono::NaiveDateTime;
use sea_orm::ActiveValue;

use crate::{
    audit::{entity_key, AuditDelta},
    data::{campaign::CampaignRepository, Page},
    error::{validation::ValidationError, Error},
    model::{
        campaign::{validate_fields, CampaignUpdate, NewCampaign},
        context::RequestContext,
        db::CampaignModel,
        id::Id,
    },
    util::time,
};

pub struct CampaignService<'a> {
    ctx: &'a RequestContext,
}

impl<'a> CampaignService<'a> {
    pub fn new(ctx: &'a RequestContext) -> Self {
        Self { ctx }
    }

    /// Creates a campaign with nothing raised yet.
    pub async fn create(&self, new_campaign: NewCampaign) -> Result<CampaignModel, Error> {
        self.ctx.ensure_writable()?;
        new_campaign.validate()?;

        let campaign_id = self.ctx.ids().next().await?;
        let campaign = CampaignRepository::new(self.ctx.db())
            .create(CampaignModel {
                id: i64::from(campaign_id),
                title: new_campaign.title,
                description: new_campaign.description,
                goal: new_campaign.goal,
                amount: 0,
                auxilliary: new_campaign.auxilliary,
                starts: new_campaign.starts,
                ends: new_campaign.ends,
            })
            .await?;

        let mut delta = AuditDelta::new(entity_key("campaigns", campaign_id));
        delta
            .created("title", &campaign.title)
            .created("description", &campaign.description)
            .created("goal", &campaign.goal)
            .created("auxilliary", &campaign.auxilliary)
            .created("starts", &campaign.starts)
            .created("ends", &campaign.ends);
        self.ctx.audit().record(delta).await;

        Ok(campaign)
    }

    /// Applies a partial update, validating the campaign as it would be afterwards.
    pub async fn update(
        &self,
        campaign_id: Id,
        update: CampaignUpdate,
    ) -> Result<CampaignModel, Error> {
        self.ctx.ensure_writable()?;
        let current = self.require(campaign_id).await?;

        validate_fields(
            update.title.as_deref().unwrap_or(&current.title),
            update.description.as_deref().unwrap_or(&current.description),
            update.goal.unwrap_or(current.goal),
        )?;
        if let Some(amount) = update.amount.filter(|amount| *amount < 0) {
            return Err(ValidationError::NegativeAmount(amount).into());
        }

        let changes = entity::campaign::ActiveModel {
            title: update.title.map_or(ActiveValue::NotSet, ActiveValue::Set),
            description: update.description.map_or(ActiveValue::NotSet, ActiveValue::Set),
            goal: update.goal.map_or(ActiveValue::NotSet, ActiveValue::Set),
            amount: update.amount.map_or(ActiveValue::NotSet, ActiveValue::Set),
            auxilliary: update.auxilliary.map_or(ActiveValue::NotSet, ActiveValue::Set),
            starts: update.starts.map_or(ActiveValue::NotSet, ActiveValue::Set),
            ends: update.ends.map_or(ActiveValue::NotSet, ActiveValue::Set),
            ..Default::default()
        };

        let updated = CampaignRepository::new(self.ctx.db())
            .partial_update(campaign_id, changes)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Campaign {campaign_id}")))?;

        let mut delta = AuditDelta::new(entity_key("campaigns", campaign_id));
        delta
            .change("title", &current.title, &updated.title)
            .change("description", &current.description, &updated.description)
            .change("goal", &current.goal, &updated.goal)
            .change("amount", &current.amount, &updated.amount)
            .change("auxilliary", &current.auxilliary, &updated.auxilliary)
            .change("starts", &current.starts, &updated.starts)
            .change("ends", &current.ends, &updated.ends);
        self.ctx.audit().record(delta).await;

        Ok(updated)
    }

    pub async fn get(&self, campaign_id: Id) -> Result<Option<CampaignModel>, Error> {
        Ok(CampaignRepository::new(self.ctx.db()).get(campaign_id).await?)
    }

    /// Campaigns ordered by start, paged on the start time.
    pub async fn list(&self, page: Page<NaiveDateTime>) -> Result<Vec<CampaignModel>, Error> {
        Ok(CampaignRepository::new(self.ctx.db()).list(page).await?)
    }

    /// Campaigns running right now.
    pub async fn current(&self) -> Result<Vec<CampaignModel>, Error> {
        Ok(CampaignRepository::new(self.ctx.db())
            .current(time::now())
            .await?)
    }

    /// # Returns
    /// - `Ok(true)` - Campaign was deleted
    /// - `Ok(false)` - Campaign did not exist
    pub async fn delete(&self, campaign_id: Id) -> Result<bool, Error> {
        self.ctx.ensure_writable()?;
        let repository = CampaignRepository::new(self.ctx.db());
        let Some(campaign) = repository.get(campaign_id).await? else {
            return Ok(false);
        };

        if repository.delete(campaign_id).await?.rows_affected == 0 {
            return Ok(false);
        }

        let mut delta = AuditDelta::new(entity_key("campaigns", campaign_id));
        delta
            .deleted("title", &campaign.title)
            .deleted("goal", &campaign.goal)
            .deleted("amount", &campaign.amount);
        self.ctx.audit().record(delta).await;

        Ok(true)
    }

    async fn require(&self, campaign_id: Id) -> Result<CampaignModel, Error> {
        CampaignRepository::new(self.ctx.db())
            .get(campaign_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Campaign {campaign_id}")))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use tandem_test_utils::prelude::*;

    use super::*;
    use crate::{error::ErrorKind, util::test::state_over};

    fn new_campaign(title: &str) -> NewCampaign {
        NewCampaign {
            title: title.to_string(),
            description: "Keeps the servers running".to_string(),
            goal: 50_000,
            ..Default::default()
        }
    }

    mod create {
        use super::*;

        #[tokio::test]
        async fn creates_campaign() -> Result<(), TestError> {
            let test = test_setup_with_tables!(entity::prelude::Campaign)?;
            let state = state_over(&test.db);
            let ctx = state.request(constant::TEST_IP, None);

            let campaign = CampaignService::new(&ctx)
                .create(new_campaign("Server costs"))
                .await
                .unwrap();

            assert_eq!(campaign.amount, 0);
            let entries = ctx
                .audit()
                .list(&format!("campaigns:{}", campaign.id), 20)
                .await
                .unwrap();
            assert_eq!(entries.len(), 6);

            Ok(())
        }

        /// Expect InvalidInput for blank text and negative goals
        #[tokio::test]
        async fn rejects_invalid_campaign() -> Result<(), TestError> {
            let test = test_setup_with_tables!(entity::prelude::Campaign)?;
            let state = state_over(&test.db);
            let ctx = state.request(constant::TEST_IP, None);
            let campaigns = CampaignService::new(&ctx);

            let mut negative_goal = new_campaign("Server costs");
            negative_goal.goal = -1;
            let mut blank_description = new_campaign("Server costs");
            blank_description.description = " ".to_string();

            for input in [new_campaign(""), negative_goal, blank_description] {
                let result = campaigns.create(input).await;
                assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidInput);
            }

            Ok(())
        }
    }

    mod update {
        use super::*;

        /// Expect only changed fields to be written and audited
        #[tokio::test]
        async fn updates_changed_fields() -> Result<(), TestError> {
            let test = test_setup_with_tables!(entity::prelude::Campaign)?;
            let state = state_over(&test.db);
            let ctx = state.request(constant::TEST_IP, None);
            let campaigns = CampaignService::new(&ctx);

            let campaign = campaigns.create(new_campaign("Server costs")).await.unwrap();
            let campaign_id = Id::from(campaign.id);
            let key = format!("campaigns:{campaign_id}");
            let created = ctx.audit().list(&key, 100).await.unwrap().len();

            let ends = time::now() + Duration::days(30);
            let updated = campaigns
                .update(
                    campaign_id,
                    CampaignUpdate {
                        goal: Some(75_000),
                        ends: Some(Some(ends)),
                        title: Some("Server costs".to_string()),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();

            assert_eq!(updated.goal, 75_000);
            assert_eq!(updated.ends, Some(ends));
            assert_eq!(ctx.audit().list(&key, 100).await.unwrap().len() - created, 2);

            Ok(())
        }

        /// Expect InvalidInput when the result would be invalid
        #[tokio::test]
        async fn rejects_invalid_result() -> Result<(), TestError> {
            let test = test_setup_with_tables!(entity::prelude::Campaign)?;
            let state = state_over(&test.db);
            let ctx = state.request(constant::TEST_IP, None);
            let campaigns = CampaignService::new(&ctx);

            let campaign = campaigns.create(new_campaign("Server costs")).await.unwrap();
            let campaign_id = Id::from(campaign.id);

            let blank = campaigns
                .update(
                    campaign_id,
                    CampaignUpdate {
                        title: Some(String::new()),
                        ..Default::default()
                    },
                )
                .await;
            let negative = campaigns
                .update(
                    campaign_id,
                    CampaignUpdate {
                        amount: Some(-5),
                        ..Default::default()
                    },
                )
                .await;

            assert_eq!(blank.unwrap_err().kind(), ErrorKind::InvalidInput);
            assert_eq!(negative.unwrap_err().kind(), ErrorKind::InvalidInput);

            Ok(())
        }
    }

    mod current {
        use super::*;

        /// Expect only campaigns whose window contains now
        #[tokio::test]
        async fn returns_running_campaigns() -> Result<(), TestError> {
            let mut test = test_setup_with_tables!(entity::prelude::Campaign)?;
            let now = time::now();
            let running = test
                .campaign()
                .insert_campaign(Some(now - Duration::days(1)), Some(now + Duration::days(1)))
                .await?;
            let open = test.campaign().insert_campaign(None, None).await?;
            test.campaign()
                .insert_campaign(Some(now - Duration::days(10)), Some(now - Duration::days(5)))
                .await?;
            test.campaign()
                .insert_campaign(Some(now + Duration::days(5)), None)
                .await?;

            let state = state_over(&test.db);
            let ctx = state.request(constant::TEST_IP, None);
            let current = CampaignService::new(&ctx).current().await.unwrap();

            let ids: Vec<_> = current.iter().map(|c| c.id).collect();
            assert_eq!(ids, vec![open.id, running.id]);

            Ok(())
        }
    }

    mod delete {
        use super::*;

        #[tokio::test]
        async fn deletes_campaign() -> Result<(), TestError> {
            let test = test_setup_with_tables!(entity::prelude::Campaign)?;
            let state = state_over(&test.db);
            let ctx = state.request(constant::TEST_IP, None);
            let campaigns = CampaignService::new(&ctx);

            let campaign = campaigns.create(new_campaign("Server costs")).await.unwrap();
            let campaign_id = Id::from(campaign.id);

            assert!(campaigns.delete(campaign_id).await.unwrap());
            assert!(!campaigns.delete(campaign_id).await.unwrap());
            assert!(campaigns.get(campaign_id).await.unwrap().is_none());

            Ok(())
        }
    }
}

use chrono::NaiveDateTime;
use sea_orm::{
    sea_query::NullOrdering, ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait,
    Condition, DbErr, DeleteResult, EntityTrait, IntoActiveModel, Order, QueryFilter, QueryOrder,
    QuerySelect,
};

use super::Page;
use crate::model::{db::CampaignModel, id::Id};

pub struct CampaignRepository<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> CampaignRepository<'a, C> {
    /// Creates a new instance of [`CampaignRepository`]
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn create(&self, campaign: CampaignModel) -> Result<CampaignModel, DbErr> {
        campaign.into_active_model().reset_all().insert(self.db).await
    }

    pub async fn get(&self, campaign_id: Id) -> Result<Option<CampaignModel>, DbErr> {
        entity::prelude::Campaign::find_by_id(i64::from(campaign_id))
            .one(self.db)
            .await
    }

    /// Campaigns ordered by start ascending, campaigns without a start first
    ///
    /// Bounds on `starts` are exclusive and never match a campaign without a start.
    pub async fn list(&self, page: Page<NaiveDateTime>) -> Result<Vec<CampaignModel>, DbErr> {
        let mut query = entity::prelude::Campaign::find();
        if let Some(before) = page.before {
            query = query.filter(entity::campaign::Column::Starts.lt(before));
        }
        if let Some(after) = page.after {
            query = query.filter(entity::campaign::Column::Starts.gt(after));
        }

        query
            .order_by_with_nulls(
                entity::campaign::Column::Starts,
                Order::Asc,
                NullOrdering::First,
            )
            .order_by_asc(entity::campaign::Column::Id)
            .limit(page.limit())
            .all(self.db)
            .await
    }

    /// Campaigns running at `now`: started (or without a start) and not yet ended
    pub async fn current(&self, now: NaiveDateTime) -> Result<Vec<CampaignModel>, DbErr> {
        entity::prelude::Campaign::find()
            .filter(
                Condition::any()
                    .add(entity::campaign::Column::Starts.is_null())
                    .add(entity::campaign::Column::Starts.lte(now)),
            )
            .filter(
                Condition::any()
                    .add(entity::campaign::Column::Ends.is_null())
                    .add(entity::campaign::Column::Ends.gt(now)),
            )
            .order_by_with_nulls(
                entity::campaign::Column::Starts,
                Order::Asc,
                NullOrdering::First,
            )
            .order_by_asc(entity::campaign::Column::Id)
            .all(self.db)
            .await
    }

    /// Writes only the fields set on `changes`
    ///
    /// Returns `Ok(None)` when the campaign does not exist.
    pub async fn partial_update(
        &self,
        campaign_id: Id,
        mut changes: entity::campaign::ActiveModel,
    ) -> Result<Option<CampaignModel>, DbErr> {
        if !changes.is_changed() {
            return self.get(campaign_id).await;
        }

        changes.id = ActiveValue::Unchanged(i64::from(campaign_id));
        match changes.update(self.db).await {
            Ok(campaign) => Ok(Some(campaign)),
            Err(DbErr::RecordNotUpdated) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn delete(&self, campaign_id: Id) -> Result<DeleteResult, DbErr> {
        entity::prelude::Campaign::delete_by_id(i64::from(campaign_id))
            .exec(self.db)
            .await
    }
}

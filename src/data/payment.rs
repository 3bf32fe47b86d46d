use chrono::NaiveDateTime;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, DbErr,
    DeleteResult, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, QuerySelect,
};

use super::Page;
use crate::model::{
    db::PaymentModel,
    id::Id,
    payment::{PaymentFilter, PaymentStatus},
};

pub struct PaymentRepository<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> PaymentRepository<'a, C> {
    /// Creates a new instance of [`PaymentRepository`]
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn create(&self, payment: PaymentModel) -> Result<PaymentModel, DbErr> {
        payment.into_active_model().reset_all().insert(self.db).await
    }

    pub async fn get(&self, payment_id: Id) -> Result<Option<PaymentModel>, DbErr> {
        entity::prelude::Payment::find_by_id(i64::from(payment_id))
            .one(self.db)
            .await
    }

    /// Payments matching `filter`, newest first
    ///
    /// Bounds on `created` are exclusive. The status filter expands to one bound parameter
    /// per status.
    pub async fn list(
        &self,
        filter: &PaymentFilter,
        page: Page<NaiveDateTime>,
    ) -> Result<Vec<PaymentModel>, DbErr> {
        let mut query = entity::prelude::Payment::find();
        if let Some(user) = filter.user {
            query = query.filter(entity::payment::Column::UserId.eq(i64::from(user)));
        }
        if let Some(campaign) = filter.campaign {
            query = query.filter(entity::payment::Column::Campaign.eq(i64::from(campaign)));
        }
        if !filter.statuses.is_empty() {
            query = query.filter(
                entity::payment::Column::Status
                    .is_in(filter.statuses.iter().map(|status| status.as_str())),
            );
        }
        if let Some(before) = page.before {
            query = query.filter(entity::payment::Column::Created.lt(before));
        }
        if let Some(after) = page.after {
            query = query.filter(entity::payment::Column::Created.gt(after));
        }

        query
            .order_by_desc(entity::payment::Column::Created)
            .order_by_desc(entity::payment::Column::Id)
            .limit(page.limit())
            .all(self.db)
            .await
    }

    /// Amounts of every payment to `campaign` with the given status
    pub async fn amounts_for_campaign(
        &self,
        campaign: Id,
        status: PaymentStatus,
    ) -> Result<Vec<i64>, DbErr> {
        entity::prelude::Payment::find()
            .select_only()
            .column(entity::payment::Column::Amount)
            .filter(entity::payment::Column::Campaign.eq(i64::from(campaign)))
            .filter(entity::payment::Column::Status.eq(status.as_str()))
            .into_tuple::<i64>()
            .all(self.db)
            .await
    }

    /// Writes only the fields set on `changes`
    ///
    /// Returns `Ok(None)` when the payment does not exist.
    pub async fn partial_update(
        &self,
        payment_id: Id,
        mut changes: entity::payment::ActiveModel,
    ) -> Result<Option<PaymentModel>, DbErr> {
        if !changes.is_changed() {
            return self.get(payment_id).await;
        }

        changes.id = ActiveValue::Unchanged(i64::from(payment_id));
        match changes.update(self.db).await {
            Ok(payment) => Ok(Some(payment)),
            Err(DbErr::RecordNotUpdated) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Moves a payment from `expected` to `next` in a single conditional statement
    ///
    /// Returns the number of rows updated, 0 when the payment does not exist or its status
    /// is no longer `expected`.
    pub async fn update_status_if(
        &self,
        payment_id: Id,
        expected: PaymentStatus,
        next: PaymentStatus,
        completed: Option<NaiveDateTime>,
    ) -> Result<u64, DbErr> {
        let result = entity::prelude::Payment::update_many()
            .col_expr(entity::payment::Column::Status, Expr::value(next.as_str()))
            .col_expr(entity::payment::Column::Completed, Expr::value(completed))
            .filter(entity::payment::Column::Id.eq(i64::from(payment_id)))
            .filter(entity::payment::Column::Status.eq(expected.as_str()))
            .exec(self.db)
            .await?;

        Ok(result.rows_affected)
    }

    pub async fn delete(&self, payment_id: Id) -> Result<DeleteResult, DbErr> {
        entity::prelude::Payment::delete_by_id(i64::from(payment_id))
            .exec(self.db)
            .await
    }
}

use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, DbErr, DeleteResult,
    EntityTrait, IntoActiveModel, QueryFilter, QueryOrder,
};

use crate::model::{db::AccountModel, id::Id};

pub struct AccountRepository<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> AccountRepository<'a, C> {
    /// Creates a new instance of [`AccountRepository`]
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn create(&self, account: AccountModel) -> Result<AccountModel, DbErr> {
        account.into_active_model().reset_all().insert(self.db).await
    }

    pub async fn get(&self, account_id: Id) -> Result<Option<AccountModel>, DbErr> {
        entity::prelude::Account::find_by_id(i64::from(account_id))
            .one(self.db)
            .await
    }

    /// Finds the account bound to `foreign_id` at `provider`
    pub async fn get_by_foreign_id(
        &self,
        provider: &str,
        foreign_id: &str,
    ) -> Result<Option<AccountModel>, DbErr> {
        entity::prelude::Account::find()
            .filter(entity::account::Column::Provider.eq(provider))
            .filter(entity::account::Column::ForeignId.eq(foreign_id))
            .one(self.db)
            .await
    }

    /// Accounts owned by a user, oldest first
    pub async fn list_for_user(&self, user_id: Id) -> Result<Vec<AccountModel>, DbErr> {
        entity::prelude::Account::find()
            .filter(entity::account::Column::UserId.eq(i64::from(user_id)))
            .order_by_asc(entity::account::Column::Added)
            .all(self.db)
            .await
    }

    /// Writes only the fields set on `changes`
    ///
    /// Returns `Ok(None)` when the account does not exist.
    pub async fn partial_update(
        &self,
        account_id: Id,
        mut changes: entity::account::ActiveModel,
    ) -> Result<Option<AccountModel>, DbErr> {
        if !changes.is_changed() {
            return self.get(account_id).await;
        }

        changes.id = ActiveValue::Unchanged(i64::from(account_id));
        match changes.update(self.db).await {
            Ok(account) => Ok(Some(account)),
            Err(DbErr::RecordNotUpdated) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn delete(&self, account_id: Id) -> Result<DeleteResult, DbErr> {
        entity::prelude::Account::delete_by_id(i64::from(account_id))
            .exec(self.db)
            .await
    }

    /// Deletes every account owned by a user
    pub async fn delete_for_user(&self, user_id: Id) -> Result<DeleteResult, DbErr> {
        entity::prelude::Account::delete_many()
            .filter(entity::account::Column::UserId.eq(i64::from(user_id)))
            .exec(self.db)
            .await
    }
}

use sea_orm::{
    sea_query::{Expr, Func},
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, DbErr, DeleteResult,
    EntityTrait, IntoActiveModel, QueryFilter,
};

use crate::model::{db::UserModel, id::Id};

pub struct UserRepository<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> UserRepository<'a, C> {
    /// Creates a new instance of [`UserRepository`]
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Inserts a fully populated user
    pub async fn create(&self, user: UserModel) -> Result<UserModel, DbErr> {
        user.into_active_model().reset_all().insert(self.db).await
    }

    pub async fn get(&self, user_id: Id) -> Result<Option<UserModel>, DbErr> {
        entity::prelude::User::find_by_id(i64::from(user_id))
            .one(self.db)
            .await
    }

    /// Finds a user by username, ignoring case
    pub async fn get_by_username(&self, username: &str) -> Result<Option<UserModel>, DbErr> {
        use sea_orm::sea_query::ExprTrait;

        entity::prelude::User::find()
            .filter(
                Expr::expr(Func::lower(Expr::col(entity::user::Column::Username)))
                    .eq(username.to_lowercase()),
            )
            .one(self.db)
            .await
    }

    /// Loads every user in `user_ids` that exists, in no particular order
    pub async fn get_many(&self, user_ids: &[Id]) -> Result<Vec<UserModel>, DbErr> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        entity::prelude::User::find()
            .filter(entity::user::Column::Id.is_in(user_ids.iter().map(|id| i64::from(*id))))
            .all(self.db)
            .await
    }

    /// Writes only the fields set on `changes`
    ///
    /// Returns `Ok(None)` when the user does not exist.
    pub async fn partial_update(
        &self,
        user_id: Id,
        mut changes: entity::user::ActiveModel,
    ) -> Result<Option<UserModel>, DbErr> {
        if !changes.is_changed() {
            return self.get(user_id).await;
        }

        changes.id = ActiveValue::Unchanged(i64::from(user_id));
        match changes.update(self.db).await {
            Ok(user) => Ok(Some(user)),
            Err(DbErr::RecordNotUpdated) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Deletes a user
    ///
    /// Returns OK regardless of user existing, to confirm the deletion result
    /// check the [`DeleteResult::rows_affected`] field.
    pub async fn delete(&self, user_id: Id) -> Result<DeleteResult, DbErr> {
        entity::prelude::User::delete_by_id(i64::from(user_id))
            .exec(self.db)
            .await
    }
}

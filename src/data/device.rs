use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, DbErr, DeleteResult,
    EntityTrait, IntoActiveModel, QueryFilter, QueryOrder,
};

use crate::model::{db::DeviceModel, id::Id};

pub struct DeviceRepository<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> DeviceRepository<'a, C> {
    /// Creates a new instance of [`DeviceRepository`]
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn create(&self, device: DeviceModel) -> Result<DeviceModel, DbErr> {
        device.into_active_model().reset_all().insert(self.db).await
    }

    pub async fn get(&self, device_id: Id) -> Result<Option<DeviceModel>, DbErr> {
        entity::prelude::Device::find_by_id(i64::from(device_id))
            .one(self.db)
            .await
    }

    /// Devices owned by a user, oldest first
    pub async fn list_for_user(&self, user_id: Id) -> Result<Vec<DeviceModel>, DbErr> {
        entity::prelude::Device::find()
            .filter(entity::device::Column::UserId.eq(i64::from(user_id)))
            .order_by_asc(entity::device::Column::Created)
            .order_by_asc(entity::device::Column::Id)
            .all(self.db)
            .await
    }

    /// Writes only the fields set on `changes`
    ///
    /// Returns `Ok(None)` when the device does not exist.
    pub async fn partial_update(
        &self,
        device_id: Id,
        mut changes: entity::device::ActiveModel,
    ) -> Result<Option<DeviceModel>, DbErr> {
        if !changes.is_changed() {
            return self.get(device_id).await;
        }

        changes.id = ActiveValue::Unchanged(i64::from(device_id));
        match changes.update(self.db).await {
            Ok(device) => Ok(Some(device)),
            Err(DbErr::RecordNotUpdated) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn delete(&self, device_id: Id) -> Result<DeleteResult, DbErr> {
        entity::prelude::Device::delete_by_id(i64::from(device_id))
            .exec(self.db)
            .await
    }

    /// Deletes every device owned by a user
    pub async fn delete_for_user(&self, user_id: Id) -> Result<DeleteResult, DbErr> {
        entity::prelude::Device::delete_many()
            .filter(entity::device::Column::UserId.eq(i64::from(user_id)))
            .exec(self.db)
            .await
    }
}

//! Devices registered to a user.
//!
//! Device names are unique per user, ignoring case, through a reservation in
//! `device_names_to_ids` keyed by `{user_id}:{lowercase name}`.

use sea_orm::ActiveValue;

use crate::{
    audit::{entity_key, AuditDelta},
    data::{device::DeviceRepository, user::UserRepository},
    error::{validation::ValidationError, Error},
    model::{
        context::RequestContext,
        db::DeviceModel,
        device::NewDevice,
        id::Id,
    },
    store::keys,
    util::{time, validation},
};

pub struct DeviceService<'a> {
    ctx: &'a RequestContext,
}

impl<'a> DeviceService<'a> {
    pub fn new(ctx: &'a RequestContext) -> Self {
        Self { ctx }
    }

    /// Registers a device for `user_id`, seen now from the caller's address.
    ///
    /// # Returns
    /// - `Ok(DeviceModel)` - Created device
    /// - `Err(Error::NotFound)` - User does not exist
    /// - `Err(Error::ValidationError(ValidationError::DeviceNameTaken))` - The user already has
    ///   a device with this name
    pub async fn create(&self, user_id: Id, new_device: NewDevice) -> Result<DeviceModel, Error> {
        self.ctx.ensure_writable()?;
        validation::validate_device_name(&new_device.name)?;
        if UserRepository::new(self.ctx.db()).get(user_id).await?.is_none() {
            return Err(Error::NotFound(format!("User {user_id}")));
        }

        let device_id = self.ctx.ids().next().await?;
        self.reserve_name(user_id, &new_device.name, device_id).await?;

        let now = time::now();
        let device = DeviceModel {
            id: i64::from(device_id),
            name: new_device.name,
            last_seen: now,
            last_ip: self.ctx.ip().to_string(),
            client_type: new_device.client_type.as_str().to_string(),
            created: now,
            push_token: new_device.push_token.filter(|t| !t.is_empty()),
            user_id: i64::from(user_id),
        };

        let device = match DeviceRepository::new(self.ctx.db()).create(device.clone()).await {
            Ok(device) => device,
            Err(e) => {
                self.release_name(user_id, &device.name, device_id).await;
                return Err(e.into());
            }
        };

        let mut delta = AuditDelta::new(entity_key("devices", device_id));
        delta
            .created("name", &device.name)
            .created("client_type", &device.client_type)
            .created("user_id", &user_id)
            .secret("push_token", false, device.push_token.is_some());
        self.ctx.audit().record(delta).await;

        Ok(device)
    }

    /// Renames a device, moving its name reservation.
    pub async fn rename(&self, device_id: Id, name: &str) -> Result<DeviceModel, Error> {
        self.ctx.ensure_writable()?;
        validation::validate_device_name(name)?;
        let current = self.require(device_id).await?;
        if current.name == name {
            return Ok(current);
        }

        let user_id = Id::from(current.user_id);
        let moves_reservation = current.name.to_lowercase() != name.to_lowercase();
        if moves_reservation {
            self.reserve_name(user_id, name, device_id).await?;
        }

        let result = DeviceRepository::new(self.ctx.db())
            .partial_update(
                device_id,
                entity::device::ActiveModel {
                    name: ActiveValue::Set(name.to_string()),
                    ..Default::default()
                },
            )
            .await
            .map_err(Error::from)
            .and_then(|updated| {
                updated.ok_or_else(|| Error::NotFound(format!("Device {device_id}")))
            });
        let updated = match result {
            Ok(updated) => updated,
            Err(e) => {
                if moves_reservation {
                    self.release_name(user_id, name, device_id).await;
                }
                return Err(e);
            }
        };

        if moves_reservation {
            self.release_name(user_id, &current.name, device_id).await;
        }

        let mut delta = AuditDelta::new(entity_key("devices", device_id));
        delta.change("name", &current.name, &updated.name);
        self.ctx.audit().record(delta).await;

        Ok(updated)
    }

    /// Records that the device was just seen from the caller's address. Not audited.
    ///
    /// Skipped in maintenance mode, returning the device unchanged.
    pub async fn touch(&self, device_id: Id) -> Result<DeviceModel, Error> {
        if self.ctx.config().maintenance_mode {
            return self.require(device_id).await;
        }

        DeviceRepository::new(self.ctx.db())
            .partial_update(
                device_id,
                entity::device::ActiveModel {
                    last_seen: ActiveValue::Set(time::now()),
                    last_ip: ActiveValue::Set(self.ctx.ip().to_string()),
                    ..Default::default()
                },
            )
            .await?
            .ok_or_else(|| Error::NotFound(format!("Device {device_id}")))
    }

    pub async fn get(&self, device_id: Id) -> Result<Option<DeviceModel>, Error> {
        Ok(DeviceRepository::new(self.ctx.db()).get(device_id).await?)
    }

    /// Devices of `user_id`, oldest first.
    pub async fn list_for_user(&self, user_id: Id) -> Result<Vec<DeviceModel>, Error> {
        Ok(DeviceRepository::new(self.ctx.db())
            .list_for_user(user_id)
            .await?)
    }

    /// Deletes a device and releases its name.
    ///
    /// # Returns
    /// - `Ok(true)` - Device was deleted
    /// - `Ok(false)` - Device did not exist
    pub async fn delete(&self, device_id: Id) -> Result<bool, Error> {
        self.ctx.ensure_writable()?;
        let repository = DeviceRepository::new(self.ctx.db());
        let Some(device) = repository.get(device_id).await? else {
            return Ok(false);
        };

        if repository.delete(device_id).await?.rows_affected == 0 {
            return Ok(false);
        }
        self.release_name(Id::from(device.user_id), &device.name, device_id)
            .await;

        let mut delta = AuditDelta::new(entity_key("devices", device_id));
        delta
            .deleted("name", &device.name)
            .deleted("client_type", &device.client_type)
            .deleted("user_id", &Id::from(device.user_id));
        self.ctx.audit().record(delta).await;

        Ok(true)
    }

    async fn require(&self, device_id: Id) -> Result<DeviceModel, Error> {
        DeviceRepository::new(self.ctx.db())
            .get(device_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Device {device_id}")))
    }

    async fn reserve_name(&self, user_id: Id, name: &str, device_id: Id) -> Result<(), Error> {
        let reserved = self
            .ctx
            .cache()
            .hash_set_if_absent(
                keys::DEVICE_NAMES_TO_IDS,
                &keys::device_name(user_id, name),
                &device_id.to_string(),
            )
            .await?;

        if !reserved {
            return Err(ValidationError::DeviceNameTaken(name.to_string()).into());
        }
        Ok(())
    }

    async fn release_name(&self, user_id: Id, name: &str, device_id: Id) {
        if let Err(e) = self
            .ctx
            .cache()
            .hash_delete_if_eq(
                keys::DEVICE_NAMES_TO_IDS,
                &keys::device_name(user_id, name),
                &device_id.to_string(),
            )
            .await
        {
            tracing::warn!(
                "Failed to release name reservation of device {}: {}",
                device_id,
                e
            );
        }
    }
}

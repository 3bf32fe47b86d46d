use sea_orm_migration::{prelude::*, schema::*};

use crate::m20260301_000002_user::Users;

static IDX_DEVICE_USER_ID: &str = "idx-devices-user_id";
static FK_DEVICE_USER_ID: &str = "fk-devices-user_id";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Devices::Table)
                    .if_not_exists()
                    .col(big_integer(Devices::Id).primary_key())
                    .col(string(Devices::Name))
                    .col(timestamp(Devices::LastSeen))
                    .col(string(Devices::LastIp))
                    .col(string(Devices::ClientType))
                    .col(timestamp(Devices::Created))
                    .col(text_null(Devices::PushToken))
                    .col(big_integer(Devices::UserId))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name(IDX_DEVICE_USER_ID)
                    .table(Devices::Table)
                    .col(Devices::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name(FK_DEVICE_USER_ID)
                    .from_tbl(Devices::Table)
                    .from_col(Devices::UserId)
                    .to_tbl(Users::Table)
                    .to_col(Users::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_foreign_key(
                ForeignKey::drop()
                    .name(FK_DEVICE_USER_ID)
                    .table(Devices::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name(IDX_DEVICE_USER_ID)
                    .table(Devices::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Devices::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum Devices {
    Table,
    Id,
    Name,
    LastSeen,
    LastIp,
    ClientType,
    Created,
    PushToken,
    UserId,
}

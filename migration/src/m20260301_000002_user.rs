use sea_orm_migration::{prelude::*, schema::*};

use crate::m20260301_000001_subscription::Subscriptions;

static FK_USER_SUBSCRIPTION_ID: &str = "fk-users-subscription_id";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(big_integer(Users::Id).primary_key())
                    .col(string_uniq(Users::Username))
                    .col(string(Users::Email))
                    .col(boolean(Users::EmailUnconfirmed))
                    .col(string(Users::EmailCode))
                    .col(string(Users::Secret))
                    .col(timestamp(Users::Joined))
                    .col(string(Users::GivenName))
                    .col(string(Users::FamilyName))
                    .col(timestamp(Users::LastActive))
                    .col(boolean(Users::IsAdmin))
                    .col(big_integer(Users::SubscriptionId))
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name(FK_USER_SUBSCRIPTION_ID)
                    .from_tbl(Users::Table)
                    .from_col(Users::SubscriptionId)
                    .to_tbl(Subscriptions::Table)
                    .to_col(Subscriptions::Id)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_foreign_key(
                ForeignKey::drop()
                    .name(FK_USER_SUBSCRIPTION_ID)
                    .table(Users::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum Users {
    Table,
    Id,
    Username,
    Email,
    EmailUnconfirmed,
    EmailCode,
    Secret,
    Joined,
    GivenName,
    FamilyName,
    LastActive,
    IsAdmin,
    SubscriptionId,
}

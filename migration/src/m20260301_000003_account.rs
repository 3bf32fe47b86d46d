use sea_orm_migration::{prelude::*, schema::*};

use crate::m20260301_000002_user::Users;

static IDX_ACCOUNT_PROVIDER_FOREIGN_ID: &str = "idx-accounts-provider-foreign_id";
static IDX_ACCOUNT_USER_ID: &str = "idx-accounts-user_id";
static FK_ACCOUNT_USER_ID: &str = "fk-accounts-user_id";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(big_integer(Accounts::Id).primary_key())
                    .col(string(Accounts::Provider))
                    .col(string(Accounts::ForeignId))
                    .col(timestamp(Accounts::Added))
                    .col(string(Accounts::Email))
                    .col(boolean(Accounts::EmailVerified))
                    .col(string(Accounts::DisplayName))
                    .col(string(Accounts::GivenName))
                    .col(string(Accounts::FamilyName))
                    .col(string(Accounts::Picture))
                    .col(string(Accounts::Locale))
                    .col(string(Accounts::Timezone))
                    .col(string(Accounts::Gender))
                    .col(text_null(Accounts::AccessToken))
                    .col(text_null(Accounts::RefreshToken))
                    .col(timestamp_null(Accounts::TokenExpires))
                    .col(big_integer(Accounts::UserId))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name(IDX_ACCOUNT_PROVIDER_FOREIGN_ID)
                    .table(Accounts::Table)
                    .col(Accounts::Provider)
                    .col(Accounts::ForeignId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name(IDX_ACCOUNT_USER_ID)
                    .table(Accounts::Table)
                    .col(Accounts::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name(FK_ACCOUNT_USER_ID)
                    .from_tbl(Accounts::Table)
                    .from_col(Accounts::UserId)
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
                    .name(FK_ACCOUNT_USER_ID)
                    .table(Accounts::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name(IDX_ACCOUNT_USER_ID)
                    .table(Accounts::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name(IDX_ACCOUNT_PROVIDER_FOREIGN_ID)
                    .table(Accounts::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum Accounts {
    Table,
    Id,
    Provider,
    ForeignId,
    Added,
    Email,
    EmailVerified,
    DisplayName,
    GivenName,
    FamilyName,
    Picture,
    Locale,
    Timezone,
    Gender,
    AccessToken,
    RefreshToken,
    TokenExpires,
    UserId,
}

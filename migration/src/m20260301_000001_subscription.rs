use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Subscriptions::Table)
                    .if_not_exists()
                    .col(big_integer(Subscriptions::Id).primary_key())
                    .col(timestamp(Subscriptions::Expires))
                    .col(boolean(Subscriptions::AutoRenew))
                    .col(string_null(Subscriptions::FundingId))
                    .col(string_null(Subscriptions::FundingSource))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Subscriptions::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum Subscriptions {
    Table,
    Id,
    Expires,
    AutoRenew,
    FundingId,
    FundingSource,
}

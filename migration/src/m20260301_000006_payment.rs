use sea_orm_migration::{prelude::*, schema::*};

static IDX_PAYMENT_CREATED: &str = "idx-payments-created";
static IDX_PAYMENT_USER_ID: &str = "idx-payments-user_id";
static IDX_PAYMENT_CAMPAIGN: &str = "idx-payments-campaign";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Payments::Table)
                    .if_not_exists()
                    .col(big_integer(Payments::Id).primary_key())
                    .col(string_null(Payments::RemoteId))
                    .col(big_integer(Payments::Amount))
                    .col(text_null(Payments::Message))
                    .col(timestamp(Payments::Created))
                    .col(timestamp_null(Payments::Completed))
                    .col(big_integer(Payments::UserId))
                    .col(string_null(Payments::FundingSourceId))
                    .col(boolean(Payments::Anonymous))
                    .col(big_integer(Payments::Campaign))
                    .col(string(Payments::Status))
                    .col(text_null(Payments::Error))
                    .to_owned(),
            )
            .await?;

        for (name, column) in [
            (IDX_PAYMENT_CREATED, Payments::Created),
            (IDX_PAYMENT_USER_ID, Payments::UserId),
            (IDX_PAYMENT_CAMPAIGN, Payments::Campaign),
        ] {
            manager
                .create_index(
                    Index::create()
                        .name(name)
                        .table(Payments::Table)
                        .col(column)
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for name in [IDX_PAYMENT_CAMPAIGN, IDX_PAYMENT_USER_ID, IDX_PAYMENT_CREATED] {
            manager
                .drop_index(Index::drop().name(name).table(Payments::Table).to_owned())
                .await?;
        }

        manager
            .drop_table(Table::drop().table(Payments::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum Payments {
    Table,
    Id,
    RemoteId,
    Amount,
    Message,
    Created,
    Completed,
    UserId,
    FundingSourceId,
    Anonymous,
    Campaign,
    Status,
    Error,
}

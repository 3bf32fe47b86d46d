use sea_orm_migration::{prelude::*, schema::*};

static IDX_CAMPAIGN_STARTS: &str = "idx-campaigns-starts";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Campaigns::Table)
                    .if_not_exists()
                    .col(big_integer(Campaigns::Id).primary_key())
                    .col(string(Campaigns::Title))
                    .col(text(Campaigns::Description))
                    .col(big_integer(Campaigns::Goal))
                    .col(big_integer(Campaigns::Amount))
                    .col(boolean(Campaigns::Auxilliary))
                    .col(timestamp_null(Campaigns::Starts))
                    .col(timestamp_null(Campaigns::Ends))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name(IDX_CAMPAIGN_STARTS)
                    .table(Campaigns::Table)
                    .col(Campaigns::Starts)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name(IDX_CAMPAIGN_STARTS)
                    .table(Campaigns::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Campaigns::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum Campaigns {
    Table,
    Id,
    Title,
    Description,
    Goal,
    Amount,
    Auxilliary,
    Starts,
    Ends,
}

use sea_query::{
    ColumnDef, ForeignKey, ForeignKeyAction, Table, TableCreateStatement, TableDropStatement,
};

use crate::table::{Integration, Subscription, SubscriptionSelector};

pub struct Operation;

fn create_table() -> TableCreateStatement {
    Table::create()
        .table(SubscriptionSelector::Table)
        .col(
            ColumnDef::new(SubscriptionSelector::Id)
                .string()
                .not_null()
                .string_len(26)
                .primary_key(),
        )
        .col(
            ColumnDef::new(SubscriptionSelector::SubscriptionId)
                .string()
                .not_null()
                .string_len(26),
        )
        .col(
            ColumnDef::new(SubscriptionSelector::IntegrationId)
                .string()
                .string_len(26),
        )
        .col(
            ColumnDef::new(SubscriptionSelector::Tag)
                .string()
                .string_len(64),
        )
        .foreign_key(
            ForeignKey::create()
                .name("fk_selector_subscription")
                .from(
                    SubscriptionSelector::Table,
                    SubscriptionSelector::SubscriptionId,
                )
                .to(Subscription::Table, Subscription::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .foreign_key(
            ForeignKey::create()
                .name("fk_selector_integration")
                .from(
                    SubscriptionSelector::Table,
                    SubscriptionSelector::IntegrationId,
                )
                .to(Integration::Table, Integration::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .to_owned()
}

fn drop_table() -> TableDropStatement {
    Table::drop().table(SubscriptionSelector::Table).to_owned()
}

#[async_trait::async_trait]
impl sqlx_migrator::Operation<sqlx::Sqlite> for Operation {
    async fn up(
        &self,
        connection: &mut sqlx::SqliteConnection,
    ) -> Result<(), sqlx_migrator::Error> {
        let statement = create_table().to_string(sea_query::SqliteQueryBuilder);
        sqlx::query(&statement).execute(connection).await?;

        Ok(())
    }

    async fn down(
        &self,
        connection: &mut sqlx::SqliteConnection,
    ) -> Result<(), sqlx_migrator::Error> {
        let statement = drop_table().to_string(sea_query::SqliteQueryBuilder);
        sqlx::query(&statement).execute(connection).await?;

        Ok(())
    }
}

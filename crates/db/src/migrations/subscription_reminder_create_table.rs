use sea_query::{
    ColumnDef, ForeignKey, ForeignKeyAction, Table, TableCreateStatement, TableDropStatement,
};

use crate::table::{Subscription, SubscriptionReminder};

pub struct Operation;

fn create_table() -> TableCreateStatement {
    Table::create()
        .table(SubscriptionReminder::Table)
        .col(
            ColumnDef::new(SubscriptionReminder::Id)
                .string()
                .not_null()
                .string_len(26)
                .primary_key(),
        )
        .col(
            ColumnDef::new(SubscriptionReminder::SubscriptionId)
                .string()
                .not_null()
                .string_len(26),
        )
        .col(
            ColumnDef::new(SubscriptionReminder::OffsetSeconds)
                .big_integer()
                .not_null(),
        )
        .foreign_key(
            ForeignKey::create()
                .name("fk_reminder_subscription")
                .from(
                    SubscriptionReminder::Table,
                    SubscriptionReminder::SubscriptionId,
                )
                .to(Subscription::Table, Subscription::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .to_owned()
}

fn drop_table() -> TableDropStatement {
    Table::drop().table(SubscriptionReminder::Table).to_owned()
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

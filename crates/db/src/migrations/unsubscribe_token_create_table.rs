use sea_query::{
    ColumnDef, Expr, ForeignKey, ForeignKeyAction, Index, IndexCreateStatement, IndexDropStatement,
    Table, TableCreateStatement, TableDropStatement,
};

use crate::table::{Subscription, UnsubscribeToken};

pub struct Operation;

fn create_table() -> TableCreateStatement {
    Table::create()
        .table(UnsubscribeToken::Table)
        .col(
            ColumnDef::new(UnsubscribeToken::Token)
                .string()
                .not_null()
                .string_len(64)
                .primary_key(),
        )
        .col(
            ColumnDef::new(UnsubscribeToken::SubscriptionId)
                .string()
                .not_null()
                .string_len(26),
        )
        .col(
            ColumnDef::new(UnsubscribeToken::CreatedAt)
                .big_integer()
                .not_null()
                .default(Expr::current_timestamp()),
        )
        .col(ColumnDef::new(UnsubscribeToken::UsedAt).big_integer())
        .col(
            ColumnDef::new(UnsubscribeToken::ExpiresAt)
                .big_integer()
                .not_null(),
        )
        .foreign_key(
            ForeignKey::create()
                .name("fk_unsubscribe_token_subscription")
                .from(
                    UnsubscribeToken::Table,
                    UnsubscribeToken::SubscriptionId,
                )
                .to(Subscription::Table, Subscription::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .to_owned()
}

fn drop_table() -> TableDropStatement {
    Table::drop().table(UnsubscribeToken::Table).to_owned()
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

pub struct CreateExpiresAtIdx;

fn create_idx() -> IndexCreateStatement {
    Index::create()
        .name("idx_unsubscribe_token_expires_at")
        .table(UnsubscribeToken::Table)
        .col(UnsubscribeToken::ExpiresAt)
        .to_owned()
}

fn drop_idx() -> IndexDropStatement {
    Index::drop()
        .name("idx_unsubscribe_token_expires_at")
        .table(UnsubscribeToken::Table)
        .to_owned()
}

#[async_trait::async_trait]
impl sqlx_migrator::Operation<sqlx::Sqlite> for CreateExpiresAtIdx {
    async fn up(
        &self,
        connection: &mut sqlx::SqliteConnection,
    ) -> Result<(), sqlx_migrator::Error> {
        let statement = create_idx().to_string(sea_query::SqliteQueryBuilder);
        sqlx::query(&statement).execute(connection).await?;

        Ok(())
    }

    async fn down(
        &self,
        connection: &mut sqlx::SqliteConnection,
    ) -> Result<(), sqlx_migrator::Error> {
        let statement = drop_idx().to_string(sea_query::SqliteQueryBuilder);
        sqlx::query(&statement).execute(connection).await?;

        Ok(())
    }
}

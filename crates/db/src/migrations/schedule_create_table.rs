use sea_query::{
    ColumnDef, Index, IndexCreateStatement, IndexDropStatement, Table, TableCreateStatement,
    TableDropStatement,
};

use crate::table::Schedule;

pub struct Operation;

fn create_table() -> TableCreateStatement {
    Table::create()
        .table(Schedule::Table)
        .col(
            ColumnDef::new(Schedule::Id)
                .string()
                .not_null()
                .string_len(128)
                .primary_key(),
        )
        .col(ColumnDef::new(Schedule::TriggerAt).big_integer().not_null())
        .col(ColumnDef::new(Schedule::Payload).text().not_null())
        .col(ColumnDef::new(Schedule::FiredAt).big_integer())
        .col(ColumnDef::new(Schedule::CreatedAt).big_integer().not_null())
        .to_owned()
}

fn drop_table() -> TableDropStatement {
    Table::drop().table(Schedule::Table).to_owned()
}

#[async_trait::async_trait]
impl sqlx_migrator::Operation<sqlx::Sqlite> for Operation {
    async fn up(&self, connection: &mut sqlx::SqliteConnection) -> Result<(), sqlx_migrator::Error> {
        let statement = create_table().to_string(sea_query::SqliteQueryBuilder);
        sqlx::query(&statement).execute(connection).await?;

        Ok(())
    }

    async fn down(&self, connection: &mut sqlx::SqliteConnection) -> Result<(), sqlx_migrator::Error> {
        let statement = drop_table().to_string(sea_query::SqliteQueryBuilder);
        sqlx::query(&statement).execute(connection).await?;

        Ok(())
    }
}

/// Backs the sweep job's "due and unfired" scan (§4.1 C1).
pub struct CreateTriggerAtIdx;

fn create_idx() -> IndexCreateStatement {
    Index::create()
        .name("idx_schedule_trigger_at")
        .table(Schedule::Table)
        .col(Schedule::TriggerAt)
        .col(Schedule::FiredAt)
        .to_owned()
}

fn drop_idx() -> IndexDropStatement {
    Index::drop().name("idx_schedule_trigger_at").table(Schedule::Table).to_owned()
}

#[async_trait::async_trait]
impl sqlx_migrator::Operation<sqlx::Sqlite> for CreateTriggerAtIdx {
    async fn up(&self, connection: &mut sqlx::SqliteConnection) -> Result<(), sqlx_migrator::Error> {
        let statement = create_idx().to_string(sea_query::SqliteQueryBuilder);
        sqlx::query(&statement).execute(connection).await?;

        Ok(())
    }

    async fn down(&self, connection: &mut sqlx::SqliteConnection) -> Result<(), sqlx_migrator::Error> {
        let statement = drop_idx().to_string(sea_query::SqliteQueryBuilder);
        sqlx::query(&statement).execute(connection).await?;

        Ok(())
    }
}

use sea_query::{ColumnDef, Expr, Table, TableCreateStatement, TableDropStatement};

use crate::table::User;

pub struct Operation;

fn create_table() -> TableCreateStatement {
    Table::create()
        .table(User::Table)
        .col(
            ColumnDef::new(User::Id)
                .string()
                .not_null()
                .string_len(26)
                .primary_key(),
        )
        .col(
            ColumnDef::new(User::Email)
                .string()
                .not_null()
                .string_len(320),
        )
        .col(ColumnDef::new(User::DisplayName).string().not_null())
        .col(ColumnDef::new(User::PasswordHash).string())
        .col(
            ColumnDef::new(User::IsVerified)
                .boolean()
                .not_null()
                .default(false),
        )
        .col(
            ColumnDef::new(User::CreatedAt)
                .big_integer()
                .not_null()
                .default(Expr::current_timestamp()),
        )
        .to_owned()
}

fn drop_table() -> TableDropStatement {
    Table::drop().table(User::Table).to_owned()
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

pub struct CreateEmailIdx;

fn create_email_idx() -> sea_query::IndexCreateStatement {
    sea_query::Index::create()
        .name("idx_user_email")
        .table(User::Table)
        .unique()
        .col(User::Email)
        .to_owned()
}

fn drop_email_idx() -> sea_query::IndexDropStatement {
    sea_query::Index::drop()
        .name("idx_user_email")
        .table(User::Table)
        .to_owned()
}

#[async_trait::async_trait]
impl sqlx_migrator::Operation<sqlx::Sqlite> for CreateEmailIdx {
    async fn up(
        &self,
        connection: &mut sqlx::SqliteConnection,
    ) -> Result<(), sqlx_migrator::Error> {
        let statement = create_email_idx().to_string(sea_query::SqliteQueryBuilder);
        sqlx::query(&statement).execute(connection).await?;

        Ok(())
    }

    async fn down(
        &self,
        connection: &mut sqlx::SqliteConnection,
    ) -> Result<(), sqlx_migrator::Error> {
        let statement = drop_email_idx().to_string(sea_query::SqliteQueryBuilder);
        sqlx::query(&statement).execute(connection).await?;

        Ok(())
    }
}

use sea_query::{
    ColumnDef, Expr, ForeignKey, ForeignKeyAction, Index, IndexCreateStatement, IndexDropStatement,
    Table, TableCreateStatement, TableDropStatement,
};

use crate::table::{Integration, User};

pub struct Operation;

fn create_table() -> TableCreateStatement {
    Table::create()
        .table(Integration::Table)
        .col(
            ColumnDef::new(Integration::Id)
                .string()
                .not_null()
                .string_len(26)
                .primary_key(),
        )
        .col(
            ColumnDef::new(Integration::UserId)
                .string()
                .not_null()
                .string_len(26),
        )
        .col(ColumnDef::new(Integration::Name).string().not_null())
        .col(
            ColumnDef::new(Integration::Tag)
                .string()
                .not_null()
                .string_len(64),
        )
        .col(
            ColumnDef::new(Integration::IsActive)
                .boolean()
                .not_null()
                .default(true),
        )
        .col(
            ColumnDef::new(Integration::Type)
                .string()
                .not_null()
                .string_len(32),
        )
        .col(ColumnDef::new(Integration::DeliveryUrl).blob().not_null())
        .col(ColumnDef::new(Integration::Config).blob().not_null())
        .col(
            ColumnDef::new(Integration::CreatedAt)
                .big_integer()
                .not_null()
                .default(Expr::current_timestamp()),
        )
        .foreign_key(
            ForeignKey::create()
                .name("fk_integration_user")
                .from(Integration::Table, Integration::UserId)
                .to(User::Table, User::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .to_owned()
}

fn drop_table() -> TableDropStatement {
    Table::drop().table(Integration::Table).to_owned()
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

pub struct CreateUserNameTagIdx;

fn create_idx() -> IndexCreateStatement {
    Index::create()
        .name("uk_integration_user_name_tag")
        .table(Integration::Table)
        .unique()
        .col(Integration::UserId)
        .col(Integration::Name)
        .col(Integration::Tag)
        .to_owned()
}

fn drop_idx() -> IndexDropStatement {
    Index::drop()
        .name("uk_integration_user_name_tag")
        .table(Integration::Table)
        .to_owned()
}

#[async_trait::async_trait]
impl sqlx_migrator::Operation<sqlx::Sqlite> for CreateUserNameTagIdx {
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

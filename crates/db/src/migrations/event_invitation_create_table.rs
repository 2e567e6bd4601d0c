use sea_query::{
    ColumnDef, Expr, ForeignKey, ForeignKeyAction, Index, IndexCreateStatement, IndexDropStatement,
    Table, TableCreateStatement, TableDropStatement,
};

use crate::table::{Event, EventInvitation, User};

pub struct Operation;

fn create_table() -> TableCreateStatement {
    Table::create()
        .table(EventInvitation::Table)
        .col(
            ColumnDef::new(EventInvitation::Id)
                .string()
                .not_null()
                .string_len(26)
                .primary_key(),
        )
        .col(
            ColumnDef::new(EventInvitation::Token)
                .string()
                .not_null()
                .string_len(64),
        )
        .col(
            ColumnDef::new(EventInvitation::EventId)
                .string()
                .not_null()
                .string_len(26),
        )
        .col(
            ColumnDef::new(EventInvitation::Email)
                .string()
                .not_null()
                .string_len(320),
        )
        .col(
            ColumnDef::new(EventInvitation::InvitedByUserId)
                .string()
                .not_null()
                .string_len(26),
        )
        .col(
            ColumnDef::new(EventInvitation::CreatedAt)
                .big_integer()
                .not_null()
                .default(Expr::current_timestamp()),
        )
        .col(ColumnDef::new(EventInvitation::UsedAt).big_integer())
        .col(
            ColumnDef::new(EventInvitation::ExpiresAt)
                .big_integer()
                .not_null(),
        )
        .foreign_key(
            ForeignKey::create()
                .name("fk_invitation_event")
                .from(EventInvitation::Table, EventInvitation::EventId)
                .to(Event::Table, Event::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .foreign_key(
            ForeignKey::create()
                .name("fk_invitation_invited_by")
                .from(EventInvitation::Table, EventInvitation::InvitedByUserId)
                .to(User::Table, User::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .to_owned()
}

fn drop_table() -> TableDropStatement {
    Table::drop().table(EventInvitation::Table).to_owned()
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

pub struct CreateTokenIdx;

fn create_idx() -> IndexCreateStatement {
    Index::create()
        .name("uk_event_invitation_token")
        .table(EventInvitation::Table)
        .unique()
        .col(EventInvitation::Token)
        .to_owned()
}

fn drop_idx() -> IndexDropStatement {
    Index::drop()
        .name("uk_event_invitation_token")
        .table(EventInvitation::Table)
        .to_owned()
}

#[async_trait::async_trait]
impl sqlx_migrator::Operation<sqlx::Sqlite> for CreateTokenIdx {
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

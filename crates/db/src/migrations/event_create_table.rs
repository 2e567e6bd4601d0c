use sea_query::{
    ColumnDef, Expr, ForeignKey, ForeignKeyAction, Index, IndexCreateStatement, IndexDropStatement,
    Table, TableCreateStatement, TableDropStatement,
};

use crate::table::{Event, User};

pub struct Operation;

fn create_table() -> TableCreateStatement {
    Table::create()
        .table(Event::Table)
        .col(
            ColumnDef::new(Event::Id)
                .string()
                .not_null()
                .string_len(26)
                .primary_key(),
        )
        .col(ColumnDef::new(Event::Name).string().not_null())
        .col(ColumnDef::new(Event::Description).string())
        .col(ColumnDef::new(Event::StartDate).big_integer().not_null())
        .col(ColumnDef::new(Event::EndDate).big_integer())
        .col(
            ColumnDef::new(Event::Timezone)
                .string()
                .not_null()
                .string_len(64),
        )
        .col(ColumnDef::new(Event::Location).string())
        .col(
            ColumnDef::new(Event::IsPublic)
                .boolean()
                .not_null()
                .default(false),
        )
        .col(
            ColumnDef::new(Event::OrganizerUserId)
                .string()
                .not_null()
                .string_len(26),
        )
        .col(
            ColumnDef::new(Event::WorkflowId)
                .string()
                .not_null()
                .string_len(64),
        )
        .col(
            ColumnDef::new(Event::IsCancelled)
                .boolean()
                .not_null()
                .default(false),
        )
        .col(
            ColumnDef::new(Event::CreatedAt)
                .big_integer()
                .not_null()
                .default(Expr::current_timestamp()),
        )
        .foreign_key(
            ForeignKey::create()
                .name("fk_event_organizer")
                .from(Event::Table, Event::OrganizerUserId)
                .to(User::Table, User::Id)
                .on_delete(ForeignKeyAction::NoAction),
        )
        .to_owned()
}

fn drop_table() -> TableDropStatement {
    Table::drop().table(Event::Table).to_owned()
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

pub struct CreateStartDateIdx;

fn create_start_date_idx() -> IndexCreateStatement {
    Index::create()
        .name("idx_event_start_date")
        .table(Event::Table)
        .col(Event::StartDate)
        .to_owned()
}

fn drop_start_date_idx() -> IndexDropStatement {
    Index::drop()
        .name("idx_event_start_date")
        .table(Event::Table)
        .to_owned()
}

#[async_trait::async_trait]
impl sqlx_migrator::Operation<sqlx::Sqlite> for CreateStartDateIdx {
    async fn up(
        &self,
        connection: &mut sqlx::SqliteConnection,
    ) -> Result<(), sqlx_migrator::Error> {
        let statement = create_start_date_idx().to_string(sea_query::SqliteQueryBuilder);
        sqlx::query(&statement).execute(connection).await?;

        Ok(())
    }

    async fn down(
        &self,
        connection: &mut sqlx::SqliteConnection,
    ) -> Result<(), sqlx_migrator::Error> {
        let statement = drop_start_date_idx().to_string(sea_query::SqliteQueryBuilder);
        sqlx::query(&statement).execute(connection).await?;

        Ok(())
    }
}

pub struct CreatePublicStartDateIdx;

fn create_public_start_date_idx() -> IndexCreateStatement {
    Index::create()
        .name("idx_event_public_start_date")
        .table(Event::Table)
        .col(Event::IsPublic)
        .col(Event::StartDate)
        .to_owned()
}

fn drop_public_start_date_idx() -> IndexDropStatement {
    Index::drop()
        .name("idx_event_public_start_date")
        .table(Event::Table)
        .to_owned()
}

#[async_trait::async_trait]
impl sqlx_migrator::Operation<sqlx::Sqlite> for CreatePublicStartDateIdx {
    async fn up(
        &self,
        connection: &mut sqlx::SqliteConnection,
    ) -> Result<(), sqlx_migrator::Error> {
        let statement = create_public_start_date_idx().to_string(sea_query::SqliteQueryBuilder);
        sqlx::query(&statement).execute(connection).await?;

        Ok(())
    }

    async fn down(
        &self,
        connection: &mut sqlx::SqliteConnection,
    ) -> Result<(), sqlx_migrator::Error> {
        let statement = drop_public_start_date_idx().to_string(sea_query::SqliteQueryBuilder);
        sqlx::query(&statement).execute(connection).await?;

        Ok(())
    }
}

pub struct CreateWorkflowIdIdx;

fn create_workflow_id_idx() -> IndexCreateStatement {
    Index::create()
        .name("uk_event_workflow_id")
        .table(Event::Table)
        .unique()
        .col(Event::WorkflowId)
        .to_owned()
}

fn drop_workflow_id_idx() -> IndexDropStatement {
    Index::drop()
        .name("uk_event_workflow_id")
        .table(Event::Table)
        .to_owned()
}

#[async_trait::async_trait]
impl sqlx_migrator::Operation<sqlx::Sqlite> for CreateWorkflowIdIdx {
    async fn up(
        &self,
        connection: &mut sqlx::SqliteConnection,
    ) -> Result<(), sqlx_migrator::Error> {
        let statement = create_workflow_id_idx().to_string(sea_query::SqliteQueryBuilder);
        sqlx::query(&statement).execute(connection).await?;

        Ok(())
    }

    async fn down(
        &self,
        connection: &mut sqlx::SqliteConnection,
    ) -> Result<(), sqlx_migrator::Error> {
        let statement = drop_workflow_id_idx().to_string(sea_query::SqliteQueryBuilder);
        sqlx::query(&statement).execute(connection).await?;

        Ok(())
    }
}

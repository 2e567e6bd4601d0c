use sea_query::{Cond, Expr, ExprTrait, Order, Query, SqliteQueryBuilder};
use sea_query_sqlx::SqlxBinder;
use soonish_shared::Result;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use ulid::Ulid;

use crate::model::Event;
use crate::table::{Event as EventTable, EventInvitation, Subscription};

fn columns() -> [EventTable; 12] {
    [
        EventTable::Id,
        EventTable::Name,
        EventTable::Description,
        EventTable::StartDate,
        EventTable::EndDate,
        EventTable::Timezone,
        EventTable::Location,
        EventTable::IsPublic,
        EventTable::OrganizerUserId,
        EventTable::WorkflowId,
        EventTable::IsCancelled,
        EventTable::CreatedAt,
    ]
}

pub async fn by_id(pool: &SqlitePool, id: &str) -> Result<Option<Event>> {
    let (sql, values) = Query::select()
        .columns(columns())
        .from(EventTable::Table)
        .and_where(Expr::col(EventTable::Id).eq(id))
        .limit(1)
        .build_sqlx(SqliteQueryBuilder);

    Ok(sqlx::query_as_with::<_, Event, _>(&sql, values)
        .fetch_optional(pool)
        .await?)
}

pub async fn by_workflow_id(pool: &SqlitePool, workflow_id: &str) -> Result<Option<Event>> {
    let (sql, values) = Query::select()
        .columns(columns())
        .from(EventTable::Table)
        .and_where(Expr::col(EventTable::WorkflowId).eq(workflow_id))
        .limit(1)
        .build_sqlx(SqliteQueryBuilder);

    Ok(sqlx::query_as_with::<_, Event, _>(&sql, values)
        .fetch_optional(pool)
        .await?)
}

pub struct CreateInput {
    pub name: String,
    pub description: Option<String>,
    pub start_date: i64,
    pub end_date: Option<i64>,
    pub timezone: String,
    pub location: Option<String>,
    pub is_public: bool,
    pub organizer_user_id: String,
}

/// Returns the new event's `(id, workflow_id)`.
pub async fn create(pool: &SqlitePool, input: CreateInput) -> Result<(String, String)> {
    if let Some(end_date) = input.end_date {
        if end_date < input.start_date {
            soonish_shared::user!("end_date must not precede start_date");
        }
    }

    let id = Ulid::new().to_string();
    let workflow_id = format!("event-{id}");
    let now = OffsetDateTime::now_utc().unix_timestamp();

    let (sql, values) = Query::insert()
        .into_table(EventTable::Table)
        .columns([
            EventTable::Id,
            EventTable::Name,
            EventTable::Description,
            EventTable::StartDate,
            EventTable::EndDate,
            EventTable::Timezone,
            EventTable::Location,
            EventTable::IsPublic,
            EventTable::OrganizerUserId,
            EventTable::WorkflowId,
            EventTable::IsCancelled,
            EventTable::CreatedAt,
        ])
        .values_panic([
            id.clone().into(),
            input.name.into(),
            input.description.into(),
            input.start_date.into(),
            input.end_date.into(),
            input.timezone.into(),
            input.location.into(),
            input.is_public.into(),
            input.organizer_user_id.into(),
            workflow_id.clone().into(),
            false.into(),
            now.into(),
        ])
        .build_sqlx(SqliteQueryBuilder);

    sqlx::query_with(&sql, values).execute(pool).await?;

    Ok((id, workflow_id))
}

#[derive(Default)]
pub struct UpdateInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
    pub location: Option<String>,
}

pub async fn update(pool: &SqlitePool, id: &str, input: UpdateInput) -> Result<()> {
    let mut statement = Query::update()
        .table(EventTable::Table)
        .and_where(Expr::col(EventTable::Id).eq(id))
        .to_owned();

    let mut touched = false;

    if let Some(name) = input.name {
        statement.value(EventTable::Name, name);
        touched = true;
    }
    if let Some(description) = input.description {
        statement.value(EventTable::Description, description);
        touched = true;
    }
    if let Some(start_date) = input.start_date {
        statement.value(EventTable::StartDate, start_date);
        touched = true;
    }
    if let Some(end_date) = input.end_date {
        statement.value(EventTable::EndDate, end_date);
        touched = true;
    }
    if let Some(location) = input.location {
        statement.value(EventTable::Location, location);
        touched = true;
    }

    if !touched {
        return Ok(());
    }

    let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
    sqlx::query_with(&sql, values).execute(pool).await?;

    Ok(())
}

pub async fn mark_cancelled(pool: &SqlitePool, id: &str) -> Result<()> {
    let (sql, values) = Query::update()
        .table(EventTable::Table)
        .value(EventTable::IsCancelled, true)
        .and_where(Expr::col(EventTable::Id).eq(id))
        .build_sqlx(SqliteQueryBuilder);

    sqlx::query_with(&sql, values).execute(pool).await?;

    Ok(())
}

/// Cascades via `ON DELETE CASCADE` to subscriptions, selectors, reminders,
/// and invitations (§3 Event lifecycle).
pub async fn delete(pool: &SqlitePool, id: &str) -> Result<()> {
    let (sql, values) = Query::delete()
        .from_table(EventTable::Table)
        .and_where(Expr::col(EventTable::Id).eq(id))
        .build_sqlx(SqliteQueryBuilder);

    sqlx::query_with(&sql, values).execute(pool).await?;

    Ok(())
}

pub async fn list_public(pool: &SqlitePool, skip: u64, limit: u64) -> Result<Vec<Event>> {
    let (sql, values) = Query::select()
        .columns(columns())
        .from(EventTable::Table)
        .and_where(Expr::col(EventTable::IsPublic).eq(true))
        .order_by(EventTable::StartDate, Order::Asc)
        .limit(limit)
        .offset(skip)
        .build_sqlx(SqliteQueryBuilder);

    Ok(sqlx::query_as_with::<_, Event, _>(&sql, values)
        .fetch_all(pool)
        .await?)
}

/// `public ∪ organized ∪ subscribed` (§4.2), a single query with an `OR`
/// across a subquery on subscriptions.
pub async fn list_visible_for_user(
    pool: &SqlitePool,
    user_id: &str,
    skip: u64,
    limit: u64,
) -> Result<Vec<Event>> {
    let subscribed_ids = Query::select()
        .column(Subscription::EventId)
        .from(Subscription::Table)
        .and_where(Expr::col(Subscription::UserId).eq(user_id))
        .to_owned();

    let (sql, values) = Query::select()
        .columns(columns())
        .from(EventTable::Table)
        .cond_where(
            Cond::any()
                .add(Expr::col(EventTable::IsPublic).eq(true))
                .add(Expr::col(EventTable::OrganizerUserId).eq(user_id))
                .add(Expr::col(EventTable::Id).in_subquery(subscribed_ids)),
        )
        .order_by(EventTable::StartDate, Order::Asc)
        .limit(limit)
        .offset(skip)
        .build_sqlx(SqliteQueryBuilder);

    Ok(sqlx::query_as_with::<_, Event, _>(&sql, values)
        .fetch_all(pool)
        .await?)
}

/// `public ∨ organizer ∨ subscriber ∨ (valid unused invitation holder)`,
/// the Open Question resolution recorded in DESIGN.md.
pub async fn can_view(pool: &SqlitePool, event_id: &str, user_id: &str) -> Result<bool> {
    let Some(event) = by_id(pool, event_id).await? else {
        return Ok(false);
    };

    if event.is_public || event.organizer_user_id == user_id {
        return Ok(true);
    }

    let (sql, values) = Query::select()
        .expr(Expr::val(1))
        .from(Subscription::Table)
        .and_where(Expr::col(Subscription::EventId).eq(event_id))
        .and_where(Expr::col(Subscription::UserId).eq(user_id))
        .limit(1)
        .build_sqlx(SqliteQueryBuilder);

    if sqlx::query_as_with::<_, (i64,), _>(&sql, values)
        .fetch_optional(pool)
        .await?
        .is_some()
    {
        return Ok(true);
    }

    let Some(user) = super::user::by_id(pool, user_id).await? else {
        return Ok(false);
    };

    let now = OffsetDateTime::now_utc().unix_timestamp();
    let (sql, values) = Query::select()
        .column(EventInvitation::Id)
        .from(EventInvitation::Table)
        .and_where(Expr::col(EventInvitation::EventId).eq(event_id))
        .and_where(Expr::col(EventInvitation::Email).eq(user.email))
        .and_where(Expr::col(EventInvitation::UsedAt).is_null())
        .and_where(Expr::col(EventInvitation::ExpiresAt).gt(now))
        .limit(1)
        .build_sqlx(SqliteQueryBuilder);

    let row = sqlx::query_as_with::<_, (String,), _>(&sql, values)
        .fetch_optional(pool)
        .await?;

    Ok(row.is_some())
}

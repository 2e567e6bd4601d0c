use sea_query::{Expr, ExprTrait, OnConflict, Query, SqliteQueryBuilder};
use sea_query_sqlx::SqlxBinder;
use soonish_shared::Result;
use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::model::Schedule;
use crate::table::Schedule as ScheduleTable;

fn columns() -> [ScheduleTable; 5] {
    [
        ScheduleTable::Id,
        ScheduleTable::TriggerAt,
        ScheduleTable::Payload,
        ScheduleTable::FiredAt,
        ScheduleTable::CreatedAt,
    ]
}

pub async fn by_id(pool: &SqlitePool, id: &str) -> Result<Option<Schedule>> {
    let (sql, values) = Query::select()
        .columns(columns())
        .from(ScheduleTable::Table)
        .and_where(Expr::col(ScheduleTable::Id).eq(id))
        .limit(1)
        .build_sqlx(SqliteQueryBuilder);

    Ok(sqlx::query_as_with::<_, Schedule, _>(&sql, values)
        .fetch_optional(pool)
        .await?)
}

/// Inserts a schedule, doing nothing if `id` already exists (§4.6: duplicate
/// creates with the same deterministic id are no-ops, which is how `create_for`
/// stays idempotent across re-runs). Returns whether a row was newly created.
pub async fn create_if_absent(pool: &SqlitePool, id: &str, trigger_at: i64, payload: &str) -> Result<bool> {
    let now = OffsetDateTime::now_utc().unix_timestamp();

    let (sql, values) = Query::insert()
        .into_table(ScheduleTable::Table)
        .columns(columns())
        .values_panic([id.into(), trigger_at.into(), payload.into(), None::<i64>.into(), now.into()])
        .on_conflict(OnConflict::column(ScheduleTable::Id).do_nothing().to_owned())
        .build_sqlx(SqliteQueryBuilder);

    let result = sqlx::query_with(&sql, values).execute(pool).await?;

    Ok(result.rows_affected() > 0)
}

/// Best-effort cancel by id; missing ids are fine (§4.6 `delete_for`).
pub async fn cancel(pool: &SqlitePool, id: &str) -> Result<bool> {
    let (sql, values) = Query::delete()
        .from_table(ScheduleTable::Table)
        .and_where(Expr::col(ScheduleTable::Id).eq(id))
        .build_sqlx(SqliteQueryBuilder);

    let result = sqlx::query_with(&sql, values).execute(pool).await?;

    Ok(result.rows_affected() > 0)
}

/// Cancels every schedule whose id begins with `prefix`, returning the ids
/// removed. Used by `delete_for(event_id)` to wipe `event-{event_id}-*`
/// without tracking ids separately.
pub async fn cancel_prefix(pool: &SqlitePool, prefix: &str) -> Result<Vec<String>> {
    let (sql, values) = Query::select()
        .column(ScheduleTable::Id)
        .from(ScheduleTable::Table)
        .and_where(Expr::col(ScheduleTable::Id).like(format!("{prefix}%")))
        .build_sqlx(SqliteQueryBuilder);

    let ids = sqlx::query_as_with::<_, (String,), _>(&sql, values)
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|(id,)| id)
        .collect::<Vec<_>>();

    if ids.is_empty() {
        return Ok(ids);
    }

    let (sql, values) = Query::delete()
        .from_table(ScheduleTable::Table)
        .and_where(Expr::col(ScheduleTable::Id).like(format!("{prefix}%")))
        .build_sqlx(SqliteQueryBuilder);
    sqlx::query_with(&sql, values).execute(pool).await?;

    Ok(ids)
}

/// Schedules due now and not yet fired; the sweep job polls this (§4.1 C1).
pub async fn due(pool: &SqlitePool, now: i64) -> Result<Vec<Schedule>> {
    let (sql, values) = Query::select()
        .columns(columns())
        .from(ScheduleTable::Table)
        .and_where(Expr::col(ScheduleTable::TriggerAt).lte(now))
        .and_where(Expr::col(ScheduleTable::FiredAt).is_null())
        .build_sqlx(SqliteQueryBuilder);

    Ok(sqlx::query_as_with::<_, Schedule, _>(&sql, values)
        .fetch_all(pool)
        .await?)
}

pub async fn mark_fired(pool: &SqlitePool, id: &str, fired_at: i64) -> Result<()> {
    let (sql, values) = Query::update()
        .table(ScheduleTable::Table)
        .value(ScheduleTable::FiredAt, fired_at)
        .and_where(Expr::col(ScheduleTable::Id).eq(id))
        .build_sqlx(SqliteQueryBuilder);

    sqlx::query_with(&sql, values).execute(pool).await?;

    Ok(())
}

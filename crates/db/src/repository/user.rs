use sea_query::{Expr, ExprTrait, Query, SqliteQueryBuilder};
use sea_query_sqlx::SqlxBinder;
use soonish_shared::Result;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use ulid::Ulid;

use crate::model::User;
use crate::table::User as UserTable;

pub async fn by_id(pool: &SqlitePool, id: &str) -> Result<Option<User>> {
    let (sql, values) = Query::select()
        .columns([
            UserTable::Id,
            UserTable::Email,
            UserTable::DisplayName,
            UserTable::PasswordHash,
            UserTable::IsVerified,
            UserTable::CreatedAt,
        ])
        .from(UserTable::Table)
        .and_where(Expr::col(UserTable::Id).eq(id))
        .limit(1)
        .build_sqlx(SqliteQueryBuilder);

    Ok(sqlx::query_as_with::<_, User, _>(&sql, values)
        .fetch_optional(pool)
        .await?)
}

pub async fn by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let normalized = email.trim().to_lowercase();
    let (sql, values) = Query::select()
        .columns([
            UserTable::Id,
            UserTable::Email,
            UserTable::DisplayName,
            UserTable::PasswordHash,
            UserTable::IsVerified,
            UserTable::CreatedAt,
        ])
        .from(UserTable::Table)
        .and_where(Expr::col(UserTable::Email).eq(normalized))
        .limit(1)
        .build_sqlx(SqliteQueryBuilder);

    Ok(sqlx::query_as_with::<_, User, _>(&sql, values)
        .fetch_optional(pool)
        .await?)
}

/// Creates an unverified, passwordless user on first anonymous subscribe, or
/// returns the existing one (§3 User lifecycle).
pub async fn get_or_create_by_email(
    read_pool: &SqlitePool,
    write_pool: &SqlitePool,
    email: &str,
    display_name: &str,
) -> Result<(User, bool)> {
    if let Some(user) = by_email(read_pool, email).await? {
        return Ok((user, false));
    }

    let id = Ulid::new().to_string();
    let normalized_email = email.trim().to_lowercase();
    let now = OffsetDateTime::now_utc().unix_timestamp();

    let (sql, values) = Query::insert()
        .into_table(UserTable::Table)
        .columns([
            UserTable::Id,
            UserTable::Email,
            UserTable::DisplayName,
            UserTable::IsVerified,
            UserTable::CreatedAt,
        ])
        .values_panic([
            id.clone().into(),
            normalized_email.clone().into(),
            display_name.into(),
            false.into(),
            now.into(),
        ])
        .build_sqlx(SqliteQueryBuilder);

    sqlx::query_with(&sql, values).execute(write_pool).await?;

    let user = by_id(read_pool, &id)
        .await?
        .ok_or_else(|| soonish_shared::Error::Server(anyhow::anyhow!("user vanished after insert")))?;

    Ok((user, true))
}

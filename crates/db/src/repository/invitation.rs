use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use sea_query::{Expr, ExprTrait, Query, SqliteQueryBuilder};
use sea_query_sqlx::SqlxBinder;
use soonish_shared::Result;
use sqlx::SqlitePool;
use time::{Duration, OffsetDateTime};
use ulid::Ulid;

use crate::model::EventInvitation;
use crate::table::EventInvitation as EventInvitationTable;

const EXPIRY: Duration = Duration::days(7);

fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub async fn create(
    pool: &SqlitePool,
    event_id: &str,
    email: &str,
    invited_by_user_id: &str,
) -> Result<(String, String)> {
    let id = Ulid::new().to_string();
    let token = random_token();
    let now = OffsetDateTime::now_utc();
    let normalized_email = email.trim().to_lowercase();

    let (sql, values) = Query::insert()
        .into_table(EventInvitationTable::Table)
        .columns([
            EventInvitationTable::Id,
            EventInvitationTable::Token,
            EventInvitationTable::EventId,
            EventInvitationTable::Email,
            EventInvitationTable::InvitedByUserId,
            EventInvitationTable::CreatedAt,
            EventInvitationTable::ExpiresAt,
        ])
        .values_panic([
            id.clone().into(),
            token.clone().into(),
            event_id.into(),
            normalized_email.into(),
            invited_by_user_id.into(),
            now.unix_timestamp().into(),
            (now + EXPIRY).unix_timestamp().into(),
        ])
        .build_sqlx(SqliteQueryBuilder);

    sqlx::query_with(&sql, values).execute(pool).await?;

    Ok((id, token))
}

pub async fn by_token(pool: &SqlitePool, token: &str) -> Result<Option<EventInvitation>> {
    let (sql, values) = Query::select()
        .columns([
            EventInvitationTable::Id,
            EventInvitationTable::Token,
            EventInvitationTable::EventId,
            EventInvitationTable::Email,
            EventInvitationTable::InvitedByUserId,
            EventInvitationTable::CreatedAt,
            EventInvitationTable::UsedAt,
            EventInvitationTable::ExpiresAt,
        ])
        .from(EventInvitationTable::Table)
        .and_where(Expr::col(EventInvitationTable::Token).eq(token))
        .limit(1)
        .build_sqlx(SqliteQueryBuilder);

    Ok(sqlx::query_as_with::<_, EventInvitation, _>(&sql, values)
        .fetch_optional(pool)
        .await?)
}

pub async fn mark_used(pool: &SqlitePool, token: &str) -> Result<()> {
    let now = OffsetDateTime::now_utc().unix_timestamp();

    let (sql, values) = Query::update()
        .table(EventInvitationTable::Table)
        .value(EventInvitationTable::UsedAt, now)
        .and_where(Expr::col(EventInvitationTable::Token).eq(token))
        .build_sqlx(SqliteQueryBuilder);

    sqlx::query_with(&sql, values).execute(pool).await?;

    Ok(())
}

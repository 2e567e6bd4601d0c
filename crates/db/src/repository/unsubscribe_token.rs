use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use sea_query::{Expr, ExprTrait, Query, SqliteQueryBuilder};
use sea_query_sqlx::SqlxBinder;
use soonish_shared::Result;
use sqlx::SqlitePool;
use time::{Duration, OffsetDateTime};

use crate::model::UnsubscribeToken;
use crate::table::UnsubscribeToken as UnsubscribeTokenTable;

const EXPIRY: Duration = Duration::days(60);

fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub async fn create(pool: &SqlitePool, subscription_id: &str) -> Result<String> {
    let token = random_token();
    let now = OffsetDateTime::now_utc();

    let (sql, values) = Query::insert()
        .into_table(UnsubscribeTokenTable::Table)
        .columns([
            UnsubscribeTokenTable::Token,
            UnsubscribeTokenTable::SubscriptionId,
            UnsubscribeTokenTable::CreatedAt,
            UnsubscribeTokenTable::ExpiresAt,
        ])
        .values_panic([
            token.clone().into(),
            subscription_id.into(),
            now.unix_timestamp().into(),
            (now + EXPIRY).unix_timestamp().into(),
        ])
        .build_sqlx(SqliteQueryBuilder);

    sqlx::query_with(&sql, values).execute(pool).await?;

    Ok(token)
}

pub async fn by_token(pool: &SqlitePool, token: &str) -> Result<Option<UnsubscribeToken>> {
    let (sql, values) = Query::select()
        .columns([
            UnsubscribeTokenTable::Token,
            UnsubscribeTokenTable::SubscriptionId,
            UnsubscribeTokenTable::CreatedAt,
            UnsubscribeTokenTable::UsedAt,
            UnsubscribeTokenTable::ExpiresAt,
        ])
        .from(UnsubscribeTokenTable::Table)
        .and_where(Expr::col(UnsubscribeTokenTable::Token).eq(token))
        .limit(1)
        .build_sqlx(SqliteQueryBuilder);

    Ok(sqlx::query_as_with::<_, UnsubscribeToken, _>(&sql, values)
        .fetch_optional(pool)
        .await?)
}

/// One-shot use: sets `used_at` so a replayed request fails `is_valid`.
pub async fn mark_used(pool: &SqlitePool, token: &str) -> Result<()> {
    let now = OffsetDateTime::now_utc().unix_timestamp();

    let (sql, values) = Query::update()
        .table(UnsubscribeTokenTable::Table)
        .value(UnsubscribeTokenTable::UsedAt, now)
        .and_where(Expr::col(UnsubscribeTokenTable::Token).eq(token))
        .build_sqlx(SqliteQueryBuilder);

    sqlx::query_with(&sql, values).execute(pool).await?;

    Ok(())
}

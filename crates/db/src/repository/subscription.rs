use std::collections::HashMap;

use sea_query::{Expr, ExprTrait, Query, SqliteQueryBuilder};
use sea_query_sqlx::SqlxBinder;
use soonish_shared::Result;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use ulid::Ulid;

use crate::model::{
    Integration, Subscription, SubscriptionSelector, SubscriptionWithUser, User,
};
use crate::table::{
    Integration as IntegrationTable, Subscription as SubscriptionTable,
    SubscriptionReminder as SubscriptionReminderTable,
    SubscriptionSelector as SubscriptionSelectorTable, User as UserTable,
};

async fn load_selectors(pool: &SqlitePool, subscription_id: &str) -> Result<Vec<SubscriptionSelector>> {
    let (sql, values) = Query::select()
        .columns([
            SubscriptionSelectorTable::Id,
            SubscriptionSelectorTable::SubscriptionId,
            SubscriptionSelectorTable::IntegrationId,
            SubscriptionSelectorTable::Tag,
        ])
        .from(SubscriptionSelectorTable::Table)
        .and_where(Expr::col(SubscriptionSelectorTable::SubscriptionId).eq(subscription_id))
        .build_sqlx(SqliteQueryBuilder);

    Ok(sqlx::query_as_with::<_, SubscriptionSelector, _>(&sql, values)
        .fetch_all(pool)
        .await?)
}

async fn load_reminder_offsets(pool: &SqlitePool, subscription_id: &str) -> Result<Vec<i64>> {
    let (sql, values) = Query::select()
        .column(SubscriptionReminderTable::OffsetSeconds)
        .from(SubscriptionReminderTable::Table)
        .and_where(Expr::col(SubscriptionReminderTable::SubscriptionId).eq(subscription_id))
        .build_sqlx(SqliteQueryBuilder);

    let rows = sqlx::query_as_with::<_, (i64,), _>(&sql, values)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(|(o,)| o).collect())
}

pub async fn by_id(pool: &SqlitePool, id: &str) -> Result<Option<Subscription>> {
    let (sql, values) = Query::select()
        .columns([
            SubscriptionTable::Id,
            SubscriptionTable::EventId,
            SubscriptionTable::UserId,
            SubscriptionTable::CreatedAt,
        ])
        .from(SubscriptionTable::Table)
        .and_where(Expr::col(SubscriptionTable::Id).eq(id))
        .limit(1)
        .build_sqlx(SqliteQueryBuilder);

    let row = sqlx::query_as_with::<_, (String, String, String, i64), _>(&sql, values)
        .fetch_optional(pool)
        .await?;

    let Some((id, event_id, user_id, created_at)) = row else {
        return Ok(None);
    };

    let selectors = load_selectors(pool, &id).await?;
    let reminder_offsets = load_reminder_offsets(pool, &id).await?;

    Ok(Some(Subscription {
        id,
        event_id,
        user_id,
        created_at,
        selectors,
        reminder_offsets,
    }))
}

pub async fn by_event_and_user(
    pool: &SqlitePool,
    event_id: &str,
    user_id: &str,
) -> Result<Option<Subscription>> {
    let (sql, values) = Query::select()
        .column(SubscriptionTable::Id)
        .from(SubscriptionTable::Table)
        .and_where(Expr::col(SubscriptionTable::EventId).eq(event_id))
        .and_where(Expr::col(SubscriptionTable::UserId).eq(user_id))
        .limit(1)
        .build_sqlx(SqliteQueryBuilder);

    let row = sqlx::query_as_with::<_, (String,), _>(&sql, values)
        .fetch_optional(pool)
        .await?;

    match row {
        Some((id,)) => by_id(pool, &id).await,
        None => Ok(None),
    }
}

/// Row shape of the single join query backing `by_event`: subscription,
/// owning user, and each of the user's integrations, flattened so a
/// per-integration row repeats the subscription/user columns. Grouped back
/// into `SubscriptionWithUser` in Rust — one round trip, no N+1 (§4.2).
#[derive(sqlx::FromRow)]
struct JoinedRow {
    subscription_id: String,
    event_id: String,
    subscription_user_id: String,
    subscription_created_at: i64,
    user_id: String,
    email: String,
    display_name: String,
    password_hash: Option<String>,
    is_verified: bool,
    user_created_at: i64,
    integration_id: Option<String>,
    integration_name: Option<String>,
    integration_tag: Option<String>,
    integration_is_active: Option<bool>,
    integration_type: Option<String>,
    integration_delivery_url: Option<Vec<u8>>,
    integration_config: Option<Vec<u8>>,
    integration_created_at: Option<i64>,
}

/// Eagerly loads selectors + user + user.integrations for every subscription
/// of an event in one query, then attaches reminder offsets and selectors
/// per-subscription from two follow-up `IN (...)` batches (still no N+1:
/// three queries total regardless of subscriber count).
pub async fn by_event(pool: &SqlitePool, event_id: &str) -> Result<Vec<SubscriptionWithUser>> {
    let (sql, values) = Query::select()
        .expr_as(Expr::col((SubscriptionTable::Table, SubscriptionTable::Id)), sea_query::Alias::new("subscription_id"))
        .expr_as(Expr::col((SubscriptionTable::Table, SubscriptionTable::EventId)), sea_query::Alias::new("event_id"))
        .expr_as(Expr::col((SubscriptionTable::Table, SubscriptionTable::UserId)), sea_query::Alias::new("subscription_user_id"))
        .expr_as(Expr::col((SubscriptionTable::Table, SubscriptionTable::CreatedAt)), sea_query::Alias::new("subscription_created_at"))
        .expr_as(Expr::col((UserTable::Table, UserTable::Id)), sea_query::Alias::new("user_id"))
        .expr_as(Expr::col((UserTable::Table, UserTable::Email)), sea_query::Alias::new("email"))
        .expr_as(Expr::col((UserTable::Table, UserTable::DisplayName)), sea_query::Alias::new("display_name"))
        .expr_as(Expr::col((UserTable::Table, UserTable::PasswordHash)), sea_query::Alias::new("password_hash"))
        .expr_as(Expr::col((UserTable::Table, UserTable::IsVerified)), sea_query::Alias::new("is_verified"))
        .expr_as(Expr::col((UserTable::Table, UserTable::CreatedAt)), sea_query::Alias::new("user_created_at"))
        .expr_as(Expr::col((IntegrationTable::Table, IntegrationTable::Id)), sea_query::Alias::new("integration_id"))
        .expr_as(Expr::col((IntegrationTable::Table, IntegrationTable::Name)), sea_query::Alias::new("integration_name"))
        .expr_as(Expr::col((IntegrationTable::Table, IntegrationTable::Tag)), sea_query::Alias::new("integration_tag"))
        .expr_as(Expr::col((IntegrationTable::Table, IntegrationTable::IsActive)), sea_query::Alias::new("integration_is_active"))
        .expr_as(Expr::col((IntegrationTable::Table, IntegrationTable::Type)), sea_query::Alias::new("integration_type"))
        .expr_as(Expr::col((IntegrationTable::Table, IntegrationTable::DeliveryUrl)), sea_query::Alias::new("integration_delivery_url"))
        .expr_as(Expr::col((IntegrationTable::Table, IntegrationTable::Config)), sea_query::Alias::new("integration_config"))
        .expr_as(Expr::col((IntegrationTable::Table, IntegrationTable::CreatedAt)), sea_query::Alias::new("integration_created_at"))
        .from(SubscriptionTable::Table)
        .inner_join(
            UserTable::Table,
            Expr::col((UserTable::Table, UserTable::Id)).equals((SubscriptionTable::Table, SubscriptionTable::UserId)),
        )
        .left_join(
            IntegrationTable::Table,
            Expr::col((IntegrationTable::Table, IntegrationTable::UserId)).equals((UserTable::Table, UserTable::Id)),
        )
        .and_where(Expr::col((SubscriptionTable::Table, SubscriptionTable::EventId)).eq(event_id))
        .build_sqlx(SqliteQueryBuilder);

    let rows = sqlx::query_as_with::<_, JoinedRow, _>(&sql, values)
        .fetch_all(pool)
        .await?;

    let mut by_sub: HashMap<String, SubscriptionWithUser> = HashMap::new();

    for row in rows {
        let entry = by_sub.entry(row.subscription_id.clone()).or_insert_with(|| SubscriptionWithUser {
            subscription: Subscription {
                id: row.subscription_id.clone(),
                event_id: row.event_id.clone(),
                user_id: row.subscription_user_id.clone(),
                created_at: row.subscription_created_at,
                selectors: vec![],
                reminder_offsets: vec![],
            },
            user: User {
                id: row.user_id.clone(),
                email: row.email.clone(),
                display_name: row.display_name.clone(),
                password_hash: row.password_hash.clone(),
                is_verified: row.is_verified,
                created_at: row.user_created_at,
            },
            integrations: vec![],
        });

        if let (Some(id), Some(kind)) = (row.integration_id, row.integration_type) {
            entry.integrations.push(Integration {
                id,
                user_id: entry.user.id.clone(),
                name: row.integration_name.unwrap_or_default(),
                tag: row.integration_tag.unwrap_or_default(),
                is_active: row.integration_is_active.unwrap_or(false),
                kind: sqlx::types::Text(
                    kind.parse()
                        .unwrap_or(crate::model::IntegrationType::Email),
                ),
                delivery_url: row.integration_delivery_url.unwrap_or_default(),
                config: row.integration_config.unwrap_or_default(),
                created_at: row.integration_created_at.unwrap_or_default(),
            });
        }
    }

    let mut subscriptions: Vec<SubscriptionWithUser> = by_sub.into_values().collect();

    for entry in subscriptions.iter_mut() {
        entry.subscription.selectors = load_selectors(pool, &entry.subscription.id).await?;
        entry.subscription.reminder_offsets =
            load_reminder_offsets(pool, &entry.subscription.id).await?;
    }

    Ok(subscriptions)
}

pub struct CreateInput {
    pub event_id: String,
    pub user_id: String,
    pub selectors: Vec<SelectorInput>,
    pub reminder_offsets: Vec<i64>,
}

pub enum SelectorInput {
    Integration(String),
    Tag(String),
}

/// Enforces `(event_id, user_id)` uniqueness (§3); a duplicate subscribe
/// surfaces as `conflict` (Scenario F).
pub async fn create(pool: &SqlitePool, input: CreateInput) -> Result<String> {
    if by_event_and_user(pool, &input.event_id, &input.user_id)
        .await?
        .is_some()
    {
        return Err(soonish_shared::Error::Conflict(
            "subscription already exists for this (event, user)".into(),
        ));
    }

    if input.reminder_offsets.len() > 20 {
        soonish_shared::user!("reminder_offsets must not exceed 20 entries");
    }

    let id = Ulid::new().to_string();
    let now = OffsetDateTime::now_utc().unix_timestamp();

    let (sql, values) = Query::insert()
        .into_table(SubscriptionTable::Table)
        .columns([
            SubscriptionTable::Id,
            SubscriptionTable::EventId,
            SubscriptionTable::UserId,
            SubscriptionTable::CreatedAt,
        ])
        .values_panic([
            id.clone().into(),
            input.event_id.into(),
            input.user_id.into(),
            now.into(),
        ])
        .build_sqlx(SqliteQueryBuilder);
    sqlx::query_with(&sql, values).execute(pool).await?;

    for selector in input.selectors {
        let selector_id = Ulid::new().to_string();
        let (integration_id, tag) = match selector {
            SelectorInput::Integration(integration_id) => (Some(integration_id), None),
            SelectorInput::Tag(tag) => (None, Some(soonish_shared::normalize_tag(&tag))),
        };

        let (sql, values) = Query::insert()
            .into_table(SubscriptionSelectorTable::Table)
            .columns([
                SubscriptionSelectorTable::Id,
                SubscriptionSelectorTable::SubscriptionId,
                SubscriptionSelectorTable::IntegrationId,
                SubscriptionSelectorTable::Tag,
            ])
            .values_panic([
                selector_id.into(),
                id.clone().into(),
                integration_id.into(),
                tag.into(),
            ])
            .build_sqlx(SqliteQueryBuilder);
        sqlx::query_with(&sql, values).execute(pool).await?;
    }

    for offset_seconds in input.reminder_offsets {
        let reminder_id = Ulid::new().to_string();
        let (sql, values) = Query::insert()
            .into_table(SubscriptionReminderTable::Table)
            .columns([
                SubscriptionReminderTable::Id,
                SubscriptionReminderTable::SubscriptionId,
                SubscriptionReminderTable::OffsetSeconds,
            ])
            .values_panic([reminder_id.into(), id.clone().into(), offset_seconds.into()])
            .build_sqlx(SqliteQueryBuilder);
        sqlx::query_with(&sql, values).execute(pool).await?;
    }

    Ok(id)
}

/// Cascades to selectors and reminders (§3 Subscription lifecycle).
pub async fn delete(pool: &SqlitePool, id: &str) -> Result<()> {
    let (sql, values) = Query::delete()
        .from_table(SubscriptionTable::Table)
        .and_where(Expr::col(SubscriptionTable::Id).eq(id))
        .build_sqlx(SqliteQueryBuilder);

    sqlx::query_with(&sql, values).execute(pool).await?;

    Ok(())
}

use sea_query::{Expr, ExprTrait, Query, SqliteQueryBuilder};
use sea_query_sqlx::SqlxBinder;
use soonish_shared::Result;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use ulid::Ulid;

use crate::encryption::Cipher;
use crate::model::{Integration, IntegrationType};
use crate::table::Integration as IntegrationTable;

fn columns() -> [IntegrationTable; 9] {
    [
        IntegrationTable::Id,
        IntegrationTable::UserId,
        IntegrationTable::Name,
        IntegrationTable::Tag,
        IntegrationTable::IsActive,
        IntegrationTable::Type,
        IntegrationTable::DeliveryUrl,
        IntegrationTable::Config,
        IntegrationTable::CreatedAt,
    ]
}

pub async fn by_id(pool: &SqlitePool, id: &str) -> Result<Option<Integration>> {
    let (sql, values) = Query::select()
        .columns(columns())
        .from(IntegrationTable::Table)
        .and_where(Expr::col(IntegrationTable::Id).eq(id))
        .limit(1)
        .build_sqlx(SqliteQueryBuilder);

    Ok(sqlx::query_as_with::<_, Integration, _>(&sql, values)
        .fetch_optional(pool)
        .await?)
}

pub async fn by_user(pool: &SqlitePool, user_id: &str, active_only: bool) -> Result<Vec<Integration>> {
    let mut statement = Query::select()
        .columns(columns())
        .from(IntegrationTable::Table)
        .and_where(Expr::col(IntegrationTable::UserId).eq(user_id))
        .to_owned();

    if active_only {
        statement.and_where(Expr::col(IntegrationTable::IsActive).eq(true));
    }

    let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);

    Ok(sqlx::query_as_with::<_, Integration, _>(&sql, values)
        .fetch_all(pool)
        .await?)
}

pub async fn by_user_and_tag(
    pool: &SqlitePool,
    user_id: &str,
    tag: &str,
    active_only: bool,
) -> Result<Vec<Integration>> {
    let normalized = soonish_shared::normalize_tag(tag);
    let mut statement = Query::select()
        .columns(columns())
        .from(IntegrationTable::Table)
        .and_where(Expr::col(IntegrationTable::UserId).eq(user_id))
        .and_where(Expr::col(IntegrationTable::Tag).eq(normalized))
        .to_owned();

    if active_only {
        statement.and_where(Expr::col(IntegrationTable::IsActive).eq(true));
    }

    let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);

    Ok(sqlx::query_as_with::<_, Integration, _>(&sql, values)
        .fetch_all(pool)
        .await?)
}

/// Fetches all active integrations for a set of ids in one round trip; used by
/// C3 to resolve `integration_id` selectors without an N+1.
pub async fn by_ids(pool: &SqlitePool, ids: &[String]) -> Result<Vec<Integration>> {
    if ids.is_empty() {
        return Ok(vec![]);
    }

    let (sql, values) = Query::select()
        .columns(columns())
        .from(IntegrationTable::Table)
        .and_where(Expr::col(IntegrationTable::Id).is_in(ids.to_vec()))
        .build_sqlx(SqliteQueryBuilder);

    Ok(sqlx::query_as_with::<_, Integration, _>(&sql, values)
        .fetch_all(pool)
        .await?)
}

pub struct CreateInput {
    pub user_id: String,
    pub name: String,
    pub tag: String,
    pub kind: IntegrationType,
    pub delivery_url: String,
    pub config: String,
}

/// Enforces `(user_id, name, tag)` uniqueness (§3); returns `conflict` on a
/// duplicate rather than silently overwriting. Encrypts `delivery_url` and
/// `config` before they ever reach the database (§4.2: encryption is applied
/// transparently in the write path, not by the caller).
pub async fn create(pool: &SqlitePool, cipher: &Cipher, input: CreateInput) -> Result<String> {
    let existing = by_user_and_tag(pool, &input.user_id, &input.tag, false)
        .await?
        .into_iter()
        .any(|i| i.name == input.name);

    if existing {
        return Err(soonish_shared::Error::Conflict(format!(
            "integration '{}' with tag '{}' already exists",
            input.name, input.tag
        )));
    }

    let id = Ulid::new().to_string();
    let now = OffsetDateTime::now_utc().unix_timestamp();
    let tag = soonish_shared::normalize_tag(&input.tag);
    let delivery_url_ciphertext = cipher.encrypt(&input.delivery_url)?;
    let config_ciphertext = cipher.encrypt(&input.config)?;

    let (sql, values) = Query::insert()
        .into_table(IntegrationTable::Table)
        .columns([
            IntegrationTable::Id,
            IntegrationTable::UserId,
            IntegrationTable::Name,
            IntegrationTable::Tag,
            IntegrationTable::IsActive,
            IntegrationTable::Type,
            IntegrationTable::DeliveryUrl,
            IntegrationTable::Config,
            IntegrationTable::CreatedAt,
        ])
        .values_panic([
            id.clone().into(),
            input.user_id.into(),
            input.name.into(),
            tag.into(),
            true.into(),
            input.kind.to_string().into(),
            delivery_url_ciphertext.into(),
            config_ciphertext.into(),
            now.into(),
        ])
        .build_sqlx(SqliteQueryBuilder);

    sqlx::query_with(&sql, values).execute(pool).await?;

    Ok(id)
}

/// `(user_id, name, tag)` is the natural key; returns the existing row
/// untouched when one already matches (§4.2 `get_or_create`).
pub async fn get_or_create(pool: &SqlitePool, cipher: &Cipher, input: CreateInput) -> Result<(Integration, bool)> {
    let existing = by_user_and_tag(pool, &input.user_id, &input.tag, false)
        .await?
        .into_iter()
        .find(|i| i.name == input.name);

    if let Some(integration) = existing {
        return Ok((integration, false));
    }

    let id = create(pool, cipher, input).await?;
    let integration = by_id(pool, &id)
        .await?
        .ok_or_else(|| soonish_shared::Error::Server(anyhow::anyhow!("integration vanished after insert")))?;

    Ok((integration, true))
}

pub async fn set_active(pool: &SqlitePool, id: &str, is_active: bool) -> Result<()> {
    let (sql, values) = Query::update()
        .table(IntegrationTable::Table)
        .value(IntegrationTable::IsActive, is_active)
        .and_where(Expr::col(IntegrationTable::Id).eq(id))
        .build_sqlx(SqliteQueryBuilder);

    sqlx::query_with(&sql, values).execute(pool).await?;

    Ok(())
}

/// Cascades to any selector referencing this integration (Open Question
/// resolution 1 in DESIGN.md).
pub async fn delete(pool: &SqlitePool, id: &str) -> Result<()> {
    let (sql, values) = Query::delete()
        .from_table(IntegrationTable::Table)
        .and_where(Expr::col(IntegrationTable::Id).eq(id))
        .build_sqlx(SqliteQueryBuilder);

    sqlx::query_with(&sql, values).execute(pool).await?;

    Ok(())
}

#[cfg(test)]
mod integration_tests {
    use evento::migrator::{Migrate, Plan};

    use super::*;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        crate::migrator::<sqlx::Sqlite>()
            .unwrap()
            .run(&mut *conn, &Plan::apply_all())
            .await
            .unwrap();
        pool
    }

    fn test_cipher() -> Cipher {
        Cipher::new(&[3u8; 32]).unwrap()
    }

    fn input(user_id: &str, tag: &str) -> CreateInput {
        CreateInput {
            user_id: user_id.to_string(),
            name: "My Gotify".to_string(),
            tag: tag.to_string(),
            kind: IntegrationType::Gotify,
            delivery_url: "gotify://gotify.example.com/token123".to_string(),
            config: r#"{"server_url":"https://gotify.example.com","token":"token123"}"#.to_string(),
        }
    }

    #[tokio::test]
    async fn create_stores_delivery_url_and_config_encrypted_at_rest() {
        let pool = test_pool().await;
        let cipher = test_cipher();

        let id = create(&pool, &cipher, input("user-1", "family")).await.unwrap();
        let row = by_id(&pool, &id).await.unwrap().unwrap();

        assert_ne!(row.delivery_url, b"gotify://gotify.example.com/token123".to_vec());
        assert_eq!(
            cipher.decrypt(&row.delivery_url).unwrap(),
            "gotify://gotify.example.com/token123"
        );
        assert_eq!(
            cipher.decrypt(&row.config).unwrap(),
            r#"{"server_url":"https://gotify.example.com","token":"token123"}"#
        );
    }

    #[tokio::test]
    async fn create_rejects_duplicate_user_name_tag() {
        let pool = test_pool().await;
        let cipher = test_cipher();

        create(&pool, &cipher, input("user-1", "family")).await.unwrap();
        let result = create(&pool, &cipher, input("user-1", "family")).await;

        assert!(matches!(result, Err(soonish_shared::Error::Conflict(_))));
    }

    #[tokio::test]
    async fn get_or_create_returns_existing_row_on_second_call() {
        let pool = test_pool().await;
        let cipher = test_cipher();

        let (first, first_created) = get_or_create(&pool, &cipher, input("user-1", "family")).await.unwrap();
        let (second, second_created) = get_or_create(&pool, &cipher, input("user-1", "family")).await.unwrap();

        assert!(first_created);
        assert!(!second_created);
        assert_eq!(first.id, second.id);
    }
}

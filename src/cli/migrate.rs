use anyhow::Result;
use evento::migrator::{Migrate, Plan};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use std::str::FromStr;

use crate::Config;

/// Runs evento's own migrations plus the C2 table migrations (`soonish_db::migrator`).
pub async fn migrate(config: Config) -> Result<()> {
    tracing::info!("Migrating database");

    let options = SqliteConnectOptions::from_str(&config.database.url)?.create_if_missing(true);
    let pool = SqlitePool::connect_with(options).await?;

    let migrator = soonish_db::migrator::<sqlx::Sqlite>()?;
    let mut conn = pool.acquire().await?;
    migrator.run(&mut *conn, &Plan::apply_all()).await?;

    pool.close().await;

    tracing::info!("Database migrated");

    Ok(())
}

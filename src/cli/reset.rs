use anyhow::Result;
use std::path::Path;

use crate::Config;

/// Drops the database file if present, then re-runs migrations.
pub async fn reset(config: Config) -> Result<()> {
    let path = config.database.url.trim_start_matches("sqlite://");
    if Path::new(path).exists() {
        std::fs::remove_file(path)?;
        tracing::info!(url = %config.database.url, "dropped database");
    }

    super::migrate(config).await
}

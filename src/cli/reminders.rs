use anyhow::Result;
use std::sync::Arc;

use crate::Config;

/// Debug command: drives one schedule sweep pass directly, without a live
/// `JobScheduler`, so a stuck or late process can be nudged by hand.
pub async fn sweep_once(config: Config) -> Result<()> {
    let pool = crate::db::create_pool(&config.database.url, config.database.max_connections).await?;

    let cipher = soonish_db::encryption::Cipher::new(&base64_decode(&config.encryption_key)?)?;
    let fallback = fallback_config(&config);
    let dispatcher = Arc::new(soonish_dispatch::Dispatcher::new(pool.clone(), cipher, fallback));

    let executor: evento::sql::RwSqlite = (evento::Sqlite::from(pool.clone()), evento::Sqlite::from(pool.clone())).into();
    let command = soonish_workflow::Command(executor, pool.clone());

    let fire = soonish_workflow::WorkflowFire::new(pool.clone(), dispatcher, command);
    let fired = soonish_scheduler::sweep_once(&pool, &fire).await?;

    tracing::info!(fired, "schedule sweep complete");

    Ok(())
}

fn fallback_config(config: &Config) -> soonish_dispatch::FallbackConfig {
    soonish_dispatch::FallbackConfig {
        default: to_profile(&config.fallback_email.default),
        verified: to_profile(&config.fallback_email.verified),
    }
}

fn to_profile(profile: &crate::config::SmtpProfileConfig) -> soonish_dispatch::SmtpProfile {
    soonish_dispatch::SmtpProfile {
        host: profile.host.clone(),
        port: profile.port,
        username: profile.username.clone(),
        password: profile.password.clone(),
        from: profile.from.clone(),
        implicit_tls: profile.implicit_tls,
    }
}

fn base64_decode(value: &str) -> Result<Vec<u8>> {
    use base64::Engine;
    Ok(base64::engine::general_purpose::STANDARD.decode(value)?)
}

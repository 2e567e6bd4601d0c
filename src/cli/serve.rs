use anyhow::Result;
use std::sync::Arc;
use tokio_cron_scheduler::JobScheduler;

use crate::Config;

/// Starts C9's evento subscriptions and the C1 sweep job, then blocks until
/// SIGINT/SIGTERM, shutting everything down gracefully. There is no HTTP
/// surface here (§1 Non-goals: the API layer is an external collaborator).
pub async fn serve(config: Config) -> Result<()> {
    tracing::info!("Starting soonish...");

    let write_pool = crate::db::create_write_pool(&config.database.url).await?;
    let read_pool = crate::db::create_read_pool(&config.database.url, config.database.max_connections).await?;

    let executor: evento::sql::RwSqlite = (evento::Sqlite::from(read_pool.clone()), evento::Sqlite::from(write_pool.clone())).into();

    let cipher = soonish_db::encryption::Cipher::new(&decode_key(&config.encryption_key)?)?;
    let fallback = fallback_config(&config);
    let dispatcher = Arc::new(soonish_dispatch::Dispatcher::new(write_pool.clone(), cipher, fallback));
    let reminders = Arc::new(soonish_scheduler::ReminderRegistry::new(write_pool.clone()));
    let timer = Arc::new(soonish_scheduler::Timer::new(write_pool.clone()));

    tracing::info!("Starting evento subscriptions...");

    let sub_workflow = soonish_workflow::subscription()
        .data(write_pool.clone())
        .data(dispatcher.clone())
        .data(reminders.clone())
        .data(timer.clone())
        .start(&executor)
        .await?;

    let command = soonish_workflow::Command(executor.clone(), write_pool.clone());
    let fire: Arc<dyn soonish_scheduler::Fire> =
        Arc::new(soonish_workflow::WorkflowFire::new(write_pool.clone(), dispatcher.clone(), command));

    let mut scheduler = JobScheduler::new().await?;
    timer.start_sweep(&scheduler, fire, config.scheduler.sweep_interval_seconds).await?;
    scheduler.start().await?;

    tracing::info!("soonish is running, Ctrl+C to stop");

    let shutdown_signal = async {
        let ctrl_c = async {
            tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => tracing::info!("received Ctrl+C"),
            _ = terminate => tracing::info!("received SIGTERM"),
        }
    };

    shutdown_signal.await;

    tracing::info!("shutting down evento subscriptions...");
    if let Err(err) = sub_workflow.shutdown().await {
        tracing::error!(err = %err, "workflow subscription shutdown failed");
    }

    scheduler.shutdown().await?;

    read_pool.close().await;
    write_pool.close().await;

    tracing::info!("shutdown complete");

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

fn decode_key(value: &str) -> Result<Vec<u8>> {
    use base64::Engine;
    Ok(base64::engine::general_purpose::STANDARD.decode(value)?)
}

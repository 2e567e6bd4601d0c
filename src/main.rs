use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use soonish::{cli, Config};

/// soonish - multi-user event reminder and notification service
#[derive(Parser)]
#[command(name = "soonish")]
#[command(about = "Event reminders and fan-out notifications", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the reminder/workflow process
    Serve,
    /// Run database migrations
    Migrate,
    /// Drop the database if it exists and recreate it with migrations
    Reset,
    /// Debug: run one schedule sweep pass directly, without a live scheduler
    RemindersSweepOnce,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.clone())?;

    let env_filter = EnvFilter::new(&config.monitoring.log_level);
    if config.monitoring.log_json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(config.monitoring.log_target)
                    .with_line_number(config.monitoring.log_line_number)
                    .with_filter(env_filter),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(config.monitoring.log_target)
                    .with_line_number(config.monitoring.log_line_number)
                    .with_filter(env_filter),
            )
            .try_init()?;
    }

    match cli.command {
        Commands::Serve => cli::serve(config).await,
        Commands::Migrate => cli::migrate(config).await,
        Commands::Reset => cli::reset(config).await,
        Commands::RemindersSweepOnce => cli::sweep_once(config).await,
    }
}

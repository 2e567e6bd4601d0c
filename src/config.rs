//! Application configuration, layered `config/default.toml` → optional
//! override file → `config/dev.toml` → `SOONISH__`-prefixed env vars.

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MonitoringConfig {
    pub log_level: String,
    pub log_json: bool,
    pub log_target: bool,
    pub log_line_number: bool,
}

/// One SMTP sender identity the fallback path dispatches through (§4.3).
#[derive(Debug, Deserialize, Clone)]
pub struct SmtpProfileConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    pub implicit_tls: bool,
}

/// The Gmail-style/ProtonMail-style profile pair the fallback path chooses
/// between by the recipient's verification state.
#[derive(Debug, Deserialize, Clone)]
pub struct FallbackEmailConfig {
    pub default: SmtpProfileConfig,
    pub verified: SmtpProfileConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerConfig {
    pub sweep_interval_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub monitoring: MonitoringConfig,
    /// Base64-encoded 256-bit key for at-rest Integration secret encryption (§3).
    pub encryption_key: String,
    pub fallback_email: FallbackEmailConfig,
    pub scheduler: SchedulerConfig,
}

impl Config {
    /// Example override: `SOONISH__DATABASE__MAX_CONNECTIONS=16`.
    pub fn load(config_path: Option<String>) -> Result<Self, ConfigError> {
        let mut builder = ConfigLoader::builder().add_source(File::with_name("config/default"));

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(&path));
        }

        builder = builder.add_source(File::with_name("config/dev").required(false));

        let config = builder
            .add_source(Environment::with_prefix("SOONISH").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

//! Per-type typed-config -> `delivery_url` converters (§6 `CreateIntegration`
//! contract: "convert to an opaque `delivery_url` via a per-type converter").
//! Each converter is a pure function, grounded in the original service's
//! `integration_converters.py`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct ConvertError {
    pub message: String,
}

impl std::fmt::Display for ConvertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ConvertError {}

fn err(message: impl Into<String>) -> ConvertError {
    ConvertError { message: message.into() }
}

fn parse_url(value: &str) -> Result<url::Url, ConvertError> {
    url::Url::parse(value).map_err(|e| err(format!("invalid url: {e}")))
}

/// Gotify self-hosted server. `gotify[s]://{host}/{token}[?priority=]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GotifyConfig {
    pub server_url: String,
    pub token: String,
    pub priority: Option<String>,
}

pub fn gotify_to_delivery_url(config: &GotifyConfig) -> Result<String, ConvertError> {
    if config.token.trim().is_empty() {
        return Err(err("token cannot be empty"));
    }

    let parsed = parse_url(&config.server_url)?;
    let host = parsed.host_str().ok_or_else(|| err("server_url missing host"))?;
    let authority = match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    let scheme = if parsed.scheme() == "https" { "gotifys" } else { "gotify" };

    let mut url = format!("{scheme}://{authority}/{}", config.token);
    if let Some(priority) = &config.priority {
        if priority != "normal" {
            url.push_str("?priority=");
            url.push_str(&urlencoding::encode(priority));
        }
    }

    Ok(url)
}

/// SMTP relay. `mailto://{user}:{pass}@{host}:{port}?from=&to=`, `mailtos://`
/// when `use_tls` (matches the email driver's scheme-based TLS selection).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: String,
    pub smtp_password: String,
    pub from_email: String,
    pub to_email: String,
    pub use_tls: bool,
}

pub fn email_to_delivery_url(config: &EmailConfig) -> Result<String, ConvertError> {
    if config.to_email.trim().is_empty() {
        return Err(err("to_email cannot be empty"));
    }

    let scheme = if config.use_tls { "mailtos" } else { "mailto" };
    let user = urlencoding::encode(&config.smtp_user);
    let password = urlencoding::encode(&config.smtp_password);

    Ok(format!(
        "{scheme}://{user}:{password}@{}:{}?from={}&to={}",
        config.smtp_host,
        config.smtp_port,
        urlencoding::encode(&config.from_email),
        urlencoding::encode(&config.to_email),
    ))
}

/// ntfy topic. `ntfy://{host}/{topic}[?priority=]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NtfyConfig {
    pub server_url: String,
    pub topic: String,
    pub priority: Option<String>,
}

pub fn ntfy_to_delivery_url(config: &NtfyConfig) -> Result<String, ConvertError> {
    if config.topic.trim().is_empty() {
        return Err(err("topic cannot be empty"));
    }

    let parsed = parse_url(&config.server_url)?;
    let host = parsed.host_str().ok_or_else(|| err("server_url missing host"))?;

    let mut url = format!("ntfy://{host}/{}", config.topic);
    if let Some(priority) = &config.priority {
        if priority != "default" {
            url.push_str("?priority=");
            url.push_str(&urlencoding::encode(priority));
        }
    }

    Ok(url)
}

/// Discord webhook. `discord://{webhook_id}/{webhook_token}`, extracted from
/// the native `/webhooks/{id}/{token}` URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub webhook_url: String,
}

pub fn discord_to_delivery_url(config: &DiscordConfig) -> Result<String, ConvertError> {
    let parsed = parse_url(&config.webhook_url)?;
    let mut segments = parsed
        .path_segments()
        .ok_or_else(|| err("webhook_url has no path"))?
        .filter(|s| !s.is_empty());

    let webhooks = segments
        .by_ref()
        .find(|s| *s == "webhooks")
        .ok_or_else(|| err("webhook_url missing /webhooks/ segment"))?;
    let _ = webhooks;

    let webhook_id = segments.next().ok_or_else(|| err("webhook_url missing webhook id"))?;
    let webhook_token = segments.next().ok_or_else(|| err("webhook_url missing webhook token"))?;

    Ok(format!("discord://{webhook_id}/{webhook_token}"))
}

/// Slack incoming webhook. `slack://{tokenA}/{tokenB}/{tokenC}`, extracted
/// from the native `/services/{a}/{b}/{c}` URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    pub webhook_url: String,
}

pub fn slack_to_delivery_url(config: &SlackConfig) -> Result<String, ConvertError> {
    let parsed = parse_url(&config.webhook_url)?;
    let mut segments = parsed
        .path_segments()
        .ok_or_else(|| err("webhook_url has no path"))?
        .filter(|s| !s.is_empty());

    segments
        .by_ref()
        .find(|s| *s == "services")
        .ok_or_else(|| err("webhook_url missing /services/ segment"))?;

    let (Some(a), Some(b), Some(c)) = (segments.next(), segments.next(), segments.next()) else {
        return Err(err("webhook_url must carry three webhook path segments"));
    };

    Ok(format!("slack://{a}/{b}/{c}"))
}

/// The typed config record `CreateIntegration` accepts per integration type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IntegrationConfig {
    Gotify(GotifyConfig),
    Email(EmailConfig),
    Ntfy(NtfyConfig),
    Discord(DiscordConfig),
    Slack(SlackConfig),
}

impl IntegrationConfig {
    pub fn to_delivery_url(&self) -> Result<String, ConvertError> {
        match self {
            IntegrationConfig::Gotify(c) => gotify_to_delivery_url(c),
            IntegrationConfig::Email(c) => email_to_delivery_url(c),
            IntegrationConfig::Ntfy(c) => ntfy_to_delivery_url(c),
            IntegrationConfig::Discord(c) => discord_to_delivery_url(c),
            IntegrationConfig::Slack(c) => slack_to_delivery_url(c),
        }
    }

    /// Matches `IntegrationType`'s `strum` `snake_case` rendering; kept as a
    /// plain string here so this crate doesn't have to depend on `soonish-db`
    /// for one enum.
    pub fn type_name(&self) -> &'static str {
        match self {
            IntegrationConfig::Gotify(_) => "gotify",
            IntegrationConfig::Email(_) => "email",
            IntegrationConfig::Ntfy(_) => "ntfy",
            IntegrationConfig::Discord(_) => "discord",
            IntegrationConfig::Slack(_) => "slack",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gotify_uses_tls_scheme_from_https_server_url() {
        let url = gotify_to_delivery_url(&GotifyConfig {
            server_url: "https://gotify.example.com".into(),
            token: "AbCdEf".into(),
            priority: None,
        })
        .unwrap();
        assert_eq!(url, "gotifys://gotify.example.com/AbCdEf");
    }

    #[test]
    fn gotify_plain_http_and_non_default_priority() {
        let url = gotify_to_delivery_url(&GotifyConfig {
            server_url: "http://gotify.example.com".into(),
            token: "tok".into(),
            priority: Some("high".into()),
        })
        .unwrap();
        assert_eq!(url, "gotify://gotify.example.com/tok?priority=high");
    }

    #[test]
    fn gotify_rejects_empty_token() {
        let result = gotify_to_delivery_url(&GotifyConfig {
            server_url: "https://gotify.example.com".into(),
            token: "  ".into(),
            priority: None,
        });
        assert!(result.is_err());
    }

    #[test]
    fn email_starttls_vs_implicit_tls_scheme() {
        let plain = email_to_delivery_url(&EmailConfig {
            smtp_host: "smtp.example.com".into(),
            smtp_port: 587,
            smtp_user: "alice".into(),
            smtp_password: "hunter2".into(),
            from_email: "alice@example.com".into(),
            to_email: "bob@example.com".into(),
            use_tls: false,
        })
        .unwrap();
        assert!(plain.starts_with("mailto://"));

        let tls = email_to_delivery_url(&EmailConfig {
            smtp_host: "smtp.example.com".into(),
            smtp_port: 465,
            smtp_user: "alice".into(),
            smtp_password: "hunter2".into(),
            from_email: "alice@example.com".into(),
            to_email: "bob@example.com".into(),
            use_tls: true,
        })
        .unwrap();
        assert!(tls.starts_with("mailtos://"));
        assert!(tls.contains("to=bob%40example.com"));
    }

    #[test]
    fn ntfy_omits_default_priority() {
        let url = ntfy_to_delivery_url(&NtfyConfig {
            server_url: "https://ntfy.sh".into(),
            topic: "alerts".into(),
            priority: Some("default".into()),
        })
        .unwrap();
        assert_eq!(url, "ntfy://ntfy.sh/alerts");
    }

    #[test]
    fn discord_extracts_id_and_token_from_webhook_url() {
        let url = discord_to_delivery_url(&DiscordConfig {
            webhook_url: "https://discord.com/api/webhooks/123456/abcDEF".into(),
        })
        .unwrap();
        assert_eq!(url, "discord://123456/abcDEF");
    }

    #[test]
    fn discord_rejects_url_without_webhooks_segment() {
        let result = discord_to_delivery_url(&DiscordConfig {
            webhook_url: "https://discord.com/api/not-a-webhook".into(),
        });
        assert!(result.is_err());
    }

    #[test]
    fn slack_extracts_three_tokens_from_webhook_url() {
        let url = slack_to_delivery_url(&SlackConfig {
            webhook_url: "https://hooks.slack.com/services/T000/B000/XXXXXXXXXXXX".into(),
        })
        .unwrap();
        assert_eq!(url, "slack://T000/B000/XXXXXXXXXXXX");
    }

    #[test]
    fn slack_rejects_incomplete_token_path() {
        let result = slack_to_delivery_url(&SlackConfig {
            webhook_url: "https://hooks.slack.com/services/T000/B000".into(),
        });
        assert!(result.is_err());
    }

    #[test]
    fn integration_config_dispatches_to_the_right_converter() {
        let config = IntegrationConfig::Slack(SlackConfig {
            webhook_url: "https://hooks.slack.com/services/T0/B0/C0".into(),
        });
        assert_eq!(config.type_name(), "slack");
        assert_eq!(config.to_delivery_url().unwrap(), "slack://T0/B0/C0");
    }
}

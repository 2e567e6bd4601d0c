use serde::Serialize;

use crate::drivers::{classify_status, http_client, transport_error};
use crate::{Driver, ErrorKind, Level, SendError, SendOutcome};

/// `discord://{webhook_id}/{webhook_token}`, extracted by the converter from
/// the native `/webhooks/{id}/{token}` URL (integration_converters.py).
pub struct DiscordDriver;

#[derive(Serialize)]
struct DiscordMessage<'a> {
    content: String,
    username: &'a str,
}

#[async_trait::async_trait]
impl Driver for DiscordDriver {
    async fn send(
        &self,
        delivery_url: &str,
        title: &str,
        body: &str,
        _level: Level,
    ) -> Result<SendOutcome, SendError> {
        let parsed = url::Url::parse(delivery_url).map_err(|e| SendError {
            kind: ErrorKind::Transport,
            message: format!("invalid discord url: {e}"),
        })?;

        let mut segments = parsed
            .path_segments()
            .ok_or_else(|| SendError {
                kind: ErrorKind::Transport,
                message: "discord url has no path".into(),
            })?
            .filter(|s| !s.is_empty());

        let webhook_id = segments.next().ok_or_else(|| SendError {
            kind: ErrorKind::Transport,
            message: "discord url missing webhook id".into(),
        })?;
        let webhook_token = segments.next().ok_or_else(|| SendError {
            kind: ErrorKind::Transport,
            message: "discord url missing webhook token".into(),
        })?;

        let endpoint = format!("https://discord.com/api/webhooks/{webhook_id}/{webhook_token}");

        let response = http_client()
            .post(endpoint)
            .json(&DiscordMessage {
                content: format!("**{title}**\n{body}"),
                username: "Soonish",
            })
            .send()
            .await
            .map_err(transport_error)?;

        if let Some(err) = classify_status(response.status()) {
            return Err(err);
        }

        Ok(SendOutcome {
            channel_name: "discord".into(),
        })
    }
}

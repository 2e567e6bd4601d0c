use serde::Serialize;

use crate::drivers::{classify_status, http_client, transport_error};
use crate::{Driver, ErrorKind, Level, SendError, SendOutcome};

/// `gotify://host/token` or `gotifys://host/token[?priority=N]`
/// (confirmed wire shape: `original_source/src/api/services/integration_converters.py`).
pub struct GotifyDriver {
    tls: bool,
}

impl GotifyDriver {
    pub fn new(tls: bool) -> Self {
        Self { tls }
    }
}

#[derive(Serialize)]
struct GotifyMessage<'a> {
    title: &'a str,
    message: &'a str,
    priority: u8,
}

#[async_trait::async_trait]
impl Driver for GotifyDriver {
    async fn send(
        &self,
        delivery_url: &str,
        title: &str,
        body: &str,
        level: Level,
    ) -> Result<SendOutcome, SendError> {
        let parsed = url::Url::parse(delivery_url).map_err(|e| SendError {
            kind: ErrorKind::Transport,
            message: format!("invalid gotify url: {e}"),
        })?;

        let host = parsed.host_str().ok_or_else(|| SendError {
            kind: ErrorKind::Transport,
            message: "gotify url missing host".into(),
        })?;

        let token = parsed.path().trim_start_matches('/');
        if token.is_empty() {
            return Err(SendError {
                kind: ErrorKind::Transport,
                message: "gotify url missing token".into(),
            });
        }

        let priority = parsed
            .query_pairs()
            .find(|(k, _)| k == "priority")
            .and_then(|(_, v)| v.parse::<u8>().ok())
            .unwrap_or_else(|| level.gotify_priority());

        let scheme = if self.tls { "https" } else { "http" };
        let endpoint = format!("{scheme}://{host}/message?token={token}");

        let response = http_client()
            .post(endpoint)
            .json(&GotifyMessage {
                title,
                message: body,
                priority,
            })
            .send()
            .await
            .map_err(transport_error)?;

        if let Some(err) = classify_status(response.status()) {
            return Err(err);
        }

        Ok(SendOutcome {
            channel_name: "gotify".into(),
        })
    }
}

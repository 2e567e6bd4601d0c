use serde::Serialize;

use crate::drivers::{classify_status, http_client, transport_error};
use crate::{Driver, ErrorKind, Level, SendError, SendOutcome};

/// `slack://{tokenA}/{tokenB}/{tokenC}`, extracted from the native
/// `/services/{a}/{b}/{c}` webhook URL (integration_converters.py).
pub struct SlackDriver;

#[derive(Serialize)]
struct SlackMessage {
    text: String,
}

#[async_trait::async_trait]
impl Driver for SlackDriver {
    async fn send(
        &self,
        delivery_url: &str,
        title: &str,
        body: &str,
        _level: Level,
    ) -> Result<SendOutcome, SendError> {
        let parsed = url::Url::parse(delivery_url).map_err(|e| SendError {
            kind: ErrorKind::Transport,
            message: format!("invalid slack url: {e}"),
        })?;

        let mut segments = parsed
            .path_segments()
            .ok_or_else(|| SendError {
                kind: ErrorKind::Transport,
                message: "slack url has no path".into(),
            })?
            .filter(|s| !s.is_empty());

        let (Some(a), Some(b), Some(c)) = (segments.next(), segments.next(), segments.next())
        else {
            return Err(SendError {
                kind: ErrorKind::Transport,
                message: "slack url must carry three webhook path segments".into(),
            });
        };

        let endpoint = format!("https://hooks.slack.com/services/{a}/{b}/{c}");

        let response = http_client()
            .post(endpoint)
            .json(&SlackMessage {
                text: format!("*{title}*\n{body}"),
            })
            .send()
            .await
            .map_err(transport_error)?;

        if let Some(err) = classify_status(response.status()) {
            return Err(err);
        }

        Ok(SendOutcome {
            channel_name: "slack".into(),
        })
    }
}

use crate::drivers::{classify_status, http_client, transport_error};
use crate::{Driver, ErrorKind, Level, SendError, SendOutcome};

/// `ntfy://host/topic[?priority=]` (original_source integration_converters.py).
pub struct NtfyDriver;

#[async_trait::async_trait]
impl Driver for NtfyDriver {
    async fn send(
        &self,
        delivery_url: &str,
        title: &str,
        body: &str,
        level: Level,
    ) -> Result<SendOutcome, SendError> {
        let parsed = url::Url::parse(delivery_url).map_err(|e| SendError {
            kind: ErrorKind::Transport,
            message: format!("invalid ntfy url: {e}"),
        })?;

        let host = parsed.host_str().ok_or_else(|| SendError {
            kind: ErrorKind::Transport,
            message: "ntfy url missing host".into(),
        })?;

        let topic = parsed.path().trim_start_matches('/');
        if topic.is_empty() {
            return Err(SendError {
                kind: ErrorKind::Transport,
                message: "ntfy url missing topic".into(),
            });
        }

        let priority = match level {
            Level::Info => "3",
            Level::Warning => "4",
            Level::Critical => "5",
        };

        let endpoint = format!("https://{host}/{topic}");

        let response = http_client()
            .post(endpoint)
            .header("Title", title)
            .header("Priority", priority)
            .body(body.to_string())
            .send()
            .await
            .map_err(transport_error)?;

        if let Some(err) = classify_status(response.status()) {
            return Err(err);
        }

        Ok(SendOutcome {
            channel_name: "ntfy".into(),
        })
    }
}

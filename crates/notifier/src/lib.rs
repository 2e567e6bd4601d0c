//! Pluggable notification delivery backends keyed by URL scheme.
//!
//! Mirrors the original service's Apprise-style "one opaque URL per channel"
//! abstraction: a `delivery_url` carries everything a driver needs, so the
//! dispatcher never has to know the shape of a gotify token vs. a Slack
//! webhook.

pub mod converters;
mod discord;
mod drivers;
mod email;
mod gotify;
mod ntfy;
mod slack;

use std::collections::HashMap;
use std::time::Duration;

pub use drivers::Level;
pub use email::EmailDriver;

/// Per-send timeout (§4.4); drivers must not exceed it and must not retry.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Auth,
    TargetRejected,
    Timeout,
}

#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub channel_name: String,
}

#[derive(Debug, Clone)]
pub struct SendError {
    pub kind: ErrorKind,
    pub message: String,
}

impl std::fmt::Display for SendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for SendError {}

/// A Notifier backend for one URL scheme. Implementations must enforce
/// [`SEND_TIMEOUT`] internally and must never retry (§4.4) — retries are the
/// dispatcher's concern.
#[async_trait::async_trait]
pub trait Driver: Send + Sync {
    async fn send(
        &self,
        delivery_url: &str,
        title: &str,
        body: &str,
        level: Level,
    ) -> Result<SendOutcome, SendError>;
}

/// Scheme registry populated once at startup and treated as immutable
/// afterward (§5 Shared-resource policy / §9 process-wide state).
pub struct Registry {
    drivers: HashMap<&'static str, Box<dyn Driver>>,
}

impl Registry {
    pub fn new(email: email::EmailDriver) -> Self {
        let mut drivers: HashMap<&'static str, Box<dyn Driver>> = HashMap::new();
        drivers.insert("gotify", Box::new(gotify::GotifyDriver::new(false)));
        drivers.insert("gotifys", Box::new(gotify::GotifyDriver::new(true)));
        drivers.insert("ntfy", Box::new(ntfy::NtfyDriver));
        drivers.insert("discord", Box::new(discord::DiscordDriver));
        drivers.insert("slack", Box::new(slack::SlackDriver));
        drivers.insert("mailto", email.clone_boxed());
        drivers.insert("mailtos", email.clone_boxed());

        Self { drivers }
    }

    pub async fn send(
        &self,
        delivery_url: &str,
        title: &str,
        body: &str,
        level: Level,
    ) -> Result<SendOutcome, SendError> {
        let scheme = url::Url::parse(delivery_url)
            .map_err(|e| SendError {
                kind: ErrorKind::Transport,
                message: format!("invalid delivery url: {e}"),
            })?
            .scheme()
            .to_string();

        let driver = self.drivers.get(scheme.as_str()).ok_or_else(|| SendError {
            kind: ErrorKind::Transport,
            message: format!("no driver registered for scheme '{scheme}'"),
        })?;

        tokio::time::timeout(SEND_TIMEOUT, driver.send(delivery_url, title, body, level))
            .await
            .unwrap_or_else(|_| {
                Err(SendError {
                    kind: ErrorKind::Timeout,
                    message: format!("driver for scheme '{scheme}' timed out"),
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_scheme_is_rejected_without_touching_the_network() {
        let registry = Registry::new(EmailDriver);
        let err = registry
            .send("xmpp://example.com/foo", "t", "b", Level::Info)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Transport);
    }

    #[tokio::test]
    async fn malformed_url_is_rejected() {
        let registry = Registry::new(EmailDriver);
        let err = registry
            .send("not a url", "t", "b", Level::Info)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Transport);
    }
}

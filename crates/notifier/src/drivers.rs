use crate::{ErrorKind, SendError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warning,
    Critical,
}

impl Level {
    /// Gotify's priority scale (0-10); warnings ring louder than info, a
    /// cancellation rings loudest.
    pub fn gotify_priority(self) -> u8 {
        match self {
            Level::Info => 3,
            Level::Warning => 5,
            Level::Critical => 8,
        }
    }
}

pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(crate::SEND_TIMEOUT)
        .build()
        .expect("reqwest client builds with a static config")
}

pub(crate) fn classify_status(status: reqwest::StatusCode) -> Option<SendError> {
    if status.is_success() {
        return None;
    }

    let kind = if status.as_u16() == 401 || status.as_u16() == 403 {
        ErrorKind::Auth
    } else if status.as_u16() == 404 || status.as_u16() == 410 {
        ErrorKind::TargetRejected
    } else {
        ErrorKind::Transport
    };

    Some(SendError {
        kind,
        message: format!("unexpected status {status}"),
    })
}

pub(crate) fn transport_error(e: reqwest::Error) -> SendError {
    let kind = if e.is_timeout() {
        ErrorKind::Timeout
    } else {
        ErrorKind::Transport
    };

    SendError {
        kind,
        message: e.to_string(),
    }
}

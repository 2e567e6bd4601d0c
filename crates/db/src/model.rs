use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub password_hash: Option<String>,
    pub is_verified: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct Event {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub start_date: i64,
    pub end_date: Option<i64>,
    pub timezone: String,
    pub location: Option<String>,
    pub is_public: bool,
    pub organizer_user_id: String,
    pub workflow_id: String,
    pub is_cancelled: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum IntegrationType {
    Gotify,
    Email,
    Ntfy,
    Discord,
    Slack,
}

#[derive(Debug, Clone, FromRow)]
pub struct Integration {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub tag: String,
    pub is_active: bool,
    #[sqlx(rename = "type")]
    pub kind: sqlx::types::Text<IntegrationType>,
    pub delivery_url: Vec<u8>,
    pub config: Vec<u8>,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct Subscription {
    pub id: String,
    pub event_id: String,
    pub user_id: String,
    pub created_at: i64,
    pub selectors: Vec<SubscriptionSelector>,
    pub reminder_offsets: Vec<i64>,
}

#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionSelector {
    pub id: String,
    pub subscription_id: String,
    pub integration_id: Option<String>,
    pub tag: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionReminder {
    pub id: String,
    pub subscription_id: String,
    pub offset_seconds: i64,
}

/// A `Subscription` joined with its owning `User` and that user's `Integration`s,
/// the shape C3 needs without a second round-trip (§4.2 `by_event`).
#[derive(Debug, Clone)]
pub struct SubscriptionWithUser {
    pub subscription: Subscription,
    pub user: User,
    pub integrations: Vec<Integration>,
}

#[derive(Debug, Clone, FromRow)]
pub struct UnsubscribeToken {
    pub token: String,
    pub subscription_id: String,
    pub created_at: i64,
    pub used_at: Option<i64>,
    pub expires_at: i64,
}

impl UnsubscribeToken {
    pub fn is_valid(&self, now: i64) -> bool {
        self.used_at.is_none() && self.expires_at > now
    }
}

/// A single pending or fired timer (§4.1 C1). `payload` is opaque JSON the
/// caller round-trips unchanged; the scheduler never interprets it.
#[derive(Debug, Clone, FromRow)]
pub struct Schedule {
    pub id: String,
    pub trigger_at: i64,
    pub payload: String,
    pub fired_at: Option<i64>,
    pub created_at: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct EventInvitation {
    pub id: String,
    pub token: String,
    pub event_id: String,
    pub email: String,
    pub invited_by_user_id: String,
    pub created_at: i64,
    pub used_at: Option<i64>,
    pub expires_at: i64,
}

impl EventInvitation {
    pub fn is_valid(&self, now: i64) -> bool {
        self.used_at.is_none() && self.expires_at > now
    }
}

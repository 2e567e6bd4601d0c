use std::sync::Arc;
use std::time::Duration;

use evento::Executor;
use serde::{Deserialize, Serialize};
use soonish_db::repository;
use soonish_dispatch::Dispatcher;
use soonish_notifier::Level;
use soonish_scheduler::{Fire, ReminderPayload};
use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::command::Command;

const MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_secs(2);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Payload for the synthetic end-of-event timer a workflow schedules
/// alongside its reminders when the event has an `end_date` (§4.8 Active,
/// branch a: `now() >= end_date`). Distinguished from [`ReminderPayload`]
/// by shape: deserializing one as the other fails on a missing field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionPayload {
    pub workflow_id: String,
}

pub fn completion_schedule_id(workflow_id: &str) -> String {
    format!("{workflow_id}-complete")
}

/// Routes C1 timer firings to either C7 (reminder) or C8-completion
/// handling, and is the single [`Fire`] implementation the root binary
/// registers with the sweep job — both kinds of timer share one schedule
/// namespace and one sweep cadence.
pub struct WorkflowFire<E: Executor + Clone> {
    pool: SqlitePool,
    dispatcher: Arc<Dispatcher>,
    command: Command<E>,
}

impl<E: Executor + Clone> WorkflowFire<E> {
    pub fn new(pool: SqlitePool, dispatcher: Arc<Dispatcher>, command: Command<E>) -> Self {
        Self { pool, dispatcher, command }
    }

    /// C7 Reminder Task (§4.7).
    async fn fire_reminder(&self, payload: &ReminderPayload) {
        let Ok(Some(event)) = repository::event::by_id(&self.pool, &payload.event_id).await else {
            tracing::warn!(event_id = %payload.event_id, "event_not_found, reminder not sent");
            return;
        };

        let (title, body) = compose_reminder(&event.name, payload.offset_seconds, event.location.as_deref(), event.start_date);

        let mut attempt = 0;
        let mut backoff = INITIAL_BACKOFF;

        loop {
            attempt += 1;
            match self
                .dispatcher
                .dispatch_to_subscription(&payload.subscription_id, &title, &body, Level::Warning)
                .await
            {
                Ok(report) => {
                    tracing::info!(
                        subscription_id = %payload.subscription_id,
                        success = report.success,
                        failed = report.failed,
                        "reminder dispatched"
                    );
                    return;
                }
                Err(err) if err.is_transient() && attempt < MAX_ATTEMPTS => {
                    tracing::warn!(err = %err, attempt, "reminder dispatch failed, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
                Err(err) => {
                    tracing::error!(err = %err, subscription_id = %payload.subscription_id, "reminder dispatch failed permanently");
                    return;
                }
            }
        }
    }

    /// C8 natural termination (§4.8 Active, branch a).
    async fn fire_completion(&self, payload: &CompletionPayload) {
        if let Err(err) = self.command.complete(&payload.workflow_id).await {
            tracing::error!(err = %err, workflow_id = %payload.workflow_id, "workflow completion failed");
        }
    }
}

#[async_trait::async_trait]
impl<E: Executor + Clone> Fire for WorkflowFire<E> {
    async fn fire(&self, _schedule_id: &str, payload: &str) {
        if let Ok(reminder) = serde_json::from_str::<ReminderPayload>(payload) {
            self.fire_reminder(&reminder).await;
            return;
        }

        if let Ok(completion) = serde_json::from_str::<CompletionPayload>(payload) {
            self.fire_completion(&completion).await;
            return;
        }

        tracing::error!(payload, "schedule payload matched neither reminder nor completion shape");
    }
}

fn compose_reminder(name: &str, offset_seconds: i64, location: Option<&str>, start_date: i64) -> (String, String) {
    let when = if offset_seconds >= 86_400 {
        format!("in {} day(s)", offset_seconds / 86_400)
    } else if offset_seconds >= 3_600 {
        format!("in {} hour(s)", offset_seconds / 3_600)
    } else {
        format!("in {} minute(s)", offset_seconds.max(0) / 60)
    };

    let title = format!("Reminder: {name} {when}");
    let mut body = format!("{name} starts {when}.");

    if let Some(location) = location {
        body.push_str(&format!("\nLocation: {location}"));
    }

    if let Ok(start) = OffsetDateTime::from_unix_timestamp(start_date) {
        body.push_str(&format!("\nStarts at: {start}"));
    }

    (title, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_reminder_picks_the_coarsest_matching_unit() {
        let (title, body) = compose_reminder("Launch Party", 90_000, None, 1_700_000_000);
        assert!(title.contains("day(s)"));
        assert!(body.contains("Launch Party starts in 1 day(s)"));

        let (title, _) = compose_reminder("Launch Party", 7_200, None, 1_700_000_000);
        assert!(title.contains("hour(s)"));

        let (title, _) = compose_reminder("Launch Party", 300, None, 1_700_000_000);
        assert!(title.contains("minute(s)"));
    }

    #[test]
    fn compose_reminder_appends_location_when_present() {
        let (_, body) = compose_reminder("Launch Party", 3_600, Some("HQ Rooftop"), 1_700_000_000);
        assert!(body.contains("Location: HQ Rooftop"));
    }
}

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use soonish_db::repository;
use soonish_shared::Result;
use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::timer::Timer;

/// What a fired reminder schedule's payload carries; C7 deserializes this
/// to know which event/subscription/offset fired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderPayload {
    pub event_id: String,
    pub subscription_id: String,
    pub offset_seconds: i64,
}

/// Deterministic id used both to create and to cancel a schedule (§4.6):
/// re-issuing `create_for` for the same (event, subscription, offset)
/// collides with the existing row and is a no-op.
pub fn schedule_id(event_id: &str, subscription_id: &str, offset_seconds: i64) -> String {
    format!("event-{event_id}-sub-{subscription_id}-reminder-{offset_seconds}s")
}

/// C6 Reminder Schedule Registry: translates `(event, start_date, offsets)`
/// into concrete C1 timers.
pub struct ReminderRegistry {
    pool: SqlitePool,
    timer: Timer,
}

impl ReminderRegistry {
    pub fn new(pool: SqlitePool) -> Self {
        let timer = Timer::new(pool.clone());
        Self { pool, timer }
    }

    /// For each `(subscription, offset)` pair, schedules `start_date - offset`.
    /// Triggers already in the past are skipped with a logged warning rather
    /// than firing immediately — a reminder for "15 minutes before" an event
    /// that already started is meaningless. Returns the effective schedule
    /// ids (the ones actually created or already present).
    pub async fn create_for(
        &self,
        event_id: &str,
        start_date: i64,
        offsets_by_subscription: &HashMap<String, Vec<i64>>,
    ) -> Result<Vec<String>> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let mut effective = vec![];

        for (subscription_id, offsets) in offsets_by_subscription {
            for &offset_seconds in offsets {
                let trigger_at = start_date - offset_seconds;

                if trigger_at <= now {
                    tracing::warn!(
                        event_id,
                        subscription_id,
                        offset_seconds,
                        trigger_at,
                        "reminder trigger is already in the past, skipping"
                    );
                    continue;
                }

                let id = schedule_id(event_id, subscription_id, offset_seconds);
                let payload = serde_json::to_string(&ReminderPayload {
                    event_id: event_id.to_string(),
                    subscription_id: subscription_id.clone(),
                    offset_seconds,
                })
                .map_err(|e| soonish_shared::Error::Server(anyhow::anyhow!(e)))?;

                self.timer
                    .schedule_at(&id, OffsetDateTime::from_unix_timestamp(trigger_at)?, &payload)
                    .await?;

                effective.push(id);
            }
        }

        Ok(effective)
    }

    /// Cancels every schedule belonging to `event_id`, used when the event's
    /// `start_date` changes (delete then recreate the full set) or when the
    /// event reaches a terminal state (§4.6, §4.8).
    pub async fn delete_for(&self, event_id: &str) -> Result<Vec<String>> {
        repository::schedule::cancel_prefix(&self.pool, &format!("event-{event_id}-")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::query(
            "CREATE TABLE schedule (id TEXT PRIMARY KEY, trigger_at BIGINT NOT NULL, payload TEXT NOT NULL, fired_at BIGINT, created_at BIGINT NOT NULL)",
        )
        .execute(&pool)
        .await
        .unwrap();
        pool
    }

    #[test]
    fn schedule_id_is_deterministic() {
        assert_eq!(schedule_id("e1", "s1", 3600), "event-e1-sub-s1-reminder-3600s");
    }

    #[tokio::test]
    async fn past_triggers_are_skipped_not_fired_immediately() {
        let pool = test_pool().await;
        let registry = ReminderRegistry::new(pool.clone());
        let now = OffsetDateTime::now_utc().unix_timestamp();

        let mut offsets = HashMap::new();
        offsets.insert("sub-1".to_string(), vec![3600]);

        let created = registry.create_for("e1", now - 1_000, &offsets).await.unwrap();
        assert!(created.is_empty());
    }

    #[tokio::test]
    async fn create_for_is_idempotent_across_reruns() {
        let pool = test_pool().await;
        let registry = ReminderRegistry::new(pool.clone());
        let start_date = OffsetDateTime::now_utc().unix_timestamp() + 86_400;

        let mut offsets = HashMap::new();
        offsets.insert("sub-1".to_string(), vec![3600, 86_400]);

        let first = registry.create_for("e1", start_date, &offsets).await.unwrap();
        let second = registry.create_for("e1", start_date, &offsets).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn delete_for_only_touches_its_own_event() {
        let pool = test_pool().await;
        let registry = ReminderRegistry::new(pool.clone());
        let start_date = OffsetDateTime::now_utc().unix_timestamp() + 86_400;

        let mut offsets = HashMap::new();
        offsets.insert("sub-1".to_string(), vec![3600]);
        registry.create_for("e1", start_date, &offsets).await.unwrap();
        registry.create_for("e2", start_date, &offsets).await.unwrap();

        let cancelled = registry.delete_for("e1").await.unwrap();
        assert_eq!(cancelled.len(), 1);
        assert!(cancelled[0].starts_with("event-e1-"));

        let still_there = repository::schedule::by_id(
            &pool,
            &schedule_id("e2", "sub-1", 3600),
        )
        .await
        .unwrap();
        assert!(still_there.is_some());
    }
}

use std::sync::Arc;

use soonish_db::repository;
use soonish_shared::Result;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Receives a schedule's id and opaque payload when its timer fires (§4.1 C1).
#[async_trait::async_trait]
pub trait Fire: Send + Sync {
    async fn fire(&self, schedule_id: &str, payload: &str);
}

/// Durable timer primitive. Schedules live in the `schedule` table rather
/// than in memory, so a process restart never loses a pending reminder; a
/// sweep job polls for due-and-unfired rows on a short cadence so a
/// late-starting process still fires promptly instead of waiting out a
/// missed tick.
pub struct Timer {
    pool: SqlitePool,
}

impl Timer {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Idempotent: a duplicate `id` is a no-op (§4.6), so replaying
    /// `create_for` after a partial failure never double-schedules.
    pub async fn schedule_at(&self, id: &str, trigger_at: OffsetDateTime, payload: &str) -> Result<bool> {
        repository::schedule::create_if_absent(&self.pool, id, trigger_at.unix_timestamp(), payload).await
    }

    /// Best-effort; cancelling an id that doesn't exist (already fired, or
    /// never created) is not an error (§4.6 `delete_for`).
    pub async fn cancel(&self, id: &str) -> Result<bool> {
        repository::schedule::cancel(&self.pool, id).await
    }

    /// Registers the sweep job on `scheduler`. `interval_seconds` bounds
    /// how late a fired timer can run behind its trigger time.
    pub async fn start_sweep(
        &self,
        scheduler: &JobScheduler,
        fire: Arc<dyn Fire>,
        interval_seconds: u64,
    ) -> std::result::Result<(), JobSchedulerError> {
        let pool = self.pool.clone();
        let cron = format!("1/{interval_seconds} * * * * *");

        scheduler
            .add(Job::new_async(cron.as_str(), move |uuid, mut l| {
                let pool = pool.clone();
                let fire = fire.clone();

                Box::pin(async move {
                    if let Err(err) = sweep_once(&pool, fire.as_ref()).await {
                        tracing::error!(err = %err, "schedule sweep failed");
                    }

                    if let Err(err) = l.next_tick_for_job(uuid).await {
                        tracing::error!(err = %err, "failed to get next tick for schedule sweep");
                    }
                })
            })?)
            .await?;

        Ok(())
    }
}

/// One sweep pass: fire every due-and-unfired schedule, then mark it fired.
/// Split out from `start_sweep` so a `reminders sweep-once` CLI command (or
/// a test) can drive it directly without a live `JobScheduler`.
pub async fn sweep_once(pool: &SqlitePool, fire: &dyn Fire) -> Result<usize> {
    let now = OffsetDateTime::now_utc().unix_timestamp();
    let due = repository::schedule::due(pool, now).await?;

    for schedule in &due {
        fire.fire(&schedule.id, &schedule.payload).await;
        repository::schedule::mark_fired(pool, &schedule.id, now).await?;
    }

    Ok(due.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct RecordingFire {
        count: AtomicUsize,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl Fire for RecordingFire {
        async fn fire(&self, schedule_id: &str, _payload: &str) {
            self.count.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(schedule_id.to_string());
        }
    }

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

    #[tokio::test]
    async fn sweep_fires_due_schedules_exactly_once() {
        let pool = test_pool().await;
        let timer = Timer::new(pool.clone());
        let now = OffsetDateTime::now_utc();

        timer.schedule_at("due-1", now - time::Duration::seconds(5), "p1").await.unwrap();
        timer.schedule_at("not-due", now + time::Duration::seconds(3600), "p2").await.unwrap();

        let fire = Arc::new(RecordingFire {
            count: AtomicUsize::new(0),
            seen: Mutex::new(vec![]),
        });

        let fired = sweep_once(&pool, fire.as_ref()).await.unwrap();
        assert_eq!(fired, 1);
        assert_eq!(fire.seen.lock().unwrap().as_slice(), ["due-1"]);

        let fired_again = sweep_once(&pool, fire.as_ref()).await.unwrap();
        assert_eq!(fired_again, 0);
        assert_eq!(fire.count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn duplicate_schedule_at_is_a_noop() {
        let pool = test_pool().await;
        let timer = Timer::new(pool.clone());
        let now = OffsetDateTime::now_utc();

        assert!(timer.schedule_at("dup", now, "first").await.unwrap());
        assert!(!timer.schedule_at("dup", now, "second").await.unwrap());
    }

    #[tokio::test]
    async fn cancel_missing_schedule_is_not_an_error() {
        let pool = test_pool().await;
        let timer = Timer::new(pool.clone());
        assert!(!timer.cancel("never-existed").await.unwrap());
    }
}

use evento::{Executor, LoadResult};
use soonish_db::model;
use soonish_db::repository;
use soonish_shared::{Metadata, Result};
use sqlx::SqlitePool;

use crate::aggregate::EventWorkflow;
use crate::events::{Cancelled, EventUpdated, ParticipantAdded, Started};

/// Fields carried by an `event_updated` signal (§4.8). Only `start_date` is
/// meaningful to the workflow itself; the rest is informational for the
/// broadcast body.
#[derive(Debug, Clone, Default)]
pub struct EventUpdateFields {
    pub name: Option<String>,
    pub start_date: Option<i64>,
}

/// The three signals C9 accepts on behalf of C8 (§4.8 Active state).
#[derive(Debug, Clone)]
pub enum Signal {
    ParticipantAdded { subscription_id: String },
    EventUpdated(EventUpdateFields),
    CancelEvent,
}

/// `query_status`'s return shape (§4.9): workflow-local flags plus the
/// live event row, since the aggregate itself only tracks what the
/// workflow needs to reconcile schedules, not the full event record.
#[derive(Debug, Clone)]
pub struct StatusView {
    pub event_id: String,
    pub is_cancelled: bool,
    pub is_terminal: bool,
    pub event_data: Option<model::Event>,
}

/// C9 Orchestration Facade. Thin: every operation either commits a single
/// event to the `EventWorkflow` aggregate or reads its folded state: the
/// actual C6/C5 coordination work happens in the reactive subscription
/// handlers in [`crate::side_effects`], never here.
#[derive(Clone)]
pub struct Command<E: Executor + Clone>(pub E, pub SqlitePool);

impl<E: Executor + Clone> Command<E> {
    pub async fn load(&self, workflow_id: impl Into<String>) -> std::result::Result<Option<LoadResult<EventWorkflow>>, evento::ReadError> {
        evento::load_optional(&self.0, workflow_id).await
    }

    /// Start(Initializing) (§4.8). Looks up the event in C2 once; an absent
    /// event still produces a workflow instance, just one that lands
    /// directly in `Terminal(missing)` so `query_status` has something to
    /// report instead of a bare not-found.
    pub async fn start_event(&self, event_id: &str, workflow_id: &str) -> Result<()> {
        let event = repository::event::by_id(&self.1, event_id).await?;
        let found = event.is_some();
        let start_date = event.as_ref().map(|e| e.start_date);
        let end_date = event.as_ref().and_then(|e| e.end_date);

        let mut builder = evento::aggregator(workflow_id)
            .metadata(&Metadata::by(event_id.to_string()))
            .to_owned();

        builder.event(&Started {
            event_id: event_id.to_string(),
            start_date,
            end_date,
            found,
        });

        builder.commit(&self.0).await?;

        Ok(())
    }

    /// Applies one signal (§4.8). Signals arriving after termination are
    /// dropped silently — re-delivery of an already-handled signal, or one
    /// that lost the race with termination, is not an error.
    pub async fn signal(&self, workflow_id: &str, signal: Signal) -> Result<()> {
        let Some(loaded) = self.load(workflow_id).await? else {
            soonish_shared::not_found!("workflow {workflow_id}");
        };

        if loaded.item.is_terminal() {
            tracing::debug!(workflow_id, "signal dropped, workflow already terminal");
            return Ok(());
        }

        let event_id = loaded.item.event_id.clone();
        let previous_start_date = loaded.item.start_date;

        match signal {
            Signal::ParticipantAdded { subscription_id } => {
                evento::save_with(loaded)
                    .data(&ParticipantAdded {
                        event_id,
                        subscription_id,
                        start_date: previous_start_date,
                    })?
                    .metadata(&Metadata::by(workflow_id.to_string()))?
                    .commit(&self.0)
                    .await?;
            }
            Signal::EventUpdated(fields) => {
                let start_date_changed = matches!(
                    (fields.start_date, previous_start_date),
                    (Some(new), prev) if Some(new) != prev
                );

                evento::save_with(loaded)
                    .data(&EventUpdated {
                        event_id,
                        start_date: fields.start_date,
                        start_date_changed,
                    })?
                    .metadata(&Metadata::by(workflow_id.to_string()))?
                    .commit(&self.0)
                    .await?;
            }
            Signal::CancelEvent => {
                evento::save_with(loaded)
                    .data(&Cancelled { event_id })?
                    .metadata(&Metadata::by(workflow_id.to_string()))?
                    .commit(&self.0)
                    .await?;
            }
        }

        Ok(())
    }

    /// `query_status` (§4.9): reflects the most recent durable state, not a
    /// live re-derivation of whether the event has since changed again.
    pub async fn query_status(&self, workflow_id: &str) -> Result<Option<StatusView>> {
        let Some(loaded) = self.load(workflow_id).await? else {
            return Ok(None);
        };

        let event_data = repository::event::by_id(&self.1, &loaded.item.event_id).await?;

        Ok(Some(StatusView {
            event_id: loaded.item.event_id,
            is_cancelled: loaded.item.is_cancelled(),
            is_terminal: loaded.item.is_terminal(),
            event_data,
        }))
    }

    /// Forces termination outside of the normal `cancel_event` signal path,
    /// e.g. an operator-triggered shutdown. Idempotent: terminating an
    /// already-terminal workflow is a no-op.
    pub async fn terminate(&self, workflow_id: &str) -> Result<()> {
        self.signal(workflow_id, Signal::CancelEvent).await
    }

    /// Natural termination once `now() >= end_date` (§4.8 Active, branch a).
    /// Not one of the three externally-signalled transitions, so it lives
    /// outside `signal()`; driven by [`crate::fire::WorkflowFire`] off the
    /// same C1 timer infrastructure as reminders.
    pub async fn complete(&self, workflow_id: &str) -> Result<()> {
        let Some(loaded) = self.load(workflow_id).await? else {
            soonish_shared::not_found!("workflow {workflow_id}");
        };

        if loaded.item.is_terminal() {
            return Ok(());
        }

        let event_id = loaded.item.event_id.clone();

        evento::save_with(loaded)
            .data(&crate::events::Completed { event_id })?
            .metadata(&Metadata::by(workflow_id.to_string()))?
            .commit(&self.0)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use evento::migrator::{Migrate, Plan};
    use soonish_db::repository::event::CreateInput;
    use sqlx::SqlitePool;

    use super::*;

    async fn test_state() -> (Command<evento::Sqlite>, SqlitePool) {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        soonish_db::migrator::<sqlx::Sqlite>()
            .unwrap()
            .run(&mut *conn, &Plan::apply_all())
            .await
            .unwrap();
        drop(conn);

        let executor: evento::Sqlite = pool.clone().into();
        (Command(executor, pool.clone()), pool)
    }

    async fn insert_event(pool: &SqlitePool, start_date: i64) -> (String, String) {
        soonish_db::repository::event::create(
            pool,
            CreateInput {
                name: "Launch Party".to_string(),
                description: None,
                start_date,
                end_date: Some(start_date + 3_600),
                timezone: "UTC".to_string(),
                location: None,
                is_public: true,
                organizer_user_id: "user-1".to_string(),
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn start_event_with_present_event_goes_active() {
        let (command, pool) = test_state().await;
        let (event_id, workflow_id) = insert_event(&pool, 1_700_000_000).await;

        command.start_event(&event_id, &workflow_id).await.unwrap();

        let status = command.query_status(&workflow_id).await.unwrap().unwrap();
        assert_eq!(status.event_id, event_id);
        assert!(!status.is_terminal);
        assert!(!status.is_cancelled);
        assert!(status.event_data.is_some());
    }

    #[tokio::test]
    async fn start_event_with_missing_event_goes_terminal_missing() {
        let (command, _pool) = test_state().await;

        command.start_event("no-such-event", "workflow-missing").await.unwrap();

        let status = command.query_status("workflow-missing").await.unwrap().unwrap();
        assert!(status.is_terminal);
        assert!(!status.is_cancelled);
    }

    #[tokio::test]
    async fn query_status_is_none_for_unknown_workflow() {
        let (command, _pool) = test_state().await;
        assert!(command.query_status("never-started").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cancel_signal_marks_terminal_and_cancelled() {
        let (command, pool) = test_state().await;
        let (event_id, workflow_id) = insert_event(&pool, 1_700_000_000).await;
        command.start_event(&event_id, &workflow_id).await.unwrap();

        command.signal(&workflow_id, Signal::CancelEvent).await.unwrap();

        let status = command.query_status(&workflow_id).await.unwrap().unwrap();
        assert!(status.is_terminal);
        assert!(status.is_cancelled);
    }

    #[tokio::test]
    async fn signal_after_terminal_is_dropped_not_an_error() {
        let (command, pool) = test_state().await;
        let (event_id, workflow_id) = insert_event(&pool, 1_700_000_000).await;
        command.start_event(&event_id, &workflow_id).await.unwrap();
        command.signal(&workflow_id, Signal::CancelEvent).await.unwrap();

        let result = command
            .signal(
                &workflow_id,
                Signal::ParticipantAdded { subscription_id: "sub-1".to_string() },
            )
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn signal_on_unknown_workflow_errors() {
        let (command, _pool) = test_state().await;

        let result = command.signal("never-started", Signal::CancelEvent).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn terminate_is_idempotent() {
        let (command, pool) = test_state().await;
        let (event_id, workflow_id) = insert_event(&pool, 1_700_000_000).await;
        command.start_event(&event_id, &workflow_id).await.unwrap();

        command.terminate(&workflow_id).await.unwrap();
        command.terminate(&workflow_id).await.unwrap();

        let status = command.query_status(&workflow_id).await.unwrap().unwrap();
        assert!(status.is_terminal);
    }

    #[tokio::test]
    async fn complete_is_idempotent_and_marks_terminal() {
        let (command, pool) = test_state().await;
        let (event_id, workflow_id) = insert_event(&pool, 1_700_000_000).await;
        command.start_event(&event_id, &workflow_id).await.unwrap();

        command.complete(&workflow_id).await.unwrap();
        command.complete(&workflow_id).await.unwrap();

        let status = command.query_status(&workflow_id).await.unwrap().unwrap();
        assert!(status.is_terminal);
        assert!(!status.is_cancelled);
    }
}

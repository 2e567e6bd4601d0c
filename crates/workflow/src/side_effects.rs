//! Reactive coordination of C6/C5 from committed C8 events (§4.8). Commands
//! in [`crate::command`] only ever persist one event each; everything the
//! workflow actually *does* — reconciling schedules, broadcasting — happens
//! here once that event is durable, mirroring the teacher's
//! command/subscription split used throughout the corpus.

use std::collections::HashMap;
use std::sync::Arc;

use evento::subscription::{Context, SubscriptionBuilder};
use evento::Executor;
use soonish_db::repository;
use soonish_dispatch::Dispatcher;
use soonish_notifier::Level;
use soonish_scheduler::{ReminderRegistry, Timer};
use soonish_shared::Event;
use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::events::{Cancelled, Completed, EventUpdated, ParticipantAdded, Started};
use crate::fire::{completion_schedule_id, CompletionPayload};

pub fn subscription<E: Executor>() -> SubscriptionBuilder<E> {
    SubscriptionBuilder::new("workflow-command")
        .handler(handle_started())
        .handler(handle_participant_added())
        .handler(handle_event_updated())
        .handler(handle_cancelled())
        .handler(handle_completed())
}

async fn full_offsets(pool: &SqlitePool, event_id: &str) -> anyhow::Result<HashMap<String, Vec<i64>>> {
    let subscriptions = repository::subscription::by_event(pool, event_id).await?;
    Ok(subscriptions
        .into_iter()
        .map(|with_user| (with_user.subscription.id, with_user.subscription.reminder_offsets))
        .collect())
}

/// Start(Initializing) -> Active (§4.8). Builds the full reminder schedule
/// set from current subscriber truth. This is a *mandatory* activity: its
/// failure propagates and fails the workflow rather than being swallowed.
#[evento::sub_handler]
async fn handle_started<E: Executor>(context: &Context<'_, E>, event: Event<Started>) -> anyhow::Result<()> {
    if !event.data.found {
        return Ok(());
    }

    let Some(start_date) = event.data.start_date else {
        return Ok(());
    };

    let pool = context.extract::<SqlitePool>();
    let reminders = context.extract::<Arc<ReminderRegistry>>();
    let timer = context.extract::<Arc<Timer>>();

    let offsets = full_offsets(&pool, &event.data.event_id).await?;
    reminders.create_for(&event.data.event_id, start_date, &offsets).await?;

    const DEFAULT_WAIT_SECONDS: i64 = 365 * 24 * 3_600;
    let deadline = event.data.end_date.unwrap_or(start_date + DEFAULT_WAIT_SECONDS);
    let payload = serde_json::to_string(&CompletionPayload {
        workflow_id: event.aggregator_id.clone(),
    })?;
    timer
        .schedule_at(
            &completion_schedule_id(&event.aggregator_id),
            OffsetDateTime::from_unix_timestamp(deadline)?,
            &payload,
        )
        .await?;

    Ok(())
}

/// Signal `participant_added` (§4.8): incremental, singleton-map
/// `create_for`. Never broadcasts and never sends a welcome notification.
#[evento::sub_handler]
async fn handle_participant_added<E: Executor>(
    context: &Context<'_, E>,
    event: Event<ParticipantAdded>,
) -> anyhow::Result<()> {
    let Some(start_date) = event.data.start_date else {
        return Ok(());
    };

    let pool = context.extract::<SqlitePool>();
    let reminders = context.extract::<Arc<ReminderRegistry>>();

    let Some(subscription) = repository::subscription::by_id(&pool, &event.data.subscription_id).await? else {
        tracing::warn!(subscription_id = %event.data.subscription_id, "participant_added for unknown subscription");
        return Ok(());
    };

    let mut offsets = HashMap::new();
    offsets.insert(subscription.id, subscription.reminder_offsets);
    reminders.create_for(&event.data.event_id, start_date, &offsets).await?;

    Ok(())
}

/// Signal `event_updated` (§4.8): conditional schedule rebuild, then an
/// unconditional broadcast. The broadcast failing is logged and swallowed;
/// it is explicitly named non-critical.
#[evento::sub_handler]
async fn handle_event_updated<E: Executor>(context: &Context<'_, E>, event: Event<EventUpdated>) -> anyhow::Result<()> {
    let pool = context.extract::<SqlitePool>();
    let reminders = context.extract::<Arc<ReminderRegistry>>();
    let dispatcher = context.extract::<Arc<Dispatcher>>();

    if event.data.start_date_changed {
        if let Some(start_date) = event.data.start_date {
            reminders.delete_for(&event.data.event_id).await?;
            let offsets = full_offsets(&pool, &event.data.event_id).await?;
            reminders.create_for(&event.data.event_id, start_date, &offsets).await?;
        }
    }

    let name = repository::event::by_id(&pool, &event.data.event_id)
        .await?
        .map(|e| e.name)
        .unwrap_or_else(|| event.data.event_id.clone());

    if let Err(err) = dispatcher
        .dispatch_to_event(
            &event.data.event_id,
            &format!("Event Updated: {name}"),
            "Details for this event have changed.",
            Level::Info,
            None,
        )
        .await
    {
        tracing::error!(err = %err, event_id = %event.data.event_id, "event_updated broadcast failed");
    }

    Ok(())
}

/// Signal `cancel_event` (§4.8): critical broadcast, mark cancelled in C2,
/// then best-effort schedule cleanup.
#[evento::sub_handler]
async fn handle_cancelled<E: Executor>(context: &Context<'_, E>, event: Event<Cancelled>) -> anyhow::Result<()> {
    let pool = context.extract::<SqlitePool>();
    let reminders = context.extract::<Arc<ReminderRegistry>>();
    let dispatcher = context.extract::<Arc<Dispatcher>>();
    let timer = context.extract::<Arc<Timer>>();

    if let Err(err) = dispatcher
        .dispatch_to_event(
            &event.data.event_id,
            "Event Cancelled",
            "This event has been cancelled by the organizer.",
            Level::Critical,
            None,
        )
        .await
    {
        tracing::error!(err = %err, event_id = %event.data.event_id, "cancellation broadcast failed");
    }

    repository::event::mark_cancelled(&pool, &event.data.event_id).await?;

    if let Err(err) = reminders.delete_for(&event.data.event_id).await {
        tracing::error!(err = %err, event_id = %event.data.event_id, "schedule cleanup on cancel failed");
    }

    if let Err(err) = timer.cancel(&completion_schedule_id(&event.aggregator_id)).await {
        tracing::error!(err = %err, event_id = %event.data.event_id, "completion timer cleanup on cancel failed");
    }

    Ok(())
}

/// Natural termination (§4.8 Active, branch a). Schedule cleanup only;
/// there is no broadcast on ordinary completion.
#[evento::sub_handler]
async fn handle_completed<E: Executor>(context: &Context<'_, E>, event: Event<Completed>) -> anyhow::Result<()> {
    let reminders = context.extract::<Arc<ReminderRegistry>>();

    if let Err(err) = reminders.delete_for(&event.data.event_id).await {
        tracing::error!(err = %err, event_id = %event.data.event_id, "schedule cleanup on completion failed");
    }

    Ok(())
}

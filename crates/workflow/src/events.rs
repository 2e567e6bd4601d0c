//! Events persisted by the C8 event lifecycle workflow aggregate.

use bincode::{Decode, Encode};
use evento::AggregatorName;

/// Start(Initializing) (§4.8). `found = false` means the event was already
/// gone by the time the workflow started, sending it straight to
/// `Terminal(missing)` without ever reconciling schedules.
#[derive(AggregatorName, Encode, Decode)]
pub struct Started {
    pub event_id: String,
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
    pub found: bool,
}

/// Signal `participant_added` (§4.8). `start_date` is the workflow's
/// current value at the moment the signal landed, carried along so the
/// side-effect handler doesn't need a second aggregate read; the
/// subscription's own offsets are still re-read fresh from C2.
#[derive(AggregatorName, Encode, Decode)]
pub struct ParticipantAdded {
    pub event_id: String,
    pub subscription_id: String,
    pub start_date: Option<i64>,
}

/// Signal `event_updated` (§4.8). `start_date` is `Some` only when the
/// signal's fields included a new start_date; `start_date_changed` is
/// computed once at commit time by comparing against the aggregate's prior
/// value, so the handler doesn't have to re-derive it from history.
#[derive(AggregatorName, Encode, Decode)]
pub struct EventUpdated {
    pub event_id: String,
    pub start_date: Option<i64>,
    pub start_date_changed: bool,
}

/// Signal `cancel_event` (§4.8).
#[derive(AggregatorName, Encode, Decode)]
pub struct Cancelled {
    pub event_id: String,
}

/// Natural termination once `now() >= end_date` (§4.8 Active state, branch a).
#[derive(AggregatorName, Encode, Decode)]
pub struct Completed {
    pub event_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn participant_added_carries_subscription_and_start_date() {
        let event = ParticipantAdded {
            event_id: "e1".to_string(),
            subscription_id: "sub-1".to_string(),
            start_date: Some(1_700_000_000),
        };
        assert_eq!(event.subscription_id, "sub-1");
        assert!(event.start_date.is_some());
    }

    #[test]
    fn cancelled_and_completed_carry_only_the_event_id() {
        let cancelled = Cancelled { event_id: "e1".to_string() };
        let completed = Completed { event_id: "e1".to_string() };
        assert_eq!(cancelled.event_id, "e1");
        assert_eq!(completed.event_id, "e1");
    }
}

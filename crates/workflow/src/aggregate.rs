use bincode::{Decode, Encode};
use soonish_shared::Event;

use crate::events::{Cancelled, Completed, EventUpdated, ParticipantAdded, Started};

/// States in §4.8: `Initializing -> Active -> Terminal(completed|cancelled|missing)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum Status {
    Initializing,
    Active,
    Terminal,
}

impl Default for Status {
    fn default() -> Self {
        Status::Initializing
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum TerminalReason {
    Completed,
    Cancelled,
    Missing,
}

/// Folded state of one event's C8 workflow instance. `start_date` tracks the
/// most recently known value so signal handlers can decide whether a
/// `create_for`/`delete_for` reconciliation is needed without a separate C2
/// round trip for every signal.
#[derive(Default, Encode, Decode, Clone, Debug)]
pub struct EventWorkflow {
    pub event_id: String,
    pub start_date: Option<i64>,
    pub status: Status,
    pub terminal_reason: Option<TerminalReason>,
}

impl EventWorkflow {
    pub fn is_active(&self) -> bool {
        matches!(self.status, Status::Active)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, Status::Terminal)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.terminal_reason, Some(TerminalReason::Cancelled))
    }
}

#[evento::aggregator]
impl EventWorkflow {
    async fn handle_started(&mut self, event: Event<Started>) -> anyhow::Result<()> {
        self.event_id = event.data.event_id;
        self.start_date = event.data.start_date;

        if event.data.found {
            self.status = Status::Active;
        } else {
            self.status = Status::Terminal;
            self.terminal_reason = Some(TerminalReason::Missing);
        }

        Ok(())
    }

    async fn handle_participant_added(&mut self, _event: Event<ParticipantAdded>) -> anyhow::Result<()> {
        Ok(())
    }

    async fn handle_event_updated(&mut self, event: Event<EventUpdated>) -> anyhow::Result<()> {
        if let Some(start_date) = event.data.start_date {
            self.start_date = Some(start_date);
        }

        Ok(())
    }

    async fn handle_cancelled(&mut self, _event: Event<Cancelled>) -> anyhow::Result<()> {
        self.status = Status::Terminal;
        self.terminal_reason = Some(TerminalReason::Cancelled);

        Ok(())
    }

    async fn handle_completed(&mut self, _event: Event<Completed>) -> anyhow::Result<()> {
        self.status = Status::Terminal;
        self.terminal_reason = Some(TerminalReason::Completed);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_workflow_starts_initializing() {
        let workflow = EventWorkflow::default();
        assert_eq!(workflow.status, Status::Initializing);
        assert!(!workflow.is_active());
        assert!(!workflow.is_terminal());
        assert!(!workflow.is_cancelled());
    }

    #[test]
    fn is_active_only_true_in_active_status() {
        let mut workflow = EventWorkflow::default();
        workflow.status = Status::Active;
        assert!(workflow.is_active());
        assert!(!workflow.is_terminal());
    }

    #[test]
    fn is_cancelled_requires_cancelled_terminal_reason() {
        let mut workflow = EventWorkflow::default();
        workflow.status = Status::Terminal;
        workflow.terminal_reason = Some(TerminalReason::Missing);
        assert!(workflow.is_terminal());
        assert!(!workflow.is_cancelled());

        workflow.terminal_reason = Some(TerminalReason::Cancelled);
        assert!(workflow.is_cancelled());
    }

    #[test]
    fn started_event_carries_found_and_dates() {
        let event = Started {
            event_id: "e1".to_string(),
            start_date: Some(1_700_000_000),
            end_date: Some(1_700_003_600),
            found: true,
        };
        assert!(event.found);
        assert_eq!(event.start_date, Some(1_700_000_000));
    }

    #[test]
    fn event_updated_tracks_whether_start_date_changed() {
        let unchanged = EventUpdated {
            event_id: "e1".to_string(),
            start_date: None,
            start_date_changed: false,
        };
        assert!(!unchanged.start_date_changed);

        let changed = EventUpdated {
            event_id: "e1".to_string(),
            start_date: Some(1_700_000_000),
            start_date_changed: true,
        };
        assert!(changed.start_date_changed);
    }
}

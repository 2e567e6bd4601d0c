//! C7 reminder firing, C8 event lifecycle workflow, and the C9 facade over it.

mod aggregate;
mod command;
mod events;
mod fire;
mod side_effects;

pub use aggregate::{EventWorkflow, Status, TerminalReason};
pub use command::{Command, EventUpdateFields, Signal, StatusView};
pub use events::{Cancelled, Completed, EventUpdated, ParticipantAdded, Started};
pub use fire::{completion_schedule_id, CompletionPayload, WorkflowFire};
pub use side_effects::subscription;

//! C1 durable timer primitive and C6 reminder schedule registry built on it.

mod reminder_registry;
mod timer;

pub use reminder_registry::{schedule_id, ReminderPayload, ReminderRegistry};
pub use timer::{sweep_once, Fire, Timer};

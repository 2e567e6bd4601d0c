//! CLI subcommands, mirroring the teacher's `src/cli/*.rs` split.

mod migrate;
mod reminders;
mod reset;
mod serve;

pub use migrate::migrate;
pub use reminders::sweep_once;
pub use reset::reset;
pub use serve::serve;

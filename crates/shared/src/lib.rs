mod date;
mod error;
mod event;

pub use date::*;
pub use error::*;
pub use event::*;
use evento::Executor;

#[derive(Clone)]
pub struct State<E: Executor> {
    pub executor: E,
    pub read_db: sqlx::SqlitePool,
    pub write_db: sqlx::SqlitePool,
}

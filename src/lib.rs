//! Personal to-do lists: ranking of lists and tasks plus the SQL store behind them.

pub mod config;
pub mod database;
pub mod error;
pub mod gateway;
pub mod model;
pub mod ranking;
pub mod session;

pub use error::{PersistenceError, SqlResult};
pub use gateway::{Gateway, SqliteGateway};
pub use model::{ListId, ListKind, Task, TaskId, TodoList};
pub use ranking::{due_on_or_before, rank_lists, rank_tasks, task_priority};

//! Task list state and the operations that change it.
//!
//! - `TaskListState`: snapshot of the list plus the search query
//! - `TaskStore`: the remote document store holding tasks
//! - `TaskService`: loads, creates, and toggles tasks for the signed-in user,
//!   applying create and toggle optimistically

pub mod error;
pub mod service;
pub mod state;
pub mod store;

pub use error::TaskError;
pub use service::TaskService;
pub use state::{TaskCounts, TaskListState};
pub use store::TaskStore;

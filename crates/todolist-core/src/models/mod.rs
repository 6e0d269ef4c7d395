//! Data models for todolist entities.
//!
//! - `Task`, `TaskId`, `Priority`: the to-do items shown in the list
//! - `Document`, `FieldValue`: the typed-field document shape used by the store

pub mod document;
pub mod task;

pub use document::{Document, FieldValue};
pub use task::{Priority, Task, TaskId};

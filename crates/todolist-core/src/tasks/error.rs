use thiserror::Error;

use crate::api::ApiError;
use crate::models::TaskId;

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("You need to sign in first")]
    Unauthenticated,

    #[error("Task text is required")]
    EmptyText,

    #[error("No task with id {0}")]
    NotFound(TaskId),

    #[error("Task {0} is still being saved")]
    NotSynced(TaskId),

    #[error("Failed to fetch tasks")]
    FetchFailed(#[source] ApiError),

    #[error("Failed to add task")]
    CreateFailed(#[source] ApiError),

    #[error("Failed to update task")]
    UpdateFailed(#[source] ApiError),
}

use async_trait::async_trait;

use crate::api::ApiError;
use crate::models::{Task, TaskId};

/// Remote collection of task documents. Every call is made on behalf of
/// the session owning `token`.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// All tasks owned by `owner_id`
    async fn list_tasks(&self, token: &str, owner_id: &str) -> Result<Vec<Task>, ApiError>;

    /// Store a new task and return it with its server-assigned id
    async fn create_task(&self, token: &str, task: &Task) -> Result<Task, ApiError>;

    /// Partial update of the completion flag only
    async fn set_completed(&self, token: &str, id: &TaskId, completed: bool)
        -> Result<(), ApiError>;
}

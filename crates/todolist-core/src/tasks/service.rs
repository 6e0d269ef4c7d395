//! Task operations for the signed-in user.
//!
//! Create and toggle go through `optimistic::run`: the list changes at once
//! and is put back if the store rejects the change. Every operation needs a
//! current session and fails with `TaskError::Unauthenticated` otherwise.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{TaskError, TaskListState, TaskStore};
use crate::auth::{Session, SessionManager};
use crate::models::{Priority, Task, TaskId};
use crate::optimistic;

#[derive(Clone)]
pub struct TaskService {
    session: SessionManager,
    store: Arc<dyn TaskStore>,
    state: TaskListState,
}

impl TaskService {
    pub fn new(session: SessionManager, store: Arc<dyn TaskStore>, state: TaskListState) -> Self {
        Self {
            session,
            store,
            state,
        }
    }

    pub fn state(&self) -> &TaskListState {
        &self.state
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    fn require_session(&self) -> Result<Session, TaskError> {
        self.session.current().ok_or(TaskError::Unauthenticated)
    }

    /// Fetch the user's tasks and replace the list. Returns the task count.
    pub async fn load(&self) -> Result<usize, TaskError> {
        let session = self.require_session()?;

        let tasks = self
            .store
            .list_tasks(&session.access_token, &session.subject_id)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to fetch tasks");
                TaskError::FetchFailed(e)
            })?;

        let count = tasks.len();
        self.state.replace_all(tasks);
        debug!(count, "Tasks loaded");
        Ok(count)
    }

    /// Add a task. It shows up in the list under a temporary id right away
    /// and takes the store's id once the create succeeds.
    pub async fn add(&self, text: &str, priority: Priority) -> Result<Task, TaskError> {
        let session = self.require_session()?;

        let text = text.trim();
        if text.is_empty() {
            return Err(TaskError::EmptyText);
        }

        let draft = Task::draft(text, priority, &session.subject_id);
        let temp_id = draft.id.clone();

        let stored = optimistic::run(
            || self.state.push(draft.clone()),
            || self.state.remove(&temp_id),
            || self.store.create_task(&session.access_token, &draft),
        )
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to add task");
            TaskError::CreateFailed(e)
        })?;

        self.state.reconcile_id(&temp_id, &stored.id);
        info!(id = %stored.id, "Task added");

        Ok(Task {
            id: stored.id,
            ..draft
        })
    }

    /// Flip a task's completion. Reverts to the previous value if the store
    /// rejects the update.
    pub async fn toggle(&self, id: &TaskId) -> Result<Task, TaskError> {
        let session = self.require_session()?;

        let task = self
            .state
            .get(id)
            .ok_or_else(|| TaskError::NotFound(id.clone()))?;
        if id.is_temporary() {
            return Err(TaskError::NotSynced(id.clone()));
        }

        let previous = task.completed;
        let next = !previous;

        optimistic::run(
            || self.state.set_completed(id, next),
            || self.state.set_completed(id, previous),
            || self.store.set_completed(&session.access_token, id, next),
        )
        .await
        .map_err(|e| {
            warn!(error = %e, %id, "Failed to update task");
            TaskError::UpdateFailed(e)
        })?;

        debug!(%id, completed = next, "Task toggled");
        Ok(Task {
            completed: next,
            ..task
        })
    }

    /// Drop all tasks, e.g. after the session ended
    pub fn clear(&self) {
        self.state.clear();
        self.state.set_search_query("");
    }
}

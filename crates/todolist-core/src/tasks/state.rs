//! Observable task list.
//!
//! The list is held as an immutable snapshot (`Arc<Vec<Task>>`) in a `watch`
//! slot. Every change builds a new vector from the previous snapshot and
//! swaps it in, so readers never see a half-applied change.

use std::sync::Arc;

use tokio::sync::watch;

use crate::models::{Task, TaskId};
use crate::utils::{contains_ignore_case, normalize_query};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskCounts {
    pub open: usize,
    pub done: usize,
}

#[derive(Clone)]
pub struct TaskListState {
    tasks: Arc<watch::Sender<Arc<Vec<Task>>>>,
    query: Arc<watch::Sender<String>>,
}

impl Default for TaskListState {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskListState {
    pub fn new() -> Self {
        let (tasks, _) = watch::channel(Arc::new(Vec::new()));
        let (query, _) = watch::channel(String::new());
        Self {
            tasks: Arc::new(tasks),
            query: Arc::new(query),
        }
    }

    pub fn snapshot(&self) -> Arc<Vec<Task>> {
        self.tasks.borrow().clone()
    }

    /// Observe list changes. Dropping the receiver detaches.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Task>>> {
        self.tasks.subscribe()
    }

    /// Replace the list with `f(previous)`. `f` must not touch this state.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&[Task]) -> Vec<Task>,
    {
        self.tasks.send_modify(|current| {
            let next = f(current.as_slice());
            *current = Arc::new(next);
        });
    }

    pub fn replace_all(&self, tasks: Vec<Task>) {
        self.tasks.send_replace(Arc::new(tasks));
    }

    pub fn clear(&self) {
        self.replace_all(Vec::new());
    }

    pub fn get(&self, id: &TaskId) -> Option<Task> {
        self.tasks.borrow().iter().find(|t| &t.id == id).cloned()
    }

    pub fn push(&self, task: Task) {
        self.update(|prev| {
            let mut next = prev.to_vec();
            next.push(task);
            next
        });
    }

    pub fn remove(&self, id: &TaskId) {
        self.update(|prev| prev.iter().filter(|t| &t.id != id).cloned().collect());
    }

    pub fn set_completed(&self, id: &TaskId, completed: bool) {
        self.update(|prev| {
            prev.iter()
                .map(|t| {
                    if &t.id == id {
                        Task {
                            completed,
                            ..t.clone()
                        }
                    } else {
                        t.clone()
                    }
                })
                .collect()
        });
    }

    /// Swap a temporary id for the one the store assigned
    pub fn reconcile_id(&self, temp_id: &TaskId, stored_id: &TaskId) {
        self.update(|prev| {
            prev.iter()
                .map(|t| {
                    if &t.id == temp_id {
                        Task {
                            id: stored_id.clone(),
                            ..t.clone()
                        }
                    } else {
                        t.clone()
                    }
                })
                .collect()
        });
    }

    /// Set the search query. Stored trimmed and lower-cased.
    pub fn set_search_query(&self, query: &str) {
        self.query.send_replace(normalize_query(query));
    }

    pub fn search_query(&self) -> String {
        self.query.borrow().clone()
    }

    /// Tasks with the given completion state whose text matches the query
    pub fn filtered(&self, completed: bool) -> Vec<Task> {
        let query = self.search_query();
        self.snapshot()
            .iter()
            .filter(|t| t.completed == completed && contains_ignore_case(&t.text, &query))
            .cloned()
            .collect()
    }

    pub fn counts(&self) -> TaskCounts {
        let tasks = self.snapshot();
        let done = tasks.iter().filter(|t| t.completed).count();
        TaskCounts {
            open: tasks.len() - done,
            done,
        }
    }
}

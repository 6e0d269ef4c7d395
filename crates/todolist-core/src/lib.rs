//! Core library for todolist.
//!
//! This crate provides:
//! - `auth`: session lifecycle (sign in/up, restore, expiry timer, logout)
//! - `api`: REST client for the identity endpoint and the task document store
//! - `optimistic`: apply / remote call / compensate-on-failure executor
//! - `tasks`: task list state and the service that mutates it optimistically
//! - `config`: configuration file and environment overrides

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod optimistic;
pub mod tasks;
pub mod utils;

pub use api::{ApiClient, ApiError, Endpoints};
pub use auth::{
    AuthBackend, AuthError, AuthGrant, AuthMode, AuthRedirect, Credentials, LogoutReason, Route,
    Session, SessionManager, SessionStore,
};
pub use config::Config;
pub use models::{Priority, Task, TaskId};
pub use tasks::{TaskError, TaskListState, TaskService, TaskStore};

//! Authentication module for managing the signed-in user.
//!
//! This module provides:
//! - `SessionManager`: sign in/up, restore, single expiry timer, logout
//! - `Session`: the signed-in user with its token and expiry instant
//! - `SessionStore`: durable storage for the session (file or memory)
//! - `AuthBackend`: the identity endpoint the manager talks to
//! - `guard`: which screen to show given the current session

pub mod backend;
pub mod error;
pub mod guard;
pub mod manager;
pub mod session;
pub mod store;

pub use backend::{AuthBackend, AuthGrant, AuthMode, Credentials};
pub use error::AuthError;
pub use guard::{guard, Route};
pub use manager::{AuthRedirect, LogoutReason, SessionManager};
pub use session::Session;
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};

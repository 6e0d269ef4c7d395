//! REST client module for the identity and task document endpoints.
//!
//! `ApiClient` signs users in or up against the identity endpoint and
//! lists, creates, and updates task documents in the store. Store calls
//! carry the session's access token as a bearer token.

pub mod client;
pub mod error;

pub use client::{ApiClient, Endpoints};
pub use error::ApiError;

//! Optimistic updates with compensation.
//!
//! `run` applies a local change before the remote call is issued, so the
//! caller's state reflects it immediately. If the remote call fails the
//! compensating change is applied and the original error is returned.
//! Nothing is retried and the remote call is never cancelled from here.
//!
//! The caller is responsible for making `compensate` the exact inverse of
//! `apply` for the entity it touches.

use std::future::Future;

use tracing::debug;

/// Apply `apply`, await `remote_call`, and run `compensate` only if it failed.
///
/// Like any async fn, nothing runs until the returned future is first
/// polled: `apply` runs then, exactly once, before `remote_call` is invoked.
/// Await the call directly for the change to show at the call site.
/// `compensate` runs at most once, and only on failure, before the error is
/// returned. A successful result is returned unchanged.
pub async fn run<T, E, A, C, R, Fut>(apply: A, compensate: C, remote_call: R) -> Result<T, E>
where
    A: FnOnce(),
    C: FnOnce(),
    R: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    apply();

    match remote_call().await {
        Ok(value) => Ok(value),
        Err(e) => {
            debug!("Remote call failed, compensating local change");
            compensate();
            Err(e)
        }
    }
}

//! Session lifecycle: sign in/up, restore at startup, expiry, logout.
//!
//! The current session lives in a `watch` slot so any number of observers
//! can attach and detach freely. Sign-outs (explicit or by expiry) are
//! announced on a broadcast channel so the app can route back to the auth
//! screen. At most one expiry timer is armed; every armed timer carries a
//! generation number and only the current generation may end the session.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{AuthBackend, AuthError, AuthMode, Credentials, Session, SessionStore};

/// Buffer size for the redirect broadcast channel.
const REDIRECT_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    Requested,
    Expired,
}

/// Signal telling the app to return to the authentication screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthRedirect {
    pub reason: LogoutReason,
}

struct ExpiryTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

struct Inner {
    backend: Arc<dyn AuthBackend>,
    store: Box<dyn SessionStore>,
    current: watch::Sender<Option<Session>>,
    redirects: broadcast::Sender<AuthRedirect>,
    timer: Mutex<Option<ExpiryTimer>>,
    generation: AtomicU64,
}

impl Inner {
    fn lock_timer(&self) -> MutexGuard<'_, Option<ExpiryTimer>> {
        self.timer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn cancel_timer(&self) {
        if let Some(timer) = self.lock_timer().take() {
            timer.handle.abort();
            debug!(generation = timer.generation, "Expiry timer cancelled");
        }
    }

    /// Called from the timer task once its delay has elapsed
    fn expire(&self, generation: u64) {
        {
            let mut timer = self.lock_timer();
            match timer.as_ref() {
                Some(armed) if armed.generation == generation => {
                    // Detach rather than abort: this is the running task
                    timer.take();
                }
                _ => {
                    debug!(generation, "Ignoring stale expiry timer");
                    return;
                }
            }
        }
        info!("Session expired");
        self.end_session(LogoutReason::Expired);
    }

    fn end_session(&self, reason: LogoutReason) {
        self.current.send_replace(None);
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to delete stored session");
        }
        // No receivers just means nobody is listening for redirects
        let _ = self.redirects.send(AuthRedirect { reason });
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

/// Owns the current session and its expiry timer.
/// Clone is cheap and every clone refers to the same session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    pub fn new(backend: Arc<dyn AuthBackend>, store: Box<dyn SessionStore>) -> Self {
        let (current, _) = watch::channel(None);
        let (redirects, _) = broadcast::channel(REDIRECT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                backend,
                store,
                current,
                redirects,
                timer: Mutex::new(None),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Sign in or sign up. Issues exactly one request to the identity
    /// endpoint, or none when the credentials are rejected locally.
    pub async fn authenticate(
        &self,
        mode: AuthMode,
        credentials: &Credentials,
    ) -> Result<Session, AuthError> {
        credentials.validate()?;
        debug!(?mode, email = %credentials.email, "Authenticating");
        let grant = self.inner.backend.authenticate(mode, credentials).await?;
        let ttl = grant.expires_in_secs;

        let session = Session::from_grant(grant, Utc::now()).ok_or_else(|| {
            warn!(ttl, "Identity endpoint returned an unusable token lifetime");
            AuthError::Unknown
        })?;

        self.inner.current.send_replace(Some(session.clone()));
        self.arm_timer(Duration::from_secs(ttl.unsigned_abs()));

        if let Err(e) = self.inner.store.save(&session) {
            warn!(error = %e, "Failed to save session");
        }

        info!(subject = %session.subject_id, expires_at = %session.expires_at, "Signed in");
        Ok(session)
    }

    /// Republish a persisted session if it is still valid.
    /// Never fails: any problem reading the store means no session.
    /// Must be called from within a tokio runtime.
    pub fn restore(&self) -> bool {
        let stored = match self.inner.store.load() {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "Failed to load stored session");
                return false;
            }
        };

        let Some(session) = stored else {
            debug!("No stored session");
            return false;
        };

        match session.remaining() {
            Some(remaining) => {
                info!(subject = %session.subject_id, minutes_left = session.minutes_until_expiry(), "Session restored");
                self.inner.current.send_replace(Some(session));
                self.arm_timer(remaining);
                true
            }
            None => {
                debug!(expires_at = %session.expires_at, "Stored session already expired");
                if let Err(e) = self.inner.store.clear() {
                    warn!(error = %e, "Failed to delete expired session");
                }
                false
            }
        }
    }

    /// End the session and ask the app to show the auth screen.
    /// Safe to call with no active session.
    pub fn logout(&self) {
        self.inner.cancel_timer();
        if self.is_authenticated() {
            info!("Signed out");
        }
        self.inner.end_session(LogoutReason::Requested);
    }

    /// Arm the expiry timer, replacing any armed one.
    /// The slot stays locked until the new timer is stored, so the timer
    /// can never observe an older generation in it.
    fn arm_timer(&self, delay: Duration) {
        let mut slot = self.inner.lock_timer();
        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                inner.expire(generation);
            }
        });

        let previous = slot.replace(ExpiryTimer { generation, handle });
        drop(slot);
        if let Some(previous) = previous {
            previous.handle.abort();
            debug!(generation = previous.generation, "Replaced armed expiry timer");
        }
        debug!(generation, delay_secs = delay.as_secs(), "Expiry timer armed");
    }

    /// Snapshot of the current session
    pub fn current(&self) -> Option<Session> {
        self.inner.current.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.current.borrow().is_some()
    }

    /// Bearer token for store calls, if signed in
    pub fn access_token(&self) -> Option<String> {
        self.inner
            .current
            .borrow()
            .as_ref()
            .map(|s| s.access_token.clone())
    }

    /// Observe session changes. Dropping the receiver detaches.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.inner.current.subscribe()
    }

    /// Receive redirect-to-auth signals (logout and expiry)
    pub fn redirects(&self) -> broadcast::Receiver<AuthRedirect> {
        self.inner.redirects.subscribe()
    }

    pub fn has_armed_timer(&self) -> bool {
        self.inner.lock_timer().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::MemorySessionStore;
    use crate::auth::AuthGrant;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::broadcast::error::TryRecvError;

    struct FakeBackend {
        responses: Mutex<VecDeque<Result<AuthGrant, AuthError>>>,
        calls: AtomicUsize,
    }

    impl FakeBackend {
        fn new(responses: Vec<Result<AuthGrant, AuthError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl AuthBackend for FakeBackend {
        async fn authenticate(
            &self,
            _mode: AuthMode,
            _credentials: &Credentials,
        ) -> Result<AuthGrant, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(AuthError::Unknown))
        }
    }

    /// Store handle shared between the manager and the test
    #[derive(Clone, Default)]
    struct SharedStore(Arc<MemorySessionStore>);

    impl SessionStore for SharedStore {
        fn load(&self) -> anyhow::Result<Option<Session>> {
            self.0.load()
        }
        fn save(&self, session: &Session) -> anyhow::Result<()> {
            self.0.save(session)
        }
        fn clear(&self) -> anyhow::Result<()> {
            self.0.clear()
        }
    }

    struct BrokenStore;

    impl SessionStore for BrokenStore {
        fn load(&self) -> anyhow::Result<Option<Session>> {
            Err(anyhow::anyhow!("disk on fire"))
        }
        fn save(&self, _session: &Session) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("disk on fire"))
        }
        fn clear(&self) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("disk on fire"))
        }
    }

    fn grant(ttl: i64) -> AuthGrant {
        AuthGrant {
            subject_id: "uid-1".to_string(),
            access_token: "token-1".to_string(),
            email: "a@b.com".to_string(),
            expires_in_secs: ttl,
        }
    }

    fn creds() -> Credentials {
        Credentials::new("a@b.com", "secret1")
    }

    fn stored_session(expires_in: chrono::Duration) -> Session {
        Session {
            subject_id: "uid-9".to_string(),
            access_token: "stored-token".to_string(),
            email: "old@b.com".to_string(),
            expires_at: Utc::now() + expires_in,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_authenticate_publishes_persists_and_arms_timer() {
        let backend = FakeBackend::new(vec![Ok(grant(3600))]);
        let store = SharedStore::default();
        let manager = SessionManager::new(backend.clone(), Box::new(store.clone()));
        let observer = manager.subscribe();

        let before = Utc::now();
        let session = manager
            .authenticate(AuthMode::SignIn, &creds())
            .await
            .expect("sign in should succeed");
        let after = Utc::now();

        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert!(session.expires_at >= before + chrono::Duration::seconds(3600));
        assert!(session.expires_at <= after + chrono::Duration::seconds(3600));
        assert_eq!(observer.borrow().as_ref(), Some(&session));
        assert_eq!(store.load().unwrap(), Some(session));
        assert!(manager.has_armed_timer());
        assert_eq!(manager.access_token().as_deref(), Some("token-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_authenticate_leaves_no_session() {
        let backend = FakeBackend::new(vec![Err(AuthError::EmailExists)]);
        let store = SharedStore::default();
        let manager = SessionManager::new(backend, Box::new(store.clone()));

        let err = manager
            .authenticate(AuthMode::SignUp, &creds())
            .await
            .unwrap_err();

        assert_eq!(err, AuthError::EmailExists);
        assert!(!manager.is_authenticated());
        assert!(!manager.has_armed_timer());
        assert!(store.0.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_positive_ttl_is_rejected() {
        let manager = SessionManager::new(
            FakeBackend::new(vec![Ok(grant(0))]),
            Box::new(MemorySessionStore::new()),
        );
        let err = manager
            .authenticate(AuthMode::SignIn, &creds())
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::Unknown);
        assert!(manager.current().is_none());
        assert!(!manager.has_armed_timer());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrepresentable_ttl_is_rejected() {
        let manager = SessionManager::new(
            FakeBackend::new(vec![Ok(grant(i64::MAX))]),
            Box::new(MemorySessionStore::new()),
        );
        let err = manager
            .authenticate(AuthMode::SignIn, &creds())
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::Unknown);
        assert!(manager.current().is_none());
        assert!(!manager.has_armed_timer());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_credentials_never_reach_backend() {
        let backend = FakeBackend::new(vec![Ok(grant(3600))]);
        let manager = SessionManager::new(backend.clone(), Box::new(MemorySessionStore::new()));

        for mode in [AuthMode::SignIn, AuthMode::SignUp] {
            let err = manager
                .authenticate(mode, &Credentials::new("a@b.com", "12345"))
                .await
                .unwrap_err();
            assert_eq!(err, AuthError::PasswordTooShort);
        }
        let err = manager
            .authenticate(AuthMode::SignIn, &Credentials::new("  ", "secret1"))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::MissingCredentials);

        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        assert!(!manager.is_authenticated());

        manager
            .authenticate(AuthMode::SignUp, &Credentials::new("a@b.com", "123456"))
            .await
            .unwrap();
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_expires_after_ttl_with_single_redirect() {
        let store = SharedStore::default();
        let manager = SessionManager::new(
            FakeBackend::new(vec![Ok(grant(3600))]),
            Box::new(store.clone()),
        );
        let mut redirects = manager.redirects();

        manager
            .authenticate(AuthMode::SignIn, &creds())
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(3599)).await;
        tokio::task::yield_now().await;
        assert!(manager.is_authenticated());
        assert!(matches!(redirects.try_recv(), Err(TryRecvError::Empty)));

        tokio::time::advance(Duration::from_secs(1)).await;
        let redirect = tokio::time::timeout(Duration::from_secs(1), redirects.recv())
            .await
            .expect("expiry should fire")
            .unwrap();

        assert_eq!(redirect.reason, LogoutReason::Expired);
        assert!(!manager.is_authenticated());
        assert!(!manager.has_armed_timer());
        assert!(store.0.is_empty());

        tokio::time::advance(Duration::from_secs(7200)).await;
        tokio::task::yield_now().await;
        assert!(matches!(redirects.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reauthenticate_replaces_timer() {
        let manager = SessionManager::new(
            FakeBackend::new(vec![Ok(grant(100)), Ok(grant(1000))]),
            Box::new(MemorySessionStore::new()),
        );
        let mut redirects = manager.redirects();

        manager.authenticate(AuthMode::SignIn, &creds()).await.unwrap();
        manager.authenticate(AuthMode::SignIn, &creds()).await.unwrap();

        // The first timer would have fired here
        tokio::time::advance(Duration::from_secs(150)).await;
        tokio::task::yield_now().await;
        assert!(manager.is_authenticated());
        assert!(matches!(redirects.try_recv(), Err(TryRecvError::Empty)));

        tokio::time::advance(Duration::from_secs(850)).await;
        let redirect = tokio::time::timeout(Duration::from_secs(1), redirects.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(redirect.reason, LogoutReason::Expired);
        tokio::task::yield_now().await;
        assert!(matches!(redirects.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_is_idempotent() {
        let store = SharedStore::default();
        let manager = SessionManager::new(
            FakeBackend::new(vec![Ok(grant(3600))]),
            Box::new(store.clone()),
        );
        let mut redirects = manager.redirects();
        manager.authenticate(AuthMode::SignIn, &creds()).await.unwrap();

        manager.logout();
        assert!(manager.current().is_none());
        assert!(!manager.has_armed_timer());
        assert!(store.0.is_empty());

        manager.logout();
        assert!(manager.current().is_none());

        assert_eq!(redirects.recv().await.unwrap().reason, LogoutReason::Requested);
        assert_eq!(redirects.recv().await.unwrap().reason, LogoutReason::Requested);

        // A cancelled timer must not fire later
        tokio::time::advance(Duration::from_secs(4000)).await;
        tokio::task::yield_now().await;
        assert!(matches!(redirects.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_valid_session() {
        let stored = stored_session(chrono::Duration::minutes(10));
        let store = SharedStore(Arc::new(MemorySessionStore::with_session(&stored).unwrap()));
        let manager = SessionManager::new(FakeBackend::new(vec![]), Box::new(store));
        let mut redirects = manager.redirects();

        assert!(manager.restore());
        assert_eq!(manager.current(), Some(stored));
        assert!(manager.has_armed_timer());

        tokio::time::advance(Duration::from_secs(601)).await;
        let redirect = tokio::time::timeout(Duration::from_secs(1), redirects.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(redirect.reason, LogoutReason::Expired);
        assert!(manager.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_near_expiry_still_expires() {
        let stored = stored_session(chrono::Duration::milliseconds(5));
        let store = SharedStore(Arc::new(MemorySessionStore::with_session(&stored).unwrap()));
        let manager = SessionManager::new(FakeBackend::new(vec![]), Box::new(store.clone()));
        let mut redirects = manager.redirects();

        if !manager.restore() {
            // Wall clock passed the expiry before restore ran
            assert!(manager.current().is_none());
            return;
        }

        let redirect = tokio::time::timeout(Duration::from_secs(1), redirects.recv())
            .await
            .expect("near-expiry session should still expire")
            .unwrap();
        assert_eq!(redirect.reason, LogoutReason::Expired);
        assert!(manager.current().is_none());
        assert!(!manager.has_armed_timer());
        assert!(store.0.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_expired_session() {
        let stored = stored_session(chrono::Duration::minutes(-1));
        let store = SharedStore(Arc::new(MemorySessionStore::with_session(&stored).unwrap()));
        let manager = SessionManager::new(FakeBackend::new(vec![]), Box::new(store.clone()));

        assert!(!manager.restore());
        assert!(manager.current().is_none());
        assert!(!manager.has_armed_timer());
        assert!(store.0.is_empty());
    }

    #[tokio::test]
    async fn test_restore_degrades_silently() {
        let manager = SessionManager::new(FakeBackend::new(vec![]), Box::new(BrokenStore));
        assert!(!manager.restore());
        assert!(manager.current().is_none());

        let manager = SessionManager::new(
            FakeBackend::new(vec![]),
            Box::new(MemorySessionStore::new()),
        );
        assert!(!manager.restore());
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_failure_does_not_fail_sign_in() {
        let manager = SessionManager::new(FakeBackend::new(vec![Ok(grant(60))]), Box::new(BrokenStore));
        let session = manager.authenticate(AuthMode::SignIn, &creds()).await;
        assert!(session.is_ok());
        assert!(manager.is_authenticated());
        manager.logout();
        assert!(!manager.is_authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn test_detached_observer_has_no_effect() {
        let manager = SessionManager::new(
            FakeBackend::new(vec![Ok(grant(60))]),
            Box::new(MemorySessionStore::new()),
        );
        let observer = manager.subscribe();
        drop(observer);

        manager.authenticate(AuthMode::SignIn, &creds()).await.unwrap();
        assert!(manager.is_authenticated());
        assert!(manager.has_armed_timer());

        let mut late = manager.subscribe();
        assert!(late.borrow_and_update().is_some());
    }
}

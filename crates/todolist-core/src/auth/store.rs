//! Durable storage for the current session.
//!
//! A single key holds the serialized session: written on login, read at
//! startup, deleted on logout.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};

use super::Session;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

pub trait SessionStore: Send + Sync {
    /// Read the stored session, if any. Expiry is not checked here.
    fn load(&self) -> Result<Option<Session>>;

    fn save(&self, session: &Session) -> Result<()>;

    /// Remove the stored session. Clearing an empty store is not an error.
    fn clear(&self) -> Result<()>;
}

/// Stores the session as JSON in the cache directory.
pub struct FileSessionStore {
    cache_dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<Session>> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
        let session: Session =
            serde_json::from_str(&contents).context("Failed to parse session file")?;
        Ok(Some(session))
    }

    fn save(&self, session: &Session) -> Result<()> {
        let path = self.session_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(session)?;
        std::fs::write(path, contents).context("Failed to write session file")?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path).context("Failed to delete session file")?;
        }
        Ok(())
    }
}

/// In-process store holding the serialized session, for tests and
/// for running without a writable cache directory.
#[derive(Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with a session, as if written by an earlier run
    pub fn with_session(session: &Session) -> Result<Self> {
        let store = Self::new();
        store.save(session)?;
        Ok(store)
    }

    pub fn is_empty(&self) -> bool {
        self.slot.lock().map(|slot| slot.is_none()).unwrap_or(true)
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<Session>> {
        let slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("Session store lock poisoned"))?;
        match slot.as_deref() {
            Some(contents) => Ok(Some(
                serde_json::from_str(contents).context("Failed to parse stored session")?,
            )),
            None => Ok(None),
        }
    }

    fn save(&self, session: &Session) -> Result<()> {
        let contents = serde_json::to_string(session)?;
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("Session store lock poisoned"))?;
        *slot = Some(contents);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("Session store lock poisoned"))?;
        *slot = None;
        Ok(())
    }
}

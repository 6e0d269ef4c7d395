use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::AuthGrant;

/// The signed-in user. Replaced as a whole, never edited in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub subject_id: String,
    pub access_token: String,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Build a session from a grant issued at `now`.
    /// Returns None when the grant carries no usable lifetime: zero,
    /// negative, or too large to represent as a timestamp.
    pub fn from_grant(grant: AuthGrant, now: DateTime<Utc>) -> Option<Self> {
        if grant.expires_in_secs <= 0 {
            return None;
        }
        let ttl = Duration::try_seconds(grant.expires_in_secs)?;
        let expires_at = now.checked_add_signed(ttl)?;
        Some(Self {
            subject_id: grant.subject_id,
            access_token: grant.access_token,
            email: grant.email,
            expires_at,
        })
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    pub fn time_until_expiry(&self) -> Duration {
        self.expires_at - Utc::now()
    }

    /// Remaining lifetime as a timer duration, None once expired
    pub fn remaining(&self) -> Option<std::time::Duration> {
        self.time_until_expiry()
            .to_std()
            .ok()
            .filter(|d| !d.is_zero())
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        self.time_until_expiry().num_minutes().max(0)
    }
}

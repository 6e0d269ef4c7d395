use std::fmt;

use async_trait::async_trait;

use super::AuthError;

/// Shortest password accepted before contacting the identity endpoint
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    SignIn,
    SignUp,
}

impl AuthMode {
    /// Action name on the identity endpoint
    pub fn endpoint(&self) -> &'static str {
        match self {
            AuthMode::SignIn => "signInWithPassword",
            AuthMode::SignUp => "signUp",
        }
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Local checks applied to both sign-in and sign-up
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::PasswordTooShort);
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// What the identity endpoint hands back on success
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthGrant {
    pub subject_id: String,
    pub access_token: String,
    pub email: String,
    pub expires_in_secs: i64,
}

/// Identity endpoint used by the session manager.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn authenticate(
        &self,
        mode: AuthMode,
        credentials: &Credentials,
    ) -> Result<AuthGrant, AuthError>;
}

use thiserror::Error;

use super::backend::MIN_PASSWORD_LEN;

/// Authentication failures, already phrased for the person at the keyboard.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("This email already exists!")]
    EmailExists,

    #[error("Invalid email or password.")]
    InvalidCredentials,

    #[error("This email address is not valid.")]
    InvalidEmail,

    #[error("No account found for this email.")]
    EmailNotFound,

    #[error("This password is not correct.")]
    InvalidPassword,

    #[error("Email and password are required.")]
    MissingCredentials,

    #[error("Password must be at least {} characters.", MIN_PASSWORD_LEN)]
    PasswordTooShort,

    #[error("An unknown error occurred!")]
    Unknown,
}

impl AuthError {
    /// Classify an identity endpoint error code. Unrecognized codes fall
    /// through to `Unknown`.
    pub fn from_code(code: &str) -> Self {
        match code {
            "EMAIL_EXISTS" => AuthError::EmailExists,
            "INVALID_LOGIN_CREDENTIALS" => AuthError::InvalidCredentials,
            "INVALID_EMAIL" => AuthError::InvalidEmail,
            "EMAIL_NOT_FOUND" => AuthError::EmailNotFound,
            "INVALID_PASSWORD" => AuthError::InvalidPassword,
            _ => AuthError::Unknown,
        }
    }
}

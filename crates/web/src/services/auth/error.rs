//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] gomflow_core::EmailError),

    /// Wrong email or password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Account exists but its email is not confirmed yet.
    #[error("email not confirmed")]
    EmailNotConfirmed,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// OAuth provider not offered on this site.
    #[error("unsupported sign-in provider: {0}")]
    UnsupportedProvider(String),

    /// The auth provider returned a user without an email.
    #[error("identity has no email address")]
    MissingEmail,

    /// Session state missing or invalid (e.g. no PKCE verifier).
    #[error("invalid session state")]
    InvalidSessionState,

    /// HTTP request to the auth provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The auth provider rejected the request.
    #[error("auth provider error: {status} - {message}")]
    Provider { status: u16, message: String },

    /// Client could not be configured.
    #[error("configuration error: {0}")]
    Config(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

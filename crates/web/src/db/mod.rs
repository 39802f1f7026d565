//! Database operations for GOMFLOW `PostgreSQL`.
//!
//! ## Tables (schema `gomflow`)
//!
//! - `profile` - One row per hosted-auth identity, with the GOM flag
//! - `group_order` - GOM listings with MOQ, deadline and running count
//! - `submission` - Buyer and guest commitments against an order
//! - `tower_sessions.session` - Session storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/web/migrations/` and run via:
//! ```bash
//! cargo run -p gomflow-cli -- migrate
//! ```
//!
//! Queries are built at runtime with `sqlx::query_as` and `FromRow` row
//! types, so the crate builds without a live database.

pub mod orders;
pub mod profiles;
pub mod submissions;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use orders::OrderRepository;
pub use profiles::ProfileRepository;
pub use submissions::{CreatedSubmission, SubmissionRepository};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation or a conditional write that matched nothing.
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A generated public code collided with an existing one.
    #[error("duplicate code: {0}")]
    DuplicateCode(String),
}

impl RepositoryError {
    /// Map an insert error, turning a unique violation on a code column into
    /// `DuplicateCode` and any other unique violation into `Conflict`.
    pub(crate) fn from_insert(e: sqlx::Error, code_constraint: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            if db_err.constraint() == Some(code_constraint) {
                return Self::DuplicateCode(code_constraint.to_owned());
            }
            return Self::Conflict(db_err.message().to_owned());
        }
        Self::Database(e)
    }

    /// Whether a retry with a freshly generated code may succeed.
    #[must_use]
    pub const fn is_duplicate_code(&self) -> bool {
        matches!(self, Self::DuplicateCode(_))
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    pool_options().connect(database_url.expose_secret()).await
}

/// Create a pool that connects on first use.
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL cannot be parsed.
pub fn create_lazy_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    pool_options().connect_lazy(database_url.expose_secret())
}

fn pool_options() -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_duplicate_code_is_retryable() {
        assert!(RepositoryError::DuplicateCode("submission_tracking_code_key".into()).is_duplicate_code());
        assert!(!RepositoryError::Conflict("x".into()).is_duplicate_code());
        assert!(!RepositoryError::NotFound.is_duplicate_code());
    }

    #[test]
    fn test_non_database_errors_map_to_database() {
        let err = RepositoryError::from_insert(sqlx::Error::RowNotFound, "group_order_shareable_slug_key");
        assert!(matches!(err, RepositoryError::Database(_)));
    }
}

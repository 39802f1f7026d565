//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Sign-in through the hosted auth provider, profile provisioning
//! - `codes` - Insert-with-retry for slugs and tracking codes
//! - `lifecycle` - Order status checks, expiry sweep, GOM close
//! - `listings` - Order creation and GOM order views
//! - `intake` - Submission intake and GOM submission management
//! - `tracking` - Tracking-code lookup
//! - `storage` - Object storage for payment proofs and product images

pub mod auth;
pub mod codes;
pub mod intake;
pub mod lifecycle;
pub mod listings;
pub mod storage;
pub mod tracking;

use thiserror::Error;

use crate::db::RepositoryError;
use crate::models::{OrderInputError, SubmissionInputError};

use codes::UniqueCodeError;
use storage::StorageError;

/// Errors shared by the order, submission and tracking services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The entity does not exist, or the caller may not see it.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The caller is signed in but does not own the entity.
    #[error("not allowed")]
    Forbidden,

    /// The order stopped accepting submissions.
    #[error("order is {0}")]
    OrderClosed(String),

    /// Rejected order input.
    #[error(transparent)]
    InvalidOrder(#[from] OrderInputError),

    /// Rejected submission input.
    #[error(transparent)]
    InvalidSubmission(#[from] SubmissionInputError),

    /// Object storage failed or rejected an upload.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// No unused code could be generated.
    #[error(transparent)]
    Code(#[from] UniqueCodeError),

    /// Database operation failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

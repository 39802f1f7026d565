//! Insert-with-retry for rows keyed by a random public code.
//!
//! Codes are never checked before insert. The insert runs with a fresh code
//! and the unique constraint decides; on a collision a new code is generated
//! and the insert retried, up to a fixed number of attempts.

use std::future::Future;

use thiserror::Error;

use crate::db::RepositoryError;

/// Attempts before giving up on finding an unused code.
pub const MAX_CODE_ATTEMPTS: u32 = 5;

/// Errors from [`insert_with_unique_code`].
#[derive(Debug, Error)]
pub enum UniqueCodeError {
    /// Every generated code collided.
    #[error("no unused code found after {attempts} attempts")]
    CodeSpaceExhausted {
        /// Number of inserts tried.
        attempts: u32,
    },

    /// The insert failed for a reason other than a code collision.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Run `insert` with codes from `generate` until one is accepted.
///
/// Only [`RepositoryError::DuplicateCode`] triggers a retry; any other error
/// is returned immediately.
///
/// # Errors
///
/// Returns `CodeSpaceExhausted` after `max_attempts` collisions, or the
/// first non-collision repository error.
pub async fn insert_with_unique_code<C, T, G, F, Fut>(
    mut generate: G,
    mut insert: F,
    max_attempts: u32,
) -> Result<T, UniqueCodeError>
where
    G: FnMut() -> C,
    F: FnMut(C) -> Fut,
    Fut: Future<Output = Result<T, RepositoryError>>,
{
    for attempt in 1..=max_attempts {
        match insert(generate()).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_duplicate_code() => {
                tracing::warn!(attempt, max_attempts, "generated code collided, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(UniqueCodeError::CodeSpaceExhausted {
        attempts: max_attempts,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;

    use super::*;

    fn duplicate() -> RepositoryError {
        RepositoryError::DuplicateCode("submission_tracking_code_key".to_owned())
    }

    #[tokio::test]
    async fn test_first_attempt_succeeds() {
        let calls = Cell::new(0);
        let result = insert_with_unique_code(
            || "GOM-AAAA0000".to_owned(),
            |code| {
                calls.set(calls.get() + 1);
                async move { Ok::<_, RepositoryError>(code) }
            },
            MAX_CODE_ATTEMPTS,
        )
        .await
        .unwrap();

        assert_eq!(result, "GOM-AAAA0000");
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn test_retries_with_new_code_after_collision() {
        let counter = Cell::new(0_u32);
        let seen = std::cell::RefCell::new(Vec::new());
        let result = insert_with_unique_code(
            || {
                counter.set(counter.get() + 1);
                format!("code-{}", counter.get())
            },
            |code: String| {
                seen.borrow_mut().push(code.clone());
                let collide = seen.borrow().len() < 3;
                async move {
                    if collide {
                        Err(duplicate())
                    } else {
                        Ok(code)
                    }
                }
            },
            MAX_CODE_ATTEMPTS,
        )
        .await
        .unwrap();

        assert_eq!(result, "code-3");
        assert_eq!(*seen.borrow(), ["code-1", "code-2", "code-3"]);
    }

    #[tokio::test]
    async fn test_gives_up_after_bound() {
        let calls = Cell::new(0);
        let result: Result<(), _> = insert_with_unique_code(
            || (),
            |()| {
                calls.set(calls.get() + 1);
                async { Err(duplicate()) }
            },
            MAX_CODE_ATTEMPTS,
        )
        .await;

        assert!(matches!(
            result,
            Err(UniqueCodeError::CodeSpaceExhausted { attempts: 5 })
        ));
        assert_eq!(calls.get(), MAX_CODE_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let calls = Cell::new(0);
        let result: Result<(), _> = insert_with_unique_code(
            || (),
            |()| {
                calls.set(calls.get() + 1);
                async { Err(RepositoryError::Conflict("order closed".to_owned())) }
            },
            MAX_CODE_ATTEMPTS,
        )
        .await;

        assert!(matches!(
            result,
            Err(UniqueCodeError::Repository(RepositoryError::Conflict(_)))
        ));
        assert_eq!(calls.get(), 1);
    }
}

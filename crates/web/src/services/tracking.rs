//! Tracking-code lookup.
//!
//! Every miss is reported as `NotFound`: an unknown code, a malformed code
//! and a wrong email are indistinguishable to the caller.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use gomflow_core::TrackingCode;

use crate::db::{OrderRepository, RepositoryError, SubmissionRepository};
use crate::models::{Submission, TrackedSubmission};

use super::ServiceError;
use super::lifecycle::LifecycleService;

/// Tracking lookup service.
pub struct TrackingService<'a> {
    pool: &'a PgPool,
    submissions: SubmissionRepository<'a>,
    orders: OrderRepository<'a>,
}

impl<'a> TrackingService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            submissions: SubmissionRepository::new(pool),
            orders: OrderRepository::new(pool),
        }
    }

    /// Look up a submission by tracking code.
    ///
    /// When `email` is given it must match the submission's guest email,
    /// ignoring case and surrounding whitespace. Without an email the code
    /// alone is enough.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for any miss and
    /// `ServiceError::Repository` if a query fails.
    #[instrument(skip_all)]
    pub async fn lookup(
        &self,
        code: &str,
        email: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<TrackedSubmission, ServiceError> {
        let code = TrackingCode::parse(code).map_err(|_| ServiceError::NotFound("submission"))?;
        let submission = self
            .submissions
            .get_by_tracking_code(&code)
            .await?
            .ok_or(ServiceError::NotFound("submission"))?;

        if !email_matches(&submission, email) {
            return Err(ServiceError::NotFound("submission"));
        }

        let order = self
            .orders
            .get_by_id(submission.order_id)
            .await?
            .ok_or_else(|| {
                RepositoryError::DataCorruption(format!(
                    "submission {} references a missing order",
                    submission.id
                ))
            })?;
        let order = LifecycleService::new(self.pool)
            .check_order(order, now)
            .await?;

        Ok(TrackedSubmission { submission, order })
    }
}

/// Whether an optional email filter admits this submission.
///
/// A blank filter counts as absent.
fn email_matches(submission: &Submission, email: Option<&str>) -> bool {
    match email.map(str::trim).filter(|e| !e.is_empty()) {
        None => true,
        Some(raw) => submission
            .guest_email
            .as_ref()
            .is_some_and(|guest| guest.matches(raw)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use gomflow_core::{Email, OrderId, ProfileId, SubmissionId};

    use super::*;

    fn submission(guest_email: Option<&str>) -> Submission {
        Submission {
            id: SubmissionId::random(),
            order_id: OrderId::random(),
            buyer_id: guest_email.is_none().then(ProfileId::random),
            guest_email: guest_email.map(|e| Email::parse(e).unwrap()),
            tracking_code: Some(TrackingCode::parse("GOM-7K2P9QXA").unwrap()),
            quantity: 2,
            payment_method: "gcash".to_owned(),
            payment_proof_url: None,
            payment_verified: false,
            tracking_number: None,
            courier_service: None,
            shipped_at: None,
            created_at: "2026-10-18T12:00:00Z".parse().unwrap(),
        }
    }

    #[test]
    fn test_email_matches_case_insensitively() {
        let sub = submission(Some("Buyer@Example.com"));
        assert!(email_matches(&sub, Some("buyer@example.com")));
        assert!(email_matches(&sub, Some("  BUYER@EXAMPLE.COM ")));
    }

    #[test]
    fn test_email_mismatch_is_rejected() {
        let sub = submission(Some("buyer@example.com"));
        assert!(!email_matches(&sub, Some("other@example.com")));
    }

    #[test]
    fn test_no_email_filter_admits_code() {
        assert!(email_matches(&submission(Some("buyer@example.com")), None));
        assert!(email_matches(&submission(Some("buyer@example.com")), Some("  ")));
    }

    #[test]
    fn test_email_filter_on_buyer_submission_is_rejected() {
        assert!(!email_matches(&submission(None), Some("buyer@example.com")));
    }
}

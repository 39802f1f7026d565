//! Submission intake and the GOM's submission management.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use gomflow_core::{OrderId, ProfileId, SubmissionId, TrackingCode};

use crate::db::{CreatedSubmission, OrderRepository, RepositoryError, SubmissionRepository};
use crate::models::{GroupOrder, NewSubmission, Shipment, Submission};

use super::ServiceError;
use super::codes::{MAX_CODE_ATTEMPTS, UniqueCodeError, insert_with_unique_code};
use super::lifecycle::LifecycleService;
use super::storage::{PAYMENT_PROOFS_BUCKET, StorageClient, UploadedFile, payment_proof_path};

/// Submission service.
pub struct SubmissionService<'a> {
    pool: &'a PgPool,
    orders: OrderRepository<'a>,
    submissions: SubmissionRepository<'a>,
}

impl<'a> SubmissionService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            orders: OrderRepository::new(pool),
            submissions: SubmissionRepository::new(pool),
        }
    }

    /// Place a submission against an order.
    ///
    /// The order is checked first, so an open order past its deadline is
    /// cancelled and the submission rejected. Guests get a tracking code,
    /// regenerated on collision. The optional payment proof is uploaded
    /// before the insert and its object path stored on the submission.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown order,
    /// `ServiceError::OrderClosed` if it no longer accepts submissions,
    /// `ServiceError::InvalidSubmission` for rejected input and
    /// `ServiceError::Storage` if the proof upload fails.
    #[instrument(skip_all, fields(order_id = %new.order_id, quantity = new.quantity))]
    pub async fn create(
        &self,
        mut new: NewSubmission,
        proof: Option<UploadedFile>,
        storage: &StorageClient,
        now: DateTime<Utc>,
    ) -> Result<CreatedSubmission, ServiceError> {
        let order = self
            .orders
            .get_by_id(new.order_id)
            .await?
            .ok_or(ServiceError::NotFound("order"))?;
        let order = LifecycleService::new(self.pool)
            .check_order(order, now)
            .await?;
        ensure_open(&order, now)?;
        new.validate(&order)?;

        if let Some(file) = proof {
            file.validate_image()?;
            let path = payment_proof_path(order.id, now, &file.file_name);
            storage.upload(PAYMENT_PROOFS_BUCKET, &path, &file).await?;
            new.payment_proof_path = Some(path);
        }

        let created = if new.submitter.needs_tracking_code() {
            insert_with_unique_code(
                || TrackingCode::generate(&mut rand::rng()),
                |code| {
                    let new = &new;
                    async move { self.submissions.create(new, Some(&code), now).await }
                },
                MAX_CODE_ATTEMPTS,
            )
            .await
        } else {
            self.submissions
                .create(&new, None, now)
                .await
                .map_err(Into::into)
        };

        let created = match created {
            Ok(created) => created,
            Err(e) => {
                if let Some(path) = &new.payment_proof_path {
                    storage.discard(PAYMENT_PROOFS_BUCKET, path).await;
                }
                return Err(insert_error(e));
            }
        };

        tracing::info!(
            submission_id = %created.submission.id,
            guest = created.submission.tracking_code.is_some(),
            moq_reached = created.moq_reached,
            "Submission created"
        );
        Ok(created)
    }

    /// Submissions for one of the GOM's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` or `ServiceError::Forbidden` when the
    /// order is missing or owned by another GOM.
    pub async fn list_for_order(
        &self,
        order_id: OrderId,
        gom_id: ProfileId,
    ) -> Result<Vec<Submission>, ServiceError> {
        self.owned_order(order_id, gom_id).await?;
        Ok(self.submissions.list_by_order(order_id).await?)
    }

    /// Mark a submission's payment as verified.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` or `ServiceError::Forbidden` unless
    /// the submission belongs to one of the GOM's orders.
    #[instrument(skip(self))]
    pub async fn verify_payment(
        &self,
        id: SubmissionId,
        gom_id: ProfileId,
    ) -> Result<Submission, ServiceError> {
        self.owned_submission(id, gom_id).await?;
        let submission = self.submissions.mark_verified(id).await?;
        tracing::info!("Payment verified");
        Ok(submission)
    }

    /// Record the shipment of a submission.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` or `ServiceError::Forbidden` unless
    /// the submission belongs to one of the GOM's orders.
    #[instrument(skip(self, shipment))]
    pub async fn record_shipment(
        &self,
        id: SubmissionId,
        gom_id: ProfileId,
        shipment: &Shipment,
        now: DateTime<Utc>,
    ) -> Result<Submission, ServiceError> {
        self.owned_submission(id, gom_id).await?;
        let submission = self.submissions.record_shipment(id, shipment, now).await?;
        tracing::info!(courier = %shipment.courier_service, "Shipment recorded");
        Ok(submission)
    }

    /// Short-lived URL of a submission's payment proof.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` when the submission has no proof,
    /// and `ServiceError::Storage` if signing fails.
    pub async fn proof_url(
        &self,
        id: SubmissionId,
        gom_id: ProfileId,
        storage: &StorageClient,
        ttl: Duration,
    ) -> Result<String, ServiceError> {
        let submission = self.owned_submission(id, gom_id).await?;
        let path = submission
            .payment_proof_url
            .ok_or(ServiceError::NotFound("payment proof"))?;
        Ok(storage
            .signed_url(PAYMENT_PROOFS_BUCKET, &path, ttl)
            .await?)
    }

    async fn owned_order(
        &self,
        order_id: OrderId,
        gom_id: ProfileId,
    ) -> Result<GroupOrder, ServiceError> {
        let order = self
            .orders
            .get_by_id(order_id)
            .await?
            .ok_or(ServiceError::NotFound("order"))?;
        if order.gom_id != gom_id {
            return Err(ServiceError::Forbidden);
        }
        Ok(order)
    }

    async fn owned_submission(
        &self,
        id: SubmissionId,
        gom_id: ProfileId,
    ) -> Result<Submission, ServiceError> {
        let submission = self
            .submissions
            .get_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound("submission"))?;
        self.owned_order(submission.order_id, gom_id).await?;
        Ok(submission)
    }
}

/// Reject submissions to an order that is closed, cancelled or expired.
fn ensure_open(order: &GroupOrder, now: DateTime<Utc>) -> Result<(), ServiceError> {
    if order.accepts_submissions_at(now) {
        return Ok(());
    }
    let reason = if order.status.accepts_submissions() {
        "past its deadline".to_owned()
    } else {
        order.status.label().to_lowercase()
    };
    Err(ServiceError::OrderClosed(reason))
}

/// A conflict on insert means the order stopped accepting submissions
/// between the check and the count update.
fn insert_error(err: UniqueCodeError) -> ServiceError {
    match err {
        UniqueCodeError::Repository(RepositoryError::Conflict(_)) => {
            ServiceError::OrderClosed("no longer accepting submissions".to_owned())
        }
        other => other.into(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration as ChronoDuration;
    use gomflow_core::{Country, OrderStatus, Price, ShareableSlug};

    use super::*;
    use crate::models::PaymentDetails;

    fn now() -> DateTime<Utc> {
        "2026-10-18T12:00:00Z".parse().unwrap()
    }

    fn order(status: OrderStatus, deadline: DateTime<Utc>) -> GroupOrder {
        GroupOrder {
            id: OrderId::random(),
            gom_id: ProfileId::random(),
            product_name: "Photocard set".to_owned(),
            product_description: None,
            product_image_url: None,
            price: Price::parse("350", "PHP").unwrap(),
            country: Country::Ph,
            payment_methods: vec!["gcash".to_owned()],
            payment_details: PaymentDetails::new(),
            minimum_order_quantity: 20,
            current_order_count: 4,
            status,
            deadline,
            shareable_slug: ShareableSlug::parse("ph0t0set").unwrap(),
            created_at: now() - ChronoDuration::days(2),
        }
    }

    #[test]
    fn test_ensure_open_accepts_open_and_moq_met() {
        let tomorrow = now() + ChronoDuration::days(1);
        assert!(ensure_open(&order(OrderStatus::Open, tomorrow), now()).is_ok());
        assert!(ensure_open(&order(OrderStatus::MoqMet, tomorrow), now()).is_ok());
    }

    #[test]
    fn test_ensure_open_rejects_terminal_orders() {
        let tomorrow = now() + ChronoDuration::days(1);
        for status in [OrderStatus::Closed, OrderStatus::Cancelled] {
            assert!(matches!(
                ensure_open(&order(status, tomorrow), now()),
                Err(ServiceError::OrderClosed(_))
            ));
        }
    }

    #[test]
    fn test_ensure_open_rejects_past_deadline() {
        let yesterday = now() - ChronoDuration::days(1);
        let err = ensure_open(&order(OrderStatus::MoqMet, yesterday), now()).unwrap_err();
        assert_eq!(err.to_string(), "order is past its deadline");
    }

    #[test]
    fn test_insert_conflict_means_order_closed() {
        let conflict = UniqueCodeError::Repository(RepositoryError::Conflict(
            "order is not accepting submissions".to_owned(),
        ));
        assert!(matches!(
            insert_error(conflict),
            ServiceError::OrderClosed(_)
        ));
        assert!(matches!(
            insert_error(UniqueCodeError::CodeSpaceExhausted { attempts: 5 }),
            ServiceError::Code(_)
        ));
    }
}

//! Submission repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use gomflow_core::{Email, OrderId, ProfileId, SubmissionId, TrackingCode};

use super::RepositoryError;
use crate::models::{NewSubmission, Shipment, Submission};

/// Unique constraint on `submission.tracking_code`.
pub const TRACKING_CODE_CONSTRAINT: &str = "submission_tracking_code_key";

const SUBMISSION_COLUMNS: &str = "id, order_id, buyer_id, guest_email, tracking_code, quantity, \
     payment_method, payment_proof_url, payment_verified, tracking_number, courier_service, \
     shipped_at, created_at";

#[derive(Debug, sqlx::FromRow)]
struct SubmissionRow {
    id: Uuid,
    order_id: Uuid,
    buyer_id: Option<Uuid>,
    guest_email: Option<String>,
    tracking_code: Option<String>,
    quantity: i32,
    payment_method: String,
    payment_proof_url: Option<String>,
    payment_verified: bool,
    tracking_number: Option<String>,
    courier_service: Option<String>,
    shipped_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<SubmissionRow> for Submission {
    type Error = RepositoryError;

    fn try_from(row: SubmissionRow) -> Result<Self, Self::Error> {
        let guest_email = row
            .guest_email
            .as_deref()
            .map(Email::parse)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
            })?;
        let tracking_code = row
            .tracking_code
            .as_deref()
            .map(TrackingCode::parse)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid tracking code in database: {e}"))
            })?;

        Ok(Self {
            id: SubmissionId::new(row.id),
            order_id: OrderId::new(row.order_id),
            buyer_id: row.buyer_id.map(ProfileId::new),
            guest_email,
            tracking_code,
            quantity: row.quantity,
            payment_method: row.payment_method,
            payment_proof_url: row.payment_proof_url,
            payment_verified: row.payment_verified,
            tracking_number: row.tracking_number,
            courier_service: row.courier_service,
            shipped_at: row.shipped_at,
            created_at: row.created_at,
        })
    }
}

/// Outcome of a successful submission insert.
#[derive(Debug, Clone)]
pub struct CreatedSubmission {
    pub submission: Submission,
    /// Whether this submission moved the order to `moq_met`.
    pub moq_reached: bool,
}

/// Repository for submission database operations.
pub struct SubmissionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SubmissionRepository<'a> {
    /// Create a new submission repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a submission and add its quantity to the order count.
    ///
    /// Runs in one transaction: the count increment only matches an order
    /// that still accepts submissions at `now`, the submission is inserted,
    /// then the order moves to `moq_met` if the count has reached the MOQ.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order no longer accepts
    /// submissions, and `RepositoryError::DuplicateCode` if the tracking code
    /// is taken. Nothing is written in either case.
    pub async fn create(
        &self,
        new: &NewSubmission,
        tracking_code: Option<&TrackingCode>,
        now: DateTime<Utc>,
    ) -> Result<CreatedSubmission, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let counted = sqlx::query(
            "UPDATE gomflow.group_order
             SET current_order_count = current_order_count + $2
             WHERE id = $1 AND status IN ('open', 'moq_met') AND deadline >= $3",
        )
        .bind(new.order_id.as_uuid())
        .bind(new.quantity)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if counted.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(
                "order is not accepting submissions".to_owned(),
            ));
        }

        let row = sqlx::query_as::<_, SubmissionRow>(&format!(
            "INSERT INTO gomflow.submission (
                 order_id, buyer_id, guest_email, tracking_code,
                 quantity, payment_method, payment_proof_url
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {SUBMISSION_COLUMNS}"
        ))
        .bind(new.order_id.as_uuid())
        .bind(new.submitter.buyer_id().map(|id| id.as_uuid()))
        .bind(new.submitter.guest_email().map(Email::as_str))
        .bind(tracking_code.map(TrackingCode::as_str))
        .bind(new.quantity)
        .bind(&new.payment_method)
        .bind(new.payment_proof_path.as_deref())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_insert(e, TRACKING_CODE_CONSTRAINT))?;

        let moq_reached = sqlx::query(
            "UPDATE gomflow.group_order SET status = 'moq_met'
             WHERE id = $1 AND status = 'open'
               AND current_order_count >= minimum_order_quantity",
        )
        .bind(new.order_id.as_uuid())
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        tx.commit().await?;

        Ok(CreatedSubmission {
            submission: Submission::try_from(row)?,
            moq_reached,
        })
    }

    /// Get a submission by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: SubmissionId) -> Result<Option<Submission>, RepositoryError> {
        let row = sqlx::query_as::<_, SubmissionRow>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM gomflow.submission WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(self.pool)
        .await?;

        row.map(Submission::try_from).transpose()
    }

    /// Get a submission by its guest tracking code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_tracking_code(
        &self,
        code: &TrackingCode,
    ) -> Result<Option<Submission>, RepositoryError> {
        let row = sqlx::query_as::<_, SubmissionRow>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM gomflow.submission WHERE tracking_code = $1"
        ))
        .bind(code.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(Submission::try_from).transpose()
    }

    /// All submissions for an order, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_order(&self, order_id: OrderId) -> Result<Vec<Submission>, RepositoryError> {
        let rows = sqlx::query_as::<_, SubmissionRow>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM gomflow.submission
             WHERE order_id = $1
             ORDER BY created_at DESC"
        ))
        .bind(order_id.as_uuid())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Submission::try_from).collect()
    }

    /// Mark the payment of a submission as verified.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the submission does not exist.
    pub async fn mark_verified(&self, id: SubmissionId) -> Result<Submission, RepositoryError> {
        let row = sqlx::query_as::<_, SubmissionRow>(&format!(
            "UPDATE gomflow.submission SET payment_verified = TRUE
             WHERE id = $1
             RETURNING {SUBMISSION_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Submission::try_from(row)
    }

    /// Record a shipment.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the submission does not exist.
    pub async fn record_shipment(
        &self,
        id: SubmissionId,
        shipment: &Shipment,
        shipped_at: DateTime<Utc>,
    ) -> Result<Submission, RepositoryError> {
        let row = sqlx::query_as::<_, SubmissionRow>(&format!(
            "UPDATE gomflow.submission
             SET tracking_number = $2, courier_service = $3, shipped_at = $4
             WHERE id = $1
             RETURNING {SUBMISSION_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(&shipment.tracking_number)
        .bind(&shipment.courier_service)
        .bind(shipped_at)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Submission::try_from(row)
    }
}

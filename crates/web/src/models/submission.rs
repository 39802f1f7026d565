//! Submission domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use gomflow_core::{Email, OrderId, ProfileId, SubmissionId, SubmissionProgress, TrackingCode};

use super::order::GroupOrder;

/// Largest quantity a single submission may request.
pub const MAX_QUANTITY: i32 = 1000;

/// Longest tracking number or courier name accepted.
const MAX_SHIPMENT_FIELD_LENGTH: usize = 100;

/// Validation errors for submissions and shipments.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmissionInputError {
    #[error("quantity must be between 1 and {MAX_QUANTITY}")]
    InvalidQuantity,
    #[error("an email address is required for guest orders")]
    MissingGuestEmail,
    #[error("payment method {0} is not accepted for this order")]
    PaymentMethodNotAccepted(String),
    #[error("tracking number is required")]
    MissingTrackingNumber,
    #[error("courier is required")]
    MissingCourier,
    #[error("shipment fields must be at most {MAX_SHIPMENT_FIELD_LENGTH} characters")]
    ShipmentFieldTooLong,
}

/// Who placed a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submitter {
    /// A signed-in buyer.
    Buyer(ProfileId),
    /// A guest identified only by email; receives a tracking code.
    Guest(Email),
}

impl Submitter {
    /// Build from the optional session user and optional guest email field.
    ///
    /// A signed-in buyer wins over any email typed into the form.
    ///
    /// # Errors
    ///
    /// Returns `MissingGuestEmail` when neither is present.
    pub fn resolve(
        buyer: Option<ProfileId>,
        guest_email: Option<Email>,
    ) -> Result<Self, SubmissionInputError> {
        match (buyer, guest_email) {
            (Some(id), _) => Ok(Self::Buyer(id)),
            (None, Some(email)) => Ok(Self::Guest(email)),
            (None, None) => Err(SubmissionInputError::MissingGuestEmail),
        }
    }

    /// Guests get a tracking code; signed-in buyers do not.
    #[must_use]
    pub const fn needs_tracking_code(&self) -> bool {
        matches!(self, Self::Guest(_))
    }

    #[must_use]
    pub const fn buyer_id(&self) -> Option<ProfileId> {
        match self {
            Self::Buyer(id) => Some(*id),
            Self::Guest(_) => None,
        }
    }

    #[must_use]
    pub const fn guest_email(&self) -> Option<&Email> {
        match self {
            Self::Buyer(_) => None,
            Self::Guest(email) => Some(email),
        }
    }
}

/// A buyer's commitment against a group order.
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub order_id: OrderId,
    pub buyer_id: Option<ProfileId>,
    pub guest_email: Option<Email>,
    pub tracking_code: Option<TrackingCode>,
    pub quantity: i32,
    pub payment_method: String,
    /// Object path in the payment-proofs bucket, not a URL.
    pub payment_proof_url: Option<String>,
    pub payment_verified: bool,
    pub tracking_number: Option<String>,
    pub courier_service: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Submission {
    /// Derived buyer-facing progress.
    #[must_use]
    pub const fn progress(&self) -> SubmissionProgress {
        SubmissionProgress::derive(
            self.payment_proof_url.is_some(),
            self.payment_verified,
            self.shipped_at.is_some(),
        )
    }

    /// Email to show the GOM: guest email, or none for signed-in buyers.
    #[must_use]
    pub fn contact_email(&self) -> Option<&str> {
        self.guest_email.as_ref().map(Email::as_str)
    }
}

/// Input for creating a submission.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub order_id: OrderId,
    pub submitter: Submitter,
    pub quantity: i32,
    pub payment_method: String,
    /// Object path of an already uploaded payment proof.
    pub payment_proof_path: Option<String>,
}

impl NewSubmission {
    /// Check the submission against the order it targets.
    ///
    /// # Errors
    ///
    /// Returns the first [`SubmissionInputError`] found.
    pub fn validate(&self, order: &GroupOrder) -> Result<(), SubmissionInputError> {
        if !(1..=MAX_QUANTITY).contains(&self.quantity) {
            return Err(SubmissionInputError::InvalidQuantity);
        }
        if !order.accepts_payment_method(&self.payment_method) {
            return Err(SubmissionInputError::PaymentMethodNotAccepted(
                self.payment_method.clone(),
            ));
        }
        Ok(())
    }
}

/// Shipment details recorded by a GOM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shipment {
    pub tracking_number: String,
    pub courier_service: String,
}

impl Shipment {
    /// Build from form input, trimming both fields.
    ///
    /// # Errors
    ///
    /// Returns an error when a field is blank or too long.
    pub fn parse(tracking_number: &str, courier_service: &str) -> Result<Self, SubmissionInputError> {
        let tracking_number = tracking_number.trim();
        let courier_service = courier_service.trim();
        if tracking_number.is_empty() {
            return Err(SubmissionInputError::MissingTrackingNumber);
        }
        if courier_service.is_empty() {
            return Err(SubmissionInputError::MissingCourier);
        }
        if tracking_number.chars().count() > MAX_SHIPMENT_FIELD_LENGTH
            || courier_service.chars().count() > MAX_SHIPMENT_FIELD_LENGTH
        {
            return Err(SubmissionInputError::ShipmentFieldTooLong);
        }
        Ok(Self {
            tracking_number: tracking_number.to_owned(),
            courier_service: courier_service.to_owned(),
        })
    }
}

/// Result of a tracking lookup: the submission joined with its order.
#[derive(Debug, Clone, Serialize)]
pub struct TrackedSubmission {
    pub submission: Submission,
    pub order: GroupOrder,
}

impl TrackedSubmission {
    #[must_use]
    pub const fn progress(&self) -> SubmissionProgress {
        self.submission.progress()
    }

    /// Price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.order.line_total(self.submission.quantity)
    }

    /// Line total formatted in the order's currency.
    #[must_use]
    pub fn formatted_total(&self) -> String {
        self.order.price.format_amount(self.line_total())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use gomflow_core::{Country, OrderStatus, Price, ShareableSlug};

    use super::*;
    use crate::models::order::PaymentDetails;

    fn order() -> GroupOrder {
        let now = Utc::now();
        GroupOrder {
            id: OrderId::random(),
            gom_id: ProfileId::random(),
            product_name: "Photocard set".to_owned(),
            product_description: None,
            product_image_url: None,
            price: Price::parse("7.25", "SGD").unwrap(),
            country: Country::Sg,
            payment_methods: vec!["paynow".to_owned()],
            payment_details: PaymentDetails::new(),
            minimum_order_quantity: 20,
            current_order_count: 4,
            status: OrderStatus::Open,
            deadline: now + chrono::Duration::days(2),
            shareable_slug: ShareableSlug::parse("pc5et000").unwrap(),
            created_at: now,
        }
    }

    fn submission() -> Submission {
        Submission {
            id: SubmissionId::random(),
            order_id: OrderId::random(),
            buyer_id: None,
            guest_email: Some(Email::parse("guest@example.com").unwrap()),
            tracking_code: Some(TrackingCode::parse("GOM-ABCD1234").unwrap()),
            quantity: 3,
            payment_method: "paynow".to_owned(),
            payment_proof_url: None,
            payment_verified: false,
            tracking_number: None,
            courier_service: None,
            shipped_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_submitter_resolution() {
        let buyer = ProfileId::random();
        let email = Email::parse("guest@example.com").unwrap();

        let signed_in = Submitter::resolve(Some(buyer), Some(email.clone())).unwrap();
        assert_eq!(signed_in, Submitter::Buyer(buyer));
        assert!(!signed_in.needs_tracking_code());

        let guest = Submitter::resolve(None, Some(email.clone())).unwrap();
        assert!(guest.needs_tracking_code());
        assert_eq!(guest.guest_email(), Some(&email));

        assert_eq!(
            Submitter::resolve(None, None),
            Err(SubmissionInputError::MissingGuestEmail)
        );
    }

    #[test]
    fn test_validate_against_order() {
        let order = order();
        let mut input = NewSubmission {
            order_id: order.id,
            submitter: Submitter::Buyer(ProfileId::random()),
            quantity: 2,
            payment_method: "paynow".to_owned(),
            payment_proof_path: None,
        };
        assert!(input.validate(&order).is_ok());

        input.quantity = 0;
        assert_eq!(input.validate(&order), Err(SubmissionInputError::InvalidQuantity));

        input.quantity = 1;
        input.payment_method = "bank_transfer".to_owned();
        assert_eq!(
            input.validate(&order),
            Err(SubmissionInputError::PaymentMethodNotAccepted(
                "bank_transfer".to_owned()
            ))
        );
    }

    #[test]
    fn test_progress_follows_fields() {
        let mut s = submission();
        assert_eq!(s.progress(), SubmissionProgress::PaymentRequired);
        s.payment_proof_url = Some("order/1-proof.png".to_owned());
        assert_eq!(s.progress(), SubmissionProgress::PaymentPending);
        s.payment_verified = true;
        assert_eq!(s.progress(), SubmissionProgress::PaymentVerified);
        s.shipped_at = Some(Utc::now());
        assert_eq!(s.progress(), SubmissionProgress::Shipped);
    }

    #[test]
    fn test_shipment_parse() {
        let shipment = Shipment::parse("  LBC123  ", " LBC ").unwrap();
        assert_eq!(shipment.tracking_number, "LBC123");
        assert_eq!(shipment.courier_service, "LBC");
        assert_eq!(
            Shipment::parse(" ", "J&T"),
            Err(SubmissionInputError::MissingTrackingNumber)
        );
        assert_eq!(
            Shipment::parse("X1", ""),
            Err(SubmissionInputError::MissingCourier)
        );
    }

    #[test]
    fn test_tracked_submission_total() {
        let tracked = TrackedSubmission {
            submission: submission(),
            order: order(),
        };
        assert_eq!(tracked.line_total(), Decimal::new(2175, 2));
        assert_eq!(tracked.formatted_total(), "21.75 SGD");
    }
}

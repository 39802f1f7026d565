//! Group order domain types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use gomflow_core::{
    Country, CountryError, OrderId, OrderStatus, PaymentMethod, Price, ProfileId, ShareableSlug,
};

/// Longest product name accepted on a listing.
pub const MAX_PRODUCT_NAME_LENGTH: usize = 200;

/// Longest product description accepted on a listing.
pub const MAX_DESCRIPTION_LENGTH: usize = 5000;

/// Per-method payment instructions, keyed by payment method id.
///
/// Values are free text written by the GOM (account number, handle, etc.).
pub type PaymentDetails = BTreeMap<String, String>;

/// Validation errors for a new order.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderInputError {
    #[error("product name is required")]
    MissingProductName,
    #[error("product name must be at most {MAX_PRODUCT_NAME_LENGTH} characters")]
    ProductNameTooLong,
    #[error("description must be at most {MAX_DESCRIPTION_LENGTH} characters")]
    DescriptionTooLong,
    #[error("minimum order quantity must be at least 1")]
    InvalidMinimumQuantity,
    #[error("deadline must be in the future")]
    DeadlineInPast,
    #[error("select at least one payment method")]
    NoPaymentMethods,
    #[error(transparent)]
    PaymentMethod(#[from] CountryError),
}

/// A GOM-authored group order listing.
#[derive(Debug, Clone, Serialize)]
pub struct GroupOrder {
    pub id: OrderId,
    pub gom_id: ProfileId,
    pub product_name: String,
    pub product_description: Option<String>,
    pub product_image_url: Option<String>,
    pub price: Price,
    pub country: Country,
    /// Accepted payment method ids, all offered in `country`.
    pub payment_methods: Vec<String>,
    pub payment_details: PaymentDetails,
    pub minimum_order_quantity: i32,
    pub current_order_count: i32,
    pub status: OrderStatus,
    pub deadline: DateTime<Utc>,
    pub shareable_slug: ShareableSlug,
    pub created_at: DateTime<Utc>,
}

impl GroupOrder {
    /// Automatic status change due at `now`, if any.
    #[must_use]
    pub fn pending_transition(&self, now: DateTime<Utc>) -> Option<OrderStatus> {
        self.status.evaluate(
            self.current_order_count,
            self.minimum_order_quantity,
            self.deadline,
            now,
        )
    }

    /// Whether a buyer may submit against this order at `now`.
    #[must_use]
    pub fn accepts_submissions_at(&self, now: DateTime<Utc>) -> bool {
        self.status.accepts_submissions() && self.deadline >= now
    }

    /// Whether the payment method id is one this order accepts.
    #[must_use]
    pub fn accepts_payment_method(&self, method_id: &str) -> bool {
        self.payment_methods.iter().any(|m| m == method_id)
    }

    /// Accepted payment methods with display data, in the country's order.
    #[must_use]
    pub fn payment_method_options(&self) -> Vec<&'static PaymentMethod> {
        self.country
            .payment_methods()
            .iter()
            .filter(|m| self.accepts_payment_method(m.id))
            .collect()
    }

    /// GOM instructions for a payment method, if given.
    #[must_use]
    pub fn payment_instructions(&self, method_id: &str) -> Option<&str> {
        self.payment_details
            .get(method_id)
            .map(String::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// Progress towards the MOQ as a whole percentage, capped at 100.
    #[must_use]
    pub fn progress_percent(&self) -> u32 {
        if self.minimum_order_quantity <= 0 {
            return 100;
        }
        let count = u32::try_from(self.current_order_count.max(0)).unwrap_or(0);
        let moq = u32::try_from(self.minimum_order_quantity).unwrap_or(1);
        (count.saturating_mul(100) / moq).min(100)
    }

    /// Units still needed to reach the MOQ.
    #[must_use]
    pub fn remaining_to_moq(&self) -> i32 {
        (self.minimum_order_quantity - self.current_order_count).max(0)
    }

    /// Total for a submission of `quantity` units.
    #[must_use]
    pub fn line_total(&self, quantity: i32) -> Decimal {
        self.price.total(u32::try_from(quantity.max(0)).unwrap_or(0))
    }

    /// Public path of the listing page.
    #[must_use]
    pub fn share_path(&self) -> String {
        format!("/order/{}", self.shareable_slug)
    }
}

/// Input for creating an order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub gom_id: ProfileId,
    pub product_name: String,
    pub product_description: Option<String>,
    pub product_image_url: Option<String>,
    pub price: Price,
    pub country: Country,
    pub payment_methods: Vec<String>,
    pub payment_details: PaymentDetails,
    pub minimum_order_quantity: i32,
    pub deadline: DateTime<Utc>,
}

impl NewOrder {
    /// Check the listing before it is stored.
    ///
    /// Payment details for methods that are not accepted are dropped.
    ///
    /// # Errors
    ///
    /// Returns the first [`OrderInputError`] found.
    pub fn validate(&mut self, now: DateTime<Utc>) -> Result<(), OrderInputError> {
        self.product_name = self.product_name.trim().to_owned();
        if self.product_name.is_empty() {
            return Err(OrderInputError::MissingProductName);
        }
        if self.product_name.chars().count() > MAX_PRODUCT_NAME_LENGTH {
            return Err(OrderInputError::ProductNameTooLong);
        }
        self.product_description = self
            .product_description
            .take()
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty());
        if self
            .product_description
            .as_ref()
            .is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LENGTH)
        {
            return Err(OrderInputError::DescriptionTooLong);
        }
        if self.minimum_order_quantity < 1 {
            return Err(OrderInputError::InvalidMinimumQuantity);
        }
        if self.deadline <= now {
            return Err(OrderInputError::DeadlineInPast);
        }
        if self.payment_methods.is_empty() {
            return Err(OrderInputError::NoPaymentMethods);
        }
        for method in &self.payment_methods {
            self.country.payment_method(method)?;
        }
        self.payment_methods.dedup();
        let methods = &self.payment_methods;
        self.payment_details
            .retain(|method, _| methods.iter().any(|m| m == method));
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn now() -> DateTime<Utc> {
        "2026-10-18T12:00:00Z".parse().unwrap()
    }

    fn new_order() -> NewOrder {
        NewOrder {
            gom_id: ProfileId::random(),
            product_name: "  SEVENTEEN Lightstick v3  ".to_owned(),
            product_description: Some("   ".to_owned()),
            product_image_url: None,
            price: Price::parse("1850", "PHP").unwrap(),
            country: Country::Ph,
            payment_methods: vec!["gcash".to_owned(), "bank_transfer".to_owned()],
            payment_details: PaymentDetails::from([
                ("gcash".to_owned(), "0917 123 4567".to_owned()),
                ("paypal".to_owned(), "stale".to_owned()),
            ]),
            minimum_order_quantity: 10,
            deadline: now() + Duration::days(7),
        }
    }

    fn order(count: i32, moq: i32, status: OrderStatus) -> GroupOrder {
        GroupOrder {
            id: OrderId::random(),
            gom_id: ProfileId::random(),
            product_name: "Album".to_owned(),
            product_description: None,
            product_image_url: None,
            price: Price::parse("12.50", "USD").unwrap(),
            country: Country::Us,
            payment_methods: vec!["paypal".to_owned(), "venmo".to_owned()],
            payment_details: PaymentDetails::new(),
            minimum_order_quantity: moq,
            current_order_count: count,
            status,
            deadline: now() + Duration::days(1),
            shareable_slug: ShareableSlug::parse("abcd1234").unwrap(),
            created_at: now(),
        }
    }

    #[test]
    fn test_validate_normalises_input() {
        let mut input = new_order();
        input.validate(now()).unwrap();
        assert_eq!(input.product_name, "SEVENTEEN Lightstick v3");
        assert_eq!(input.product_description, None);
        assert_eq!(input.payment_details.len(), 1);
        assert!(input.payment_details.contains_key("gcash"));
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        let mut input = new_order();
        input.product_name = " ".to_owned();
        assert_eq!(input.validate(now()), Err(OrderInputError::MissingProductName));

        let mut input = new_order();
        input.minimum_order_quantity = 0;
        assert_eq!(
            input.validate(now()),
            Err(OrderInputError::InvalidMinimumQuantity)
        );

        let mut input = new_order();
        input.deadline = now();
        assert_eq!(input.validate(now()), Err(OrderInputError::DeadlineInPast));

        let mut input = new_order();
        input.payment_methods.clear();
        assert_eq!(input.validate(now()), Err(OrderInputError::NoPaymentMethods));
    }

    #[test]
    fn test_validate_rejects_methods_from_other_countries() {
        let mut input = new_order();
        input.payment_methods.push("venmo".to_owned());
        assert!(matches!(
            input.validate(now()),
            Err(OrderInputError::PaymentMethod(
                CountryError::UnknownPaymentMethod { .. }
            ))
        ));
    }

    #[test]
    fn test_progress_and_remaining() {
        assert_eq!(order(3, 10, OrderStatus::Open).progress_percent(), 30);
        assert_eq!(order(15, 10, OrderStatus::MoqMet).progress_percent(), 100);
        assert_eq!(order(3, 10, OrderStatus::Open).remaining_to_moq(), 7);
        assert_eq!(order(15, 10, OrderStatus::MoqMet).remaining_to_moq(), 0);
    }

    #[test]
    fn test_accepts_submissions_at() {
        let open = order(0, 10, OrderStatus::Open);
        assert!(open.accepts_submissions_at(now()));
        assert!(!open.accepts_submissions_at(open.deadline + Duration::seconds(1)));
        assert!(order(12, 10, OrderStatus::MoqMet).accepts_submissions_at(now()));
        assert!(!order(0, 10, OrderStatus::Closed).accepts_submissions_at(now()));
        assert!(!order(0, 10, OrderStatus::Cancelled).accepts_submissions_at(now()));
    }

    #[test]
    fn test_payment_method_options_follow_country_order() {
        let order = order(0, 10, OrderStatus::Open);
        let ids: Vec<_> = order.payment_method_options().iter().map(|m| m.id).collect();
        assert_eq!(ids, ["venmo", "paypal"]);
        assert!(order.accepts_payment_method("paypal"));
        assert!(!order.accepts_payment_method("zelle"));
    }

    #[test]
    fn test_line_total_and_pending_transition() {
        let order = order(10, 10, OrderStatus::Open);
        assert_eq!(order.line_total(4), Decimal::new(50, 0));
        assert_eq!(order.pending_transition(now()), Some(OrderStatus::MoqMet));
        assert_eq!(order.share_path(), "/order/abcd1234");
    }
}

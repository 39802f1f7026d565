//! Display-ready views of domain objects for templates.

use chrono::{DateTime, Utc};
use serde::Serialize;

use gomflow_core::Country;

use crate::models::{GroupOrder, Submission, TrackedSubmission};

/// Format a timestamp for display, e.g. `Oct 18, 2026 12:00 UTC`.
#[must_use]
pub fn format_datetime(at: DateTime<Utc>) -> String {
    at.format("%b %-d, %Y %H:%M UTC").to_string()
}

/// Display name of a payment method id, falling back to the id.
fn method_name(country: Country, method_id: &str) -> String {
    country
        .payment_method(method_id)
        .map_or_else(|_| method_id.to_owned(), |m| m.name.to_owned())
}

/// An order as shown in lists and on its own page.
#[derive(Debug, Clone, Serialize)]
pub struct OrderCard {
    pub id: String,
    pub product_name: String,
    pub product_description: Option<String>,
    pub product_image_url: Option<String>,
    pub price: String,
    pub country_name: &'static str,
    pub status: &'static str,
    pub status_label: &'static str,
    pub current_order_count: i32,
    pub minimum_order_quantity: i32,
    pub remaining_to_moq: i32,
    pub progress_percent: u32,
    pub deadline: String,
    pub share_path: String,
}

impl From<&GroupOrder> for OrderCard {
    fn from(order: &GroupOrder) -> Self {
        Self {
            id: order.id.to_string(),
            product_name: order.product_name.clone(),
            product_description: order.product_description.clone(),
            product_image_url: order.product_image_url.clone(),
            price: order.price.to_string(),
            country_name: order.country.name(),
            status: order.status.as_str(),
            status_label: order.status.label(),
            current_order_count: order.current_order_count,
            minimum_order_quantity: order.minimum_order_quantity,
            remaining_to_moq: order.remaining_to_moq(),
            progress_percent: order.progress_percent(),
            deadline: format_datetime(order.deadline),
            share_path: order.share_path(),
        }
    }
}

/// A payment option on an order page, with the GOM's instructions.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentOption {
    pub id: &'static str,
    pub name: &'static str,
    pub instructions: Option<String>,
}

/// Accepted payment methods of an order.
#[must_use]
pub fn payment_options(order: &GroupOrder) -> Vec<PaymentOption> {
    order
        .payment_method_options()
        .into_iter()
        .map(|method| PaymentOption {
            id: method.id,
            name: method.name,
            instructions: order.payment_instructions(method.id).map(str::to_owned),
        })
        .collect()
}

/// A submission row on the GOM's manage page.
#[derive(Debug, Clone)]
pub struct SubmissionLine {
    pub id: String,
    pub contact: String,
    pub tracking_code: Option<String>,
    pub quantity: i32,
    pub payment_method: String,
    pub has_proof: bool,
    pub payment_verified: bool,
    pub progress_label: &'static str,
    pub shipment: Option<String>,
    pub created_at: String,
}

impl SubmissionLine {
    #[must_use]
    pub fn new(submission: &Submission, country: Country) -> Self {
        let shipment = match (&submission.courier_service, &submission.tracking_number) {
            (Some(courier), Some(number)) => Some(format!("{courier} {number}")),
            _ => None,
        };
        Self {
            id: submission.id.to_string(),
            contact: submission
                .contact_email()
                .unwrap_or("Signed-in buyer")
                .to_owned(),
            tracking_code: submission.tracking_code.as_ref().map(ToString::to_string),
            quantity: submission.quantity,
            payment_method: method_name(country, &submission.payment_method),
            has_proof: submission.payment_proof_url.is_some(),
            payment_verified: submission.payment_verified,
            progress_label: submission.progress().label(),
            shipment,
            created_at: format_datetime(submission.created_at),
        }
    }
}

/// Result card on the tracking page.
#[derive(Debug, Clone, Serialize)]
pub struct TrackingView {
    pub tracking_code: Option<String>,
    pub product_name: String,
    pub order_status_label: &'static str,
    pub order_path: String,
    pub quantity: i32,
    pub payment_method: String,
    pub total: String,
    pub progress: &'static str,
    pub progress_label: &'static str,
    pub courier_service: Option<String>,
    pub tracking_number: Option<String>,
    pub shipped_at: Option<String>,
    pub submitted_at: String,
    pub order_progress_percent: u32,
    pub current_order_count: i32,
    pub minimum_order_quantity: i32,
}

impl From<&TrackedSubmission> for TrackingView {
    fn from(tracked: &TrackedSubmission) -> Self {
        let submission = &tracked.submission;
        let order = &tracked.order;
        Self {
            tracking_code: submission.tracking_code.as_ref().map(ToString::to_string),
            product_name: order.product_name.clone(),
            order_status_label: order.status.label(),
            order_path: order.share_path(),
            quantity: submission.quantity,
            payment_method: method_name(order.country, &submission.payment_method),
            total: tracked.formatted_total(),
            progress: tracked.progress().as_str(),
            progress_label: tracked.progress().label(),
            courier_service: submission.courier_service.clone(),
            tracking_number: submission.tracking_number.clone(),
            shipped_at: submission.shipped_at.map(format_datetime),
            submitted_at: format_datetime(submission.created_at),
            order_progress_percent: order.progress_percent(),
            current_order_count: order.current_order_count,
            minimum_order_quantity: order.minimum_order_quantity,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_format_datetime() {
        let at: DateTime<Utc> = "2026-10-08T09:05:00Z".parse().unwrap();
        assert_eq!(format_datetime(at), "Oct 8, 2026 09:05 UTC");
    }

    #[test]
    fn test_method_name_falls_back_to_id() {
        assert_eq!(method_name(Country::Ph, "gcash"), "GCash");
        assert_eq!(method_name(Country::Ph, "venmo"), "venmo");
    }
}

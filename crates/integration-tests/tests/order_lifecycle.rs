//! Integration tests for group order status rules.
//!
//! These tests exercise the lifecycle decisions without a database: the
//! status enum's transition table and the checks an order applies when read.

use chrono::{DateTime, Duration, Utc};

use gomflow_core::{OrderId, OrderStatus, ProfileId, ShareableSlug};
use gomflow_integration_tests::gcash_order;
use gomflow_web::models::GroupOrder;

fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-10-18T12:00:00Z")
        .map(|at| at.with_timezone(&Utc))
        .unwrap_or_default()
}

fn order(status: OrderStatus, count: i32, moq: i32, deadline: DateTime<Utc>) -> GroupOrder {
    let new = gcash_order(ProfileId::random(), moq, deadline);
    GroupOrder {
        id: OrderId::random(),
        gom_id: new.gom_id,
        product_name: new.product_name,
        product_description: new.product_description,
        product_image_url: None,
        price: new.price,
        country: new.country,
        payment_methods: new.payment_methods,
        payment_details: new.payment_details,
        minimum_order_quantity: moq,
        current_order_count: count,
        status,
        deadline,
        shareable_slug: ShareableSlug::generate(&mut rand::rng()),
        created_at: now() - Duration::days(7),
    }
}

// =============================================================================
// Worked Examples
// =============================================================================

#[test]
fn test_moq_reached_promotes_open_order() {
    let order = order(OrderStatus::Open, 10, 10, now() + Duration::days(3));
    assert_eq!(order.pending_transition(now()), Some(OrderStatus::MoqMet));
}

#[test]
fn test_expired_order_below_moq_is_cancelled() {
    let order = order(OrderStatus::Open, 3, 10, now() - Duration::days(1));
    assert_eq!(order.pending_transition(now()), Some(OrderStatus::Cancelled));
    assert!(!order.accepts_submissions_at(now()));
}

#[test]
fn test_moq_wins_over_expired_deadline() {
    let order = order(OrderStatus::Open, 12, 10, now() - Duration::days(1));
    assert_eq!(order.pending_transition(now()), Some(OrderStatus::MoqMet));
}

#[test]
fn test_open_order_below_moq_before_deadline_stays_open() {
    let order = order(OrderStatus::Open, 9, 10, now() + Duration::hours(1));
    assert_eq!(order.pending_transition(now()), None);
    assert!(order.accepts_submissions_at(now()));
    assert_eq!(order.remaining_to_moq(), 1);
}

// =============================================================================
// Transition Rules
// =============================================================================

#[test]
fn test_checks_never_move_settled_orders() {
    let past = now() - Duration::days(30);
    for status in [OrderStatus::MoqMet, OrderStatus::Closed, OrderStatus::Cancelled] {
        // Count below MOQ and deadline long gone: an open order would cancel
        assert_eq!(order(status, 0, 10, past).pending_transition(now()), None);
        // Count above MOQ: an open order would promote
        assert_eq!(order(status, 50, 10, past).pending_transition(now()), None);
    }
}

#[test]
fn test_no_backward_transitions() {
    for from in OrderStatus::ALL {
        assert!(!from.can_transition_to(OrderStatus::Open), "{from} -> open");
    }
    assert!(OrderStatus::Cancelled.transition_to(OrderStatus::MoqMet).is_err());
    assert!(OrderStatus::Closed.transition_to(OrderStatus::MoqMet).is_err());
    assert!(OrderStatus::MoqMet.transition_to(OrderStatus::Cancelled).is_err());
}

#[test]
fn test_terminal_states() {
    for terminal in [OrderStatus::Closed, OrderStatus::Cancelled] {
        for next in OrderStatus::ALL {
            assert!(!terminal.can_transition_to(next), "{terminal} -> {next}");
        }
        assert!(!terminal.accepts_submissions());
    }
}

#[test]
fn test_moq_met_order_keeps_accepting_until_deadline() {
    let order = order(OrderStatus::MoqMet, 15, 10, now() + Duration::days(1));
    assert!(order.accepts_submissions_at(now()));
    assert!(!order.accepts_submissions_at(now() + Duration::days(2)));
}

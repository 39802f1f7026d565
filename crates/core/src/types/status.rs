//! Status enums for group orders and submissions.
//!
//! # Order lifecycle
//!
//! ```text
//!            count >= moq
//!   open ─────────────────▶ moq_met ──┐
//!    │                                │ GOM closes
//!    │ deadline passed, count < moq   ▼
//!    └──────────────────▶ cancelled  closed ◀── open (GOM closes)
//! ```
//!
//! `moq_met`, `cancelled` and `closed` are terminal for the automatic checks.
//! Only the owning GOM moves an order to `closed`.

use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error returned for an unknown status string or a forbidden transition.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StatusError {
    /// The string does not name a known status.
    #[error("invalid order status: {0}")]
    Unknown(String),
    /// The lifecycle does not allow this move.
    #[error("cannot move order from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: OrderStatus,
        /// Requested status.
        to: OrderStatus,
    },
}

/// Group order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "gomflow.order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Accepting submissions, MOQ not reached yet.
    #[default]
    Open,
    /// Minimum order quantity reached; still accepting submissions.
    MoqMet,
    /// Closed by the GOM.
    Closed,
    /// Deadline passed before the MOQ was reached.
    Cancelled,
}

impl OrderStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 4] = [Self::Open, Self::MoqMet, Self::Closed, Self::Cancelled];

    /// The snake_case name used in storage and URLs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::MoqMet => "moq_met",
            Self::Closed => "closed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Human-readable label for badges.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::MoqMet => "MOQ Met",
            Self::Closed => "Closed",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Whether buyers may still submit against an order in this status.
    #[must_use]
    pub const fn accepts_submissions(self) -> bool {
        matches!(self, Self::Open | Self::MoqMet)
    }

    /// Whether the order counts as active on the GOM dashboard.
    #[must_use]
    pub const fn is_active(self) -> bool {
        self.accepts_submissions()
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Open, Self::MoqMet | Self::Cancelled | Self::Closed) | (Self::MoqMet, Self::Closed)
        )
    }

    /// Validate a transition.
    ///
    /// # Errors
    ///
    /// Returns `StatusError::InvalidTransition` if the move is not allowed.
    pub fn transition_to(self, next: Self) -> Result<Self, StatusError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(StatusError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Decide the automatic transition for an order, if any.
    ///
    /// - `open` with `count >= moq` becomes `moq_met`, even past the deadline.
    /// - `open` with `deadline < now` and `count < moq` becomes `cancelled`.
    /// - Every other combination stays where it is.
    #[must_use]
    pub fn evaluate(
        self,
        count: i32,
        moq: i32,
        deadline: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        if self != Self::Open {
            return None;
        }
        if count >= moq {
            return Some(Self::MoqMet);
        }
        if deadline < now {
            return Some(Self::Cancelled);
        }
        None
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "moq_met" => Ok(Self::MoqMet),
            "closed" => Ok(Self::Closed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(StatusError::Unknown(s.to_owned())),
        }
    }
}

/// Buyer-facing progress of a single submission.
///
/// Derived from the submission's payment and shipping fields; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionProgress {
    /// No payment proof uploaded yet.
    PaymentRequired,
    /// Proof uploaded, waiting on the GOM.
    PaymentPending,
    /// GOM verified the payment.
    PaymentVerified,
    /// GOM recorded a shipment.
    Shipped,
}

impl SubmissionProgress {
    /// Derive progress from the submission fields, most advanced state first.
    #[must_use]
    pub const fn derive(has_proof: bool, verified: bool, shipped: bool) -> Self {
        if shipped {
            Self::Shipped
        } else if verified {
            Self::PaymentVerified
        } else if has_proof {
            Self::PaymentPending
        } else {
            Self::PaymentRequired
        }
    }

    /// Snake-case identifier, matching the serde form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PaymentRequired => "payment_required",
            Self::PaymentPending => "payment_pending",
            Self::PaymentVerified => "payment_verified",
            Self::Shipped => "shipped",
        }
    }

    /// Human-readable label for badges.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::PaymentRequired => "Payment Required",
            Self::PaymentPending => "Payment Pending",
            Self::PaymentVerified => "Payment Verified",
            Self::Shipped => "Shipped",
        }
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

    #[test]
    fn test_moq_reached_moves_to_moq_met() {
        let deadline = now() + Duration::days(3);
        assert_eq!(
            OrderStatus::Open.evaluate(10, 10, deadline, now()),
            Some(OrderStatus::MoqMet)
        );
        assert_eq!(
            OrderStatus::Open.evaluate(12, 10, deadline, now()),
            Some(OrderStatus::MoqMet)
        );
    }

    #[test]
    fn test_expired_under_moq_is_cancelled() {
        let yesterday = now() - Duration::days(1);
        assert_eq!(
            OrderStatus::Open.evaluate(3, 10, yesterday, now()),
            Some(OrderStatus::Cancelled)
        );
    }

    #[test]
    fn test_moq_wins_over_deadline() {
        let yesterday = now() - Duration::days(1);
        assert_eq!(
            OrderStatus::Open.evaluate(10, 10, yesterday, now()),
            Some(OrderStatus::MoqMet)
        );
    }

    #[test]
    fn test_open_under_moq_before_deadline_stays() {
        let tomorrow = now() + Duration::days(1);
        assert_eq!(OrderStatus::Open.evaluate(3, 10, tomorrow, now()), None);
        // Deadline equal to now has not passed yet.
        assert_eq!(OrderStatus::Open.evaluate(3, 10, now(), now()), None);
    }

    #[test]
    fn test_non_open_statuses_never_move() {
        let yesterday = now() - Duration::days(1);
        for status in [
            OrderStatus::MoqMet,
            OrderStatus::Closed,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(status.evaluate(0, 10, yesterday, now()), None);
            assert_eq!(status.evaluate(50, 10, yesterday, now()), None);
        }
    }

    #[test]
    fn test_transitions_only_move_forward() {
        use OrderStatus::{Cancelled, Closed, MoqMet, Open};

        assert!(Open.can_transition_to(MoqMet));
        assert!(Open.can_transition_to(Cancelled));
        assert!(Open.can_transition_to(Closed));
        assert!(MoqMet.can_transition_to(Closed));

        for from in OrderStatus::ALL {
            assert!(!from.can_transition_to(Open), "{from} -> open allowed");
            assert!(!from.can_transition_to(from), "{from} -> {from} allowed");
        }
        assert!(!MoqMet.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Closed));
        assert!(!Closed.can_transition_to(MoqMet));

        assert_eq!(
            Cancelled.transition_to(MoqMet),
            Err(StatusError::InvalidTransition {
                from: Cancelled,
                to: MoqMet
            })
        );
    }

    #[test]
    fn test_string_round_trip() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("pending".parse::<OrderStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&OrderStatus::MoqMet).unwrap(),
            "\"moq_met\""
        );
    }

    #[test]
    fn test_accepts_submissions() {
        assert!(OrderStatus::Open.accepts_submissions());
        assert!(OrderStatus::MoqMet.accepts_submissions());
        assert!(!OrderStatus::Closed.accepts_submissions());
        assert!(!OrderStatus::Cancelled.accepts_submissions());
    }

    #[test]
    fn test_submission_progress_precedence() {
        use SubmissionProgress::{PaymentPending, PaymentRequired, PaymentVerified, Shipped};

        assert_eq!(SubmissionProgress::derive(false, false, false), PaymentRequired);
        assert_eq!(SubmissionProgress::derive(true, false, false), PaymentPending);
        assert_eq!(SubmissionProgress::derive(true, true, false), PaymentVerified);
        assert_eq!(SubmissionProgress::derive(false, true, false), PaymentVerified);
        assert_eq!(SubmissionProgress::derive(true, true, true), Shipped);
        assert_eq!(SubmissionProgress::derive(false, false, true), Shipped);
    }
}

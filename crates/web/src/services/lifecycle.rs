//! Order lifecycle checks.
//!
//! Status changes are decided by [`OrderStatus::evaluate`] and applied with
//! conditional UPDATEs, so concurrent checks of the same order are
//! idempotent: the first writer wins and later ones match no rows.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, instrument};

use gomflow_core::{OrderId, OrderStatus, ProfileId};

use crate::db::{OrderRepository, RepositoryError};
use crate::models::GroupOrder;

/// Orders changed by one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Open orders found at or above their MOQ.
    pub promoted: Vec<OrderId>,
    /// Open orders past their deadline and under their MOQ.
    pub cancelled: Vec<OrderId>,
}

impl SweepReport {
    /// Whether the sweep changed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.promoted.is_empty() && self.cancelled.is_empty()
    }
}

/// Applies automatic status transitions and GOM closes.
pub struct LifecycleService<'a> {
    orders: OrderRepository<'a>,
}

impl<'a> LifecycleService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            orders: OrderRepository::new(pool),
        }
    }

    /// Move an open order to `moq_met` if its count has reached the MOQ.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn check_moq(&self, order_id: OrderId) -> Result<bool, RepositoryError> {
        let changed = self.orders.mark_moq_met(order_id).await?;
        if changed {
            info!(order_id = %order_id, "Order reached its MOQ");
        }
        Ok(changed)
    }

    /// Apply any transition due at `now` and return the current order.
    ///
    /// When the conditional update matches nothing, another writer got there
    /// first and the order is reloaded to pick up its status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if an update or reload fails.
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn check_order(
        &self,
        mut order: GroupOrder,
        now: DateTime<Utc>,
    ) -> Result<GroupOrder, RepositoryError> {
        let Some(next) = order.pending_transition(now) else {
            return Ok(order);
        };

        let applied = match next {
            OrderStatus::MoqMet => self.check_moq(order.id).await?,
            OrderStatus::Cancelled => {
                let cancelled = self.orders.cancel_if_expired(order.id, now).await?;
                if cancelled {
                    info!(
                        count = order.current_order_count,
                        moq = order.minimum_order_quantity,
                        "Order expired below its MOQ"
                    );
                }
                cancelled
            }
            OrderStatus::Open | OrderStatus::Closed => false,
        };

        if applied {
            order.status = next;
            return Ok(order);
        }

        self.orders
            .get_by_id(order.id)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// [`check_order`](Self::check_order) for every order in a list.
    ///
    /// # Errors
    ///
    /// Returns the first `RepositoryError` encountered.
    pub async fn check_orders(
        &self,
        orders: Vec<GroupOrder>,
        now: DateTime<Utc>,
    ) -> Result<Vec<GroupOrder>, RepositoryError> {
        let mut checked = Vec::with_capacity(orders.len());
        for order in orders {
            checked.push(self.check_order(order, now).await?);
        }
        Ok(checked)
    }

    /// Check every open order.
    ///
    /// Promotion runs first so an order that reached its MOQ is never
    /// cancelled for being past its deadline.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if either update fails.
    #[instrument(skip(self))]
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport, RepositoryError> {
        let promoted = self.orders.promote_reached().await?;
        let cancelled = self.orders.cancel_expired(now).await?;
        Ok(SweepReport {
            promoted,
            cancelled,
        })
    }

    /// Close an order on behalf of its GOM.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for a missing or foreign order and
    /// `RepositoryError::Conflict` if it is no longer open.
    pub async fn close(
        &self,
        order_id: OrderId,
        gom_id: ProfileId,
    ) -> Result<GroupOrder, RepositoryError> {
        let order = self.orders.close(order_id, gom_id).await?;
        info!(order_id = %order_id, "Order closed by GOM");
        Ok(order)
    }
}

/// Spawn the periodic expiry sweep.
///
/// The task runs until the process exits. A failed sweep is logged and the
/// next tick tries again.
pub fn spawn_sweeper(pool: PgPool, every: Duration) {
    info!(interval_secs = every.as_secs(), "Spawning order sweep task");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match LifecycleService::new(&pool).sweep(Utc::now()).await {
                Ok(report) if report.is_empty() => {}
                Ok(report) => info!(
                    promoted = report.promoted.len(),
                    cancelled = report.cancelled.len(),
                    "Order sweep applied transitions"
                ),
                Err(e) => error!(error = %e, "Order sweep failed"),
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_report_is_empty() {
        assert!(SweepReport::default().is_empty());

        let report = SweepReport {
            promoted: vec![],
            cancelled: vec![OrderId::random()],
        };
        assert!(!report.is_empty());
    }
}

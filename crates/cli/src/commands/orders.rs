//! Group order maintenance commands.

use chrono::Utc;

use gomflow_web::services::lifecycle::LifecycleService;
use gomflow_web::services::listings::ListingService;

use super::CommandError;

/// Promote every open order that reached its MOQ and cancel every open
/// order past its deadline.
///
/// # Errors
///
/// Returns an error if the database is unreachable or an update fails.
pub async fn sweep() -> Result<(), CommandError> {
    let pool = super::connect().await?;

    let report = LifecycleService::new(&pool).sweep(Utc::now()).await?;
    for id in &report.promoted {
        tracing::info!(order_id = %id, "MOQ met");
    }
    for id in &report.cancelled {
        tracing::info!(order_id = %id, "Cancelled (deadline passed below MOQ)");
    }
    tracing::info!(
        promoted = report.promoted.len(),
        cancelled = report.cancelled.len(),
        "Sweep complete"
    );
    Ok(())
}

/// Check one order by slug and log its current state.
///
/// # Errors
///
/// Returns an error if the order does not exist or a query fails.
pub async fn check(slug: &str) -> Result<(), CommandError> {
    let pool = super::connect().await?;

    let order = ListingService::new(&pool)
        .get_by_slug(slug, Utc::now())
        .await?;
    tracing::info!(
        order_id = %order.id,
        status = order.status.label(),
        count = order.current_order_count,
        moq = order.minimum_order_quantity,
        deadline = %order.deadline,
        "{}",
        order.product_name
    );
    Ok(())
}

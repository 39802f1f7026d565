//! Group order repository.
//!
//! Status changes are conditional UPDATEs so concurrent checks (page views,
//! intake, the background sweep) are idempotent.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use gomflow_core::{Country, Currency, OrderId, OrderStatus, Price, ProfileId, ShareableSlug};

use super::RepositoryError;
use crate::models::{GroupOrder, NewOrder, PaymentDetails};

/// Unique constraint on `group_order.shareable_slug`.
pub const SLUG_CONSTRAINT: &str = "group_order_shareable_slug_key";

const ORDER_COLUMNS: &str = "id, gom_id, product_name, product_description, product_image_url, \
     price, currency, country, payment_methods, payment_details, minimum_order_quantity, \
     current_order_count, status, deadline, shareable_slug, created_at";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    gom_id: Uuid,
    product_name: String,
    product_description: Option<String>,
    product_image_url: Option<String>,
    price: Decimal,
    currency: String,
    country: String,
    payment_methods: Json<Vec<String>>,
    payment_details: Json<PaymentDetails>,
    minimum_order_quantity: i32,
    current_order_count: i32,
    status: OrderStatus,
    deadline: DateTime<Utc>,
    shareable_slug: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for GroupOrder {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let currency = Currency::parse(row.currency.trim()).map_err(|e| corrupt(id, "currency", e))?;
        let price = Price::new(row.price, currency).map_err(|e| corrupt(id, "price", e))?;
        let country = Country::parse(&row.country).map_err(|e| corrupt(id, "country", e))?;
        let shareable_slug =
            ShareableSlug::parse(&row.shareable_slug).map_err(|e| corrupt(id, "slug", e))?;

        Ok(Self {
            id: OrderId::new(row.id),
            gom_id: ProfileId::new(row.gom_id),
            product_name: row.product_name,
            product_description: row.product_description,
            product_image_url: row.product_image_url,
            price,
            country,
            payment_methods: row.payment_methods.0,
            payment_details: row.payment_details.0,
            minimum_order_quantity: row.minimum_order_quantity,
            current_order_count: row.current_order_count,
            status: row.status,
            deadline: row.deadline,
            shareable_slug,
            created_at: row.created_at,
        })
    }
}

fn corrupt(id: Uuid, what: &str, e: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::DataCorruption(format!("invalid {what} on order {id}: {e}"))
}

fn into_orders(rows: Vec<OrderRow>) -> Result<Vec<GroupOrder>, RepositoryError> {
    rows.into_iter().map(GroupOrder::try_from).collect()
}

/// Repository for group order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a validated order under the given slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DuplicateCode` if the slug is taken.
    pub async fn create(
        &self,
        order: &NewOrder,
        slug: &ShareableSlug,
    ) -> Result<GroupOrder, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "INSERT INTO gomflow.group_order (
                 gom_id, product_name, product_description, product_image_url,
                 price, currency, country, payment_methods, payment_details,
                 minimum_order_quantity, deadline, shareable_slug
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order.gom_id.as_uuid())
        .bind(&order.product_name)
        .bind(order.product_description.as_deref())
        .bind(order.product_image_url.as_deref())
        .bind(order.price.amount)
        .bind(order.price.currency.as_str())
        .bind(order.country.code())
        .bind(Json(&order.payment_methods))
        .bind(Json(&order.payment_details))
        .bind(order.minimum_order_quantity)
        .bind(order.deadline)
        .bind(slug.as_str())
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, SLUG_CONSTRAINT))?;

        GroupOrder::try_from(row)
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: OrderId) -> Result<Option<GroupOrder>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM gomflow.group_order WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(self.pool)
        .await?;

        row.map(GroupOrder::try_from).transpose()
    }

    /// Get an order by its shareable slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(
        &self,
        slug: &ShareableSlug,
    ) -> Result<Option<GroupOrder>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM gomflow.group_order WHERE shareable_slug = $1"
        ))
        .bind(slug.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(GroupOrder::try_from).transpose()
    }

    /// Newest open orders, for the home page.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_recent_open(&self, limit: i64) -> Result<Vec<GroupOrder>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM gomflow.group_order
             WHERE status = 'open'
             ORDER BY created_at DESC
             LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        into_orders(rows)
    }

    /// All orders created by a GOM, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_gom(&self, gom_id: ProfileId) -> Result<Vec<GroupOrder>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM gomflow.group_order
             WHERE gom_id = $1
             ORDER BY created_at DESC"
        ))
        .bind(gom_id.as_uuid())
        .fetch_all(self.pool)
        .await?;

        into_orders(rows)
    }

    /// Move one open order to `moq_met` if its count has reached the MOQ.
    ///
    /// Returns whether the status changed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_moq_met(&self, id: OrderId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE gomflow.group_order SET status = 'moq_met'
             WHERE id = $1 AND status = 'open'
               AND current_order_count >= minimum_order_quantity",
        )
        .bind(id.as_uuid())
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Cancel one open order whose deadline passed before reaching the MOQ.
    ///
    /// Returns whether the status changed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn cancel_if_expired(
        &self,
        id: OrderId,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE gomflow.group_order SET status = 'cancelled'
             WHERE id = $1 AND status = 'open' AND deadline < $2
               AND current_order_count < minimum_order_quantity",
        )
        .bind(id.as_uuid())
        .bind(now)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Move every open order at or above its MOQ to `moq_met`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn promote_reached(&self) -> Result<Vec<OrderId>, RepositoryError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "UPDATE gomflow.group_order SET status = 'moq_met'
             WHERE status = 'open' AND current_order_count >= minimum_order_quantity
             RETURNING id",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(ids.into_iter().map(OrderId::new).collect())
    }

    /// Cancel every open order past its deadline and still under its MOQ.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn cancel_expired(&self, now: DateTime<Utc>) -> Result<Vec<OrderId>, RepositoryError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "UPDATE gomflow.group_order SET status = 'cancelled'
             WHERE status = 'open' AND deadline < $1
               AND current_order_count < minimum_order_quantity
             RETURNING id",
        )
        .bind(now)
        .fetch_all(self.pool)
        .await?;

        Ok(ids.into_iter().map(OrderId::new).collect())
    }

    /// Close an order on behalf of its GOM.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist or
    /// belongs to another GOM, and `RepositoryError::Conflict` if it is
    /// already closed or cancelled.
    pub async fn close(&self, id: OrderId, gom_id: ProfileId) -> Result<GroupOrder, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE gomflow.group_order SET status = 'closed'
             WHERE id = $1 AND gom_id = $2 AND status IN ('open', 'moq_met')
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(gom_id.as_uuid())
        .fetch_optional(self.pool)
        .await?;

        if let Some(row) = row {
            return GroupOrder::try_from(row);
        }

        match self.get_by_id(id).await? {
            Some(order) if order.gom_id == gom_id => Err(RepositoryError::Conflict(format!(
                "order is already {}",
                order.status
            ))),
            _ => Err(RepositoryError::NotFound),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn row() -> OrderRow {
        OrderRow {
            id: Uuid::new_v4(),
            gom_id: Uuid::new_v4(),
            product_name: "Lightstick".to_owned(),
            product_description: None,
            product_image_url: None,
            price: Decimal::new(185_000, 2),
            currency: "PHP".to_owned(),
            country: "PH".to_owned(),
            payment_methods: Json(vec!["gcash".to_owned()]),
            payment_details: Json(PaymentDetails::new()),
            minimum_order_quantity: 10,
            current_order_count: 0,
            status: OrderStatus::Open,
            deadline: Utc::now(),
            shareable_slug: "q8m2x7ka".to_owned(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_converts() {
        let order = GroupOrder::try_from(row()).unwrap();
        assert_eq!(order.price.to_string(), "1850.00 PHP");
        assert_eq!(order.country, Country::Ph);
        assert_eq!(order.shareable_slug.as_str(), "q8m2x7ka");
    }

    #[test]
    fn test_corrupt_rows_are_reported() {
        let mut bad = row();
        bad.shareable_slug = "UPPER".to_owned();
        assert!(matches!(
            GroupOrder::try_from(bad),
            Err(RepositoryError::DataCorruption(_))
        ));

        let mut bad = row();
        bad.price = Decimal::ZERO;
        assert!(matches!(
            GroupOrder::try_from(bad),
            Err(RepositoryError::DataCorruption(_))
        ));
    }
}

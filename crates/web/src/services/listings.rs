//! Order creation and the GOM's view of their orders.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use gomflow_core::{OrderId, ProfileId, ShareableSlug};

use crate::db::OrderRepository;
use crate::models::{GroupOrder, NewOrder};

use super::ServiceError;
use super::codes::{MAX_CODE_ATTEMPTS, insert_with_unique_code};
use super::lifecycle::LifecycleService;
use super::storage::{PRODUCT_IMAGES_BUCKET, StorageClient, UploadedFile, product_image_path};

/// Number of listings shown on the home page.
pub const RECENT_ORDERS_LIMIT: i64 = 10;

/// Order listing service.
pub struct ListingService<'a> {
    pool: &'a PgPool,
    orders: OrderRepository<'a>,
}

impl<'a> ListingService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            orders: OrderRepository::new(pool),
        }
    }

    /// Validate and store a new listing under a fresh shareable slug.
    ///
    /// An optional product image is uploaded to the public bucket first and
    /// its public URL stored on the order.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InvalidOrder` for rejected input,
    /// `ServiceError::Storage` if the image upload fails, and
    /// `ServiceError::Code` if no unused slug could be found.
    #[instrument(skip_all, fields(gom_id = %new.gom_id))]
    pub async fn create(
        &self,
        mut new: NewOrder,
        image: Option<UploadedFile>,
        storage: &StorageClient,
        now: DateTime<Utc>,
    ) -> Result<GroupOrder, ServiceError> {
        new.validate(now)?;

        let mut uploaded = None;
        if let Some(file) = image {
            file.validate_image()?;
            let path = product_image_path(new.gom_id, now, &file.file_name);
            storage.upload(PRODUCT_IMAGES_BUCKET, &path, &file).await?;
            new.product_image_url = Some(storage.public_url(PRODUCT_IMAGES_BUCKET, &path));
            uploaded = Some(path);
        }

        let inserted = insert_with_unique_code(
            || ShareableSlug::generate(&mut rand::rng()),
            |slug| {
                let new = &new;
                async move { self.orders.create(new, &slug).await }
            },
            MAX_CODE_ATTEMPTS,
        )
        .await;

        let order = match inserted {
            Ok(order) => order,
            Err(e) => {
                if let Some(path) = uploaded {
                    storage.discard(PRODUCT_IMAGES_BUCKET, &path).await;
                }
                return Err(e.into());
            }
        };

        tracing::info!(order_id = %order.id, slug = %order.shareable_slug, "Order created");
        Ok(order)
    }

    /// Public listing by slug, with any due transition applied.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown or malformed slug.
    pub async fn get_by_slug(
        &self,
        slug: &str,
        now: DateTime<Utc>,
    ) -> Result<GroupOrder, ServiceError> {
        let slug = ShareableSlug::parse(slug).map_err(|_| ServiceError::NotFound("order"))?;
        let order = self
            .orders
            .get_by_slug(&slug)
            .await?
            .ok_or(ServiceError::NotFound("order"))?;
        Ok(LifecycleService::new(self.pool)
            .check_order(order, now)
            .await?)
    }

    /// Most recent listings still accepting submissions.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn recent_open(&self, now: DateTime<Utc>) -> Result<Vec<GroupOrder>, ServiceError> {
        let orders = self.orders.list_recent_open(RECENT_ORDERS_LIMIT).await?;
        let orders = LifecycleService::new(self.pool)
            .check_orders(orders, now)
            .await?;
        Ok(orders
            .into_iter()
            .filter(|order| order.accepts_submissions_at(now))
            .collect())
    }

    /// Every order a GOM has created, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn for_gom(
        &self,
        gom_id: ProfileId,
        now: DateTime<Utc>,
    ) -> Result<Vec<GroupOrder>, ServiceError> {
        let orders = self.orders.list_by_gom(gom_id).await?;
        Ok(LifecycleService::new(self.pool)
            .check_orders(orders, now)
            .await?)
    }

    /// One of the GOM's own orders.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the order does not exist and
    /// `ServiceError::Forbidden` if another GOM owns it.
    pub async fn owned(
        &self,
        order_id: OrderId,
        gom_id: ProfileId,
        now: DateTime<Utc>,
    ) -> Result<GroupOrder, ServiceError> {
        let order = self
            .orders
            .get_by_id(order_id)
            .await?
            .ok_or(ServiceError::NotFound("order"))?;
        if order.gom_id != gom_id {
            return Err(ServiceError::Forbidden);
        }
        Ok(LifecycleService::new(self.pool)
            .check_order(order, now)
            .await?)
    }
}

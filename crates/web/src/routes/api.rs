//! JSON API handlers.
//!
//! Read-only endpoints mirroring the public pages. Errors are returned as
//! `{"error": "..."}` with the same status codes as the HTML routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use serde::Serialize;
use tracing::instrument;

use gomflow_core::Country;

use crate::error::AppError;
use crate::services::ServiceError;
use crate::services::listings::ListingService;
use crate::services::tracking::TrackingService;
use crate::state::AppState;

use super::track::TrackQuery;
use super::views::{OrderCard, PaymentOption, TrackingView, payment_options};

/// Build the API router (mounted under `/api`).
///
/// `/api/track` is routed with the HTML tracking page so both share a rate
/// limiter.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders/{slug}", get(order))
        .route("/countries", get(countries))
}

/// Error wrapper rendering [`AppError`] as JSON.
#[derive(Debug)]
pub struct ApiError(AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.0.into_json_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Public view of an order listing.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub slug: String,
    pub accepting_submissions: bool,
    #[serde(flatten)]
    pub order: OrderCard,
    pub payment_options: Vec<PaymentOption>,
}

/// A supported country with its payment methods.
#[derive(Debug, Serialize)]
pub struct CountryResponse {
    pub code: &'static str,
    pub name: &'static str,
    pub payment_methods: Vec<PaymentMethodResponse>,
    pub top_banks: &'static [&'static str],
}

/// A payment method offered in a country.
#[derive(Debug, Serialize)]
pub struct PaymentMethodResponse {
    pub id: &'static str,
    pub name: &'static str,
}

/// Order listing by shareable slug.
///
/// # Errors
///
/// Returns `404` for an unknown or malformed slug.
#[instrument(skip(state))]
pub async fn order(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<OrderResponse> {
    let now = Utc::now();
    let order = ListingService::new(state.pool())
        .get_by_slug(&slug, now)
        .await?;

    Ok(Json(OrderResponse {
        slug: order.shareable_slug.to_string(),
        accepting_submissions: order.accepts_submissions_at(now),
        payment_options: payment_options(&order),
        order: OrderCard::from(&order),
    }))
}

/// Tracking lookup.
///
/// # Errors
///
/// Returns `400` without a code and `404` for any miss.
#[instrument(skip_all)]
pub async fn track(
    State(state): State<AppState>,
    Query(query): Query<TrackQuery>,
) -> ApiResult<TrackingView> {
    let code = query
        .code()
        .ok_or_else(|| AppError::BadRequest("code is required".to_owned()))?;
    let tracked = TrackingService::new(state.pool())
        .lookup(code, query.email(), Utc::now())
        .await?;
    Ok(Json(TrackingView::from(&tracked)))
}

/// Supported countries and their payment methods.
pub async fn countries() -> Json<Vec<CountryResponse>> {
    Json(
        Country::ALL
            .into_iter()
            .map(|country| CountryResponse {
                code: country.code(),
                name: country.name(),
                payment_methods: country
                    .payment_methods()
                    .iter()
                    .map(|m| PaymentMethodResponse {
                        id: m.id,
                        name: m.name,
                    })
                    .collect(),
                top_banks: country.top_banks(),
            })
            .collect(),
    )
}

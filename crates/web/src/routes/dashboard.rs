//! GOM dashboard: order list, order creation and order management.
//!
//! Every handler here requires a signed-in GOM and only touches that GOM's
//! own orders and submissions.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Multipart, Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use gomflow_core::{Country, OrderId, SubmissionId};

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireGom;
use crate::models::{GroupOrder, Shipment};
use crate::services::intake::SubmissionService;
use crate::services::lifecycle::LifecycleService;
use crate::services::listings::ListingService;
use crate::state::AppState;

use super::form::{MultipartForm, form_error, redirect_with_error};
use super::gom::{CountryOption, country_options};
use super::views::{OrderCard, PaymentOption, SubmissionLine, payment_options};

// =============================================================================
// Templates
// =============================================================================

/// Dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/index.html")]
pub struct DashboardTemplate {
    pub display_name: String,
    pub active_orders: usize,
    pub total_committed: i64,
    pub orders: Vec<OrderCard>,
}

/// Payment methods of one country, for the create form.
#[derive(Debug, Clone)]
pub struct CountryMethods {
    pub code: &'static str,
    pub name: &'static str,
    pub methods: Vec<MethodOption>,
}

/// A payment method checkbox on the create form.
#[derive(Debug, Clone)]
pub struct MethodOption {
    pub id: &'static str,
    pub name: &'static str,
}

/// Create-order form template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/new_order.html")]
pub struct NewOrderTemplate {
    pub error: Option<String>,
    pub countries: Vec<CountryOption>,
    pub country_methods: Vec<CountryMethods>,
}

/// Manage-order template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/manage.html")]
pub struct ManageOrderTemplate {
    pub order: OrderCard,
    pub share_url: String,
    pub can_close: bool,
    pub payment_options: Vec<PaymentOption>,
    pub submissions: Vec<SubmissionLine>,
    pub error: Option<String>,
}

// =============================================================================
// Query and Form Types
// =============================================================================

/// Error text carried through a redirect.
#[derive(Debug, Deserialize)]
pub struct ErrorQuery {
    pub error: Option<String>,
}

/// Shipment form data.
#[derive(Debug, Deserialize)]
pub struct ShipForm {
    pub tracking_number: String,
    pub courier_service: String,
}

fn order_path(order_id: OrderId) -> String {
    format!("/dashboard/orders/{order_id}")
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the GOM dashboard.
#[instrument(skip_all, fields(gom_id = %gom.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireGom(gom): RequireGom,
) -> Result<impl IntoResponse> {
    let orders = ListingService::new(state.pool())
        .for_gom(gom.id, Utc::now())
        .await?;

    Ok(DashboardTemplate {
        display_name: gom
            .discord_username
            .clone()
            .unwrap_or_else(|| gom.email.to_string()),
        active_orders: orders.iter().filter(|o| o.status.is_active()).count(),
        total_committed: orders
            .iter()
            .map(|o| i64::from(o.current_order_count))
            .sum(),
        orders: orders.iter().map(OrderCard::from).collect(),
    })
}

/// Display the create-order form.
pub async fn new_order_page(
    RequireGom(gom): RequireGom,
    Query(query): Query<ErrorQuery>,
) -> impl IntoResponse {
    NewOrderTemplate {
        error: query.error,
        countries: country_options(gom.country),
        country_methods: Country::ALL
            .into_iter()
            .map(|country| CountryMethods {
                code: country.code(),
                name: country.name(),
                methods: country
                    .payment_methods()
                    .iter()
                    .map(|m| MethodOption {
                        id: m.id,
                        name: m.name,
                    })
                    .collect(),
            })
            .collect(),
    }
}

/// Create an order from the multipart form.
#[instrument(skip_all, fields(gom_id = %gom.id))]
pub async fn create_order(
    State(state): State<AppState>,
    RequireGom(gom): RequireGom,
    multipart: Multipart,
) -> Result<Response> {
    let mut form = MultipartForm::read(multipart).await?;
    let new = match form.new_order(gom.id) {
        Ok(new) => new,
        Err(msg) => return Ok(redirect_with_error("/dashboard/orders/new", &msg)),
    };
    let image = form.take_file("product_image");

    match ListingService::new(state.pool())
        .create(new, image, state.storage(), Utc::now())
        .await
    {
        Ok(order) => Ok(Redirect::to(&order_path(order.id)).into_response()),
        Err(e) => Ok(redirect_with_error("/dashboard/orders/new", &form_error(e)?)),
    }
}

/// Display one order with its submissions.
#[instrument(skip_all, fields(gom_id = %gom.id, order_id = %order_id))]
pub async fn manage(
    State(state): State<AppState>,
    RequireGom(gom): RequireGom,
    Path(order_id): Path<OrderId>,
    Query(query): Query<ErrorQuery>,
) -> Result<impl IntoResponse> {
    let order: GroupOrder = ListingService::new(state.pool())
        .owned(order_id, gom.id, Utc::now())
        .await?;
    let submissions = SubmissionService::new(state.pool())
        .list_for_order(order_id, gom.id)
        .await?;

    Ok(ManageOrderTemplate {
        share_url: state.config().absolute_url(&order.share_path()),
        can_close: order.status.accepts_submissions(),
        payment_options: payment_options(&order),
        submissions: submissions
            .iter()
            .map(|s| SubmissionLine::new(s, order.country))
            .collect(),
        order: OrderCard::from(&order),
        error: query.error,
    })
}

/// Close an order to new submissions.
#[instrument(skip_all, fields(gom_id = %gom.id, order_id = %order_id))]
pub async fn close_order(
    State(state): State<AppState>,
    RequireGom(gom): RequireGom,
    Path(order_id): Path<OrderId>,
) -> Result<Response> {
    match LifecycleService::new(state.pool())
        .close(order_id, gom.id)
        .await
    {
        Ok(_) => Ok(Redirect::to(&order_path(order_id)).into_response()),
        Err(e) => Ok(redirect_with_error(
            &order_path(order_id),
            &form_error(e.into())?,
        )),
    }
}

/// Mark a submission's payment as verified.
#[instrument(skip_all, fields(gom_id = %gom.id, submission_id = %submission_id))]
pub async fn verify_submission(
    State(state): State<AppState>,
    RequireGom(gom): RequireGom,
    Path(submission_id): Path<SubmissionId>,
) -> Result<Response> {
    let submission = SubmissionService::new(state.pool())
        .verify_payment(submission_id, gom.id)
        .await?;
    Ok(Redirect::to(&order_path(submission.order_id)).into_response())
}

/// Record the shipment of a submission.
#[instrument(skip_all, fields(gom_id = %gom.id, submission_id = %submission_id))]
pub async fn ship_submission(
    State(state): State<AppState>,
    RequireGom(gom): RequireGom,
    Path(submission_id): Path<SubmissionId>,
    Form(form): Form<ShipForm>,
) -> Result<Response> {
    let shipment = Shipment::parse(&form.tracking_number, &form.courier_service)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let submission = SubmissionService::new(state.pool())
        .record_shipment(submission_id, gom.id, &shipment, Utc::now())
        .await?;
    Ok(Redirect::to(&order_path(submission.order_id)).into_response())
}

/// Redirect to a short-lived URL of a submission's payment proof.
#[instrument(skip_all, fields(gom_id = %gom.id, submission_id = %submission_id))]
pub async fn payment_proof(
    State(state): State<AppState>,
    RequireGom(gom): RequireGom,
    Path(submission_id): Path<SubmissionId>,
) -> Result<Response> {
    let url = SubmissionService::new(state.pool())
        .proof_url(
            submission_id,
            gom.id,
            state.storage(),
            state.config().proof_url_ttl,
        )
        .await?;
    Ok(Redirect::to(&url).into_response())
}

//! Public order page and submission intake.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Path, Query, State},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::services::intake::SubmissionService;
use crate::services::listings::ListingService;
use crate::state::AppState;

use super::form::{MultipartForm, form_error, redirect_with_error};
use super::views::{OrderCard, PaymentOption, payment_options};

/// Order page template.
#[derive(Template, WebTemplate)]
#[template(path = "order/show.html")]
pub struct OrderTemplate {
    pub order: OrderCard,
    pub slug: String,
    pub accepting: bool,
    pub signed_in: bool,
    pub payment_options: Vec<PaymentOption>,
    pub error: Option<String>,
}

/// Confirmation shown after a successful submission.
#[derive(Template, WebTemplate)]
#[template(path = "order/submitted.html")]
pub struct SubmittedTemplate {
    pub product_name: String,
    pub order_path: String,
    pub quantity: i32,
    pub total: String,
    pub tracking_code: Option<String>,
    pub guest_email: Option<String>,
    pub moq_reached: bool,
    pub has_proof: bool,
}

/// Error text carried through a redirect.
#[derive(Debug, Deserialize)]
pub struct OrderQuery {
    pub error: Option<String>,
}

fn order_path(slug: &str) -> String {
    format!("/order/{slug}")
}

/// Display a listing with its submission form.
#[instrument(skip(state, user, query))]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(slug): Path<String>,
    Query(query): Query<OrderQuery>,
) -> Result<impl IntoResponse> {
    let now = Utc::now();
    let order = ListingService::new(state.pool())
        .get_by_slug(&slug, now)
        .await?;

    Ok(OrderTemplate {
        accepting: order.accepts_submissions_at(now),
        slug: order.shareable_slug.to_string(),
        signed_in: user.is_some(),
        payment_options: payment_options(&order),
        order: OrderCard::from(&order),
        error: query.error,
    })
}

/// Place a submission from the order page.
///
/// Signed-in buyers are recorded by profile; guests must give an email and
/// receive a tracking code.
#[instrument(skip(state, user, multipart))]
pub async fn submit(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(slug): Path<String>,
    multipart: Multipart,
) -> Result<Response> {
    let now = Utc::now();
    let order = ListingService::new(state.pool())
        .get_by_slug(&slug, now)
        .await?;

    let mut form = MultipartForm::read(multipart).await?;
    let new = match form.new_submission(order.id, user.as_ref().map(|u| u.id)) {
        Ok(new) => new,
        Err(msg) => return Ok(redirect_with_error(&order_path(&slug), &msg)),
    };
    let proof = form.take_file("payment_proof");

    let created = match SubmissionService::new(state.pool())
        .create(new, proof, state.storage(), now)
        .await
    {
        Ok(created) => created,
        Err(e) => return Ok(redirect_with_error(&order_path(&slug), &form_error(e)?)),
    };

    add_breadcrumb("order", "Submitted order", Some(&[("slug", slug.as_str())]));
    let submission = created.submission;
    Ok(SubmittedTemplate {
        product_name: order.product_name.clone(),
        order_path: order.share_path(),
        quantity: submission.quantity,
        total: order
            .price
            .format_amount(order.line_total(submission.quantity)),
        tracking_code: submission.tracking_code.as_ref().map(ToString::to_string),
        guest_email: submission.contact_email().map(str::to_owned),
        moq_reached: created.moq_reached,
        has_proof: submission.payment_proof_url.is_some(),
    }
    .into_response())
}

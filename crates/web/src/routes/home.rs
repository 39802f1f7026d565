//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use chrono::Utc;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::services::listings::ListingService;
use crate::state::AppState;

use super::views::OrderCard;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub signed_in: bool,
    pub orders: Vec<OrderCard>,
}

/// Display the home page with the most recent open orders.
#[instrument(skip_all)]
pub async fn home(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
) -> Result<impl IntoResponse> {
    let orders = ListingService::new(state.pool())
        .recent_open(Utc::now())
        .await?;

    Ok(HomeTemplate {
        signed_in: user.is_some(),
        orders: orders.iter().map(OrderCard::from).collect(),
    })
}

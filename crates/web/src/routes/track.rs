//! Tracking-code lookup page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::services::ServiceError;
use crate::services::tracking::TrackingService;
use crate::state::AppState;

use super::views::TrackingView;

/// Tracking page template.
#[derive(Template, WebTemplate)]
#[template(path = "track.html")]
pub struct TrackTemplate {
    pub code: String,
    pub email: String,
    pub result: Option<TrackingView>,
    pub not_found: bool,
}

/// Lookup query. Both fields are optional so the bare page renders a form.
#[derive(Debug, Default, Deserialize)]
pub struct TrackQuery {
    pub code: Option<String>,
    pub email: Option<String>,
}

impl TrackQuery {
    /// Trimmed tracking code, if one was entered.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }

    /// Trimmed email, if one was entered.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }
}

/// Display the tracking form and, when a code was given, its result.
///
/// Any miss renders the same "not found" notice.
#[instrument(skip_all)]
pub async fn track(
    State(state): State<AppState>,
    Query(query): Query<TrackQuery>,
) -> Result<impl IntoResponse> {
    let mut page = TrackTemplate {
        code: query.code().unwrap_or_default().to_owned(),
        email: query.email().unwrap_or_default().to_owned(),
        result: None,
        not_found: false,
    };

    let Some(code) = query.code() else {
        return Ok(page);
    };

    match TrackingService::new(state.pool())
        .lookup(code, query.email(), Utc::now())
        .await
    {
        Ok(tracked) => page.result = Some(TrackingView::from(&tracked)),
        Err(ServiceError::NotFound(_)) => page.not_found = true,
        Err(e) => return Err(e.into()),
    }
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_trims_blank_fields() {
        let query = TrackQuery {
            code: Some("  GOM-ABCD2345 ".to_owned()),
            email: Some("   ".to_owned()),
        };
        assert_eq!(query.code(), Some("GOM-ABCD2345"));
        assert_eq!(query.email(), None);
        assert_eq!(TrackQuery::default().code(), None);
    }
}

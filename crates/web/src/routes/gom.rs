//! Become-a-GOM upgrade flow.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use gomflow_core::Country;

use crate::db::ProfileRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// A country choice on the upgrade form.
#[derive(Debug, Clone)]
pub struct CountryOption {
    pub code: &'static str,
    pub name: &'static str,
    pub methods: String,
    pub selected: bool,
}

/// Country options for a select, with the current choice marked.
#[must_use]
pub fn country_options(selected: Option<Country>) -> Vec<CountryOption> {
    Country::ALL
        .into_iter()
        .map(|country| CountryOption {
            code: country.code(),
            name: country.name(),
            methods: country
                .payment_methods()
                .iter()
                .map(|m| m.name)
                .collect::<Vec<_>>()
                .join(", "),
            selected: Some(country) == selected,
        })
        .collect()
}

/// Become-GOM page template.
#[derive(Template, WebTemplate)]
#[template(path = "become_gom.html")]
pub struct BecomeGomTemplate {
    pub already_gom: bool,
    pub email: String,
    pub countries: Vec<CountryOption>,
    pub error: Option<&'static str>,
}

/// Query parameters for the upgrade page.
#[derive(Debug, Deserialize)]
pub struct BecomeGomQuery {
    pub error: Option<String>,
}

/// Upgrade form data.
#[derive(Debug, Deserialize)]
pub struct BecomeGomForm {
    pub country: String,
}

/// Display the upgrade page, or the "already a GOM" notice.
#[instrument(skip_all)]
pub async fn page(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<BecomeGomQuery>,
) -> Result<impl IntoResponse> {
    let profile = ProfileRepository::new(state.pool())
        .get_by_id(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("profile".to_owned()))?;

    Ok(BecomeGomTemplate {
        already_gom: profile.is_gom,
        email: profile.email.to_string(),
        countries: country_options(profile.country),
        error: query
            .error
            .filter(|code| code == "country")
            .map(|_| "Please choose a supported country."),
    })
}

/// Set the GOM flag and the GOM's country.
#[instrument(skip_all, fields(profile_id = %user.id))]
pub async fn submit(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<BecomeGomForm>,
) -> Result<Response> {
    let Ok(country) = Country::parse(&form.country) else {
        return Ok(Redirect::to("/become-gom?error=country").into_response());
    };

    ProfileRepository::new(state.pool())
        .become_gom(user.id, country)
        .await?;

    tracing::info!(country = %country, "Profile upgraded to GOM");
    add_breadcrumb("gom", "Became GOM", Some(&[("country", country.code())]));
    Ok(Redirect::to("/dashboard").into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_country_options_mark_selection() {
        let options = country_options(Some(Country::Sg));
        assert_eq!(options.len(), Country::ALL.len());
        let selected: Vec<_> = options.iter().filter(|o| o.selected).collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected.first().map(|o| o.code), Some("SG"));
        assert!(
            options
                .iter()
                .any(|o| o.code == "US" && o.methods == "Venmo, Zelle, PayPal")
        );
    }
}

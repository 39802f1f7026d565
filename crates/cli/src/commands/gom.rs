//! GOM access management.

use gomflow_core::{Country, Email};
use gomflow_web::db::{ProfileRepository, RepositoryError};

use super::CommandError;

/// Grant (`is_gom = true`) or revoke GOM access for the profile with `email`.
///
/// The profile must already exist, i.e. the person has signed in once.
///
/// # Errors
///
/// Returns an error for an invalid email, an unknown profile or a database
/// failure.
pub async fn set_gom(email: &str, is_gom: bool) -> Result<(), CommandError> {
    let email = Email::parse(email)?;
    let pool = super::connect().await?;

    let profile = match ProfileRepository::new(&pool)
        .set_gom_by_email(&email, is_gom)
        .await
    {
        Ok(profile) => profile,
        Err(RepositoryError::NotFound) => {
            return Err(CommandError::ProfileNotFound(email.into_inner()));
        }
        Err(e) => return Err(e.into()),
    };

    if is_gom {
        tracing::info!(profile_id = %profile.id, "{} is now a GOM", profile.email);
        if let Some(note) = missing_country_note(profile.country) {
            tracing::warn!("{note}");
        }
    } else {
        tracing::info!(profile_id = %profile.id, "{} is no longer a GOM", profile.email);
    }
    Ok(())
}

/// Warning for a promoted profile without a home country.
///
/// A promoted GOM skips the upgrade form, so the country is only chosen per
/// order on the create form.
fn missing_country_note(country: Option<Country>) -> Option<&'static str> {
    country.is_none().then_some(
        "Profile has no home country; each order picks its country on the create-order form",
    )
}

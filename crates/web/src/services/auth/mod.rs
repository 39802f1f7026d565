//! Authentication service.
//!
//! Identity lives with the hosted auth provider. This service signs users in
//! through it and provisions a local profile on the first successful login.

mod client;
mod error;

pub use client::{
    AuthSession, AuthUser, HostedAuthClient, PkceVerifier, SUPPORTED_PROVIDERS, SignUpOutcome,
};
pub use error::AuthError;

use sqlx::PgPool;
use tracing::instrument;

use gomflow_core::{Email, ProfileId};

use crate::db::ProfileRepository;
use crate::models::{NewProfile, Profile};

/// Minimum password length accepted before calling the provider.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Authentication service.
pub struct AuthService<'a> {
    profiles: ProfileRepository<'a>,
    client: &'a HostedAuthClient,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, client: &'a HostedAuthClient) -> Self {
        Self {
            profiles: ProfileRepository::new(pool),
            client,
        }
    }

    /// Finish an OAuth login and make sure the user has a profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the code exchange fails or the profile cannot be
    /// stored.
    #[instrument(skip_all)]
    pub async fn complete_oauth(
        &self,
        auth_code: &str,
        verifier: &PkceVerifier,
    ) -> Result<Profile, AuthError> {
        let session = self.client.exchange_code(auth_code, verifier).await?;
        self.provision(&session.user).await
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` for malformed input and
    /// `AuthError::InvalidCredentials` when the provider rejects the login.
    #[instrument(skip_all)]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Profile, AuthError> {
        let email = Email::parse(email)?;
        if password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }
        let session = self
            .client
            .sign_in_with_password(email.as_str(), password)
            .await?;
        self.provision(&session.user).await
    }

    /// Register with email and password.
    ///
    /// Returns the profile when the account is usable immediately, or `None`
    /// when the provider asks the user to confirm their email first.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail`, `AuthError::WeakPassword` or
    /// `AuthError::UserAlreadyExists`.
    #[instrument(skip_all)]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: &str,
    ) -> Result<Option<Profile>, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;

        match self.client.sign_up(email.as_str(), password, redirect_to).await? {
            SignUpOutcome::SignedIn(session) => Ok(Some(self.provision(&session.user).await?)),
            SignUpOutcome::ConfirmationRequired => Ok(None),
        }
    }

    /// Insert a profile for this identity if it does not exist yet.
    async fn provision(&self, user: &AuthUser) -> Result<Profile, AuthError> {
        let new = new_profile(user)?;
        let (profile, created) = self.profiles.provision(&new).await?;
        if created {
            tracing::info!(profile_id = %profile.id, "Provisioned new profile");
        }
        Ok(profile)
    }
}

/// Profile data for a first login.
///
/// Discord id and username are copied only for Discord identities.
fn new_profile(user: &AuthUser) -> Result<NewProfile, AuthError> {
    let email = Email::parse(user.email.as_deref().ok_or(AuthError::MissingEmail)?)?;
    let (discord_id, discord_username) = user.discord_identity();
    Ok(NewProfile {
        id: ProfileId::new(user.id),
        email,
        discord_id,
        discord_username,
    })
}

/// Validate password meets minimum requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user(provider: &str, email: Option<&str>) -> AuthUser {
        serde_json::from_value(serde_json::json!({
            "id": "0b7e8f4c-2f61-4c1e-9a9e-5d8a1c3b7f22",
            "email": email,
            "app_metadata": { "provider": provider },
            "user_metadata": { "provider_id": "80351110224678912", "full_name": "gom_ph" }
        }))
        .unwrap()
    }

    #[test]
    fn test_new_profile_from_discord() {
        let profile = new_profile(&user("discord", Some("GOM@Example.com"))).unwrap();
        assert_eq!(profile.email.as_str(), "gom@example.com");
        assert_eq!(profile.discord_id.as_deref(), Some("80351110224678912"));
        assert_eq!(profile.discord_username.as_deref(), Some("gom_ph"));
    }

    #[test]
    fn test_new_profile_from_email_login() {
        let profile = new_profile(&user("email", Some("buyer@example.com"))).unwrap();
        assert_eq!(profile.discord_id, None);
        assert_eq!(profile.discord_username, None);
    }

    #[test]
    fn test_new_profile_requires_email() {
        assert!(matches!(
            new_profile(&user("discord", None)),
            Err(AuthError::MissingEmail)
        ));
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
    }
}

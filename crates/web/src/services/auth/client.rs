//! Hosted auth (GoTrue-compatible) REST client.
//!
//! # OAuth Flow (PKCE)
//!
//! 1. Generate a verifier with [`PkceVerifier::generate`] and keep it in the session
//! 2. Redirect to [`HostedAuthClient::authorize_url`]
//! 3. The provider redirects back to `/auth/callback?code=...`
//! 4. Exchange the code and verifier with [`HostedAuthClient::exchange_code`]
//!
//! Email/password sign-in and sign-up go straight to the token and signup
//! endpoints.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::AuthError;
use crate::config::BackendConfig;

/// OAuth providers offered on the login page.
pub const SUPPORTED_PROVIDERS: &[&str] = &["discord"];

/// RFC 7636 unreserved characters.
const VERIFIER_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

const VERIFIER_LENGTH: usize = 64;

/// PKCE code verifier for one OAuth login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PkceVerifier(String);

impl PkceVerifier {
    /// Generate a random verifier.
    #[must_use]
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let verifier = (0..VERIFIER_LENGTH)
            .map(|_| {
                let idx = rng.random_range(0..VERIFIER_CHARSET.len());
                VERIFIER_CHARSET.get(idx).map_or('A', |&b| char::from(b))
            })
            .collect();
        Self(verifier)
    }

    /// S256 challenge: base64url (no padding) of the SHA-256 of the verifier.
    #[must_use]
    pub fn challenge(&self) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(self.0.as_bytes()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identity returned by the auth provider.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
    #[serde(default)]
    pub app_metadata: AppMetadata,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppMetadata {
    pub provider: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserMetadata {
    /// Provider-side user id (Discord snowflake for Discord logins).
    pub provider_id: Option<String>,
    pub full_name: Option<String>,
    pub name: Option<String>,
}

impl AuthUser {
    /// Discord id and display name, when this identity came from Discord.
    #[must_use]
    pub fn discord_identity(&self) -> (Option<String>, Option<String>) {
        if self.app_metadata.provider.as_deref() != Some("discord") {
            return (None, None);
        }
        let username = self
            .user_metadata
            .full_name
            .clone()
            .or_else(|| self.user_metadata.name.clone());
        (self.user_metadata.provider_id.clone(), username)
    }
}

/// Token response from `/auth/v1/token`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub user: AuthUser,
}

/// Result of a sign-up request.
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    /// Account is active and signed in.
    SignedIn(AuthSession),
    /// Account created; the user must confirm their email first.
    ConfirmationRequired,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    error_description: Option<String>,
    error_code: Option<String>,
    msg: Option<String>,
    message: Option<String>,
}

/// Map an error response from the auth API to an [`AuthError`].
fn classify_error(status: u16, body: &str) -> AuthError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let code = parsed
        .error_code
        .or(parsed.error)
        .unwrap_or_default();
    let message = parsed
        .msg
        .or(parsed.error_description)
        .or(parsed.message)
        .unwrap_or_else(|| body.to_owned());

    match code.as_str() {
        "invalid_credentials" | "invalid_grant" => AuthError::InvalidCredentials,
        "email_not_confirmed" => AuthError::EmailNotConfirmed,
        "user_already_exists" | "email_exists" => AuthError::UserAlreadyExists,
        "weak_password" => AuthError::WeakPassword(message),
        _ if message.eq_ignore_ascii_case("User already registered") => {
            AuthError::UserAlreadyExists
        }
        _ => AuthError::Provider { status, message },
    }
}

/// Client for the hosted auth REST API.
#[derive(Clone)]
pub struct HostedAuthClient {
    client: reqwest::Client,
    base_url: String,
}

impl HostedAuthClient {
    /// Create a client sending the public `apikey` header.
    ///
    /// # Errors
    ///
    /// Returns error if the key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &BackendConfig) -> Result<Self, AuthError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(config.anon_key.expose_secret())
                .map_err(|e| AuthError::Config(format!("invalid anon key: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            client,
            base_url: config.endpoint("auth/v1"),
        })
    }

    /// URL that starts an OAuth login with `provider`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UnsupportedProvider` for providers not offered here.
    pub fn authorize_url(
        &self,
        provider: &str,
        redirect_to: &str,
        verifier: &PkceVerifier,
    ) -> Result<String, AuthError> {
        if !SUPPORTED_PROVIDERS.contains(&provider) {
            return Err(AuthError::UnsupportedProvider(provider.to_owned()));
        }
        Ok(format!(
            "{}/authorize?provider={}&redirect_to={}&code_challenge={}&code_challenge_method=s256",
            self.base_url,
            urlencoding::encode(provider),
            urlencoding::encode(redirect_to),
            urlencoding::encode(&verifier.challenge()),
        ))
    }

    /// Exchange an OAuth authorization code for a session.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the code is rejected.
    pub async fn exchange_code(
        &self,
        auth_code: &str,
        verifier: &PkceVerifier,
    ) -> Result<AuthSession, AuthError> {
        self.token(
            "pkce",
            &serde_json::json!({
                "auth_code": auth_code,
                "code_verifier": verifier.as_str(),
            }),
        )
        .await
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` on a wrong email or password.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        self.token(
            "password",
            &serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }

    /// Register a new email/password account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserAlreadyExists` or `AuthError::WeakPassword`
    /// when the provider rejects the request.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: &str,
    ) -> Result<SignUpOutcome, AuthError> {
        let url = format!(
            "{}/signup?redirect_to={}",
            self.base_url,
            urlencoding::encode(redirect_to)
        );
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(classify_error(status.as_u16(), &text));
        }
        parse_sign_up(&text)
    }

    async fn token(
        &self,
        grant_type: &str,
        body: &serde_json::Value,
    ) -> Result<AuthSession, AuthError> {
        let url = format!("{}/token?grant_type={grant_type}", self.base_url);
        let response = self.client.post(&url).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_error(status.as_u16(), &text));
        }
        Ok(response.json().await?)
    }
}

/// Sign-up returns a session when confirmation is off and a bare user otherwise.
fn parse_sign_up(body: &str) -> Result<SignUpOutcome, AuthError> {
    let value: serde_json::Value = serde_json::from_str(body).map_err(|e| AuthError::Provider {
        status: 200,
        message: format!("unreadable sign-up response: {e}"),
    })?;
    if value.get("access_token").is_some() {
        let session = serde_json::from_value(value).map_err(|e| AuthError::Provider {
            status: 200,
            message: format!("unreadable sign-up session: {e}"),
        })?;
        return Ok(SignUpOutcome::SignedIn(session));
    }
    Ok(SignUpOutcome::ConfirmationRequired)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;
    use url::Url;

    use super::*;

    fn client() -> HostedAuthClient {
        HostedAuthClient::new(&BackendConfig {
            url: Url::parse("https://project.backend.test").unwrap(),
            anon_key: SecretString::from("anon-key"),
            service_key: SecretString::from("service-key"),
        })
        .unwrap()
    }

    #[test]
    fn test_pkce_challenge_matches_rfc_example() {
        // RFC 7636 appendix B.
        let verifier = PkceVerifier("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk".to_owned());
        assert_eq!(
            verifier.challenge(),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_generated_verifier_is_valid() {
        let verifier = PkceVerifier::generate();
        assert_eq!(verifier.as_str().len(), VERIFIER_LENGTH);
        assert!(verifier.as_str().bytes().all(|b| VERIFIER_CHARSET.contains(&b)));
        assert_ne!(verifier, PkceVerifier::generate());
    }

    #[test]
    fn test_authorize_url() {
        let verifier = PkceVerifier("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk".to_owned());
        let url = client()
            .authorize_url("discord", "https://gomflow.app/auth/callback", &verifier)
            .unwrap();
        assert_eq!(
            url,
            "https://project.backend.test/auth/v1/authorize?provider=discord\
             &redirect_to=https%3A%2F%2Fgomflow.app%2Fauth%2Fcallback\
             &code_challenge=E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM\
             &code_challenge_method=s256"
        );
        assert!(matches!(
            client().authorize_url("myspace", "https://gomflow.app", &verifier),
            Err(AuthError::UnsupportedProvider(_))
        ));
    }

    #[test]
    fn test_classify_error() {
        assert!(matches!(
            classify_error(400, r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#),
            AuthError::InvalidCredentials
        ));
        assert!(matches!(
            classify_error(422, r#"{"code":422,"error_code":"user_already_exists","msg":"User already registered"}"#),
            AuthError::UserAlreadyExists
        ));
        assert!(matches!(
            classify_error(422, r#"{"code":422,"msg":"User already registered"}"#),
            AuthError::UserAlreadyExists
        ));
        assert!(matches!(
            classify_error(400, r#"{"error_code":"email_not_confirmed","msg":"Email not confirmed"}"#),
            AuthError::EmailNotConfirmed
        ));
        match classify_error(422, r#"{"error_code":"weak_password","msg":"Password should be at least 6 characters"}"#) {
            AuthError::WeakPassword(msg) => assert!(msg.contains("6 characters")),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            classify_error(502, "bad gateway"),
            AuthError::Provider { status: 502, .. }
        ));
    }

    #[test]
    fn test_discord_identity() {
        let user: AuthUser = serde_json::from_value(serde_json::json!({
            "id": "0b7e8f4c-2f61-4c1e-9a9e-5d8a1c3b7f22",
            "email": "fan@example.com",
            "app_metadata": { "provider": "discord" },
            "user_metadata": { "provider_id": "80351110224678912", "full_name": "seungkwan_fan" }
        }))
        .unwrap();
        assert_eq!(
            user.discord_identity(),
            (
                Some("80351110224678912".to_owned()),
                Some("seungkwan_fan".to_owned())
            )
        );

        let email_user: AuthUser = serde_json::from_value(serde_json::json!({
            "id": "0b7e8f4c-2f61-4c1e-9a9e-5d8a1c3b7f22",
            "email": "fan@example.com",
            "app_metadata": { "provider": "email" },
            "user_metadata": { "provider_id": "x" }
        }))
        .unwrap();
        assert_eq!(email_user.discord_identity(), (None, None));
    }

    #[test]
    fn test_parse_sign_up() {
        let pending = parse_sign_up(r#"{"id":"0b7e8f4c-2f61-4c1e-9a9e-5d8a1c3b7f22","email":"a@b.c"}"#).unwrap();
        assert!(matches!(pending, SignUpOutcome::ConfirmationRequired));

        let active = parse_sign_up(
            r#"{"access_token":"jwt","user":{"id":"0b7e8f4c-2f61-4c1e-9a9e-5d8a1c3b7f22","email":"a@b.c"}}"#,
        )
        .unwrap();
        assert!(matches!(active, SignUpOutcome::SignedIn(_)));
    }
}

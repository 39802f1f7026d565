//! Authentication route handlers.
//!
//! Email/password and OAuth sign-in both go through the hosted auth
//! provider. The OAuth flow uses PKCE: the verifier is kept in the session
//! between the redirect to the provider and the callback.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{clear_current_user, set_current_user};
use crate::models::session::keys;
use crate::models::{CurrentUser, Profile};
use crate::services::auth::{AuthError, AuthService, PkceVerifier, SUPPORTED_PROVIDERS};
use crate::state::AppState;

/// Where users land after signing in.
const AFTER_LOGIN_PATH: &str = "/dashboard";

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Sign-up form data.
#[derive(Debug, Deserialize)]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters for error/success display.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Query parameters on the OAuth callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login and sign-up page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub error: Option<&'static str>,
    pub success: Option<&'static str>,
    pub providers: &'static [&'static str],
}

/// OAuth failure page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/error.html")]
pub struct AuthCodeErrorTemplate {}

/// Map an error code from the query string to a message.
///
/// Only known codes are shown, so the page cannot be used to display
/// arbitrary text.
fn error_message(code: &str) -> Option<&'static str> {
    Some(match code {
        "credentials" => "Invalid email or password.",
        "unconfirmed" => "Please confirm your email address before signing in.",
        "exists" => "An account with this email already exists.",
        "weak_password" => "Password must be at least 8 characters.",
        "mismatch" => "Passwords do not match.",
        "email" => "Please enter a valid email address.",
        "session" => "Your session expired, please try again.",
        "provider" => "Sign-in is unavailable right now, please try again.",
        _ => return None,
    })
}

fn success_message(code: &str) -> Option<&'static str> {
    Some(match code {
        "confirm" => "Check your inbox to confirm your email, then sign in.",
        "confirmed" => "Email confirmed. You can sign in now.",
        "logged_out" => "You have been signed out.",
        _ => return None,
    })
}

/// Query-string error code for a failed sign-in or sign-up.
const fn error_code(err: &AuthError) -> &'static str {
    match err {
        AuthError::InvalidCredentials => "credentials",
        AuthError::EmailNotConfirmed => "unconfirmed",
        AuthError::UserAlreadyExists => "exists",
        AuthError::WeakPassword(_) => "weak_password",
        AuthError::InvalidEmail(_) | AuthError::MissingEmail => "email",
        AuthError::InvalidSessionState => "session",
        _ => "provider",
    }
}

fn login_error_redirect(err: &AuthError) -> Response {
    Redirect::to(&format!("/auth/login?error={}", error_code(err))).into_response()
}

/// Store the signed-in profile in the session and go to the dashboard.
async fn start_session(session: &Session, profile: &Profile) -> Response {
    let user = CurrentUser::from(profile);
    if let Err(e) = set_current_user(session, &user).await {
        tracing::error!("Failed to set session: {}", e);
        return Redirect::to("/auth/login?error=session").into_response();
    }
    set_sentry_user(&user.id, Some(user.email.as_str()));
    add_breadcrumb("auth", "Signed in", None);
    Redirect::to(AFTER_LOGIN_PATH).into_response()
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login and sign-up page.
pub async fn login_page(Query(query): Query<MessageQuery>) -> impl IntoResponse {
    LoginTemplate {
        error: query.error.as_deref().and_then(error_message),
        success: query.success.as_deref().and_then(success_message),
        providers: SUPPORTED_PROVIDERS,
    }
}

/// Handle email/password sign-in.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let service = AuthService::new(state.pool(), state.auth());
    match service.sign_in_with_password(&form.email, &form.password).await {
        Ok(profile) => start_session(&session, &profile).await,
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            login_error_redirect(&e)
        }
    }
}

/// Handle email/password sign-up.
///
/// When the provider requires email confirmation the user is sent back to
/// the login page with a notice instead of being signed in.
#[instrument(skip_all)]
pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SignUpForm>,
) -> Response {
    if form.password != form.password_confirm {
        return Redirect::to("/auth/login?error=mismatch").into_response();
    }

    let confirm_redirect = state.config().absolute_url("/auth/login?success=confirmed");
    let service = AuthService::new(state.pool(), state.auth());
    match service
        .sign_up(&form.email, &form.password, &confirm_redirect)
        .await
    {
        Ok(Some(profile)) => start_session(&session, &profile).await,
        Ok(None) => Redirect::to("/auth/login?success=confirm").into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Sign-up failed");
            login_error_redirect(&e)
        }
    }
}

// =============================================================================
// OAuth Routes
// =============================================================================

/// Start an OAuth sign-in by redirecting to the provider.
///
/// # Errors
///
/// Returns `404` for a provider not offered here.
#[instrument(skip(state, session))]
pub async fn oauth_start(
    State(state): State<AppState>,
    session: Session,
    Path(provider): Path<String>,
) -> Result<Response, AppError> {
    let verifier = PkceVerifier::generate();
    let callback = state.config().absolute_url("/auth/callback");
    let url = state.auth().authorize_url(&provider, &callback, &verifier)?;

    session
        .insert(keys::PKCE_VERIFIER, &verifier)
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;

    Ok(Redirect::to(&url).into_response())
}

/// Handle the OAuth callback: exchange the code and provision the profile.
#[instrument(skip_all)]
pub async fn callback(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<CallbackQuery>,
) -> Response {
    if let Some(error) = &query.error {
        tracing::warn!(
            error = %error,
            description = query.error_description.as_deref().unwrap_or_default(),
            "OAuth provider returned an error"
        );
        return Redirect::to("/auth/auth-code-error").into_response();
    }

    let Some(code) = query.code.as_deref() else {
        return Redirect::to("/auth/auth-code-error").into_response();
    };

    let verifier = match session.remove::<PkceVerifier>(keys::PKCE_VERIFIER).await {
        Ok(Some(verifier)) => verifier,
        Ok(None) => {
            tracing::warn!("OAuth callback without a PKCE verifier in the session");
            return Redirect::to("/auth/auth-code-error").into_response();
        }
        Err(e) => {
            tracing::error!("Failed to read session: {}", e);
            return Redirect::to("/auth/auth-code-error").into_response();
        }
    };

    let service = AuthService::new(state.pool(), state.auth());
    match service.complete_oauth(code, &verifier).await {
        Ok(profile) => start_session(&session, &profile).await,
        Err(e) => {
            tracing::warn!(error = %e, "OAuth code exchange failed");
            Redirect::to("/auth/auth-code-error").into_response()
        }
    }
}

/// Display the OAuth failure page.
pub async fn auth_code_error() -> impl IntoResponse {
    AuthCodeErrorTemplate {}
}

// =============================================================================
// Logout
// =============================================================================

/// Clear the session and return to the login page.
pub async fn logout(session: Session) -> Response {
    if let Err(e) = clear_current_user(&session).await {
        tracing::error!("Failed to clear session: {}", e);
    }
    clear_sentry_user();
    Redirect::to("/auth/login?success=logged_out").into_response()
}

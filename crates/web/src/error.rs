//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::ServiceError;
use crate::services::auth::AuthError;
use crate::services::codes::UniqueCodeError;
use crate::services::storage::StorageError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Object storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but may not act on this resource.
    #[error("Forbidden")]
    Forbidden,

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request conflicts with the current state of a resource.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(what) => Self::NotFound(what.to_owned()),
            ServiceError::Forbidden => Self::Forbidden,
            ServiceError::OrderClosed(_) => Self::Conflict(err.to_string()),
            ServiceError::InvalidOrder(e) => Self::BadRequest(e.to_string()),
            ServiceError::InvalidSubmission(e) => Self::BadRequest(e.to_string()),
            ServiceError::Storage(StorageError::InvalidUpload(msg)) => Self::BadRequest(msg),
            ServiceError::Storage(e) => Self::Storage(e),
            ServiceError::Code(e) => e.into(),
            ServiceError::Repository(e) => repository_error(e),
        }
    }
}

impl From<UniqueCodeError> for AppError {
    fn from(err: UniqueCodeError) -> Self {
        match err {
            UniqueCodeError::CodeSpaceExhausted { .. } => Self::Internal(err.to_string()),
            UniqueCodeError::Repository(e) => repository_error(e),
        }
    }
}

/// Surface not-found and conflict outcomes as client errors.
fn repository_error(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::NotFound => AppError::NotFound("resource".to_owned()),
        RepositoryError::Conflict(msg) => AppError::Conflict(msg),
        other => AppError::Database(other),
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Storage(_) => StatusCode::BAD_GATEWAY,
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials
                | AuthError::EmailNotConfirmed
                | AuthError::InvalidSessionState => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::WeakPassword(_)
                | AuthError::InvalidEmail(_)
                | AuthError::MissingEmail => StatusCode::BAD_REQUEST,
                AuthError::UnsupportedProvider(_) => StatusCode::NOT_FOUND,
                AuthError::Http(_) | AuthError::Provider { .. } => StatusCode::BAD_GATEWAY,
                AuthError::Config(_) | AuthError::Repository(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Message safe to show to the client.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Storage(_) => "File storage is unavailable, please try again".to_string(),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "Invalid email or password".to_string(),
                AuthError::EmailNotConfirmed => {
                    "Please confirm your email address before signing in".to_string()
                }
                AuthError::UserAlreadyExists => {
                    "An account with this email already exists".to_string()
                }
                AuthError::WeakPassword(msg) => msg.clone(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                AuthError::MissingEmail => "Your account has no email address".to_string(),
                AuthError::UnsupportedProvider(_) => "Unknown sign-in provider".to_string(),
                AuthError::InvalidSessionState => "Session expired, please try again".to_string(),
                _ => "Authentication error".to_string(),
            },
            Self::NotFound(what) => format!("{what} not found"),
            Self::Unauthorized(msg) | Self::BadRequest(msg) | Self::Conflict(msg) => msg.clone(),
            Self::Forbidden => "You do not have access to this page".to_string(),
            Self::RateLimited => "Too many requests, please slow down".to_string(),
        }
    }
}

impl AppError {
    /// Capture server errors to Sentry and log them.
    fn report(&self) -> StatusCode {
        let status = self.status();
        if status.is_server_error() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }
        status
    }

    /// Render as `{"error": "..."}` for the JSON API.
    #[must_use]
    pub fn into_json_response(self) -> Response {
        let status = self.report();
        (
            status,
            axum::Json(serde_json::json!({ "error": self.public_message() })),
        )
            .into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.report();
        (status, self.public_message()).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrderInputError, SubmissionInputError};

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("order".to_string());
        assert_eq!(err.to_string(), "Not found: order");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(get_status(AppError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(
            get_status(AppError::Conflict("test".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::RateLimited),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_service_errors_map_to_client_errors() {
        let err: AppError = ServiceError::NotFound("submission").into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.public_message(), "submission not found");

        let err: AppError = ServiceError::OrderClosed("cancelled".to_owned()).into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.public_message(), "order is cancelled");

        let err: AppError = ServiceError::from(OrderInputError::DeadlineInPast).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err: AppError = ServiceError::from(SubmissionInputError::InvalidQuantity).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err: AppError =
            ServiceError::Storage(StorageError::InvalidUpload("file is empty".to_owned())).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_exhausted_codes_are_internal() {
        let err: AppError = UniqueCodeError::CodeSpaceExhausted { attempts: 5 }.into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = AppError::Database(RepositoryError::DataCorruption("bad row".to_owned()));
        assert_eq!(err.public_message(), "Internal server error");
    }
}

//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`; the response body is always `{"error": "<message>"}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::access::AccessDenied;
use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::cart::CartError;
use crate::services::checkout::CheckoutError;
use crate::services::email::EmailError;
use crate::services::images::ImageHostError;
use crate::services::payments::PaymentError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Add-to-cart failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Checkout failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Email delivery failed.
    #[error("Email error: {0}")]
    Email(#[from] EmailError),

    /// Image host error.
    #[error("Image host error: {0}")]
    ImageHost(#[from] ImageHostError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// The access rules refused the operation.
    #[error("{0}")]
    Forbidden(#[from] AccessDenied),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("{0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Too many requests, slow down and try again")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

const INTERNAL: &str = "Internal server error";
const UPSTREAM: &str = "External service error";

fn repository_response(err: &RepositoryError) -> (StatusCode, String) {
    match err {
        RepositoryError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
        RepositoryError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string())
        }
    }
}

fn payment_response(err: &PaymentError) -> (StatusCode, String) {
    match err {
        PaymentError::Declined { message, .. } => (StatusCode::PAYMENT_REQUIRED, message.clone()),
        PaymentError::Incomplete { .. } => (StatusCode::PAYMENT_REQUIRED, err.to_string()),
        PaymentError::Http(_) | PaymentError::Config(_) => {
            (StatusCode::BAD_GATEWAY, "Payment provider unavailable".to_string())
        }
    }
}

fn auth_response(err: &AuthError) -> (StatusCode, String) {
    match err {
        AuthError::InvalidCredentials => {
            (StatusCode::UNAUTHORIZED, "Invalid email or password".to_string())
        }
        AuthError::UserNotFound => (StatusCode::NOT_FOUND, "User not found".to_string()),
        AuthError::UserAlreadyExists => (
            StatusCode::CONFLICT,
            "An account with this name or email already exists".to_string(),
        ),
        AuthError::AlreadyInitialized => (
            StatusCode::CONFLICT,
            "The first user has already been created".to_string(),
        ),
        AuthError::InvalidEmail(_) => (StatusCode::BAD_REQUEST, "Invalid email address".to_string()),
        AuthError::MissingName | AuthError::InvalidResetToken => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        AuthError::WeakPassword(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        AuthError::Repository(inner) => repository_response(inner),
        AuthError::PasswordHash => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string()),
    }
}

impl AppError {
    /// Status code and client-facing message.
    ///
    /// Internal details are never included for server errors.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Database(err) => repository_response(err),
            Self::Auth(err) => auth_response(err),
            Self::Cart(err) => match err {
                CartError::NotSignedIn => (StatusCode::UNAUTHORIZED, err.to_string()),
                CartError::ProductNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
                CartError::Repository(inner) => repository_response(inner),
            },
            Self::Checkout(err) => match err {
                CheckoutError::NotSignedIn => (StatusCode::UNAUTHORIZED, err.to_string()),
                CheckoutError::EmptyCart => (StatusCode::BAD_REQUEST, err.to_string()),
                CheckoutError::Payment(inner) => payment_response(inner),
                CheckoutError::Repository(inner) => repository_response(inner),
            },
            Self::Email(_) | Self::ImageHost(_) => (StatusCode::BAD_GATEWAY, UPSTREAM.to_string()),
            Self::Session(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string())
            }
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            Self::RateLimited => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else if status == StatusCode::PAYMENT_REQUIRED {
            tracing::warn!(error = %self, "Payment declined");
        }

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
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
/// Call this on sign-out to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    fn status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    async fn body(err: AppError) -> serde_json::Value {
        let bytes = to_bytes(err.into_response().into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(status(AppError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(AppError::Unauthorized("x".into())), StatusCode::UNAUTHORIZED);
        assert_eq!(status(AppError::BadRequest("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(AppError::Forbidden(AccessDenied)), StatusCode::FORBIDDEN);
        assert_eq!(status(AppError::RateLimited), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            status(AppError::Internal("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_repository_errors() {
        assert_eq!(
            status(RepositoryError::NotFound.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(RepositoryError::Conflict("dup".into()).into()),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_checkout_errors() {
        assert_eq!(
            status(CheckoutError::NotSignedIn.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(status(CheckoutError::EmptyCart.into()), StatusCode::BAD_REQUEST);
        let declined = PaymentError::Declined {
            status: 402,
            message: "Your card was declined.".into(),
        };
        assert_eq!(
            status(CheckoutError::Payment(declined).into()),
            StatusCode::PAYMENT_REQUIRED
        );
    }

    #[tokio::test]
    async fn test_signed_out_messages_are_kept() {
        let json = body(CartError::NotSignedIn.into()).await;
        assert_eq!(json["error"], "You must be logged in to do this!");

        let json = body(CheckoutError::NotSignedIn.into()).await;
        assert_eq!(json["error"], "Sorry! You must be signed in to create an order!");
    }

    #[tokio::test]
    async fn test_payment_message_reaches_client() {
        let err = PaymentError::Declined {
            status: 402,
            message: "Your card has insufficient funds.".into(),
        };
        let json = body(CheckoutError::Payment(err).into()).await;
        assert_eq!(json["error"], "Your card has insufficient funds.");
    }

    #[test]
    fn test_unpaid_intent_is_payment_required() {
        let err = PaymentError::Incomplete {
            id: "pi_3DEF".into(),
            status: "requires_action".into(),
        };
        assert_eq!(
            status(CheckoutError::Payment(err).into()),
            StatusCode::PAYMENT_REQUIRED
        );
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let json = body(AppError::Internal("connection string leaked".into())).await;
        assert_eq!(json["error"], "Internal server error");

        let err = RepositoryError::DataCorruption("bad row 42".into());
        let json = body(err.into()).await;
        assert_eq!(json["error"], "Internal server error");
    }
}

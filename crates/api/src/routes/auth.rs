//! Authentication route handlers.
//!
//! Sign-up, password sign-in and sign-out, first-user initialization and
//! the password reset flow. Only the user's id, name and email live in the
//! session cookie's server-side record; permissions are reloaded per request.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalSession, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::auth::{AuthService, NewAccount};
use crate::services::email::reset_url;
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

/// Sign-up and first-user request body.
#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Sign-in request body.
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Password reset request body.
#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub email: String,
}

/// Password reset redemption body.
#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    pub email: String,
    pub token: String,
    pub password: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Create an account. New accounts never get a role here.
pub async fn sign_up(
    State(state): State<AppState>,
    Json(body): Json<SignUpRequest>,
) -> Result<impl IntoResponse> {
    let user = AuthService::new(state.pool())
        .sign_up(NewAccount {
            name: &body.name,
            email: &body.email,
            password: &body.password,
            role_id: None,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Sign in with email and password.
pub async fn sign_in(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<SignInRequest>,
) -> Result<Json<User>> {
    let user = AuthService::new(state.pool())
        .sign_in(&body.email, &body.password)
        .await
        .inspect_err(|e| tracing::info!(error = %e, "Sign-in failed"))?;

    start_session(&session, &user).await?;
    tracing::info!(user_id = %user.id, "User signed in");

    Ok(Json(user))
}

/// End the session.
pub async fn sign_out(session: Session) -> Result<StatusCode> {
    session.flush().await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// The signed-in user and their permissions, or `null`.
pub async fn me(OptionalSession(session): OptionalSession) -> impl IntoResponse {
    Json(session)
}

/// Create the first user, with the all-permission admin role, and sign in.
///
/// Refused with 409 once any user exists.
pub async fn init(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<SignUpRequest>,
) -> Result<impl IntoResponse> {
    let user = AuthService::new(state.pool())
        .init_first_user(&body.name, &body.email, &body.password)
        .await?;

    start_session(&session, &user).await?;
    tracing::info!(user_id = %user.id, "First user initialized");

    Ok((StatusCode::CREATED, Json(user)))
}

/// Email a password reset link.
///
/// Responds the same whether or not the email belongs to an account.
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(body): Json<ResetRequest>,
) -> Result<StatusCode> {
    let lifetime = state.config().password_reset_token_minutes;
    let issued = AuthService::new(state.pool())
        .request_password_reset(&body.email, lifetime)
        .await?;

    if let Some(reset) = issued {
        let url = reset_url(&state.config().frontend_url, &reset.token);
        state
            .email()
            .send_password_reset(reset.user.email.as_str(), &url, lifetime)
            .await?;
    }

    Ok(StatusCode::ACCEPTED)
}

/// Redeem a reset token and set a new password.
pub async fn redeem_password_reset(
    State(state): State<AppState>,
    Json(body): Json<RedeemRequest>,
) -> Result<StatusCode> {
    AuthService::new(state.pool())
        .redeem_password_reset(&body.email, &body.token, &body.password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn start_session(session: &Session, user: &User) -> Result<()> {
    let current = CurrentUser {
        id: user.id,
        name: user.name.clone(),
        email: user.email.clone(),
    };
    set_current_user(session, &current).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

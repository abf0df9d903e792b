//! Session extractors.
//!
//! The cookie session only stores who the user is ([`CurrentUser`]). On
//! every request the extractors reload the user and their role so that role
//! edits and deletions apply immediately, and hand handlers an
//! [`AccessSession`] for access checks.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::access::AccessSession;
use crate::db::UserRepository;
use crate::error::AppError;
use crate::models::{CurrentUser, session::keys};
use crate::state::AppState;

/// Extractor for the signed-in user, or `None` when signed out.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(OptionalSession(session): OptionalSession) -> impl IntoResponse {
///     match session {
///         Some(s) => format!("Hello, {}!", s.name),
///         None => "Hello, guest!".to_string(),
///     }
/// }
/// ```
pub struct OptionalSession(pub Option<AccessSession>);

impl FromRequestParts<AppState> for OptionalSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // No session layer (or no cookie) means signed out
        let Some(session) = parts.extensions.get::<Session>() else {
            return Ok(Self(None));
        };
        let Some(current) = session.get::<CurrentUser>(keys::CURRENT_USER).await? else {
            return Ok(Self(None));
        };

        let loaded = UserRepository::new(state.pool())
            .get_with_permissions(current.id)
            .await?;

        let Some((user, role)) = loaded else {
            // The user was deleted while signed in
            tracing::info!(user_id = %current.id, "Dropping session of deleted user");
            clear_current_user(session).await?;
            return Ok(Self(None));
        };

        Ok(Self(Some(AccessSession {
            item_id: user.id,
            name: user.name,
            email: user.email,
            role,
        })))
    }
}

/// Helper to set the current user in the session.
///
/// Cycles the session id to prevent fixation.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(keys::CURRENT_USER, user).await
}

/// Helper to clear the current user from the session (sign out).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<CurrentUser>(keys::CURRENT_USER).await?;
    Ok(())
}

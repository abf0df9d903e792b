//! User list handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use cyber_shop_core::{Email, RoleId, UserId};

use crate::access::{AccessDenied, AccessSession, List, Operation, can_assign_role};
use crate::db::{RoleRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::middleware::OptionalSession;
use crate::models::{User, UserChanges};
use crate::routes::{authorize, nullable, refusal};
use crate::services::auth::{AuthService, NewAccount, hash_password, validate_password};
use crate::state::AppState;

/// New user request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role_id: Option<RoleId>,
}

/// User update request body. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub role_id: Option<Option<RoleId>>,
}

/// List the users the caller may see.
pub async fn index(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
) -> Result<Json<Vec<User>>> {
    let scope = authorize(List::User, Operation::Read, session.as_ref())?;
    let users = UserRepository::new(state.pool()).list(scope).await?;
    Ok(Json(users))
}

/// Create a user. Anyone may, but only user managers may set a role.
pub async fn create(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
    Json(body): Json<CreateUserRequest>,
) -> Result<impl IntoResponse> {
    authorize(List::User, Operation::Create, session.as_ref())?;
    if body.role_id.is_some() {
        check_role_assignment(&state, session.as_ref(), body.role_id).await?;
    }

    let user = AuthService::new(state.pool())
        .sign_up(NewAccount {
            name: &body.name,
            email: &body.email,
            password: &body.password,
            role_id: body.role_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Get one user.
pub async fn show(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
    Path(id): Path<UserId>,
) -> Result<Json<User>> {
    let scope = authorize(List::User, Operation::Read, session.as_ref())?;
    UserRepository::new(state.pool())
        .get(id, scope)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("user {id}")))
}

/// Update a user.
pub async fn update(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
    Path(id): Path<UserId>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<User>> {
    let scope = authorize(List::User, Operation::Update, session.as_ref())?;
    if let Some(role_id) = body.role_id {
        check_role_assignment(&state, session.as_ref(), role_id).await?;
    }

    let password_hash = match body.password.as_deref() {
        Some(password) => {
            validate_password(password)?;
            Some(hash_password(password)?)
        }
        None => None,
    };
    let changes = UserChanges {
        name: body.name.map(|n| n.trim().to_owned()).filter(|n| !n.is_empty()),
        email: body
            .email
            .as_deref()
            .map(Email::parse)
            .transpose()
            .map_err(|e| AppError::BadRequest(e.to_string()))?,
        password_hash,
        role_id: body.role_id,
    };

    let user = UserRepository::new(state.pool())
        .update(id, changes, scope)
        .await?;
    Ok(Json(user))
}

/// Delete a user. Their cart goes with them; orders and products stay.
pub async fn destroy(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
    Path(id): Path<UserId>,
) -> Result<StatusCode> {
    authorize(List::User, Operation::Delete, session.as_ref())?;
    if UserRepository::new(state.pool()).delete(id).await? {
        tracing::info!(user_id = %id, "User deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("user {id}")))
    }
}

/// Only user managers may hand out roles, and only roles that exist.
fn require_role_permission(session: Option<&AccessSession>) -> Result<()> {
    if can_assign_role(session) {
        Ok(())
    } else {
        Err(refusal(session, AccessDenied))
    }
}

async fn check_role_assignment(
    state: &AppState,
    session: Option<&AccessSession>,
    role_id: Option<RoleId>,
) -> Result<()> {
    require_role_permission(session)?;
    if let Some(id) = role_id
        && RoleRepository::new(state.pool()).get(id).await?.is_none()
    {
        return Err(AppError::BadRequest(format!("role {id} does not exist")));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cyber_shop_core::Permission;

    use super::*;

    fn session(permissions: &[Permission]) -> AccessSession {
        AccessSession {
            item_id: UserId::new(3),
            name: "Wes".to_string(),
            email: Email::parse("wes@example.com").unwrap(),
            role: Some(permissions.iter().copied().collect()),
        }
    }

    #[test]
    fn test_role_assignment_signed_out_is_unauthorized() {
        let err = require_role_permission(None).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_role_assignment_without_permission_is_forbidden() {
        let err = require_role_permission(Some(&session(&[]))).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_user_managers_may_assign_roles() {
        assert!(require_role_permission(Some(&session(&[Permission::CanManageUsers]))).is_ok());
    }
}

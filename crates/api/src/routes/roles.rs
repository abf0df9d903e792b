//! Role list handlers. Every operation needs `canManageRoles`.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use cyber_shop_core::{Permission, PermissionSet, RoleId};

use crate::access::{List, Operation};
use crate::db::RoleRepository;
use crate::error::{AppError, Result};
use crate::middleware::OptionalSession;
use crate::models::{Role, User};
use crate::routes::authorize;
use crate::state::AppState;

/// New role request body. Unlisted permissions default to off.
#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
    #[serde(flatten)]
    pub permissions: PermissionSet,
}

/// Role update request body.
///
/// `permissions` replaces the whole permission set when present.
#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub name: Option<String>,
    pub permissions: Option<PermissionSet>,
}

/// A role with the users holding it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleDetail {
    #[serde(flatten)]
    pub role: Role,
    pub assigned_to: Vec<User>,
}

/// One checkbox of the role editor.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct PermissionField {
    pub key: &'static str,
    pub label: &'static str,
}

fn permission_fields() -> Vec<PermissionField> {
    Permission::ALL
        .iter()
        .map(|p| PermissionField {
            key: p.key(),
            label: p.label(),
        })
        .collect()
}

/// The permissions a role can grant, in editor order.
pub async fn permissions(
    OptionalSession(session): OptionalSession,
) -> Result<Json<Vec<PermissionField>>> {
    authorize(List::Role, Operation::Read, session.as_ref())?;
    Ok(Json(permission_fields()))
}

/// List all roles.
pub async fn index(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
) -> Result<Json<Vec<Role>>> {
    authorize(List::Role, Operation::Read, session.as_ref())?;
    Ok(Json(RoleRepository::new(state.pool()).list().await?))
}

/// Create a role.
pub async fn create(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
    Json(body): Json<CreateRoleRequest>,
) -> Result<impl IntoResponse> {
    authorize(List::Role, Operation::Create, session.as_ref())?;
    let name = required_name(&body.name)?;

    let role = RoleRepository::new(state.pool())
        .create(name, body.permissions)
        .await?;
    tracing::info!(role_id = %role.id, name = %role.name, "Role created");

    Ok((StatusCode::CREATED, Json(role)))
}

/// Get a role and the users assigned to it.
pub async fn show(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
    Path(id): Path<RoleId>,
) -> Result<Json<RoleDetail>> {
    authorize(List::Role, Operation::Read, session.as_ref())?;
    let roles = RoleRepository::new(state.pool());

    let role = roles
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("role {id}")))?;
    let assigned_to = roles.assigned_to(id).await?;

    Ok(Json(RoleDetail { role, assigned_to }))
}

/// Rename a role or replace its permissions.
pub async fn update(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
    Path(id): Path<RoleId>,
    Json(body): Json<UpdateRoleRequest>,
) -> Result<Json<Role>> {
    authorize(List::Role, Operation::Update, session.as_ref())?;
    let name = body
        .name
        .as_deref()
        .map(required_name)
        .transpose()?
        .map(str::to_owned);

    let role = RoleRepository::new(state.pool())
        .update(id, name, body.permissions)
        .await?;
    tracing::info!(role_id = %role.id, "Role updated");

    Ok(Json(role))
}

/// Delete a role. Its users are left without a role.
pub async fn destroy(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
    Path(id): Path<RoleId>,
) -> Result<StatusCode> {
    authorize(List::Role, Operation::Delete, session.as_ref())?;
    if RoleRepository::new(state.pool()).delete(id).await? {
        tracing::info!(role_id = %id, "Role deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("role {id}")))
    }
}

fn required_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("name is required".to_string()));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_fields_follow_editor_order() {
        let fields = permission_fields();
        assert_eq!(fields.len(), Permission::ALL.len());
        assert_eq!(
            fields.first(),
            Some(&PermissionField {
                key: "canManageProducts",
                label: "User can Update and delete any product",
            })
        );
        assert_eq!(
            fields.last().map(|f| f.label),
            Some("User can see and manage orders")
        );
    }
}

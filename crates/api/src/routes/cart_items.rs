//! Cart item list handlers.
//!
//! Shoppers only see and change their own cart; `canManageCart` sees every
//! cart. Use the add-to-cart mutation to add products one unit at a time.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use cyber_shop_core::{CartItemId, Permission, ProductId, UserId};

use crate::access::{AccessDenied, List, Operation, has_permission};
use crate::db::CartItemRepository;
use crate::error::{AppError, Result};
use crate::middleware::OptionalSession;
use crate::models::CartItem;
use crate::routes::authorize;
use crate::state::AppState;

const fn default_quantity() -> i32 {
    1
}

/// New cart item request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCartItemRequest {
    pub product_id: Option<ProductId>,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    /// Whose cart; defaults to the caller's. Other carts need `canManageCart`.
    pub user_id: Option<UserId>,
}

/// Cart item update request body.
#[derive(Debug, Deserialize)]
pub struct UpdateCartItemRequest {
    pub quantity: i32,
}

/// List the cart items the caller may see.
pub async fn index(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
) -> Result<Json<Vec<CartItem>>> {
    let scope = authorize(List::CartItem, Operation::Read, session.as_ref())?;
    Ok(Json(CartItemRepository::new(state.pool()).list(scope).await?))
}

/// Create a cart item.
pub async fn create(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
    Json(body): Json<CreateCartItemRequest>,
) -> Result<impl IntoResponse> {
    authorize(List::CartItem, Operation::Create, session.as_ref())?;
    let Some(session) = session else {
        return Err(AccessDenied.into());
    };
    validate_quantity(body.quantity)?;

    let owner = body.user_id.unwrap_or(session.item_id);
    if owner != session.item_id && !has_permission(Some(&session), Permission::CanManageCart) {
        return Err(AccessDenied.into());
    }

    let item = CartItemRepository::new(state.pool())
        .create(owner, body.product_id, body.quantity)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Get one cart item.
pub async fn show(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
    Path(id): Path<CartItemId>,
) -> Result<Json<CartItem>> {
    let scope = authorize(List::CartItem, Operation::Read, session.as_ref())?;
    CartItemRepository::new(state.pool())
        .get(id, scope)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("cart item {id}")))
}

/// Change a cart item's quantity.
pub async fn update(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
    Path(id): Path<CartItemId>,
    Json(body): Json<UpdateCartItemRequest>,
) -> Result<Json<CartItem>> {
    let scope = authorize(List::CartItem, Operation::Update, session.as_ref())?;
    validate_quantity(body.quantity)?;

    let item = CartItemRepository::new(state.pool())
        .set_quantity(id, body.quantity, scope)
        .await?;
    Ok(Json(item))
}

/// Remove a cart item.
pub async fn destroy(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
    Path(id): Path<CartItemId>,
) -> Result<StatusCode> {
    let scope = authorize(List::CartItem, Operation::Delete, session.as_ref())?;
    if CartItemRepository::new(state.pool()).delete(id, scope).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("cart item {id}")))
    }
}

fn validate_quantity(quantity: i32) -> Result<()> {
    if quantity < 1 {
        return Err(AppError::BadRequest(
            "quantity must be at least 1".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_defaults_to_one() {
        let body: CreateCartItemRequest = serde_json::from_str(r#"{"productId": 7}"#).unwrap();
        assert_eq!(body.quantity, 1);
        assert_eq!(body.product_id, Some(ProductId::new(7)));
        assert_eq!(body.user_id, None);
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
    }
}

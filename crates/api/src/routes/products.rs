//! Product list handlers.
//!
//! Shoppers see `AVAILABLE` products and may edit the ones they created;
//! `canManageProducts` lifts both restrictions.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use cyber_shop_core::{Price, ProductId};

use crate::access::{List, Operation};
use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::middleware::OptionalSession;
use crate::models::{NewProduct, Product, ProductChanges};
use crate::routes::authorize;
use crate::state::AppState;

/// List the products the caller may see, newest first.
pub async fn index(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
) -> Result<Json<Vec<Product>>> {
    let scope = authorize(List::Product, Operation::Read, session.as_ref())?;
    Ok(Json(ProductRepository::new(state.pool()).list(scope).await?))
}

/// Create a product owned by the caller.
pub async fn create(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
    Json(body): Json<NewProduct>,
) -> Result<impl IntoResponse> {
    authorize(List::Product, Operation::Create, session.as_ref())?;
    if body.name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".to_string()));
    }
    validate_price(body.price)?;

    let owner = session.as_ref().map(|s| s.item_id);
    let product = ProductRepository::new(state.pool())
        .create(&body, owner)
        .await?;
    tracing::info!(product_id = %product.id, status = %product.status, "Product created");

    Ok((StatusCode::CREATED, Json(product)))
}

/// Get one product.
pub async fn show(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    let scope = authorize(List::Product, Operation::Read, session.as_ref())?;
    ProductRepository::new(state.pool())
        .get(id, scope)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}

/// Update a product.
pub async fn update(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
    Path(id): Path<ProductId>,
    Json(changes): Json<ProductChanges>,
) -> Result<Json<Product>> {
    let scope = authorize(List::Product, Operation::Update, session.as_ref())?;
    if changes.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(AppError::BadRequest("name is required".to_string()));
    }
    if let Some(price) = changes.price {
        validate_price(price)?;
    }

    let product = ProductRepository::new(state.pool())
        .update(id, changes, scope)
        .await?;
    Ok(Json(product))
}

/// Delete a product. Cart items keep an empty product reference.
pub async fn destroy(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    let scope = authorize(List::Product, Operation::Delete, session.as_ref())?;
    if ProductRepository::new(state.pool()).delete(id, scope).await? {
        tracing::info!(product_id = %id, "Product deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("product {id}")))
    }
}

fn validate_price(price: Price) -> Result<()> {
    if price.is_negative() {
        return Err(AppError::BadRequest("price cannot be negative".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    use super::*;

    #[test]
    fn test_negative_price_is_a_bad_request() {
        let err = validate_price(Price::from_cents(-100)).err();
        assert_eq!(
            err.map(|e| e.into_response().status()),
            Some(StatusCode::BAD_REQUEST)
        );
    }

    #[test]
    fn test_free_and_priced_products_are_fine() {
        assert!(validate_price(Price::ZERO).is_ok());
        assert!(validate_price(Price::from_cents(3423)).is_ok());
    }
}

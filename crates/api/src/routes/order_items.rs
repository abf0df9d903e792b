//! Order item handlers. Read-only.

use axum::{
    Json,
    extract::{Path, State},
};

use cyber_shop_core::OrderItemId;

use crate::access::{List, Operation};
use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::OptionalSession;
use crate::models::OrderItem;
use crate::routes::authorize;
use crate::state::AppState;

pub async fn index(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
) -> Result<Json<Vec<OrderItem>>> {
    let scope = authorize(List::OrderItem, Operation::Read, session.as_ref())?;
    Ok(Json(OrderRepository::new(state.pool()).list_items(scope).await?))
}

pub async fn show(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
    Path(id): Path<OrderItemId>,
) -> Result<Json<OrderItem>> {
    let scope = authorize(List::OrderItem, Operation::Read, session.as_ref())?;
    OrderRepository::new(state.pool())
        .get_item(id, scope)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("order item {id}")))
}

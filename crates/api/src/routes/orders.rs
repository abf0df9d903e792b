//! Order handlers. Orders are read-only; they are created by checkout.

use axum::{
    Json,
    extract::{Path, State},
};

use cyber_shop_core::OrderId;

use crate::access::{List, Operation};
use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::OptionalSession;
use crate::models::OrderWithItems;
use crate::routes::authorize;
use crate::state::AppState;

/// List the orders the caller may see, with their items.
pub async fn index(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
) -> Result<Json<Vec<OrderWithItems>>> {
    let scope = authorize(List::Order, Operation::Read, session.as_ref())?;
    Ok(Json(OrderRepository::new(state.pool()).list(scope).await?))
}

/// Get one order with its items.
pub async fn show(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderWithItems>> {
    let scope = authorize(List::Order, Operation::Read, session.as_ref())?;
    OrderRepository::new(state.pool())
        .get(id, scope)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))
}

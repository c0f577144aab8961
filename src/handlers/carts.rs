use axum::{
    extract::{Path, State},
    response::Response,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    auth::AuthContext,
    errors::ApiError,
    handlers::common,
    services::cart::{AddLineInput, CountDelta},
    AppState,
};

/// GET /cart — the caller's carts across all stores, reconciled.
pub async fn get_cart(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
) -> Result<Response, ApiError> {
    let summary = state.services.carts.summary(ctx.user_id).await?;
    Ok(common::ok("Cart retrieved", summary))
}

/// POST /cart/items — add a listing with count 1.
pub async fn add_item(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Json(input): Json<AddLineInput>,
) -> Result<Response, ApiError> {
    let line = state.services.carts.add_line(ctx.user_id, input).await?;
    Ok(common::created("Added to cart", line))
}

#[derive(Debug, Deserialize)]
pub struct ChangeItemInput {
    pub store_product_id: Uuid,
    pub delta: CountDelta,
}

/// POST /cart/items/change — move a line's count by one unit.
pub async fn change_item(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Json(input): Json<ChangeItemInput>,
) -> Result<Response, ApiError> {
    let line = state
        .services
        .carts
        .change_count(ctx.user_id, input.store_product_id, input.delta)
        .await?;
    Ok(common::ok("Cart updated", line))
}

/// GET /cart/:store_id/pre-invoice — reconciled checkout preview for one store.
pub async fn pre_invoice(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(store_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let pre = state
        .services
        .carts
        .pre_invoice(ctx.user_id, store_id)
        .await?;
    Ok(common::ok("Pre-invoice computed", pre))
}

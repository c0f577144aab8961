use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    auth::AuthContext, entities::OrderAction, errors::ApiError,
    handlers::{common, invoices::TransitionInput},
    query::ListQuery, AppState,
};

/// GET /factors — store-side listing, narrowable by buyer.
pub async fn list(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let page = state.services.factors.list(ctx, &query).await?;
    Ok(common::page("Factors retrieved", page))
}

/// GET /factors/:id — one factor with its items.
pub async fn get(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(factor_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let detail = state.services.factors.get(ctx, factor_id).await?;
    Ok(common::ok("Factor retrieved", detail))
}

/// POST /factors/:id/:action — header transition, items follow.
pub async fn transition(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path((factor_id, action)): Path<(Uuid, OrderAction)>,
    body: Option<Json<TransitionInput>>,
) -> Result<Response, ApiError> {
    let comment = body.and_then(|Json(input)| input.comment);
    let factor = state
        .services
        .factors
        .apply(ctx, factor_id, action, comment)
        .await?;
    Ok(common::ok("Factor updated", factor))
}

/// POST /factors/items/:item_id/:action — single-item transition.
pub async fn transition_item(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path((item_id, action)): Path<(Uuid, OrderAction)>,
) -> Result<Response, ApiError> {
    let item = state
        .services
        .factors
        .apply_item(ctx, item_id, action)
        .await?;
    Ok(common::ok("Factor item updated", item))
}

/// DELETE /factors/:id — admin soft delete.
pub async fn remove(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(factor_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    state.services.factors.soft_delete(ctx, factor_id).await?;
    Ok(common::no_content())
}

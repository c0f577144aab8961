use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    auth::AuthContext, errors::ApiError, handlers::common, query::ListQuery,
    services::inventory::UpdatePricesInput, AppState,
};

/// GET /store-products — catalog search through the filter engine.
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let page = state.services.store_products.list(&query).await?;
    Ok(common::page("Store products retrieved", page))
}

/// GET /store-products/:id
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(store_product_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let product = state.services.store_products.get(store_product_id).await?;
    Ok(common::ok("Store product retrieved", product))
}

/// PUT /store-products/:id/prices — owning store (or admin) updates prices,
/// invalidating stale cart snapshots.
pub async fn update_prices(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(store_product_id): Path<Uuid>,
    Json(input): Json<UpdatePricesInput>,
) -> Result<Response, ApiError> {
    if !ctx.is_admin() {
        let store_id = ctx.require_store()?;
        let product = state.services.store_products.get(store_product_id).await?;
        if product.store_id != store_id {
            return Err(ApiError::Forbidden);
        }
    }

    let updated = state
        .services
        .stock
        .update_prices(store_product_id, input)
        .await?;
    Ok(common::ok("Prices updated", updated))
}

use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    auth::AuthContext, entities::OrderAction, errors::ApiError, handlers::common,
    query::ListQuery, AppState,
};

/// GET /invoices — filtered, paginated, role-scoped listing.
pub async fn list(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let page = state.services.invoices.list(ctx, &query).await?;
    Ok(common::page("Invoices retrieved", page))
}

/// GET /invoices/:id — one invoice with its items.
pub async fn get(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(invoice_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let detail = state.services.invoices.get(ctx, invoice_id).await?;
    Ok(common::ok("Invoice retrieved", detail))
}

#[derive(Debug, Default, Deserialize)]
pub struct TransitionInput {
    pub comment: Option<String>,
}

/// POST /invoices/:id/:action — apply accept|reject|cancel|sending|finished.
///
/// Illegal transitions return the unchanged invoice with 200, not an error.
pub async fn transition(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path((invoice_id, action)): Path<(Uuid, OrderAction)>,
    body: Option<Json<TransitionInput>>,
) -> Result<Response, ApiError> {
    let comment = body.and_then(|Json(input)| input.comment);
    let invoice = state
        .services
        .invoices
        .apply(ctx, invoice_id, action, comment)
        .await?;
    Ok(common::ok("Invoice updated", invoice))
}

/// DELETE /invoices/:id — admin soft delete.
pub async fn remove(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(invoice_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    state.services.invoices.soft_delete(ctx, invoice_id).await?;
    Ok(common::no_content())
}

/// POST /invoices/:id/restore — admin restore of a soft-deleted invoice.
pub async fn restore(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(invoice_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    state.services.invoices.restore(ctx, invoice_id).await?;
    Ok(common::ok("Invoice restored", ()))
}

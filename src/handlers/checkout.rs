use axum::{
    extract::{Path, State},
    response::Response,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    auth::AuthContext, errors::ApiError, handlers::common, services::checkout::CheckoutOutcome,
    AppState,
};

/// POST /checkout/:store_id — turn the caller's cart for one store into an
/// invoice.
pub async fn checkout(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(store_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let outcome = state
        .services
        .checkout
        .checkout(ctx.user_id, store_id)
        .await?;

    Ok(match &outcome {
        CheckoutOutcome::Completed { .. } => common::created("Invoice created", outcome),
        CheckoutOutcome::NotPayable { .. } => {
            common::ok("Cart changed, re-confirmation required", outcome)
        }
        CheckoutOutcome::EmptyCart => common::ok("Cart is empty", outcome),
    })
}

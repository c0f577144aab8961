//! HTTP surface. Handlers stay thin: extract, call a service, envelope.

use axum::{
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

use crate::AppState;

pub mod carts;
pub mod checkout;
pub mod common;
pub mod factors;
pub mod invoices;
pub mod store_products;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/cart", get(carts::get_cart))
        .route("/cart/items", post(carts::add_item))
        .route("/cart/items/change", post(carts::change_item))
        .route("/cart/:store_id/pre-invoice", get(carts::pre_invoice))
        .route("/checkout/:store_id", post(checkout::checkout))
        .route("/invoices", get(invoices::list))
        .route(
            "/invoices/:id",
            get(invoices::get).delete(invoices::remove),
        )
        .route("/invoices/:id/restore", post(invoices::restore))
        .route("/invoices/:id/:action", post(invoices::transition))
        .route("/factors", get(factors::list))
        .route("/factors/:id", get(factors::get).delete(factors::remove))
        .route("/factors/:id/:action", post(factors::transition))
        .route(
            "/factors/items/:item_id/:action",
            post(factors::transition_item),
        )
        .route("/store-products", get(store_products::list))
        .route("/store-products/:id", get(store_products::get))
        .route(
            "/store-products/:id/prices",
            put(store_products::update_prices),
        )
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

//! Marketplace backend core: per-store carts, reconciliation-gated checkout,
//! the invoice/factor order lifecycle and a shared filtered-search engine.

use sea_orm::DatabaseConnection;
use std::sync::Arc;

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod query;
pub mod services;

use config::AppConfig;
use events::EventSender;
use services::{
    CartService, CheckoutService, FactorService, InvoiceService, StockService, StoreProductService,
};

/// All service instances, constructed once and shared across requests.
#[derive(Clone)]
pub struct AppServices {
    pub carts: CartService,
    pub checkout: CheckoutService,
    pub invoices: InvoiceService,
    pub factors: FactorService,
    pub stock: StockService,
    pub store_products: StoreProductService,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            carts: CartService::new(db.clone(), event_sender.clone(), config.clone()),
            checkout: CheckoutService::new(db.clone(), event_sender.clone(), config.clone()),
            invoices: InvoiceService::new(db.clone(), event_sender.clone(), config.clone()),
            factors: FactorService::new(db.clone(), event_sender.clone(), config.clone()),
            stock: StockService::new(db.clone(), event_sender),
            store_products: StoreProductService::new(db, config),
        }
    }
}

/// Shared application state handed to the router.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<AppConfig>,
    pub event_sender: Arc<EventSender>,
    pub services: AppServices,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: AppConfig, event_sender: EventSender) -> Self {
        let db = Arc::new(db);
        let config = Arc::new(config);
        let event_sender = Arc::new(event_sender);
        let services = AppServices::new(db.clone(), event_sender.clone(), config.clone());
        Self {
            db,
            config,
            event_sender,
            services,
        }
    }
}

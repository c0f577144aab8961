//! Shared test harness: in-memory SQLite with the schema created from the
//! entity definitions, plus seed helpers.
#![allow(dead_code)]

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, DbBackend, Schema, Set,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use marketplace_api::{
    auth::{AccountType, AuthContext},
    config::AppConfig,
    entities::{
        cart_line, store_product, store_product_discount, CartLine, DiscountType, Factor,
        FactorItem, Invoice, InvoiceItem, StoreProduct, StoreProductDiscount,
    },
    events::{process_events, EventSender},
    AppServices,
};

pub struct TestApp {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<AppConfig>,
    pub services: AppServices,
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "0123456789abcdef0123456789abcdef".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        environment: "test".to_string(),
        log_level: "warn".to_string(),
        log_json: false,
        default_page_size: 20,
        max_page_size: 50,
        pass_discount_changed: false,
        tracking_number_max_attempts: 32,
    }
}

pub async fn setup() -> TestApp {
    setup_with_config(test_config()).await
}

pub async fn setup_with_config(config: AppConfig) -> TestApp {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("connect in-memory sqlite");

    let schema = Schema::new(DbBackend::Sqlite);
    let backend = db.get_database_backend();
    let statements = [
        schema.create_table_from_entity(StoreProduct),
        schema.create_table_from_entity(StoreProductDiscount),
        schema.create_table_from_entity(CartLine),
        schema.create_table_from_entity(Invoice),
        schema.create_table_from_entity(InvoiceItem),
        schema.create_table_from_entity(Factor),
        schema.create_table_from_entity(FactorItem),
    ];
    for stmt in statements {
        db.execute(backend.build(&stmt)).await.expect("create table");
    }

    let (tx, rx) = mpsc::channel(256);
    tokio::spawn(process_events(rx));

    let db = Arc::new(db);
    let config = Arc::new(config);
    let services = AppServices::new(
        db.clone(),
        Arc::new(EventSender::new(tx)),
        config.clone(),
    );

    TestApp {
        db,
        config,
        services,
    }
}

pub fn user_ctx(user_id: Uuid) -> AuthContext {
    AuthContext {
        user_id,
        account_type: AccountType::User,
        store_id: None,
    }
}

pub fn store_ctx(store_id: Uuid) -> AuthContext {
    AuthContext {
        user_id: Uuid::new_v4(),
        account_type: AccountType::Store,
        store_id: Some(store_id),
    }
}

pub fn admin_ctx() -> AuthContext {
    AuthContext {
        user_id: Uuid::new_v4(),
        account_type: AccountType::Admin,
        store_id: None,
    }
}

/// Inserts a confirmed listing with the given price and stock.
pub async fn seed_store_product(
    db: &DatabaseConnection,
    store_id: Uuid,
    price: i64,
    warehouse_count: i32,
) -> store_product::Model {
    let now = Utc::now();
    store_product::ActiveModel {
        id: Set(Uuid::new_v4()),
        store_id: Set(store_id),
        product_id: Set(Uuid::new_v4()),
        store_price: Set(price),
        consumer_price: Set(price),
        production_price: Set(price / 2),
        warehouse_count: Set(warehouse_count),
        per_unit: Set(1),
        cash_payment_discount: Set(0),
        commission: Set(0),
        admin_confirmed: Set(true),
        price_update_time: Set(now),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    }
    .insert(db)
    .await
    .expect("seed store product")
}

/// Inserts a discount rule and returns it.
pub async fn seed_discount(
    db: &DatabaseConnection,
    store_product_id: Uuid,
    discount_type: DiscountType,
    discount_value: i64,
    final_price: i64,
) -> store_product_discount::Model {
    let now = Utc::now();
    store_product_discount::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(store_product_id),
        discount_type: Set(discount_type),
        discount_value: Set(discount_value),
        final_price: Set(final_price),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("seed discount")
}

/// Puts `count` units of a listing in a user's cart at the current price.
pub async fn seed_cart_line(
    db: &DatabaseConnection,
    user_id: Uuid,
    product: &store_product::Model,
    count: i32,
    current_discount: Option<String>,
) -> cart_line::Model {
    let now = Utc::now();
    cart_line::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        store_id: Set(product.store_id),
        product_id: Set(product.id),
        base_product_id: Set(product.product_id),
        count: Set(count),
        is_payment_cash: Set(false),
        current_price: Set(product.store_price),
        current_discount: Set(current_discount),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("seed cart line")
}

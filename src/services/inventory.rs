use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{invoice_item, store_product, InvoiceItem, StoreProduct},
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Stock and price operations on store listings.
///
/// Stock changes are single-statement column-expression updates so concurrent
/// checkouts and restocks never lose increments and `warehouse_count` never
/// goes negative.
#[derive(Clone)]
pub struct StockService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl StockService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Decrements a listing's stock, failing when fewer than `count` units
    /// remain. Safe under concurrent checkouts: the guard is part of the
    /// UPDATE statement.
    #[instrument(skip(self, conn))]
    pub async fn decrement<C: ConnectionTrait>(
        &self,
        conn: &C,
        store_product_id: Uuid,
        count: i32,
    ) -> Result<(), ServiceError> {
        decrement_stock(conn, store_product_id, count).await?;
        self.event_sender
            .send_or_log(Event::StockDecremented {
                store_product_id,
                count,
            })
            .await;
        Ok(())
    }

    /// Returns reserved units to a listing after a reject or cancel.
    #[instrument(skip(self, conn))]
    pub async fn restock<C: ConnectionTrait>(
        &self,
        conn: &C,
        store_product_id: Uuid,
        count: i32,
    ) -> Result<(), ServiceError> {
        restock(conn, store_product_id, count).await?;
        self.event_sender
            .send_or_log(Event::StockRestocked {
                store_product_id,
                count,
            })
            .await;
        Ok(())
    }

    /// Updates a listing's price fields, bumping `price_update_time` so cart
    /// snapshots taken before the change are detected as stale.
    #[instrument(skip(self))]
    pub async fn update_prices(
        &self,
        store_product_id: Uuid,
        input: UpdatePricesInput,
    ) -> Result<store_product::Model, ServiceError> {
        input.validate()?;

        let mut update = StoreProduct::update_many()
            .filter(store_product::Column::Id.eq(store_product_id))
            .col_expr(
                store_product::Column::PriceUpdateTime,
                Expr::value(Utc::now()),
            )
            .col_expr(store_product::Column::UpdatedAt, Expr::value(Utc::now()));

        if let Some(store_price) = input.store_price {
            update = update.col_expr(store_product::Column::StorePrice, Expr::value(store_price));
        }
        if let Some(consumer_price) = input.consumer_price {
            update = update.col_expr(
                store_product::Column::ConsumerPrice,
                Expr::value(consumer_price),
            );
        }
        if let Some(production_price) = input.production_price {
            update = update.col_expr(
                store_product::Column::ProductionPrice,
                Expr::value(production_price),
            );
        }

        let res = update.exec(&*self.db).await?;
        if res.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Store product {} not found",
                store_product_id
            )));
        }

        let updated = StoreProduct::find_by_id(store_product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Store product {} not found", store_product_id))
            })?;

        info!("Updated prices for store product {}", store_product_id);
        Ok(updated)
    }
}

/// Guarded atomic decrement; zero rows affected means the listing is missing
/// or short on stock.
pub async fn decrement_stock<C: ConnectionTrait>(
    conn: &C,
    store_product_id: Uuid,
    count: i32,
) -> Result<(), ServiceError> {
    let res = StoreProduct::update_many()
        .col_expr(
            store_product::Column::WarehouseCount,
            Expr::col(store_product::Column::WarehouseCount).sub(count),
        )
        .col_expr(store_product::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(store_product::Column::Id.eq(store_product_id))
        .filter(store_product::Column::WarehouseCount.gte(count))
        .exec(conn)
        .await?;

    if res.rows_affected == 0 {
        return Err(ServiceError::InsufficientStock(format!(
            "Store product {} has fewer than {} units available",
            store_product_id, count
        )));
    }
    Ok(())
}

/// Releases one reserved order line back to stock, at most once.
///
/// The invoice item row is the settlement ledger for the reservation the
/// invoice and its parallel factor share. The guarded flip of `stock_settled`
/// decides who performs the physical restock; a second release attempt, from
/// either flow, matches zero rows and returns `false` without touching
/// `warehouse_count`.
pub async fn release_line<C: ConnectionTrait>(
    conn: &C,
    invoice_id: Uuid,
    store_product_id: Uuid,
    count: i32,
) -> Result<bool, ServiceError> {
    let res = InvoiceItem::update_many()
        .col_expr(invoice_item::Column::StockSettled, Expr::value(true))
        .col_expr(invoice_item::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(invoice_item::Column::InvoiceId.eq(invoice_id))
        .filter(invoice_item::Column::StoreProductId.eq(store_product_id))
        .filter(invoice_item::Column::StockSettled.eq(false))
        .exec(conn)
        .await?;

    if res.rows_affected == 0 {
        return Ok(false);
    }
    restock(conn, store_product_id, count).await?;
    Ok(true)
}

/// Atomic increment, used when rejects and cancels release reserved units.
pub async fn restock<C: ConnectionTrait>(
    conn: &C,
    store_product_id: Uuid,
    count: i32,
) -> Result<(), ServiceError> {
    StoreProduct::update_many()
        .col_expr(
            store_product::Column::WarehouseCount,
            Expr::col(store_product::Column::WarehouseCount).add(count),
        )
        .col_expr(store_product::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(store_product::Column::Id.eq(store_product_id))
        .exec(conn)
        .await?;
    Ok(())
}

/// Input for a price update on a listing.
#[derive(Debug, Default, serde::Deserialize, Validate)]
pub struct UpdatePricesInput {
    #[validate(range(min = 0))]
    pub store_price: Option<i64>,
    #[validate(range(min = 0))]
    pub consumer_price: Option<i64>,
    #[validate(range(min = 0))]
    pub production_price: Option<i64>,
}

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::AppConfig,
    entities::{cart_line, store_product_discount, CartLine, StoreProduct, StoreProductDiscount},
    errors::ServiceError,
    events::{Event, EventSender},
    services::pricing::{self, LineCost, PricingService},
};

/// Per-user, per-store cart ledger with read-time price/stock re-validation.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
}

impl CartService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db,
            event_sender,
            config,
        }
    }

    /// Adds a listing to the user's cart with count 1, snapshotting the
    /// current store price and the discount rule the client chose.
    ///
    /// The existing-line pre-check runs in the same transaction as the
    /// insert; two simultaneous adds of the same listing can still both pass
    /// the check (caller responsibility, see DESIGN.md).
    #[instrument(skip(self))]
    pub async fn add_line(
        &self,
        user_id: Uuid,
        input: AddLineInput,
    ) -> Result<cart_line::Model, ServiceError> {
        input.validate()?;
        let txn = self.db.begin().await?;

        let product = StoreProduct::find_by_id(input.store_product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Store product {} not found",
                    input.store_product_id
                ))
            })?;

        if !product.is_available() {
            return Err(ServiceError::InvalidOperation(
                "Product is not available".to_string(),
            ));
        }

        let existing = CartLine::find()
            .filter(cart_line::Column::UserId.eq(user_id))
            .filter(cart_line::Column::StoreId.eq(product.store_id))
            .filter(cart_line::Column::ProductId.eq(product.id))
            .one(&txn)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(
                "Product is already in the cart".to_string(),
            ));
        }

        // Snapshot the chosen discount's signature, if any.
        let current_discount = match input.discount_id {
            Some(discount_id) => {
                let rule = StoreProductDiscount::find_by_id(discount_id)
                    .filter(store_product_discount::Column::ProductId.eq(product.id))
                    .one(&txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Discount {} not found", discount_id))
                    })?;
                Some(pricing::signature_of(&rule))
            }
            None => None,
        };

        let line = cart_line::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            store_id: Set(product.store_id),
            product_id: Set(product.id),
            base_product_id: Set(product.product_id),
            count: Set(1),
            is_payment_cash: Set(input.is_payment_cash),
            current_price: Set(product.store_price),
            current_discount: Set(current_discount),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };

        let line = line.insert(&txn).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartLineAdded {
                user_id,
                store_product_id: product.id,
            })
            .await;

        info!("Added store product {} to cart of {}", product.id, user_id);
        Ok(line)
    }

    /// Changes a line's count by +1 or -1.
    ///
    /// Increments clamp at the listing's live stock; a decrement that reaches
    /// zero deletes the line. Changing an absent line is a no-op.
    #[instrument(skip(self))]
    pub async fn change_count(
        &self,
        user_id: Uuid,
        store_product_id: Uuid,
        delta: CountDelta,
    ) -> Result<Option<cart_line::Model>, ServiceError> {
        let txn = self.db.begin().await?;

        let Some(line) = CartLine::find()
            .filter(cart_line::Column::UserId.eq(user_id))
            .filter(cart_line::Column::ProductId.eq(store_product_id))
            .one(&txn)
            .await?
        else {
            return Ok(None);
        };

        match delta {
            CountDelta::Increment => {
                let product = StoreProduct::find_by_id(store_product_id)
                    .one(&txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!(
                            "Store product {} not found",
                            store_product_id
                        ))
                    })?;

                // Clamp at live stock: incrementing past availability keeps
                // the current count.
                if line.count + 1 > product.warehouse_count {
                    txn.commit().await?;
                    return Ok(Some(line));
                }

                let count = line.count + 1;
                let mut active: cart_line::ActiveModel = line.into();
                active.count = Set(count);
                active.updated_at = Set(Utc::now());
                let updated = active.update(&txn).await?;
                txn.commit().await?;
                Ok(Some(updated))
            }
            CountDelta::Decrement => {
                if line.count <= 1 {
                    let product_id = line.product_id;
                    CartLine::delete_by_id(line.id).exec(&txn).await?;
                    txn.commit().await?;
                    self.event_sender
                        .send_or_log(Event::CartLineRemoved {
                            user_id,
                            store_product_id: product_id,
                        })
                        .await;
                    Ok(None)
                } else {
                    let count = line.count - 1;
                    let mut active: cart_line::ActiveModel = line.into();
                    active.count = Set(count);
                    active.updated_at = Set(Utc::now());
                    let updated = active.update(&txn).await?;
                    txn.commit().await?;
                    Ok(Some(updated))
                }
            }
        }
    }

    /// Cart summary across all stores, reconciled against live listings and
    /// grouped per store.
    #[instrument(skip(self))]
    pub async fn summary(&self, user_id: Uuid) -> Result<CartSummary, ServiceError> {
        let txn = self.db.begin().await?;

        let lines = CartLine::find()
            .filter(cart_line::Column::UserId.eq(user_id))
            .all(&txn)
            .await?;

        let mut store_ids: Vec<Uuid> = Vec::new();
        for line in &lines {
            if !store_ids.contains(&line.store_id) {
                store_ids.push(line.store_id);
            }
        }

        let mut stores = Vec::with_capacity(store_ids.len());
        for store_id in store_ids {
            let pre = reconcile_store(&txn, &self.config, user_id, store_id).await?;
            if !pre.lines.is_empty() {
                stores.push(pre);
            }
        }

        txn.commit().await?;
        Ok(CartSummary { user_id, stores })
    }

    /// Reconciled pre-invoice for one store's cart, the checkout gate.
    #[instrument(skip(self))]
    pub async fn pre_invoice(
        &self,
        user_id: Uuid,
        store_id: Uuid,
    ) -> Result<PreInvoice, ServiceError> {
        let txn = self.db.begin().await?;
        let pre = reconcile_store(&txn, &self.config, user_id, store_id).await?;
        txn.commit().await?;
        Ok(pre)
    }
}

/// Syncs every cart line of (user, store) against its live listing.
///
/// Exhausted lines are deleted outright. Price drift refreshes the stored
/// snapshot and blocks payment until the user re-confirms. Discount drift
/// blocks payment too, unless the deployment passes discount changes through
/// (`pass_discount_changed`); the two drift kinds stay separate flags.
pub async fn reconcile_store<C: ConnectionTrait>(
    conn: &C,
    config: &AppConfig,
    user_id: Uuid,
    store_id: Uuid,
) -> Result<PreInvoice, ServiceError> {
    let lines = CartLine::find()
        .filter(cart_line::Column::UserId.eq(user_id))
        .filter(cart_line::Column::StoreId.eq(store_id))
        .all(conn)
        .await?;

    let mut reconciled = Vec::with_capacity(lines.len());
    let mut payment_state = true;

    for line in lines {
        let product = match StoreProduct::find_by_id(line.product_id).one(conn).await? {
            Some(product) if product.is_available() => product,
            _ => {
                CartLine::delete_by_id(line.id).exec(conn).await?;
                payment_state = false;
                continue;
            }
        };

        let mut line = line;
        let mut price_changed = false;
        if product.store_price != line.current_price {
            let mut active: cart_line::ActiveModel = line.into();
            active.current_price = Set(product.store_price);
            active.updated_at = Set(Utc::now());
            line = active.update(conn).await?;
            price_changed = true;
            payment_state = false;
        }

        let mut discount_changed = false;
        let mut discounted_unit_price = None;
        if let Some(snapshot) = line.current_discount.as_deref() {
            if PricingService::check_discount(conn, line.product_id, snapshot).await? {
                discount_changed = true;
                if !config.pass_discount_changed {
                    payment_state = false;
                }
            } else {
                discounted_unit_price =
                    PricingService::matching_final_price(conn, line.product_id, snapshot).await?;
            }
        }

        let cost = pricing::line_cost(line.count, line.current_price, discounted_unit_price);
        reconciled.push(ReconciledLine {
            line,
            cost,
            price_changed,
            discount_changed,
        });
    }

    let total_price: i64 = reconciled.iter().map(|l| l.cost.total_price).sum();
    let final_price: i64 = reconciled.iter().map(|l| l.cost.final_total).sum();
    let items_count: i32 = reconciled.iter().map(|l| l.line.count).sum();
    let discount_price = total_price - final_price;

    Ok(PreInvoice {
        user_id,
        store_id,
        items_count,
        total_price,
        final_price,
        discount_price,
        is_discount: discount_price > 0,
        discount_percent: pricing::discount_percent(total_price, discount_price),
        payment_state,
        lines: reconciled,
    })
}

/// Count change direction; carts only move one unit at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountDelta {
    Increment,
    Decrement,
}

/// Input for adding a listing to the cart.
#[derive(Debug, Deserialize, Validate)]
pub struct AddLineInput {
    pub store_product_id: Uuid,
    #[serde(default)]
    pub is_payment_cash: bool,
    /// Discount rule the client chose at add time, if any.
    #[serde(default)]
    pub discount_id: Option<Uuid>,
}

/// A cart line after reconciliation against its live listing.
#[derive(Debug, Clone, Serialize)]
pub struct ReconciledLine {
    pub line: cart_line::Model,
    pub cost: LineCost,
    pub price_changed: bool,
    pub discount_changed: bool,
}

/// One store's reconciled cart, ready for checkout when `payment_state`.
#[derive(Debug, Clone, Serialize)]
pub struct PreInvoice {
    pub user_id: Uuid,
    pub store_id: Uuid,
    pub items_count: i32,
    pub total_price: i64,
    pub final_price: i64,
    pub discount_price: i64,
    pub is_discount: bool,
    pub discount_percent: f64,
    /// False while any line needs re-confirmation or was unavailable.
    pub payment_state: bool,
    pub lines: Vec<ReconciledLine>,
}

/// All of a user's carts, one entry per store.
#[derive(Debug, Clone, Serialize)]
pub struct CartSummary {
    pub user_id: Uuid,
    pub stores: Vec<PreInvoice>,
}

impl CartSummary {
    /// Totals per store keyed by store id, mostly for clients that render a
    /// compact badge.
    pub fn totals_by_store(&self) -> BTreeMap<Uuid, i64> {
        self.stores
            .iter()
            .map(|s| (s.store_id, s.final_price))
            .collect()
    }
}

use chrono::Utc;
use rand::Rng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, Set, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    entities::{
        cart_line, factor, factor_item, invoice, invoice_item, CartLine, Invoice, OrderState,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        cart::{reconcile_store, PreInvoice},
        inventory,
    },
};

/// Converts a valid cart into an invoice: reconcile, number, persist, reserve
/// stock, clear the cart — all inside one transaction.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
}

/// What a checkout attempt produced.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckoutOutcome {
    /// Invoice created; cart for the store is now empty.
    Completed {
        invoice: invoice::Model,
        items: Vec<invoice_item::Model>,
    },
    /// A line needs re-confirmation or went away; nothing was charged.
    /// The reconciled cart is surfaced so the client can re-confirm.
    NotPayable { pre_invoice: PreInvoice },
    /// The cart had no lines for this store. Checking out an empty cart is
    /// an idempotent no-op.
    EmptyCart,
}

impl CheckoutService {
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

    /// Runs checkout for one (user, store) cart.
    ///
    /// Reconciliation writes (price refreshes, exhausted-line deletions)
    /// persist even when the checkout itself does not proceed; the invoice,
    /// its items, the stock decrements and the cart clear commit or roll back
    /// as a unit.
    #[instrument(skip(self))]
    pub async fn checkout(
        &self,
        user_id: Uuid,
        store_id: Uuid,
    ) -> Result<CheckoutOutcome, ServiceError> {
        let txn = self.db.begin().await?;

        let pre = reconcile_store(&txn, &self.config, user_id, store_id).await?;

        if pre.lines.is_empty() {
            txn.commit().await?;
            return Ok(CheckoutOutcome::EmptyCart);
        }

        if !pre.payment_state {
            // Keep the reconciliation fixes, skip the purchase.
            txn.commit().await?;
            return Ok(CheckoutOutcome::NotPayable { pre_invoice: pre });
        }

        let tracking_number = self.unique_number(&txn, NumberKind::Tracking).await?;
        let bill_number = self.unique_number(&txn, NumberKind::Bill).await?;

        let invoice_id = Uuid::new_v4();
        let now = Utc::now();
        let invoice = invoice::ActiveModel {
            id: Set(invoice_id),
            state: Set(OrderState::Pending),
            items_count: Set(pre.items_count),
            total_price: Set(pre.total_price),
            total_discount: Set(pre.discount_price),
            tracking_number: Set(tracking_number),
            bill_number: Set(bill_number),
            billed_date: Set(now),
            store_id: Set(store_id),
            user_id: Set(user_id),
            store_comment: Set(None),
            user_comment: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        };
        let invoice = invoice.insert(&txn).await?;

        // Parallel factor header for the per-item store approval flow.
        let factor_id = Uuid::new_v4();
        let factor = factor::ActiveModel {
            id: Set(factor_id),
            invoice_id: Set(invoice_id),
            user_id: Set(user_id),
            store_id: Set(store_id),
            state: Set(OrderState::Pending),
            items_count: Set(pre.items_count),
            total_price: Set(pre.total_price),
            total_discount: Set(pre.discount_price),
            store_comment: Set(None),
            user_comment: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        };
        factor.insert(&txn).await?;

        let mut items = Vec::with_capacity(pre.lines.len());
        for reconciled in &pre.lines {
            let line = &reconciled.line;

            let item = invoice_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                invoice_id: Set(invoice_id),
                state: Set(OrderState::Pending),
                count: Set(line.count),
                price: Set(line.current_price),
                discount: Set(reconciled.cost.discount_price),
                store_product_id: Set(line.product_id),
                base_product_id: Set(line.base_product_id),
                stock_settled: Set(false),
                created_at: Set(now),
                updated_at: Set(now),
            };
            items.push(item.insert(&txn).await?);

            let factor_item = factor_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                factor_id: Set(factor_id),
                state: Set(OrderState::Pending),
                count: Set(line.count),
                price: Set(line.current_price),
                discount: Set(reconciled.cost.discount_price),
                store_product_id: Set(line.product_id),
                base_product_id: Set(line.base_product_id),
                created_at: Set(now),
                updated_at: Set(now),
            };
            factor_item.insert(&txn).await?;

            // Guarded decrement: a concurrent checkout that drained stock
            // fails this line and rolls the whole invoice back.
            inventory::decrement_stock(&txn, line.product_id, line.count).await?;
        }

        CartLine::delete_many()
            .filter(cart_line::Column::UserId.eq(user_id))
            .filter(cart_line::Column::StoreId.eq(store_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::InvoiceCreated(invoice_id))
            .await;
        self.event_sender
            .send_or_log(Event::CartCleared { user_id, store_id })
            .await;

        info!(
            "Checkout completed: invoice {} ({} items) for user {} at store {}",
            invoice_id, pre.items_count, user_id, store_id
        );
        Ok(CheckoutOutcome::Completed { invoice, items })
    }

    /// Rolls a random 9-digit number until it is unused, with a bounded
    /// number of attempts. Exhausting the attempts surfaces a conflict
    /// instead of looping under contention.
    async fn unique_number<C: ConnectionTrait>(
        &self,
        conn: &C,
        kind: NumberKind,
    ) -> Result<i64, ServiceError> {
        for _ in 0..self.config.tracking_number_max_attempts {
            let candidate: i64 = rand::thread_rng().gen_range(100_000_000..=999_999_999);
            let column = match kind {
                NumberKind::Tracking => invoice::Column::TrackingNumber,
                NumberKind::Bill => invoice::Column::BillNumber,
            };
            let taken = Invoice::find()
                .filter(column.eq(candidate))
                .count(conn)
                .await?;
            if taken == 0 {
                return Ok(candidate);
            }
        }
        Err(ServiceError::Conflict(format!(
            "Could not allocate a unique {} number after {} attempts",
            kind.label(),
            self.config.tracking_number_max_attempts
        )))
    }
}

#[derive(Debug, Clone, Copy)]
enum NumberKind {
    Tracking,
    Bill,
}

impl NumberKind {
    fn label(self) -> &'static str {
        match self {
            NumberKind::Tracking => "tracking",
            NumberKind::Bill => "bill",
        }
    }
}

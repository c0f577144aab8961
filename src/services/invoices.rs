use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Select,
    TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{AccountType, AuthContext},
    config::AppConfig,
    entities::{invoice, invoice_item, Invoice, InvoiceItem, OrderAction, OrderState},
    errors::ServiceError,
    events::{Event, EventSender},
    query::{run_filtered, FilterSpec, FilteredPage, ListQuery, ResolvedFilters},
    services::inventory,
};

/// Recognized filter keys for invoice listings.
const INVOICE_FILTERS: FilterSpec = FilterSpec::new(&[
    ("status", None),
    ("tracking_number", None),
    ("store_id", None),
    ("user_id", None),
]);

/// Invoice lifecycle: filtered listings, role-scoped projections and the
/// state machine with compensating restocks.
#[derive(Clone)]
pub struct InvoiceService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
}

impl InvoiceService {
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

    /// Lists invoices visible to the caller, newest first by default.
    ///
    /// Users see their own invoices, store operators their store's; admins
    /// may scope by `store_id`/`user_id` filter keys.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        ctx: AuthContext,
        query: &ListQuery,
    ) -> Result<FilteredPage<InvoiceView>, ServiceError> {
        let base = scope_for(ctx, Invoice::find())?;

        let page = run_filtered(
            &*self.db,
            base,
            query,
            &INVOICE_FILTERS,
            self.config.page_limits(),
            Some(invoice_filter as fn(Select<Invoice>, &ResolvedFilters) -> Select<Invoice>),
        )
        .await?;

        Ok(page.map(|model| InvoiceView::for_role(ctx.account_type, model)))
    }

    /// Fetches one invoice with its items, role-checked and role-projected.
    #[instrument(skip(self))]
    pub async fn get(
        &self,
        ctx: AuthContext,
        invoice_id: Uuid,
    ) -> Result<InvoiceDetail, ServiceError> {
        let invoice = Invoice::find_by_id(invoice_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Invoice {} not found", invoice_id)))?;

        authorize_view(ctx, &invoice)?;

        let items = InvoiceItem::find()
            .filter(invoice_item::Column::InvoiceId.eq(invoice_id))
            .all(&*self.db)
            .await?;

        Ok(InvoiceDetail {
            invoice: InvoiceView::for_role(ctx.account_type, invoice),
            items,
        })
    }

    /// Applies a state-machine action to an invoice.
    ///
    /// Illegal transitions are silently absorbed: the invoice is returned in
    /// its current state with no comment write and no restock. Reject and
    /// cancel restock every item's reserved count.
    #[instrument(skip(self))]
    pub async fn apply(
        &self,
        ctx: AuthContext,
        invoice_id: Uuid,
        action: OrderAction,
        comment: Option<String>,
    ) -> Result<invoice::Model, ServiceError> {
        let txn = self.db.begin().await?;

        let invoice = Invoice::find_by_id(invoice_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Invoice {} not found", invoice_id)))?;

        authorize_action(ctx, &invoice, action)?;

        let old_state = invoice.state;
        let Some(new_state) = old_state.next(action) else {
            // No-op on illegal transitions; callers rely on idempotent
            // retries seeing the unchanged state.
            txn.commit().await?;
            return Ok(invoice);
        };

        let mut update = Invoice::update_many()
            .col_expr(invoice::Column::State, Expr::value(new_state))
            .col_expr(invoice::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(invoice::Column::Id.eq(invoice_id))
            .filter(invoice::Column::State.eq(old_state));
        match action {
            OrderAction::Cancel => {
                update = update.col_expr(invoice::Column::UserComment, Expr::value(comment));
            }
            OrderAction::Accept | OrderAction::Reject => {
                update = update.col_expr(invoice::Column::StoreComment, Expr::value(comment));
            }
            _ => {}
        }
        // The state predicate loses the race against a concurrent transition;
        // the loser is treated like any other illegal transition.
        if update.exec(&txn).await?.rows_affected == 0 {
            txn.commit().await?;
            return Ok(invoice);
        }

        if OrderState::restocks(action) {
            let items = InvoiceItem::find()
                .filter(invoice_item::Column::InvoiceId.eq(invoice_id))
                .all(&txn)
                .await?;
            for item in &items {
                // Settled once; the parallel factor flow may already have
                // released this line.
                inventory::release_line(&txn, invoice_id, item.store_product_id, item.count)
                    .await?;
            }
        }

        // Items follow the parent on invoice-level transitions; the factor
        // flow advances them individually.
        InvoiceItem::update_many()
            .col_expr(invoice_item::Column::State, Expr::value(new_state))
            .col_expr(invoice_item::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(invoice_item::Column::InvoiceId.eq(invoice_id))
            .exec(&txn)
            .await?;

        let updated = Invoice::find_by_id(invoice_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Invoice {} not found", invoice_id)))?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::InvoiceStateChanged {
                invoice_id,
                old_state,
                new_state,
            })
            .await;

        info!(
            "Invoice {} transitioned {:?} -> {:?}",
            invoice_id, old_state, new_state
        );
        Ok(updated)
    }

    /// Soft-deletes an invoice (admin only); it stays reachable through the
    /// `trashed`/`all` list states.
    #[instrument(skip(self))]
    pub async fn soft_delete(
        &self,
        ctx: AuthContext,
        invoice_id: Uuid,
    ) -> Result<(), ServiceError> {
        if !ctx.is_admin() {
            return Err(ServiceError::Forbidden(
                "Only admins may delete invoices".to_string(),
            ));
        }
        self.set_deleted_at(invoice_id, Some(Utc::now())).await
    }

    /// Restores a soft-deleted invoice (admin only).
    #[instrument(skip(self))]
    pub async fn restore(&self, ctx: AuthContext, invoice_id: Uuid) -> Result<(), ServiceError> {
        if !ctx.is_admin() {
            return Err(ServiceError::Forbidden(
                "Only admins may restore invoices".to_string(),
            ));
        }
        self.set_deleted_at(invoice_id, None).await
    }

    async fn set_deleted_at(
        &self,
        invoice_id: Uuid,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Result<(), ServiceError> {
        let res = Invoice::update_many()
            .col_expr(invoice::Column::DeletedAt, Expr::value(deleted_at))
            .col_expr(invoice::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(invoice::Column::Id.eq(invoice_id))
            .exec(&*self.db)
            .await?;
        if res.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Invoice {} not found",
                invoice_id
            )));
        }
        Ok(())
    }
}

/// Scopes the base query to what the caller may see.
fn scope_for(ctx: AuthContext, base: Select<Invoice>) -> Result<Select<Invoice>, ServiceError> {
    match ctx.account_type {
        AccountType::User => Ok(base.filter(invoice::Column::UserId.eq(ctx.user_id))),
        AccountType::Store => {
            let store_id = ctx
                .store_id
                .ok_or_else(|| ServiceError::Forbidden("Store token without store".to_string()))?;
            Ok(base.filter(invoice::Column::StoreId.eq(store_id)))
        }
        AccountType::Admin => Ok(base),
    }
}

/// Translates recognized filter keys into invoice predicates.
fn invoice_filter(select: Select<Invoice>, filters: &ResolvedFilters) -> Select<Invoice> {
    let mut select = select;
    if let Some(state) = filters.get("status").and_then(|v| v.parse::<OrderState>().ok()) {
        select = select.filter(invoice::Column::State.eq(state));
    }
    if let Some(tracking) = filters.get_i64("tracking_number") {
        select = select.filter(invoice::Column::TrackingNumber.eq(tracking));
    }
    if let Some(store_id) = filters.get("store_id").and_then(|v| v.parse::<Uuid>().ok()) {
        select = select.filter(invoice::Column::StoreId.eq(store_id));
    }
    if let Some(user_id) = filters.get("user_id").and_then(|v| v.parse::<Uuid>().ok()) {
        select = select.filter(invoice::Column::UserId.eq(user_id));
    }
    select
}

fn authorize_view(ctx: AuthContext, invoice: &invoice::Model) -> Result<(), ServiceError> {
    let allowed = match ctx.account_type {
        AccountType::Admin => true,
        AccountType::User => invoice.user_id == ctx.user_id,
        AccountType::Store => ctx.store_id == Some(invoice.store_id),
    };
    if allowed {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(
            "Not allowed to view this invoice".to_string(),
        ))
    }
}

fn authorize_action(
    ctx: AuthContext,
    invoice: &invoice::Model,
    action: OrderAction,
) -> Result<(), ServiceError> {
    if ctx.is_admin() {
        return Ok(());
    }
    let allowed = match action {
        // Cancel belongs to the owning user.
        OrderAction::Cancel => {
            ctx.account_type == AccountType::User && invoice.user_id == ctx.user_id
        }
        // The remaining actions belong to the selling store.
        _ => ctx.account_type == AccountType::Store && ctx.store_id == Some(invoice.store_id),
    };
    if allowed {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(format!(
            "Not allowed to {:?} this invoice",
            action
        )))
    }
}

/// Role-scoped projection of one invoice row. One entity, different visible
/// fields per viewer.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum InvoiceView {
    User(UserInvoiceView),
    Store(StoreInvoiceView),
}

impl InvoiceView {
    pub fn for_role(role: AccountType, model: invoice::Model) -> Self {
        match role {
            AccountType::User => InvoiceView::User(UserInvoiceView {
                id: model.id,
                state: model.state,
                items_count: model.items_count,
                total_price: model.total_price,
                total_discount: model.total_discount,
                tracking_number: model.tracking_number,
                billed_date: model.billed_date,
                store_id: model.store_id,
                user_comment: model.user_comment,
                store_comment: model.store_comment,
            }),
            // Admins get the store-side projection.
            AccountType::Store | AccountType::Admin => InvoiceView::Store(StoreInvoiceView {
                id: model.id,
                state: model.state,
                items_count: model.items_count,
                total_price: model.total_price,
                total_discount: model.total_discount,
                tracking_number: model.tracking_number,
                bill_number: model.bill_number,
                billed_date: model.billed_date,
                user_id: model.user_id,
                user_comment: model.user_comment,
                store_comment: model.store_comment,
            }),
        }
    }
}

/// What the purchasing user sees: no bill number, no counterparty id.
#[derive(Debug, Serialize)]
pub struct UserInvoiceView {
    pub id: Uuid,
    pub state: OrderState,
    pub items_count: i32,
    pub total_price: i64,
    pub total_discount: i64,
    pub tracking_number: i64,
    pub billed_date: DateTime<Utc>,
    pub store_id: Uuid,
    pub user_comment: Option<String>,
    pub store_comment: Option<String>,
}

/// What the store operator sees, billing fields included.
#[derive(Debug, Serialize)]
pub struct StoreInvoiceView {
    pub id: Uuid,
    pub state: OrderState,
    pub items_count: i32,
    pub total_price: i64,
    pub total_discount: i64,
    pub tracking_number: i64,
    pub bill_number: i64,
    pub billed_date: DateTime<Utc>,
    pub user_id: Uuid,
    pub user_comment: Option<String>,
    pub store_comment: Option<String>,
}

/// One invoice plus its items.
#[derive(Debug, Serialize)]
pub struct InvoiceDetail {
    pub invoice: InvoiceView,
    pub items: Vec<invoice_item::Model>,
}

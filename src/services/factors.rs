use chrono::Utc;
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
    entities::{factor, factor_item, Factor, FactorItem, OrderAction, OrderState},
    errors::ServiceError,
    events::{Event, EventSender},
    query::{run_filtered, FilterSpec, FilteredPage, ListQuery, ResolvedFilters},
    services::inventory,
};

const FACTOR_FILTERS: FilterSpec = FilterSpec::new(&[("status", None), ("user_id", None)]);

/// Store-side per-item approval workflow over factor headers and their items.
///
/// Headers share the invoice state machine; items additionally advance on
/// their own, so a store can reject one line while shipping the rest.
#[derive(Clone)]
pub struct FactorService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
}

impl FactorService {
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

    /// Lists the store's factors, newest first, optionally narrowed to one
    /// buyer via the `user_id` filter key. Admins see every store.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        ctx: AuthContext,
        query: &ListQuery,
    ) -> Result<FilteredPage<factor::Model>, ServiceError> {
        let base = match ctx.account_type {
            AccountType::Admin => Factor::find(),
            AccountType::Store => {
                let store_id = ctx.store_id.ok_or_else(|| {
                    ServiceError::Forbidden("Store token without store".to_string())
                })?;
                Factor::find().filter(factor::Column::StoreId.eq(store_id))
            }
            AccountType::User => Factor::find().filter(factor::Column::UserId.eq(ctx.user_id)),
        };

        run_filtered(
            &*self.db,
            base,
            query,
            &FACTOR_FILTERS,
            self.config.page_limits(),
            Some(factor_filter as fn(Select<Factor>, &ResolvedFilters) -> Select<Factor>),
        )
        .await
    }

    /// One factor with its items, role-checked.
    #[instrument(skip(self))]
    pub async fn get(&self, ctx: AuthContext, factor_id: Uuid) -> Result<FactorDetail, ServiceError> {
        let factor = Factor::find_by_id(factor_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Factor {} not found", factor_id)))?;

        authorize(ctx, factor.user_id, factor.store_id, None)?;

        let items = FactorItem::find()
            .filter(factor_item::Column::FactorId.eq(factor_id))
            .all(&*self.db)
            .await?;

        Ok(FactorDetail { factor, items })
    }

    /// Applies an action to the factor header, moving every item along with it.
    ///
    /// Illegal transitions are a silent no-op, like invoices. Reject and
    /// cancel restock each item that had not already been individually
    /// rejected or canceled.
    #[instrument(skip(self))]
    pub async fn apply(
        &self,
        ctx: AuthContext,
        factor_id: Uuid,
        action: OrderAction,
        comment: Option<String>,
    ) -> Result<factor::Model, ServiceError> {
        let txn = self.db.begin().await?;

        let factor = Factor::find_by_id(factor_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Factor {} not found", factor_id)))?;

        authorize(ctx, factor.user_id, factor.store_id, Some(action))?;

        let old_state = factor.state;
        let Some(new_state) = old_state.next(action) else {
            txn.commit().await?;
            return Ok(factor);
        };

        let mut update = Factor::update_many()
            .col_expr(factor::Column::State, Expr::value(new_state))
            .col_expr(factor::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(factor::Column::Id.eq(factor_id))
            .filter(factor::Column::State.eq(old_state));
        match action {
            OrderAction::Cancel => {
                update = update.col_expr(factor::Column::UserComment, Expr::value(comment));
            }
            OrderAction::Accept | OrderAction::Reject => {
                update = update.col_expr(factor::Column::StoreComment, Expr::value(comment));
            }
            _ => {}
        }
        // A concurrent transition that won the race leaves zero rows; no-op.
        if update.exec(&txn).await?.rows_affected == 0 {
            txn.commit().await?;
            return Ok(factor);
        }

        let items = FactorItem::find()
            .filter(factor_item::Column::FactorId.eq(factor_id))
            .all(&txn)
            .await?;

        for item in &items {
            // Items already moved individually keep their state; their stock
            // was settled when they moved.
            if item.state.next(action).is_none() {
                continue;
            }
            if OrderState::restocks(action) {
                // Release via the invoice-side settlement ledger, so the
                // invoice flow and this one never restock the same line
                // twice.
                inventory::release_line(&txn, factor.invoice_id, item.store_product_id, item.count)
                    .await?;
            }
            FactorItem::update_many()
                .col_expr(factor_item::Column::State, Expr::value(new_state))
                .col_expr(factor_item::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(factor_item::Column::Id.eq(item.id))
                .exec(&txn)
                .await?;
        }

        let updated = Factor::find_by_id(factor_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Factor {} not found", factor_id)))?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::FactorStateChanged {
                factor_id,
                old_state,
                new_state,
            })
            .await;

        info!(
            "Factor {} transitioned {:?} -> {:?}",
            factor_id, old_state, new_state
        );
        Ok(updated)
    }

    /// Applies an action to a single factor item.
    ///
    /// Rejecting or canceling one item restocks only that item's count; the
    /// header keeps its own state so the rest of the order proceeds.
    #[instrument(skip(self))]
    pub async fn apply_item(
        &self,
        ctx: AuthContext,
        item_id: Uuid,
        action: OrderAction,
    ) -> Result<factor_item::Model, ServiceError> {
        let txn = self.db.begin().await?;

        let item = FactorItem::find_by_id(item_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Factor item {} not found", item_id)))?;

        let factor = Factor::find_by_id(item.factor_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Factor {} not found", item.factor_id))
            })?;

        authorize(ctx, factor.user_id, factor.store_id, Some(action))?;

        let old_state = item.state;
        let Some(new_state) = old_state.next(action) else {
            txn.commit().await?;
            return Ok(item);
        };

        let res = FactorItem::update_many()
            .col_expr(factor_item::Column::State, Expr::value(new_state))
            .col_expr(factor_item::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(factor_item::Column::Id.eq(item_id))
            .filter(factor_item::Column::State.eq(old_state))
            .exec(&txn)
            .await?;
        if res.rows_affected == 0 {
            txn.commit().await?;
            return Ok(item);
        }

        if OrderState::restocks(action) {
            inventory::release_line(&txn, factor.invoice_id, item.store_product_id, item.count)
                .await?;
        }

        let updated = FactorItem::find_by_id(item_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Factor item {} not found", item_id)))?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::FactorItemStateChanged {
                factor_item_id: item_id,
                old_state,
                new_state,
            })
            .await;

        info!(
            "Factor item {} transitioned {:?} -> {:?}",
            item_id, old_state, new_state
        );
        Ok(updated)
    }

    /// Soft-deletes a factor header (admin only).
    #[instrument(skip(self))]
    pub async fn soft_delete(&self, ctx: AuthContext, factor_id: Uuid) -> Result<(), ServiceError> {
        if !ctx.is_admin() {
            return Err(ServiceError::Forbidden(
                "Only admins may delete factors".to_string(),
            ));
        }
        let res = Factor::update_many()
            .col_expr(factor::Column::DeletedAt, Expr::value(Utc::now()))
            .col_expr(factor::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(factor::Column::Id.eq(factor_id))
            .filter(factor::Column::DeletedAt.is_null())
            .exec(&*self.db)
            .await?;
        if res.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Factor {} not found",
                factor_id
            )));
        }
        Ok(())
    }
}

fn factor_filter(select: Select<Factor>, filters: &ResolvedFilters) -> Select<Factor> {
    let mut select = select;
    if let Some(state) = filters.get("status").and_then(|v| v.parse::<OrderState>().ok()) {
        select = select.filter(factor::Column::State.eq(state));
    }
    if let Some(user_id) = filters.get("user_id").and_then(|v| v.parse::<Uuid>().ok()) {
        select = select.filter(factor::Column::UserId.eq(user_id));
    }
    select
}

fn authorize(
    ctx: AuthContext,
    user_id: Uuid,
    store_id: Uuid,
    action: Option<OrderAction>,
) -> Result<(), ServiceError> {
    if ctx.is_admin() {
        return Ok(());
    }
    let allowed = match action {
        // Viewing is open to both sides of the order.
        None => match ctx.account_type {
            AccountType::User => ctx.user_id == user_id,
            AccountType::Store => ctx.store_id == Some(store_id),
            AccountType::Admin => true,
        },
        Some(OrderAction::Cancel) => {
            ctx.account_type == AccountType::User && ctx.user_id == user_id
        }
        Some(_) => ctx.account_type == AccountType::Store && ctx.store_id == Some(store_id),
    };
    if allowed {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(
            "Not allowed to act on this factor".to_string(),
        ))
    }
}

/// One factor with its items.
#[derive(Debug, Serialize)]
pub struct FactorDetail {
    pub factor: factor::Model,
    pub items: Vec<factor_item::Model>,
}

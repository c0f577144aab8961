use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::order_state::OrderState;

/// A finalized, stateful order derived from a cart at checkout.
///
/// Created atomically with its items; immutable afterwards except for `state`
/// and the two comment fields. `tracking_number` and `bill_number` are
/// 9-digit values unique across all invoices.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub state: OrderState,
    pub items_count: i32,
    pub total_price: i64,
    pub total_discount: i64,
    pub tracking_number: i64,
    pub bill_number: i64,
    pub billed_date: DateTime<Utc>,
    pub store_id: Uuid,
    pub user_id: Uuid,
    #[sea_orm(nullable)]
    pub store_comment: Option<String>,
    #[sea_orm(nullable)]
    pub user_comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sea_orm(nullable)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::invoice_item::Entity")]
    Items,
}

impl Related<super::invoice_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

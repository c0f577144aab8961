use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::order_state::OrderState;

/// Legacy per-item approval workflow header, grouped by user for the store
/// operator view. Shares the invoice state machine shape.
///
/// `invoice_id` links back to the invoice created in the same checkout; the
/// invoice's items carry the settlement ledger for the shared stock
/// reservation.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "factors")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub user_id: Uuid,
    pub store_id: Uuid,
    pub state: OrderState,
    pub items_count: i32,
    pub total_price: i64,
    pub total_discount: i64,
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
    #[sea_orm(has_many = "super::factor_item::Entity")]
    Items,
    #[sea_orm(
        belongs_to = "super::invoice::Entity",
        from = "Column::InvoiceId",
        to = "super::invoice::Column::Id"
    )]
    Invoice,
}

impl Related<super::factor_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::invoice::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoice.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

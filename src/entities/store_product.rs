use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A store's priced, stocked listing of a shared catalog product.
///
/// All money fields are integers in the smallest currency unit. Percentages
/// are whole numbers 0-100. `price_update_time` is bumped whenever any price
/// field changes so clients can detect stale cart snapshots.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "store_products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub store_id: Uuid,
    pub product_id: Uuid,
    pub store_price: i64,
    pub consumer_price: i64,
    pub production_price: i64,
    pub warehouse_count: i32,
    pub per_unit: i32,
    pub cash_payment_discount: i32,
    pub commission: i32,
    pub admin_confirmed: bool,
    pub price_update_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sea_orm(nullable)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::store_product_discount::Entity")]
    Discounts,
    #[sea_orm(has_many = "super::cart_line::Entity")]
    CartLines,
    #[sea_orm(has_many = "super::invoice_item::Entity")]
    InvoiceItems,
}

impl Related<super::store_product_discount::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Discounts.def()
    }
}

impl Related<super::cart_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartLines.def()
    }
}

impl Related<super::invoice_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InvoiceItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// A listing is purchasable when confirmed, not soft-deleted and in stock.
    pub fn is_available(&self) -> bool {
        self.admin_confirmed && self.deleted_at.is_none() && self.warehouse_count > 0
    }
}

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One (user, store, store-product) pending-purchase record.
///
/// `current_price` and `current_discount` are snapshots taken at add time;
/// reconciliation compares them against the live listing before checkout.
/// At most one line may exist per (user_id, store_id, product_id) — enforced
/// by a pre-check at the service boundary, not by a database constraint.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cart_lines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub store_id: Uuid,
    /// The store's listing this line reserves.
    pub product_id: Uuid,
    /// The underlying catalog product.
    pub base_product_id: Uuid,
    pub count: i32,
    pub is_payment_cash: bool,
    pub current_price: i64,
    #[sea_orm(nullable)]
    pub current_discount: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::store_product::Entity",
        from = "Column::ProductId",
        to = "super::store_product::Column::Id"
    )]
    StoreProduct,
}

impl Related<super::store_product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StoreProduct.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

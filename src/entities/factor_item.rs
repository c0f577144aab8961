use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::order_state::OrderState;

/// One line of a factor, keyed by the store listing it reserves.
///
/// Unlike invoice items, factor items advance through the state machine
/// individually; rejecting or canceling a single item restocks only that
/// item's count.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "factor_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub factor_id: Uuid,
    pub state: OrderState,
    pub count: i32,
    pub price: i64,
    pub discount: i64,
    pub store_product_id: Uuid,
    pub base_product_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::factor::Entity",
        from = "Column::FactorId",
        to = "super::factor::Column::Id"
    )]
    Factor,
    #[sea_orm(
        belongs_to = "super::store_product::Entity",
        from = "Column::StoreProductId",
        to = "super::store_product::Column::Id"
    )]
    StoreProduct,
}

impl Related<super::factor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Factor.def()
    }
}

impl Related<super::store_product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StoreProduct.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

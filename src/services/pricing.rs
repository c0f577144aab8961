use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    entities::{store_product_discount, DiscountType, StoreProductDiscount},
    errors::ServiceError,
};

/// Builds the discount signature `{type}-{value}-{final_price}` used to detect
/// drift between a cart snapshot and the live discount rules.
pub fn signature(discount_type: DiscountType, value: i64, final_price: i64) -> String {
    format!("{}-{}-{}", discount_type.as_str(), value, final_price)
}

/// Signature of a stored discount rule.
pub fn signature_of(rule: &store_product_discount::Model) -> String {
    signature(rule.discount_type, rule.discount_value, rule.final_price)
}

/// Discount share of the total, as a percentage rounded to one decimal.
/// Zero total or zero discount yields zero rather than dividing by zero.
pub fn discount_percent(total_price: i64, discount_price: i64) -> f64 {
    if total_price == 0 || discount_price == 0 {
        return 0.0;
    }
    ((discount_price as f64 / total_price as f64) * 1000.0).round() / 10.0
}

/// Money breakdown for one cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineCost {
    /// `count × unit price`, before discount.
    pub total_price: i64,
    /// Amount actually payable.
    pub final_total: i64,
    /// `total_price - final_total`.
    pub discount_price: i64,
}

/// Costs a line: the discounted unit price applies only while the snapshot
/// signature is still valid; drifted lines are costed at full price and
/// flagged for re-confirmation by the caller, never silently repriced.
pub fn line_cost(count: i32, unit_price: i64, discounted_unit_price: Option<i64>) -> LineCost {
    let count = i64::from(count);
    let total_price = count * unit_price;
    let final_total = match discounted_unit_price {
        Some(discounted) => count * discounted,
        None => total_price,
    };
    LineCost {
        total_price,
        final_total,
        discount_price: total_price - final_total,
    }
}

/// Read-side resolver over the live discount rules of a listing.
#[derive(Clone)]
pub struct PricingService;

impl PricingService {
    /// Returns true when the snapshot signature no longer matches any live
    /// discount rule of the listing, i.e. the previously-applied discount has
    /// drifted.
    #[instrument(skip(conn))]
    pub async fn check_discount<C: ConnectionTrait>(
        conn: &C,
        store_product_id: Uuid,
        snapshot_signature: &str,
    ) -> Result<bool, ServiceError> {
        let rules = StoreProductDiscount::find()
            .filter(store_product_discount::Column::ProductId.eq(store_product_id))
            .all(conn)
            .await?;

        let changed = !rules
            .iter()
            .any(|rule| signature_of(rule) == snapshot_signature);
        Ok(changed)
    }

    /// Final unit price for a snapshot signature, when it still matches a
    /// live rule.
    #[instrument(skip(conn))]
    pub async fn matching_final_price<C: ConnectionTrait>(
        conn: &C,
        store_product_id: Uuid,
        snapshot_signature: &str,
    ) -> Result<Option<i64>, ServiceError> {
        let rules = StoreProductDiscount::find()
            .filter(store_product_discount::Column::ProductId.eq(store_product_id))
            .all(conn)
            .await?;

        Ok(rules
            .iter()
            .find(|rule| signature_of(rule) == snapshot_signature)
            .map(|rule| rule.final_price))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_encodes_type_value_final_price() {
        assert_eq!(signature(DiscountType::Price, 1000, 9000), "price-1000-9000");
        assert_eq!(signature(DiscountType::Count, 3, 2500), "count-3-2500");
    }

    #[test]
    fn percent_guards_division_by_zero() {
        assert_eq!(discount_percent(0, 500), 0.0);
        assert_eq!(discount_percent(500, 0), 0.0);
        assert_eq!(discount_percent(0, 0), 0.0);
    }

    #[test]
    fn percent_rounds_to_one_decimal() {
        assert_eq!(discount_percent(10_000, 1_000), 10.0);
        assert_eq!(discount_percent(3_000, 1_000), 33.3);
        assert_eq!(discount_percent(9_000, 1_234), 13.7);
    }

    #[test]
    fn line_cost_without_discount() {
        let cost = line_cost(3, 1_000, None);
        assert_eq!(cost.total_price, 3_000);
        assert_eq!(cost.final_total, 3_000);
        assert_eq!(cost.discount_price, 0);
    }

    #[test]
    fn line_cost_with_valid_discount() {
        let cost = line_cost(2, 5_000, Some(4_500));
        assert_eq!(cost.total_price, 10_000);
        assert_eq!(cost.final_total, 9_000);
        assert_eq!(cost.discount_price, 1_000);
    }
}

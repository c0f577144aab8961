use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Select};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    entities::{store_product, StoreProduct},
    errors::ServiceError,
    query::{run_filtered, FilterSpec, FilteredPage, ListQuery, ResolvedFilters},
};

/// Confirmed listings only, unless the caller asks otherwise.
const STORE_PRODUCT_FILTERS: FilterSpec = FilterSpec::new(&[
    ("store_id", None),
    ("product_id", None),
    ("confirmed", Some("true")),
    ("in_stock", None),
    ("min_price", None),
    ("max_price", None),
]);

/// Catalog reads over store listings, all funneled through the filter engine.
#[derive(Clone)]
pub struct StoreProductService {
    db: Arc<DatabaseConnection>,
    config: Arc<AppConfig>,
}

impl StoreProductService {
    pub fn new(db: Arc<DatabaseConnection>, config: Arc<AppConfig>) -> Self {
        Self { db, config }
    }

    /// Paginated listing search. Defaults to admin-confirmed, non-deleted
    /// listings; recognized keys narrow by store, base product, stock and
    /// price range.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        query: &ListQuery,
    ) -> Result<FilteredPage<store_product::Model>, ServiceError> {
        run_filtered(
            &*self.db,
            StoreProduct::find(),
            query,
            &STORE_PRODUCT_FILTERS,
            self.config.page_limits(),
            Some(
                store_product_filter
                    as fn(Select<StoreProduct>, &ResolvedFilters) -> Select<StoreProduct>,
            ),
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, store_product_id: Uuid) -> Result<store_product::Model, ServiceError> {
        StoreProduct::find_by_id(store_product_id)
            .filter(store_product::Column::DeletedAt.is_null())
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Store product {} not found", store_product_id))
            })
    }
}

fn store_product_filter(
    select: Select<StoreProduct>,
    filters: &ResolvedFilters,
) -> Select<StoreProduct> {
    let mut select = select;
    if let Some(store_id) = filters.get("store_id").and_then(|v| v.parse::<Uuid>().ok()) {
        select = select.filter(store_product::Column::StoreId.eq(store_id));
    }
    if let Some(product_id) = filters
        .get("product_id")
        .and_then(|v| v.parse::<Uuid>().ok())
    {
        select = select.filter(store_product::Column::ProductId.eq(product_id));
    }
    if let Some(confirmed) = filters.get_bool("confirmed") {
        select = select.filter(store_product::Column::AdminConfirmed.eq(confirmed));
    }
    if filters.get_bool("in_stock") == Some(true) {
        select = select.filter(store_product::Column::WarehouseCount.gt(0));
    }
    if let Some(min) = filters.get_i64("min_price") {
        select = select.filter(store_product::Column::StorePrice.gte(min));
    }
    if let Some(max) = filters.get_i64("max_price") {
        select = select.filter(store_product::Column::StorePrice.lte(max));
    }
    select
}

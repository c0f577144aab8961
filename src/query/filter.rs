use std::collections::HashMap;

use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder,
    Select,
};
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

const DEFAULT_LIMIT: u64 = 20;
/// Hard cap applied to client-provided limits at the boundary.
pub const MAX_LIMIT: u64 = 50;

/// Page size bounds, sourced from deployment configuration. Config validation
/// keeps `max` at or under [`MAX_LIMIT`].
#[derive(Debug, Clone, Copy)]
pub struct PageLimits {
    pub default: u64,
    pub max: u64,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default: DEFAULT_LIMIT,
            max: MAX_LIMIT,
        }
    }
}

/// Entities listable through the filter engine expose their soft-delete and
/// creation-time columns.
pub trait Filterable: EntityTrait {
    fn deleted_at_column() -> Self::Column;
    fn created_at_column() -> Self::Column;
}

/// Soft-delete visibility selector, driven by the `state` query key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListState {
    /// Exclude soft-deleted rows (implicit default of the data source).
    #[default]
    Active,
    /// Include soft-deleted rows.
    All,
    /// Only soft-deleted rows.
    Trashed,
}

impl ListState {
    fn parse(value: Option<&str>) -> Self {
        match value {
            Some("all") => ListState::All,
            Some("trashed") => ListState::Trashed,
            // Unrecognized values fall back to the default, like any other
            // unrecognized query input.
            _ => ListState::Active,
        }
    }
}

/// Ordering directive resolved from the `order` query key and the caller's
/// declared default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirective {
    Asc,
    Desc,
    /// No ordering applied; used by callers whose filter function already
    /// imposed a custom sort.
    Skip,
}

/// Raw key/value query parameters as received at the boundary.
///
/// Unrecognized keys are carried but ignored; recognized keys absent from the
/// input fall back to the caller's declared defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery(pub HashMap<String, String>);

impl ListQuery {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// 1-based page, defaulting to 1. Zero and garbage parse as 1.
    pub fn page(&self) -> u64 {
        self.get("page")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1)
    }

    /// Page size under the configured bounds: absent or garbage input falls
    /// back to the default, oversized input is clamped to the maximum.
    pub fn limit(&self, limits: PageLimits) -> u64 {
        self.get("limit")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|l| *l >= 1)
            .unwrap_or(limits.default)
            .min(limits.max)
    }

    pub fn state(&self) -> ListState {
        ListState::parse(self.get("state"))
    }

    fn order(&self, default: OrderDirective) -> OrderDirective {
        match self.get("order") {
            Some("asc") => OrderDirective::Asc,
            Some("desc") => OrderDirective::Desc,
            _ => default,
        }
    }
}

/// A caller's declaration of recognized filter keys and their defaults.
#[derive(Debug, Clone)]
pub struct FilterSpec {
    /// Recognized filter keys with optional default values.
    pub recognized: &'static [(&'static str, Option<&'static str>)],
    /// Ordering applied when the client does not ask for one. `Skip` is for
    /// callers whose filter function sorts on its own.
    pub default_order: OrderDirective,
}

impl FilterSpec {
    pub const fn new(recognized: &'static [(&'static str, Option<&'static str>)]) -> Self {
        Self {
            recognized,
            default_order: OrderDirective::Desc,
        }
    }

    pub const fn with_order(mut self, order: OrderDirective) -> Self {
        self.default_order = order;
        self
    }

    /// Resolves the raw query against the recognized keys: present keys win,
    /// absent keys take their declared default, everything else is dropped.
    pub fn resolve(&self, query: &ListQuery) -> ResolvedFilters {
        let mut values = HashMap::new();
        for (key, default) in self.recognized {
            if let Some(value) = query.get(key) {
                values.insert((*key).to_string(), value.to_string());
            } else if let Some(default) = default {
                values.insert((*key).to_string(), (*default).to_string());
            }
        }
        ResolvedFilters(values)
    }
}

/// Recognized filter keys after default resolution, handed to filter functions.
#[derive(Debug, Clone, Default)]
pub struct ResolvedFilters(HashMap<String, String>);

impl ResolvedFilters {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| match v {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        })
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.parse().ok())
    }
}

/// Record counts for the returned page.
#[derive(Debug, Clone, Serialize)]
pub struct PageCount {
    /// Records in this page.
    pub current: u64,
    /// Records matching the filters across all pages.
    pub total: u64,
    pub limit: u64,
}

/// Page links.
#[derive(Debug, Clone, Serialize)]
pub struct PageLinks {
    pub current: u64,
    /// `ceil(total / limit)`; zero when nothing matched.
    pub last: u64,
}

/// One page of filtered records plus metadata.
#[derive(Debug, Clone, Serialize)]
pub struct FilteredPage<T> {
    pub data: Vec<T>,
    pub count: PageCount,
    pub pagination: PageLinks,
}

impl<T> FilteredPage<T> {
    /// Maps the records while keeping the metadata, for role-scoped
    /// projections.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> FilteredPage<U> {
        FilteredPage {
            data: self.data.into_iter().map(f).collect(),
            count: self.count,
            pagination: self.pagination,
        }
    }
}

pub(crate) fn last_page(total: u64, limit: u64) -> u64 {
    total.div_ceil(limit)
}

/// Runs a filtered, paginated query.
///
/// The filter function receives a clone of the partially-built select and the
/// resolved filter values; it must return a new select rather than relying on
/// shared state. The total is a COUNT over the filtered query (identical
/// semantics to materializing and counting, without the O(n) transfer).
pub async fn run_filtered<E, C, F>(
    db: &C,
    base: Select<E>,
    query: &ListQuery,
    spec: &FilterSpec,
    limits: PageLimits,
    filter_fn: Option<F>,
) -> Result<FilteredPage<E::Model>, ServiceError>
where
    E: Filterable,
    C: ConnectionTrait,
    F: Fn(Select<E>, &ResolvedFilters) -> Select<E>,
    E::Model: Send + Sync,
{
    let mut select = base;

    select = match query.state() {
        ListState::Active => select.filter(E::deleted_at_column().is_null()),
        ListState::Trashed => select.filter(E::deleted_at_column().is_not_null()),
        ListState::All => select,
    };

    let resolved = spec.resolve(query);
    if let Some(f) = &filter_fn {
        select = f(select.clone(), &resolved);
    }

    select = match query.order(spec.default_order) {
        OrderDirective::Asc => select.order_by(E::created_at_column(), Order::Asc),
        OrderDirective::Desc => select.order_by(E::created_at_column(), Order::Desc),
        OrderDirective::Skip => select,
    };

    let limit = query.limit(limits);
    let page = query.page();

    let total = select.clone().count(db).await?;
    let data = select.paginate(db, limit).fetch_page(page - 1).await?;

    Ok(FilteredPage {
        count: PageCount {
            current: data.len() as u64,
            total,
            limit,
        },
        pagination: PageLinks {
            current: page,
            last: last_page(total, limit),
        },
        data,
    })
}

// Filterable implementations for the soft-deletable entities.

impl Filterable for crate::entities::invoice::Entity {
    fn deleted_at_column() -> Self::Column {
        crate::entities::invoice::Column::DeletedAt
    }
    fn created_at_column() -> Self::Column {
        crate::entities::invoice::Column::CreatedAt
    }
}

impl Filterable for crate::entities::factor::Entity {
    fn deleted_at_column() -> Self::Column {
        crate::entities::factor::Column::DeletedAt
    }
    fn created_at_column() -> Self::Column {
        crate::entities::factor::Column::CreatedAt
    }
}

impl Filterable for crate::entities::store_product::Entity {
    fn deleted_at_column() -> Self::Column {
        crate::entities::store_product::Column::DeletedAt
    }
    fn created_at_column() -> Self::Column {
        crate::entities::store_product::Column::CreatedAt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> ListQuery {
        ListQuery(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn last_page_is_ceiling() {
        assert_eq!(last_page(45, 20), 3);
        assert_eq!(last_page(40, 20), 2);
        assert_eq!(last_page(41, 20), 3);
        assert_eq!(last_page(0, 20), 0);
        assert_eq!(last_page(1, 20), 1);
    }

    #[test]
    fn page_defaults_and_clamps() {
        assert_eq!(query(&[]).page(), 1);
        assert_eq!(query(&[("page", "0")]).page(), 1);
        assert_eq!(query(&[("page", "junk")]).page(), 1);
        assert_eq!(query(&[("page", "7")]).page(), 7);
    }

    #[test]
    fn limit_defaults_and_caps_at_fifty() {
        let limits = PageLimits::default();
        assert_eq!(query(&[]).limit(limits), 20);
        assert_eq!(query(&[("limit", "10")]).limit(limits), 10);
        assert_eq!(query(&[("limit", "500")]).limit(limits), 50);
        assert_eq!(query(&[("limit", "0")]).limit(limits), 20);
    }

    #[test]
    fn limit_respects_configured_bounds() {
        let limits = PageLimits {
            default: 10,
            max: 15,
        };
        assert_eq!(query(&[]).limit(limits), 10);
        assert_eq!(query(&[("limit", "12")]).limit(limits), 12);
        assert_eq!(query(&[("limit", "500")]).limit(limits), 15);
    }

    #[test]
    fn state_parsing_falls_back_to_active() {
        assert_eq!(query(&[]).state(), ListState::Active);
        assert_eq!(query(&[("state", "all")]).state(), ListState::All);
        assert_eq!(query(&[("state", "trashed")]).state(), ListState::Trashed);
        assert_eq!(query(&[("state", "bogus")]).state(), ListState::Active);
    }

    #[test]
    fn resolve_applies_defaults_and_drops_unrecognized() {
        const SPEC: FilterSpec =
            FilterSpec::new(&[("store_id", None), ("confirmed", Some("true"))]);

        let resolved = SPEC.resolve(&query(&[("store_id", "abc"), ("noise", "1")]));
        assert_eq!(resolved.get("store_id"), Some("abc"));
        assert_eq!(resolved.get_bool("confirmed"), Some(true));
        assert_eq!(resolved.get("noise"), None);
    }

    #[test]
    fn client_order_overrides_default() {
        let q = query(&[("order", "asc")]);
        assert_eq!(q.order(OrderDirective::Desc), OrderDirective::Asc);
        assert_eq!(query(&[]).order(OrderDirective::Skip), OrderDirective::Skip);
    }
}

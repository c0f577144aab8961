//! Generic filtered-search and pagination engine.
//!
//! Every list endpoint funnels through [`filter::run_filtered`]: raw query
//! parameters in, a page of records plus count/pagination metadata out.

pub mod filter;

pub use filter::{
    run_filtered, FilterSpec, Filterable, FilteredPage, ListQuery, ListState, OrderDirective,
    PageCount, PageLimits, PageLinks, ResolvedFilters,
};

pub mod catalog;
pub use catalog::{CatalogError, CatalogFetcher, CatalogPage, CatalogSource, FetchOutcome};

pub mod debounce;
pub use debounce::Debouncer;

pub mod filters;
pub use filters::{FilterState, ScoreRange};

pub mod sorting;
pub use sorting::{SortConfig, SortField};

pub mod table;
pub use table::CatalogTable;

#[cfg(test)]
pub(crate) mod testing;

//! Change notifications published by the catalog table.
//!
//! Subscribers (a renderer, a logger) receive these over a broadcast channel
//! and re-derive the visible rows. Every event is sent after the state it
//! describes is already consistent.

use serde::Serialize;

use super::SortOrder;
use crate::services::sorting::SortField;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum TableEvent {
    LoadingChanged {
        loading: bool,
    },

    /// Page 1 arrived and replaced the accumulated list.
    RecordsReplaced {
        count: usize,
        has_more: bool,
    },

    RecordsAppended {
        page: u32,
        count: usize,
        has_more: bool,
    },

    FetchFailed {
        page: u32,
        message: String,
    },

    FiltersChanged,

    SortChanged {
        field: SortField,
        order: SortOrder,
    },

    GenresLoaded {
        count: usize,
    },
}

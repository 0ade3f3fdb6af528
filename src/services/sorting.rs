//! Sort projection over fetched records.
//!
//! Missing or unparseable keys compare lower than any present value, so they
//! lead an ascending sort and trail a descending one.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::SortOrder;
use crate::models::anime::AnimeRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    AiredFrom,
    Episodes,
    Score,
}

impl SortField {
    fn compare(self, a: &AnimeRecord, b: &AnimeRecord) -> Ordering {
        match self {
            // Option orders None first, which is the "lowest value" rule.
            Self::AiredFrom => a.aired.start().cmp(&b.aired.start()),
            Self::Episodes => a.episodes.cmp(&b.episodes),
            Self::Score => match (a.score, b.score) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AiredFrom => "air-date",
            Self::Episodes => "episodes",
            Self::Score => "score",
        })
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "air-date" | "aired" | "aired_from" | "date" => Ok(Self::AiredFrom),
            "episodes" | "eps" => Ok(Self::Episodes),
            "score" => Ok(Self::Score),
            other => Err(format!("unknown sort field: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortConfig {
    pub field: SortField,
    pub order: SortOrder,
}

impl SortConfig {
    #[must_use]
    pub const fn new(field: SortField, order: SortOrder) -> Self {
        Self { field, order }
    }

    /// Header click: the active field flips direction, a new field starts
    /// ascending.
    #[must_use]
    pub fn toggled(self, field: SortField) -> Self {
        let order = if self.field == field {
            self.order.flipped()
        } else {
            SortOrder::Ascending
        };
        Self { field, order }
    }

    /// Stable sort of a copy of `records`; ties keep their input order in
    /// both directions.
    #[must_use]
    pub fn project(&self, records: &[AnimeRecord]) -> Vec<AnimeRecord> {
        let mut sorted = records.to_vec();
        match self.order {
            SortOrder::Ascending => sorted.sort_by(|a, b| self.field.compare(a, b)),
            SortOrder::Descending => sorted.sort_by(|a, b| self.field.compare(b, a)),
        }
        sorted
    }
}

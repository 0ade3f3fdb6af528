//! Client-side filter state.
//!
//! A [`FilterState`] is an immutable snapshot. Mutators return a new snapshot
//! and leave the old one untouched, so a renderer holding a previous snapshot
//! never sees a half-applied change.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::constants::score;
use crate::domain::GenreId;
use crate::models::anime::{AnimeRecord, AnimeType};

/// Inclusive score bounds. Always satisfies `0 <= min <= max <= 10`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreRange {
    min: f64,
    max: f64,
}

impl Default for ScoreRange {
    fn default() -> Self {
        Self {
            min: score::MIN,
            max: score::MAX,
        }
    }
}

impl ScoreRange {
    /// Builds a range, clamping out-of-range bounds instead of rejecting them.
    ///
    /// NaN falls back to the bound's default and crossed bounds are swapped.
    #[must_use]
    pub fn new(min: f64, max: f64) -> Self {
        let clamp = |v: f64, fallback: f64| {
            if v.is_nan() {
                fallback
            } else {
                v.clamp(score::MIN, score::MAX)
            }
        };

        let min = clamp(min, score::MIN);
        let max = clamp(max, score::MAX);

        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    #[must_use]
    pub const fn min(&self) -> f64 {
        self.min
    }

    #[must_use]
    pub const fn max(&self) -> f64 {
        self.max
    }

    /// True once the range is narrower than the full 0–10 span.
    #[must_use]
    pub fn is_narrowed(&self) -> bool {
        self.min > score::MIN || self.max < score::MAX
    }

    /// An unknown score cannot be shown to satisfy a narrowed range.
    #[must_use]
    pub fn admits(&self, value: Option<f64>) -> bool {
        match value {
            Some(v) => v >= self.min && v <= self.max,
            None => !self.is_narrowed(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    types: BTreeSet<AnimeType>,
    genres: BTreeSet<GenreId>,
    score: ScoreRange,
    search: String,
}

impl FilterState {
    #[must_use]
    pub const fn types(&self) -> &BTreeSet<AnimeType> {
        &self.types
    }

    #[must_use]
    pub const fn genres(&self) -> &BTreeSet<GenreId> {
        &self.genres
    }

    #[must_use]
    pub const fn score(&self) -> ScoreRange {
        self.score
    }

    #[must_use]
    pub fn search(&self) -> &str {
        &self.search
    }

    #[must_use]
    pub fn toggle_type(&self, anime_type: AnimeType) -> Self {
        let mut next = self.clone();
        if !next.types.remove(&anime_type) {
            next.types.insert(anime_type);
        }
        next
    }

    #[must_use]
    pub fn toggle_genre(&self, genre: GenreId) -> Self {
        let mut next = self.clone();
        if !next.genres.remove(&genre) {
            next.genres.insert(genre);
        }
        next
    }

    #[must_use]
    pub fn with_score_range(&self, min: f64, max: f64) -> Self {
        Self {
            score: ScoreRange::new(min, max),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_search_text(&self, text: &str) -> Self {
        Self {
            search: text.trim().to_string(),
            ..self.clone()
        }
    }

    /// True when no predicate restricts the record set.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self == &Self::default()
    }

    /// AND of the type, genre and score predicates.
    ///
    /// Search text is not checked here: it is a server-side query and the
    /// fetched records already reflect it.
    #[must_use]
    pub fn matches(&self, record: &AnimeRecord) -> bool {
        let type_ok = self.types.is_empty()
            || record
                .anime_type
                .is_some_and(|t| self.types.contains(&t));

        let genre_ok =
            self.genres.is_empty() || record.genre_ids().any(|id| self.genres.contains(&id));

        type_ok && genre_ok && self.score.admits(record.score)
    }

    /// Records passing [`FilterState::matches`], in input order.
    #[must_use]
    pub fn apply(&self, records: &[AnimeRecord]) -> Vec<AnimeRecord> {
        records
            .iter()
            .filter(|r| self.matches(r))
            .cloned()
            .collect()
    }
}

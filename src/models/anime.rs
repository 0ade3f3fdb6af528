use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::{AnimeId, GenreId};

/// Media format of a catalog entry as reported by Jikan's `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnimeType {
    #[serde(rename = "TV")]
    Tv,
    Movie,
    #[serde(rename = "OVA")]
    Ova,
    #[serde(rename = "TV Special")]
    TvSpecial,
    #[serde(rename = "ONA")]
    Ona,
    Music,
    #[serde(rename = "CM")]
    Cm,
    #[serde(rename = "PV")]
    Pv,
}

impl AnimeType {
    /// Every type, in the order the type toggles are shown.
    pub const ALL: [Self; 8] = [
        Self::Tv,
        Self::Movie,
        Self::Ova,
        Self::TvSpecial,
        Self::Ona,
        Self::Music,
        Self::Cm,
        Self::Pv,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Tv => "TV",
            Self::Movie => "Movie",
            Self::Ova => "OVA",
            Self::TvSpecial => "TV Special",
            Self::Ona => "ONA",
            Self::Music => "Music",
            Self::Cm => "CM",
            Self::Pv => "PV",
        }
    }
}

impl fmt::Display for AnimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown anime type: {0}")]
pub struct UnknownAnimeType(pub String);

impl FromStr for AnimeType {
    type Err = UnknownAnimeType;

    /// Case-insensitive; accepts the display form and a dashed CLI form
    /// (`tv-special`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace(['-', '_'], " ");
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| UnknownAnimeType(s.to_string()))
    }
}

/// Genre reference carried by a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreRef {
    pub id: GenreId,
    pub name: String,
}

/// Raw air-date range. Jikan sends ISO-8601 strings that may be null; they
/// are kept verbatim and parsed on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiredRange {
    pub from: Option<String>,
    pub to: Option<String>,
}

impl AiredRange {
    #[must_use]
    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.from.as_deref().and_then(parse_air_date)
    }

    #[must_use]
    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.to.as_deref().and_then(parse_air_date)
    }
}

/// Parses an air date. Accepts RFC 3339 timestamps (what Jikan returns) and
/// bare `YYYY-MM-DD` dates; anything else is `None`.
#[must_use]
pub fn parse_air_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// One catalog entry. Immutable once received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimeRecord {
    pub id: AnimeId,
    pub title: String,
    pub anime_type: Option<AnimeType>,
    pub genres: Vec<GenreRef>,
    pub aired: AiredRange,
    pub episodes: Option<u32>,
    pub score: Option<f64>,
}

impl AnimeRecord {
    pub fn genre_ids(&self) -> impl Iterator<Item = GenreId> + '_ {
        self.genres.iter().map(|g| g.id)
    }

    #[must_use]
    pub fn genre_names(&self) -> String {
        self.genres
            .iter()
            .map(|g| g.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Entry of the genre reference set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: GenreId,
    pub name: String,
}

/// Read-only genre list, pulled once per session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenreCatalog {
    genres: Vec<Genre>,
}

impl GenreCatalog {
    #[must_use]
    pub const fn new(genres: Vec<Genre>) -> Self {
        Self { genres }
    }

    #[must_use]
    pub fn all(&self) -> &[Genre] {
        &self.genres
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.genres.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.genres.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: GenreId) -> Option<&Genre> {
        self.genres.iter().find(|g| g.id == id)
    }

    /// Genres whose name contains `text`, ignoring case. Backs the text box
    /// above the genre multi-select.
    #[must_use]
    pub fn matching(&self, text: &str) -> Vec<&Genre> {
        let needle = text.trim().to_lowercase();
        self.genres
            .iter()
            .filter(|g| needle.is_empty() || g.name.to_lowercase().contains(&needle))
            .collect()
    }
}

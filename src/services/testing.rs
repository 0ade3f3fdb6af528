//! In-memory catalog source for unit tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::domain::{AnimeId, GenreId};
use crate::models::anime::{AiredRange, AnimeRecord, AnimeType, Genre, GenreRef};
use crate::services::catalog::{CatalogError, CatalogPage, CatalogSource};

pub const RECORDS_PER_PAGE: u32 = 2;

/// Serves `total_pages` pages of two records each. Page `p` holds ids
/// `p*100 + 1` and `p*100 + 2`; titles start with the search text.
///
/// A gated source blocks every fetch until [`ScriptedSource::release`] hands
/// out a permit, which lets tests hold a request in flight.
pub struct ScriptedSource {
    total_pages: u32,
    gate: Semaphore,
    calls: Mutex<Vec<(u32, String)>>,
    failing_pages: Mutex<HashSet<u32>>,
    genres: Option<Vec<Genre>>,
}

impl ScriptedSource {
    pub fn new(total_pages: u32) -> Self {
        Self::with_permits(total_pages, Semaphore::MAX_PERMITS)
    }

    pub fn gated(total_pages: u32) -> Self {
        Self::with_permits(total_pages, 0)
    }

    fn with_permits(total_pages: u32, permits: usize) -> Self {
        Self {
            total_pages,
            gate: Semaphore::new(permits),
            calls: Mutex::new(Vec::new()),
            failing_pages: Mutex::new(HashSet::new()),
            genres: Some(vec![
                Genre { id: GenreId::new(1), name: "Action".to_string() },
                Genre { id: GenreId::new(4), name: "Comedy".to_string() },
                Genre { id: GenreId::new(8), name: "Drama".to_string() },
            ]),
        }
    }

    pub fn without_genres(mut self) -> Self {
        self.genres = None;
        self
    }

    pub fn release(&self, fetches: usize) {
        self.gate.add_permits(fetches);
    }

    pub fn fail_page(&self, page: u32) {
        self.failing_pages.lock().unwrap().insert(page);
    }

    pub fn clear_failures(&self) {
        self.failing_pages.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<(u32, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

pub fn record(id: i32, title: &str) -> AnimeRecord {
    AnimeRecord {
        id: AnimeId::new(id),
        title: title.to_string(),
        anime_type: Some(AnimeType::Tv),
        genres: Vec::new(),
        aired: AiredRange::default(),
        episodes: None,
        score: None,
    }
}

fn scripted_record(page: u32, slot: u32, search: &str) -> AnimeRecord {
    let id = i32::try_from(page * 100 + slot).unwrap();
    let title = if search.is_empty() {
        format!("Anime {id}")
    } else {
        format!("{search} {id}")
    };

    AnimeRecord {
        anime_type: Some(if slot % 2 == 1 { AnimeType::Tv } else { AnimeType::Movie }),
        genres: vec![GenreRef {
            id: GenreId::new(if slot % 2 == 1 { 1 } else { 4 }),
            name: if slot % 2 == 1 { "Action" } else { "Comedy" }.to_string(),
        }],
        episodes: Some(slot * 12),
        score: Some(f64::from(page) + f64::from(slot) / 10.0),
        ..record(id, &title)
    }
}

#[async_trait]
impl CatalogSource for ScriptedSource {
    async fn fetch_page(&self, page: u32, search: &str) -> Result<CatalogPage, CatalogError> {
        self.calls.lock().unwrap().push((page, search.to_string()));

        self.gate
            .acquire()
            .await
            .map_err(|e| CatalogError::network(e.to_string()))?
            .forget();

        if self.failing_pages.lock().unwrap().contains(&page) {
            return Err(CatalogError::network("503 Service Unavailable"));
        }

        if page > self.total_pages {
            return Ok(CatalogPage::default());
        }

        Ok(CatalogPage {
            records: (1..=RECORDS_PER_PAGE)
                .map(|slot| scripted_record(page, slot, search))
                .collect(),
            has_more: page < self.total_pages,
        })
    }

    async fn fetch_genres(&self) -> Result<Vec<Genre>, CatalogError> {
        self.genres
            .clone()
            .ok_or_else(|| CatalogError::malformed("missing field `data`"))
    }
}

/// Lets spawned tasks run until they block.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

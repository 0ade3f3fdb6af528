//! The catalog table: fetcher, filters and sort wired together.
//!
//! A renderer holds a [`CatalogTable`], subscribes to its [`TableEvent`]
//! stream and calls [`CatalogTable::visible_records`] whenever an event
//! arrives. Every mutation sends exactly one event after the new state is in
//! place.

use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::TableConfig;
use crate::domain::GenreId;
use crate::domain::events::TableEvent;
use crate::models::anime::{AnimeRecord, AnimeType, Genre, GenreCatalog};
use crate::services::catalog::{CatalogError, CatalogFetcher, CatalogSource, FetchOutcome};
use crate::services::debounce::Debouncer;
use crate::services::filters::FilterState;
use crate::services::sorting::{SortConfig, SortField};

struct TableInner {
    source: Arc<dyn CatalogSource>,
    fetcher: CatalogFetcher,
    filters: RwLock<FilterState>,
    sort: Mutex<SortConfig>,
    genres: RwLock<GenreCatalog>,
    last_error: Mutex<Option<String>>,
    search_debounce: Debouncer,
    score_debounce: Debouncer,
    prefetch_threshold: usize,
    events: broadcast::Sender<TableEvent>,
}

#[derive(Clone)]
pub struct CatalogTable {
    inner: Arc<TableInner>,
}

impl CatalogTable {
    #[must_use]
    pub fn new(source: Arc<dyn CatalogSource>, config: &TableConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_buffer_size.max(1));
        let fetcher = CatalogFetcher::new(source.clone(), events.clone());

        Self {
            inner: Arc::new(TableInner {
                source,
                fetcher,
                filters: RwLock::new(FilterState::default()),
                sort: Mutex::new(SortConfig::default()),
                genres: RwLock::new(GenreCatalog::default()),
                last_error: Mutex::new(None),
                search_debounce: Debouncer::new(
                    "search",
                    Duration::from_millis(config.search_debounce_ms),
                ),
                score_debounce: Debouncer::new(
                    "score",
                    Duration::from_millis(config.score_debounce_ms),
                ),
                prefetch_threshold: config.prefetch_threshold,
                events,
            }),
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TableEvent> {
        self.inner.events.subscribe()
    }

    fn emit(&self, event: TableEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }

    /// Session start: pulls the genre list and the first page.
    pub async fn start(&self) -> Result<FetchOutcome, CatalogError> {
        let (genres, first_page) = tokio::join!(self.load_genres(), async {
            let search = self.filters().search().to_string();
            self.track(self.inner.fetcher.restart(&search).await)
        });

        debug!(genres, "Catalog table started");
        first_page
    }

    /// Fetches the genre reference list once. A failure leaves the list empty
    /// and is only logged.
    pub async fn load_genres(&self) -> usize {
        match self.inner.source.fetch_genres().await {
            Ok(genres) => {
                let count = genres.len();
                *self
                    .inner
                    .genres
                    .write()
                    .unwrap_or_else(PoisonError::into_inner) = GenreCatalog::new(genres);
                info!(count, "Loaded genre list");
                self.emit(TableEvent::GenresLoaded { count });
                count
            }
            Err(e) => {
                warn!(error = %e, "Error fetching genres");
                0
            }
        }
    }

    #[must_use]
    pub fn genres(&self) -> GenreCatalog {
        self.inner
            .genres
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Genres shown under the genre selector's text box.
    #[must_use]
    pub fn genres_matching(&self, text: &str) -> Vec<Genre> {
        self.inner
            .genres
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .matching(text)
            .into_iter()
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn filters(&self) -> FilterState {
        self.inner
            .filters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn sort(&self) -> SortConfig {
        *self.inner.sort.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update_filters(&self, f: impl FnOnce(&FilterState) -> FilterState) -> FilterState {
        let previous = {
            let mut filters = self
                .inner
                .filters
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let next = f(&filters);
            std::mem::replace(&mut *filters, next)
        };
        self.emit(TableEvent::FiltersChanged);
        previous
    }

    /// Client-side only; never fetches.
    pub fn toggle_type(&self, anime_type: AnimeType) {
        self.update_filters(|f| f.toggle_type(anime_type));
    }

    /// Client-side only; never fetches.
    pub fn toggle_genre(&self, genre: GenreId) {
        self.update_filters(|f| f.toggle_genre(genre));
    }

    /// Slider input. Commits after the score quiescence window.
    pub fn set_score_range(&self, min: f64, max: f64) {
        let table = self.clone();
        self.inner.score_debounce.schedule(async move {
            table.commit_score_range(min, max);
        });
    }

    /// Applies a score range immediately. Client-side only; never fetches.
    pub fn commit_score_range(&self, min: f64, max: f64) {
        self.update_filters(|f| f.with_score_range(min, max));
    }

    /// Search box input. Commits after the search quiescence window; only the
    /// last text typed inside the window reaches the server.
    pub fn set_search_text(&self, text: &str) {
        let table = self.clone();
        let text = text.to_string();
        self.inner.search_debounce.schedule(async move {
            if let Err(e) = table.commit_search(&text).await {
                debug!(error = %e, "Debounced search fetch failed");
            }
        });
    }

    /// Applies search text immediately and restarts pagination at page 1.
    ///
    /// Text equal to the current search (after trimming) is a no-op.
    pub async fn commit_search(&self, text: &str) -> Result<FetchOutcome, CatalogError> {
        let current = self.filters();
        let next = current.with_search_text(text);
        if next.search() == current.search() {
            debug!(search = %next.search(), "Search unchanged");
            return Ok(FetchOutcome::Skipped);
        }

        let search = next.search().to_string();
        self.update_filters(|_| next);
        self.track(self.inner.fetcher.restart(&search).await)
    }

    /// Back to the default filters. Pending debounced input is dropped.
    /// Pagination restarts only if a search had been active.
    pub async fn reset_filters(&self) -> Result<FetchOutcome, CatalogError> {
        self.inner.search_debounce.cancel();
        self.inner.score_debounce.cancel();

        let previous = self.update_filters(|_| FilterState::default());
        if previous.search().is_empty() {
            return Ok(FetchOutcome::Skipped);
        }

        self.track(self.inner.fetcher.restart("").await)
    }

    /// Column header click.
    pub fn sort_by(&self, field: SortField) -> SortConfig {
        let next = {
            let mut sort = self.inner.sort.lock().unwrap_or_else(PoisonError::into_inner);
            *sort = sort.toggled(field);
            *sort
        };
        self.emit(TableEvent::SortChanged {
            field: next.field,
            order: next.order,
        });
        next
    }

    /// "Load more" button.
    pub async fn request_next_page(&self) -> Result<FetchOutcome, CatalogError> {
        self.track(self.inner.fetcher.request_next_page().await)
    }

    /// Scroll observer hook: the row at `index` of the visible list came into
    /// view. Loads the next page once the row is within the prefetch
    /// threshold of the end.
    pub async fn row_visible(&self, index: usize) -> Result<FetchOutcome, CatalogError> {
        let visible = self.visible_records().len();
        if index.saturating_add(self.inner.prefetch_threshold) < visible {
            return Ok(FetchOutcome::Skipped);
        }
        self.request_next_page().await
    }

    /// `sort(filter(accumulated))`.
    #[must_use]
    pub fn visible_records(&self) -> Vec<AnimeRecord> {
        let filters = self.filters();
        let sort = self.sort();
        self.inner
            .fetcher
            .with_records(|records| sort.project(&filters.apply(records)))
    }

    #[must_use]
    pub fn loaded_count(&self) -> usize {
        self.inner.fetcher.with_records(<[AnimeRecord]>::len)
    }

    #[must_use]
    pub fn loading(&self) -> bool {
        self.inner.fetcher.is_loading()
    }

    #[must_use]
    pub fn has_more(&self) -> bool {
        self.inner.fetcher.has_more()
    }

    #[must_use]
    pub fn page(&self) -> u32 {
        self.inner.fetcher.page()
    }

    /// Message of the most recent failed fetch, cleared by the next
    /// successful one. Backs an optional error banner.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.inner
            .last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn track(
        &self,
        result: Result<FetchOutcome, CatalogError>,
    ) -> Result<FetchOutcome, CatalogError> {
        let mut last_error = self
            .inner
            .last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match &result {
            Ok(FetchOutcome::Loaded { .. }) => *last_error = None,
            Ok(_) => {}
            Err(e) => *last_error = Some(e.to_string()),
        }
        result
    }
}

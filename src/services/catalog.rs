//! Catalog fetcher: the paginated, accumulating side of the table.
//!
//! The fetcher owns the accumulated record list and the pagination cursor.
//! Nothing else writes to them. Fetches are tagged with a generation number
//! so a response that lands after a restart is dropped instead of being
//! merged into the new result set.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

use crate::domain::events::TableEvent;
use crate::models::anime::{AnimeRecord, Genre};

/// Errors produced while talking to the catalog source.
///
/// Both kinds are handled the same way by the fetcher: logged, loading
/// cleared, accumulated state left untouched.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The request could not complete or came back with a non-success status.
    #[error("Catalog request failed: {0}")]
    Network(String),

    /// The body lacked the record list or pagination metadata, or was not
    /// decodable at all.
    #[error("Malformed catalog response: {0}")]
    MalformedResponse(String),
}

impl CatalogError {
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// One page of records plus the server's "more pages exist" flag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogPage {
    pub records: Vec<AnimeRecord>,
    pub has_more: bool,
}

/// Remote source of catalog pages and the genre reference list.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetches one 1-based page. An empty `search` means no title query.
    async fn fetch_page(&self, page: u32, search: &str) -> Result<CatalogPage, CatalogError>;

    async fn fetch_genres(&self) -> Result<Vec<Genre>, CatalogError>;
}

/// Result of a fetch request that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Loaded {
        page: u32,
        count: usize,
        has_more: bool,
    },
    /// Another fetch was in flight, or the server reported no more pages.
    Skipped,
    /// The response belonged to a generation superseded by a restart.
    Discarded,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    generation: u64,
    page: u32,
}

#[derive(Debug)]
struct CatalogState {
    records: Vec<AnimeRecord>,
    /// Cursor. Starts at 1 and only moves forward once a page has landed.
    page: u32,
    /// Whether the page under the cursor has been received.
    page_loaded: bool,
    has_more: bool,
    search: String,
    generation: u64,
    in_flight: Option<InFlight>,
}

impl Default for CatalogState {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            page: 1,
            page_loaded: false,
            has_more: true,
            search: String::new(),
            generation: 0,
            in_flight: None,
        }
    }
}

impl CatalogState {
    const fn next_page(&self) -> u32 {
        if self.page_loaded {
            self.page + 1
        } else {
            self.page
        }
    }
}

struct Ticket {
    generation: u64,
    page: u32,
    search: String,
}

/// Clears the loading flag if the fetch future is dropped before it settles.
struct InFlightGuard {
    state: Arc<Mutex<CatalogState>>,
    events: broadcast::Sender<TableEvent>,
    generation: u64,
    armed: bool,
}

impl InFlightGuard {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state
            .in_flight
            .is_some_and(|f| f.generation == self.generation)
        {
            state.in_flight = None;
            drop(state);
            debug!(generation = self.generation, "Catalog fetch cancelled");
            let _ = self.events.send(TableEvent::LoadingChanged { loading: false });
        }
    }
}

#[derive(Clone)]
pub struct CatalogFetcher {
    source: Arc<dyn CatalogSource>,
    state: Arc<Mutex<CatalogState>>,
    events: broadcast::Sender<TableEvent>,
}

impl CatalogFetcher {
    #[must_use]
    pub fn new(source: Arc<dyn CatalogSource>, events: broadcast::Sender<TableEvent>) -> Self {
        Self {
            source,
            state: Arc::new(Mutex::new(CatalogState::default())),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CatalogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the accumulated records.
    #[must_use]
    pub fn records(&self) -> Vec<AnimeRecord> {
        self.lock().records.clone()
    }

    /// Runs `f` over the accumulated records without copying them.
    pub fn with_records<R>(&self, f: impl FnOnce(&[AnimeRecord]) -> R) -> R {
        f(&self.lock().records)
    }

    #[must_use]
    pub fn page(&self) -> u32 {
        self.lock().page
    }

    #[must_use]
    pub fn has_more(&self) -> bool {
        self.lock().has_more
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.lock().in_flight.is_some()
    }

    #[must_use]
    pub fn search(&self) -> String {
        self.lock().search.clone()
    }

    /// Restarts pagination at page 1 for `search` and fetches it.
    ///
    /// Accumulated records stay visible until page 1 arrives and replaces
    /// them. Any fetch still in flight is superseded and its response will be
    /// discarded.
    pub async fn restart(&self, search: &str) -> Result<FetchOutcome, CatalogError> {
        let ticket = {
            let mut state = self.lock();
            state.generation += 1;
            state.search = search.to_string();
            state.page = 1;
            state.page_loaded = false;
            state.has_more = true;
            self.begin(&mut state, 1)
        };

        info!(search = %ticket.search, "Restarting catalog pagination");
        self.run(ticket).await
    }

    /// Loads the page after the cursor.
    ///
    /// A no-op while another fetch is in flight or once the server has
    /// reported the last page, so repeated triggers from a scroll observer
    /// issue at most one request.
    pub async fn request_next_page(&self) -> Result<FetchOutcome, CatalogError> {
        let ticket = {
            let mut state = self.lock();
            if let Some(in_flight) = state.in_flight {
                debug!(page = in_flight.page, "Fetch already in flight, ignoring request");
                return Ok(FetchOutcome::Skipped);
            }
            if !state.has_more {
                debug!(page = state.page, "No more pages to load");
                return Ok(FetchOutcome::Skipped);
            }
            let page = state.next_page();
            self.begin(&mut state, page)
        };

        self.run(ticket).await
    }

    fn begin(&self, state: &mut CatalogState, page: u32) -> Ticket {
        state.in_flight = Some(InFlight {
            generation: state.generation,
            page,
        });
        let _ = self.events.send(TableEvent::LoadingChanged { loading: true });

        Ticket {
            generation: state.generation,
            page,
            search: state.search.clone(),
        }
    }

    async fn run(&self, ticket: Ticket) -> Result<FetchOutcome, CatalogError> {
        let guard = InFlightGuard {
            state: Arc::clone(&self.state),
            events: self.events.clone(),
            generation: ticket.generation,
            armed: true,
        };

        debug!(page = ticket.page, search = %ticket.search, "Fetching catalog page");
        let result = self.source.fetch_page(ticket.page, &ticket.search).await;

        let mut state = self.lock();
        guard.disarm();

        if state.generation != ticket.generation {
            debug!(
                page = ticket.page,
                generation = ticket.generation,
                current = state.generation,
                "Discarding stale catalog response"
            );
            return Ok(FetchOutcome::Discarded);
        }

        state.in_flight = None;

        match result {
            Ok(CatalogPage { records, has_more }) => {
                let count = records.len();
                if ticket.page == 1 {
                    state.records = records;
                } else {
                    state.records.extend(records);
                }
                state.page = ticket.page;
                state.page_loaded = true;
                state.has_more = has_more;
                let total = state.records.len();
                drop(state);

                debug!(page = ticket.page, count, total, has_more, "Catalog page loaded");
                let event = if ticket.page == 1 {
                    TableEvent::RecordsReplaced { count, has_more }
                } else {
                    TableEvent::RecordsAppended {
                        page: ticket.page,
                        count,
                        has_more,
                    }
                };
                let _ = self.events.send(event);

                Ok(FetchOutcome::Loaded {
                    page: ticket.page,
                    count,
                    has_more,
                })
            }
            Err(e) => {
                drop(state);
                error!(page = ticket.page, error = %e, "Error fetching catalog page");
                let _ = self.events.send(TableEvent::FetchFailed {
                    page: ticket.page,
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }
}

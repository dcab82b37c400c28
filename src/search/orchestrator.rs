use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::db::SearchMetricsRepo;
use crate::tmdb::{LookupError, LookupRequest, Movie, MovieListResponse, MovieLookup};

pub const NO_MOVIES_FOUND: &str = "No movies found";
pub const ERROR_FETCHING_MOVIES: &str = "Error fetching movies";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "error", rename_all = "lowercase")]
pub enum RequestState {
    Idle,
    Loading,
    Success,
    Failed(String),
}

impl RequestState {
    pub fn is_loading(&self) -> bool {
        matches!(self, RequestState::Loading)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestState::Idle => "idle",
            RequestState::Loading => "loading",
            RequestState::Success => "success",
            RequestState::Failed(_) => "failed",
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            RequestState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// What observers of a search see.
#[derive(Debug, Clone)]
pub struct SearchView {
    pub query: String,
    pub state: RequestState,
    /// Replaced wholesale on every applied response.
    pub movies: Arc<Vec<Movie>>,
    pub generation: u64,
}

impl Default for SearchView {
    fn default() -> Self {
        Self {
            query: String::new(),
            state: RequestState::Idle,
            movies: Arc::new(Vec::new()),
            generation: 0,
        }
    }
}

/// Turns settled queries into lookups and lookup outcomes into a [`SearchView`].
///
/// Cycles may overlap. Each one is tagged with a generation number and only
/// the newest generation is allowed to touch the view.
pub struct SearchOrchestrator {
    lookup: Arc<dyn MovieLookup>,
    metrics: Arc<dyn SearchMetricsRepo>,
    view: watch::Sender<SearchView>,
    generation: AtomicU64,
}

impl SearchOrchestrator {
    pub fn new(lookup: Arc<dyn MovieLookup>, metrics: Arc<dyn SearchMetricsRepo>) -> Self {
        let (view, _) = watch::channel(SearchView::default());
        Self {
            lookup,
            metrics,
            view,
            generation: AtomicU64::new(0),
        }
    }

    pub fn view(&self) -> SearchView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchView> {
        self.view.subscribe()
    }

    /// Run one full cycle for `query`.
    pub async fn settle(&self, query: String) {
        let generation = self.begin(&query);
        let request = LookupRequest::for_query(&query);
        let outcome = self.lookup.lookup(&request).await;
        self.complete(generation, &query, outcome);
    }

    fn begin(&self, query: &str) -> u64 {
        // Bumped under the watch lock so generations are published in order.
        let mut generation = 0;
        self.view.send_modify(|view| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            view.query = query.to_string();
            view.state = RequestState::Loading;
            view.generation = generation;
        });
        debug!(query = query, generation = generation, "Lookup started");
        generation
    }

    fn complete(
        &self,
        generation: u64,
        query: &str,
        outcome: Result<MovieListResponse, LookupError>,
    ) {
        let current = self.generation.load(Ordering::SeqCst);
        if generation != current {
            debug!(
                query = query,
                generation = generation,
                current = current,
                "Dropping stale lookup response"
            );
            return;
        }

        let mut first_movie = None;
        self.view.send_if_modified(|view| {
            if view.generation != generation {
                return false;
            }
            match outcome {
                Err(e) => {
                    warn!(query = query, error = %e, "Error fetching movies");
                    view.state = RequestState::Failed(ERROR_FETCHING_MOVIES.to_string());
                }
                Ok(response) if response.is_empty_signal() => {
                    info!(query = query, "No movies found");
                    view.movies = Arc::new(Vec::new());
                    view.state = RequestState::Failed(NO_MOVIES_FOUND.to_string());
                }
                Ok(response) => {
                    info!(query = query, count = response.results.len(), "Fetched movies");
                    first_movie = response.results.first().cloned();
                    view.movies = Arc::new(response.results);
                    view.state = RequestState::Success;
                }
            }
            true
        });

        if query.is_empty() {
            return;
        }
        if let Some(movie) = first_movie {
            self.record_search(query.to_string(), movie);
        }
    }

    /// Detached: the outcome never reaches the view.
    fn record_search(&self, term: String, movie: Movie) {
        let metrics = Arc::clone(&self.metrics);
        tokio::spawn(async move {
            if let Err(e) = metrics.update_search_count(&term, &movie).await {
                warn!(term = %term, error = %e, "Failed to update search count");
            }
        });
    }
}

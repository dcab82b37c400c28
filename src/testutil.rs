//! Scripted collaborators shared by the unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::db::{DbError, DbResult, SearchCount, SearchMetricsRepo};
use crate::tmdb::{LookupError, LookupRequest, Movie, MovieListResponse, MovieLookup};

pub fn movie(id: u64, title: &str) -> Movie {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "title": title,
        "poster_path": format!("/{}.jpg", id),
    }))
    .unwrap()
}

pub fn response(results: Vec<Movie>) -> MovieListResponse {
    MovieListResponse {
        page: 1,
        total_pages: 1,
        total_results: results.len() as u32,
        results,
        response: None,
    }
}

enum Scripted {
    Found(MovieListResponse),
    Status(u16),
}

/// Answers lookups from a script keyed by query; `""` is the discover request.
/// Unscripted queries get an empty result list.
#[derive(Default)]
pub struct MockLookup {
    script: Mutex<HashMap<String, Scripted>>,
    gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    requests: Mutex<Vec<LookupRequest>>,
}

impl MockLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, query: &str, response: MovieListResponse) {
        self.script
            .lock()
            .unwrap()
            .insert(query.to_string(), Scripted::Found(response));
    }

    pub fn fail(&self, query: &str, status: u16) {
        self.script
            .lock()
            .unwrap()
            .insert(query.to_string(), Scripted::Status(status));
    }

    /// Hold the next lookup for `query` until the returned sender fires.
    pub fn gate(&self, query: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(query.to_string(), rx);
        tx
    }

    pub fn requests(&self) -> Vec<LookupRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl MovieLookup for MockLookup {
    async fn lookup(&self, request: &LookupRequest) -> Result<MovieListResponse, LookupError> {
        self.requests.lock().unwrap().push(request.clone());

        let key = match request {
            LookupRequest::Search(query) => query.clone(),
            LookupRequest::Discover => String::new(),
        };

        let gate = self.gates.lock().unwrap().remove(&key);
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        match self.script.lock().unwrap().get(&key) {
            Some(Scripted::Found(response)) => Ok(response.clone()),
            Some(Scripted::Status(status)) => Err(LookupError::Status(*status)),
            None => Ok(response(Vec::new())),
        }
    }
}

#[derive(Default)]
pub struct RecordingMetrics {
    calls: Mutex<Vec<(String, u64)>>,
}

impl RecordingMetrics {
    pub fn calls(&self) -> Vec<(String, u64)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchMetricsRepo for RecordingMetrics {
    async fn update_search_count(&self, term: &str, movie: &Movie) -> DbResult<()> {
        self.calls.lock().unwrap().push((term.to_string(), movie.id));
        Ok(())
    }

    async fn get_search_count(&self, term: &str) -> DbResult<SearchCount> {
        Err(DbError::NotFound(term.to_string()))
    }

    async fn top_searches(&self, _limit: u32) -> DbResult<Vec<SearchCount>> {
        Ok(Vec::new())
    }
}

pub struct FailingMetrics;

#[async_trait]
impl SearchMetricsRepo for FailingMetrics {
    async fn update_search_count(&self, term: &str, _movie: &Movie) -> DbResult<()> {
        Err(DbError::NotFound(term.to_string()))
    }

    async fn get_search_count(&self, term: &str) -> DbResult<SearchCount> {
        Err(DbError::NotFound(term.to_string()))
    }

    async fn top_searches(&self, _limit: u32) -> DbResult<Vec<SearchCount>> {
        Err(DbError::NotFound("searches".to_string()))
    }
}

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use tracing::debug;

use super::types::MovieListResponse;
use crate::config::TmdbConfig;

/// Which list endpoint a lookup goes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupRequest {
    Search(String),
    Discover,
}

impl LookupRequest {
    /// An empty query browses popular movies instead of searching.
    pub fn for_query(query: &str) -> Self {
        if query.is_empty() {
            LookupRequest::Discover
        } else {
            LookupRequest::Search(query.to_string())
        }
    }

    pub fn url(&self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');
        match self {
            LookupRequest::Search(query) => {
                format!("{}/search/movie?query={}", base, urlencoding::encode(query))
            }
            LookupRequest::Discover => format!("{}/discover/movie?sort_by=popularity.desc", base),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Unexpected HTTP status {0}")]
    Status(u16),
    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("API token is not a valid header value")]
    InvalidToken,
}

#[async_trait]
pub trait MovieLookup: Send + Sync {
    async fn lookup(&self, request: &LookupRequest) -> Result<MovieListResponse, LookupError>;
}

pub struct TmdbClient {
    client: reqwest::Client,
    base_url: String,
}

impl TmdbClient {
    pub fn new(config: &TmdbConfig, token: &str) -> Result<Self, LookupError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| LookupError::InvalidToken)?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl MovieLookup for TmdbClient {
    async fn lookup(&self, request: &LookupRequest) -> Result<MovieListResponse, LookupError> {
        let url = request.url(&self.base_url);
        debug!(url = %url, "TMDB lookup");

        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the search analytics table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchCount {
    pub search_term: String,
    pub count: i64,
    pub movie_id: i64,
    pub title: String,
    pub poster_url: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Not found: {0}")]
    NotFound(String),
}

pub type DbResult<T> = Result<T, DbError>;

use async_trait::async_trait;

use super::model::*;
use crate::tmdb::Movie;

#[async_trait]
pub trait SearchMetricsRepo: Send + Sync {
    /// Count one more search for `term`. The first search stores `movie` as
    /// the term's display title and poster.
    async fn update_search_count(&self, term: &str, movie: &Movie) -> DbResult<()>;
    async fn get_search_count(&self, term: &str) -> DbResult<SearchCount>;
    async fn top_searches(&self, limit: u32) -> DbResult<Vec<SearchCount>>;
}

use serde::{Deserialize, Serialize};

use crate::db::SearchCount;
use crate::search::SearchView;
use crate::tmdb::Movie;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieSummary {
    pub id: u64,
    pub title: String,
    pub overview: String,
    #[serde(rename = "posterUrl", skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
    #[serde(rename = "releaseDate", skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(rename = "voteAverage")]
    pub vote_average: f64,
    #[serde(rename = "originalLanguage", skip_serializing_if = "Option::is_none")]
    pub original_language: Option<String>,
}

impl From<&Movie> for MovieSummary {
    fn from(movie: &Movie) -> Self {
        Self {
            id: movie.id,
            title: movie.title.clone(),
            overview: movie.overview.clone(),
            poster_url: movie.poster_url(),
            release_date: movie.release_date.clone().filter(|d| !d.is_empty()),
            year: movie.release_year().map(str::to_string),
            vote_average: movie.vote_average,
            original_language: movie.original_language.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchViewDto {
    pub query: String,
    pub generation: u64,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub loading: bool,
    pub movies: Vec<MovieSummary>,
}

impl From<&SearchView> for SearchViewDto {
    fn from(view: &SearchView) -> Self {
        Self {
            query: view.query.clone(),
            generation: view.generation,
            status: view.state.as_str().to_string(),
            error: view.state.error().map(str::to_string),
            loading: view.state.is_loading(),
            movies: view.movies.iter().map(MovieSummary::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCreated {
    pub id: String,
    pub view: SearchViewDto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryUpdate {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrendingParams {
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendingMovie {
    pub rank: usize,
    #[serde(rename = "searchTerm")]
    pub search_term: String,
    pub count: i64,
    #[serde(rename = "movieId")]
    pub movie_id: i64,
    pub title: String,
    #[serde(rename = "posterUrl", skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
}

impl TrendingMovie {
    pub fn from_row(rank: usize, row: SearchCount) -> Self {
        Self {
            rank,
            search_term: row.search_term,
            count: row.count,
            movie_id: row.movie_id,
            title: row.title,
            poster_url: row.poster_url,
        }
    }
}

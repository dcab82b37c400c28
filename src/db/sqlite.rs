use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use super::model::*;
use super::repo::*;
use crate::tmdb::Movie;

type SearchRow = (
    String,
    i64,
    i64,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
);

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub async fn new(db_path: &str) -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str(db_path)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let repo = Self { pool };
        repo.init_schema().await?;

        info!("Database initialized at {}", db_path);

        Ok(repo)
    }

    /// A private database that lives as long as the repository.
    pub async fn in_memory() -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        // Every connection to :memory: is a separate database, so keep exactly one.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let repo = Self { pool };
        repo.init_schema().await?;
        Ok(repo)
    }

    async fn init_schema(&self) -> DbResult<()> {
        let schema = include_str!("schema.sql");
        sqlx::raw_sql(schema).execute(&self.pool).await?;
        Ok(())
    }
}

fn parse_time(value: Option<String>) -> Option<DateTime<Utc>> {
    value.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    })
}

fn row_to_search_count(r: SearchRow) -> SearchCount {
    SearchCount {
        search_term: r.0,
        count: r.1,
        movie_id: r.2,
        title: r.3,
        poster_url: r.4,
        created: parse_time(r.5),
        updated: parse_time(r.6),
    }
}

#[async_trait]
impl SearchMetricsRepo for SqliteRepository {
    async fn update_search_count(&self, term: &str, movie: &Movie) -> DbResult<()> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO searches (search_term, count, movie_id, title, poster_url, created, updated)
             VALUES (?, 1, ?, ?, ?, ?, ?)
             ON CONFLICT(search_term) DO UPDATE SET count = count + 1, updated = excluded.updated",
        )
        .bind(term)
        .bind(movie.id as i64)
        .bind(&movie.title)
        .bind(movie.poster_url())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        debug!(term = term, movie_id = movie.id, "Updated search count");
        Ok(())
    }

    async fn get_search_count(&self, term: &str) -> DbResult<SearchCount> {
        let row = sqlx::query_as::<_, SearchRow>(
            "SELECT search_term, count, movie_id, title, poster_url, created, updated
             FROM searches WHERE search_term = ?",
        )
        .bind(term)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => DbError::NotFound(format!("Search term not found: {}", term)),
            _ => DbError::Sqlx(e),
        })?;

        Ok(row_to_search_count(row))
    }

    async fn top_searches(&self, limit: u32) -> DbResult<Vec<SearchCount>> {
        let rows = sqlx::query_as::<_, SearchRow>(
            "SELECT search_term, count, movie_id, title, poster_url, created, updated
             FROM searches ORDER BY count DESC, updated DESC, search_term ASC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_search_count).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(id: u64, title: &str) -> Movie {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "title": title,
            "poster_path": format!("/{}.jpg", id),
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_first_search_inserts_row() {
        let db = SqliteRepository::in_memory().await.unwrap();
        db.update_search_count("batman", &movie(268, "Batman")).await.unwrap();

        let row = db.get_search_count("batman").await.unwrap();
        assert_eq!(row.count, 1);
        assert_eq!(row.movie_id, 268);
        assert_eq!(row.title, "Batman");
        assert_eq!(
            row.poster_url.as_deref(),
            Some("https://image.tmdb.org/t/p/w500/268.jpg")
        );
        assert!(row.created.is_some());
    }

    #[tokio::test]
    async fn test_repeat_search_increments_and_keeps_first_movie() {
        let db = SqliteRepository::in_memory().await.unwrap();
        db.update_search_count("batman", &movie(268, "Batman")).await.unwrap();
        db.update_search_count("batman", &movie(414, "Batman Forever")).await.unwrap();
        db.update_search_count("batman", &movie(414, "Batman Forever")).await.unwrap();

        let row = db.get_search_count("batman").await.unwrap();
        assert_eq!(row.count, 3);
        assert_eq!(row.movie_id, 268);
        assert_eq!(row.title, "Batman");
    }

    #[tokio::test]
    async fn test_unknown_term() {
        let db = SqliteRepository::in_memory().await.unwrap();
        assert!(matches!(
            db.get_search_count("nothing").await,
            Err(DbError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_top_searches_ordering_and_limit() {
        let db = SqliteRepository::in_memory().await.unwrap();
        for _ in 0..3 {
            db.update_search_count("alien", &movie(348, "Alien")).await.unwrap();
        }
        db.update_search_count("heat", &movie(949, "Heat")).await.unwrap();
        for _ in 0..2 {
            db.update_search_count("up", &movie(14160, "Up")).await.unwrap();
        }

        let top = db.top_searches(2).await.unwrap();
        let terms: Vec<&str> = top.iter().map(|r| r.search_term.as_str()).collect();
        assert_eq!(terms, vec!["alien", "up"]);
        assert_eq!(top[0].count, 3);

        assert_eq!(db.top_searches(10).await.unwrap().len(), 3);
    }
}

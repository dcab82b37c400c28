use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use super::types::*;
use crate::db::SearchMetricsRepo;
use crate::server::AppState;

const MAX_TRENDING: u32 = 50;

pub async fn create_session(State(state): State<AppState>) -> Response {
    let session = state.sessions.create().await;

    let body = SessionCreated {
        id: session.id().to_string(),
        view: SearchViewDto::from(&session.view()),
    };

    (StatusCode::CREATED, Json(body)).into_response()
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SearchViewDto>, StatusCode> {
    let session = state
        .sessions
        .get(&session_id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(SearchViewDto::from(&session.view())))
}

pub async fn update_query(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(update): Json<QueryUpdate>,
) -> StatusCode {
    match state.sessions.get(&session_id).await {
        Some(session) => {
            session.update_query(update.query);
            StatusCode::ACCEPTED
        }
        None => StatusCode::NOT_FOUND,
    }
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> StatusCode {
    if state.sessions.remove(&session_id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

pub async fn get_trending(
    State(state): State<AppState>,
    Query(params): Query<TrendingParams>,
) -> Result<Json<Vec<TrendingMovie>>, StatusCode> {
    let limit = params
        .limit
        .unwrap_or(state.config.search.trending_limit)
        .clamp(1, MAX_TRENDING);

    let rows = state.db.top_searches(limit).await.map_err(|e| {
        error!("Error fetching trending movies: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let trending = rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| TrendingMovie::from_row(i + 1, row))
        .collect();

    Ok(Json(trending))
}

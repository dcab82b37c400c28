use axum::{
    extract::Request,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::db::SqliteRepository;
use crate::search::SessionRepo;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<SqliteRepository>,
    pub sessions: Arc<SessionRepo>,
}

impl AppState {
    pub fn new(config: Arc<Config>, db: Arc<SqliteRepository>, sessions: Arc<SessionRepo>) -> Self {
        Self {
            config,
            db,
            sessions,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/api/sessions", post(crate::api::create_session))
        .route(
            "/api/sessions/:id",
            get(crate::api::get_session).delete(crate::api::delete_session),
        )
        .route("/api/sessions/:id/query", put(crate::api::update_query))
        .route("/api/trending", get(crate::api::get_trending));

    let mut router = Router::new()
        .route("/robots.txt", get(robots_txt_handler))
        .merge(api_routes)
        .fallback(fallback_handler);

    if let Some(ref appdir) = state.config.appdir {
        // Serves the front-end; OPTIONS preflights are answered by the cors layer.
        router = router.fallback_service(ServeDir::new(appdir));
    }

    router
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(crate::middleware::request_span)
                .on_response(crate::middleware::log_response),
        )
        .with_state(state)
}

/// The router with path normalization in front of route matching.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .fallback_service(build_router(state))
        .layer(axum::middleware::from_fn(crate::middleware::normalize_path))
}

async fn robots_txt_handler() -> &'static str {
    "User-agent: *\nDisallow: /\n"
}

async fn fallback_handler(req: Request<axum::body::Body>) -> impl IntoResponse {
    if req.method() == axum::http::Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    StatusCode::NOT_FOUND.into_response()
}

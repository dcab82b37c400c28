use std::time::Duration;

use axum::{
    extract::Request,
    http::{header, uri::PathAndQuery, Response as HttpResponse},
    middleware::Next,
    response::Response,
};
use tracing::{info, info_span, Span};

/// `//api//trending` becomes `/api/trending`; `None` when nothing changes.
fn collapse_slashes(path: &str) -> Option<String> {
    if !path.contains("//") {
        return None;
    }

    let mut out = String::with_capacity(path.len());
    let mut prev_slash = false;
    for c in path.chars() {
        if c == '/' && prev_slash {
            continue;
        }
        prev_slash = c == '/';
        out.push(c);
    }
    Some(out)
}

pub async fn normalize_path(mut req: Request, next: Next) -> Response {
    if let Some(path) = collapse_slashes(req.uri().path()) {
        let rewritten = match req.uri().query() {
            Some(query) => format!("{}?{}", path, query),
            None => path,
        };

        if let Ok(path_and_query) = rewritten.parse::<PathAndQuery>() {
            let mut parts = req.uri().clone().into_parts();
            parts.path_and_query = Some(path_and_query);
            if let Ok(uri) = axum::http::Uri::from_parts(parts) {
                *req.uri_mut() = uri;
            }
        }
    }

    next.run(req).await
}

/// Span for `TraceLayer::make_span_with`.
pub fn request_span(req: &Request) -> Span {
    info_span!("request", method = %req.method(), url = %req.uri())
}

/// One line per finished request, for `TraceLayer::on_response`.
pub fn log_response<B>(response: &HttpResponse<B>, latency: Duration, _span: &Span) {
    let length = response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0);

    info!(
        status = response.status().as_u16(),
        length = length,
        latency_ms = latency.as_millis() as u64,
        "HTTP request"
    );
}

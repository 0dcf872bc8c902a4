use axum::{
    body::Body,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::Span;

use crate::sources::Source;

/// Which webhook source a request path belongs to, if any.
pub fn route_source(path: &str) -> Option<Source> {
    path.trim_matches('/').parse().ok()
}

/// Fill the request span's `http.*` and `relay.source` fields.
pub async fn enrich_current_span_middleware(req: Request<Body>, next: Next) -> Response {
    let span = Span::current();
    let uri = req.uri();

    span.record("http.uri", uri.path());
    if let Some(host) = req.headers().get("host").and_then(|h| h.to_str().ok()) {
        span.record("http.host", host);
    }
    if let Some(query) = uri.query() {
        span.record("http.query", query);
    }
    if let Some(source) = route_source(uri.path()) {
        span.record("relay.source", source.as_str());
    }

    next.run(req).await
}

/// Redirect `/backlog/` to `/backlog`, keeping the query string.
pub async fn strip_trailing_slash(req: Request<Body>, next: Next) -> Response {
    let uri = req.uri();

    match uri.path().strip_suffix('/').filter(|p| !p.is_empty()) {
        Some(path) => {
            let target = match uri.query() {
                Some(query) => format!("{path}?{query}"),
                None => path.to_string(),
            };
            Redirect::permanent(&target).into_response()
        }
        None => next.run(req).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::routing::post;
    use hyper::StatusCode;
    use tokio::net::TcpListener;

    async fn spawn() -> String {
        let app = Router::new()
            .route("/kibela", post(|| async { "ok" }))
            .fallback(|| async { StatusCode::NOT_FOUND })
            .layer(axum::middleware::from_fn(strip_trailing_slash));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }

    fn no_redirects() -> reqwest::Client {
        reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_trailing_slash_redirects_permanently() {
        let base = spawn().await;
        let resp = no_redirects().post(format!("{base}/kibela/?x=1")).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::PERMANENT_REDIRECT);
        assert_eq!(resp.headers()["location"], "/kibela?x=1");
    }

    #[test]
    fn test_route_source() {
        assert_eq!(route_source("/backlog"), Some(Source::IssueTracker));
        assert_eq!(route_source("/kibela/"), Some(Source::WikiTool));
        assert_eq!(route_source("/healthz"), None);
        assert_eq!(route_source("/"), None);
    }

    #[tokio::test]
    async fn test_canonical_path_passes_through() {
        let base = spawn().await;
        let resp = no_redirects().post(format!("{base}/kibela")).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use hyper::StatusCode;
use serde_json::json;
use tower_http::trace::TraceLayer;

use super::AppState;
use super::middleware;
use crate::relay;
use crate::sources::Source;

pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new().route(
        "/",
        get(|| async {
            Json(json!({
                "status": "ok",
            }))
        }),
    );

    Router::new()
        .nest("/healthz", health_routes)
        .route("/backlog", post(backlog_webhook))
        .route("/kibela", post(kibela_webhook))
        .fallback(not_found)
        .with_state(state)
        .layer(axum::middleware::from_fn(middleware::strip_trailing_slash))
        .layer(axum::middleware::from_fn(
            middleware::enrich_current_span_middleware,
        ))
        .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %req.method(),
                "http.uri" = tracing::field::Empty,
                "http.host" = tracing::field::Empty,
                "http.query" = tracing::field::Empty,
                "relay.source" = tracing::field::Empty
            )
        }))
}

async fn not_found(req: axum::extract::Request) -> impl IntoResponse {
    tracing::warn!("unhandled path: {}", req.uri());
    (StatusCode::NOT_FOUND, "Not Found")
}

async fn backlog_webhook(State(state): State<AppState>, body: Bytes) -> Response {
    relay_webhook(&state, Source::IssueTracker, &body).await
}

async fn kibela_webhook(State(state): State<AppState>, body: Bytes) -> Response {
    relay_webhook(&state, Source::WikiTool, &body).await
}

/// Every terminal state becomes a response; the body names the outcome only.
async fn relay_webhook(state: &AppState, source: Source, body: &[u8]) -> Response {
    match relay::handle(source, body, &state.format_ctx, state.sink(source)).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({ "mode": source.as_str(), "outcome": outcome.as_str() })),
        )
            .into_response(),
        Err(e) => e.into_response_for(source),
    }
}

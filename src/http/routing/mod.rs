pub mod todos;

use axum::{Json, Router, http::Uri, routing::get};
use http::StatusCode;
use serde_json::{json, Value};

/// Wraps a resource router with the health probe and a JSON 404 fallback.
pub fn app(router: Router) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(router)
        .fallback(unknown_route)
}

async fn unknown_route(uri: Uri) -> (StatusCode, Json<Value>) {
    tracing::debug!(%uri, "no route");
    (StatusCode::NOT_FOUND, Json(json!({})))
}

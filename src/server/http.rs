//! Probe endpoint routes.
//!
//! `GET /` and `GET /health/live` return a static body for keep-alive
//! pingers; `GET /health/ready` reports whether the state directory is
//! writable.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::server::health::check_storage_writable;

/// Static liveness body, kept from the bot's original keep-alive page.
pub const LIVENESS_BODY: &str = "Bot is running 24/7";

/// Build the probe router. `state_dir` is the directory holding the
/// attendance file.
pub fn create_router(state_dir: PathBuf) -> Router {
    Router::new()
        .route("/", get(liveness_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler))
        .with_state(Arc::new(state_dir))
}

async fn liveness_handler() -> &'static str {
    LIVENESS_BODY
}

async fn readiness_handler(State(state_dir): State<Arc<PathBuf>>) -> Response {
    if check_storage_writable(&state_dir) {
        (StatusCode::OK, Json(json!({ "status": "ready" }))).into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unavailable", "reason": "storage not writable" })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn get_status(router: Router, uri: &str) -> StatusCode {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        response.status()
    }

    #[tokio::test]
    async fn test_liveness_routes_return_ok() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            get_status(create_router(dir.path().to_path_buf()), "/").await,
            StatusCode::OK
        );
        assert_eq!(
            get_status(create_router(dir.path().to_path_buf()), "/health/live").await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn test_readiness_ok_with_writable_dir() {
        let dir = TempDir::new().unwrap();
        let status = get_status(create_router(dir.path().to_path_buf()), "/health/ready").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_readiness_unavailable_without_dir() {
        let router = create_router(PathBuf::from("/nonexistent/state/dir"));
        let status = get_status(router, "/health/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}

// Web server — Axum health endpoint for the uptime monitor.
//
// GET / and GET /health answer 200 "OK"; everything else is a 404.
// The forwarder runs regardless of whether this server is up.

use anyhow::{Context, Result};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Bind `0.0.0.0:{port}` and serve until the process exits.
pub async fn run_server(port: u16) -> Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind health server on {addr}"))?;
    info!("Health endpoint listening on http://{addr}");

    axum::serve(listener, build_router()).await?;
    Ok(())
}

pub fn build_router() -> Router {
    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn get_status(path: &str) -> StatusCode {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        build_router().oneshot(req).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_root_and_health_ok() {
        assert_eq!(get_status("/").await, StatusCode::OK);
        assert_eq!(get_status("/health").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_body() {
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let resp = build_router().oneshot(req).await.unwrap();
        let body = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        assert_eq!(get_status("/metrics").await, StatusCode::NOT_FOUND);
        assert_eq!(get_status("/health/extra").await, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_post_to_health_not_allowed() {
        let req = Request::builder()
            .method("POST")
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = build_router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}

use axum::{routing::get, Router};

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}

/// Routes for the health check.
pub fn routes() -> Router {
    Router::new().route("/health", get(health))
}

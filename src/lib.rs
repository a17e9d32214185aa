pub mod app;
pub mod site;

use axum::{http::StatusCode, middleware, Router};

/// Build the full application router. Used by main and by integration tests.
///
/// The dispatch middleware wraps every route, including the fallback, so the
/// configured endpoint is intercepted whatever path it names.
pub fn create_router(state: app::AppState) -> Router {
    Router::new()
        .merge(site::health::routes())
        .fallback(|| async { StatusCode::NOT_FOUND })
        .layer(middleware::from_fn_with_state(
            state,
            app::features::dispatch::dispatch,
        ))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

//! Router assembly.

use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::routes;
use crate::state::AppState;

/// Dashboard page plus the JSON and report endpoints.
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/", get(routes::index))
        .route("/health", get(routes::health))
        .route("/api/resolve", get(routes::resolve))
        .route("/api/snapshot", get(routes::snapshot))
        .route("/api/news", get(routes::news))
        .route("/api/report", get(routes::report))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

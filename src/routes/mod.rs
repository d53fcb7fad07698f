//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! The conversion API and a health check share one Axum router. Everything
//! else falls through to the static directory holding the viewer page and
//! its WebAssembly bundle.

pub mod convert;

use std::path::Path;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use canvas::convert::CONVERT_PATH;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// API routes without the static fallback.
pub fn api_routes(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(CONVERT_PATH, post(convert::convert))
        .route("/healthz", get(healthz))
        .layer(cors)
        .with_state(state)
}

/// Full application: API routes plus the static viewer at `/`.
pub fn app(state: AppState, static_dir: &Path) -> Router {
    let static_service = ServeDir::new(static_dir).append_index_html_on_directories(true);

    api_routes(state)
        .fallback_service(static_service)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

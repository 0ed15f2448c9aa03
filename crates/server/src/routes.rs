use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use common::types::Health;
use service::templates::TemplateRegistry;

pub mod admin;
pub mod templates;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<TemplateRegistry>,
}

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn metrics() -> (StatusCode, String) {
    match service::metrics::encode_metrics() {
        Ok(body) => (StatusCode::OK, body),
        Err(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
    }
}

/// Build the full application router: template API, admin report, health and metrics.
pub fn build_router(state: AppState, cors: CorsLayer, max_upload_bytes: usize) -> Router {
    let public = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics));

    // `upload` is a static segment, so it wins over `:type` for the POST route
    let api = Router::new()
        .route("/api/templates/list", get(templates::list_templates))
        .route("/api/templates/upload/:type", post(templates::upload_template))
        .route("/api/templates/:type/:name", get(templates::download_template))
        .layer(DefaultBodyLimit::max(max_upload_bytes));

    let admin_routes = Router::new().route("/admin/templates/orphans", get(admin::orphans));

    public
        .merge(api)
        .merge(admin_routes)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}

use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use configs::AppConfig;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::errors::StartupError;
use crate::routes::{self, AppState};
use service::{
    file::TemplateFiles,
    runtime,
    storage::JsonMetadataStore,
    templates::TemplateRegistry,
};

/// Browsers and IDE plugins call the API cross-origin.
fn build_cors() -> CorsLayer {
    CorsLayer::permissive()
}

fn bind_addr(cfg: &AppConfig) -> Result<SocketAddr, StartupError> {
    cfg.server
        .bind_addr()
        .parse()
        .map_err(|e| StartupError::InvalidConfig(format!("server address {}: {e}", cfg.server.bind_addr())))
}

/// Prepare the storage layout and wire the registry into a router.
pub async fn build_app(cfg: &AppConfig) -> Result<Router, StartupError> {
    let root = cfg.storage.root.clone();
    let metadata_path = cfg.storage.metadata_path();

    runtime::ensure_layout(&root, &metadata_path)
        .await
        .map_err(|e| StartupError::Runtime(e.to_string()))?;

    let metadata = Arc::new(JsonMetadataStore::new(&metadata_path));
    let registry = Arc::new(TemplateRegistry::new(TemplateFiles::new(&root), metadata));
    info!(
        root = %root.display(),
        metadata = %metadata_path.display(),
        max_upload_bytes = cfg.storage.max_upload_bytes,
        "template registry ready"
    );

    let state = AppState { registry };
    Ok(routes::build_router(state, build_cors(), cfg.storage.max_upload_bytes))
}

/// Public entry: build the app and serve until `shutdown` resolves.
pub async fn run<F>(cfg: AppConfig, shutdown: F) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let app = build_app(&cfg).await?;

    let addr = bind_addr(&cfg)?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "template registry listening");
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;
    Ok(())
}

use axum::{extract::State, Json};
use service::templates::ReconcileReport;

use crate::errors::ApiError;
use crate::routes::AppState;

/// Files on disk without an index entry, and index entries without a file.
pub async fn orphans(State(state): State<AppState>) -> Result<Json<ReconcileReport>, ApiError> {
    let report = state.registry.reconcile().await?;
    Ok(Json(report))
}

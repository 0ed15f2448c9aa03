use axum::{
    body::Body,
    extract::{multipart::MultipartRejection, Multipart, Path, Query, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use service::templates::{Category, TemplateListing, Upload};
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::errors::ApiError;
use crate::routes::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: String,
    pub file_name: String,
    pub display_name: String,
}

/// `GET /api/templates/list?type=<category>`; an empty `type` lists everything.
pub async fn list_templates(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<TemplateListing>, ApiError> {
    let kind = query.kind.as_deref().filter(|k| !k.is_empty());
    let listing = state.registry.list(kind).await?;
    Ok(Json(listing))
}

/// `GET /api/templates/:type/:name`: stream the stored archive.
pub async fn download_template(
    State(state): State<AppState>,
    Path((kind, name)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let stored = state.registry.fetch(&kind, &name).await?;

    let content_type = if name.to_ascii_lowercase().ends_with(".zip") {
        "application/zip"
    } else {
        "application/octet-stream"
    };
    let mut response = Body::from_stream(ReaderStream::new(stored.file)).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(stored.len));
    if let Some(v) = content_disposition(&stored.file_name) {
        headers.insert(header::CONTENT_DISPOSITION, v);
    }
    Ok(response)
}

/// `POST /api/templates/upload/:type` with form fields `displayName` and `file`.
pub async fn upload_template(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    // category first, before the body is read
    kind.parse::<Category>()?;

    let mut display_name: Option<String> = None;
    let mut upload: Option<Upload> = None;

    // a body that is not multipart has no fields; store() then reports what is missing
    if let Ok(mut multipart) = multipart {
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().map(str::to_owned);
            match name.as_deref() {
                // first value wins for repeated fields
                Some("displayName") if display_name.is_none() => display_name = Some(field.text().await?),
                // a `file` part without a filename is a text field, not an upload
                Some("file") if upload.is_none() => {
                    let Some(file_name) = field.file_name().map(str::to_owned) else { continue };
                    let bytes = field.bytes().await?;
                    debug!(%file_name, len = bytes.len(), "upload received");
                    upload = Some(Upload { file_name, bytes: bytes.to_vec() });
                }
                _ => {}
            }
        }
    } else {
        debug!("upload body is not multipart");
    }

    let display_name = display_name.unwrap_or_default();
    let info = state.registry.store(&kind, &display_name, upload).await?;
    Ok(Json(UploadResponse {
        message: "Template uploaded successfully".to_string(),
        file_name: info.file_name,
        display_name: info.display_name,
    }))
}

fn content_disposition(file_name: &str) -> Option<HeaderValue> {
    let safe = file_name.replace(['"', '\\'], "_");
    HeaderValue::from_str(&format!("attachment; filename=\"{safe}\"")).ok()
}

use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::{CreatedDrop, DropInfo, NewDropItem, RetrieveQuery};
use crate::services::{ArchiveService, DropService};
use crate::AppState;

/// Upload a batch of files as a new drop
/// POST /upload
pub async fn upload_drop(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<CreatedDrop>> {
    let mut files: Vec<(Option<String>, Bytes)> = Vec::new();
    let mut relative_paths: Vec<String> = Vec::new();
    let mut item_contexts: Vec<String> = Vec::new();
    let mut global_context: Option<String> = None;
    let mut expires_at: Option<DateTime<Utc>> = None;

    // Process multipart fields
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::InvalidRequest(format!("Failed to process multipart: {}", e))
    })? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "files" => {
                let file_name = field.file_name().map(|s| s.to_string());
                let data = field.bytes().await.map_err(|e| {
                    AppError::InvalidRequest(format!("Failed to read file field: {}", e))
                })?;
                files.push((file_name, data));
            }
            "relative_paths" => {
                relative_paths.push(field.text().await.unwrap_or_default());
            }
            "item_contexts" => {
                item_contexts.push(field.text().await.unwrap_or_default());
            }
            "global_context" => {
                let text = field.text().await.unwrap_or_default();
                if !text.is_empty() {
                    global_context = Some(text);
                }
            }
            "expires_at" => {
                let text = field.text().await.unwrap_or_default();
                if !text.is_empty() {
                    let parsed = DateTime::parse_from_rfc3339(&text).map_err(|e| {
                        AppError::InvalidRequest(format!("Invalid expires_at: {}", e))
                    })?;
                    expires_at = Some(parsed.with_timezone(&Utc));
                }
            }
            _ => {}
        }
    }

    // Pair each file with its declared path; the original filename is the
    // fallback when the uploader sent no matching path entry.
    let items: Vec<NewDropItem> = files
        .into_iter()
        .enumerate()
        .map(|(i, (file_name, bytes))| {
            let relative_path = relative_paths
                .get(i)
                .filter(|p| !p.is_empty())
                .cloned()
                .or(file_name)
                .unwrap_or_default();
            let item_context = item_contexts.get(i).filter(|c| !c.is_empty()).cloned();
            NewDropItem {
                relative_path,
                item_context,
                bytes,
            }
        })
        .collect();

    let created = DropService::create_drop(
        &state.db,
        state.storage.as_ref(),
        &state.config.drops,
        global_context,
        items,
        expires_at,
    )
    .await?;

    Ok(Json(created))
}

/// Retrieve a drop's metadata by code
/// GET /retrieve?code=123456
pub async fn retrieve_drop(
    State(state): State<AppState>,
    Query(query): Query<RetrieveQuery>,
) -> Result<Json<DropInfo>> {
    let info = DropService::retrieve_drop(&state.db, state.storage.as_ref(), &query.code).await?;
    Ok(Json(info))
}

/// Download one file from a drop
/// GET /download/:file_id
pub async fn download_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Response> {
    let (file, data) = DropService::open_file(&state.db, state.storage.as_ref(), &file_id).await?;

    let file_name = file.file_name().to_string();
    let fallback_name = file_name.replace(['"', '\\'], "_");
    let encoded_name = urlencoding::encode(&file_name);

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_LENGTH, data.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename=\"{}\"; filename*=UTF-8''{}",
                fallback_name, encoded_name
            ),
        )
        .body(Body::from(data))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}

/// Download a whole drop as a zip, folder structure preserved
/// GET /download-folder/:code
pub async fn download_folder(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Response> {
    let drop = DropService::get_active_drop(&state.db, &code).await?;
    let files = DropService::list_files(&state.db, &drop.id).await?;

    let data = ArchiveService::build_archive(state.storage.as_ref(), &files).await?;

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/zip")
        .header(header::CONTENT_LENGTH, data.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"drop_{}.zip\"", drop.code),
        )
        .body(Body::from(data))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}

use std::io;

use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::{StreamExt, TryStreamExt};
use serde::Serialize;

use crate::auth::AuthUser;
use crate::error::{AppError, Result};
use crate::models::FileRecord;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct DeleteFileResponse {
    pub success: bool,
}

/// Upload a file from a multipart form
///
/// The payload streams straight from the `file` field into the object
/// store; it is never buffered whole. A client that disconnects mid-upload
/// fails the object write and no record is created.
pub async fn upload_file(
    State(state): State<AppState>,
    AuthUser(email): AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<FileRecord>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart payload: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| AppError::BadRequest("Missing filename".to_string()))?;
        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let body = field.map_err(io::Error::other).boxed();
        let record = state
            .files
            .upload(&email, &filename, &content_type, None, body)
            .await?;

        return Ok((StatusCode::CREATED, Json(record)));
    }

    Err(AppError::BadRequest("Missing file field".to_string()))
}

/// List the caller's files, newest first
pub async fn list_files(
    State(state): State<AppState>,
    AuthUser(email): AuthUser,
) -> Result<Json<Vec<FileRecord>>> {
    let mut files = state.files.list(&email).await?;
    files.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
    Ok(Json(files))
}

/// Stream a file back to its owner with the content type and size recorded
/// at upload time
pub async fn download_file(
    State(state): State<AppState>,
    AuthUser(email): AuthUser,
    Path(filename): Path<String>,
) -> Result<Response> {
    let (record, stream) = state.files.download(&email, &filename).await?;

    tracing::info!("Serving {} to {} ({} bytes)", filename, email, record.size);

    let headers = [
        (header::CONTENT_TYPE, record.content_type.clone()),
        (header::CONTENT_LENGTH, record.size.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", record.filename),
        ),
    ];
    Ok((headers, Body::from_stream(stream)).into_response())
}

/// Delete a file (object first, then the record)
pub async fn delete_file(
    State(state): State<AppState>,
    AuthUser(email): AuthUser,
    Path(filename): Path<String>,
) -> Result<Json<DeleteFileResponse>> {
    state.files.delete(&email, &filename).await?;
    Ok(Json(DeleteFileResponse { success: true }))
}

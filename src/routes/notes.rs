use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::constants::{ERR_INVALID_NOTE_TITLE, MAX_NOTE_CONTENT_LEN, MAX_NOTE_TITLE_LEN};
use crate::error::{AppError, Result};
use crate::models::Note;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    pub title: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteNoteResponse {
    pub success: bool,
}

fn validate_note_payload(title: &str, content: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(AppError::BadRequest(ERR_INVALID_NOTE_TITLE.to_string()));
    }
    if title.len() > MAX_NOTE_TITLE_LEN {
        return Err(AppError::BadRequest("Note title too long".to_string()));
    }
    if content.len() > MAX_NOTE_CONTENT_LEN {
        return Err(AppError::BadRequest("Note content too large".to_string()));
    }
    Ok(())
}

/// Create a note
pub async fn create_note(
    State(state): State<AppState>,
    AuthUser(email): AuthUser,
    Json(payload): Json<NoteRequest>,
) -> Result<(StatusCode, Json<Note>)> {
    validate_note_payload(&payload.title, &payload.content)?;

    let notes = state.notes.clone();
    let note = tokio::task::spawn_blocking(move || {
        notes.create(&email, &payload.title, &payload.content)
    })
    .await??;

    Ok((StatusCode::CREATED, Json(note)))
}

/// List the caller's notes, most recently updated first
pub async fn list_notes(
    State(state): State<AppState>,
    AuthUser(email): AuthUser,
) -> Result<Json<Vec<Note>>> {
    let notes = state.notes.clone();
    let mut listed = tokio::task::spawn_blocking(move || notes.list(&email)).await??;
    listed.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    Ok(Json(listed))
}

/// Fetch a single note
pub async fn get_note(
    State(state): State<AppState>,
    AuthUser(email): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Note>> {
    let notes = state.notes.clone();
    let note = tokio::task::spawn_blocking(move || notes.get(&email, &id)).await??;
    Ok(Json(note))
}

/// Overwrite a note's title and content
pub async fn update_note(
    State(state): State<AppState>,
    AuthUser(email): AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<NoteRequest>,
) -> Result<Json<Note>> {
    validate_note_payload(&payload.title, &payload.content)?;

    let notes = state.notes.clone();
    let note = tokio::task::spawn_blocking(move || {
        notes.update(&email, &id, &payload.title, &payload.content)
    })
    .await??;

    Ok(Json(note))
}

/// Delete a note
pub async fn delete_note(
    State(state): State<AppState>,
    AuthUser(email): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<DeleteNoteResponse>> {
    let notes = state.notes.clone();
    tokio::task::spawn_blocking(move || notes.delete(&email, &id)).await??;
    Ok(Json(DeleteNoteResponse { success: true }))
}

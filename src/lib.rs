//! Cloudbox personal cloud-storage backend
//!
//! Users authenticate, upload/download/delete files, and keep notes. File
//! writes span an object store and a metadata catalog that fail
//! independently; `files` coordinates the two with compensating actions,
//! `catalog` is the lock-guarded copy-on-write metadata store behind it,
//! and `notes` is the simpler single-store sibling.

pub mod auth;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod error;
pub mod files;
pub mod models;
pub mod notes;
pub mod routes;
pub mod storage;

pub use catalog::Catalog;
pub use config::Config;
pub use error::{AppError, Result};
pub use files::FileService;
pub use notes::NoteStore;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use storage::ObjectStore;

/// Application state shared across all handlers
///
/// Every component is an owned instance injected here; none of them is
/// process-global.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub notes: Arc<NoteStore>,
    pub files: Arc<FileService>,
    pub config: Config,
}

impl AppState {
    /// Assemble the state from its components
    pub fn new(
        catalog: Arc<Catalog>,
        store: Arc<dyn ObjectStore>,
        notes: Arc<NoteStore>,
        config: Config,
    ) -> Self {
        let files = Arc::new(FileService::new(catalog.clone(), store));
        Self {
            catalog,
            notes,
            files,
            config,
        }
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    use routes::*;

    Router::new()
        .route("/health", get(health_check))
        .route("/api/register", post(register_user))
        .route("/api/login", post(login_user))
        .route("/api/files", post(upload_file).get(list_files))
        .route(
            "/api/files/:filename",
            get(download_file).delete(delete_file),
        )
        .route("/api/notes", post(create_note).get(list_notes))
        .route(
            "/api/notes/:id",
            get(get_note).put(update_note).delete(delete_note),
        )
        .layer(DefaultBodyLimit::max(constants::MAX_UPLOAD_SIZE_BYTES))
        .with_state(state)
}

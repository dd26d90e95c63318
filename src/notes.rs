//! Per-user note store: one JSON file per note, one directory per owner.
//!
//! A single coarse reader/writer lock serializes all writers process-wide,
//! across owners. That costs some concurrency and keeps the
//! read-modify-write cycle of `update` trivially race-free; per-owner
//! locking is an optimization this corpus does not need.

use std::io;
use std::path::PathBuf;

use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::constants::ERR_INVALID_NOTE_ID;
use crate::error::{AppError, Result};
use crate::models::Note;

pub struct NoteStore {
    root: PathBuf,
    lock: RwLock<()>,
}

impl NoteStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock: RwLock::new(()),
        }
    }

    fn owner_dir(&self, owner_email: &str) -> PathBuf {
        self.root.join(owner_email)
    }

    fn note_path(&self, owner_email: &str, id: &str) -> Result<PathBuf> {
        if !Note::validate_id(id) {
            return Err(AppError::BadRequest(ERR_INVALID_NOTE_ID.to_string()));
        }
        Ok(self.owner_dir(owner_email).join(format!("{id}.json")))
    }

    /// Create a note with a fresh id, creating the owner's partition on
    /// first use
    pub fn create(&self, owner_email: &str, title: &str, content: &str) -> Result<Note> {
        let _guard = self.lock.write();

        let dir = self.owner_dir(owner_email);
        std::fs::create_dir_all(&dir)?;

        let now = Utc::now();
        let note = Note {
            id: Uuid::new_v4().to_string(),
            owner_email: owner_email.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        };

        let path = dir.join(format!("{}.json", note.id));
        std::fs::write(&path, serde_json::to_vec(&note)?)?;

        tracing::info!("Created note {} for {}", note.id, owner_email);
        Ok(note)
    }

    /// Load a single note
    pub fn get(&self, owner_email: &str, id: &str) -> Result<Note> {
        let path = self.note_path(owner_email, id)?;
        let _guard = self.lock.read();

        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(AppError::NotFound("Note"))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// All notes owned by `owner_email`, unordered
    ///
    /// An owner with no partition has no notes. A file that fails to read
    /// or parse is logged and skipped rather than failing the listing.
    pub fn list(&self, owner_email: &str) -> Result<Vec<Note>> {
        let _guard = self.lock.read();

        let dir = self.owner_dir(owner_email);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut notes = Vec::new();
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if path.extension().map(|ext| ext == "json") != Some(true) {
                continue;
            }
            let bytes = match std::fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!("Skipping unreadable note {:?}: {}", path, e);
                    continue;
                }
            };
            match serde_json::from_slice::<Note>(&bytes) {
                Ok(note) => notes.push(note),
                Err(e) => {
                    tracing::warn!("Skipping corrupt note {:?}: {}", path, e);
                }
            }
        }
        Ok(notes)
    }

    /// Overwrite a note's title and content, bumping `updated_at`
    ///
    /// The whole read-modify-write cycle runs under the exclusive lock.
    /// No history is kept.
    pub fn update(&self, owner_email: &str, id: &str, title: &str, content: &str) -> Result<Note> {
        let path = self.note_path(owner_email, id)?;
        let _guard = self.lock.write();

        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(AppError::NotFound("Note"))
            }
            Err(e) => return Err(e.into()),
        };
        let mut note: Note = serde_json::from_slice(&bytes)?;

        note.title = title.to_string();
        note.content = content.to_string();
        note.updated_at = Utc::now();

        std::fs::write(&path, serde_json::to_vec(&note)?)?;

        tracing::info!("Updated note {} for {}", id, owner_email);
        Ok(note)
    }

    /// Remove a note. A missing note is `NotFound`; any other removal
    /// failure is surfaced as-is.
    pub fn delete(&self, owner_email: &str, id: &str) -> Result<()> {
        let path = self.note_path(owner_email, id)?;
        let _guard = self.lock.write();

        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!("Deleted note {} for {}", id, owner_email);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(AppError::NotFound("Note")),
            Err(e) => Err(e.into()),
        }
    }
}

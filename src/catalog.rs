//! Metadata catalog: users and file records behind one lock, one JSON
//! document on disk.
//!
//! Every mutation runs under the exclusive lock and follows the same
//! copy-and-swap sequence: clone the in-memory document, mutate the clone,
//! serialize the whole clone, write it to a temporary file next to the live
//! document, atomically rename it into place, and only then swap the clone
//! into memory. A failed persist therefore leaves both memory and disk
//! exactly as they were, and a reader can never observe a half-written
//! document. Readers take the shared lock.
//!
//! The whole document is rewritten on every mutation. That is O(n) per
//! write and is retained deliberately for a personal-scale corpus; an
//! append-only log with compaction is the upgrade path if this ever needs
//! to scale.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{AppError, Result};
use crate::models::{FileRecord, User};

/// The full persisted record set, serialized as one unit
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Document {
    users: Vec<User>,
    files: Vec<FileRecord>,
}

#[derive(Debug, Default)]
struct Inner {
    doc: Document,
    /// Highest id ever issued; ids are wall-clock nanoseconds bumped past
    /// this value, so they stay unique even if the clock stalls or steps
    /// backwards.
    last_id: i64,
}

/// Mutex-guarded, copy-on-write metadata store
///
/// An owned component injected into handlers; the lock is a field, not
/// process-global state. All operations are synchronous and may block on
/// the filesystem, so async callers dispatch them via `spawn_blocking`.
pub struct Catalog {
    path: PathBuf,
    inner: RwLock<Inner>,
}

impl Catalog {
    /// Open the catalog document at `path`, creating parent directories.
    /// A missing document is an empty catalog; an unreadable or unparsable
    /// one is an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let doc: Document = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Document::default(),
            Err(e) => return Err(e.into()),
        };

        let last_id = doc
            .users
            .iter()
            .map(|u| u.id)
            .chain(doc.files.iter().map(|f| f.id))
            .max()
            .unwrap_or(0);

        tracing::info!(
            "Opened catalog at {:?} ({} users, {} files)",
            path,
            doc.users.len(),
            doc.files.len()
        );

        Ok(Self {
            path,
            inner: RwLock::new(Inner { doc, last_id }),
        })
    }

    /// Serialize `doc` and atomically replace the live document with it.
    /// Called with the exclusive lock held.
    fn persist(&self, doc: &Document) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(doc)?;
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(parent)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| AppError::Io(e.error))?;
        Ok(())
    }

    fn allocate_id(inner: &mut Inner) -> i64 {
        let now = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        inner.last_id = if now > inner.last_id {
            now
        } else {
            inner.last_id + 1
        };
        inner.last_id
    }

    /// Create a user; the email is the identity key.
    /// Returns `Conflict` if the email is already registered.
    pub fn create_user(&self, email: &str, password_hash: Option<String>) -> Result<User> {
        let mut inner = self.inner.write();

        if inner.doc.users.iter().any(|u| u.email == email) {
            return Err(AppError::Conflict("User already exists"));
        }

        let now = Utc::now();
        let user = User {
            id: Self::allocate_id(&mut inner),
            email: email.to_string(),
            password_hash,
            created_at: now,
            last_login: now,
        };

        let mut doc = inner.doc.clone();
        doc.users.push(user.clone());
        self.persist(&doc)?;
        inner.doc = doc;

        Ok(user)
    }

    /// Look up a user by email
    pub fn get_user(&self, email: &str) -> Result<User> {
        let inner = self.inner.read();
        inner
            .doc
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(AppError::NotFound("User"))
    }

    /// Stamp the user's last successful authentication time
    pub fn touch_last_login(&self, email: &str) -> Result<User> {
        let mut inner = self.inner.write();

        let mut doc = inner.doc.clone();
        let user = doc
            .users
            .iter_mut()
            .find(|u| u.email == email)
            .ok_or(AppError::NotFound("User"))?;
        user.last_login = Utc::now();
        let updated = user.clone();

        self.persist(&doc)?;
        inner.doc = doc;

        Ok(updated)
    }

    /// Record a completed upload. Filenames are unique per owner: an
    /// existing record for the same `(owner_email, filename)` is replaced,
    /// so re-uploading leaves exactly one record.
    pub fn create_file_record(
        &self,
        owner_email: &str,
        filename: &str,
        size: u64,
        content_type: &str,
    ) -> Result<FileRecord> {
        let mut inner = self.inner.write();

        let record = FileRecord {
            id: Self::allocate_id(&mut inner),
            owner_email: owner_email.to_string(),
            filename: filename.to_string(),
            size,
            content_type: content_type.to_string(),
            storage_key: FileRecord::storage_key_for(owner_email, filename),
            uploaded_at: Utc::now(),
        };

        let mut doc = inner.doc.clone();
        doc.files
            .retain(|f| !(f.owner_email == owner_email && f.filename == filename));
        doc.files.push(record.clone());
        self.persist(&doc)?;
        inner.doc = doc;

        Ok(record)
    }

    /// Look up a file record by owner and filename
    pub fn get_file(&self, owner_email: &str, filename: &str) -> Result<FileRecord> {
        let inner = self.inner.read();
        inner
            .doc
            .files
            .iter()
            .find(|f| f.owner_email == owner_email && f.filename == filename)
            .cloned()
            .ok_or(AppError::NotFound("File"))
    }

    /// All file records owned by `owner_email`, unordered
    pub fn list_files(&self, owner_email: &str) -> Result<Vec<FileRecord>> {
        let inner = self.inner.read();
        Ok(inner
            .doc
            .files
            .iter()
            .filter(|f| f.owner_email == owner_email)
            .cloned()
            .collect())
    }

    /// Remove a file record by id
    pub fn delete_file_record(&self, id: i64) -> Result<()> {
        let mut inner = self.inner.write();

        if !inner.doc.files.iter().any(|f| f.id == id) {
            return Err(AppError::NotFound("File"));
        }

        let mut doc = inner.doc.clone();
        doc.files.retain(|f| f.id != id);
        self.persist(&doc)?;
        inner.doc = doc;

        Ok(())
    }

    /// Liveness probe for the health endpoint: the lock is reachable and
    /// the on-disk document is either present or not yet created.
    pub fn ping(&self) -> bool {
        let _guard = self.inner.read();
        match std::fs::metadata(&self.path) {
            Ok(meta) => meta.is_file(),
            Err(e) => e.kind() == io::ErrorKind::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn open_catalog(dir: &TempDir) -> Catalog {
        Catalog::open(dir.path().join("catalog.json")).unwrap()
    }

    #[test]
    fn test_create_user_and_lookup() {
        let dir = TempDir::new().unwrap();
        let catalog = open_catalog(&dir);

        let user = catalog
            .create_user("a@x.com", Some("hash".to_string()))
            .unwrap();
        assert_eq!(user.email, "a@x.com");
        assert!(user.id > 0);

        let found = catalog.get_user("a@x.com").unwrap();
        assert_eq!(found.id, user.id);

        assert!(matches!(
            catalog.get_user("b@x.com"),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_email_is_conflict() {
        let dir = TempDir::new().unwrap();
        let catalog = open_catalog(&dir);

        catalog.create_user("a@x.com", None).unwrap();
        assert!(matches!(
            catalog.create_user("a@x.com", None),
            Err(AppError::Conflict(_))
        ));

        // Still exactly one record
        drop(catalog);
        let reopened = open_catalog(&dir);
        assert!(reopened.get_user("a@x.com").is_ok());
    }

    #[test]
    fn test_concurrent_create_user_single_winner() {
        let dir = TempDir::new().unwrap();
        let catalog = Arc::new(open_catalog(&dir));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let catalog = catalog.clone();
                std::thread::spawn(move || catalog.create_user("race@x.com", None).is_ok())
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&ok| ok)
            .count();
        assert_eq!(successes, 1);

        // Exactly one record survives a reopen as well
        drop(catalog);
        let reopened = open_catalog(&dir);
        assert!(reopened.get_user("race@x.com").is_ok());
    }

    #[test]
    fn test_file_record_upsert_keeps_one_record() {
        let dir = TempDir::new().unwrap();
        let catalog = open_catalog(&dir);

        let first = catalog
            .create_file_record("a@x.com", "report.pdf", 10, "application/pdf")
            .unwrap();
        let second = catalog
            .create_file_record("a@x.com", "report.pdf", 24, "application/pdf")
            .unwrap();
        assert_ne!(first.id, second.id);

        let files = catalog.list_files("a@x.com").unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].size, 24);
        assert_eq!(files[0].storage_key, "a@x.com/report.pdf");
    }

    #[test]
    fn test_delete_file_record() {
        let dir = TempDir::new().unwrap();
        let catalog = open_catalog(&dir);

        let record = catalog
            .create_file_record("a@x.com", "report.pdf", 10, "application/pdf")
            .unwrap();
        catalog.delete_file_record(record.id).unwrap();

        assert!(catalog.list_files("a@x.com").unwrap().is_empty());
        assert!(matches!(
            catalog.delete_file_record(record.id),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_document_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let catalog = open_catalog(&dir);

        let user = catalog.create_user("a@x.com", None).unwrap();
        catalog
            .create_file_record("a@x.com", "report.pdf", 10, "application/pdf")
            .unwrap();
        drop(catalog);

        let reopened = open_catalog(&dir);
        assert_eq!(reopened.get_user("a@x.com").unwrap().id, user.id);
        assert_eq!(reopened.list_files("a@x.com").unwrap().len(), 1);

        // Ids stay monotonic across restarts
        let next = reopened.create_user("b@x.com", None).unwrap();
        assert!(next.id > user.id);
    }

    #[test]
    fn test_failed_persist_leaves_memory_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");
        let catalog = Catalog::open(&path).unwrap();

        catalog.create_user("a@x.com", None).unwrap();

        // Replace the document with a directory so the atomic rename fails
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        assert!(catalog
            .create_file_record("a@x.com", "report.pdf", 10, "application/pdf")
            .is_err());

        // The failed mutation was never swapped into memory
        assert!(catalog.list_files("a@x.com").unwrap().is_empty());
        assert!(catalog.get_user("a@x.com").is_ok());
    }

    #[test]
    fn test_touch_last_login_advances() {
        let dir = TempDir::new().unwrap();
        let catalog = open_catalog(&dir);

        let user = catalog.create_user("a@x.com", None).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(10));
        let touched = catalog.touch_last_login("a@x.com").unwrap();

        assert!(touched.last_login > user.last_login);
        assert_eq!(touched.created_at, user.created_at);
    }
}

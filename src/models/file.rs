use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::MAX_FILENAME_LEN;

/// File metadata record stored in the catalog
///
/// Invariant: a record exists iff the object under `storage_key` exists in
/// the object store, except inside the two documented failure windows of the
/// upload/delete protocol (orphan object, dangling record).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    /// Unique numeric id, wall-clock-derived at creation
    pub id: i64,
    /// Owner's email address
    pub owner_email: String,
    /// Filename as uploaded; unique per owner, last writer wins
    pub filename: String,
    /// Object size in bytes as counted during the upload
    pub size: u64,
    /// MIME type reported at upload time
    pub content_type: String,
    /// Object store key, `{owner_email}/{filename}`
    pub storage_key: String,
    /// When the upload completed
    pub uploaded_at: DateTime<Utc>,
}

impl FileRecord {
    /// Build the object store key for an owner/filename pair
    pub fn storage_key_for(owner_email: &str, filename: &str) -> String {
        format!("{owner_email}/{filename}")
    }

    /// Validate a filename at the request boundary
    ///
    /// The filename becomes the final segment of the storage key and of the
    /// on-disk path, so path separators and dot-dot segments are rejected.
    pub fn validate_filename(filename: &str) -> bool {
        !filename.is_empty()
            && filename.len() <= MAX_FILENAME_LEN
            && filename != "."
            && filename != ".."
            && !filename
                .chars()
                .any(|c| c == '/' || c == '\\' || c.is_control())
    }
}

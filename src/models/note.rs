use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A note, stored as one JSON file per note under the owner's partition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    /// Generated UUID, assigned once at creation and never reused
    pub id: String,
    /// Owner's email address
    pub owner_email: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// Validate a client-supplied note id before it is used as a filename
    ///
    /// Generated ids are hyphenated UUIDs; anything else (path separators,
    /// dots, empty) is rejected before touching the filesystem.
    pub fn validate_id(id: &str) -> bool {
        !id.is_empty()
            && id.len() <= 64
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
    }
}

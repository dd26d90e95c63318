/// Maximum upload size in bytes (32MB)
/// Large media belongs in a dedicated store, not a personal cloud.
pub const MAX_UPLOAD_SIZE_BYTES: usize = 33_554_432;

/// Warning threshold for large uploads (8MB)
/// Log when uploads exceed this size for monitoring
pub const WARN_UPLOAD_SIZE_BYTES: u64 = 8_388_608;

/// Lifetime of issued auth tokens in seconds (24 hours)
pub const TOKEN_TTL_SECS: i64 = 86_400;

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 8;

/// Maximum accepted filename length
pub const MAX_FILENAME_LEN: usize = 255;

/// Maximum accepted note title length
pub const MAX_NOTE_TITLE_LEN: usize = 256;

/// Maximum accepted note content length (1MB)
pub const MAX_NOTE_CONTENT_LEN: usize = 1_048_576;

// =============================================================================
// Error Messages
// =============================================================================

/// Error message for a malformed email address
pub const ERR_INVALID_EMAIL: &str = "Invalid email address";

/// Error message for a password below the minimum length
pub const ERR_PASSWORD_TOO_SHORT: &str = "Password must be at least 8 characters";

/// Error message for a filename that is empty, too long, or contains path
/// separators
pub const ERR_INVALID_FILENAME: &str = "Invalid filename";

/// Error message for a note id that does not look like a generated id
pub const ERR_INVALID_NOTE_ID: &str = "Invalid note id";

/// Error message for a missing or empty note title
pub const ERR_INVALID_NOTE_TITLE: &str = "Note title must not be empty";

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User record as stored in the metadata catalog
///
/// This is the on-disk record, not an API body: `password_hash` is part of
/// the persisted document and must never be serialized into a response.
/// `last_login` is the only field that changes after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique numeric id, wall-clock-derived at creation
    pub id: i64,
    /// Email address, the identity key (unique across the catalog)
    pub email: String,
    /// Argon2 password hash; absent for OAuth-only accounts
    pub password_hash: Option<String>,
    /// When the account was created
    pub created_at: DateTime<Utc>,
    /// When the account last authenticated
    pub last_login: DateTime<Utc>,
}

impl User {
    /// Validate an email address at the request boundary
    ///
    /// Intentionally loose (one `@`, a dotted domain, sane length); the
    /// address is also used as a storage partition key, so path separators
    /// are rejected outright.
    pub fn validate_email(email: &str) -> bool {
        if email.len() < 5 || email.len() > 254 {
            return false;
        }
        if email
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_whitespace() || c.is_control())
        {
            return false;
        }
        let mut parts = email.split('@');
        let local = parts.next().unwrap_or_default();
        let domain = parts.next().unwrap_or_default();
        parts.next().is_none()
            && !local.is_empty()
            && domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
    }
}

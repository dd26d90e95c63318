//! Password and token auth.
//!
//! Handlers never authenticate themselves; the [`AuthUser`] extractor
//! resolves the owner identity (email) from the Bearer token and everything
//! downstream takes that identity as given. OAuth and session cookies are
//! external concerns and not implemented here.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, SaltString},
    Argon2, PasswordHasher, PasswordVerifier,
};
use axum::{async_trait, extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::constants::TOKEN_TTL_SECS;
use crate::error::{AppError, Result};
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Owner email
    sub: String,
    exp: usize,
}

/// Hash a password for storage
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            tracing::error!("Password hashing failed: {}", e);
            AppError::PasswordHash
        })
}

/// Verify a password against a stored hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::error!("Stored password hash is malformed: {}", e);
            false
        }
    }
}

/// Issue a Bearer token for an authenticated owner
pub fn issue_token(email: &str, secret: &str) -> Result<String> {
    let exp = (Utc::now().timestamp() + TOKEN_TTL_SECS) as usize;
    let claims = Claims {
        sub: email.to_string(),
        exp,
    };
    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

/// Decode a Bearer token back to the owner email
pub fn decode_token(token: &str, secret: &str) -> std::result::Result<String, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims.sub)
}

/// Resolved owner identity for protected handlers
///
/// Extracted from the `Authorization: Bearer` header; any missing, mangled,
/// or expired token is a 401 before the handler runs.
pub struct AuthUser(pub String);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;
        let token = header.strip_prefix("Bearer ").ok_or(AppError::Unauthorized)?;
        let email = decode_token(token, &state.config.token_secret)
            .map_err(|_| AppError::Unauthorized)?;
        Ok(AuthUser(email))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password("correct horse battery", &hash));
        assert!(!verify_password("wrong password", &hash));
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn test_token_round_trip() {
        let token = issue_token("a@x.com", "secret").unwrap();
        assert_eq!(decode_token(&token, "secret").unwrap(), "a@x.com");
    }

    #[test]
    fn test_token_wrong_secret_rejected() {
        let token = issue_token("a@x.com", "secret").unwrap();
        assert!(decode_token(&token, "other-secret").is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let claims = Claims {
            sub: "a@x.com".to_string(),
            exp: (Utc::now().timestamp() - 120) as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert!(decode_token(&token, "secret").is_err());
    }
}

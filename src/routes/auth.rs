use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::auth;
use crate::constants::{ERR_INVALID_EMAIL, ERR_PASSWORD_TOO_SHORT, MIN_PASSWORD_LEN};
use crate::error::{AppError, Result};
use crate::models::User;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
}

/// Register a new account with email and password
///
/// Returns a Bearer token on success, 409 if the email is already taken.
/// The password is hashed before it ever reaches the catalog.
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>> {
    let email = payload.email.trim().to_ascii_lowercase();
    if !User::validate_email(&email) {
        return Err(AppError::BadRequest(ERR_INVALID_EMAIL.to_string()));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(ERR_PASSWORD_TOO_SHORT.to_string()));
    }

    let password = payload.password;
    let hash = tokio::task::spawn_blocking(move || auth::hash_password(&password)).await??;

    let catalog = state.catalog.clone();
    let new_email = email.clone();
    let user =
        tokio::task::spawn_blocking(move || catalog.create_user(&new_email, Some(hash))).await??;

    let token = auth::issue_token(&user.email, &state.config.token_secret)?;

    tracing::info!("Registered user {}", user.email);

    Ok(Json(AuthResponse { token }))
}

/// Log in with email and password
///
/// Unknown email, missing password hash (OAuth-only account) and wrong
/// password are all the same 401; nothing leaks which one it was.
pub async fn login_user(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let email = payload.email.trim().to_ascii_lowercase();

    let catalog = state.catalog.clone();
    let lookup = email.clone();
    let user = match tokio::task::spawn_blocking(move || catalog.get_user(&lookup)).await? {
        Ok(user) => user,
        Err(AppError::NotFound(_)) => return Err(AppError::Unauthorized),
        Err(e) => return Err(e),
    };

    let hash = user.password_hash.ok_or(AppError::Unauthorized)?;
    let password = payload.password;
    let verified =
        tokio::task::spawn_blocking(move || auth::verify_password(&password, &hash)).await?;
    if !verified {
        tracing::warn!("Failed login attempt for {}", email);
        return Err(AppError::Unauthorized);
    }

    let catalog = state.catalog.clone();
    let touch = email.clone();
    tokio::task::spawn_blocking(move || catalog.touch_last_login(&touch)).await??;

    let token = auth::issue_token(&email, &state.config.token_secret)?;

    tracing::info!("User {} logged in", email);

    Ok(Json(AuthResponse { token }))
}

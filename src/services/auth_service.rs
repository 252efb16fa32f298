// src/services/auth_service.rs
use crate::{
    error::{AppError, AppResult},
    models::profile::SessionContext,
    services::user_service,
};
use sqlx::SqlitePool;

/// Checks a password against the stored bcrypt hash.
pub async fn verify_password(password: &str, stored_hash: &str) -> AppResult<bool> {
    let password = password.to_string();
    let stored_hash = stored_hash.to_string();
    tokio::task::spawn_blocking(move || {
        tracing::debug!("Verifying bcrypt hash...");
        bcrypt::verify(&password, &stored_hash)
    })
    .await
    .map_err(|e| {
        tracing::error!("spawn_blocking task failed (verify_password): {:?}", e);
        AppError::InternalServerError
    })?
    .map_err(|e| {
        tracing::error!("bcrypt error while verifying password: {:?}", e);
        AppError::PasswordHashingError
    })
}

pub async fn hash_password(password: &str) -> AppResult<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || {
        tracing::debug!("Generating bcrypt hash...");
        bcrypt::hash(&password, bcrypt::DEFAULT_COST)
    })
    .await
    .map_err(|e| {
        tracing::error!("spawn_blocking task failed (hash_password): {:?}", e);
        AppError::InternalServerError
    })?
    .map_err(|e| {
        tracing::error!("bcrypt error while hashing password: {:?}", e);
        AppError::PasswordHashingError
    })
}

/// Logs a student in: returns the session context to store, or `InvalidCredentials`
/// for an unknown email as well as a wrong password.
pub async fn authenticate(db_pool: &SqlitePool, email: &str, password: &str) -> AppResult<SessionContext> {
    let email = email.trim();
    let Some(user) = user_service::find_user_by_email(db_pool, email).await? else {
        tracing::warn!("Login attempt for unknown email: {}", email);
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(password, &user.password_hash).await? {
        tracing::warn!("Wrong password for: {}", email);
        return Err(AppError::InvalidCredentials);
    }

    let profile = user_service::find_profile(db_pool, &user.id).await?.ok_or_else(|| {
        tracing::error!("User '{}' has no profile row!", user.id);
        AppError::NotFound("Profile".into())
    })?;

    Ok(SessionContext::from_profile(&profile))
}

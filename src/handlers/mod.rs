pub mod auth;
pub mod businesses;
pub mod health;
pub mod knowledge_base;
pub mod webhook;

use axum::http::HeaderMap;
use chrono::Utc;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::services::auth::verify_token;

/// Requires a valid `Authorization: Bearer <token>` issued by the login endpoint.
pub fn check_auth(headers: &HeaderMap, config: &AppConfig) -> Result<(), AppError> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;

    verify_token(&config.auth_secret, token.trim(), Utc::now())?;
    Ok(())
}

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::services::auth;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    token: String,
}

// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let token = auth::login(&state.config, &req.username, &req.password, Utc::now())?;
    tracing::info!(username = %req.username, "admin logged in");
    Ok(Json(LoginResponse { token }))
}

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde_json::{json, Value};

use super::check_auth;
use crate::errors::AppError;
use crate::models::{Business, BusinessInput};
use crate::state::AppState;

// GET /api/businesses
pub async fn list_businesses(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Business>>, AppError> {
    check_auth(&headers, &state.config)?;
    Ok(Json(state.registry.list()?))
}

// POST /api/businesses
pub async fn create_business(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(input): Json<BusinessInput>,
) -> Result<(StatusCode, Json<Business>), AppError> {
    check_auth(&headers, &state.config)?;
    let business = state.registry.create(input)?;
    Ok((StatusCode::CREATED, Json(business)))
}

// PUT /api/businesses/:id
pub async fn update_business(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(input): Json<BusinessInput>,
) -> Result<Json<Business>, AppError> {
    check_auth(&headers, &state.config)?;
    Ok(Json(state.registry.update(&id, input)?))
}

// DELETE /api/businesses/:id
pub async fn delete_business(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    check_auth(&headers, &state.config)?;
    state.registry.delete(&id)?;
    Ok(Json(json!({ "message": "Business deleted" })))
}

//! Dashboard endpoints for doctors, services and FAQ entries.
//!
//! Every route takes an optional `?businessId=`; without it the registry's
//! fallback business is used.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use super::check_auth;
use crate::errors::AppError;
use crate::models::{Business, Confirmation, Doctor, Faq, Service};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessScope {
    business_id: Option<String>,
}

#[derive(Deserialize)]
pub struct DeleteDoctor {
    name: String,
}

#[derive(Deserialize)]
pub struct DeleteService {
    service: String,
}

#[derive(Deserialize)]
pub struct DeleteFaq {
    question: String,
}

fn target_business(
    state: &AppState,
    headers: &HeaderMap,
    scope: &BusinessScope,
) -> Result<Business, AppError> {
    check_auth(headers, &state.config)?;
    match scope.business_id.as_deref() {
        Some(id) => state.registry.get(id),
        None => state
            .registry
            .default_business()?
            .ok_or_else(|| AppError::NotFound("No business configured".to_string())),
    }
}

// ── Doctors ──

pub async fn list_doctors(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(scope): Query<BusinessScope>,
) -> Result<Json<Vec<Doctor>>, AppError> {
    let business = target_business(&state, &headers, &scope)?;
    Ok(Json(state.knowledge_base.get_doctors(&business.sheet_id).await?))
}

pub async fn add_doctor(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(scope): Query<BusinessScope>,
    Json(doctor): Json<Doctor>,
) -> Result<Json<Confirmation>, AppError> {
    let business = target_business(&state, &headers, &scope)?;
    Ok(Json(
        state
            .knowledge_base
            .add_doctor(&business.sheet_id, &doctor)
            .await?,
    ))
}

pub async fn delete_doctor(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(scope): Query<BusinessScope>,
    Json(req): Json<DeleteDoctor>,
) -> Result<Json<Confirmation>, AppError> {
    let business = target_business(&state, &headers, &scope)?;
    Ok(Json(
        state
            .knowledge_base
            .delete_doctor(&business.sheet_id, &req.name)
            .await?,
    ))
}

// ── Services ──

pub async fn list_services(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(scope): Query<BusinessScope>,
) -> Result<Json<Vec<Service>>, AppError> {
    let business = target_business(&state, &headers, &scope)?;
    Ok(Json(state.knowledge_base.get_services(&business.sheet_id).await?))
}

pub async fn add_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(scope): Query<BusinessScope>,
    Json(service): Json<Service>,
) -> Result<Json<Confirmation>, AppError> {
    let business = target_business(&state, &headers, &scope)?;
    Ok(Json(
        state
            .knowledge_base
            .add_service(&business.sheet_id, &service)
            .await?,
    ))
}

pub async fn delete_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(scope): Query<BusinessScope>,
    Json(req): Json<DeleteService>,
) -> Result<Json<Confirmation>, AppError> {
    let business = target_business(&state, &headers, &scope)?;
    Ok(Json(
        state
            .knowledge_base
            .delete_service(&business.sheet_id, &req.service)
            .await?,
    ))
}

// ── FAQ ──

pub async fn list_faq(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(scope): Query<BusinessScope>,
) -> Result<Json<Vec<Faq>>, AppError> {
    let business = target_business(&state, &headers, &scope)?;
    Ok(Json(state.knowledge_base.get_faq(&business.sheet_id).await?))
}

pub async fn add_faq(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(scope): Query<BusinessScope>,
    Json(faq): Json<Faq>,
) -> Result<Json<Confirmation>, AppError> {
    let business = target_business(&state, &headers, &scope)?;
    Ok(Json(
        state.knowledge_base.add_faq(&business.sheet_id, &faq).await?,
    ))
}

pub async fn delete_faq(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(scope): Query<BusinessScope>,
    Json(req): Json<DeleteFaq>,
) -> Result<Json<Confirmation>, AppError> {
    let business = target_business(&state, &headers, &scope)?;
    Ok(Json(
        state
            .knowledge_base
            .delete_faq(&business.sheet_id, &req.question)
            .await?,
    ))
}

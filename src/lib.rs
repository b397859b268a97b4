pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
pub mod state;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/whatsapp", post(handlers::webhook::whatsapp_webhook))
        .route("/api/auth/login", post(handlers::auth::login))
        .route(
            "/api/businesses",
            get(handlers::businesses::list_businesses).post(handlers::businesses::create_business),
        )
        .route(
            "/api/businesses/:id",
            put(handlers::businesses::update_business)
                .delete(handlers::businesses::delete_business),
        )
        .route(
            "/api/doctors",
            get(handlers::knowledge_base::list_doctors)
                .post(handlers::knowledge_base::add_doctor)
                .delete(handlers::knowledge_base::delete_doctor),
        )
        .route(
            "/api/services",
            get(handlers::knowledge_base::list_services)
                .post(handlers::knowledge_base::add_service)
                .delete(handlers::knowledge_base::delete_service),
        )
        .route(
            "/api/faq",
            get(handlers::knowledge_base::list_faq)
                .post(handlers::knowledge_base::add_faq)
                .delete(handlers::knowledge_base::delete_faq),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

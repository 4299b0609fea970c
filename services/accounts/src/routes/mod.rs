//! Accounts service routes

pub mod auth;
pub mod users;

use axum::{Json, Router, response::IntoResponse, routing::get};
use serde_json::json;

use crate::state::AppState;

/// Prefix shared by every route of the service
pub const API_PREFIX: &str = "/workshift/api/v1";

/// Create the router for the accounts service
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health_check))
        .nest("/auth", auth::router(state.clone()))
        .nest("/users", users::router(state.clone()));

    Router::new().nest(API_PREFIX, api).with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "accounts-service"
    }))
}

use axum::{extract::State, Json};
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

use crate::models::HealthResponse;
use crate::state::AppState;

fn respond(app_state: &AppState, message: &str) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: message.to_string(),
        service: app_state.config.cloud_service_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}

/// Health check endpoint
pub async fn health_check(State(app_state): State<Arc<AppState>>) -> Json<HealthResponse> {
    debug!("Health check requested");
    respond(&app_state, "Server is running")
}

/// Readiness check endpoint
pub async fn ready_check(State(app_state): State<Arc<AppState>>) -> Json<HealthResponse> {
    debug!("Readiness check requested");
    // Everything lives in memory; once the router exists we can take connections.
    respond(&app_state, "Service is ready")
}

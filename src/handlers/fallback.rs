use axum::{http::{StatusCode, Uri}, Json};

use crate::models::ErrorResponse;

/// Catch-all for unknown routes
pub async fn not_found(uri: Uri) -> (StatusCode, Json<ErrorResponse>) {
    ErrorResponse::reply(StatusCode::NOT_FOUND, format!("Route '{}' not found", uri.path()))
}

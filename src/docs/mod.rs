use utoipa::OpenApi;
use crate::models::*;
use crate::ws::faults::FaultCounts;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Readiness check endpoint
#[utoipa::path(
    get,
    path = "/api/ready",
    responses(
        (status = 200, description = "Service is ready", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn ready_check_doc() {}

/// Connection, room and fault counters
#[utoipa::path(
    get,
    path = "/api/v1/diagnostics",
    responses(
        (status = 200, description = "Diagnostics snapshot", body = DiagnosticsResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

/// Current presence in a document room
#[utoipa::path(
    get,
    path = "/api/v1/rooms/{document_id}/presence",
    params(
        ("document_id" = String, Path, description = "Document (room) identifier")
    ),
    responses(
        (status = 200, description = "Members of the room, empty if nobody is there", body = PresenceSnapshot)
    )
)]
#[allow(dead_code)]
pub async fn room_presence_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        ready_check_doc,
        diagnostics_doc,
        room_presence_doc,
    ),
    components(
        schemas(HealthResponse, DiagnosticsResponse, FaultCounts, PresenceSnapshot, ActiveUser, ErrorResponse)
    ),
    tags(
        (name = "api", description = "API endpoints")
    )
)]
pub struct ApiDoc;

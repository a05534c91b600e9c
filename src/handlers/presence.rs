use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use tracing::debug;

use crate::models::PresenceSnapshot;
use crate::state::AppState;

/// Who is currently in a document room. An unknown room is simply empty.
pub async fn room_presence(
    State(app_state): State<Arc<AppState>>,
    Path(document_id): Path<String>,
) -> Json<PresenceSnapshot> {
    debug!("Presence requested for room '{}'", document_id);
    Json(app_state.rooms.snapshot(&document_id))
}

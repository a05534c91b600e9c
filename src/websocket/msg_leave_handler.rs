use tracing::debug;

use crate::error::PresenceError;
use crate::models::LeaveDocumentMessage;
use crate::websocket::router::EventRouter;
use crate::ws::connctx::ConnId;

impl EventRouter {
    /// Handle LeaveDocumentMessage
    pub(super) fn on_leave(&self, conn_id: ConnId, msg: LeaveDocumentMessage) -> Result<(), PresenceError> {
        let current = self.registry.room_of(conn_id)?;
        self.depart(&msg.document_id, conn_id);

        if current.as_deref() == Some(msg.document_id.as_str()) {
            self.registry.clear_room(conn_id)?;
        } else {
            debug!(
                "Connection {} left room '{}' it was not in (current: {:?})",
                conn_id, msg.document_id, current
            );
        }
        Ok(())
    }
}

use tracing::trace;

use crate::error::PresenceError;
use crate::models::{CursorPositionMessage, CursorUpdatedMessage, SendMessage};
use crate::websocket::router::EventRouter;
use crate::ws::connctx::ConnId;

impl EventRouter {
    /// Handle CursorPositionMessage
    pub(super) fn on_cursor(&self, conn_id: ConnId, msg: CursorPositionMessage) -> Result<(), PresenceError> {
        self.rooms.record_cursor(&msg.document_id, conn_id, &msg.position, |fanout| {
            trace!("Cursor move in room '{}' from {}", msg.document_id, conn_id);

            self.gateway.broadcast(
                &fanout.recipients,
                SendMessage::CursorUpdated(CursorUpdatedMessage {
                    document_id: msg.document_id.clone(),
                    position: msg.position.clone(),
                    user_id: fanout.sender.user_id.clone(),
                    user_name: fanout.sender.user_name.clone(),
                    socket_id: conn_id,
                    timestamp: self.clock.stamp(),
                }),
            );
        })?;
        Ok(())
    }
}

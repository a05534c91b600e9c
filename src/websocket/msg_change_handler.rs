use tracing::debug;

use crate::error::PresenceError;
use crate::models::{DocumentChangeMessage, DocumentUpdatedMessage, SendMessage};
use crate::websocket::router::EventRouter;
use crate::ws::connctx::ConnId;

impl EventRouter {
    /// Handle DocumentChangeMessage - Check membership and relay
    pub(super) fn on_change(&self, conn_id: ConnId, msg: DocumentChangeMessage) -> Result<(), PresenceError> {
        let DocumentChangeMessage {
            document_id,
            changes,
            user_id: claimed,
        } = msg;

        self.rooms.record_change(&document_id, conn_id, |fanout| {
            if let Some(claimed) = claimed.as_deref().filter(|id| *id != fanout.sender.user_id) {
                debug!(
                    "Connection {} claims user '{}' but joined as '{}'",
                    conn_id, claimed, fanout.sender.user_id
                );
            }
            debug!(
                "Relaying change in room '{}' from {} to {} peers",
                document_id,
                conn_id,
                fanout.recipients.len()
            );

            self.gateway.broadcast(
                &fanout.recipients,
                SendMessage::DocumentUpdated(DocumentUpdatedMessage {
                    document_id: document_id.clone(),
                    changes,
                    user_id: fanout.sender.user_id.clone(),
                    timestamp: self.clock.stamp(),
                }),
            );
        })?;
        Ok(())
    }
}

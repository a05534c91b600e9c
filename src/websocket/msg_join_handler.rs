use std::sync::Arc;
use tracing::info;

use crate::error::PresenceError;
use crate::models::{JoinDocumentMessage, PresenceChangeMessage, PresenceSnapshotMessage, SendMessage};
use crate::websocket::router::EventRouter;
use crate::ws::connctx::{ConnId, UserIdentity};

impl EventRouter {
    /// Handle JoinDocumentMessage
    pub(super) fn on_join(&self, conn_id: ConnId, msg: JoinDocumentMessage) -> Result<(), PresenceError> {
        if msg.document_id.is_empty() {
            return Err(PresenceError::EmptyDocumentId);
        }

        let identity = UserIdentity {
            user_id: msg.user_id,
            user_name: msg.user_name,
        };

        // A connection is in at most one room: joining elsewhere leaves the old one.
        let previous = self.registry.set_room(conn_id, &msg.document_id, identity.clone())?;
        if let Some(previous) = previous.filter(|room| *room != msg.document_id) {
            info!(
                "Connection {} moving from room '{}' to '{}'",
                conn_id, previous, msg.document_id
            );
            self.depart(&previous, conn_id);
        }

        // Peers and joiner are notified before the room is unlocked, so a
        // concurrent join cannot slip a newer member list in ahead of this one.
        self.rooms.join(&msg.document_id, conn_id, &identity, |snapshot| {
            let timestamp = self.clock.stamp();

            self.gateway.broadcast(
                &snapshot.recipients_except(conn_id),
                SendMessage::UserJoined(PresenceChangeMessage {
                    document_id: msg.document_id.clone(),
                    user_id: identity.user_id.clone(),
                    user_name: identity.user_name.clone(),
                    active_users: snapshot.active_users.clone(),
                    timestamp,
                }),
            );

            // The joiner gets the snapshot directly, never as a broadcast.
            self.gateway.send(
                conn_id,
                Arc::new(SendMessage::PresenceSnapshot(PresenceSnapshotMessage {
                    document_id: msg.document_id.clone(),
                    active_users: snapshot.active_users.clone(),
                    timestamp,
                })),
            );
        });
        Ok(())
    }
}

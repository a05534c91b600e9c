use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

use crate::error::PresenceError;
use crate::models::{PingMessage, PongMessage, SendMessage};
use crate::websocket::router::EventRouter;
use crate::ws::connctx::ConnId;

impl EventRouter {
    /// Handle PingMessage - reply with a pong to the sender only.
    pub(super) fn on_ping(&self, conn_id: ConnId, _msg: PingMessage) -> Result<(), PresenceError> {
        debug!("Ping received from connection {}", conn_id);
        self.registry.room_of(conn_id)?;

        let pong = SendMessage::Pong(PongMessage {
            date: Utc::now().to_rfc3339(),
        });
        self.gateway.send(conn_id, Arc::new(pong));
        Ok(())
    }
}

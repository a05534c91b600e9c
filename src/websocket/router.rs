use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::PresenceError;
use crate::models::{PresenceChangeMessage, ReceivedMessage, SendMessage};
use crate::utils::clock::EventClock;
use crate::websocket::gateway::Gateway;
use crate::ws::connctx::{ConnId, ConnectionRegistry};
use crate::ws::faults::{FaultKind, Faults};
use crate::ws::roomctx::RoomManager;

/// Turns inbound client events into registry/room calls and outbound
/// broadcasts. The only component that talks to both the registry and the
/// room manager.
///
/// Every method is synchronous: no lock is held across an await point, and a
/// connection's events are handled strictly in the order its read loop
/// delivers them.
pub struct EventRouter {
    pub(super) registry: Arc<ConnectionRegistry>,
    pub(super) rooms: Arc<RoomManager>,
    pub(super) gateway: Arc<Gateway>,
    pub(super) faults: Arc<Faults>,
    pub(super) clock: EventClock,
}

impl EventRouter {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        rooms: Arc<RoomManager>,
        gateway: Arc<Gateway>,
        faults: Arc<Faults>,
    ) -> Self {
        Self {
            registry,
            rooms,
            gateway,
            faults,
            clock: EventClock::new(),
        }
    }

    /// Parse and dispatch one text frame. Frames that do not parse are
    /// logged and dropped.
    pub fn handle_text(&self, conn_id: ConnId, text: &str) {
        match serde_json::from_str::<ReceivedMessage>(text) {
            Ok(msg) => self.dispatch(conn_id, msg),
            Err(e) => {
                warn!("Dropping malformed frame from connection {}: {}", conn_id, e);
                self.faults.record(FaultKind::MalformedFrame);
            }
        }
    }

    pub fn dispatch(&self, conn_id: ConnId, msg: ReceivedMessage) {
        let result = match msg {
            ReceivedMessage::JoinDocument(msg) => self.on_join(conn_id, msg),
            ReceivedMessage::LeaveDocument(msg) => self.on_leave(conn_id, msg),
            ReceivedMessage::DocumentChange(msg) => self.on_change(conn_id, msg),
            ReceivedMessage::CursorPosition(msg) => self.on_cursor(conn_id, msg),
            ReceivedMessage::Ping(msg) => self.on_ping(conn_id, msg),
        };
        if let Err(e) = result {
            self.ignore(conn_id, e);
        }
    }

    /// The connection is gone: drop its queue, unregister it and leave
    /// whatever room it held.
    pub fn handle_disconnect(&self, conn_id: ConnId) {
        self.gateway.release(conn_id);
        let Some(ctx) = self.registry.unregister(conn_id) else {
            return;
        };

        let user = ctx
            .identity
            .map(|identity| identity.user_name)
            .unwrap_or_else(|| "anonymous".to_string());
        info!(
            "Connection {} ({}) closed after {}s",
            conn_id,
            user,
            (Utc::now() - ctx.connected_at).num_seconds()
        );
        match ctx.room_id {
            Some(room_id) => self.depart(&room_id, conn_id),
            None => debug!("Connection {} closed outside any room", conn_id),
        }
    }

    fn ignore(&self, conn_id: ConnId, err: PresenceError) {
        warn!("Ignoring event from connection {}: {}", conn_id, err);
        self.faults.record(err.fault_kind());
    }

    /// Remove the connection from a room and tell whoever is left.
    pub(super) fn depart(&self, room_id: &str, conn_id: ConnId) {
        self.rooms.leave(room_id, conn_id, |left, remaining| {
            self.gateway.broadcast(
                &remaining.recipients_except(conn_id),
                SendMessage::UserLeft(PresenceChangeMessage {
                    document_id: room_id.to_string(),
                    user_id: left.user_id.clone(),
                    user_name: left.user_name.clone(),
                    active_users: remaining.active_users.clone(),
                    timestamp: self.clock.stamp(),
                }),
            );
        });
    }
}

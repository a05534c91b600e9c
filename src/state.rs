use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::Config;
use crate::websocket::{EventRouter, Gateway};
use crate::ws::connctx::ConnectionRegistry;
use crate::ws::faults::Faults;
use crate::ws::roomctx::RoomManager;

/// Shared state handed to every HTTP and WebSocket handler.
pub struct AppState {
    pub config: Config,
    pub registry: Arc<ConnectionRegistry>,
    pub rooms: Arc<RoomManager>,
    pub gateway: Arc<Gateway>,
    pub faults: Arc<Faults>,
    pub router: Arc<EventRouter>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: Config) -> Arc<Self> {
        let registry = Arc::new(ConnectionRegistry::new());
        let rooms = Arc::new(RoomManager::new());
        let faults = Arc::new(Faults::new());
        let gateway = Arc::new(Gateway::new(
            registry.clone(),
            faults.clone(),
            config.outbound_queue_capacity,
        ));
        let router = Arc::new(EventRouter::new(
            registry.clone(),
            rooms.clone(),
            gateway.clone(),
            faults.clone(),
        ));

        Arc::new(Self {
            config,
            registry,
            rooms,
            gateway,
            faults,
            router,
            started_at: Utc::now(),
        })
    }
}

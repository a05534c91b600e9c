use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::PresenceError;

/// Opaque connection identifier, assigned once at accept time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnId(Uuid);

impl ConnId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identity claims a client supplies on join. Trusted as-is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserIdentity {
    pub user_id: String,
    pub user_name: String,
}

#[derive(Clone, Debug)]
pub struct ConnCtx {
    pub conn_id: ConnId,
    pub connected_at: DateTime<Utc>,
    pub room_id: Option<String>,
    pub identity: Option<UserIdentity>,
}

/// Which connection is this, and what room (if any) is it in.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    conns: Mutex<HashMap<ConnId, ConnCtx>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ConnId, ConnCtx>> {
        self.conns.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, conn_id: ConnId) -> Result<(), PresenceError> {
        let mut conns = self.lock();
        if conns.contains_key(&conn_id) {
            return Err(PresenceError::DuplicateConnection(conn_id));
        }
        conns.insert(
            conn_id,
            ConnCtx {
                conn_id,
                connected_at: Utc::now(),
                room_id: None,
                identity: None,
            },
        );
        info!("Connection {} registered ({} open)", conn_id, conns.len());
        Ok(())
    }

    /// Record the connection's current room and identity, returning the room
    /// it was in before (if any).
    pub fn set_room(
        &self,
        conn_id: ConnId,
        room_id: &str,
        identity: UserIdentity,
    ) -> Result<Option<String>, PresenceError> {
        let mut conns = self.lock();
        let ctx = conns
            .get_mut(&conn_id)
            .ok_or(PresenceError::UnknownConnection(conn_id))?;
        ctx.identity = Some(identity);
        let previous = ctx.room_id.replace(room_id.to_string());
        debug!("Connection {} now in room '{}' (was {:?})", conn_id, room_id, previous);
        Ok(previous)
    }

    /// Mark the connection as belonging to no room, returning the room it left.
    pub fn clear_room(&self, conn_id: ConnId) -> Result<Option<String>, PresenceError> {
        let mut conns = self.lock();
        let ctx = conns
            .get_mut(&conn_id)
            .ok_or(PresenceError::UnknownConnection(conn_id))?;
        Ok(ctx.room_id.take())
    }

    pub fn room_of(&self, conn_id: ConnId) -> Result<Option<String>, PresenceError> {
        self.lock()
            .get(&conn_id)
            .map(|ctx| ctx.room_id.clone())
            .ok_or(PresenceError::UnknownConnection(conn_id))
    }

    pub fn get(&self, conn_id: ConnId) -> Option<ConnCtx> {
        self.lock().get(&conn_id).cloned()
    }

    /// Remove the connection and hand back its last context, room included.
    /// Unregistering an unknown id is a no-op.
    pub fn unregister(&self, conn_id: ConnId) -> Option<ConnCtx> {
        let mut conns = self.lock();
        let ctx = conns.remove(&conn_id)?;
        info!("Connection {} unregistered ({} open)", conn_id, conns.len());
        Some(ctx)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

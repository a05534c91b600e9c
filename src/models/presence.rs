use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::ws::connctx::ConnId;

/// One presence entry in a room.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActiveUser {
    pub user_id: String,
    pub user_name: String,
    #[schema(value_type = String)]
    pub socket_id: ConnId,
    pub joined_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    /// Last cursor position reported by this connection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub cursor: Option<Value>,
}

/// Everyone currently in a room, in join order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PresenceSnapshot {
    pub document_id: String,
    pub active_users: Vec<ActiveUser>,
}

impl PresenceSnapshot {
    pub fn empty(document_id: &str) -> Self {
        Self {
            document_id: document_id.to_string(),
            active_users: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.active_users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active_users.is_empty()
    }

    pub fn contains(&self, conn_id: ConnId) -> bool {
        self.active_users.iter().any(|u| u.socket_id == conn_id)
    }

    /// Connection ids of every member except `exclude`.
    pub fn recipients_except(&self, exclude: ConnId) -> Vec<ConnId> {
        self.active_users
            .iter()
            .map(|u| u.socket_id)
            .filter(|id| *id != exclude)
            .collect()
    }
}

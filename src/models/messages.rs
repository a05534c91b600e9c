use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::ActiveUser;
use crate::ws::connctx::ConnId;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JoinDocumentMessage {
    pub document_id: String,
    pub user_id: String,
    pub user_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaveDocumentMessage {
    pub document_id: String,
}

/// `changes` is relayed verbatim; it is never inspected.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentChangeMessage {
    pub document_id: String,
    pub changes: Value,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CursorPositionMessage {
    pub document_id: String,
    pub position: Value,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PingMessage {}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ReceivedMessage {
    #[serde(rename = "join-document")]
    JoinDocument(JoinDocumentMessage),
    #[serde(rename = "leave-document")]
    LeaveDocument(LeaveDocumentMessage),
    #[serde(rename = "document-change")]
    DocumentChange(DocumentChangeMessage),
    #[serde(rename = "cursor-position")]
    CursorPosition(CursorPositionMessage),
    #[serde(rename = "ping")]
    Ping(PingMessage),
}

/// Body of `user-joined` and `user-left`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PresenceChangeMessage {
    pub document_id: String,
    pub user_id: String,
    pub user_name: String,
    pub active_users: Vec<ActiveUser>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PresenceSnapshotMessage {
    pub document_id: String,
    pub active_users: Vec<ActiveUser>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUpdatedMessage {
    pub document_id: String,
    pub changes: Value,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CursorUpdatedMessage {
    pub document_id: String,
    pub position: Value,
    pub user_id: String,
    pub user_name: String,
    pub socket_id: ConnId,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PongMessage {
    pub date: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum SendMessage {
    #[serde(rename = "user-joined")]
    UserJoined(PresenceChangeMessage),
    #[serde(rename = "user-left")]
    UserLeft(PresenceChangeMessage),
    #[serde(rename = "presence-snapshot")]
    PresenceSnapshot(PresenceSnapshotMessage),
    #[serde(rename = "document-updated")]
    DocumentUpdated(DocumentUpdatedMessage),
    #[serde(rename = "cursor-updated")]
    CursorUpdated(CursorUpdatedMessage),
    #[serde(rename = "pong")]
    Pong(PongMessage),
}

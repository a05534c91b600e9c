use thiserror::Error;

use crate::ws::connctx::ConnId;
use crate::ws::faults::FaultKind;

/// Faults raised by the registry and room manager.
///
/// None of these ever reach a client: the event router logs them, counts them
/// and carries on with the next frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PresenceError {
    #[error("connection {0} is already registered")]
    DuplicateConnection(ConnId),

    #[error("connection {0} is not registered")]
    UnknownConnection(ConnId),

    #[error("connection {conn_id} is not a member of room '{room_id}'")]
    NotAMember { room_id: String, conn_id: ConnId },

    #[error("document id must not be empty")]
    EmptyDocumentId,
}

impl PresenceError {
    pub fn fault_kind(&self) -> FaultKind {
        match self {
            PresenceError::DuplicateConnection(_) => FaultKind::DuplicateConnection,
            PresenceError::UnknownConnection(_) => FaultKind::UnknownConnection,
            PresenceError::NotAMember { .. } => FaultKind::NotAMember,
            PresenceError::EmptyDocumentId => FaultKind::MalformedFrame,
        }
    }
}

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use utoipa::ToSchema;

/// Faults that are logged and then deliberately ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaultKind {
    MalformedFrame,
    UnknownConnection,
    NotAMember,
    DuplicateConnection,
    QueueOverflow,
    SendToClosed,
}

/// Counters for every ignored fault, reported by the diagnostics endpoint.
#[derive(Debug, Default)]
pub struct Faults {
    malformed_frame: AtomicU64,
    unknown_connection: AtomicU64,
    not_a_member: AtomicU64,
    duplicate_connection: AtomicU64,
    queue_overflow: AtomicU64,
    send_to_closed: AtomicU64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct FaultCounts {
    pub malformed_frame: u64,
    pub unknown_connection: u64,
    pub not_a_member: u64,
    pub duplicate_connection: u64,
    pub queue_overflow: u64,
    pub send_to_closed: u64,
}

impl Faults {
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&self, kind: FaultKind) -> &AtomicU64 {
        match kind {
            FaultKind::MalformedFrame => &self.malformed_frame,
            FaultKind::UnknownConnection => &self.unknown_connection,
            FaultKind::NotAMember => &self.not_a_member,
            FaultKind::DuplicateConnection => &self.duplicate_connection,
            FaultKind::QueueOverflow => &self.queue_overflow,
            FaultKind::SendToClosed => &self.send_to_closed,
        }
    }

    pub fn record(&self, kind: FaultKind) {
        self.counter(kind).fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self, kind: FaultKind) -> u64 {
        self.counter(kind).load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> FaultCounts {
        FaultCounts {
            malformed_frame: self.count(FaultKind::MalformedFrame),
            unknown_connection: self.count(FaultKind::UnknownConnection),
            not_a_member: self.count(FaultKind::NotAMember),
            duplicate_connection: self.count(FaultKind::DuplicateConnection),
            queue_overflow: self.count(FaultKind::QueueOverflow),
            send_to_closed: self.count(FaultKind::SendToClosed),
        }
    }
}

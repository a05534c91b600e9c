use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::PresenceError;
use crate::models::SendMessage;
use crate::ws::connctx::{ConnId, ConnectionRegistry};
use crate::ws::faults::{FaultKind, Faults};

/// Outbound events are shared between all recipients of a broadcast.
pub type Outbound = Arc<SendMessage>;

/// What happened to a single `send`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    /// The connection is already gone. Expected when a broadcast races a
    /// disconnect.
    Closed,
    /// The recipient's queue was full; it has been evicted.
    Overflowed,
}

/// Handles given to the socket task for a newly accepted connection.
#[derive(Debug)]
pub struct Attachment {
    pub conn_id: ConnId,
    /// Events to write to the socket, in order.
    pub outbound: mpsc::Receiver<Outbound>,
    /// Resolves once the gateway has dropped this connection's queue.
    pub evicted: oneshot::Receiver<()>,
}

#[derive(Debug)]
struct Outbox {
    tx: mpsc::Sender<Outbound>,
    _evict: oneshot::Sender<()>,
}

/// Per-connection outbound queues.
///
/// Sends never wait: a full queue gets its connection evicted instead of
/// stalling the broadcaster.
#[derive(Debug)]
pub struct Gateway {
    registry: Arc<ConnectionRegistry>,
    faults: Arc<Faults>,
    queue_capacity: usize,
    outboxes: Mutex<HashMap<ConnId, Outbox>>,
}

impl Gateway {
    pub fn new(registry: Arc<ConnectionRegistry>, faults: Arc<Faults>, queue_capacity: usize) -> Self {
        Self {
            registry,
            faults,
            queue_capacity: queue_capacity.max(1),
            outboxes: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ConnId, Outbox>> {
        self.outboxes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a fresh connection and open its outbound queue.
    pub fn accept(&self) -> Result<Attachment, PresenceError> {
        self.attach(ConnId::new())
    }

    pub fn attach(&self, conn_id: ConnId) -> Result<Attachment, PresenceError> {
        self.registry.register(conn_id)?;
        let (tx, outbound) = mpsc::channel(self.queue_capacity);
        let (evict_tx, evicted) = oneshot::channel();
        self.lock().insert(
            conn_id,
            Outbox {
                tx,
                _evict: evict_tx,
            },
        );
        Ok(Attachment {
            conn_id,
            outbound,
            evicted,
        })
    }

    pub fn send(&self, conn_id: ConnId, msg: Outbound) -> Delivery {
        let mut outboxes = self.lock();
        self.deliver(&mut outboxes, conn_id, msg)
    }

    /// Queue one event for every recipient. Returns how many accepted it.
    pub fn broadcast(&self, recipients: &[ConnId], msg: SendMessage) -> usize {
        if recipients.is_empty() {
            return 0;
        }
        let msg = Arc::new(msg);
        let mut outboxes = self.lock();
        recipients
            .iter()
            .filter(|conn_id| self.deliver(&mut outboxes, **conn_id, msg.clone()) == Delivery::Queued)
            .count()
    }

    fn deliver(&self, outboxes: &mut HashMap<ConnId, Outbox>, conn_id: ConnId, msg: Outbound) -> Delivery {
        let Some(outbox) = outboxes.get(&conn_id) else {
            debug!("Dropping event for closed connection {}", conn_id);
            self.faults.record(FaultKind::SendToClosed);
            return Delivery::Closed;
        };

        match outbox.tx.try_send(msg) {
            Ok(()) => Delivery::Queued,
            Err(TrySendError::Full(_)) => {
                outboxes.remove(&conn_id);
                warn!(
                    "Outbound queue for connection {} is full ({} events), evicting it",
                    conn_id, self.queue_capacity
                );
                self.faults.record(FaultKind::QueueOverflow);
                Delivery::Overflowed
            }
            Err(TrySendError::Closed(_)) => {
                outboxes.remove(&conn_id);
                debug!("Writer for connection {} has stopped", conn_id);
                self.faults.record(FaultKind::SendToClosed);
                Delivery::Closed
            }
        }
    }

    /// Forget the connection's queue. Safe to call more than once.
    pub fn release(&self, conn_id: ConnId) {
        self.lock().remove(&conn_id);
    }

    pub fn is_attached(&self, conn_id: ConnId) -> bool {
        self.lock().contains_key(&conn_id)
    }

    pub fn open_queues(&self) -> usize {
        self.lock().len()
    }
}

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

use crate::error::PresenceError;
use crate::models::{ActiveUser, PresenceSnapshot};
use crate::ws::connctx::{ConnId, UserIdentity};

/// Lifecycle of a single room. An empty room has no entry in the map, so
/// there is nothing in between.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoomState {
    Absent,
    Active { members: usize, opened_at: DateTime<Utc> },
}

#[derive(Debug)]
struct Room {
    opened_at: DateTime<Utc>,
    /// Join order. Rooms hold a handful of members, so a linear scan is fine.
    members: Vec<ActiveUser>,
}

impl Room {
    fn position(&self, conn_id: ConnId) -> Option<usize> {
        self.members.iter().position(|m| m.socket_id == conn_id)
    }

    fn snapshot(&self, room_id: &str) -> PresenceSnapshot {
        PresenceSnapshot {
            document_id: room_id.to_string(),
            active_users: self.members.clone(),
        }
    }
}

/// Result of a leave: who left (if anyone) and who is still there.
#[derive(Clone, Debug, PartialEq)]
pub struct Departure {
    pub left: Option<ActiveUser>,
    pub remaining: PresenceSnapshot,
}

/// Sender of a relayed event and every other member who should receive it.
#[derive(Clone, Debug, PartialEq)]
pub struct Fanout {
    pub sender: ActiveUser,
    pub recipients: Vec<ConnId>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RoomStats {
    pub rooms: usize,
    pub members: usize,
}

/// Presence bookkeeping for every document room.
///
/// All access goes through the methods below; each one takes the map lock,
/// mutates plain in-memory data and releases it before returning.
///
/// The mutating methods take a `notify` callback that runs while the lock is
/// still held. Events queued from it reach every member in the same order the
/// room changed. It must not block or call back into the manager.
#[derive(Debug, Default)]
pub struct RoomManager {
    rooms: Mutex<HashMap<String, Room>>,
}

impl RoomManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Room>> {
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add or refresh a member and return the full member list, joiner included.
    pub fn join(
        &self,
        room_id: &str,
        conn_id: ConnId,
        identity: &UserIdentity,
        notify: impl FnOnce(&PresenceSnapshot),
    ) -> PresenceSnapshot {
        let mut rooms = self.lock();
        let now = Utc::now();
        let room = rooms.entry(room_id.to_string()).or_insert_with(|| {
            info!("Room '{}' opened", room_id);
            Room {
                opened_at: now,
                members: Vec::new(),
            }
        });

        match room.position(conn_id) {
            Some(idx) => {
                let member = &mut room.members[idx];
                member.user_id = identity.user_id.clone();
                member.user_name = identity.user_name.clone();
                member.last_activity_at = now;
                debug!("Connection {} re-joined room '{}'", conn_id, room_id);
            }
            None => {
                room.members.push(ActiveUser {
                    user_id: identity.user_id.clone(),
                    user_name: identity.user_name.clone(),
                    socket_id: conn_id,
                    joined_at: now,
                    last_activity_at: now,
                    cursor: None,
                });
                info!(
                    "User {} ({}) joined room '{}' ({} present)",
                    identity.user_name,
                    identity.user_id,
                    room_id,
                    room.members.len()
                );
            }
        }

        let snapshot = room.snapshot(room_id);
        debug_assert!(invariants_hold(&rooms));
        notify(&snapshot);
        snapshot
    }

    /// Remove a member. Leaving a room that does not exist, or that the
    /// connection was never in, leaves everything untouched. `notify` only
    /// runs when someone actually left.
    pub fn leave(
        &self,
        room_id: &str,
        conn_id: ConnId,
        notify: impl FnOnce(&ActiveUser, &PresenceSnapshot),
    ) -> Departure {
        let mut rooms = self.lock();
        let Some(room) = rooms.get_mut(room_id) else {
            return Departure {
                left: None,
                remaining: PresenceSnapshot::empty(room_id),
            };
        };

        let left = room.position(conn_id).map(|idx| room.members.remove(idx));
        let remaining = room.snapshot(room_id);

        if let Some(member) = &left {
            info!(
                "User {} ({}) left room '{}' ({} present)",
                member.user_name,
                member.user_id,
                room_id,
                remaining.len()
            );
        }
        if room.members.is_empty() {
            rooms.remove(room_id);
            info!("Room '{}' closed", room_id);
        }

        debug_assert!(invariants_hold(&rooms));
        if let Some(member) = &left {
            notify(member, &remaining);
        }
        Departure { left, remaining }
    }

    /// Validate the sender of a document change and list who should get it.
    /// The payload itself never passes through here.
    pub fn record_change(
        &self,
        room_id: &str,
        conn_id: ConnId,
        notify: impl FnOnce(&Fanout),
    ) -> Result<Fanout, PresenceError> {
        self.touch(room_id, conn_id, |_| {}, notify)
    }

    /// Same contract as [`record_change`](Self::record_change), and remembers
    /// the position so later snapshots carry it.
    pub fn record_cursor(
        &self,
        room_id: &str,
        conn_id: ConnId,
        position: &Value,
        notify: impl FnOnce(&Fanout),
    ) -> Result<Fanout, PresenceError> {
        self.touch(
            room_id,
            conn_id,
            |member| member.cursor = Some(position.clone()),
            notify,
        )
    }

    fn touch(
        &self,
        room_id: &str,
        conn_id: ConnId,
        update: impl FnOnce(&mut ActiveUser),
        notify: impl FnOnce(&Fanout),
    ) -> Result<Fanout, PresenceError> {
        let mut rooms = self.lock();
        let not_a_member = || PresenceError::NotAMember {
            room_id: room_id.to_string(),
            conn_id,
        };
        let room = rooms.get_mut(room_id).ok_or_else(not_a_member)?;
        let idx = room.position(conn_id).ok_or_else(not_a_member)?;

        let member = &mut room.members[idx];
        member.last_activity_at = Utc::now();
        update(member);
        let sender = member.clone();

        let recipients = room
            .members
            .iter()
            .map(|m| m.socket_id)
            .filter(|id| *id != conn_id)
            .collect();
        let fanout = Fanout { sender, recipients };
        notify(&fanout);
        Ok(fanout)
    }

    pub fn snapshot(&self, room_id: &str) -> PresenceSnapshot {
        self.lock()
            .get(room_id)
            .map(|room| room.snapshot(room_id))
            .unwrap_or_else(|| PresenceSnapshot::empty(room_id))
    }

    pub fn state(&self, room_id: &str) -> RoomState {
        match self.lock().get(room_id) {
            Some(room) => RoomState::Active {
                members: room.members.len(),
                opened_at: room.opened_at,
            },
            None => RoomState::Absent,
        }
    }

    pub fn stats(&self) -> RoomStats {
        let rooms = self.lock();
        RoomStats {
            rooms: rooms.len(),
            members: rooms.values().map(|r| r.members.len()).sum(),
        }
    }

    /// Every room still satisfies: non-empty, no connection listed twice.
    pub fn check_invariants(&self) -> bool {
        invariants_hold(&self.lock())
    }
}

fn invariants_hold(rooms: &HashMap<String, Room>) -> bool {
    rooms.values().all(|room| {
        !room.members.is_empty()
            && room
                .members
                .iter()
                .enumerate()
                .all(|(i, m)| room.members[i + 1..].iter().all(|o| o.socket_id != m.socket_id))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ident(name: &str) -> UserIdentity {
        UserIdentity {
            user_id: format!("u-{}", name.to_lowercase()),
            user_name: name.to_string(),
        }
    }

    #[test]
    fn first_join_opens_room_and_includes_joiner() {
        let rooms = RoomManager::new();
        let a = ConnId::new();
        assert_eq!(rooms.state("doc-1"), RoomState::Absent);

        let snapshot = rooms.join("doc-1", a, &ident("Alice"), |_| {});
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains(a));
        assert!(matches!(rooms.state("doc-1"), RoomState::Active { members: 1, .. }));
    }

    #[test]
    fn join_is_idempotent_and_refreshes_metadata() {
        let rooms = RoomManager::new();
        let a = ConnId::new();
        rooms.join("doc-1", a, &ident("Alice"), |_| {});
        let snapshot = rooms.join(
            "doc-1",
            a,
            &UserIdentity {
                user_id: "u-alice".to_string(),
                user_name: "Alice Liddell".to_string(),
            },
            |_| {},
        );

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.active_users[0].user_name, "Alice Liddell");
        assert!(rooms.check_invariants());
    }

    #[test]
    fn snapshot_keeps_join_order() {
        let rooms = RoomManager::new();
        let (a, b, c) = (ConnId::new(), ConnId::new(), ConnId::new());
        rooms.join("doc-1", a, &ident("Alice"), |_| {});
        rooms.join("doc-1", b, &ident("Bob"), |_| {});
        rooms.join("doc-1", c, &ident("Carol"), |_| {});

        let names: Vec<_> = rooms
            .snapshot("doc-1")
            .active_users
            .into_iter()
            .map(|u| u.user_name)
            .collect();
        assert_eq!(names, vec!["Alice", "Bob", "Carol"]);
    }

    #[test]
    fn last_leave_closes_room() {
        let rooms = RoomManager::new();
        let a = ConnId::new();
        rooms.join("doc-3", a, &ident("Alice"), |_| {});

        let departure = rooms.leave("doc-3", a, |_, _| {});
        assert_eq!(departure.left.map(|m| m.socket_id), Some(a));
        assert!(departure.remaining.is_empty());
        assert_eq!(rooms.state("doc-3"), RoomState::Absent);
        assert!(rooms.snapshot("doc-3").is_empty());
        assert_eq!(rooms.stats(), RoomStats::default());
    }

    #[test]
    fn leaving_unknown_room_or_foreign_room_changes_nothing() {
        let rooms = RoomManager::new();
        let (a, b) = (ConnId::new(), ConnId::new());
        rooms.join("doc-1", a, &ident("Alice"), |_| {});

        let missing = rooms.leave("nowhere", a, |_, _| {});
        assert_eq!(missing.left, None);
        assert!(missing.remaining.is_empty());

        let stranger = rooms.leave("doc-1", b, |_, _| {});
        assert_eq!(stranger.left, None);
        assert_eq!(stranger.remaining.len(), 1);
        assert_eq!(rooms.snapshot("doc-1").len(), 1);
    }

    #[test]
    fn leave_notifies_only_when_someone_left() {
        let rooms = RoomManager::new();
        let (a, b) = (ConnId::new(), ConnId::new());
        rooms.join("doc-1", a, &ident("Alice"), |_| {});

        let mut calls = Vec::new();
        rooms.leave("doc-1", b, |_, _| calls.push("stranger"));
        rooms.leave("doc-1", a, |member, remaining| {
            assert_eq!(member.socket_id, a);
            assert!(remaining.is_empty());
            calls.push("alice");
        });
        rooms.leave("doc-1", a, |_, _| calls.push("again"));
        assert_eq!(calls, vec!["alice"]);
    }

    #[test]
    fn relay_recipients_exclude_sender() {
        let rooms = RoomManager::new();
        let (a, b, c) = (ConnId::new(), ConnId::new(), ConnId::new());
        rooms.join("doc-1", a, &ident("Alice"), |_| {});
        rooms.join("doc-1", b, &ident("Bob"), |_| {});
        rooms.join("doc-1", c, &ident("Carol"), |_| {});

        let fanout = rooms.record_change("doc-1", b, |_| {}).unwrap();
        assert_eq!(fanout.sender.user_name, "Bob");
        assert_eq!(fanout.recipients, vec![a, c]);

        let fanout = rooms.record_cursor("doc-1", a, &json!({"line": 1}), |_| {}).unwrap();
        assert_eq!(fanout.recipients, vec![b, c]);
    }

    #[test]
    fn non_member_cannot_relay() {
        let rooms = RoomManager::new();
        let (a, b) = (ConnId::new(), ConnId::new());
        rooms.join("doc-1", a, &ident("Alice"), |_| {});

        assert_eq!(
            rooms.record_change("doc-1", b, |_| {}),
            Err(PresenceError::NotAMember {
                room_id: "doc-1".to_string(),
                conn_id: b,
            })
        );
        assert!(matches!(
            rooms.record_cursor("doc-9", a, &json!({}), |_| {}),
            Err(PresenceError::NotAMember { .. })
        ));
    }

    #[test]
    fn cursor_is_remembered_in_snapshot() {
        let rooms = RoomManager::new();
        let a = ConnId::new();
        rooms.join("doc-1", a, &ident("Alice"), |_| {});
        rooms.record_cursor("doc-1", a, &json!({"line": 4, "ch": 2}), |_| {}).unwrap();

        let snapshot = rooms.snapshot("doc-1");
        assert_eq!(snapshot.active_users[0].cursor, Some(json!({"line": 4, "ch": 2})));
    }

    #[test]
    fn member_count_tracks_distinct_joins_minus_leaves() {
        let rooms = RoomManager::new();
        let conns: Vec<ConnId> = (0..6).map(|_| ConnId::new()).collect();

        for conn in &conns {
            rooms.join("doc-1", *conn, &ident("User"), |_| {});
            rooms.join("doc-1", *conn, &ident("User"), |_| {});
        }
        for conn in &conns[..4] {
            rooms.leave("doc-1", *conn, |_, _| {});
            rooms.leave("doc-1", *conn, |_, _| {});
        }

        assert_eq!(rooms.snapshot("doc-1").len(), 2);
        assert_eq!(rooms.stats(), RoomStats { rooms: 1, members: 2 });
        assert!(rooms.check_invariants());
    }
}

//! Connection and room bookkeeping.
//!
//! The registry owns every live connection and the table of auction rooms.
//! Both live behind a single lock so that join/leave, room destruction, and
//! broadcast snapshotting are mutually atomic: a broadcast never observes a
//! half-removed member, a connection is never in two rooms, and a room is
//! destroyed in the same critical section as the removal that emptied it.

use std::collections::{HashMap, HashSet};

use tokio::sync::{Mutex, mpsc};
use uuid::Uuid;

use gavel_shared::protocol::{ListingId, UserId};

/// Opaque handle for one live connection.
pub type ConnectionId = Uuid;

/// Outbound channel to one connection's WebSocket send task.
pub type OutboundSender = mpsc::UnboundedSender<String>;

/// Per-connection state. Owned exclusively by the registry; rooms hold only
/// the connection id, so removing a member never destroys the connection.
struct ConnectionEntry {
    sender: OutboundSender,
    user_id: Option<UserId>,
    room_id: Option<ListingId>,
    last_heartbeat_at: i64,
}

/// Subscriber set for one auction. Created on first join, destroyed the
/// moment membership reaches zero; rooms are transient, not auction state.
struct AuctionRoom {
    members: HashSet<ConnectionId>,
    last_update_at: i64,
    is_hot: bool,
}

struct RegistryInner {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    rooms: HashMap<ListingId, AuctionRoom>,
    /// Monotonic bid sequence per listing. Deliberately kept outside room
    /// lifetime: a room emptied and later re-joined must not restart
    /// numbering, or reconnecting clients would reject every newer delta.
    /// Entries are dropped when the auction ends.
    bid_seqs: HashMap<ListingId, u64>,
}

/// Aggregate counters exposed on the stats endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    pub total_connections: usize,
    pub active_rooms: usize,
    pub hot_auctions: usize,
}

/// Registry of all live connections and auction rooms.
pub struct ConnectionRegistry {
    inner: Mutex<RegistryInner>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                connections: HashMap::new(),
                rooms: HashMap::new(),
                bid_seqs: HashMap::new(),
            }),
        }
    }

    /// Register a freshly opened connection with no room or user tag.
    pub async fn register(&self, sender: OutboundSender, now: i64) -> ConnectionId {
        let id = Uuid::new_v4();
        let mut inner = self.inner.lock().await;
        inner.connections.insert(
            id,
            ConnectionEntry {
                sender,
                user_id: None,
                room_id: None,
                last_heartbeat_at: now,
            },
        );
        tracing::debug!("Connection {} registered", id);
        id
    }

    /// Remove a connection entirely. Also removes it from its room, if any,
    /// destroying the room when that removal empties it. Idempotent.
    pub async fn unregister(&self, id: ConnectionId) {
        let mut inner = self.inner.lock().await;
        Self::leave_room_locked(&mut inner, id);
        if inner.connections.remove(&id).is_some() {
            tracing::debug!("Connection {} unregistered", id);
        }
    }

    /// Tag a connection with a user identifier. Only ever called from an
    /// explicit `identify_user` message.
    pub async fn identify(&self, id: ConnectionId, user_id: UserId) {
        let mut inner = self.inner.lock().await;
        if let Some(entry) = inner.connections.get_mut(&id) {
            entry.user_id = Some(user_id);
            tracing::info!("Connection {} identified as user {}", id, user_id);
        }
    }

    /// Subscribe a connection to an auction room, creating the room on
    /// demand and leaving any prior room first. Joining is a set-insert, so
    /// repeated joins to the same room do not double-count.
    ///
    /// Returns the resulting member count, or `None` if the connection is no
    /// longer registered.
    pub async fn join(&self, id: ConnectionId, listing_id: ListingId, now: i64) -> Option<usize> {
        let mut inner = self.inner.lock().await;
        if !inner.connections.contains_key(&id) {
            return None;
        }

        // At most one room per connection.
        Self::leave_room_locked(&mut inner, id);

        let room = inner.rooms.entry(listing_id).or_insert_with(|| AuctionRoom {
            members: HashSet::new(),
            last_update_at: now,
            is_hot: false,
        });
        room.members.insert(id);
        let count = room.members.len();

        if let Some(entry) = inner.connections.get_mut(&id) {
            entry.room_id = Some(listing_id);
        }

        tracing::info!(
            "Connection {} joined auction {} ({} subscribed)",
            id,
            listing_id,
            count
        );
        Some(count)
    }

    /// Unsubscribe a connection from its room. Leaving while not in any room
    /// is a no-op, not an error.
    pub async fn leave(&self, id: ConnectionId) {
        let mut inner = self.inner.lock().await;
        Self::leave_room_locked(&mut inner, id);
    }

    /// Write one frame to a connection's outbound channel. Returns `false`
    /// when the connection is unknown or its channel is gone. The registry
    /// holds the only sender, so unregistering a connection closes the
    /// channel and with it the socket's send task.
    pub async fn send_to(&self, id: ConnectionId, frame: String) -> bool {
        let inner = self.inner.lock().await;
        match inner.connections.get(&id) {
            Some(entry) => entry.sender.send(frame).is_ok(),
            None => false,
        }
    }

    /// Record a liveness signal. Returns `false` for an unknown connection.
    pub async fn touch_heartbeat(&self, id: ConnectionId, now: i64) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.connections.get_mut(&id) {
            Some(entry) => {
                entry.last_heartbeat_at = now;
                true
            }
            None => false,
        }
    }

    /// Evict every connection whose last heartbeat is older than `timeout_ms`.
    /// Returns the evicted ids. Dropping an entry drops its outbound sender,
    /// which terminates that connection's send task and closes the socket.
    pub async fn sweep(&self, now: i64, timeout_ms: i64) -> Vec<ConnectionId> {
        let mut inner = self.inner.lock().await;
        let expired: Vec<ConnectionId> = inner
            .connections
            .iter()
            .filter(|(_, entry)| now - entry.last_heartbeat_at > timeout_ms)
            .map(|(id, _)| *id)
            .collect();

        for id in &expired {
            Self::leave_room_locked(&mut inner, *id);
            inner.connections.remove(id);
            tracing::info!("Connection {} evicted by heartbeat sweep", id);
        }
        expired
    }

    /// Snapshot of a room's members for fan-out. `None` when the room does
    /// not exist (nobody subscribed). The caller sends outside the lock and
    /// reports failures back through [`ConnectionRegistry::unregister`].
    pub async fn room_snapshot(
        &self,
        listing_id: ListingId,
    ) -> Option<Vec<(ConnectionId, OutboundSender)>> {
        let inner = self.inner.lock().await;
        let room = inner.rooms.get(&listing_id)?;
        Some(
            room.members
                .iter()
                .filter_map(|id| {
                    inner
                        .connections
                        .get(id)
                        .map(|entry| (*id, entry.sender.clone()))
                })
                .collect(),
        )
    }

    /// Snapshot of every connection tagged with `user_id`. A user may have
    /// several simultaneous sessions (tabs, devices); all are returned.
    pub async fn user_snapshot(&self, user_id: UserId) -> Vec<(ConnectionId, OutboundSender)> {
        let inner = self.inner.lock().await;
        inner
            .connections
            .iter()
            .filter(|(_, entry)| entry.user_id == Some(user_id))
            .map(|(id, entry)| (*id, entry.sender.clone()))
            .collect()
    }

    /// Flip the closing-minute flag on a room. Returns `false` when the room
    /// does not exist.
    pub async fn set_hot(&self, listing_id: ListingId, is_hot: bool) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.rooms.get_mut(&listing_id) {
            Some(room) => {
                room.is_hot = is_hot;
                true
            }
            None => false,
        }
    }

    /// Record broadcast activity on a room and hand out the next bid
    /// sequence number for the listing.
    pub async fn next_bid_seq(&self, listing_id: ListingId, now: i64) -> u64 {
        let mut inner = self.inner.lock().await;
        if let Some(room) = inner.rooms.get_mut(&listing_id) {
            room.last_update_at = now;
        }
        let seq = inner.bid_seqs.entry(listing_id).or_insert(0);
        *seq += 1;
        *seq
    }

    /// Drop the bid sequence counter once an auction has ended.
    pub async fn clear_bid_seq(&self, listing_id: ListingId) {
        let mut inner = self.inner.lock().await;
        inner.bid_seqs.remove(&listing_id);
    }

    /// Member count of a room, or `None` if the room does not exist.
    pub async fn room_member_count(&self, listing_id: ListingId) -> Option<usize> {
        let inner = self.inner.lock().await;
        inner.rooms.get(&listing_id).map(|room| room.members.len())
    }

    pub async fn stats(&self) -> RegistryStats {
        let inner = self.inner.lock().await;
        RegistryStats {
            total_connections: inner.connections.len(),
            active_rooms: inner.rooms.len(),
            hot_auctions: inner.rooms.values().filter(|room| room.is_hot).count(),
        }
    }

    /// Remove `id` from its current room inside an already-held lock,
    /// destroying the room if it becomes empty.
    fn leave_room_locked(inner: &mut RegistryInner, id: ConnectionId) {
        let Some(listing_id) = inner
            .connections
            .get_mut(&id)
            .and_then(|entry| entry.room_id.take())
        else {
            return;
        };

        if let Some(room) = inner.rooms.get_mut(&listing_id) {
            room.members.remove(&id);
            if room.members.is_empty() {
                inner.rooms.remove(&listing_id);
                tracing::debug!("Auction room {} emptied and destroyed", listing_id);
            }
        }
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

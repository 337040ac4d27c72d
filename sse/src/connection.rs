use crate::message::Frame;
use dashmap::DashMap;
use events::UserId;
use log::*;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;

/// Frames a connection may hold before further pushes fail. A client that
/// stops reading loses notifications instead of growing the queue.
pub const CONNECTION_BUFFER: usize = 64;

/// Unique identifier for a connection (server-generated, never reused).
///
/// Ids are handed out in increasing order, so ordering by id is the order in
/// which a user's connections were registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// One open server-to-client push channel bound to a single user.
#[derive(Debug)]
pub struct StreamConnection {
    id: ConnectionId,
    owner: UserId,
    sender: Sender<Frame>,
    closed: CancellationToken,
}

impl StreamConnection {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn owner(&self) -> UserId {
        self.owner
    }

    /// Queue a frame for the client. Never blocks; fails when the queue is
    /// full or the receiving side of the stream has gone away.
    pub fn push(&self, frame: Frame) -> Result<(), TrySendError<Frame>> {
        self.sender.try_send(frame)
    }

    /// True once the connection has been unregistered.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Resolves when the connection is unregistered.
    pub async fn closed(&self) {
        self.closed.cancelled().await
    }

    fn close(&self) {
        self.closed.cancel();
    }
}

/// Per-user index of live stream connections.
///
/// Each user's bucket is a `BTreeMap` keyed by `ConnectionId`: removal is by
/// identity and never reorders the remaining connections. `DashMap` shards
/// give writers exclusive access to a bucket while readers of other users'
/// buckets proceed concurrently.
pub struct ConnectionRegistry {
    next_id: AtomicU64,
    user_index: DashMap<UserId, BTreeMap<ConnectionId, Arc<StreamConnection>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            user_index: DashMap::new(),
        }
    }

    /// Register a new connection for `user_id` and return it.
    pub fn register(&self, user_id: UserId, sender: Sender<Frame>) -> Arc<StreamConnection> {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let connection = Arc::new(StreamConnection {
            id,
            owner: user_id,
            sender,
            closed: CancellationToken::new(),
        });

        self.user_index
            .entry(user_id)
            .or_default()
            .insert(id, Arc::clone(&connection));

        connection
    }

    /// Remove a connection and set its closed signal. Safe to call any number
    /// of times, including for connections that were never registered.
    ///
    /// Returns whether this call removed the connection.
    pub fn unregister(&self, connection: &StreamConnection) -> bool {
        let owner = connection.owner;

        let removed = match self.user_index.get_mut(&owner) {
            Some(mut bucket) => {
                let removed = bucket.remove(&connection.id).is_some();
                let now_empty = bucket.is_empty();
                // Release the shard lock before touching the map again
                drop(bucket);
                if now_empty {
                    self.user_index.remove_if(&owner, |_, bucket| bucket.is_empty());
                }
                removed
            }
            None => false,
        };

        // Signal only after removal so the index never holds a closed connection
        connection.close();

        if !removed {
            trace!("Connection {} for user {owner} was already unregistered", connection.id);
        }
        removed
    }

    /// Snapshot of the user's live connections in registration order.
    pub fn connections_for(&self, user_id: &UserId) -> Vec<Arc<StreamConnection>> {
        self.user_index
            .get(user_id)
            .map(|bucket| bucket.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn connection_count_for(&self, user_id: &UserId) -> usize {
        self.user_index
            .get(user_id)
            .map(|bucket| bucket.len())
            .unwrap_or(0)
    }

    pub fn total_connections(&self) -> usize {
        self.user_index.iter().map(|entry| entry.value().len()).sum()
    }

    /// Unregister every connection. Returns how many were closed.
    pub fn close_all(&self) -> usize {
        let all: Vec<Arc<StreamConnection>> = self
            .user_index
            .iter()
            .flat_map(|entry| entry.value().values().cloned().collect::<Vec<_>>())
            .collect();

        all.iter()
            .filter(|connection| self.unregister(connection))
            .count()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn sender() -> Sender<Frame> {
        let (tx, _rx) = mpsc::channel(CONNECTION_BUFFER);
        tx
    }

    #[test]
    fn count_tracks_registers_minus_effective_unregisters() {
        let registry = ConnectionRegistry::new();
        let a = registry.register(1, sender());
        let b = registry.register(1, sender());
        let c = registry.register(1, sender());
        assert_eq!(registry.connection_count_for(&1), 3);

        assert!(registry.unregister(&b));
        assert_eq!(registry.connection_count_for(&1), 2);

        assert!(registry.unregister(&a));
        assert!(registry.unregister(&c));
        assert_eq!(registry.connection_count_for(&1), 0);
    }

    #[test]
    fn unregistering_twice_is_a_no_op() {
        let registry = ConnectionRegistry::new();
        let keep = registry.register(1, sender());
        let gone = registry.register(1, sender());

        assert!(registry.unregister(&gone));
        assert!(!registry.unregister(&gone));

        assert_eq!(registry.connection_count_for(&1), 1);
        assert!(!keep.is_closed());
    }

    #[test]
    fn unregistering_a_connection_from_another_registry_is_a_no_op() {
        let registry = ConnectionRegistry::new();
        let other = ConnectionRegistry::new();
        registry.register(5, sender());
        let stranger = other.register(5, sender());

        assert!(!registry.unregister(&stranger));
        assert_eq!(registry.connection_count_for(&5), 1);
    }

    #[test]
    fn unknown_user_looks_like_an_empty_set() {
        let registry = ConnectionRegistry::new();
        assert_eq!(registry.connection_count_for(&42), 0);
        assert!(registry.connections_for(&42).is_empty());

        let only = registry.register(42, sender());
        registry.unregister(&only);

        assert_eq!(registry.connection_count_for(&42), 0);
        assert!(registry.connections_for(&42).is_empty());
    }

    #[test]
    fn removal_is_by_identity_and_preserves_order() {
        let registry = ConnectionRegistry::new();
        let first = registry.register(3, sender());
        let second = registry.register(3, sender());
        let third = registry.register(3, sender());

        registry.unregister(&first);

        let ids: Vec<ConnectionId> = registry
            .connections_for(&3)
            .iter()
            .map(|connection| connection.id())
            .collect();
        assert_eq!(ids, vec![second.id(), third.id()]);
    }

    #[test]
    fn unregister_sets_the_closed_signal() {
        let registry = ConnectionRegistry::new();
        let connection = registry.register(8, sender());
        assert!(!connection.is_closed());

        registry.unregister(&connection);

        assert!(connection.is_closed());
        assert_eq!(connection.owner(), 8);
    }

    #[test]
    fn users_are_partitioned() {
        let registry = ConnectionRegistry::new();
        let a = registry.register(1, sender());
        registry.register(2, sender());

        registry.unregister(&a);

        assert_eq!(registry.connection_count_for(&1), 0);
        assert_eq!(registry.connection_count_for(&2), 1);
        assert_eq!(registry.total_connections(), 1);
    }

    #[test]
    fn close_all_unregisters_every_connection() {
        let registry = ConnectionRegistry::new();
        let connections: Vec<_> = (0..4)
            .map(|i| registry.register(i % 2, sender()))
            .collect();

        assert_eq!(registry.close_all(), 4);
        assert_eq!(registry.total_connections(), 0);
        assert!(connections.iter().all(|connection| connection.is_closed()));
    }

    #[test]
    fn concurrent_register_and_unregister_settle_to_zero() {
        let registry = Arc::new(ConnectionRegistry::new());

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let connection = registry.register(worker % 3, sender());
                        assert!(registry.connection_count_for(&(worker % 3)) >= 1);
                        assert!(registry.unregister(&connection));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.total_connections(), 0);
    }
}

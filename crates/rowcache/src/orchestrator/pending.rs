//! Per-connection transaction state and deferred invalidation queues.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rowcache_core::ConnectionId;

use crate::tagger::Tag;

#[derive(Debug, Default)]
struct TransactionState {
    depth: usize,
    pending: BTreeSet<Tag>,
}

/// Open transactions and their queued invalidation tags, per connection.
///
/// Nesting is counted: only the outermost commit releases the queue, and only
/// the outermost rollback discards it. Tags queued inside a rolled-back inner
/// level stay queued, which can only over-invalidate.
#[derive(Debug, Default)]
pub struct TransactionRegistry {
    connections: Mutex<HashMap<ConnectionId, TransactionState>>,
}

impl TransactionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // The state is plain data and stays consistent even if a holder panicked
    fn lock(&self) -> MutexGuard<'_, HashMap<ConnectionId, TransactionState>> {
        self.connections.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a (possibly nested) transaction. Returns the new depth.
    pub fn begin(&self, connection: &ConnectionId) -> usize {
        let mut connections = self.lock();
        let state = connections.entry(connection.clone()).or_default();
        state.depth += 1;
        state.depth
    }

    /// Whether a transaction is open on `connection`.
    #[must_use]
    pub fn is_open(&self, connection: &ConnectionId) -> bool {
        self.depth(connection) > 0
    }

    /// Current nesting depth on `connection`.
    #[must_use]
    pub fn depth(&self, connection: &ConnectionId) -> usize {
        self.lock().get(connection).map_or(0, |state| state.depth)
    }

    /// Queue `tags` if a transaction is open on `connection`.
    ///
    /// Returns `false`, queuing nothing, when no transaction is open.
    pub fn enqueue(&self, connection: &ConnectionId, tags: &BTreeSet<Tag>) -> bool {
        let mut connections = self.lock();
        match connections.get_mut(connection) {
            Some(state) if state.depth > 0 => {
                state.pending.extend(tags.iter().cloned());
                true
            }
            _ => false,
        }
    }

    /// Close one level. Returns the queued tags once the outermost level
    /// commits, `None` while an outer level is still open.
    pub fn commit(&self, connection: &ConnectionId) -> Option<BTreeSet<Tag>> {
        let mut connections = self.lock();
        let state = connections.get_mut(connection)?;
        state.depth = state.depth.saturating_sub(1);
        if state.depth > 0 {
            return None;
        }
        connections.remove(connection).map(|state| state.pending)
    }

    /// Roll back one level. Returns the number of queued tags discarded,
    /// which is zero unless the outermost level rolled back.
    pub fn rollback(&self, connection: &ConnectionId) -> usize {
        let mut connections = self.lock();
        let Some(state) = connections.get_mut(connection) else {
            return 0;
        };
        state.depth = state.depth.saturating_sub(1);
        if state.depth > 0 {
            return 0;
        }
        connections.remove(connection).map_or(0, |state| state.pending.len())
    }

    /// Take the queued tags without changing the transaction depth.
    pub fn take_pending(&self, connection: &ConnectionId) -> BTreeSet<Tag> {
        let mut connections = self.lock();
        let Some(state) = connections.get_mut(connection) else {
            return BTreeSet::new();
        };
        let pending = std::mem::take(&mut state.pending);
        if state.depth == 0 {
            connections.remove(connection);
        }
        pending
    }

    /// Drop the queued tags without changing the transaction depth. Returns
    /// how many were dropped.
    pub fn discard_pending(&self, connection: &ConnectionId) -> usize {
        self.take_pending(connection).len()
    }
}

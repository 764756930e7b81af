//! In-process store backend.
//!
//! [`MemoryStore`] keeps values and sets in one keyspace behind a single
//! mutex, so every operation, `take_members` included, is atomic with respect
//! to every other. It is meant for tests, single-process deployments, and as
//! the reference the Redis backend is checked against.
//!
//! Expiry is lazy: a single-key operation drops only the key it touches when
//! that key has expired. Only [`KeyValueStore::scan_prefix`] and
//! [`MemoryStore::len`] sweep the whole keyspace.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::engine::{KeyValueStore, StorageError, StorageResult};

#[derive(Debug)]
enum Slot {
    Value { bytes: Vec<u8>, expires_at: Option<Instant> },
    Set(HashSet<String>),
}

impl Slot {
    fn is_expired(&self, now: Instant) -> bool {
        matches!(self, Self::Value { expires_at: Some(at), .. } if *at <= now)
    }
}

/// A thread-safe, in-process [`KeyValueStore`].
///
/// # Example
///
/// ```
/// use rowcache_storage::{KeyValueStore, MemoryStore};
///
/// let store = MemoryStore::new();
/// store.set("k", b"v", None).unwrap();
/// assert_eq!(store.get("k").unwrap(), Some(b"v".to_vec()));
///
/// // A connection-level prefix is applied to every key
/// let prefixed = MemoryStore::with_connection_prefix("app:");
/// prefixed.set("k", b"v", None).unwrap();
/// assert_eq!(prefixed.scan_prefix("").unwrap(), vec!["app:k".to_owned()]);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, Slot>>,
    connection_prefix: Option<String>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that prefixes every key with `prefix`.
    #[must_use]
    pub fn with_connection_prefix(prefix: impl Into<String>) -> Self {
        Self { slots: Mutex::new(HashMap::new()), connection_prefix: Some(prefix.into()) }
    }

    /// Number of live keys (values and sets).
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock()
            .map(|mut slots| {
                sweep(&mut slots);
                slots.len()
            })
            .unwrap_or(0)
    }

    /// Returns `true` if the store holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn raw_key(&self, key: &str) -> String {
        match &self.connection_prefix {
            Some(prefix) => format!("{prefix}{key}"),
            None => key.to_owned(),
        }
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, HashMap<String, Slot>>> {
        self.slots.lock().map_err(|e| StorageError::lock_poisoned(e.to_string()))
    }

    fn remove_keys(&self, keys: &[String]) -> StorageResult<usize> {
        let mut slots = self.lock()?;
        let now = Instant::now();
        Ok(keys
            .iter()
            .filter(|key| {
                slots.remove(&self.raw_key(key)).is_some_and(|slot| !slot.is_expired(now))
            })
            .count())
    }
}

/// Drop `raw` if it holds an expired value.
fn expire(slots: &mut HashMap<String, Slot>, raw: &str) {
    if slots.get(raw).is_some_and(|slot| slot.is_expired(Instant::now())) {
        slots.remove(raw);
    }
}

/// Drop every expired value.
fn sweep(slots: &mut HashMap<String, Slot>) {
    let now = Instant::now();
    slots.retain(|_, slot| !slot.is_expired(now));
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let raw = self.raw_key(key);
        let mut slots = self.lock()?;
        expire(&mut slots, &raw);
        match slots.get(&raw) {
            None => Ok(None),
            Some(Slot::Value { bytes, .. }) => Ok(Some(bytes.clone())),
            Some(Slot::Set(_)) => Err(StorageError::WrongType(raw)),
        }
    }

    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> StorageResult<()> {
        let raw = self.raw_key(key);
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.lock()?.insert(raw, Slot::Value { bytes: value.to_vec(), expires_at });
        Ok(())
    }

    fn exists(&self, key: &str) -> StorageResult<bool> {
        let raw = self.raw_key(key);
        let mut slots = self.lock()?;
        expire(&mut slots, &raw);
        Ok(slots.contains_key(&raw))
    }

    fn del(&self, keys: &[String]) -> StorageResult<usize> {
        self.remove_keys(keys)
    }

    fn unlink(&self, keys: &[String]) -> StorageResult<usize> {
        self.remove_keys(keys)
    }

    fn sadd(&self, set: &str, member: &str) -> StorageResult<bool> {
        let raw = self.raw_key(set);
        let mut slots = self.lock()?;
        expire(&mut slots, &raw);
        match slots.get_mut(&raw) {
            Some(Slot::Set(members)) => return Ok(members.insert(member.to_owned())),
            Some(Slot::Value { .. }) => return Err(StorageError::WrongType(raw)),
            None => {}
        }
        slots.insert(raw, Slot::Set(HashSet::from([member.to_owned()])));
        Ok(true)
    }

    fn smembers(&self, set: &str) -> StorageResult<Vec<String>> {
        let raw = self.raw_key(set);
        let mut slots = self.lock()?;
        expire(&mut slots, &raw);
        match slots.get(&raw) {
            None => Ok(Vec::new()),
            Some(Slot::Set(members)) => Ok(members.iter().cloned().collect()),
            Some(Slot::Value { .. }) => Err(StorageError::WrongType(raw)),
        }
    }

    fn srem(&self, set: &str, member: &str) -> StorageResult<bool> {
        let raw = self.raw_key(set);
        let mut slots = self.lock()?;
        expire(&mut slots, &raw);
        let (removed, now_empty) = match slots.get_mut(&raw) {
            None => return Ok(false),
            Some(Slot::Set(members)) => (members.remove(member), members.is_empty()),
            Some(Slot::Value { .. }) => return Err(StorageError::WrongType(raw)),
        };
        // Empty sets do not exist
        if now_empty {
            slots.remove(&raw);
        }
        Ok(removed)
    }

    fn take_members(&self, set: &str) -> StorageResult<Vec<String>> {
        let raw = self.raw_key(set);
        let mut slots = self.lock()?;
        expire(&mut slots, &raw);
        match slots.remove(&raw) {
            None => Ok(Vec::new()),
            Some(Slot::Set(members)) => Ok(members.into_iter().collect()),
            Some(value @ Slot::Value { .. }) => {
                slots.insert(raw.clone(), value);
                Err(StorageError::WrongType(raw))
            }
        }
    }

    fn scan_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let raw = self.raw_key(prefix);
        let mut slots = self.lock()?;
        sweep(&mut slots);
        Ok(slots.keys().filter(|key| key.starts_with(&raw)).cloned().collect())
    }

    fn connection_prefix(&self) -> Option<&str> {
        self.connection_prefix.as_deref()
    }
}

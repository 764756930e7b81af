//! The store capability trait.
//!
//! [`KeyValueStore`] lists exactly the primitives the cache needs from a
//! shared key/value + set store. Backends implement it directly; nothing is
//! forwarded dynamically to an underlying client.

use std::time::Duration;

use super::StorageResult;

/// A shared key/value and set store.
///
/// Implementations must be thread-safe (`Send + Sync`): one store is shared
/// by every reader and writer in the process, and usually by other processes
/// through the network.
///
/// # Connection-level prefixes
///
/// A backend may transparently prefix every key it is given (a
/// "connection-level" prefix, see [`KeyValueStore::connection_prefix`]). All
/// methods take and apply un-prefixed keys, except
/// [`KeyValueStore::scan_prefix`], which returns keys exactly as they exist in
/// the store. Callers that feed scanned keys back into other methods must
/// strip the connection prefix first, or the backend would apply it twice.
///
/// # Example
///
/// ```ignore
/// use rowcache_storage::KeyValueStore;
///
/// fn example<S: KeyValueStore>(store: &S) -> rowcache_storage::StorageResult<()> {
///     store.set("key", b"value", None)?;
///     store.sadd("tag", "key")?;
///
///     // Atomically read the members of the set and delete it
///     let members = store.take_members("tag")?;
///     assert_eq!(members, vec!["key".to_owned()]);
///     assert!(store.smembers("tag")?.is_empty());
///     Ok(())
/// }
/// ```
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key.
    ///
    /// Returns `Ok(None)` if the key does not exist or has expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached, or
    /// [`StorageError::WrongType`](super::StorageError::WrongType) if the key
    /// holds a set.
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Store a value, replacing any previous value and expiry.
    ///
    /// With `ttl` set the key expires after that duration; without it the key
    /// persists until deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached.
    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> StorageResult<()>;

    /// Check whether a key (value or set) exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached.
    fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Delete keys, blocking until the memory is reclaimed.
    ///
    /// Returns the number of keys that existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached.
    fn del(&self, keys: &[String]) -> StorageResult<usize>;

    /// Delete keys without waiting for the memory to be reclaimed.
    ///
    /// Returns the number of keys that existed. Backends without a
    /// non-blocking delete may fall back to [`KeyValueStore::del`].
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached or does not support
    /// non-blocking deletes.
    fn unlink(&self, keys: &[String]) -> StorageResult<usize>;

    /// Add a member to a set, creating the set if needed.
    ///
    /// Returns `true` if the member was not already present.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached or the key holds a value.
    fn sadd(&self, set: &str, member: &str) -> StorageResult<bool>;

    /// Read all members of a set. A missing set has no members.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached or the key holds a value.
    fn smembers(&self, set: &str) -> StorageResult<Vec<String>>;

    /// Remove a member from a set.
    ///
    /// Returns `true` if the member was present.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached or the key holds a value.
    fn srem(&self, set: &str, member: &str) -> StorageResult<bool>;

    /// Atomically read all members of a set and delete the set.
    ///
    /// No member added concurrently can be both missing from the returned
    /// snapshot and lost with the deleted set: it either lands in the snapshot
    /// or re-creates the set after the deletion.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached or the key holds a value.
    fn take_members(&self, set: &str) -> StorageResult<Vec<String>>;

    /// List every key that starts with `prefix`.
    ///
    /// `prefix` is un-prefixed like every other argument, but the returned
    /// keys include the connection-level prefix, exactly as stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached.
    fn scan_prefix(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// The prefix this backend applies to every key, if any.
    fn connection_prefix(&self) -> Option<&str> {
        None
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<S> {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> StorageResult<()> {
        (**self).set(key, value, ttl)
    }

    fn exists(&self, key: &str) -> StorageResult<bool> {
        (**self).exists(key)
    }

    fn del(&self, keys: &[String]) -> StorageResult<usize> {
        (**self).del(keys)
    }

    fn unlink(&self, keys: &[String]) -> StorageResult<usize> {
        (**self).unlink(keys)
    }

    fn sadd(&self, set: &str, member: &str) -> StorageResult<bool> {
        (**self).sadd(set, member)
    }

    fn smembers(&self, set: &str) -> StorageResult<Vec<String>> {
        (**self).smembers(set)
    }

    fn srem(&self, set: &str, member: &str) -> StorageResult<bool> {
        (**self).srem(set, member)
    }

    fn take_members(&self, set: &str) -> StorageResult<Vec<String>> {
        (**self).take_members(set)
    }

    fn scan_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        (**self).scan_prefix(prefix)
    }

    fn connection_prefix(&self) -> Option<&str> {
        (**self).connection_prefix()
    }
}

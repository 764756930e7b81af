//! Cache entries and tag membership over a [`KeyValueStore`].

use std::collections::BTreeSet;
use std::time::Duration;

use rowcache_core::{CacheValue, Decoded};
use rowcache_storage::KeyValueStore;
use tracing::{debug, info};

use crate::error::Result;
use crate::hasher::QueryCacheKey;
use crate::tagger::Tag;

/// Keys deleted per round trip during a flush.
const FLUSH_BATCH: usize = 1000;

/// The outcome of a typed cache lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<V> {
    /// The entry exists and decoded as `V`.
    Hit(V),
    /// No entry exists for the key.
    Miss,
    /// An entry exists but is corrupt or was written in another shape.
    Undecodable,
}

/// Cache entries and their tag membership sets.
///
/// Entries live at `{prefix}{key}` and tag sets at `{prefix}{tag}`; a tag set's
/// members are full entry keys, so an invalidation pass can delete them
/// directly. Tag sets are weak back-references: a member whose entry expired
/// or was evicted is simply skipped later.
#[derive(Debug)]
pub struct CacheStore<S> {
    backend: S,
    prefix: String,
}

impl<S: KeyValueStore> CacheStore<S> {
    /// Wrap a backend, namespacing everything under `prefix`.
    pub fn new(backend: S, prefix: impl Into<String>) -> Self {
        Self { backend, prefix: prefix.into() }
    }

    /// The underlying backend.
    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// The namespace prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub(crate) fn entry_key(&self, key: &QueryCacheKey) -> String {
        format!("{}{key}", self.prefix)
    }

    pub(crate) fn tag_key(&self, tag: &Tag) -> String {
        format!("{}{tag}", self.prefix)
    }

    /// Recover the cache key from a tag member.
    pub(crate) fn key_of_member(&self, member: &str) -> QueryCacheKey {
        QueryCacheKey::from_stored(member.strip_prefix(&self.prefix).unwrap_or(member).to_owned())
    }

    /// Check whether an entry exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub fn has(&self, key: &QueryCacheKey) -> Result<bool> {
        Ok(self.backend.exists(&self.entry_key(key))?)
    }

    /// Store an entry and add its key to every tag's member set.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails. The value may then be stored
    /// with only part of its memberships; the next hit repairs them.
    pub fn set<V: CacheValue>(
        &self,
        key: &QueryCacheKey,
        tags: &BTreeSet<Tag>,
        value: &V,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let entry = self.entry_key(key);
        let encoded = value.encode_value()?;
        self.backend.set(&entry, &encoded, ttl)?;
        for tag in tags {
            self.backend.sadd(&self.tag_key(tag), &entry)?;
        }
        debug!(key = %key, tags = tags.len(), bytes = encoded.len(), "stored cache entry");
        Ok(())
    }

    /// Read the raw encoded entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub fn get(&self, key: &QueryCacheKey) -> Result<Option<Vec<u8>>> {
        Ok(self.backend.get(&self.entry_key(key))?)
    }

    /// Read and decode an entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails. Corrupt entries are not an
    /// error: they come back as [`Lookup::Undecodable`].
    pub fn lookup<V: CacheValue>(&self, key: &QueryCacheKey) -> Result<Lookup<V>> {
        Ok(match self.get(key)? {
            None => Lookup::Miss,
            Some(bytes) => match V::decode_value(&bytes) {
                Decoded::Value(value) => Lookup::Hit(value),
                Decoded::Undecodable => Lookup::Undecodable,
            },
        })
    }

    /// Re-add `key` to every tag's member set. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub fn repair_tag_membership(
        &self,
        key: &QueryCacheKey,
        tags: &BTreeSet<Tag>,
    ) -> Result<usize> {
        let entry = self.entry_key(key);
        let mut repaired = 0;
        for tag in tags {
            if self.backend.sadd(&self.tag_key(tag), &entry)? {
                repaired += 1;
            }
        }
        if repaired > 0 {
            debug!(key = %key, repaired, "repaired tag membership");
        }
        Ok(repaired)
    }

    /// Remove every entry and tag set under the namespace.
    ///
    /// Returns the number of keys removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails; keys deleted before the failure
    /// stay deleted.
    pub fn flush(&self) -> Result<usize> {
        let scanned = self.backend.scan_prefix(&self.prefix)?;
        // Scanned keys carry the backend's connection prefix, which the
        // backend re-applies on delete
        let overlay = self.backend.connection_prefix().unwrap_or_default();
        let keys: Vec<String> = scanned
            .into_iter()
            .map(|key| match key.strip_prefix(overlay) {
                Some(stripped) if !overlay.is_empty() => stripped.to_owned(),
                _ => key,
            })
            .collect();

        let mut removed = 0;
        for batch in keys.chunks(FLUSH_BATCH) {
            removed += self.backend.del(batch)?;
        }
        info!(prefix = %self.prefix, removed, "flushed cache namespace");
        Ok(removed)
    }
}

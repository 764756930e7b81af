//! Tag invalidation.

use std::collections::BTreeSet;

use rowcache_storage::KeyValueStore;
use tracing::{debug, warn};

use super::store::CacheStore;
use crate::hasher::QueryCacheKey;
use crate::tagger::Tag;

/// Evicts every entry stored under a set of tags.
///
/// Each tag is harvested with one atomic "read members, delete set" step
/// ([`KeyValueStore::take_members`]). An entry stored concurrently under the
/// same tag after that step re-creates the set and survives; every member in
/// the snapshot is deleted.
#[derive(Debug)]
pub struct Invalidator<'s, S> {
    store: &'s CacheStore<S>,
}

impl<'s, S: KeyValueStore> Invalidator<'s, S> {
    /// Create an invalidator over `store`.
    pub fn new(store: &'s CacheStore<S>) -> Self {
        Self { store }
    }

    /// Invalidate `tags`, returning the keys that were harvested.
    ///
    /// Failures are logged and skipped: a tag that cannot be harvested keeps
    /// its members, and an entry that cannot be deleted stays until its next
    /// invalidation or expiry.
    pub fn invalidate<'t>(
        &self,
        tags: impl IntoIterator<Item = &'t Tag>,
    ) -> BTreeSet<QueryCacheKey> {
        let mut members: BTreeSet<String> = BTreeSet::new();
        let mut harvested_tags = 0usize;

        for tag in tags {
            match self.store.backend().take_members(&self.store.tag_key(tag)) {
                Ok(taken) => {
                    if !taken.is_empty() {
                        harvested_tags += 1;
                    }
                    members.extend(taken);
                }
                Err(e) => warn!(tag = %tag, error = %e, "failed to harvest tag"),
            }
        }

        if members.is_empty() {
            return BTreeSet::new();
        }

        let entries: Vec<String> = members.iter().cloned().collect();
        if let Err(e) = self.store.backend().unlink(&entries) {
            warn!(keys = entries.len(), error = %e, "bulk unlink failed, deleting keys one by one");
            for entry in &entries {
                if let Err(e) = self.store.backend().del(std::slice::from_ref(entry)) {
                    warn!(key = %entry, error = %e, "failed to delete cache entry");
                }
            }
        }

        debug!(tags = harvested_tags, keys = members.len(), "invalidated cache entries");
        members.iter().map(|member| self.store.key_of_member(member)).collect()
    }
}

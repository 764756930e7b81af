//! Cache key derivation.
//!
//! A key is the SHA-256 digest of the database name, the compiled SQL and a
//! canonical encoding of the bound parameters. Every field is length-prefixed
//! and every parameter carries a type tag, so `("ab", "c")` and `("a", "bc")`
//! never collide and neither do `1`, `1.0`, `"1"` and `true`.

use std::fmt;

use rowcache_core::Scalar;
use sha2::{Digest, Sha256};

use crate::reflect::StatementReflection;

/// A unique key for cache entries based on database, query and parameters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueryCacheKey(String);

impl QueryCacheKey {
    /// Derive the key for a reflected statement.
    #[must_use]
    pub fn new(reflection: &StatementReflection) -> Self {
        Self::from_parts(reflection.database(), reflection.sql(), reflection.parameters())
    }

    /// Derive a key from its raw inputs.
    #[must_use]
    pub fn from_parts(database: &str, sql: &str, parameters: &[Scalar]) -> Self {
        let mut hasher = Sha256::new();
        hash_bytes(database.as_bytes(), &mut hasher);
        hash_bytes(sql.as_bytes(), &mut hasher);
        hasher.update((parameters.len() as u64).to_le_bytes());
        for parameter in parameters {
            hash_scalar(parameter, &mut hasher);
        }
        Self(format!("{:x}", hasher.finalize()))
    }

    /// The key as stored (without the cache prefix).
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Rebuild a key from a stored member name.
    pub(crate) fn from_stored(key: String) -> Self {
        Self(key)
    }
}

impl fmt::Display for QueryCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Convenience wrapper around [`QueryCacheKey::new`].
#[must_use]
pub fn cache_key(reflection: &StatementReflection) -> QueryCacheKey {
    QueryCacheKey::new(reflection)
}

fn hash_bytes(bytes: &[u8], hasher: &mut Sha256) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

/// Hash a single scalar, type tag first.
fn hash_scalar(value: &Scalar, hasher: &mut Sha256) {
    match value {
        Scalar::Null => hasher.update([0u8]),
        Scalar::Bool(b) => hasher.update([1u8, u8::from(*b)]),
        Scalar::Int(n) => {
            hasher.update([2u8]);
            hasher.update(n.to_le_bytes());
        }
        Scalar::Float(f) => {
            hasher.update([3u8]);
            hasher.update(f.to_bits().to_le_bytes());
        }
        Scalar::String(s) => {
            hasher.update([4u8]);
            hash_bytes(s.as_bytes(), hasher);
        }
    }
}

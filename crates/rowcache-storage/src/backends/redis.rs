//! Redis store backend.
//!
//! [`RedisStore`] maps every [`KeyValueStore`] primitive onto one Redis command,
//! except [`KeyValueStore::take_members`], which runs `SMEMBERS` and `DEL` in a
//! single `MULTI`/`EXEC` transaction so the snapshot and the deletion are one
//! atomic step on the server.
//!
//! # Example
//!
//! ```ignore
//! use rowcache_storage::backends::RedisStore;
//!
//! let store = RedisStore::open("redis://127.0.0.1:6379/0")?
//!     .with_connection_prefix("myapp:");
//! ```
//!
//! Timeouts and reconnection policy belong to whoever configures the client;
//! this backend issues blocking commands over one shared connection.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use redis::{Client, Connection};
use tracing::debug;

use crate::engine::{KeyValueStore, StorageError, StorageResult};

/// Keys fetched per `SCAN` round trip.
const SCAN_BATCH: usize = 500;

/// A [`KeyValueStore`] backed by a Redis server.
pub struct RedisStore {
    connection: Mutex<Connection>,
    connection_prefix: Option<String>,
}

impl RedisStore {
    /// Connect to the Redis server at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Redis`] if the URL is invalid or the server
    /// cannot be reached.
    pub fn open(url: &str) -> StorageResult<Self> {
        let client = Client::open(url)?;
        Self::from_client(&client)
    }

    /// Open a connection from an already configured client.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Redis`] if the connection cannot be established.
    pub fn from_client(client: &Client) -> StorageResult<Self> {
        let connection = client.get_connection()?;
        Ok(Self { connection: Mutex::new(connection), connection_prefix: None })
    }

    /// Prefix every key this store touches with `prefix`.
    #[must_use]
    pub fn with_connection_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.connection_prefix = Some(prefix.into());
        self
    }

    fn raw_key(&self, key: &str) -> String {
        match &self.connection_prefix {
            Some(prefix) => format!("{prefix}{key}"),
            None => key.to_owned(),
        }
    }

    fn raw_keys(&self, keys: &[String]) -> Vec<String> {
        keys.iter().map(|key| self.raw_key(key)).collect()
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.connection.lock().map_err(|e| StorageError::lock_poisoned(e.to_string()))
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").field("connection_prefix", &self.connection_prefix).finish()
    }
}

/// Escape glob metacharacters so a literal prefix can be used in `SCAN MATCH`.
fn escape_glob(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for c in literal.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl KeyValueStore for RedisStore {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let mut con = self.conn()?;
        Ok(redis::cmd("GET").arg(self.raw_key(key)).query(&mut *con)?)
    }

    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> StorageResult<()> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(self.raw_key(key)).arg(value);
        if let Some(ttl) = ttl {
            // PX keeps sub-second expiries; Redis rejects a zero expiry.
            let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
            cmd.arg("PX").arg(millis);
        }
        let mut con = self.conn()?;
        cmd.query::<()>(&mut *con)?;
        Ok(())
    }

    fn exists(&self, key: &str) -> StorageResult<bool> {
        let mut con = self.conn()?;
        Ok(redis::cmd("EXISTS").arg(self.raw_key(key)).query(&mut *con)?)
    }

    fn del(&self, keys: &[String]) -> StorageResult<usize> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut con = self.conn()?;
        Ok(redis::cmd("DEL").arg(self.raw_keys(keys)).query(&mut *con)?)
    }

    fn unlink(&self, keys: &[String]) -> StorageResult<usize> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut con = self.conn()?;
        Ok(redis::cmd("UNLINK").arg(self.raw_keys(keys)).query(&mut *con)?)
    }

    fn sadd(&self, set: &str, member: &str) -> StorageResult<bool> {
        let mut con = self.conn()?;
        Ok(redis::cmd("SADD").arg(self.raw_key(set)).arg(member).query(&mut *con)?)
    }

    fn smembers(&self, set: &str) -> StorageResult<Vec<String>> {
        let mut con = self.conn()?;
        Ok(redis::cmd("SMEMBERS").arg(self.raw_key(set)).query(&mut *con)?)
    }

    fn srem(&self, set: &str, member: &str) -> StorageResult<bool> {
        let mut con = self.conn()?;
        Ok(redis::cmd("SREM").arg(self.raw_key(set)).arg(member).query(&mut *con)?)
    }

    fn take_members(&self, set: &str) -> StorageResult<Vec<String>> {
        let raw = self.raw_key(set);
        let mut con = self.conn()?;
        let (members,): (Vec<String>,) = redis::pipe()
            .atomic()
            .cmd("SMEMBERS")
            .arg(&raw)
            .cmd("DEL")
            .arg(&raw)
            .ignore()
            .query(&mut *con)?;
        Ok(members)
    }

    fn scan_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let pattern = format!("{}*", escape_glob(&self.raw_key(prefix)));
        let mut con = self.conn()?;
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query(&mut *con)?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        debug!(pattern = %pattern, keys = keys.len(), "scanned redis keyspace");
        Ok(keys)
    }

    fn connection_prefix(&self) -> Option<&str> {
        self.connection_prefix.as_deref()
    }
}

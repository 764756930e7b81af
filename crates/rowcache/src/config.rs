//! Cache configuration.
//!
//! [`CacheConfig`] is an immutable value handed to [`QueryCache`](crate::QueryCache)
//! at construction. It can be built in code or loaded from TOML:
//!
//! ```toml
//! active = true
//! prefix = "rowcache:"
//! expiration_time = 300
//! consider_rows = true
//! exclude_tables = ["sessions"]
//! ```

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const DEFAULT_PREFIX: &str = "rowcache:";

/// Configuration for the query cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Global switch. When off, reads bypass the cache and writes skip
    /// invalidation.
    /// Default: true
    #[serde(default = "default_active")]
    pub active: bool,

    /// Namespace under which every cache key and tag is stored.
    /// Default: `"rowcache:"`
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Entry time-to-live in seconds. `0` means entries never expire.
    /// Default: 0
    #[serde(default)]
    pub expiration_time: u64,

    /// Whether tags are row-granular. When off, every statement is tagged
    /// per table only.
    /// Default: true
    #[serde(default = "default_consider_rows")]
    pub consider_rows: bool,

    /// When non-empty, only statements whose tables are all listed here are
    /// cached.
    #[serde(default)]
    pub include_tables: Vec<String>,

    /// Statements touching any table listed here are never cached.
    #[serde(default)]
    pub exclude_tables: Vec<String>,
}

fn default_active() -> bool {
    true
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_owned()
}

fn default_consider_rows() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            active: true,
            prefix: default_prefix(),
            expiration_time: 0,
            consider_rows: true,
            include_tables: Vec::new(),
            exclude_tables: Vec::new(),
        }
    }
}

impl CacheConfig {
    /// Create a new cache configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration for a disabled cache.
    #[must_use]
    pub fn disabled() -> Self {
        Self { active: false, ..Default::default() }
    }

    /// Turn the cache on or off.
    #[must_use]
    pub const fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Set the key namespace.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the entry time-to-live in seconds (`0` for no expiry).
    #[must_use]
    pub const fn expiration_time(mut self, seconds: u64) -> Self {
        self.expiration_time = seconds;
        self
    }

    /// Enable or disable row-granular tags.
    #[must_use]
    pub const fn consider_rows(mut self, consider_rows: bool) -> Self {
        self.consider_rows = consider_rows;
        self
    }

    /// Restrict caching to statements over these tables.
    #[must_use]
    pub fn include_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_tables = tables.into_iter().map(Into::into).collect();
        self
    }

    /// Never cache statements touching these tables.
    #[must_use]
    pub fn exclude_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_tables = tables.into_iter().map(Into::into).collect();
        self
    }

    /// The entry time-to-live, or `None` when entries never expire.
    #[must_use]
    pub fn ttl(&self) -> Option<Duration> {
        (self.expiration_time > 0).then(|| Duration::from_secs(self.expiration_time))
    }

    /// Parse a configuration from TOML text. Missing fields take their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the text is not valid TOML for this
    /// structure, or if the result fails [`CacheConfig::validate`].
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| Error::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Check the configuration for contradictions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the prefix is empty or a table is both
    /// included and excluded.
    pub fn validate(&self) -> Result<()> {
        if self.prefix.is_empty() {
            return Err(Error::config("prefix must not be empty"));
        }

        let included: BTreeSet<&str> = self.include_tables.iter().map(String::as_str).collect();
        let overlap: Vec<&str> = self
            .exclude_tables
            .iter()
            .map(String::as_str)
            .filter(|table| included.contains(table))
            .collect();
        if !overlap.is_empty() {
            return Err(Error::config(format!(
                "tables both included and excluded: {}",
                overlap.join(", ")
            )));
        }
        Ok(())
    }
}

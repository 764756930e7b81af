//! Admission decisions.
//!
//! Whether a statement takes part in caching at all depends on the global
//! switch, the include and exclude table lists, and whether a transaction is
//! open on the statement's connection.

use std::collections::BTreeSet;

use crate::config::CacheConfig;
use crate::reflect::StatementReflection;

/// Decides per statement whether caching applies.
#[derive(Debug, Clone)]
pub struct AdmissionManager {
    active: bool,
    include: BTreeSet<String>,
    exclude: BTreeSet<String>,
}

impl AdmissionManager {
    /// Build from a configuration.
    #[must_use]
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            active: config.active,
            include: config.include_tables.iter().cloned().collect(),
            exclude: config.exclude_tables.iter().cloned().collect(),
        }
    }

    /// Whether the global switch is on.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Whether a read of `reflection` may be served from and stored in the
    /// cache.
    ///
    /// Never while a transaction is open on the statement's connection:
    /// writes earlier in that transaction have not invalidated anything yet.
    #[must_use]
    pub fn should_cache(&self, reflection: &StatementReflection, transaction_open: bool) -> bool {
        if transaction_open || !self.active {
            return false;
        }
        reflection.tables().iter().all(|table| self.table_admitted(table))
    }

    /// The tables of a write whose cached reads need invalidating.
    ///
    /// Reads touching any other table were never admitted, so nothing was
    /// cached for them. Empty when the global switch is off.
    #[must_use]
    pub fn admitted_tables<'r>(&self, reflection: &'r StatementReflection) -> Vec<&'r str> {
        if !self.active {
            return Vec::new();
        }
        reflection
            .tables()
            .iter()
            .map(String::as_str)
            .filter(|table| self.table_admitted(table))
            .collect()
    }

    fn table_admitted(&self, table: &str) -> bool {
        if self.include.is_empty() {
            !self.exclude.contains(table)
        } else {
            self.include.contains(table)
        }
    }
}

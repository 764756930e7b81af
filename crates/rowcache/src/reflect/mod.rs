//! Statement reflection.
//!
//! [`reflect`] turns a structured [`Statement`] into a [`StatementReflection`]:
//! the database, the set of tables the statement touches, the primary-key
//! rows it provably targets, its compiled SQL and bindings, and its kind.
//!
//! The walk is purely structural. FROM and JOIN references (named tables,
//! derived tables, opaque expressions), `EXISTS`/`NOT EXISTS` subqueries at any
//! predicate depth, and `UNION` branches all contribute tables. Statements
//! embedded in `IN (subquery)` predicates do not; they are reported by
//! [`nested_statements`] so their tags can be merged separately.
//!
//! # Example
//!
//! ```
//! use rowcache::reflect::reflect;
//! use rowcache_core::Statement;
//!
//! let statement = Statement::new("shop")
//!     .from_table("cars as c")
//!     .join("drivers")
//!     .where_eq("c.id", 10);
//!
//! let reflection = reflect(&statement).unwrap();
//! assert_eq!(reflection.tables().len(), 2);
//! assert!(reflection.rows_for("cars").is_some_and(|ids| ids.contains("10")));
//! assert!(reflection.rows_for("drivers").is_none());
//! ```

mod rows;
mod tables;

use std::collections::{BTreeMap, BTreeSet};

use rowcache_core::{ConnectionId, Scalar, Statement, StatementKind};

use crate::error::{Error, Result};

pub use rows::DEFAULT_PRIMARY_KEY;

/// What a statement touches, as far as caching is concerned.
///
/// Invariant: every key of [`rows_by_table`](Self::rows_by_table) is in
/// [`tables`](Self::tables).
#[derive(Debug, Clone, PartialEq)]
pub struct StatementReflection {
    database: String,
    connection: ConnectionId,
    tables: BTreeSet<String>,
    rows_by_table: BTreeMap<String, BTreeSet<String>>,
    sql: String,
    parameters: Vec<Scalar>,
    kind: StatementKind,
}

impl StatementReflection {
    /// The logical database the statement runs against.
    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    /// The connection the statement runs on.
    #[must_use]
    pub fn connection(&self) -> &ConnectionId {
        &self.connection
    }

    /// Alias-stripped names of every table the statement touches.
    #[must_use]
    pub fn tables(&self) -> &BTreeSet<String> {
        &self.tables
    }

    /// Primary-key values per table, for the tables that could be narrowed.
    #[must_use]
    pub fn rows_by_table(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.rows_by_table
    }

    /// Primary-key values for one table, if it could be narrowed.
    #[must_use]
    pub fn rows_for(&self, table: &str) -> Option<&BTreeSet<String>> {
        self.rows_by_table.get(table)
    }

    /// The compiled SQL text.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The bound parameters, in order.
    #[must_use]
    pub fn parameters(&self) -> &[Scalar] {
        &self.parameters
    }

    /// The statement kind.
    #[must_use]
    pub const fn kind(&self) -> StatementKind {
        self.kind
    }
}

/// Reflect a statement.
///
/// A statement without a declared kind is a read.
///
/// # Errors
///
/// Returns [`Error::MalformedStatement`] if the declared kind does not name a
/// known statement kind.
pub fn reflect(statement: &Statement) -> Result<StatementReflection> {
    let kind = match statement.declared_kind() {
        None => StatementKind::Read,
        Some(declared) => declared.resolve().map_err(|e| Error::malformed(e.to_string()))?,
    };

    let census = tables::TableCensus::of(statement);
    let rows_by_table = rows::extract_rows(statement, &census);
    debug_assert!(rows_by_table.keys().all(|table| census.all.contains(table)));

    Ok(StatementReflection {
        database: statement.database().to_owned(),
        connection: statement.connection_id().clone(),
        tables: census.all,
        rows_by_table,
        sql: statement.compiled_sql().to_owned(),
        parameters: statement.parameters().to_vec(),
        kind,
    })
}

/// Every statement embedded in an `IN (subquery)` predicate anywhere in
/// `statement`, outermost first.
#[must_use]
pub fn nested_statements(statement: &Statement) -> Vec<&Statement> {
    let mut found = Vec::new();
    tables::collect_in_subqueries(statement, &mut found);
    found
}

//! Structured statement descriptions.
//!
//! A [`Statement`] is what the query builder hands to the cache instead of raw
//! SQL text. It carries just enough structure for the cache to work out which
//! tables and primary-key rows a statement touches, together with the compiled
//! SQL and bindings that are used as opaque key material.
//!
//! The tree is closed: table references are one of [`TableRef`]'s variants and
//! predicates are one of [`Predicate`]'s, so every consumer can match on them
//! exhaustively.
//!
//! # Example
//!
//! ```
//! use rowcache_core::{Predicate, Statement, StatementKind};
//!
//! // SELECT * FROM cars AS c JOIN drivers WHERE c.id = ? AND EXISTS (...)
//! let stmt = Statement::new("shop")
//!     .from_table("cars as c")
//!     .join("drivers")
//!     .where_eq("c.id", 10)
//!     .where_exists(Statement::new("shop").from_table("licenses"))
//!     .sql("select * from cars as c join drivers ... where c.id = ?")
//!     .bind(10);
//!
//! assert_eq!(stmt.predicates().len(), 2);
//!
//! let update = Statement::new("shop")
//!     .kind(StatementKind::Update)
//!     .from_table("cars")
//!     .filter(Predicate::is_in("id", [1, 2, 3]));
//! assert!(update.declared_kind().is_some());
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::scalar::Scalar;
use crate::error::CoreError;

/// The kind of a statement, as far as caching is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementKind {
    /// A read (`SELECT`). Cacheable.
    #[default]
    Read,
    /// An `INSERT`.
    Insert,
    /// An `UPDATE`.
    Update,
    /// A `DELETE`.
    Delete,
    /// A `TRUNCATE`.
    Truncate,
}

impl StatementKind {
    /// The canonical lowercase name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Truncate => "truncate",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatementKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "read" | "select" => Ok(Self::Read),
            "insert" => Ok(Self::Insert),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            "truncate" => Ok(Self::Truncate),
            other => Err(CoreError::Validation(format!("unknown statement kind '{other}'"))),
        }
    }
}

/// The statement kind as declared by the description provider.
///
/// Providers either hand over a typed kind or a kind name. Names are resolved
/// during reflection; a name that does not map to a [`StatementKind`] makes
/// the statement malformed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeclaredKind {
    /// A kind the provider already resolved.
    Known(StatementKind),
    /// A kind name still to be resolved.
    Named(String),
}

impl DeclaredKind {
    /// Resolve the declared kind.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if a named kind is not recognized.
    pub fn resolve(&self) -> Result<StatementKind, CoreError> {
        match self {
            Self::Known(kind) => Ok(*kind),
            Self::Named(name) => name.parse(),
        }
    }
}

/// Identifies the database connection a statement runs on.
///
/// Transactions, and therefore deferred invalidation, are scoped per
/// connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Create a connection identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self("default".to_owned())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ConnectionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A table reference in a FROM or JOIN position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableRef {
    /// A named table, optionally aliased: `"cars"` or `"cars as c"`.
    Table(String),
    /// A nested statement used as a derived table.
    Subquery {
        /// The nested statement.
        statement: Box<Statement>,
        /// The alias of the derived table.
        #[serde(default)]
        alias: Option<String>,
    },
    /// An opaque SQL expression the provider could not resolve to a table.
    Expression {
        /// The expression text.
        sql: String,
        /// The declared alias, which stands in for the table name.
        #[serde(default)]
        alias: Option<String>,
    },
}

impl TableRef {
    /// A named table reference.
    #[must_use]
    pub fn table(name: impl Into<String>) -> Self {
        Self::Table(name.into())
    }

    /// A derived-table reference.
    #[must_use]
    pub fn subquery(statement: Statement, alias: Option<&str>) -> Self {
        Self::Subquery { statement: Box::new(statement), alias: alias.map(str::to_owned) }
    }

    /// An expression reference.
    #[must_use]
    pub fn expression(sql: impl Into<String>, alias: Option<&str>) -> Self {
        Self::Expression { sql: sql.into(), alias: alias.map(str::to_owned) }
    }
}

impl From<&str> for TableRef {
    fn from(name: &str) -> Self {
        Self::Table(name.to_owned())
    }
}

impl From<String> for TableRef {
    fn from(name: String) -> Self {
        Self::Table(name)
    }
}

/// How a predicate combines with the predicates before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connective {
    /// `AND`
    #[default]
    And,
    /// `OR`
    Or,
}

/// A comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// `=`
    Eq,
    /// `<>`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `LIKE`
    Like,
    /// `NOT LIKE`
    NotLike,
}

/// A single entry in a statement's WHERE list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Predicate {
    /// `column <op> value`
    Comparison {
        /// Column reference, optionally qualified (`table.column`).
        column: String,
        /// The operator.
        operator: Operator,
        /// The operand.
        value: Scalar,
        /// How this predicate joins the previous ones.
        #[serde(default)]
        connective: Connective,
    },
    /// `column [NOT] IN (values...)`
    In {
        /// Column reference.
        column: String,
        /// The listed values.
        values: Vec<Scalar>,
        /// `NOT IN` when set.
        #[serde(default)]
        negated: bool,
        /// How this predicate joins the previous ones.
        #[serde(default)]
        connective: Connective,
    },
    /// `column [NOT] IN (SELECT ...)`
    InSubquery {
        /// Column reference.
        column: String,
        /// The nested statement.
        statement: Box<Statement>,
        /// `NOT IN` when set.
        #[serde(default)]
        negated: bool,
        /// How this predicate joins the previous ones.
        #[serde(default)]
        connective: Connective,
    },
    /// `[NOT] EXISTS (SELECT ...)`
    Exists {
        /// The nested statement.
        statement: Box<Statement>,
        /// `NOT EXISTS` when set.
        #[serde(default)]
        negated: bool,
        /// How this predicate joins the previous ones.
        #[serde(default)]
        connective: Connective,
    },
    /// A parenthesized group of predicates.
    Group {
        /// The grouped predicates.
        predicates: Vec<Predicate>,
        /// How this group joins the previous predicates.
        #[serde(default)]
        connective: Connective,
    },
    /// Raw SQL the provider did not structure further.
    Raw {
        /// The SQL fragment.
        sql: String,
        /// How this predicate joins the previous ones.
        #[serde(default)]
        connective: Connective,
    },
}

impl Predicate {
    /// `column = value`
    #[must_use]
    pub fn eq(column: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self::compare(column, Operator::Eq, value)
    }

    /// `column <operator> value`
    #[must_use]
    pub fn compare(
        column: impl Into<String>,
        operator: Operator,
        value: impl Into<Scalar>,
    ) -> Self {
        Self::Comparison {
            column: column.into(),
            operator,
            value: value.into(),
            connective: Connective::And,
        }
    }

    /// `column IN (values...)`
    #[must_use]
    pub fn is_in<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Scalar>,
    {
        Self::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
            negated: false,
            connective: Connective::And,
        }
    }

    /// `column NOT IN (values...)`
    #[must_use]
    pub fn not_in<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Scalar>,
    {
        match Self::is_in(column, values) {
            Self::In { column, values, connective, .. } => {
                Self::In { column, values, negated: true, connective }
            }
            other => other,
        }
    }

    /// `column IN (SELECT ...)`
    #[must_use]
    pub fn in_subquery(column: impl Into<String>, statement: Statement) -> Self {
        Self::InSubquery {
            column: column.into(),
            statement: Box::new(statement),
            negated: false,
            connective: Connective::And,
        }
    }

    /// `EXISTS (SELECT ...)`
    #[must_use]
    pub fn exists(statement: Statement) -> Self {
        Self::Exists { statement: Box::new(statement), negated: false, connective: Connective::And }
    }

    /// `NOT EXISTS (SELECT ...)`
    #[must_use]
    pub fn not_exists(statement: Statement) -> Self {
        Self::Exists { statement: Box::new(statement), negated: true, connective: Connective::And }
    }

    /// `( predicates... )`
    #[must_use]
    pub fn group(predicates: Vec<Self>) -> Self {
        Self::Group { predicates, connective: Connective::And }
    }

    /// A raw SQL fragment.
    #[must_use]
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::Raw { sql: sql.into(), connective: Connective::And }
    }

    /// Join this predicate to the previous ones with `OR`.
    #[must_use]
    pub fn or(mut self) -> Self {
        *self.connective_mut() = Connective::Or;
        self
    }

    /// How this predicate joins the previous ones.
    #[must_use]
    pub fn connective(&self) -> Connective {
        match self {
            Self::Comparison { connective, .. }
            | Self::In { connective, .. }
            | Self::InSubquery { connective, .. }
            | Self::Exists { connective, .. }
            | Self::Group { connective, .. }
            | Self::Raw { connective, .. } => *connective,
        }
    }

    fn connective_mut(&mut self) -> &mut Connective {
        match self {
            Self::Comparison { connective, .. }
            | Self::In { connective, .. }
            | Self::InSubquery { connective, .. }
            | Self::Exists { connective, .. }
            | Self::Group { connective, .. }
            | Self::Raw { connective, .. } => connective,
        }
    }
}

/// A structured description of one statement execution.
///
/// Built by the query-builder integration; consumed read-only by the cache.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Statement {
    database: String,
    #[serde(default)]
    connection: ConnectionId,
    #[serde(default)]
    kind: Option<DeclaredKind>,
    #[serde(default)]
    from: Option<TableRef>,
    #[serde(default)]
    joins: Vec<TableRef>,
    #[serde(default)]
    predicates: Vec<Predicate>,
    #[serde(default)]
    unions: Vec<Statement>,
    #[serde(default)]
    primary_key: Option<String>,
    #[serde(default)]
    sql: String,
    #[serde(default)]
    parameters: Vec<Scalar>,
}

impl Statement {
    /// Start describing a statement against `database`.
    #[must_use]
    pub fn new(database: impl Into<String>) -> Self {
        Self { database: database.into(), ..Default::default() }
    }

    /// Set the connection this statement runs on.
    #[must_use]
    pub fn connection(mut self, connection: impl Into<ConnectionId>) -> Self {
        self.connection = connection.into();
        self
    }

    /// Declare the statement kind.
    #[must_use]
    pub fn kind(mut self, kind: StatementKind) -> Self {
        self.kind = Some(DeclaredKind::Known(kind));
        self
    }

    /// Declare the statement kind by name, to be resolved during reflection.
    #[must_use]
    pub fn kind_named(mut self, name: impl Into<String>) -> Self {
        self.kind = Some(DeclaredKind::Named(name.into()));
        self
    }

    /// Set the FROM reference.
    #[must_use]
    pub fn from_table(mut self, table: impl Into<TableRef>) -> Self {
        self.from = Some(table.into());
        self
    }

    /// Add a JOIN.
    #[must_use]
    pub fn join(mut self, table: impl Into<TableRef>) -> Self {
        self.joins.push(table.into());
        self
    }

    /// Add a predicate to the WHERE list.
    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// `AND column = value`
    #[must_use]
    pub fn where_eq(self, column: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.filter(Predicate::eq(column, value))
    }

    /// `OR column = value`
    #[must_use]
    pub fn or_where_eq(self, column: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.filter(Predicate::eq(column, value).or())
    }

    /// `AND column <operator> value`
    #[must_use]
    pub fn where_cmp(
        self,
        column: impl Into<String>,
        operator: Operator,
        value: impl Into<Scalar>,
    ) -> Self {
        self.filter(Predicate::compare(column, operator, value))
    }

    /// `AND column IN (values...)`
    #[must_use]
    pub fn where_in<I, V>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Scalar>,
    {
        self.filter(Predicate::is_in(column, values))
    }

    /// `AND column IN (SELECT ...)`
    #[must_use]
    pub fn where_in_subquery(self, column: impl Into<String>, statement: Statement) -> Self {
        self.filter(Predicate::in_subquery(column, statement))
    }

    /// `AND EXISTS (SELECT ...)`
    #[must_use]
    pub fn where_exists(self, statement: Statement) -> Self {
        self.filter(Predicate::exists(statement))
    }

    /// `AND NOT EXISTS (SELECT ...)`
    #[must_use]
    pub fn where_not_exists(self, statement: Statement) -> Self {
        self.filter(Predicate::not_exists(statement))
    }

    /// Add a UNION branch.
    #[must_use]
    pub fn union(mut self, statement: Statement) -> Self {
        self.unions.push(statement);
        self
    }

    /// Name the primary-key column (defaults to `id`).
    #[must_use]
    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = Some(column.into());
        self
    }

    /// Set the compiled SQL text.
    #[must_use]
    pub fn sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = sql.into();
        self
    }

    /// Append a bound parameter.
    #[must_use]
    pub fn bind(mut self, value: impl Into<Scalar>) -> Self {
        self.parameters.push(value.into());
        self
    }

    /// Append several bound parameters.
    #[must_use]
    pub fn bindings<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Scalar>,
    {
        self.parameters.extend(values.into_iter().map(Into::into));
        self
    }

    /// The database identifier.
    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    /// The connection this statement runs on.
    #[must_use]
    pub fn connection_id(&self) -> &ConnectionId {
        &self.connection
    }

    /// The declared kind, if any.
    #[must_use]
    pub fn declared_kind(&self) -> Option<&DeclaredKind> {
        self.kind.as_ref()
    }

    /// The FROM reference, if any.
    #[must_use]
    pub fn table_ref(&self) -> Option<&TableRef> {
        self.from.as_ref()
    }

    /// The JOIN references.
    #[must_use]
    pub fn joins(&self) -> &[TableRef] {
        &self.joins
    }

    /// The top-level WHERE list.
    #[must_use]
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// The UNION branches.
    #[must_use]
    pub fn unions(&self) -> &[Statement] {
        &self.unions
    }

    /// The primary-key column name, if the provider supplied one.
    #[must_use]
    pub fn primary_key_column(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    /// The compiled SQL text.
    #[must_use]
    pub fn compiled_sql(&self) -> &str {
        &self.sql
    }

    /// The bound parameters, in order.
    #[must_use]
    pub fn parameters(&self) -> &[Scalar] {
        &self.parameters
    }
}

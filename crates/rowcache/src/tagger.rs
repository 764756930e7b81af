//! Invalidation tags.
//!
//! A tag names an invalidation scope. Reads are stored under the tags of the
//! scopes they depend on; writes invalidate the tags of the scopes they
//! change. Four shapes exist:
//!
//! | Tag | Meaning |
//! |-----|---------|
//! | `db:{db}:table_unspecific:{t}` | anything in `t`, not narrowed to rows |
//! | `db:{db}:table_specific:{t}` | any row-identified access to `t` |
//! | `db:{db}:table_specific:{t}:row:{id}` | the row `id` of `t` |
//! | `db:{db}:{t}` | table `t`, when row granularity is off |
//!
//! Row isolation comes from reads narrowed to rows being tagged with the
//! `table_specific` tag and their row tags only. A write that names its rows
//! invalidates those row tags and the `table_unspecific` tag, which leaves
//! reads of other rows alone. A write that does not name rows (every insert,
//! every truncate, unqualified updates and deletes) also invalidates the bare
//! `table_specific` tag and so reaches every row-scoped read of the table.
//!
//! Row tags come from the write's own predicate, so an update that changes a
//! primary key (`UPDATE cars SET id = 12 WHERE id = 10`) only reaches row 10.
//! A cached read of row 12 taken before the update, including an empty one,
//! survives it. Callers should describe primary-key-changing updates as
//! unqualified writes so they invalidate the whole table.

use std::collections::BTreeSet;
use std::fmt;

use rowcache_core::StatementKind;

use crate::reflect::StatementReflection;

/// An invalidation tag.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(String);

impl Tag {
    /// Tag for unspecific access to a table.
    #[must_use]
    pub fn table_unspecific(database: &str, table: &str) -> Self {
        Self(format!("db:{database}:table_unspecific:{table}"))
    }

    /// Tag for row-identified access to a table.
    #[must_use]
    pub fn table_specific(database: &str, table: &str) -> Self {
        Self(format!("db:{database}:table_specific:{table}"))
    }

    /// Tag for one row of a table.
    #[must_use]
    pub fn row(database: &str, table: &str, id: &str) -> Self {
        Self(format!("db:{database}:table_specific:{table}:row:{id}"))
    }

    /// Tag for a table when row granularity is off.
    #[must_use]
    pub fn table(database: &str, table: &str) -> Self {
        Self(format!("db:{database}:{table}"))
    }

    /// The tag text (without the cache prefix).
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes the tag set of a reflected statement.
#[derive(Debug, Clone, Copy)]
pub struct Tagger {
    consider_rows: bool,
}

impl Tagger {
    /// Create a tagger. With `consider_rows` off, every table gets the flat
    /// per-table tag only.
    #[must_use]
    pub const fn new(consider_rows: bool) -> Self {
        Self { consider_rows }
    }

    /// Tags that reach every cached read of `table`, whatever its shape.
    #[must_use]
    pub fn table_wide(&self, database: &str, table: &str) -> Vec<Tag> {
        if self.consider_rows {
            vec![Tag::table_unspecific(database, table), Tag::table_specific(database, table)]
        } else {
            vec![Tag::table(database, table)]
        }
    }

    /// Tags for every table of `reflection`.
    #[must_use]
    pub fn tags(&self, reflection: &StatementReflection) -> BTreeSet<Tag> {
        self.tags_for_tables(reflection, reflection.tables().iter().map(String::as_str))
    }

    /// Tags for a subset of the tables of `reflection`.
    ///
    /// Tables not in the reflection are tagged as if no rows were known.
    #[must_use]
    pub fn tags_for_tables<'t>(
        &self,
        reflection: &StatementReflection,
        tables: impl IntoIterator<Item = &'t str>,
    ) -> BTreeSet<Tag> {
        let database = reflection.database();
        let mut tags = BTreeSet::new();

        for table in tables {
            if !self.consider_rows {
                tags.insert(Tag::table(database, table));
                continue;
            }

            let rows = reflection.rows_for(table).filter(|ids| !ids.is_empty());
            match (reflection.kind(), rows) {
                (StatementKind::Read, Some(ids)) => {
                    tags.insert(Tag::table_specific(database, table));
                    tags.extend(ids.iter().map(|id| Tag::row(database, table, id)));
                }
                (StatementKind::Read, None) => {
                    tags.insert(Tag::table_unspecific(database, table));
                }
                (StatementKind::Update | StatementKind::Delete, Some(ids)) => {
                    tags.insert(Tag::table_unspecific(database, table));
                    tags.extend(ids.iter().map(|id| Tag::row(database, table, id)));
                }
                // An insert can create a row a narrowed read found missing
                (StatementKind::Insert | StatementKind::Truncate, _)
                | (StatementKind::Update | StatementKind::Delete, None) => {
                    tags.extend(self.table_wide(database, table));
                }
            }
        }

        tags
    }
}

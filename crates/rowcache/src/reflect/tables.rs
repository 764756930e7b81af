//! Structural table extraction.

use std::collections::{BTreeMap, BTreeSet};

use rowcache_core::{Predicate, Statement, TableRef};

/// Split a table reference into its base name and declared alias.
///
/// `"cars as c"` and `"cars AS c"` give `("cars", Some("c"))`; a bare name
/// gives `("cars", None)`.
pub(crate) fn split_alias(reference: &str) -> (&str, Option<&str>) {
    let trimmed = reference.trim();
    // ASCII lowercasing keeps byte offsets aligned with the original
    let lowered = trimmed.to_ascii_lowercase();
    match lowered.find(" as ") {
        Some(at) => {
            let alias = trimmed[at + 4..].trim();
            (trimmed[..at].trim(), (!alias.is_empty()).then_some(alias))
        }
        None => (trimmed, None),
    }
}

/// Every table a statement touches, and where it touches them.
///
/// Tables named directly in the outermost FROM or JOIN positions are counted
/// separately from tables reached through subqueries, `EXISTS` predicates or
/// `UNION` branches, because only the former can carry row identities.
#[derive(Debug, Default)]
pub(crate) struct TableCensus {
    /// Outermost named FROM/JOIN tables with their reference counts.
    pub(crate) top_level: BTreeMap<String, usize>,
    /// Outermost alias (or base name) to base table name.
    pub(crate) aliases: BTreeMap<String, String>,
    /// The outermost FROM table, if it is a named table.
    pub(crate) primary: Option<String>,
    /// Every table name the statement touches.
    pub(crate) all: BTreeSet<String>,
    /// Tables reached anywhere below the outermost level.
    nested: BTreeSet<String>,
}

impl TableCensus {
    pub(crate) fn of(statement: &Statement) -> Self {
        let mut census = Self::default();
        census.visit(statement, true);
        census
    }

    /// A table can be narrowed to rows when the outermost level names it
    /// exactly once and nothing below that level touches it again.
    pub(crate) fn row_eligible(&self, table: &str) -> bool {
        self.top_level.get(table) == Some(&1) && !self.nested.contains(table)
    }

    fn visit(&mut self, statement: &Statement, outermost: bool) {
        if let Some(from) = statement.table_ref() {
            self.visit_ref(from, outermost, true);
        }
        for join in statement.joins() {
            self.visit_ref(join, outermost, false);
        }
        self.visit_predicates(statement.predicates());
        for branch in statement.unions() {
            self.visit(branch, false);
        }
    }

    fn visit_ref(&mut self, reference: &TableRef, outermost: bool, is_from: bool) {
        match reference {
            TableRef::Table(name) => {
                let (base, alias) = split_alias(name);
                if base.is_empty() {
                    return;
                }
                self.all.insert(base.to_owned());
                if outermost {
                    *self.top_level.entry(base.to_owned()).or_default() += 1;
                    self.aliases.insert(base.to_owned(), base.to_owned());
                    if let Some(alias) = alias {
                        self.aliases.insert(alias.to_owned(), base.to_owned());
                    }
                    if is_from {
                        self.primary = Some(base.to_owned());
                    }
                } else {
                    self.nested.insert(base.to_owned());
                }
            }
            TableRef::Subquery { statement, .. } => self.visit(statement, false),
            TableRef::Expression { alias, .. } => {
                if let Some(alias) = alias.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
                    self.all.insert(alias.to_owned());
                    self.nested.insert(alias.to_owned());
                }
            }
        }
    }

    fn visit_predicates(&mut self, predicates: &[Predicate]) {
        for predicate in predicates {
            match predicate {
                Predicate::Exists { statement, .. } => self.visit(statement, false),
                Predicate::Group { predicates, .. } => self.visit_predicates(predicates),
                // IN-subqueries are tagged separately, see `nested_statements`
                Predicate::Comparison { .. }
                | Predicate::In { .. }
                | Predicate::InSubquery { .. }
                | Predicate::Raw { .. } => {}
            }
        }
    }
}

/// Collect every statement embedded in an `IN (subquery)` predicate, at any
/// depth of the statement tree.
pub(crate) fn collect_in_subqueries<'a>(statement: &'a Statement, out: &mut Vec<&'a Statement>) {
    let refs = statement.table_ref().into_iter().chain(statement.joins());
    for reference in refs {
        if let TableRef::Subquery { statement, .. } = reference {
            collect_in_subqueries(statement, out);
        }
    }
    collect_from_predicates(statement.predicates(), out);
    for branch in statement.unions() {
        collect_in_subqueries(branch, out);
    }
}

fn collect_from_predicates<'a>(predicates: &'a [Predicate], out: &mut Vec<&'a Statement>) {
    for predicate in predicates {
        match predicate {
            Predicate::InSubquery { statement, .. } => {
                out.push(statement);
                collect_in_subqueries(statement, out);
            }
            Predicate::Exists { statement, .. } => collect_in_subqueries(statement, out),
            Predicate::Group { predicates, .. } => collect_from_predicates(predicates, out),
            Predicate::Comparison { .. } | Predicate::In { .. } | Predicate::Raw { .. } => {}
        }
    }
}

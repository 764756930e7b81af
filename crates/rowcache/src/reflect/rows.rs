//! Primary-key row extraction from the outermost predicate list.

use std::collections::{BTreeMap, BTreeSet};

use rowcache_core::{Connective, Operator, Predicate, Scalar, Statement};

use super::tables::TableCensus;

/// Primary-key column assumed when the statement does not name one.
pub const DEFAULT_PRIMARY_KEY: &str = "id";

/// Map each row-eligible table to the primary-key values the outermost
/// predicates pin it to.
///
/// Only `pk = value` and `pk IN (values...)` are understood. Nested groups are
/// not inspected. Once any predicate is `OR`-joined, rows survive only if
/// every predicate pins rows of one and the same table; otherwise the
/// statement could match arbitrary rows and stays table-wide.
pub(crate) fn extract_rows(
    statement: &Statement,
    census: &TableCensus,
) -> BTreeMap<String, BTreeSet<String>> {
    let primary_key = statement.primary_key_column().unwrap_or(DEFAULT_PRIMARY_KEY);
    let mut rows: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut every_predicate_pins = true;
    let mut or_joined = false;

    for (index, predicate) in statement.predicates().iter().enumerate() {
        if index > 0 && predicate.connective() == Connective::Or {
            or_joined = true;
        }
        match pinned_rows(predicate, primary_key, census) {
            Some((table, ids)) => rows.entry(table.to_owned()).or_default().extend(ids),
            None => every_predicate_pins = false,
        }
    }

    if or_joined && (!every_predicate_pins || rows.len() > 1) {
        return BTreeMap::new();
    }
    rows.retain(|table, ids| !ids.is_empty() && census.row_eligible(table));
    rows
}

fn pinned_rows<'c>(
    predicate: &Predicate,
    primary_key: &str,
    census: &'c TableCensus,
) -> Option<(&'c str, Vec<String>)> {
    let (column, ids) = match predicate {
        Predicate::Comparison { column, operator: Operator::Eq, value, .. } => {
            (column, vec![value.row_id()?])
        }
        Predicate::In { column, values, negated: false, .. } => {
            (column, values.iter().filter_map(Scalar::row_id).collect())
        }
        _ => return None,
    };
    let (table, name) = resolve_column(column, census)?;
    name.eq_ignore_ascii_case(primary_key).then_some((table, ids))
}

/// Resolve a column reference to `(base table, column name)`.
///
/// Unqualified columns belong to the outermost FROM table. Qualifiers may be a
/// table name, an alias, or a schema-qualified table name.
fn resolve_column<'a, 'c>(column: &'a str, census: &'c TableCensus) -> Option<(&'c str, &'a str)> {
    let column = column.trim();
    let Some((qualifier, name)) = column.rsplit_once('.') else {
        return Some((census.primary.as_deref()?, unquote(column)));
    };
    let qualifier = unquote(qualifier);
    let table = census.aliases.get(qualifier).or_else(|| {
        let (_, bare) = qualifier.rsplit_once('.')?;
        census.aliases.get(unquote(bare))
    })?;
    Some((table.as_str(), unquote(name)))
}

/// Strip one level of identifier quoting: `"x"`, `` `x` `` or `[x]`.
fn unquote(identifier: &str) -> &str {
    let identifier = identifier.trim();
    [('"', '"'), ('`', '`'), ('[', ']')]
        .iter()
        .find_map(|&(open, close)| identifier.strip_prefix(open)?.strip_suffix(close))
        .unwrap_or(identifier)
}

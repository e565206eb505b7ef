//! Placeholder rewriting for engine-neutral SQL.
//!
//! Queries are written once with `?` as the bind marker. Before execution the
//! marker is rewritten into whatever the target engine expects.

use std::borrow::Cow;

/// Engine-neutral bind marker.
pub const PLACEHOLDER: char = '?';

/// Renders the bind marker for the `index`-th (0-based) argument.
pub trait Dialect: Send + Sync {
    fn placeholder(&self, index: usize) -> Cow<'static, str>;
}

/// `$1, $2, ...`
#[derive(Clone, Copy, Debug, Default)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn placeholder(&self, index: usize) -> Cow<'static, str> {
        Cow::Owned(format!("${}", index + 1))
    }
}

/// Keeps `?` as is (SQLite, MySQL).
#[derive(Clone, Copy, Debug, Default)]
pub struct QuestionMarkDialect;

impl Dialect for QuestionMarkDialect {
    fn placeholder(&self, _index: usize) -> Cow<'static, str> {
        Cow::Borrowed("?")
    }
}

/// Rewrites every `?` in `query`, left to right, with the dialect's marker.
/// Everything between markers is copied unchanged.
pub fn normalize(dialect: &dyn Dialect, query: &str) -> String {
    let mut out = String::with_capacity(query.len() + 8);
    for (index, chunk) in query.split(PLACEHOLDER).enumerate() {
        if index > 0 {
            out.push_str(&dialect.placeholder(index - 1));
        }
        out.push_str(chunk);
    }
    out
}

/// Repeats `value` `count` times separated by commas: `list("?", 3) == "?,?,?"`.
pub fn list(value: &str, count: usize) -> String {
    let mut out = String::with_capacity((value.len() + 1) * count);
    for i in 0..count {
        if i > 0 {
            out.push(',');
        }
        out.push_str(value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postgres_indexes_follow_marker_order() {
        for n in 0..6 {
            let query = vec!["?"; n].join(" AND x = ");
            let out = normalize(&PostgresDialect, &query);
            let expected: Vec<String> = (1..=n).map(|i| format!("${i}")).collect();
            assert_eq!(out, expected.join(" AND x = "), "n = {n}");
        }
    }

    #[test]
    fn postgres_rewrites_real_statement() {
        let out = normalize(
            &PostgresDialect,
            "UPDATE clients SET name = ?, updated_at = ? WHERE id = ?",
        );
        assert_eq!(
            out,
            "UPDATE clients SET name = $1, updated_at = $2 WHERE id = $3"
        );
    }

    #[test]
    fn question_mark_dialect_is_identity() {
        let query = "SELECT id FROM users WHERE id IN (?,?,?) AND enabled = ?";
        assert_eq!(normalize(&QuestionMarkDialect, query), query);
    }

    #[test]
    fn no_markers_means_no_change() {
        let query = "SELECT id, name FROM clients ORDER BY name";
        assert_eq!(normalize(&PostgresDialect, query), query);
        assert_eq!(normalize(&PostgresDialect, ""), "");
    }

    #[test]
    fn non_marker_text_is_preserved() {
        let query = "?é?\n\t?";
        assert_eq!(normalize(&PostgresDialect, query), "$1é$2\n\t$3");
    }

    #[test]
    fn list_joins_with_commas() {
        assert_eq!(list("?", 0), "");
        assert_eq!(list("?", 1), "?");
        assert_eq!(list("(?,?)", 3), "(?,?),(?,?),(?,?)");
    }
}

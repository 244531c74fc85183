use smol_str::SmolStr;
use tracing::trace;

use crate::{
    config::Configuration,
    context::{Bindings, SqlContext},
    error::Result,
};

use super::SqlNode;

const WHERE_PREFIX_OVERRIDES: [&str; 8] = [
    "AND ", "OR ", "AND\n", "OR\n", "AND\r", "OR\r", "AND\t", "OR\t",
];

/// Renders its contents in isolation, strips leading and trailing keywords,
/// and wraps what is left.
#[derive(Debug, Clone, PartialEq)]
pub struct TrimNode {
    contents: Box<SqlNode>,
    prefix: Option<SmolStr>,
    suffix: Option<SmolStr>,
    prefix_overrides: Vec<SmolStr>,
    suffix_overrides: Vec<SmolStr>,
}

impl TrimNode {
    pub fn new(contents: SqlNode) -> Self {
        Self {
            contents: Box::new(contents),
            prefix: None,
            suffix: None,
            prefix_overrides: Vec::new(),
            suffix_overrides: Vec::new(),
        }
    }

    /// `WHERE` prefix, dropping a leading `AND` or `OR`.
    pub fn where_clause(contents: SqlNode) -> Self {
        Self::new(contents)
            .prefix("WHERE")
            .prefix_overrides(WHERE_PREFIX_OVERRIDES)
    }

    /// `SET` prefix, dropping a leading or trailing comma.
    pub fn set_clause(contents: SqlNode) -> Self {
        Self::new(contents)
            .prefix("SET")
            .prefix_overrides([","])
            .suffix_overrides([","])
    }

    pub fn prefix<T: Into<SmolStr>>(mut self, prefix: T) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn suffix<T: Into<SmolStr>>(mut self, suffix: T) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    /// Matched case-insensitively, first match wins.
    pub fn prefix_overrides<I, T>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.prefix_overrides = uppercase(overrides);
        self
    }

    pub fn suffix_overrides<I, T>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.suffix_overrides = uppercase(overrides);
        self
    }

    /// Splits a `AND |OR ` style list.
    pub fn parse_overrides(overrides: &str) -> Vec<&str> {
        overrides.split('|').filter(|o| !o.is_empty()).collect()
    }

    pub(crate) fn apply(&self, config: &Configuration, context: &mut dyn SqlContext) -> Result<bool> {
        let mut isolated = TrimContext {
            delegate: &mut *context,
            sql: String::new(),
        };
        let applied = self.contents.apply(config, &mut isolated)?;
        let sql = isolated.sql;

        let sql = self.finish(&sql);
        context.append_sql(&sql);
        Ok(applied)
    }

    fn finish(&self, sql: &str) -> String {
        let mut body = sql.trim();
        if body.is_empty() {
            return String::new();
        }

        let upper = body.to_ascii_uppercase();
        if let Some(found) = self
            .prefix_overrides
            .iter()
            .find(|o| upper.starts_with(o.as_str()))
        {
            trace!(prefix = %found, "stripping prefix");
            body = body[found.trim().len()..].trim_start();
        }

        let upper = body.to_ascii_uppercase();
        if let Some(found) = self
            .suffix_overrides
            .iter()
            .find(|o| upper.ends_with(o.as_str()))
        {
            trace!(suffix = %found, "stripping suffix");
            let cut = body.len().saturating_sub(found.trim().len());
            body = body[..cut].trim_end();
        }

        [self.prefix.as_deref(), Some(body), self.suffix.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn uppercase<I, T>(overrides: I) -> Vec<SmolStr>
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    overrides
        .into_iter()
        .map(|o| SmolStr::new(o.as_ref().to_ascii_uppercase()))
        .collect()
}

/// Collects the contents of a trim node apart from the surrounding text.
struct TrimContext<'a> {
    delegate: &'a mut dyn SqlContext,
    sql: String,
}

impl SqlContext for TrimContext<'_> {
    fn bindings(&self) -> &Bindings {
        self.delegate.bindings()
    }

    fn bindings_mut(&mut self) -> &mut Bindings {
        self.delegate.bindings_mut()
    }

    fn append_sql(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    fn unique_number(&mut self) -> usize {
        self.delegate.unique_number()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{map, node::tests::render, value::Value};

    fn finish(node: &TrimNode, sql: &str) -> String {
        node.finish(sql)
    }

    #[test]
    fn test_strips_leading_keyword() {
        let node = TrimNode::new(SqlNode::text("")).prefix("WHERE").prefix_overrides(["AND", "OR"]);
        assert_eq!("WHERE a = ?", finish(&node, " AND a = ? "));
        assert_eq!("WHERE a = ?", finish(&node, "or a = ?"));
        assert_eq!("WHERE a = ?", finish(&node, "a = ?"));
        assert_eq!("", finish(&node, "   "));
    }

    #[test]
    fn test_where_clause_keeps_order_by() {
        let node = TrimNode::where_clause(SqlNode::text(""));
        assert_eq!("WHERE ordinal = 1", finish(&node, "ordinal = 1"));
        assert_eq!("WHERE b = 2", finish(&node, "and\nb = 2"));
        assert_eq!("WHERE AND", finish(&node, "AND"));
    }

    #[test]
    fn test_set_clause() {
        let node = TrimNode::set_clause(SqlNode::text(""));
        assert_eq!("SET a = ?, b = ?", finish(&node, "a = ?, b = ?,"));
        assert_eq!("SET a = ?", finish(&node, ", a = ? ,"));
        assert_eq!("SET", finish(&node, ","));
    }

    #[test]
    fn test_prefix_and_suffix() {
        let node = TrimNode::new(SqlNode::text(""))
            .prefix("(")
            .suffix(")")
            .suffix_overrides(TrimNode::parse_overrides("AND|OR"));
        assert_eq!("( a or b )", finish(&node, "a or b or"));
    }

    #[test]
    fn test_overrides_match_as_written() {
        let node = TrimNode::new(SqlNode::text(""))
            .prefix_overrides([" AND"])
            .suffix_overrides(["AND "]);
        assert_eq!("AND a = 1 AND", finish(&node, " AND a = 1 AND "));

        let node = TrimNode::new(SqlNode::text(""))
            .prefix_overrides(["AND "])
            .suffix_overrides([" AND"]);
        assert_eq!("a = 1", finish(&node, " AND a = 1 AND "));
    }

    #[test]
    fn test_renders_in_isolation() {
        let node = SqlNode::sequence([
            SqlNode::text("select * from t "),
            SqlNode::where_clause(SqlNode::sequence([
                SqlNode::conditional("a != null", SqlNode::text(" AND a = #{a}")),
                SqlNode::conditional("b != null", SqlNode::text(" AND b = #{b}")),
            ])),
        ]);
        assert_eq!(
            "select * from t WHERE b = #{b}",
            render(&node, map! { "a" => Value::Null, "b" => 1 })
        );
        assert_eq!("select * from t", render(&node, map! {}));
    }
}

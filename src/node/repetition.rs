use smol_str::{SmolStr, format_smolstr};
use tracing::trace;

use crate::{
    config::Configuration,
    context::{Bindings, SqlContext},
    error::{Error, Result},
    scanner::TokenScanner,
    value::Value,
};

use super::SqlNode;

const ITEM_PREFIX: &str = "__frch_";

/// Renders its body once per element of a collection.
///
/// ```
/// use qscript::{RepetitionNode, SqlNode};
///
/// let node = RepetitionNode::new("ids", SqlNode::text("#{id}"))
///     .item("id")
///     .open("(")
///     .close(")")
///     .separator(",");
/// # let _ = node;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RepetitionNode {
    collection: SmolStr,
    item: Option<SmolStr>,
    index: Option<SmolStr>,
    open: Option<SmolStr>,
    close: Option<SmolStr>,
    separator: Option<SmolStr>,
    contents: Box<SqlNode>,
}

impl RepetitionNode {
    pub fn new<T: Into<SmolStr>>(collection: T, contents: SqlNode) -> Self {
        Self {
            collection: collection.into(),
            item: None,
            index: None,
            open: None,
            close: None,
            separator: None,
            contents: Box::new(contents),
        }
    }

    pub fn item<T: Into<SmolStr>>(mut self, name: T) -> Self {
        self.item = Some(name.into());
        self
    }

    /// Bound to the position of list elements, or to the key of map entries.
    pub fn index<T: Into<SmolStr>>(mut self, name: T) -> Self {
        self.index = Some(name.into());
        self
    }

    pub fn open<T: Into<SmolStr>>(mut self, open: T) -> Self {
        self.open = Some(open.into());
        self
    }

    pub fn close<T: Into<SmolStr>>(mut self, close: T) -> Self {
        self.close = Some(close.into());
        self
    }

    pub fn separator<T: Into<SmolStr>>(mut self, separator: T) -> Self {
        self.separator = Some(separator.into());
        self
    }

    pub(crate) fn apply(&self, config: &Configuration, context: &mut dyn SqlContext) -> Result<bool> {
        let entries = config
            .evaluator
            .evaluate_iterable(&self.collection, context.bindings())
            .map_err(|source| Error::expression(&self.collection, source))?;
        if entries.is_empty() {
            return Ok(true);
        }

        if let Some(open) = &self.open {
            context.append_sql(open);
        }

        // stays true until an iteration renders something
        let mut first = true;
        for (position, entry) in entries.into_iter().enumerate() {
            let prefix = match &self.separator {
                Some(separator) if !first => separator.as_str(),
                _ => "",
            };
            let mut prefixed = PrefixedContext::new(&mut *context, prefix);
            let unique_number = prefixed.unique_number();

            let index_value = entry.key.unwrap_or(Value::Int(position as i64));
            if let Some(index) = &self.index {
                prefixed.bind(&itemize(index, unique_number), index_value.clone());
                prefixed.bind(index, index_value);
            }
            if let Some(item) = &self.item {
                prefixed.bind(&itemize(item, unique_number), entry.value.clone());
                prefixed.bind(item, entry.value);
            }
            trace!(collection = %self.collection, unique_number, "repetition iteration");

            let mut renamed = ItemContext {
                delegate: &mut prefixed,
                item: self.item.as_deref(),
                index: self.index.as_deref(),
                unique_number,
            };
            self.contents.apply(config, &mut renamed)?;

            if first {
                first = !prefixed.prefix_applied;
            }
        }

        if let Some(close) = &self.close {
            context.append_sql(close);
        }

        let bindings = context.bindings_mut();
        if let Some(item) = &self.item {
            bindings.remove(item);
        }
        if let Some(index) = &self.index {
            bindings.remove(index);
        }
        Ok(true)
    }
}

fn itemize(name: &str, unique_number: usize) -> SmolStr {
    format_smolstr!("{ITEM_PREFIX}{name}_{unique_number}")
}

// `#{ item.name }` becomes `#{__frch_item_3.name}`, `#{items}` stays as is
fn rename(content: &str, name: &str, unique_number: usize) -> Option<String> {
    let rest = content.trim_start().strip_prefix(name)?;
    if rest.starts_with(|c: char| c.is_alphanumeric() || c == '_') {
        return None;
    }
    Some(format!("{}{rest}", itemize(name, unique_number)))
}

/// Writes `prefix` ahead of the first non-blank text appended through it.
struct PrefixedContext<'a> {
    delegate: &'a mut dyn SqlContext,
    prefix: &'a str,
    prefix_applied: bool,
}

impl<'a> PrefixedContext<'a> {
    fn new(delegate: &'a mut dyn SqlContext, prefix: &'a str) -> Self {
        Self {
            delegate,
            prefix,
            prefix_applied: false,
        }
    }
}

impl SqlContext for PrefixedContext<'_> {
    fn bindings(&self) -> &Bindings {
        self.delegate.bindings()
    }

    fn bindings_mut(&mut self) -> &mut Bindings {
        self.delegate.bindings_mut()
    }

    fn append_sql(&mut self, sql: &str) {
        if !self.prefix_applied && !sql.trim().is_empty() {
            self.delegate.append_sql(self.prefix);
            self.prefix_applied = true;
        }
        self.delegate.append_sql(sql);
    }

    fn unique_number(&mut self) -> usize {
        self.delegate.unique_number()
    }
}

/// Points the body's bind markers at this iteration's bindings.
struct ItemContext<'a> {
    delegate: &'a mut dyn SqlContext,
    item: Option<&'a str>,
    index: Option<&'a str>,
    unique_number: usize,
}

impl SqlContext for ItemContext<'_> {
    fn bindings(&self) -> &Bindings {
        self.delegate.bindings()
    }

    fn bindings_mut(&mut self) -> &mut Bindings {
        self.delegate.bindings_mut()
    }

    fn append_sql(&mut self, sql: &str) {
        let sql = TokenScanner::bind_markers()
            .keep_escapes()
            .parse(sql, |content| {
                let renamed = self
                    .item
                    .and_then(|item| rename(content, item, self.unique_number))
                    .or_else(|| {
                        self.index
                            .and_then(|index| rename(content, index, self.unique_number))
                    });
                format!("#{{{}}}", renamed.as_deref().unwrap_or(content))
            });
        self.delegate.append_sql(&sql);
    }

    fn unique_number(&mut self) -> usize {
        self.delegate.unique_number()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::DynamicContext,
        map,
        node::tests::render,
    };

    fn list(collection: &str, body: SqlNode) -> RepetitionNode {
        RepetitionNode::new(collection, body)
            .item("v")
            .open("(")
            .close(")")
            .separator(",")
    }

    #[test]
    fn test_renames_item_markers() {
        let node = SqlNode::from(list("ids", SqlNode::text("#{v}")));
        assert_eq!(
            "(#{__frch_v_0},#{__frch_v_1},#{__frch_v_2})",
            render(&node, map! { "ids" => vec![1, 2, 3] })
        );
    }

    #[test]
    fn test_empty_collection_renders_nothing() {
        let node = SqlNode::from(list("ids", SqlNode::text("#{v}")));
        assert_eq!("", render(&node, map! { "ids" => Vec::<i32>::new() }));
    }

    #[test]
    fn test_rename_rules() {
        assert_eq!(Some("__frch_v_2".to_string()), rename("v", "v", 2));
        assert_eq!(Some("__frch_v_2.name".to_string()), rename("  v.name", "v", 2));
        assert_eq!(Some("__frch_v_2,sqlType=INTEGER".to_string()), rename("v,sqlType=INTEGER", "v", 2));
        assert_eq!(Some("__frch_v_2:VARCHAR".to_string()), rename("v:VARCHAR", "v", 2));
        assert_eq!(Some("__frch_v_2[0]".to_string()), rename("v[0]", "v", 2));
        assert_eq!(None, rename("values", "v", 2));
        assert_eq!(None, rename("v_2", "v", 2));
        assert_eq!(None, rename("other.v", "v", 2));
    }

    #[test]
    fn test_index_only_when_item_does_not_match() {
        let node = SqlNode::from(
            RepetitionNode::new("names", SqlNode::text("#{i}=#{n} "))
                .item("n")
                .index("i"),
        );
        assert_eq!(
            "#{__frch_i_0}=#{__frch_n_0} #{__frch_i_1}=#{__frch_n_1}",
            render(&node, map! { "names" => vec!["a", "b"] })
        );
    }

    #[test]
    fn test_map_entries_bind_keys() {
        let config = Configuration::default();
        let node = RepetitionNode::new("attrs", SqlNode::text("${k}=${v};"))
            .item("v")
            .index("k");
        let mut context = DynamicContext::new(map! { "attrs" => map! { "a" => 1, "b" => 2 } }, None);
        node.apply(&config, &mut context).unwrap();
        assert_eq!("a=1;b=2;", context.sql());

        let bindings = context.bindings();
        assert_eq!(None, bindings.explicit("v"));
        assert_eq!(None, bindings.explicit("k"));
        assert_eq!(Some(&Value::Int(2)), bindings.explicit("__frch_v_1"));
        assert_eq!(Some(&Value::String("a".into())), bindings.explicit("__frch_k_0"));
    }

    #[test]
    fn test_separator_skips_leading_empty_iterations() {
        let body = SqlNode::conditional("v > 1", SqlNode::text("#{v}"));
        let node = SqlNode::from(list("ids", body));
        assert_eq!(
            "(#{__frch_v_1},#{__frch_v_2})",
            render(&node, map! { "ids" => vec![1, 2, 3] })
        );
    }

    #[test]
    fn test_escaped_marker_in_body() {
        let node = SqlNode::from(
            RepetitionNode::new("ids", SqlNode::text("\\#{v}")).item("v"),
        );
        assert_eq!("\\#{v}", render(&node, map! { "ids" => vec![1] }));
    }

    #[test]
    fn test_not_iterable() {
        let config = Configuration::default();
        let node = RepetitionNode::new("n", SqlNode::text("x")).item("v");
        let mut context = DynamicContext::new(map! { "n" => 3 }, None);
        assert!(matches!(
            node.apply(&config, &mut context),
            Err(Error::Expression { .. })
        ));
    }

    #[test]
    fn test_nested_counters_do_not_collide() {
        let inner = RepetitionNode::new("row", SqlNode::text("#{c}"))
            .item("c")
            .separator(",");
        let outer = RepetitionNode::new("rows", SqlNode::from(inner))
            .item("row")
            .open("(")
            .close(")")
            .separator("),(");
        let sql = render(
            &SqlNode::from(outer),
            map! { "rows" => vec![vec![1, 2], vec![3, 4]] },
        );
        assert_eq!(
            "(#{__frch_c_1},#{__frch_c_2}),(#{__frch_c_4},#{__frch_c_5})",
            sql
        );
    }
}

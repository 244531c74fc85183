use smol_str::SmolStr;

use crate::{config::Configuration, context::SqlContext, error::Result};

mod conditional;
mod repetition;
mod text;
mod trim;

pub use conditional::ConditionalNode;
pub use repetition::RepetitionNode;
pub use text::TextNode;
pub use trim::TrimNode;

/// A parsed template body.
///
/// Nodes hold no evaluation state and can be shared by concurrent compiles.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlNode {
    Text(TextNode),
    Conditional(ConditionalNode),
    Repetition(RepetitionNode),
    Trim(TrimNode),
    Sequence(Vec<SqlNode>),
}

impl SqlNode {
    pub fn text<T: Into<SmolStr>>(text: T) -> Self {
        SqlNode::Text(TextNode::new(text))
    }

    /// Renders `contents` only when `test` evaluates to true.
    pub fn conditional<T: Into<SmolStr>>(test: T, contents: SqlNode) -> Self {
        SqlNode::Conditional(ConditionalNode::new(test, contents))
    }

    pub fn repetition(node: RepetitionNode) -> Self {
        SqlNode::Repetition(node)
    }

    pub fn trim(node: TrimNode) -> Self {
        SqlNode::Trim(node)
    }

    pub fn where_clause(contents: SqlNode) -> Self {
        SqlNode::Trim(TrimNode::where_clause(contents))
    }

    pub fn set_clause(contents: SqlNode) -> Self {
        SqlNode::Trim(TrimNode::set_clause(contents))
    }

    pub fn sequence<I>(nodes: I) -> Self
    where
        I: IntoIterator<Item = SqlNode>,
    {
        SqlNode::Sequence(nodes.into_iter().collect())
    }

    /// Renders the node into `context`, returning whether it produced its body.
    pub fn apply(&self, config: &Configuration, context: &mut dyn SqlContext) -> Result<bool> {
        match self {
            SqlNode::Text(node) => node.apply(config, context),
            SqlNode::Conditional(node) => node.apply(config, context),
            SqlNode::Repetition(node) => node.apply(config, context),
            SqlNode::Trim(node) => node.apply(config, context),
            SqlNode::Sequence(nodes) => {
                for node in nodes {
                    node.apply(config, context)?;
                }
                Ok(true)
            }
        }
    }

    /// A tree is static only when it is made of text without markers.
    pub fn is_dynamic(&self) -> bool {
        match self {
            SqlNode::Text(node) => node.has_markers(),
            SqlNode::Conditional(_) | SqlNode::Repetition(_) | SqlNode::Trim(_) => true,
            SqlNode::Sequence(nodes) => nodes.iter().any(SqlNode::is_dynamic),
        }
    }
}

impl From<TextNode> for SqlNode {
    fn from(node: TextNode) -> Self {
        SqlNode::Text(node)
    }
}

impl From<ConditionalNode> for SqlNode {
    fn from(node: ConditionalNode) -> Self {
        SqlNode::Conditional(node)
    }
}

impl From<RepetitionNode> for SqlNode {
    fn from(node: RepetitionNode) -> Self {
        SqlNode::Repetition(node)
    }
}

impl From<TrimNode> for SqlNode {
    fn from(node: TrimNode) -> Self {
        SqlNode::Trim(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{context::DynamicContext, map, value::Value};

    pub(crate) fn render(node: &SqlNode, parameter: Value) -> String {
        let config = Configuration::default();
        let mut context = DynamicContext::new(parameter, None);
        node.apply(&config, &mut context).unwrap();
        context.sql().to_string()
    }

    #[test]
    fn test_sequence_concatenates() {
        let node = SqlNode::sequence([SqlNode::text("select *"), SqlNode::text(" from t")]);
        assert_eq!("select * from t", render(&node, Value::Null));
    }

    #[test]
    fn test_is_dynamic() {
        assert!(!SqlNode::text("select 1").is_dynamic());
        assert!(SqlNode::text("where id = #{id}").is_dynamic());
        assert!(SqlNode::text("order by ${col}").is_dynamic());
        assert!(!SqlNode::text("literal \\#{id}").is_dynamic());
        assert!(SqlNode::conditional("true", SqlNode::text("x")).is_dynamic());
        assert!(
            SqlNode::sequence([SqlNode::text("a"), SqlNode::where_clause(SqlNode::text("b"))])
                .is_dynamic()
        );
    }

    #[test]
    fn test_conditional_in_sequence() {
        let node = SqlNode::sequence([
            SqlNode::text("select * from t"),
            SqlNode::conditional("id != null", SqlNode::text(" where id = #{id}")),
        ]);
        assert_eq!("select * from t where id = #{id}", render(&node, map! { "id" => 1 }));
        assert_eq!("select * from t", render(&node, map! { "id" => Value::Null }));
    }
}

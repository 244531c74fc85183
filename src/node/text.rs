use smol_str::SmolStr;
use tracing::trace;

use crate::{
    config::Configuration,
    context::{SqlContext, VALUE_KEY},
    error::{Error, Result},
    scanner::TokenScanner,
};

#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    text: SmolStr,
    substitutions: bool,
    markers: bool,
}

impl TextNode {
    pub fn new<T: Into<SmolStr>>(text: T) -> Self {
        let text = text.into();
        let substitutions = TokenScanner::substitutions().contains_span(&text);
        let markers = substitutions || TokenScanner::bind_markers().contains_span(&text);
        Self {
            text,
            substitutions,
            markers,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn has_markers(&self) -> bool {
        self.markers
    }

    pub(crate) fn apply(&self, config: &Configuration, context: &mut dyn SqlContext) -> Result<bool> {
        if !self.substitutions {
            context.append_sql(&self.text);
            return Ok(true);
        }

        let sql = TokenScanner::substitutions().try_parse(&self.text, |content: &str| -> Result<String> {
            let parameter = context.bindings().parameter();
            if parameter.is_simple() {
                let parameter = parameter.clone();
                context.bind(VALUE_KEY, parameter);
            }

            let value = config
                .evaluator
                .evaluate(content, context.bindings())
                .map_err(|source| Error::expression(content, source))?;
            let value = value.to_string();

            if let Some(filter) = &config.injection_filter {
                if !filter.is_match(&value) {
                    return Err(Error::Injection {
                        value,
                        pattern: filter.as_str().to_string(),
                    });
                }
            }
            trace!(expression = content, value = %value, "substituted");
            Ok(value)
        })?;
        context.append_sql(&sql);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::DynamicContext,
        IntoValue, map,
        node::{SqlNode, tests::render},
        value::Value,
    };

    #[test]
    fn test_substitutes_and_keeps_markers() {
        let node = SqlNode::text("select * from ${table} where id = #{id}");
        assert_eq!(
            "select * from users where id = #{id}",
            render(&node, map! { "table" => "users", "id" => 1 })
        );
    }

    #[test]
    fn test_null_renders_empty() {
        let node = SqlNode::text("a${missing}b");
        assert_eq!("ab", render(&node, map! {}));
    }

    #[test]
    fn test_value_alias_for_simple_argument() {
        let node = SqlNode::text("order by ${value}");
        assert_eq!("order by name", render(&node, "name".into_value()));
        let node = SqlNode::text("limit ${_parameter}");
        assert_eq!("limit 10", render(&node, Value::Int(10)));
    }

    #[test]
    fn test_injection_filter() {
        let config = Configuration::builder()
            .injection_filter("[a-z_]+")
            .build()
            .unwrap();
        let node = SqlNode::text("order by ${col}");

        let mut context = DynamicContext::new(map! { "col" => "name" }, None);
        node.apply(&config, &mut context).unwrap();
        assert_eq!("order by name", context.sql());

        let mut context = DynamicContext::new(map! { "col" => "1; drop table t" }, None);
        let err = node.apply(&config, &mut context).unwrap_err();
        assert!(matches!(err, Error::Injection { .. }));
    }

    #[test]
    fn test_evaluator_error_propagates() {
        let config = Configuration::default();
        let node = SqlNode::text("${a ==}");
        let mut context = DynamicContext::new(Value::Null, None);
        let err = node.apply(&config, &mut context).unwrap_err();
        assert!(matches!(err, Error::Expression { .. }));
    }
}

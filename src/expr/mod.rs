use std::fmt;

use crate::{context::Bindings, value::Value};

mod ast;
mod eval;
mod parser;

pub use ast::{BinaryOp, Expr};
pub use parser::parse_expression;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExpressionError {
    #[error("syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("source is null for property '{0}'")]
    NullSource(String),

    #[error("no property '{property}' on {on}")]
    UnknownProperty { property: String, on: String },

    #[error("no method '{method}()' on {on}")]
    UnknownMethod { method: String, on: String },

    #[error("cannot apply '{operator}' to {lhs} and {rhs}")]
    TypeMismatch {
        operator: &'static str,
        lhs: String,
        rhs: String,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("return value ({0}) was not iterable")]
    NotIterable(String),

    #[error("{0}")]
    Custom(String),
}

/// One element produced by iterating a collection expression.
///
/// Lists produce positional elements (`key` is `None`), maps and records
/// produce their entries keyed by field name.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: Option<Value>,
    pub value: Value,
}

/// Evaluates test, collection and substitution expressions against the
/// bindings of one compile call.
pub trait ExpressionEvaluator: fmt::Debug + Send + Sync {
    fn evaluate(&self, expression: &str, bindings: &Bindings) -> Result<Value, ExpressionError>;

    fn evaluate_boolean(
        &self,
        expression: &str,
        bindings: &Bindings,
    ) -> Result<bool, ExpressionError> {
        let value = self.evaluate(expression, bindings)?;
        Ok(truthy(&value))
    }

    fn evaluate_iterable(
        &self,
        expression: &str,
        bindings: &Bindings,
    ) -> Result<Vec<Entry>, ExpressionError> {
        let value = self.evaluate(expression, bindings)?;
        entries(value)
    }
}

/// Property paths, comparisons, boolean and arithmetic operators, and a handful
/// of zero-argument methods (`size()`, `length()`, `isEmpty()`, `trim()`,
/// `toString()`).
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultEvaluator;

impl ExpressionEvaluator for DefaultEvaluator {
    fn evaluate(&self, expression: &str, bindings: &Bindings) -> Result<Value, ExpressionError> {
        let expr = parse_expression(expression)?;
        eval::evaluate(&expr, bindings)
    }
}

/// Null is false, numbers are true when non-zero, anything else is true.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Float(f) => *f != 0.0,
        _ => true,
    }
}

pub fn entries(value: Value) -> Result<Vec<Entry>, ExpressionError> {
    match value {
        Value::List(items) => Ok(items
            .into_iter()
            .map(|value| Entry { key: None, value })
            .collect()),
        Value::Map(map) => Ok(map
            .into_iter()
            .map(|(key, value)| Entry {
                key: Some(Value::String(key)),
                value,
            })
            .collect()),
        Value::Record(record) => Ok(record
            .fields
            .into_iter()
            .map(|(key, value)| Entry {
                key: Some(Value::String(key)),
                value,
            })
            .collect()),
        Value::Null => Err(ExpressionError::NotIterable("null".to_string())),
        other => Err(ExpressionError::NotIterable(format!(
            "{} of type {}",
            other,
            other.value_type()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{IntoValue, RecordValue, map};

    fn bindings(parameter: Value) -> Bindings {
        Bindings::new(parameter, None)
    }

    fn eval(expression: &str, parameter: Value) -> Result<Value, ExpressionError> {
        DefaultEvaluator.evaluate(expression, &bindings(parameter))
    }

    #[test]
    fn test_null_checks() {
        let param = map! { "name" => "ann", "age" => Value::Null };
        let b = bindings(param);
        assert!(DefaultEvaluator.evaluate_boolean("name != null", &b).unwrap());
        assert!(!DefaultEvaluator.evaluate_boolean("age != null", &b).unwrap());
        assert!(
            DefaultEvaluator
                .evaluate_boolean("name != null and name != ''", &b)
                .unwrap()
        );
        assert!(!DefaultEvaluator.evaluate_boolean("missing", &b).unwrap());
    }

    #[test]
    fn test_boolean_coercion() {
        let b = bindings(map! { "zero" => 0, "one" => 1, "empty" => "" });
        assert!(!DefaultEvaluator.evaluate_boolean("zero", &b).unwrap());
        assert!(DefaultEvaluator.evaluate_boolean("one", &b).unwrap());
        // non-null strings are true, even empty ones
        assert!(DefaultEvaluator.evaluate_boolean("empty", &b).unwrap());
    }

    #[test]
    fn test_operators() {
        assert_eq!(Ok(Value::Int(7)), eval("1 + 2 * 3", Value::Null));
        assert_eq!(Ok(Value::Int(9)), eval("(1 + 2) * 3", Value::Null));
        assert_eq!(Ok(Value::Float(2.5)), eval("5 / 2.0", Value::Null));
        assert_eq!(Ok(Value::Int(-3)), eval("-3", Value::Null));
        assert_eq!(Ok(Value::Bool(true)), eval("2 gte 2 && !(1 > 2)", Value::Null));
        assert_eq!(Ok(Value::Bool(true)), eval("not false or false", Value::Null));
        assert_eq!(Ok(Value::String("ab1".into())), eval("'a' + \"b\" + 1", Value::Null));
        assert_eq!(Err(ExpressionError::DivisionByZero), eval("1 / 0", Value::Null));
    }

    #[test]
    fn test_paths_and_methods() {
        let user = RecordValue::new("User")
            .field("name", " ann ")
            .field("tags", vec!["a", "b"]);
        let param = map! { "user" => user, "ids" => vec![1, 2, 3] };
        assert_eq!(Ok(Value::Int(3)), eval("ids.size()", param.clone()));
        assert_eq!(Ok(Value::Int(2)), eval("ids[1]", param.clone()));
        assert_eq!(Ok("b".into_value()), eval("user.tags[1]", param.clone()));
        assert_eq!(Ok("ann".into_value()), eval("user.name.trim()", param.clone()));
        assert_eq!(Ok(Value::Bool(false)), eval("user.tags.isEmpty()", param.clone()));
        assert!(matches!(
            eval("user.age", param.clone()),
            Err(ExpressionError::UnknownProperty { .. })
        ));
        assert!(matches!(
            eval("nothing.name", param),
            Err(ExpressionError::NullSource(_))
        ));
    }

    #[test]
    fn test_record_parameter_fallback() {
        let user = RecordValue::new("User").field("id", 3);
        assert_eq!(Ok(Value::Bool(true)), eval("id == 3", Value::Record(user.clone())));
        assert!(matches!(
            eval("name", Value::Record(user)),
            Err(ExpressionError::UnknownProperty { .. })
        ));
    }

    #[test]
    fn test_scalar_parameter_fallback() {
        assert_eq!(Ok(Value::Bool(true)), eval("id != null and id > 3", Value::Int(5)));
        assert_eq!(Ok(Value::Bool(false)), eval("id != null", Value::Null));
    }

    #[test]
    fn test_keywords_are_not_prefixes() {
        let b = bindings(map! { "order" => 1, "android" => 2 });
        assert_eq!(Ok(Value::Int(1)), DefaultEvaluator.evaluate("order", &b));
        assert_eq!(Ok(Value::Bool(true)), DefaultEvaluator.evaluate("android == 2", &b));
    }

    #[test]
    fn test_syntax_error() {
        assert!(matches!(
            eval("a ==", Value::Null),
            Err(ExpressionError::Syntax { .. })
        ));
        assert!(matches!(
            eval("a b", Value::Null),
            Err(ExpressionError::Syntax { position: 2, .. })
        ));
    }

    #[test]
    fn test_iterable() {
        let b = bindings(map! { "ids" => vec![4, 5], "attrs" => map! { "k" => "v" }, "n" => 1 });
        let items = DefaultEvaluator.evaluate_iterable("ids", &b).unwrap();
        assert_eq!(2, items.len());
        assert_eq!(None, items[0].key);
        let entries = DefaultEvaluator.evaluate_iterable("attrs", &b).unwrap();
        assert_eq!(Some("k".into_value()), entries[0].key);
        assert!(matches!(
            DefaultEvaluator.evaluate_iterable("n", &b),
            Err(ExpressionError::NotIterable(_))
        ));
    }
}

extern crate self as qscript;

#[cfg(any(feature = "postgres", feature = "mysql", feature = "sqlite"))]
mod arguments;
mod config;
mod context;
pub mod dialect;
mod error;
pub mod expr;
mod node;
mod param;
mod path;
mod placeholder;
mod scanner;
mod template;
mod types;
mod value;
mod writer;

#[cfg(any(feature = "postgres", feature = "mysql", feature = "sqlite"))]
pub use arguments::to_arguments;

pub use config::{Configuration, ConfigurationBuilder};
pub use context::{Bindings, DynamicContext, SqlContext};
pub use dialect::{Dialect, HasDialect};
pub use error::{Error, Result};
pub use expr::{DefaultEvaluator, Entry, ExpressionError, ExpressionEvaluator};
pub use node::{ConditionalNode, RepetitionNode, SqlNode, TextNode, TrimNode};
pub use param::{ParameterMapping, ParameterMode};
pub use path::{PropertyPath, Segment};
pub use scanner::TokenScanner;
pub use template::{BoundSql, BoundValue, Template, compile};
pub use types::{PropertyIntrospector, SqlType, TypeHandlerRef, TypeHandlerRegistry, TypeRegistry};
pub use value::{HasValueType, IntoValue, Record, RecordValue, Value, ValueType};

pub use qscript_derive::Record;

pub fn text(value: &str) -> SqlNode {
    SqlNode::text(value)
}

pub fn text_static(value: &'static str) -> SqlNode {
    SqlNode::Text(TextNode::new(smol_str::SmolStr::new_static(value)))
}

#[doc(hidden)]
pub mod __private {
    pub use indexmap::IndexMap;
    pub use smol_str::SmolStr;
}

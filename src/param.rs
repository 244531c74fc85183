use std::{fmt, str::FromStr};

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::{
    error::{Error, Result},
    types::{SqlType, TypeHandlerRef},
    value::ValueType,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParameterMode {
    #[default]
    In,
    Out,
    InOut,
}

impl FromStr for ParameterMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("in") {
            Ok(ParameterMode::In)
        } else if s.eq_ignore_ascii_case("out") {
            Ok(ParameterMode::Out)
        } else if s.eq_ignore_ascii_case("inout") {
            Ok(ParameterMode::InOut)
        } else {
            Err(())
        }
    }
}

impl fmt::Display for ParameterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterMode::In => f.write_str("IN"),
            ParameterMode::Out => f.write_str("OUT"),
            ParameterMode::InOut => f.write_str("INOUT"),
        }
    }
}

/// Describes how the value for one placeholder is found and bound.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterMapping {
    pub(crate) position: usize,
    pub(crate) property: Option<SmolStr>,
    pub(crate) value_type: ValueType,
    pub(crate) sql_type: Option<SqlType>,
    pub(crate) sql_type_name: Option<SmolStr>,
    pub(crate) mode: ParameterMode,
    pub(crate) numeric_scale: Option<u32>,
    pub(crate) result_map: Option<SmolStr>,
    pub(crate) type_handler: Option<TypeHandlerRef>,
}

impl ParameterMapping {
    pub(crate) fn new(position: usize, property: Option<SmolStr>, value_type: ValueType) -> Self {
        Self {
            position,
            property,
            value_type,
            sql_type: None,
            sql_type_name: None,
            mode: ParameterMode::In,
            numeric_scale: None,
            result_map: None,
            type_handler: None,
        }
    }

    /// Zero-based placeholder position.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn property(&self) -> Option<&str> {
        self.property.as_deref()
    }

    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    pub fn sql_type(&self) -> Option<SqlType> {
        self.sql_type
    }

    pub fn sql_type_name(&self) -> Option<&str> {
        self.sql_type_name.as_deref()
    }

    pub fn mode(&self) -> ParameterMode {
        self.mode
    }

    pub fn numeric_scale(&self) -> Option<u32> {
        self.numeric_scale
    }

    pub fn result_map(&self) -> Option<&str> {
        self.result_map.as_deref()
    }

    pub fn type_handler(&self) -> Option<&TypeHandlerRef> {
        self.type_handler.as_ref()
    }
}

/// Attribute names accepted in a bind marker, with their legacy spellings.
pub(crate) fn canonical_attribute(name: &str) -> Option<&'static str> {
    match name {
        "property" => Some("property"),
        "valueType" | "javaType" => Some("valueType"),
        "sqlType" | "jdbcType" => Some("sqlType"),
        "sqlTypeName" | "jdbcTypeName" => Some("sqlTypeName"),
        "mode" => Some("mode"),
        "numericScale" => Some("numericScale"),
        "resultMap" => Some("resultMap"),
        "typeHandler" => Some("typeHandler"),
        "expression" => Some("expression"),
        _ => None,
    }
}

/// Splits marker content such as `id:INTEGER, mode=OUT` into its attributes.
///
/// The property path is stored under `property` and a `:TYPE` shorthand under
/// `sqlType`. Keys are kept as written; validation happens in the caller.
pub(crate) fn parse_marker(content: &str) -> Result<IndexMap<SmolStr, SmolStr>> {
    let mut attributes = IndexMap::new();
    let trimmed = content.trim_start();

    if trimmed.starts_with('(') {
        return Err(Error::ExpressionParameter {
            content: content.to_string(),
        });
    }

    let end = trimmed.find([':', ',']).unwrap_or(trimmed.len());
    let property = trimmed[..end].trim();
    if !property.is_empty() {
        attributes.insert(SmolStr::new_static("property"), SmolStr::new(property));
    }
    let mut rest = &trimmed[end..];

    if let Some(tail) = rest.strip_prefix(':') {
        let end = tail.find(',').unwrap_or(tail.len());
        let sql_type = tail[..end].trim();
        if sql_type.is_empty() {
            return Err(syntax(content, "expected a type after ':'"));
        }
        attributes.insert(SmolStr::new_static("sqlType"), SmolStr::new(sql_type));
        rest = &tail[end..];
    }

    while let Some(tail) = rest.strip_prefix(',') {
        let end = tail.find(',').unwrap_or(tail.len());
        let option = &tail[..end];
        let Some((key, value)) = option.split_once('=') else {
            return Err(syntax(content, "expected 'name=value'"));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(syntax(content, "empty attribute name"));
        }
        // an explicit `property=` never replaces the leading path
        if !(key == "property" && attributes.contains_key("property")) {
            attributes.insert(SmolStr::new(key), SmolStr::new(value.trim()));
        }
        rest = &tail[end..];
    }

    Ok(attributes)
}

fn syntax(content: &str, message: &str) -> Error {
    Error::MarkerSyntax {
        content: content.to_string(),
        message: message.to_string(),
    }
}

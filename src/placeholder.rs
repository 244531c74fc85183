use smol_str::SmolStr;

use crate::{
    config::Configuration,
    context::Bindings,
    error::{Error, Result},
    param::{ParameterMapping, ParameterMode, canonical_attribute, parse_marker},
    scanner::TokenScanner,
    types::SqlType,
    value::ValueType,
    writer::FormatContext,
};

/// Replaces every bind marker of a rendered template with a placeholder and
/// describes, in order, how each placeholder is bound.
pub(crate) struct MarkerPass<'c> {
    config: &'c Configuration,
    parameter_type: &'c ValueType,
    bindings: Option<&'c Bindings>,
}

impl<'c> MarkerPass<'c> {
    pub fn new(
        config: &'c Configuration,
        parameter_type: &'c ValueType,
        bindings: Option<&'c Bindings>,
    ) -> Self {
        Self {
            config,
            parameter_type,
            bindings,
        }
    }

    pub fn run(&self, sql: &str) -> Result<(String, Vec<ParameterMapping>)> {
        let mut mappings = Vec::new();
        let mut token = String::with_capacity(4);
        let mut writer = FormatContext::new(&mut token, self.config.dialect);

        let sql = TokenScanner::bind_markers().try_parse(sql, |content: &str| -> Result<String> {
            let mapping = self.mapping(mappings.len(), content)?;
            mappings.push(mapping);
            writer
                .write_placeholder()
                .map_err(|_| syntax(content, "could not write placeholder"))?;
            Ok(std::mem::take(writer.writer))
        })?;
        Ok((sql, mappings))
    }

    fn mapping(&self, position: usize, content: &str) -> Result<ParameterMapping> {
        let attributes = parse_marker(content)?;
        let property = attributes.get("property").cloned();
        let sql_type = match attributes
            .iter()
            .find(|(key, _)| canonical_attribute(key) == Some("sqlType"))
        {
            Some((_, value)) => Some(self.sql_type(content, value)?),
            None => None,
        };

        let value_type = self.infer_type(property.as_deref(), sql_type);
        let mut mapping = ParameterMapping::new(position, property, value_type);
        mapping.sql_type = sql_type;

        let mut type_handler_alias: Option<&SmolStr> = None;
        for (key, value) in &attributes {
            match canonical_attribute(key) {
                Some("property" | "sqlType") => {}
                Some("valueType") => {
                    mapping.value_type = self.config.type_handlers.resolve_type(value)?;
                }
                Some("mode") => {
                    mapping.mode = value
                        .parse::<ParameterMode>()
                        .map_err(|_| invalid(content, key, value))?;
                }
                Some("numericScale") => {
                    mapping.numeric_scale = Some(
                        value
                            .parse::<u32>()
                            .map_err(|_| invalid(content, key, value))?,
                    );
                }
                Some("resultMap") => mapping.result_map = Some(value.clone()),
                Some("typeHandler") => type_handler_alias = Some(value),
                Some("sqlTypeName") => mapping.sql_type_name = Some(value.clone()),
                Some("expression") => {
                    return Err(Error::ExpressionParameter {
                        content: content.to_string(),
                    });
                }
                _ => {
                    return Err(Error::UnknownAttribute {
                        name: key.to_string(),
                        content: content.to_string(),
                    });
                }
            }
        }

        let handlers = &self.config.type_handlers;
        mapping.type_handler = match type_handler_alias {
            Some(alias) => Some(handlers.resolve_type_handler(&mapping.value_type, alias)?),
            None => handlers.type_handler(&mapping.value_type, mapping.sql_type),
        };

        validate(&mapping)?;
        Ok(mapping)
    }

    // first match wins
    fn infer_type(&self, property: Option<&str>, sql_type: Option<SqlType>) -> ValueType {
        if let (Some(bindings), Some(property)) = (self.bindings, property) {
            if let Some(value) = bindings.additional(property) {
                return value.value_type();
            }
        }
        if self.config.type_handlers.has_type_handler(self.parameter_type) {
            return self.parameter_type.clone();
        }
        if sql_type == Some(SqlType::Cursor) {
            return ValueType::ResultSet;
        }
        let Some(property) = property else {
            return ValueType::Any;
        };
        if *self.parameter_type == ValueType::Map {
            return ValueType::Any;
        }
        self.config
            .introspector
            .getter_type(self.parameter_type, property)
            .unwrap_or(ValueType::Any)
    }

    fn sql_type(&self, content: &str, value: &str) -> Result<SqlType> {
        value
            .parse::<SqlType>()
            .map_err(|_| invalid(content, "sqlType", value))
    }
}

fn validate(mapping: &ParameterMapping) -> Result<()> {
    let property = || mapping.property().unwrap_or_default().to_string();
    if mapping.value_type == ValueType::ResultSet {
        if mapping.result_map.is_none() {
            return Err(Error::MissingResultMap(property()));
        }
    } else if mapping.type_handler.is_none() {
        return Err(Error::MissingTypeHandler {
            property: property(),
            value_type: mapping.value_type.to_string(),
            sql_type: mapping
                .sql_type
                .map_or_else(|| "null".to_string(), |ty| ty.to_string()),
        });
    }
    Ok(())
}

fn invalid(content: &str, name: &str, value: &str) -> Error {
    Error::InvalidAttribute {
        name: name.to_string(),
        value: value.to_string(),
        content: content.to_string(),
    }
}

fn syntax(content: &str, message: &str) -> Error {
    Error::MarkerSyntax {
        content: content.to_string(),
        message: message.to_string(),
    }
}

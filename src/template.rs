use tracing::debug;

use crate::{
    config::Configuration,
    context::{Bindings, DynamicContext},
    error::Result,
    node::SqlNode,
    param::{ParameterMapping, ParameterMode},
    path::PropertyPath,
    placeholder::MarkerPass,
    types::SqlType,
    value::{IntoValue, Value, ValueType},
    writer::shrink_whitespace,
};

/// A template body ready to be compiled against arguments.
///
/// Bodies without markers or dynamic nodes are rendered once, here, and every
/// compile returns that same result.
#[derive(Debug, Clone)]
pub struct Template {
    source: Source,
    parameter_type: ValueType,
}

#[derive(Debug, Clone)]
enum Source {
    Static(BoundSql),
    Dynamic(SqlNode),
}

impl Template {
    pub fn new(
        config: &Configuration,
        root: SqlNode,
        parameter_type: Option<ValueType>,
    ) -> Result<Self> {
        let parameter_type = parameter_type.unwrap_or_default();
        if root.is_dynamic() {
            debug!(parameter_type = %parameter_type, "dynamic template");
            return Ok(Self {
                source: Source::Dynamic(root),
                parameter_type,
            });
        }

        let mut context = DynamicContext::new(Value::Null, config.database_id());
        root.apply(config, &mut context)?;
        let (sql, _) = context.into_parts();
        let (sql, parameter_mappings) = render(config, &sql, &parameter_type, None)?;
        debug!(sql = %sql, "static template");

        Ok(Self {
            source: Source::Static(BoundSql {
                sql,
                parameter_mappings,
                bindings: Bindings::default(),
                parameter: Value::Null,
            }),
            parameter_type,
        })
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self.source, Source::Dynamic(_))
    }

    pub fn parameter_type(&self) -> &ValueType {
        &self.parameter_type
    }

    pub fn compile<A>(&self, config: &Configuration, argument: A) -> Result<BoundSql>
    where
        A: IntoValue,
    {
        let argument = argument.into_value();
        let root = match &self.source {
            Source::Static(bound) => {
                return Ok(BoundSql {
                    parameter: argument,
                    ..bound.clone()
                });
            }
            Source::Dynamic(root) => root,
        };

        let mut context = DynamicContext::new(argument, config.database_id());
        root.apply(config, &mut context)?;
        let (sql, bindings) = context.into_parts();

        // the runtime shape of the argument is more precise than the declared one
        let parameter_type = match bindings.parameter() {
            Value::Null => self.parameter_type.clone(),
            parameter => parameter.value_type(),
        };
        let (sql, parameter_mappings) = render(config, &sql, &parameter_type, Some(&bindings))?;
        debug!(sql = %sql, parameters = parameter_mappings.len(), "compiled template");

        let parameter = bindings.parameter().clone();
        Ok(BoundSql {
            sql,
            parameter_mappings,
            bindings,
            parameter,
        })
    }
}

fn render(
    config: &Configuration,
    sql: &str,
    parameter_type: &ValueType,
    bindings: Option<&Bindings>,
) -> Result<(String, Vec<ParameterMapping>)> {
    let pass = MarkerPass::new(config, parameter_type, bindings);
    if config.shrink_whitespace {
        pass.run(&shrink_whitespace(sql))
    } else {
        pass.run(sql)
    }
}

/// Builds a template and compiles it once.
pub fn compile<A>(config: &Configuration, root: SqlNode, argument: A) -> Result<BoundSql>
where
    A: IntoValue,
{
    Template::new(config, root, None)?.compile(config, argument)
}

/// Final SQL with the descriptors of its placeholders, in order.
#[derive(Debug, Clone)]
pub struct BoundSql {
    sql: String,
    parameter_mappings: Vec<ParameterMapping>,
    bindings: Bindings,
    parameter: Value,
}

impl BoundSql {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameter_mappings(&self) -> &[ParameterMapping] {
        &self.parameter_mappings
    }

    pub fn parameter(&self) -> &Value {
        &self.parameter
    }

    /// Bindings added while rendering, including the per-iteration names.
    pub fn additional_bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn into_parts(self) -> (String, Vec<ParameterMapping>) {
        (self.sql, self.parameter_mappings)
    }

    /// Resolves the value of every placeholder, in order.
    pub fn bound_values(&self, config: &Configuration) -> Vec<BoundValue<'_>> {
        self.parameter_mappings
            .iter()
            .map(|mapping| {
                let value = if mapping.mode() == ParameterMode::Out {
                    Value::Null
                } else {
                    self.resolve(config, mapping.property().unwrap_or_default())
                };
                let sql_type = match mapping.sql_type() {
                    None if value.is_null() => Some(config.null_sql_type()),
                    sql_type => sql_type,
                };
                BoundValue {
                    mapping,
                    value,
                    sql_type,
                }
            })
            .collect()
    }

    fn resolve(&self, config: &Configuration, property: &str) -> Value {
        let root = PropertyPath::root(property);
        if self.bindings.contains(root) {
            return self.bindings.additional(property).cloned().unwrap_or_default();
        }
        if self.parameter.is_null() {
            return Value::Null;
        }
        if config.type_handlers().has_type_handler(&self.parameter.value_type()) {
            return self.parameter.clone();
        }
        self.parameter.lookup(property).cloned().unwrap_or_default()
    }
}

/// A placeholder's descriptor together with the value to bind to it.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundValue<'a> {
    pub mapping: &'a ParameterMapping,
    pub value: Value,
    /// The descriptor's type tag, or the configured null type for null values.
    pub sql_type: Option<SqlType>,
}

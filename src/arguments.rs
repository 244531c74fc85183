use sqlx::{Arguments, Database, Encode, Type};

use crate::{
    error::{Error, Result},
    template::BoundValue,
    value::{Value, ValueType},
};

/// Collects resolved values into the argument buffer of a sqlx database.
///
/// Nulls are typed after the descriptor's value type so that drivers with
/// strict parameter typing accept them.
pub fn to_arguments<'q, DB>(values: &[BoundValue<'_>]) -> Result<DB::Arguments<'q>>
where
    DB: Database,
    Option<bool>: Encode<'q, DB> + Type<DB>,
    Option<i64>: Encode<'q, DB> + Type<DB>,
    Option<f64>: Encode<'q, DB> + Type<DB>,
    Option<String>: Encode<'q, DB> + Type<DB>,
{
    let mut arguments: DB::Arguments<'q> = Default::default();
    arguments.reserve(values.len(), 0);

    for bound in values {
        let property = || bound.mapping.property().unwrap_or_default().to_string();
        let added = match &bound.value {
            Value::Null => match bound.mapping.value_type() {
                ValueType::Bool => arguments.add(None::<bool>),
                ValueType::Int => arguments.add(None::<i64>),
                ValueType::Float => arguments.add(None::<f64>),
                _ => arguments.add(None::<String>),
            },
            Value::Bool(b) => arguments.add(Some(*b)),
            Value::Int(i) => arguments.add(Some(*i)),
            Value::Float(f) => arguments.add(Some(*f)),
            Value::String(s) => arguments.add(Some(s.to_string())),
            other => {
                return Err(Error::UnsupportedValue {
                    property: property(),
                    value_type: other.value_type().to_string(),
                });
            }
        };
        added.map_err(|err| Error::Encode {
            property: property(),
            message: err.to_string(),
        })?;
    }
    Ok(arguments)
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::{compile, config::Configuration, map, node::SqlNode};

    #[test]
    fn test_collects_scalars() {
        let config = Configuration::default();
        let bound = compile(
            &config,
            SqlNode::text("insert into t values (#{a}, #{b}, #{c}, #{d})"),
            map! { "a" => 1, "b" => "x", "c" => Value::Null, "d" => 1.5 },
        )
        .unwrap();
        let values = bound.bound_values(&config);
        let arguments = to_arguments::<sqlx::Sqlite>(&values).unwrap();
        assert_eq!(4, arguments.len());
    }

    #[test]
    fn test_rejects_lists() {
        let config = Configuration::default();
        let bound = compile(&config, SqlNode::text("#{ids}"), map! { "ids" => vec![1] }).unwrap();
        let values = bound.bound_values(&config);
        assert!(matches!(
            to_arguments::<sqlx::Sqlite>(&values),
            Err(Error::UnsupportedValue { .. })
        ));
    }
}

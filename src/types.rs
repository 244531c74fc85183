use std::{collections::HashMap, fmt, str::FromStr};

use smol_str::SmolStr;

use crate::{
    error::{Error, Result},
    path::{PropertyPath, Segment},
    value::{Record, ValueType},
};

/// Explicit type tag a descriptor can carry, named after the JDBC type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Array,
    BigInt,
    Binary,
    Bit,
    Blob,
    Boolean,
    Char,
    Clob,
    Cursor,
    Date,
    Decimal,
    Double,
    Float,
    Integer,
    LongVarChar,
    NChar,
    NClob,
    Null,
    Numeric,
    NVarChar,
    Other,
    Real,
    SmallInt,
    Struct,
    Time,
    Timestamp,
    TinyInt,
    Undefined,
    VarBinary,
    VarChar,
}

const SQL_TYPES: &[(SqlType, &str)] = &[
    (SqlType::Array, "ARRAY"),
    (SqlType::BigInt, "BIGINT"),
    (SqlType::Binary, "BINARY"),
    (SqlType::Bit, "BIT"),
    (SqlType::Blob, "BLOB"),
    (SqlType::Boolean, "BOOLEAN"),
    (SqlType::Char, "CHAR"),
    (SqlType::Clob, "CLOB"),
    (SqlType::Cursor, "CURSOR"),
    (SqlType::Date, "DATE"),
    (SqlType::Decimal, "DECIMAL"),
    (SqlType::Double, "DOUBLE"),
    (SqlType::Float, "FLOAT"),
    (SqlType::Integer, "INTEGER"),
    (SqlType::LongVarChar, "LONGVARCHAR"),
    (SqlType::NChar, "NCHAR"),
    (SqlType::NClob, "NCLOB"),
    (SqlType::Null, "NULL"),
    (SqlType::Numeric, "NUMERIC"),
    (SqlType::NVarChar, "NVARCHAR"),
    (SqlType::Other, "OTHER"),
    (SqlType::Real, "REAL"),
    (SqlType::SmallInt, "SMALLINT"),
    (SqlType::Struct, "STRUCT"),
    (SqlType::Time, "TIME"),
    (SqlType::Timestamp, "TIMESTAMP"),
    (SqlType::TinyInt, "TINYINT"),
    (SqlType::Undefined, "UNDEFINED"),
    (SqlType::VarBinary, "VARBINARY"),
    (SqlType::VarChar, "VARCHAR"),
];

impl SqlType {
    pub fn as_str(self) -> &'static str {
        SQL_TYPES
            .iter()
            .find(|(ty, _)| *ty == self)
            .map_or("OTHER", |(_, name)| name)
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SqlType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        SQL_TYPES
            .iter()
            .find(|(_, name)| name.eq_ignore_ascii_case(s))
            .map(|(ty, _)| *ty)
            .ok_or(())
    }
}

/// Name of the handler that converts a descriptor's value for the driver.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeHandlerRef(SmolStr);

impl TypeHandlerRef {
    pub fn new<T: Into<SmolStr>>(name: T) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeHandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait TypeHandlerRegistry: fmt::Debug + Send + Sync {
    fn has_type_handler(&self, ty: &ValueType) -> bool;

    /// Default handler for a value type, optionally narrowed by a type tag.
    fn type_handler(&self, ty: &ValueType, sql_type: Option<SqlType>) -> Option<TypeHandlerRef>;

    /// Resolves an explicit `typeHandler=` attribute.
    fn resolve_type_handler(&self, ty: &ValueType, alias: &str) -> Result<TypeHandlerRef>;

    /// Resolves an explicit `valueType=` attribute.
    fn resolve_type(&self, alias: &str) -> Result<ValueType>;
}

pub trait PropertyIntrospector: fmt::Debug + Send + Sync {
    fn getter_type(&self, ty: &ValueType, path: &str) -> Option<ValueType>;

    fn has_getter(&self, ty: &ValueType, path: &str) -> bool {
        self.getter_type(ty, path).is_some()
    }
}

/// Handlers for the scalar types, type aliases and registered record shapes.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    handlers: HashMap<ValueType, TypeHandlerRef>,
    aliases: HashMap<SmolStr, ValueType>,
    records: HashMap<SmolStr, Vec<(SmolStr, ValueType)>>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        let mut registry = Self {
            handlers: HashMap::new(),
            aliases: HashMap::new(),
            records: HashMap::new(),
        };
        registry.register_type_handler(ValueType::Bool, "bool");
        registry.register_type_handler(ValueType::Int, "int");
        registry.register_type_handler(ValueType::Float, "float");
        registry.register_type_handler(ValueType::String, "string");
        registry.register_type_handler(ValueType::Any, "unknown");

        for (alias, ty) in [
            ("bool", ValueType::Bool),
            ("boolean", ValueType::Bool),
            ("int", ValueType::Int),
            ("integer", ValueType::Int),
            ("long", ValueType::Int),
            ("short", ValueType::Int),
            ("byte", ValueType::Int),
            ("float", ValueType::Float),
            ("double", ValueType::Float),
            ("string", ValueType::String),
            ("list", ValueType::List),
            ("map", ValueType::Map),
            ("hashmap", ValueType::Map),
            ("object", ValueType::Any),
            ("any", ValueType::Any),
            ("resultset", ValueType::ResultSet),
        ] {
            registry.register_alias(alias, ty);
        }
        registry
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_type_handler<N>(&mut self, ty: ValueType, name: N)
    where
        N: Into<SmolStr>,
    {
        self.handlers.insert(ty, TypeHandlerRef::new(name));
    }

    /// Aliases are matched case-insensitively.
    pub fn register_alias(&mut self, alias: &str, ty: ValueType) {
        self.aliases.insert(alias.to_ascii_lowercase().into(), ty);
    }

    /// Makes the property types of `T` visible to introspection, and its type
    /// name usable as a `valueType=` alias.
    pub fn register_record<T: Record>(&mut self) {
        let properties = T::properties()
            .into_iter()
            .map(|(name, ty)| (SmolStr::new_static(name), ty))
            .collect();
        self.records.insert(SmolStr::new_static(T::TYPE_NAME), properties);
        self.register_alias(T::TYPE_NAME, ValueType::record(T::TYPE_NAME));
    }

    fn property_type(&self, ty: &ValueType, name: &str) -> Option<ValueType> {
        match ty {
            ValueType::Record(record) => self
                .records
                .get(record)?
                .iter()
                .find(|(property, _)| property == name)
                .map(|(_, ty)| ty.clone()),
            // entries of a generic mapping are untyped
            ValueType::Map | ValueType::Any => Some(ValueType::Any),
            _ => None,
        }
    }
}

impl TypeHandlerRegistry for TypeRegistry {
    fn has_type_handler(&self, ty: &ValueType) -> bool {
        self.handlers.contains_key(ty)
    }

    fn type_handler(&self, ty: &ValueType, _sql_type: Option<SqlType>) -> Option<TypeHandlerRef> {
        self.handlers.get(ty).cloned()
    }

    fn resolve_type_handler(&self, ty: &ValueType, alias: &str) -> Result<TypeHandlerRef> {
        self.handlers
            .values()
            .find(|handler| handler.name().eq_ignore_ascii_case(alias.trim()))
            .cloned()
            .ok_or_else(|| Error::UnknownTypeHandler {
                alias: alias.to_string(),
                value_type: ty.to_string(),
            })
    }

    fn resolve_type(&self, alias: &str) -> Result<ValueType> {
        self.aliases
            .get(alias.trim().to_ascii_lowercase().as_str())
            .cloned()
            .ok_or_else(|| Error::UnknownType(alias.to_string()))
    }
}

impl PropertyIntrospector for TypeRegistry {
    fn getter_type(&self, ty: &ValueType, path: &str) -> Option<ValueType> {
        PropertyPath::new(path).try_fold(ty.clone(), |current, segment| match segment {
            Segment::Name(name) => self.property_type(&current, name),
            // element types of lists are not tracked
            Segment::Index(key) => match current {
                ValueType::List => Some(ValueType::Any),
                other => self.property_type(&other, key),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::User;

    #[test]
    fn test_sql_type_parse() {
        assert_eq!(Ok(SqlType::Cursor), "cursor".parse());
        assert_eq!(Ok(SqlType::VarChar), " VARCHAR ".parse());
        assert_eq!(Err(()), "TEXTISH".parse::<SqlType>());
        assert_eq!("NUMERIC", SqlType::Numeric.to_string());
    }

    #[test]
    fn test_default_handlers() {
        let registry = TypeRegistry::default();
        assert!(registry.has_type_handler(&ValueType::Int));
        assert!(registry.has_type_handler(&ValueType::Any));
        assert!(!registry.has_type_handler(&ValueType::Map));
        assert_eq!(
            Some(TypeHandlerRef::new("string")),
            registry.type_handler(&ValueType::String, None)
        );
    }

    #[test]
    fn test_resolve_aliases() {
        let mut registry = TypeRegistry::default();
        assert_eq!(ValueType::Int, registry.resolve_type("Long").unwrap());
        assert!(matches!(registry.resolve_type("Widget"), Err(Error::UnknownType(_))));
        registry.register_record::<User>();
        assert_eq!(ValueType::record("User"), registry.resolve_type("user").unwrap());
        assert_eq!(
            TypeHandlerRef::new("int"),
            registry.resolve_type_handler(&ValueType::Any, "INT").unwrap()
        );
    }

    #[test]
    fn test_getter_type() {
        let mut registry = TypeRegistry::default();
        registry.register_record::<User>();
        let user = ValueType::record("User");
        assert_eq!(Some(ValueType::Int), registry.getter_type(&user, "id"));
        assert_eq!(Some(ValueType::String), registry.getter_type(&user, "name"));
        assert_eq!(Some(ValueType::Any), registry.getter_type(&user, "tags[0]"));
        assert_eq!(None, registry.getter_type(&user, "missing"));
        assert_eq!(Some(ValueType::Any), registry.getter_type(&ValueType::Map, "a.b"));
        assert!(!registry.has_getter(&ValueType::Int, "x"));
    }
}

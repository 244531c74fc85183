use std::{collections::HashMap, fmt};

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::path::{PropertyPath, Segment};

/// Runtime argument handed to a template, and every value derived from it
/// while evaluating.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(SmolStr),
    List(Vec<Value>),
    Map(IndexMap<SmolStr, Value>),
    Record(RecordValue),
}

/// A value with a declared type, the counterpart of a plain struct.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordValue {
    pub(crate) type_name: SmolStr,
    pub(crate) fields: IndexMap<SmolStr, Value>,
}

impl RecordValue {
    pub fn new<T>(type_name: T) -> Self
    where
        T: Into<SmolStr>,
    {
        Self {
            type_name: type_name.into(),
            fields: IndexMap::new(),
        }
    }

    pub fn field<K, V>(mut self, name: K, value: V) -> Self
    where
        K: Into<SmolStr>,
        V: IntoValue,
    {
        self.fields.insert(name.into(), value.into_value());
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Static shape of a value, used when inferring parameter types.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum ValueType {
    #[default]
    Any,
    Bool,
    Int,
    Float,
    String,
    List,
    Map,
    Record(SmolStr),
    ResultSet,
}

impl ValueType {
    pub fn record<T: Into<SmolStr>>(name: T) -> Self {
        Self::Record(name.into())
    }

    pub fn is_simple(&self) -> bool {
        matches!(self, Self::Bool | Self::Int | Self::Float | Self::String)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Any => f.write_str("any"),
            ValueType::Bool => f.write_str("bool"),
            ValueType::Int => f.write_str("int"),
            ValueType::Float => f.write_str("float"),
            ValueType::String => f.write_str("string"),
            ValueType::List => f.write_str("list"),
            ValueType::Map => f.write_str("map"),
            ValueType::Record(name) => f.write_str(name),
            ValueType::ResultSet => f.write_str("result set"),
        }
    }
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Any,
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::String(_) => ValueType::String,
            Value::List(_) => ValueType::List,
            Value::Map(_) => ValueType::Map,
            Value::Record(record) => ValueType::Record(record.type_name.clone()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Null or a scalar, the kind of argument that is also reachable as `value`.
    pub fn is_simple(&self) -> bool {
        matches!(
            self,
            Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::String(_)
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Named member of a map or record.
    pub fn property(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Map(map) => map.get(name),
            Value::Record(record) => record.get(name),
            _ => None,
        }
    }

    /// Bracketed member: list position, or key of a map or record.
    pub fn index(&self, key: &str) -> Option<&Value> {
        match self {
            Value::List(items) => key.trim().parse::<usize>().ok().and_then(|i| items.get(i)),
            other => other.property(key),
        }
    }

    /// Walks a full property path such as `user.roles[0].name`.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        PropertyPath::new(path).try_fold(self, |current, segment| match segment {
            Segment::Name(name) => current.property(name),
            Segment::Index(key) => current.index(key),
        })
    }

    pub fn len(&self) -> Option<usize> {
        match self {
            Value::String(s) => Some(s.chars().count()),
            Value::List(items) => Some(items.len()),
            Value::Map(map) => Some(map.len()),
            Value::Record(record) => Some(record.fields.len()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Map(map) => write_entries(f, map.iter()),
            Value::Record(record) => {
                f.write_str(&record.type_name)?;
                write_entries(f, record.fields.iter())
            }
        }
    }
}

fn write_entries<'a, I>(f: &mut fmt::Formatter<'_>, entries: I) -> fmt::Result
where
    I: Iterator<Item = (&'a SmolStr, &'a Value)>,
{
    f.write_str("{")?;
    for (index, (key, value)) in entries.enumerate() {
        if index > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{key}={value}")?;
    }
    f.write_str("}")
}

pub trait IntoValue {
    fn into_value(self) -> Value;
}

/// Static type of a Rust type once converted to a [`Value`].
pub trait HasValueType {
    fn value_type() -> ValueType;
}

/// A struct exposed to templates as a typed record.
///
/// Usually derived with `#[derive(Record)]`.
pub trait Record: IntoValue + HasValueType {
    const TYPE_NAME: &'static str;

    fn properties() -> Vec<(&'static str, ValueType)>;
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for RecordValue {
    fn into_value(self) -> Value {
        Value::Record(self)
    }
}

impl IntoValue for () {
    fn into_value(self) -> Value {
        Value::Null
    }
}

macro_rules! scalar_value {
    ($variant:ident, $ty:ident, $($src:ty),+) => {
        $(
            impl IntoValue for $src {
                fn into_value(self) -> Value {
                    Value::$variant(self.into())
                }
            }

            impl HasValueType for $src {
                fn value_type() -> ValueType {
                    ValueType::$ty
                }
            }
        )+
    };
}

scalar_value!(Bool, Bool, bool);
scalar_value!(Int, Int, i8, i16, i32, i64, u8, u16, u32);
scalar_value!(Float, Float, f32, f64);
scalar_value!(String, String, String, &str, SmolStr);

impl IntoValue for char {
    fn into_value(self) -> Value {
        Value::String(smol_str::format_smolstr!("{}", self))
    }
}

impl HasValueType for char {
    fn value_type() -> ValueType {
        ValueType::String
    }
}

impl IntoValue for &String {
    fn into_value(self) -> Value {
        Value::String(SmolStr::new(self))
    }
}

impl<T> IntoValue for Option<T>
where
    T: IntoValue,
{
    fn into_value(self) -> Value {
        if let Some(value) = self {
            value.into_value()
        } else {
            Value::Null
        }
    }
}

impl<T: HasValueType> HasValueType for Option<T> {
    fn value_type() -> ValueType {
        T::value_type()
    }
}

impl<T> IntoValue for Vec<T>
where
    T: IntoValue,
{
    fn into_value(self) -> Value {
        Value::List(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T> HasValueType for Vec<T> {
    fn value_type() -> ValueType {
        ValueType::List
    }
}

impl<T, const N: usize> IntoValue for [T; N]
where
    T: IntoValue,
{
    fn into_value(self) -> Value {
        Value::List(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<K, V> IntoValue for IndexMap<K, V>
where
    K: Into<SmolStr>,
    V: IntoValue,
{
    fn into_value(self) -> Value {
        Value::Map(
            self.into_iter()
                .map(|(k, v)| (k.into(), v.into_value()))
                .collect(),
        )
    }
}

impl<K, V> HasValueType for IndexMap<K, V> {
    fn value_type() -> ValueType {
        ValueType::Map
    }
}

impl<K, V> IntoValue for HashMap<K, V>
where
    K: Into<SmolStr>,
    V: IntoValue,
{
    fn into_value(self) -> Value {
        Value::Map(
            self.into_iter()
                .map(|(k, v)| (k.into(), v.into_value()))
                .collect(),
        )
    }
}

impl<K, V> HasValueType for HashMap<K, V> {
    fn value_type() -> ValueType {
        ValueType::Map
    }
}

#[cfg(feature = "json")]
impl IntoValue for serde_json::Value {
    fn into_value(self) -> Value {
        use serde_json::Value as Json;

        match self {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map_or(Value::Null, Value::Float),
            },
            Json::String(s) => Value::String(s.into()),
            Json::Array(items) => items.into_value(),
            Json::Object(map) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| (SmolStr::from(k), v.into_value()))
                    .collect(),
            ),
        }
    }
}

/// Builds a [`Value::Map`] from `key => value` pairs.
#[macro_export]
macro_rules! map {
    () => {
        $crate::Value::Map($crate::__private::IndexMap::new())
    };
    ( $($key:expr => $value:expr),+ $(,)? ) => {{
        let mut map = $crate::__private::IndexMap::new();
        $( map.insert($crate::__private::SmolStr::from($key), $crate::IntoValue::into_value($value)); )+
        $crate::Value::Map(map)
    }};
}

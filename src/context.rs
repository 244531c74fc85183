use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::{
    path::PropertyPath,
    value::Value,
};

pub const PARAMETER_KEY: &str = "_parameter";
pub const DATABASE_ID_KEY: &str = "_databaseId";
pub const VALUE_KEY: &str = "value";

/// Name to value environment of one compile call.
///
/// Explicit bindings win; a name that was never bound falls back to the
/// property of the same name on the argument.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    parameter: Value,
    values: IndexMap<SmolStr, Value>,
}

impl Bindings {
    pub fn new(parameter: Value, database_id: Option<&str>) -> Self {
        let mut values = IndexMap::new();
        values.insert(SmolStr::new_static(PARAMETER_KEY), parameter.clone());
        values.insert(
            SmolStr::new_static(DATABASE_ID_KEY),
            database_id.map_or(Value::Null, |id| Value::String(id.into())),
        );
        Self { parameter, values }
    }

    pub fn parameter(&self) -> &Value {
        &self.parameter
    }

    pub fn bind<K>(&mut self, name: K, value: Value)
    where
        K: Into<SmolStr>,
    {
        self.values.insert(name.into(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// A value bound by name, ignoring the argument fallback.
    pub fn explicit(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name).or_else(|| match &self.parameter {
            Value::Null => None,
            parameter if parameter.is_simple() => Some(parameter),
            parameter => parameter.property(name),
        })
    }

    /// Resolves a full path like `__item_0.name` against explicit bindings only.
    pub fn additional(&self, path: &str) -> Option<&Value> {
        let root = PropertyPath::root(path);
        let value = self.values.get(root)?;
        value.lookup(&path.trim()[root.len()..])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Accumulates the text a node tree renders, and carries its bindings.
///
/// Repetition and trim nodes wrap the context they receive in a decorator that
/// intercepts [`SqlContext::append_sql`] and forwards everything else.
pub trait SqlContext {
    fn bindings(&self) -> &Bindings;

    fn bindings_mut(&mut self) -> &mut Bindings;

    fn append_sql(&mut self, sql: &str);

    /// Returns the next value of a counter that is shared by the whole tree.
    fn unique_number(&mut self) -> usize;

    fn bind(&mut self, name: &str, value: Value) {
        self.bindings_mut().bind(name, value);
    }
}

/// Root context of a compile call.
#[derive(Debug)]
pub struct DynamicContext {
    bindings: Bindings,
    sql: String,
    unique_number: usize,
}

impl DynamicContext {
    pub fn new(parameter: Value, database_id: Option<&str>) -> Self {
        Self {
            bindings: Bindings::new(parameter, database_id),
            sql: String::with_capacity(64),
            unique_number: 0,
        }
    }

    pub fn sql(&self) -> &str {
        self.sql.trim()
    }

    pub fn into_parts(self) -> (String, Bindings) {
        let sql = self.sql.trim().to_string();
        (sql, self.bindings)
    }
}

impl SqlContext for DynamicContext {
    fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    fn bindings_mut(&mut self) -> &mut Bindings {
        &mut self.bindings
    }

    fn append_sql(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    fn unique_number(&mut self) -> usize {
        let current = self.unique_number;
        self.unique_number += 1;
        current
    }
}

use std::sync::Arc;

use regex::Regex;
use smol_str::SmolStr;

use crate::{
    dialect::{Dialect, HasDialect},
    error::Result,
    expr::{DefaultEvaluator, ExpressionEvaluator},
    types::{PropertyIntrospector, SqlType, TypeHandlerRegistry, TypeRegistry},
};

/// Capabilities and switches shared by every template compiled against it.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub(crate) dialect: Dialect,
    pub(crate) database_id: Option<SmolStr>,
    pub(crate) shrink_whitespace: bool,
    pub(crate) injection_filter: Option<Regex>,
    pub(crate) null_sql_type: SqlType,
    pub(crate) evaluator: Arc<dyn ExpressionEvaluator>,
    pub(crate) type_handlers: Arc<dyn TypeHandlerRegistry>,
    pub(crate) introspector: Arc<dyn PropertyIntrospector>,
}

impl Default for Configuration {
    fn default() -> Self {
        let registry = Arc::new(TypeRegistry::default());
        Self {
            dialect: Dialect::default(),
            database_id: None,
            shrink_whitespace: false,
            injection_filter: None,
            null_sql_type: SqlType::Other,
            evaluator: Arc::new(DefaultEvaluator),
            type_handlers: registry.clone(),
            introspector: registry,
        }
    }
}

impl Configuration {
    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::default()
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn database_id(&self) -> Option<&str> {
        self.database_id.as_deref()
    }

    pub fn null_sql_type(&self) -> SqlType {
        self.null_sql_type
    }

    pub fn evaluator(&self) -> &dyn ExpressionEvaluator {
        self.evaluator.as_ref()
    }

    pub fn type_handlers(&self) -> &dyn TypeHandlerRegistry {
        self.type_handlers.as_ref()
    }

    pub fn introspector(&self) -> &dyn PropertyIntrospector {
        self.introspector.as_ref()
    }
}

#[derive(Debug, Default)]
pub struct ConfigurationBuilder {
    config: Configuration,
    injection_filter: Option<String>,
}

impl ConfigurationBuilder {
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.config.dialect = dialect;
        self
    }

    pub fn dialect_of<D: HasDialect>(self) -> Self {
        self.dialect(D::DIALECT)
    }

    pub fn database_id<T: Into<SmolStr>>(mut self, id: T) -> Self {
        self.config.database_id = Some(id.into());
        self
    }

    pub fn shrink_whitespace(mut self, shrink: bool) -> Self {
        self.config.shrink_whitespace = shrink;
        self
    }

    /// Every `${}` substitution must match this pattern in full.
    pub fn injection_filter<T: Into<String>>(mut self, pattern: T) -> Self {
        self.injection_filter = Some(pattern.into());
        self
    }

    pub fn null_sql_type(mut self, sql_type: SqlType) -> Self {
        self.config.null_sql_type = sql_type;
        self
    }

    pub fn evaluator(mut self, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.config.evaluator = evaluator;
        self
    }

    pub fn type_handlers(mut self, registry: Arc<dyn TypeHandlerRegistry>) -> Self {
        self.config.type_handlers = registry;
        self
    }

    pub fn introspector(mut self, introspector: Arc<dyn PropertyIntrospector>) -> Self {
        self.config.introspector = introspector;
        self
    }

    pub fn type_registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.config.type_handlers = registry.clone();
        self.config.introspector = registry;
        self
    }

    pub fn build(self) -> Result<Configuration> {
        let mut config = self.config;
        if let Some(pattern) = self.injection_filter {
            config.injection_filter = Some(Regex::new(&format!("^(?:{pattern})$"))?);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dialect::Postgres, error::Error};

    #[test]
    fn test_defaults() {
        let config = Configuration::default();
        assert_eq!(Dialect::Generic, config.dialect());
        assert_eq!(None, config.database_id());
        assert_eq!(SqlType::Other, config.null_sql_type());
        assert!(!config.shrink_whitespace);
    }

    #[test]
    fn test_builder() {
        let config = Configuration::builder()
            .dialect_of::<Postgres>()
            .database_id("pg")
            .null_sql_type(SqlType::Null)
            .injection_filter("[a-z_]+")
            .build()
            .unwrap();
        assert_eq!(Dialect::Postgres, config.dialect());
        assert_eq!(Some("pg"), config.database_id());
        let filter = config.injection_filter.as_ref().unwrap();
        assert!(filter.is_match("name"));
        assert!(!filter.is_match("name; drop table t"));
    }

    #[test]
    fn test_invalid_filter() {
        let result = Configuration::builder().injection_filter("[a-").build();
        assert!(matches!(result, Err(Error::Regex(_))));
    }
}

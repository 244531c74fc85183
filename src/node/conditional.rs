use smol_str::SmolStr;

use crate::{
    config::Configuration,
    context::SqlContext,
    error::{Error, Result},
};

use super::SqlNode;

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalNode {
    test: SmolStr,
    contents: Box<SqlNode>,
}

impl ConditionalNode {
    pub fn new<T: Into<SmolStr>>(test: T, contents: SqlNode) -> Self {
        Self {
            test: test.into(),
            contents: Box::new(contents),
        }
    }

    pub fn test(&self) -> &str {
        &self.test
    }

    pub(crate) fn apply(&self, config: &Configuration, context: &mut dyn SqlContext) -> Result<bool> {
        let passed = config
            .evaluator
            .evaluate_boolean(&self.test, context.bindings())
            .map_err(|source| Error::expression(&self.test, source))?;
        if passed {
            self.contents.apply(config, context)?;
        }
        Ok(passed)
    }
}

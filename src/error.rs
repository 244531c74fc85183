use crate::expr::ExpressionError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) const VALID_ATTRIBUTES: &str =
    "valueType,sqlType,mode,numericScale,resultMap,typeHandler,sqlTypeName";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(
        "parsing error was found in mapping #{{{content}}}: {message}. Check syntax #{{property|(expression), var1=value1, var2=value2, ...}}"
    )]
    MarkerSyntax { content: String, message: String },

    #[error(
        "an invalid property '{name}' was found in mapping #{{{content}}}. Valid properties are {}",
        VALID_ATTRIBUTES
    )]
    UnknownAttribute { name: String, content: String },

    #[error("expression based parameters are not supported yet, found in mapping #{{{content}}}")]
    ExpressionParameter { content: String },

    #[error("invalid value '{value}' for '{name}' in mapping #{{{content}}}")]
    InvalidAttribute {
        name: String,
        value: String,
        content: String,
    },

    #[error("error evaluating expression '{expression}': {source}")]
    Expression {
        expression: String,
        #[source]
        source: ExpressionError,
    },

    #[error("invalid input '{value}', substitutions must conform to regex {pattern}")]
    Injection { value: String, pattern: String },

    #[error("could not resolve type alias '{0}'")]
    UnknownType(String),

    #[error("could not resolve type handler '{alias}' for {value_type}")]
    UnknownTypeHandler { alias: String, value_type: String },

    #[error("missing result map in property '{0}', result set parameters require a resultMap")]
    MissingResultMap(String),

    #[error(
        "type handler was null on parameter mapping for property '{property}', none found for {value_type} : {sql_type}"
    )]
    MissingTypeHandler {
        property: String,
        value_type: String,
        sql_type: String,
    },

    #[error("cannot bind {value_type} value of parameter '{property}'")]
    UnsupportedValue { property: String, value_type: String },

    #[error("could not encode parameter '{property}': {message}")]
    Encode { property: String, message: String },

    #[error("invalid injection filter: {0}")]
    Regex(#[from] regex::Error),
}

impl Error {
    pub(crate) fn expression(expression: &str, source: ExpressionError) -> Self {
        Self::Expression {
            expression: expression.to_string(),
            source,
        }
    }
}

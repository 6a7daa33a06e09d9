use thiserror::Error;

use crate::expression::Expression;


#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaError {
    #[error("syntax error: {0}")]
    SyntaxError(String),

    #[error("variable \"{0}\" is not defined")]
    UndefinedVariable(String),

    #[error("expected {expected} argument(s), got {actual}")]
    ArityError { expected: usize, actual: usize },

    #[error("unimplemented form: {0}")]
    UnimplementedForm(Expression),

    #[error("`{operator}` expects {expected}, found {found}")]
    TypeError { operator: String, expected: &'static str, found: &'static str },

    #[error("{0} is not callable")]
    NotCallable(String),

    #[error("maximum evaluation depth of {0} exceeded")]
    RecursionLimit(usize),
}

impl EvaError {
    /// Name of the error variant, as used by the driver and the test fixtures
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SyntaxError(_) => "SyntaxError",
            Self::UndefinedVariable(_) => "UndefinedVariable",
            Self::ArityError { .. } => "ArityError",
            Self::UnimplementedForm(_) => "UnimplementedForm",
            Self::TypeError { .. } => "TypeError",
            Self::NotCallable(_) => "NotCallable",
            Self::RecursionLimit(_) => "RecursionLimit",
        }
    }
}

mod builtin;
mod context;
mod environment;
mod error;
mod expression;
mod function;
mod interpreter;
mod parser;
mod stack;

#[cfg(test)]
mod test_utils;

pub use builtin::{global_environment, Operator, VERSION};
pub use context::{Config, EvaluationContext};
pub use environment::Environment;
pub use error::EvaError;
pub use expression::{is_number, is_quoted_string, is_variable_name, Expression, SpecialForm};
pub use function::{Builtin, BuiltinFn, Closure, Function};
pub use interpreter::{evaluate, EvaluationResult, Value, DEFAULT_MAX_DEPTH};
pub use parser::{parse, parse_program};

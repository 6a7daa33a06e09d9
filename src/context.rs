use tracing::debug;

use crate::{
    builtin::global_environment,
    environment::Environment,
    error::EvaError,
    expression::Expression,
    interpreter::{evaluate_with, CallDepth, EvaluationResult, Value, DEFAULT_MAX_DEPTH},
    parser::parse_program,
};


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Deepest nesting of user function calls before [`EvaError::RecursionLimit`]
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self { max_depth: DEFAULT_MAX_DEPTH }
    }
}

/// A long-lived evaluation session.
///
/// Each call evaluates against the same global environment, so definitions
/// carry over between calls. A failing call leaves the session usable; any
/// bindings made before the failure are kept.
pub struct EvaluationContext {
    global: Environment,
    config: Config,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            global: global_environment(),
            config,
        }
    }

    pub fn global(&self) -> &Environment {
        &self.global
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn evaluate(&mut self, expression: &Expression) -> EvaluationResult {
        evaluate_with(expression, &self.global, &mut CallDepth::new(self.config.max_depth))
    }

    /// Parses `input` as a program and evaluates its top-level expressions in
    /// order, returning the value of the last one
    pub fn evaluate_str(&mut self, input: &str) -> Result<Value, EvaError> {
        let program = parse_program(input)?;
        debug!(expressions = program.len(), "evaluating program");

        let mut result = Value::Undefined;
        for expression in &program {
            result = self.evaluate(expression)?;
        }
        Ok(result)
    }
}

impl Default for EvaluationContext {
    fn default() -> Self {
        Self::new()
    }
}

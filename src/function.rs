use core::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::{environment::Environment, error::EvaError, expression::Expression, interpreter::{evaluate_body, CallDepth, EvaluationResult, Value}};


pub type BuiltinFn = fn(Vec<Value>) -> EvaluationResult;

/// A host-implemented function stored in the global environment
#[derive(Clone, Copy)]
pub struct Builtin {
    name: &'static str,
    function: BuiltinFn,
}

impl Builtin {
    pub const fn new(name: &'static str, function: BuiltinFn) -> Self {
        Self { name, function }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn call(&self, arguments: Vec<Value>) -> EvaluationResult {
        (self.function)(arguments)
    }
}

struct ClosureData {
    name: Option<String>,
    parameters: Vec<String>,
    body: Expression,
    environment: Environment,
}

/// A user-defined function together with the environment it was defined in.
///
/// The environment is held by reference: later changes to bindings in the
/// defining scope are visible when the closure runs.
#[derive(Clone)]
pub struct Closure(Rc<ClosureData>);

impl Closure {
    pub fn new(name: Option<String>, parameters: Vec<String>, body: Expression, environment: Environment) -> Self {
        Self(Rc::new(ClosureData { name, parameters, body, environment }))
    }

    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    pub fn parameters(&self) -> &[String] {
        &self.0.parameters
    }

    pub fn body(&self) -> &Expression {
        &self.0.body
    }

    pub fn environment(&self) -> &Environment {
        &self.0.environment
    }

    pub fn ptr_eq(&self, other: &Closure) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn call(&self, arguments: Vec<Value>, depth: &mut CallDepth) -> EvaluationResult {
        if arguments.len() != self.parameters().len() {
            return Err(EvaError::ArityError { expected: self.parameters().len(), actual: arguments.len() });
        }

        // The activation scope hangs off the defining scope, not the caller's
        let activation = Environment::child(self.environment());
        for (parameter, argument) in self.parameters().iter().zip(arguments) {
            activation.define(parameter.as_str(), argument);
        }

        depth.enter()?;
        let result = evaluate_body(self.body(), &activation, depth);
        depth.leave();
        result
    }
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("name", &self.0.name)
            .field("parameters", &self.0.parameters)
            .field("body", &self.0.body.to_string())
            .finish()
    }
}

#[derive(Clone)]
pub enum Function {
    Builtin(Builtin),
    Closure(Closure),
}

impl Function {
    pub(crate) fn call(&self, arguments: Vec<Value>, depth: &mut CallDepth) -> EvaluationResult {
        match self {
            Self::Builtin(builtin) => {
                debug!(builtin = builtin.name(), arguments = arguments.len(), "calling builtin");
                builtin.call(arguments)
            }
            Self::Closure(closure) => {
                debug!(function = closure.name().unwrap_or("lambda"), arguments = arguments.len(), "calling function");
                closure.call(arguments, depth)
            }
        }
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Builtin(a), Self::Builtin(b)) => a.name() == b.name(),
            (Self::Closure(a), Self::Closure(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin(builtin) => write!(f, "Builtin({})", builtin.name()),
            Self::Closure(closure) => fmt::Debug::fmt(closure, f),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin(builtin) => write!(f, "<builtin {}>", builtin.name()),
            Self::Closure(closure) => match closure.name() {
                Some(name) => write!(f, "<function {}>", name),
                None => write!(f, "<lambda>"),
            },
        }
    }
}

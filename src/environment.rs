use core::fmt;
use std::{cell::RefCell, collections::HashMap, rc::Rc};

use itertools::Itertools;
use tracing::trace;

use crate::{error::EvaError, interpreter::{EvaluationResult, Value}};


struct Scope {
    bindings: RefCell<HashMap<String, Value>>,
    parent: Option<Environment>,
}

/// A scope mapping names to values, chained to an optional parent scope.
///
/// Environments are shared handles: cloning one gives another reference to the
/// same scope, which is how closures keep their defining scope alive after the
/// block that created it has returned.
#[derive(Clone)]
pub struct Environment(Rc<Scope>);

impl Environment {
    /// A root environment with no parent
    pub fn root(bindings: HashMap<String, Value>) -> Self {
        Self(Rc::new(Scope {
            bindings: RefCell::new(bindings),
            parent: None,
        }))
    }

    /// A fresh, empty environment whose parent is `parent`
    pub fn child(parent: &Environment) -> Self {
        Self(Rc::new(Scope {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(parent.clone()),
        }))
    }

    pub fn parent(&self) -> Option<&Environment> {
        self.0.parent.as_ref()
    }

    /// Binds `name` in this scope only, overwriting a previous local binding
    pub fn define(&self, name: impl Into<String>, value: Value) -> Value {
        let name = name.into();
        trace!(%name, "define");
        self.0.bindings.borrow_mut().insert(name, value.clone());
        value
    }

    /// Overwrites `name` in the nearest scope of the chain that defines it
    pub fn assign(&self, name: &str, value: Value) -> EvaluationResult {
        let scope = self.resolve(name)
            .ok_or_else(|| EvaError::UndefinedVariable(name.to_owned()))?;
        trace!(%name, "assign");
        scope.0.bindings.borrow_mut().insert(name.to_owned(), value.clone());
        Ok(value)
    }

    pub fn lookup(&self, name: &str) -> EvaluationResult {
        self.resolve(name)
            .and_then(|scope| scope.0.bindings.borrow().get(name).cloned())
            .ok_or_else(|| EvaError::UndefinedVariable(name.to_owned()))
    }

    pub fn contains_local(&self, name: &str) -> bool {
        self.0.bindings.borrow().contains_key(name)
    }

    pub fn ptr_eq(&self, other: &Environment) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn resolve(&self, name: &str) -> Option<&Environment> {
        let mut current = Some(self);
        while let Some(environment) = current {
            if environment.contains_local(name) {
                return Some(environment);
            }
            current = environment.parent();
        }
        None
    }
}

// Bindings may hold closures that point back at this scope, so only names are printed
impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.0.bindings.borrow().keys().sorted().join(", ");
        write!(f, "Environment {{ {} }}", names)?;
        if let Some(parent) = self.parent() {
            write!(f, " -> {:?}", parent)?;
        }
        Ok(())
    }
}

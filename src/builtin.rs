use std::collections::HashMap;

use itertools::Itertools;

use crate::{environment::Environment, error::EvaError, function::{Builtin, BuiltinFn, Function}, interpreter::{EvaluationResult, Value}};


pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Arithmetic and comparison operators. A list headed by one of these symbols
/// is evaluated inline; the same operators are also bound as builtin values
/// in the global environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Eq,
}

impl Operator {
    pub const ALL: [Operator; 10] = [
        Self::Add, Self::Sub, Self::Mul, Self::Div, Self::Rem,
        Self::Less, Self::LessEq, Self::Greater, Self::GreaterEq, Self::Eq,
    ];

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|operator| operator.symbol() == symbol)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Less => "<",
            Self::LessEq => "<=",
            Self::Greater => ">",
            Self::GreaterEq => ">=",
            Self::Eq => "==",
        }
    }

    /// Applies the operator to already evaluated operands. Every operator is
    /// binary, except that `-` with a single operand negates it.
    pub fn apply(self, operands: Vec<Value>) -> EvaluationResult {
        match (self, operands.as_slice()) {
            (Self::Sub, [operand]) => Ok(Value::Number(-self.number(operand)?)),
            (_, [left, right]) => self.apply_binary(left, right),
            (_, operands) => Err(EvaError::ArityError { expected: 2, actual: operands.len() }),
        }
    }

    fn apply_binary(self, left: &Value, right: &Value) -> EvaluationResult {
        if let (Self::Add, Value::String(left), Value::String(right)) = (self, left, right) {
            return Ok(Value::String(format!("{}{}", left, right).into()));
        }
        if self == Self::Eq {
            return Ok(Value::Boolean(left == right));
        }

        let (left, right) = (self.number(left)?, self.number(right)?);
        Ok(match self {
            Self::Add => Value::Number(left + right),
            Self::Sub => Value::Number(left - right),
            Self::Mul => Value::Number(left * right),
            Self::Div => Value::Number(left / right),
            Self::Rem => Value::Number(left % right),
            Self::Less => Value::Boolean(left < right),
            Self::LessEq => Value::Boolean(left <= right),
            Self::Greater => Value::Boolean(left > right),
            Self::GreaterEq => Value::Boolean(left >= right),
            Self::Eq => unreachable!("equality is handled for every value type above"),
        })
    }

    fn number(self, value: &Value) -> Result<f64, EvaError> {
        match value {
            Value::Number(number) => Ok(*number),
            other => Err(EvaError::TypeError {
                operator: self.symbol().to_owned(),
                expected: "number",
                found: other.type_name(),
            }),
        }
    }

    fn builtin(self) -> Builtin {
        let function: BuiltinFn = match self {
            Self::Add => builtin_add,
            Self::Sub => builtin_sub,
            Self::Mul => builtin_mul,
            Self::Div => builtin_div,
            Self::Rem => builtin_rem,
            Self::Less => builtin_less,
            Self::LessEq => builtin_less_eq,
            Self::Greater => builtin_greater,
            Self::GreaterEq => builtin_greater_eq,
            Self::Eq => builtin_eq,
        };
        Builtin::new(self.symbol(), function)
    }
}

fn builtin_add(values: Vec<Value>) -> EvaluationResult {
    Operator::Add.apply(values)
}

fn builtin_sub(values: Vec<Value>) -> EvaluationResult {
    Operator::Sub.apply(values)
}

fn builtin_mul(values: Vec<Value>) -> EvaluationResult {
    Operator::Mul.apply(values)
}

fn builtin_div(values: Vec<Value>) -> EvaluationResult {
    Operator::Div.apply(values)
}

fn builtin_rem(values: Vec<Value>) -> EvaluationResult {
    Operator::Rem.apply(values)
}

fn builtin_less(values: Vec<Value>) -> EvaluationResult {
    Operator::Less.apply(values)
}

fn builtin_less_eq(values: Vec<Value>) -> EvaluationResult {
    Operator::LessEq.apply(values)
}

fn builtin_greater(values: Vec<Value>) -> EvaluationResult {
    Operator::Greater.apply(values)
}

fn builtin_greater_eq(values: Vec<Value>) -> EvaluationResult {
    Operator::GreaterEq.apply(values)
}

fn builtin_eq(values: Vec<Value>) -> EvaluationResult {
    Operator::Eq.apply(values)
}

fn builtin_print(values: Vec<Value>) -> EvaluationResult {
    println!("{}", values.iter().join(" "));
    Ok(Value::Null)
}

/// Builds the root environment every session starts from
pub fn global_environment() -> Environment {
    let mut bindings = HashMap::from([
        ("null".to_owned(), Value::Null),
        ("true".to_owned(), Value::Boolean(true)),
        ("false".to_owned(), Value::Boolean(false)),
        ("VERSION".to_owned(), Value::String(VERSION.into())),
        ("print".to_owned(), Value::Function(Function::Builtin(Builtin::new("print", builtin_print)))),
    ]);

    for operator in Operator::ALL {
        bindings.insert(operator.symbol().to_owned(), Value::Function(Function::Builtin(operator.builtin())));
    }

    Environment::root(bindings)
}

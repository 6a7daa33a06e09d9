use core::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::{
    builtin::Operator,
    environment::Environment,
    error::EvaError,
    expression::{is_quoted_string, is_variable_name, strip_quotes, Expression, SpecialForm},
    function::{Closure, Function},
    stack::ensure_sufficient_stack,
};

pub type EvaluationResult = Result<Value, EvaError>;

/// Deepest nesting of user function calls allowed before giving up
pub const DEFAULT_MAX_DEPTH: usize = 10_000;


/// Values produced by evaluating expressions
#[derive(Clone)]
pub enum Value {
    Null,
    /// Result of a `while` loop whose body never ran
    Undefined,
    Boolean(bool),
    Number(f64),
    String(Rc<str>),
    Function(Function),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Undefined => "undefined",
            Self::Boolean(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Function(Function::Builtin(_)) => "builtin",
            Self::Function(Function::Closure(_)) => "function",
        }
    }

    /// Only `false`, `null` and `undefined` are falsy
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Self::Null | Self::Undefined | Self::Boolean(false))
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Function(_))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) | (Self::Undefined, Self::Undefined) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Function(a), Self::Function(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Undefined => write!(f, "undefined"),
            Self::Boolean(value) => fmt::Display::fmt(value, f),
            Self::Number(value) => fmt::Display::fmt(value, f),
            Self::String(value) => fmt::Display::fmt(value, f),
            Self::Function(function) => fmt::Display::fmt(function, f),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(value) => write!(f, "{:?}", value),
            Self::Function(function) => fmt::Debug::fmt(function, f),
            other => fmt::Display::fmt(other, f),
        }
    }
}

/// Counts active user function calls so runaway recursion fails with
/// [`EvaError::RecursionLimit`] instead of growing without bound.
#[derive(Debug)]
pub(crate) struct CallDepth {
    current: usize,
    limit: usize,
}

impl CallDepth {
    pub(crate) fn new(limit: usize) -> Self {
        Self { current: 0, limit }
    }

    pub(crate) fn enter(&mut self) -> Result<(), EvaError> {
        if self.current >= self.limit {
            return Err(EvaError::RecursionLimit(self.limit));
        }
        self.current += 1;
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.current -= 1;
    }
}

impl Default for CallDepth {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

fn unimplemented(form: &Expression) -> EvaError {
    EvaError::UnimplementedForm(form.clone())
}

fn variable_name<'e>(form: &Expression, expression: &'e Expression) -> Result<&'e str, EvaError> {
    match expression.as_symbol() {
        Some(name) if is_variable_name(expression) => Ok(name),
        _ => Err(unimplemented(form)),
    }
}

fn parameter_names(form: &Expression, parameters: &Expression) -> Result<Vec<String>, EvaError> {
    match parameters {
        Expression::List(parameters) => parameters.iter()
            .map(|parameter| variable_name(form, parameter).map(str::to_owned))
            .collect(),
        _ => Err(unimplemented(form)),
    }
}

fn evaluate_arguments(arguments: &[Expression], environment: &Environment, depth: &mut CallDepth) -> Result<Vec<Value>, EvaError> {
    arguments.iter()
        .map(|argument| evaluate_with(argument, environment, depth))
        .collect()
}

/// Evaluates every expression in order within `environment` and returns the
/// last value
fn evaluate_block(expressions: &[Expression], environment: &Environment, depth: &mut CallDepth) -> EvaluationResult {
    let mut result = Value::Undefined;
    for expression in expressions {
        result = evaluate_with(expression, environment, depth)?;
    }
    Ok(result)
}

/// Runs a function body in its activation scope. A `(begin ...)` body is
/// unrolled so it shares the activation scope instead of opening another one.
pub(crate) fn evaluate_body(body: &Expression, activation: &Environment, depth: &mut CallDepth) -> EvaluationResult {
    match body {
        Expression::List(items) if items.len() > 1 && items[0].as_symbol() == Some("begin") => {
            evaluate_block(&items[1..], activation, depth)
        }
        body => evaluate_with(body, activation, depth),
    }
}

fn evaluate_operator(operator: Operator, operands: &[Expression], environment: &Environment, depth: &mut CallDepth) -> EvaluationResult {
    operator.apply(evaluate_arguments(operands, environment, depth)?)
}

fn evaluate_begin(form: &Expression, list: &[Expression], environment: &Environment, depth: &mut CallDepth) -> EvaluationResult {
    if list.is_empty() { return Err(unimplemented(form)); }

    let block = Environment::child(environment);
    evaluate_block(list, &block, depth)
}

fn evaluate_var(form: &Expression, list: &[Expression], environment: &Environment, depth: &mut CallDepth) -> EvaluationResult {
    let [name, value] = list else { return Err(unimplemented(form)) };
    let name = variable_name(form, name)?;

    let value = evaluate_with(value, environment, depth)?;
    debug!(name, value = %value, "var");
    Ok(environment.define(name, value))
}

fn evaluate_set(form: &Expression, list: &[Expression], environment: &Environment, depth: &mut CallDepth) -> EvaluationResult {
    let [name, value] = list else { return Err(unimplemented(form)) };
    let name = variable_name(form, name)?;

    let value = evaluate_with(value, environment, depth)?;
    debug!(name, value = %value, "set");
    environment.assign(name, value)
}

fn evaluate_if(form: &Expression, list: &[Expression], environment: &Environment, depth: &mut CallDepth) -> EvaluationResult {
    let [condition, consequent, alternate] = list else { return Err(unimplemented(form)) };

    if evaluate_with(condition, environment, depth)?.is_truthy() {
        evaluate_with(consequent, environment, depth)
    } else {
        evaluate_with(alternate, environment, depth)
    }
}

fn evaluate_while(form: &Expression, list: &[Expression], environment: &Environment, depth: &mut CallDepth) -> EvaluationResult {
    // The body shares the loop's environment on every iteration
    let [condition, body] = list else { return Err(unimplemented(form)) };

    let mut result = Value::Undefined;
    while evaluate_with(condition, environment, depth)?.is_truthy() {
        result = evaluate_with(body, environment, depth)?;
    }
    Ok(result)
}

fn evaluate_def(form: &Expression, list: &[Expression], environment: &Environment) -> EvaluationResult {
    // (def name (parameters...) body) binds the function under `name`
    let [name, parameters, body] = list else { return Err(unimplemented(form)) };
    let name = variable_name(form, name)?;
    let parameters = parameter_names(form, parameters)?;

    debug!(name, parameters = parameters.len(), "def");
    let closure = Closure::new(Some(name.to_owned()), parameters, body.clone(), environment.clone());
    Ok(environment.define(name, Value::Function(Function::Closure(closure))))
}

fn evaluate_lambda(form: &Expression, list: &[Expression], environment: &Environment) -> EvaluationResult {
    let [parameters, body] = list else { return Err(unimplemented(form)) };
    let parameters = parameter_names(form, parameters)?;

    let closure = Closure::new(None, parameters, body.clone(), environment.clone());
    Ok(Value::Function(Function::Closure(closure)))
}

fn evaluate_call(callee: &Expression, arguments: &[Expression], environment: &Environment, depth: &mut CallDepth) -> EvaluationResult {
    let function = match evaluate_with(callee, environment, depth)? {
        Value::Function(function) => function,
        other => return Err(EvaError::NotCallable(other.to_string())),
    };

    let arguments = evaluate_arguments(arguments, environment, depth)?;
    function.call(arguments, depth)
}

fn evaluate_list(form: &Expression, items: &[Expression], environment: &Environment, depth: &mut CallDepth) -> EvaluationResult {
    // Operators take precedence over special forms, and both over a call through
    // whatever the head symbol is bound to
    let Some((head, list)) = items.split_first() else { return Err(unimplemented(form)) };

    if let Some(tag) = head.as_symbol() {
        if let Some(operator) = Operator::from_symbol(tag) {
            return evaluate_operator(operator, list, environment, depth);
        }

        if let Some(special_form) = SpecialForm::from_symbol(tag) {
            return match special_form {
                SpecialForm::Begin => evaluate_begin(form, list, environment, depth),
                SpecialForm::Var => evaluate_var(form, list, environment, depth),
                SpecialForm::Set => evaluate_set(form, list, environment, depth),
                SpecialForm::If => evaluate_if(form, list, environment, depth),
                SpecialForm::While => evaluate_while(form, list, environment, depth),
                SpecialForm::Def => evaluate_def(form, list, environment),
                SpecialForm::Lambda => evaluate_lambda(form, list, environment),
            };
        }
    }

    evaluate_call(head, list, environment, depth)
}

pub(crate) fn evaluate_with(expression: &Expression, environment: &Environment, depth: &mut CallDepth) -> EvaluationResult {
    ensure_sufficient_stack(|| {
        trace!(%expression, calls = depth.current, "evaluate");

        match expression {
            Expression::Number(value) => Ok(Value::Number(*value)),
            Expression::QuotedString(text) if is_quoted_string(expression) => Ok(Value::String(strip_quotes(text).into())),
            Expression::Symbol(name) if is_variable_name(expression) => environment.lookup(name),
            Expression::List(items) => evaluate_list(expression, items, environment, depth),
            other => Err(unimplemented(other)),
        }
    })
}

/// Evaluates `expression` in `environment`.
///
/// Definitions and assignments made by the expression persist in the
/// environment, so calling this repeatedly on the same global environment
/// behaves like a session.
pub fn evaluate(expression: &Expression, environment: &Environment) -> EvaluationResult {
    evaluate_with(expression, environment, &mut CallDepth::default())
}



#[cfg(test)]
mod tests {
    use anyhow::bail;

    use crate::{builtin::global_environment, context::EvaluationContext, parser::parse, test_utils::{all_testcases, load_test_pair, ExpectedResult, TestOutput}};

    use super::*;

    fn compare(a: &Value, b: &TestOutput) -> bool {
        match (a, b) {
            (Value::Null, TestOutput::Null) => true,
            (Value::Boolean(a), TestOutput::Boolean(b)) => a == b,
            (Value::Number(a), TestOutput::Number(b)) => (a - b).abs() < 1.0e-9,
            (Value::String(a), TestOutput::Text(b)) => **a == **b,
            (value @ (Value::Undefined | Value::Function(_)), TestOutput::Text(text)) => value.to_string() == *text,
            _ => false
        }
    }

    fn assert_run(testcase: usize, entries: &[(String, ExpectedResult)]) -> anyhow::Result<()> {
        let mut evaluation_context = EvaluationContext::new();
        for (lineno, (source, expected)) in entries.iter().enumerate() {
            let result = evaluation_context.evaluate_str(source.as_str());
            let expected: Result<TestOutput, String> = expected.clone().into();

            println!("{}:\n{:?}", source, result);
            match (&result, &expected) {
                (Ok(a), Ok(b)) => assert!(compare(a, b), "Testcase({}, {}): Got {:?}, expected {:?}", testcase, lineno, result, expected),
                (Err(result), Err(expected))
                    => assert_eq!(result.kind(), expected, "Testcase({}, {}): Got {:?}, expected {:?}", testcase, lineno, result, expected),
                _ => bail!("Testcase({}, {}): Got {:?}, expected {:?}", testcase, lineno, result, expected),
            }
        }

        Ok(())
    }

    #[test]
    fn evaluate_testcase() -> anyhow::Result<()> {
        for testcase in all_testcases() {
            println!("Running testcase {}", testcase);
            let entries = load_test_pair(testcase)?;
            assert_run(testcase, &entries)?;
        }

        Ok(())
    }

    fn eval_json(environment: &Environment, json: &str) -> EvaluationResult {
        let expression: Expression = serde_json::from_str(json).expect("test expression should be valid JSON");
        evaluate(&expression, environment)
    }

    fn eval_source(environment: &Environment, source: &str) -> EvaluationResult {
        evaluate(&parse(source).expect("test source should parse"), environment)
    }

    #[test]
    fn self_evaluating_expressions() -> anyhow::Result<()> {
        let global = global_environment();

        assert_eq!(eval_json(&global, "1")?, Value::Number(1.0));
        assert_eq!(eval_json(&global, r#""\"hello\"""#)?, Value::String("hello".into()));
        assert_eq!(eval_json(&global, r#""\"\"""#)?, Value::String("".into()));
        Ok(())
    }

    #[test]
    fn operators_evaluate_nested_operands() -> anyhow::Result<()> {
        let global = global_environment();

        assert_eq!(eval_json(&global, r#"["+", ["+", 3, 2], 5]"#)?, Value::Number(10.0));
        assert_eq!(eval_json(&global, r#"["-", 1, 5]"#)?, Value::Number(-4.0));
        assert_eq!(eval_json(&global, r#"["+", ["%", 5, 2], 5]"#)?, Value::Number(6.0));
        assert_eq!(eval_json(&global, r#"["-", ["*", 2, 3]]"#)?, Value::Number(-6.0));
        assert_eq!(eval_json(&global, r#"[">=", ["-", 7, 2], 5]"#)?, Value::Boolean(true));
        Ok(())
    }

    #[test]
    fn inner_blocks_shadow_without_leaking() -> anyhow::Result<()> {
        let global = global_environment();

        let result = eval_json(&global, r#"["begin", ["var", "x", 10], ["begin", ["var", "x", 20], "x"], "x"]"#)?;
        assert_eq!(result, Value::Number(10.0));
        assert!(!global.contains_local("x"));
        Ok(())
    }

    #[test]
    fn set_reaches_enclosing_blocks() -> anyhow::Result<()> {
        let global = global_environment();

        let result = eval_json(&global, r#"["begin", ["var", "data", 10], ["begin", ["set", "data", 100]], "data"]"#)?;
        assert_eq!(result, Value::Number(100.0));
        Ok(())
    }

    #[test]
    fn set_requires_an_existing_binding() {
        let global = global_environment();

        assert_eq!(eval_source(&global, "(set ghost 1)"), Err(EvaError::UndefinedVariable("ghost".to_owned())));
        assert!(!global.contains_local("ghost"));
    }

    #[test]
    fn unbound_symbol_is_undefined_variable() {
        let global = global_environment();
        assert_eq!(eval_source(&global, "unbound"), Err(EvaError::UndefinedVariable("unbound".to_owned())));
    }

    #[test]
    fn if_picks_branch_by_truthiness() -> anyhow::Result<()> {
        let global = global_environment();

        assert_eq!(eval_source(&global, "(if true 1 2)")?, Value::Number(1.0));
        assert_eq!(eval_source(&global, "(if false 1 2)")?, Value::Number(2.0));
        assert_eq!(eval_source(&global, "(if null 1 2)")?, Value::Number(2.0));
        assert_eq!(eval_source(&global, "(if 0 1 2)")?, Value::Number(1.0));
        assert_eq!(eval_source(&global, r#"(if "" 1 2)"#)?, Value::Number(1.0));
        Ok(())
    }

    #[test]
    fn if_only_evaluates_the_taken_branch() -> anyhow::Result<()> {
        let global = global_environment();

        assert_eq!(eval_source(&global, "(if (< 1 2) 10 missing)")?, Value::Number(10.0));
        Ok(())
    }

    #[test]
    fn while_returns_last_body_value() -> anyhow::Result<()> {
        let global = global_environment();

        let program = "(begin
            (var counter 0)
            (var result 0)
            (while (< counter 10)
                (begin
                    (set result (+ result 2))
                    (set counter (+ counter 1))))
            )";
        assert_eq!(eval_source(&global, program)?, Value::Number(10.0));
        Ok(())
    }

    #[test]
    fn while_that_never_runs_is_undefined() -> anyhow::Result<()> {
        let global = global_environment();

        assert_eq!(eval_source(&global, "(while false missing)")?, Value::Undefined);
        Ok(())
    }

    #[test]
    fn while_body_shares_the_loop_scope() -> anyhow::Result<()> {
        let global = global_environment();

        eval_source(&global, "(var i 0)")?;
        eval_source(&global, "(while (< i 3) (var i (+ i 1)))")?;
        assert_eq!(global.lookup("i")?, Value::Number(3.0));
        Ok(())
    }

    #[test]
    fn def_binds_a_named_function() -> anyhow::Result<()> {
        let global = global_environment();

        let function = eval_source(&global, "(def square (x) (* x x))")?;
        assert_eq!(function.to_string(), "<function square>");
        assert_eq!(global.lookup("square")?, function);
        assert_eq!(eval_source(&global, "(square 4)")?, Value::Number(16.0));
        Ok(())
    }

    #[test]
    fn lambda_is_anonymous() -> anyhow::Result<()> {
        let global = global_environment();

        assert_eq!(eval_source(&global, "((lambda (x y) (+ x y)) 2 3)")?, Value::Number(5.0));
        assert_eq!(eval_source(&global, "(lambda () 1)")?.to_string(), "<lambda>");
        Ok(())
    }

    #[test]
    fn closures_see_later_changes_to_captured_scope() -> anyhow::Result<()> {
        let global = global_environment();

        eval_source(&global, "(var base 1)")?;
        eval_source(&global, "(def add-base (x) (+ x base))")?;
        assert_eq!(eval_source(&global, "(add-base 1)")?, Value::Number(2.0));

        eval_source(&global, "(set base 10)")?;
        assert_eq!(eval_source(&global, "(add-base 1)")?, Value::Number(11.0));
        Ok(())
    }

    #[test]
    fn closures_resolve_from_defining_scope_not_caller() -> anyhow::Result<()> {
        let global = global_environment();

        let program = "(begin
            (var value 100)
            (def calc (x y)
                (begin
                    (var z (+ x y))
                    (def inner (foo) (+ (+ foo z) value))
                    inner))
            (var fn (calc 10 20))
            (fn 30))";
        assert_eq!(eval_source(&global, program)?, Value::Number(160.0));

        eval_source(&global, "(def get-z () z)")?;
        eval_source(&global, "(def caller (z) (get-z))")?;
        assert_eq!(eval_source(&global, "(caller 5)"), Err(EvaError::UndefinedVariable("z".to_owned())));
        Ok(())
    }

    #[test]
    fn recursion_through_global_binding() -> anyhow::Result<()> {
        let global = global_environment();

        eval_source(&global, "(def factorial (x) (if (== x 1) 1 (* x (factorial (- x 1)))))")?;
        assert_eq!(eval_source(&global, "(factorial 5)")?, Value::Number(120.0));
        Ok(())
    }

    #[test]
    fn call_with_wrong_argument_count() -> anyhow::Result<()> {
        let global = global_environment();

        eval_source(&global, "(def square (x) (* x x))")?;
        assert_eq!(eval_source(&global, "(square 1 2)"), Err(EvaError::ArityError { expected: 1, actual: 2 }));
        assert_eq!(eval_source(&global, "(square)"), Err(EvaError::ArityError { expected: 1, actual: 0 }));
        Ok(())
    }

    #[test]
    fn builtins_are_first_class_values() -> anyhow::Result<()> {
        let global = global_environment();

        eval_source(&global, "(var add +)")?;
        assert_eq!(eval_source(&global, "(add 1 2)")?, Value::Number(3.0));
        eval_source(&global, "(def apply (f a b) (f a b))")?;
        assert_eq!(eval_source(&global, "(apply * 3 4)")?, Value::Number(12.0));
        assert_eq!(eval_source(&global, "(print 1 2)")?, Value::Null);
        Ok(())
    }

    #[test]
    fn builtins_can_be_shadowed() -> anyhow::Result<()> {
        let global = global_environment();

        assert_eq!(eval_source(&global, "(begin (var print 5) print)")?, Value::Number(5.0));
        assert!(global.lookup("print")?.is_callable());
        Ok(())
    }

    #[test]
    fn calling_a_non_function_fails() {
        let global = global_environment();
        assert_eq!(eval_source(&global, "(5 1)"), Err(EvaError::NotCallable("5".to_owned())));
    }

    #[test]
    fn malformed_forms_are_unimplemented() {
        let global = global_environment();

        for source in ["(begin)", "()", "(var 5 1)", "(var x)", "(set)", "(if true 1)", "(while true)", "(def f x x)", "(lambda (1) 1)", "begin"] {
            match eval_source(&global, source) {
                Err(EvaError::UnimplementedForm(_)) => {}
                other => panic!("{}: expected UnimplementedForm, got {:?}", source, other),
            }
        }

        let invalid = Expression::QuotedString("\"".to_owned());
        assert_eq!(evaluate(&invalid, &global), Err(EvaError::UnimplementedForm(invalid.clone())));
    }

    #[test]
    fn fixture_text_only_matches_printed_values() {
        let text = |text: &str| TestOutput::Text(text.to_owned());

        assert!(compare(&Value::String("5".into()), &text("5")));
        assert!(compare(&Value::Undefined, &text("undefined")));
        assert!(!compare(&Value::Number(5.0), &text("5")));
        assert!(!compare(&Value::Boolean(true), &text("true")));
        assert!(!compare(&Value::Null, &text("null")));
    }

    #[test]
    fn deep_recursion_on_a_small_thread_stack() -> anyhow::Result<()> {
        let handle = std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(|| -> Result<String, EvaError> {
                let mut context = EvaluationContext::new();
                context.evaluate_str("(def sum (n) (if (== n 0) 0 (+ n (sum (- n 1)))))")?;
                Ok(context.evaluate_str("(sum 2000)")?.to_string())
            })?;

        let total = match handle.join() {
            Ok(result) => result?,
            Err(_) => bail!("evaluation thread panicked"),
        };
        assert_eq!(total, "2001000");
        Ok(())
    }

    #[test]
    fn deeply_nested_expressions_evaluate() -> anyhow::Result<()> {
        let global = global_environment();

        let source = format!("{}0{}", "(+ 1 ".repeat(5_000), ")".repeat(5_000));
        assert_eq!(eval_source(&global, &source)?, Value::Number(5_000.0));
        Ok(())
    }

    #[test]
    fn runaway_recursion_hits_the_depth_limit() -> anyhow::Result<()> {
        let global = global_environment();

        eval_source(&global, "(def forever (x) (forever x))")?;
        let expression = parse("(forever 1)")?;
        assert_eq!(
            evaluate_with(&expression, &global, &mut CallDepth::new(64)),
            Err(EvaError::RecursionLimit(64))
        );
        Ok(())
    }
}

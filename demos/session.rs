use eva::{evaluate, global_environment, parse, EvaError, EvaluationContext, Expression};

fn main() {
    let program = vec![
        "(def spam () (* eggs 3))",
        "(spam)",
        "(var eggs 20)",
        "(spam)",
    ];

    let mut context = EvaluationContext::new();
    for source in &program {
        match context.evaluate_str(source) {
            Ok(value) => println!("{}: {}", source, value),
            Err(err) => println!("{}: {}", source, err)
        }
    }

    // The same program, parsed up front and evaluated against an explicit environment
    let expressions = program.into_iter()
        .map(|line| parse(line).map(|expression| (line, expression)))
        .collect::<Result<Vec<(&str, Expression)>, EvaError>>()
        .unwrap();

    let global = global_environment();
    for (source, expression) in &expressions {
        match evaluate(expression, &global) {
            Ok(value) => println!("{}: {}", source, value),
            Err(err) => println!("{}: {}", source, err)
        }
    }
}

#![no_main]

use core::fmt;

use itertools::Itertools;
use libfuzzer_sys::{arbitrary::Arbitrary, fuzz_target};

// Builtins and load from variables
#[derive(Arbitrary, Debug)]
enum EvaAtom {
    Add, Sub, Mul, Div, Rem,
    Less, LessEq, Greater, GreaterEq, Eq,
    True, False, Null, Version, Print,

    Identifier(String),
    Text(String),
    Number(f64),
}

impl fmt::Display for EvaAtom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", match self {
            EvaAtom::Add => "+",
            EvaAtom::Sub => "-",
            EvaAtom::Mul => "*",
            EvaAtom::Div => "/",
            EvaAtom::Rem => "%",
            EvaAtom::Less => "<",
            EvaAtom::LessEq => "<=",
            EvaAtom::Greater => ">",
            EvaAtom::GreaterEq => ">=",
            EvaAtom::Eq => "==",
            EvaAtom::True => "true",
            EvaAtom::False => "false",
            EvaAtom::Null => "null",
            EvaAtom::Version => "VERSION",
            EvaAtom::Print => "print",
            EvaAtom::Identifier(identifier) => identifier,
            EvaAtom::Text(text) => return write!(f, "\"{}\"", text.replace('"', "")),
            EvaAtom::Number(value) => return write!(f, "{}", value),
        })
    }
}

#[derive(Arbitrary, Debug)]
enum EvaCommand {
    Begin(Vec<EvaCommand>),
    Var(Vec<EvaCommand>),
    Set(Vec<EvaCommand>),
    If(Vec<EvaCommand>),
    While(Vec<EvaCommand>),
    Def(Vec<EvaCommand>),
    Lambda(Vec<EvaCommand>),
    Call(Vec<EvaCommand>),

    Atom(EvaAtom),
}

fn stringify_arguments(values: &[EvaCommand]) -> String {
    values.iter()
        .map(EvaCommand::to_string)
        .join(" ")
}

impl fmt::Display for EvaCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (keyword, arguments) = match self {
            EvaCommand::Atom(atom) => return fmt::Display::fmt(atom, f),
            EvaCommand::Call(args) => return write!(f, "({})", stringify_arguments(args)),
            EvaCommand::Begin(args) => ("begin", args),
            EvaCommand::Var(args) => ("var", args),
            EvaCommand::Set(args) => ("set", args),
            EvaCommand::If(args) => ("if", args),
            EvaCommand::Def(args) => ("def", args),
            EvaCommand::Lambda(args) => ("lambda", args),
            // A fuzzed loop condition would rarely terminate
            EvaCommand::While(args) => return write!(f, "(while false {})", stringify_arguments(args)),
        };

        write!(f, "({} {})", keyword, stringify_arguments(arguments))
    }
}

fuzz_target!(|commands: Vec<EvaCommand>| {
    {
        let mut context = eva::EvaluationContext::new();

        for command in commands {
            let command = command.to_string();
            let _ = context.evaluate_str(&command);
        }
    }
});

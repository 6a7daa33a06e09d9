use std::{io::{self, BufRead, Write}, path::PathBuf, process::ExitCode};

use anyhow::Context;
use clap::Parser;
use eva::{parse_program, Config, EvaluationContext, Expression, DEFAULT_MAX_DEPTH};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Evaluates Eva programs from a file, the command line or an interactive prompt
#[derive(Debug, Parser)]
#[command(name = "eva", version)]
struct Args {
    /// Program to run. Without a file or `--eval`, starts a prompt on stdin
    file: Option<PathBuf>,

    /// Program text to run; the value of its last expression is printed
    #[arg(short, long, conflicts_with = "file")]
    eval: Option<String>,

    /// Read the program as JSON nested-array expressions instead of source text
    #[arg(long)]
    ast: bool,

    /// Print the parsed program as JSON expressions and exit
    #[arg(long, conflicts_with = "ast")]
    dump_ast: bool,

    /// Deepest nesting of function calls before a recursion error
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,
}

fn load_program(source: &str, ast: bool) -> anyhow::Result<Vec<Expression>> {
    if ast {
        serde_json::Deserializer::from_str(source)
            .into_iter::<Expression>()
            .collect::<Result<Vec<_>, _>>()
            .context("invalid JSON expression")
    } else {
        Ok(parse_program(source)?)
    }
}

fn run_program(context: &mut EvaluationContext, program: &[Expression], print_last: bool) -> ExitCode {
    let mut status = ExitCode::SUCCESS;
    let mut last = None;

    for expression in program {
        match context.evaluate(expression) {
            Ok(value) => last = Some(value),
            Err(err) => {
                eprintln!("{}: {}", err.kind(), err);
                status = ExitCode::FAILURE;
            }
        }
    }

    if let (true, Some(value)) = (print_last, last) {
        println!("{}", value);
    }
    status
}

fn repl(context: &mut EvaluationContext) -> anyhow::Result<ExitCode> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        write!(stdout, "eva> ")?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            writeln!(stdout)?;
            return Ok(ExitCode::SUCCESS);
        }
        if line.trim().is_empty() { continue; }

        match context.evaluate_str(&line) {
            Ok(value) => println!("{}", value),
            Err(err) => println!("{}: {}", err.kind(), err),
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let filter = EnvFilter::try_from_env("EVA_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let mut context = EvaluationContext::with_config(Config { max_depth: args.max_depth });

    let (source, print_last) = match (&args.eval, &args.file) {
        (Some(source), _) => (source.clone(), true),
        (None, Some(path)) => {
            let source = std::fs::read_to_string(path)
                .with_context(|| format!("could not read {}", path.display()))?;
            (source, false)
        }
        (None, None) => {
            if args.ast || args.dump_ast {
                warn!("--ast and --dump-ast need a file or --eval; starting the prompt instead");
            }
            info!(version = eva::VERSION, "starting prompt");
            return repl(&mut context);
        }
    };

    let program = load_program(&source, args.ast)?;
    if args.dump_ast {
        for expression in &program {
            println!("{}", serde_json::to_string(expression)?);
        }
        return Ok(ExitCode::SUCCESS);
    }

    Ok(run_program(&mut context, &program, print_last))
}

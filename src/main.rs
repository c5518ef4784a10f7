use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use toysql::ast::Statement;
use toysql::eval::eval_stmt;
use toysql::lexer::Lexer;
use toysql::pprint::{PrettyPrinter, write_table};
use toysql::{Environment, parser};

#[derive(Parser)]
#[command(name = "toysql")]
#[command(version)]
#[command(about = "Run SQL statements against an in-memory database", long_about = None)]
struct Cli {
    /// SQL file to run; reads standard input when omitted
    file: Option<PathBuf>,

    /// Print the syntax tree of every statement before running it
    #[arg(short, long)]
    verbose: bool,

    /// Log level (trace, debug, info, warn, error), overridden by RUST_LOG
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn read_input(file: Option<&PathBuf>) -> io::Result<String> {
    match file {
        Some(path) => fs::read_to_string(path),
        None => {
            let mut input = String::new();
            io::stdin().read_to_string(&mut input)?;
            Ok(input)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)))
        .init();

    let input = match read_input(cli.file.as_ref()) {
        Ok(input) => input,
        Err(err) => {
            eprintln!("toysql: cannot read input: {err}");
            return ExitCode::FAILURE;
        }
    };

    let statements = match parser::parse(Lexer::new(&input)) {
        Ok(statements) => statements,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    debug!(statements = statements.len(), "running input");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut env = Environment::new();
    for stmt in &statements {
        if let Err(err) = run_statement(&mut env, stmt, cli.verbose, &mut out) {
            eprintln!("toysql: cannot write output: {err}");
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}

/// Evaluates one statement and prints its table, its error or `OK`.
fn run_statement<W: Write>(
    env: &mut Environment,
    stmt: &Statement,
    verbose: bool,
    out: &mut W,
) -> io::Result<()> {
    if verbose {
        write!(out, "{}", PrettyPrinter::print(stmt))?;
    }
    match eval_stmt(env, stmt) {
        Ok(Some(result)) => write_table(out, &result),
        Ok(None) => writeln!(out, "OK"),
        Err(err) => writeln!(out, "{err}"),
    }
}

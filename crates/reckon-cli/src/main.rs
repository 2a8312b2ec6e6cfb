//! Reckon CLI - evaluate and inspect formulas

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reckon::prelude::*;
use reckon::{builtin, TokenStream, DEFAULT_MAX_NESTING_DEPTH};
use std::io;
use std::sync::Arc;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "reckon")]
#[command(author, version, about = "Formula evaluation and inspection tool")]
struct Cli {
    /// Log compilation details
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a formula and print the result
    Eval {
        /// Formula text, e.g. "2 * (a + b) ^ 2"
        formula: String,

        /// Variable binding NAME=VALUE (repeatable)
        #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_binding)]
        vars: Vec<(String, f64)>,

        /// Evaluate this many times, printing each result
        #[arg(long, default_value = "1")]
        repeat: usize,

        /// Register a division operator that fails on a zero divisor
        #[arg(long, value_name = "SYMBOL")]
        strict_divide: Option<String>,

        /// Disable constant folding
        #[arg(long)]
        no_fold: bool,

        /// Maximum nesting depth
        #[arg(long, default_value_t = DEFAULT_MAX_NESTING_DEPTH)]
        max_depth: usize,
    },

    /// Print the parsed tree, fully parenthesized
    Ast {
        /// Formula text
        formula: String,

        /// Print the tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the tokens of a formula with their offsets
    Tokens {
        /// Formula text
        formula: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG takes precedence over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Eval {
            formula,
            vars,
            repeat,
            strict_divide,
            no_fold,
            max_depth,
        } => {
            let mut formula =
                build_formula(&formula, &vars, strict_divide.as_deref(), no_fold, max_depth)?;
            eval(&mut formula, repeat)
        }
        Commands::Ast { formula, json } => show_ast(&formula, json),
        Commands::Tokens { formula } => show_tokens(&formula),
    }
}

/// Parse a formula with the requested options and bind its variables
fn build_formula(
    text: &str,
    vars: &[(String, f64)],
    strict_divide: Option<&str>,
    no_fold: bool,
    max_depth: usize,
) -> Result<Formula> {
    let mut operators = OperatorRegistry::new();
    if let Some(symbol) = strict_divide {
        operators
            .register(builtin::strict_divide(symbol))
            .with_context(|| format!("Failed to register strict divide as '{}'", symbol))?;
    }

    let options = FormulaOptions {
        constant_folding: !no_fold,
        max_nesting_depth: max_depth,
        ..Default::default()
    };
    debug!(?options, "parsing formula");

    let mut formula = Formula::parse_with_options(text, Arc::new(operators), options)
        .map_err(|e| located(text, e))?;

    for (name, value) in vars {
        if !formula.referenced_variables().contains(&name.as_str()) {
            warn!("variable '{}' is not used by the formula", name);
        }
        formula.bind_variable(name, *value);
    }

    // Unbound names in an untaken branch never get read
    let unbound = formula.unbound_variables();
    if !unbound.is_empty() {
        warn!("unbound variables: {}", unbound.join(", "));
    }

    Ok(formula)
}

fn eval(formula: &mut Formula, repeat: usize) -> Result<()> {
    for _ in 0..repeat {
        let value = formula
            .evaluate()
            .map_err(|e| located(formula.text(), e))
            .context("Failed to evaluate formula (bind variables with --var NAME=VALUE)")?;
        println!("{}", value);
    }

    Ok(())
}

fn show_ast(text: &str, json: bool) -> Result<()> {
    let formula = Formula::new(text).map_err(|e| located(text, e))?;
    let ast = formula.ast().context("Formula has no syntax tree")?;

    if json {
        let rendered = serde_json::to_string_pretty(ast).context("Failed to serialize AST")?;
        println!("{}", rendered);
    } else {
        println!("{}", ast);
    }

    Ok(())
}

fn show_tokens(text: &str) -> Result<()> {
    let operators = OperatorRegistry::global();

    for spanned in TokenStream::new(text, &operators) {
        let spanned = spanned.map_err(|e| located(text, e))?;
        println!("{:>4}  {}", spanned.offset, spanned.token);
    }

    Ok(())
}

/// Attach the formula text with a caret under the error location
fn located(text: &str, err: FormulaError) -> anyhow::Error {
    match err.offset() {
        Some(offset) => {
            let column = text
                .get(..offset)
                .map_or(offset, |prefix| prefix.chars().count());
            anyhow::Error::new(err).context(format!(
                "Invalid formula\n  {}\n  {}^",
                text,
                " ".repeat(column)
            ))
        }
        None => anyhow::Error::new(err),
    }
}

/// Parse a NAME=VALUE binding
fn parse_binding(s: &str) -> std::result::Result<(String, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", s))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing variable name in '{}'", s));
    }

    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid value for '{}': {}", name, e))?;

    Ok((name.to_string(), value))
}

//! measure-formula CLI - compile and check calculation formulas against a model

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use measure_formula::{CompileContext, Compiler, CompilerConfig, CompilerEnvironment, Locale};
use measure_formula_core::{Backend, Dimension, Measure, MetadataProvider, MetadataSnapshot};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "mformula")]
#[command(author, version, about = "Calculation-formula compiler for BI measures")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Model file (JSON with backend, dimensions and measures)
    #[arg(short, long, global = true)]
    model: Option<PathBuf>,

    /// Backend used when no model file is given
    #[arg(short, long, global = true, default_value = "hana")]
    backend: Backend,

    /// Formula text uses comma decimals and semicolon argument separators
    #[arg(long, global = true)]
    comma_decimal: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a formula and print the lowered canonical text
    Compile {
        /// Formula text in the selected locale
        formula: String,

        /// Id of the measure whose formula is being edited
        #[arg(short, long)]
        editing: Option<String>,

        /// Print derived restricted measures as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print every validation message of a formula
    Validate {
        formula: String,

        #[arg(short, long)]
        editing: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Print the editor tokens of a formula
    Tokens {
        formula: String,

        #[arg(long)]
        json: bool,
    },

    /// Convert canonical text to display text
    Display { formula: String },

    /// Convert display text to canonical text
    Canonical { formula: String },

    /// List the functions callable on the backend
    Functions,
}

/// On-disk model description
#[derive(Deserialize)]
struct ModelFile {
    backend: Backend,
    #[serde(default)]
    dimensions: Vec<Dimension>,
    #[serde(default)]
    measures: Vec<Measure>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let locale = if cli.comma_decimal {
        Locale::COMMA_DECIMAL
    } else {
        Locale::CANONICAL
    };
    let env = CompilerEnvironment::new(CompilerConfig {
        locale,
        ..CompilerConfig::default()
    });
    let metadata = match &cli.model {
        Some(path) => load_model(path)?,
        None => MetadataSnapshot::new(cli.backend),
    };
    let compiler = Compiler::new(&env, &metadata);

    match cli.command {
        Commands::Compile {
            formula,
            editing,
            json,
        } => compile(&compiler, &formula, context(editing), json),
        Commands::Validate {
            formula,
            editing,
            json,
        } => validate(&compiler, &formula, context(editing), json),
        Commands::Tokens { formula, json } => tokens(&compiler, &formula, json),
        Commands::Display { formula } => {
            println!("{}", compiler.to_display_text(&formula));
            Ok(())
        }
        Commands::Canonical { formula } => {
            println!("{}", compiler.to_canonical_text(&formula));
            Ok(())
        }
        Commands::Functions => list_functions(&env, metadata.backend()),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_model(path: &Path) -> Result<MetadataSnapshot> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read '{}'", path.display()))?;
    let model: ModelFile = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse model '{}'", path.display()))?;
    tracing::debug!(
        dimensions = model.dimensions.len(),
        measures = model.measures.len(),
        "loaded model"
    );
    Ok(MetadataSnapshot::from_members(
        model.backend,
        model.dimensions,
        model.measures,
    ))
}

fn context(editing: Option<String>) -> CompileContext {
    match editing {
        Some(id) => CompileContext::editing(id),
        None => CompileContext::new(),
    }
}

fn compile(compiler: &Compiler<'_>, formula: &str, cx: CompileContext, json: bool) -> Result<()> {
    let compiled = match compiler.compile_display(formula, &cx) {
        Ok(compiled) => compiled,
        Err(messages) => {
            eprintln!("{}", messages);
            bail!("formula has {} error(s)", messages.len());
        }
    };

    for message in compiled.messages.iter() {
        eprintln!("{}", message);
    }
    if json {
        let output = serde_json::json!({
            "formula": compiled.canonical_text(),
            "type": compiled.return_type().to_string(),
            "derived_measures": compiled.derived_measures,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", compiler.to_display_text(&compiled.canonical_text()));
        println!("Type: {}", compiled.return_type());
        for measure in &compiled.derived_measures {
            println!(
                "  {}\t{}",
                measure.id,
                measure.formula.as_deref().unwrap_or_default()
            );
        }
    }
    Ok(())
}

fn validate(compiler: &Compiler<'_>, formula: &str, cx: CompileContext, json: bool) -> Result<()> {
    let messages = compiler.validate_display(formula, &cx);
    if json {
        let list: Vec<_> = messages.iter().collect();
        println!("{}", serde_json::to_string_pretty(&list)?);
    } else if messages.is_empty() {
        println!("OK");
    } else {
        println!("{}", messages);
    }

    if messages.has_errors() {
        bail!("formula has {} error(s)", messages.errors().count());
    }
    Ok(())
}

fn tokens(compiler: &Compiler<'_>, formula: &str, json: bool) -> Result<()> {
    let canonical = compiler.to_canonical_text(formula);
    let tokens = compiler.tokenize(&canonical);
    if json {
        println!("{}", serde_json::to_string_pretty(&tokens)?);
        return Ok(());
    }

    for token in &tokens {
        let types: Vec<String> = token.data_types.iter().map(|t| t.to_string()).collect();
        println!(
            "{:>4}..{:<4} {:<10} {:<24} {}",
            token.span.start,
            token.span.end,
            format!("{:?}", token.kind),
            types.join("|"),
            token.text
        );
    }
    Ok(())
}

fn list_functions(env: &CompilerEnvironment, backend: Backend) -> Result<()> {
    for item in env.registry.available(backend) {
        println!(
            "{:<10} {:<28} {}",
            item.category().name(),
            item.syntax,
            item.description
        );
    }
    Ok(())
}

//! llm-validate
//!
//! Command-line interface for validating LLM output against contracts.
//!
//! ## Usage
//!
//! ```bash
//! # Validate an output file against a contract
//! llm-validate output.json --schema product.yaml
//!
//! # Machine-readable result
//! llm-validate output.json --schema product.yaml --output-format json
//!
//! # Pipe from stdin, fail the pipeline on violations
//! cat output.txt | llm-validate - --schema product.yaml --strict
//!
//! # Write reports alongside the console output
//! llm-validate output.json --schema product.yaml --html-report report.html --md-report report.md
//!
//! # Check a contract without validating anything
//! llm-validate contract validate product.yaml
//! ```
//!
//! ## Exit Codes
//!
//! - 0: Valid, or violations without --strict
//! - 1: Violations with --strict
//! - 2: Contract failed to load
//! - 3: Error

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use contracts_core::{
    render, Candidate, Constraints, Contract, FieldSpec, ReportFormat, ValidationResult,
};
use contracts_runtime::{RuntimeConfig, RuntimeOrchestrator};

const EXIT_VIOLATIONS: u8 = 1;
const EXIT_CONTRACT_INVALID: u8 = 2;
const EXIT_ERROR: u8 = 3;

/// llm-validate: check LLM output against declarative contracts
///
/// Validation is the default invocation; `validate` is accepted as an
/// explicit subcommand for the same arguments.
#[derive(Parser)]
#[command(name = "llm-validate")]
#[command(version)]
#[command(about = "Validate LLM output against contracts", long_about = None)]
#[command(args_conflicts_with_subcommands = true, subcommand_negates_reqs = true)]
struct Cli {
    #[command(flatten)]
    validate: ValidateArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a candidate output against a contract
    Validate(ValidateArgs),

    /// Contract management commands
    Contract {
        #[command(subcommand)]
        action: ContractAction,
    },
}

#[derive(Args)]
struct ValidateArgs {
    /// Path to the candidate output, or '-' to read stdin
    #[arg(required = true)]
    candidate: Option<String>,

    /// Path to the contract (YAML or JSON)
    #[arg(short, long, required = true)]
    schema: Option<PathBuf>,

    /// Console output format
    #[arg(short, long, visible_alias = "output-format", default_value = "text")]
    format: OutputFormat,

    /// Also write an HTML report to this path
    #[arg(long)]
    html_report: Option<PathBuf>,

    /// Also write a Markdown report to this path
    #[arg(long)]
    md_report: Option<PathBuf>,

    /// Exit with code 1 when violations are found
    #[arg(long)]
    strict: bool,

    /// Runtime configuration (YAML)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum ContractAction {
    /// Check that a contract file loads
    Validate {
        /// Path to the contract file
        path: PathBuf,
    },

    /// Show contract details
    Show {
        /// Path to the contract file
        path: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Markdown,
    Html,
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    match run() {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        None => validate_command(cli.validate),
        Some(Commands::Validate(args)) => validate_command(args),
        Some(Commands::Contract { action }) => match action {
            ContractAction::Validate { path } => validate_contract(&path),
            ContractAction::Show { path } => show_contract(&path),
        },
    }
}

fn validate_command(args: ValidateArgs) -> Result<ExitCode> {
    // clap enforces both outside of a subcommand
    let (Some(candidate), Some(schema)) = (&args.candidate, &args.schema) else {
        bail!("a candidate and --schema are required");
    };

    // Load contract; a bad contract has its own exit code
    let contract = match Contract::from_file(schema) {
        Ok(contract) => contract,
        Err(e) => {
            eprintln!("Failed to load contract from {:?}: {}", schema, e);
            return Ok(ExitCode::from(EXIT_CONTRACT_INVALID));
        }
    };

    let config = match &args.config {
        Some(path) => RuntimeConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load runtime config from {:?}", path))?,
        None => RuntimeConfig::default(),
    };

    let candidate = read_candidate(candidate)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let orchestrator = RuntimeOrchestrator::new(config)?;
    let result = runtime
        .block_on(orchestrator.validate(Arc::new(contract), Arc::new(candidate)))
        .context("Validation failed")?;

    print!("{}", format_result(&result, args.format)?);

    if let Some(path) = &args.html_report {
        render(&result, ReportFormat::Html)
            .write_to(path)
            .with_context(|| format!("Failed to write HTML report to {:?}", path))?;
    }
    if let Some(path) = &args.md_report {
        render(&result, ReportFormat::Markdown)
            .write_to(path)
            .with_context(|| format!("Failed to write Markdown report to {:?}", path))?;
    }

    Ok(ExitCode::from(exit_status(&result, args.strict)))
}

/// Read the candidate from a file, or stdin for '-'.
fn read_candidate(source: &str) -> Result<Candidate> {
    let content = if source == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("Failed to read candidate from {:?}", source))?
    };
    Ok(Candidate::text(content))
}

fn exit_status(result: &ValidationResult, strict: bool) -> u8 {
    if strict && !result.is_valid {
        EXIT_VIOLATIONS
    } else {
        0
    }
}

fn format_result(result: &ValidationResult, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => format_text(result),
        OutputFormat::Json => format!("{}\n", serde_json::to_string_pretty(result)?),
        OutputFormat::Markdown => render(result, ReportFormat::Markdown).to_string(),
        OutputFormat::Html => render(result, ReportFormat::Html).to_string(),
    })
}

fn format_text(result: &ValidationResult) -> String {
    if result.is_valid {
        return "PASSED\n".to_string();
    }

    let mut out = format!("FAILED ({} violations)\n\n", result.violations.len());
    for (i, v) in result.violations.iter().enumerate() {
        out.push_str(&format!(
            "  {}. [{}] {}: {}\n",
            i + 1,
            v.source.as_str(),
            v.identifier,
            v.message
        ));
    }
    out
}

fn validate_contract(path: &Path) -> Result<ExitCode> {
    match Contract::from_file(path) {
        Ok(c) => {
            println!(
                "Contract is valid: {}",
                c.name.as_deref().unwrap_or("<unnamed>")
            );
            println!();
            println!("Fields: {}", c.fields.len());
            println!("Rules: {}", c.rules.len());
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("Contract validation failed: {}", e);
            Ok(ExitCode::from(EXIT_CONTRACT_INVALID))
        }
    }
}

fn show_contract(path: &Path) -> Result<ExitCode> {
    let contract = match Contract::from_file(path) {
        Ok(contract) => contract,
        Err(e) => {
            eprintln!("Failed to load contract from {:?}: {}", path, e);
            return Ok(ExitCode::from(EXIT_CONTRACT_INVALID));
        }
    };
    print!("{}", describe_contract(&contract));
    Ok(ExitCode::SUCCESS)
}

fn describe_contract(contract: &Contract) -> String {
    let mut out = format!(
        "Contract: {}\n",
        contract.name.as_deref().unwrap_or("<unnamed>")
    );
    if let Some(description) = &contract.description {
        out.push_str(&format!("Description: {}\n", description));
    }

    out.push_str("\nFields:\n");
    if contract.fields.is_empty() {
        out.push_str("  (none)\n");
    }
    for field in &contract.fields {
        out.push_str(&format!("  - {}\n", describe_field(field)));
    }

    out.push_str("\nRules:\n");
    if contract.rules.is_empty() {
        out.push_str("  (none)\n");
    }
    for (i, rule) in contract.rules.iter().enumerate() {
        let mut params = serde_json::to_value(rule).unwrap_or_default();
        if let Some(map) = params.as_object_mut() {
            map.remove("kind");
        }
        out.push_str(&format!("  {}. {} {}\n", i + 1, rule.kind(), params));
    }
    out
}

fn describe_field(field: &FieldSpec) -> String {
    let mut line = format!("{}: {}", field.name, field.field_type);
    if field.required {
        line.push_str(" (required)");
    }
    let constraints = match &field.constraints {
        Constraints::None => None,
        other => serde_json::to_value(other)
            .ok()
            .filter(|v| v.as_object().is_some_and(|m| !m.is_empty())),
    };
    if let Some(constraints) = constraints {
        line.push_str(&format!(" {}", constraints));
    }
    line
}

//! # atoms CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use atoms_cli::catalog::{run_schema, run_shapes, SchemaArgs, ShapesArgs};
use atoms_cli::decode::{run_decode, DecodeArgs};
use atoms_cli::EXIT_ERROR;

/// Atomic value catalog CLI.
///
/// Decodes loosely-typed field-bag payloads into typed values, reconciling
/// legacy payloads, and prints the variant registry of each generation.
#[derive(Parser, Debug)]
#[command(name = "atoms", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a YAML pipeline configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decode a JSON or YAML payload into a typed value.
    Decode(DecodeArgs),

    /// Print the variant shape table of a generation.
    Shapes(ShapesArgs),

    /// Print the JSON Schema derived from a generation's registry.
    Schema(SchemaArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Decode(args) => run_decode(&args, cli.config.as_deref()),
        Commands::Shapes(args) => run_shapes(&args),
        Commands::Schema(args) => run_schema(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

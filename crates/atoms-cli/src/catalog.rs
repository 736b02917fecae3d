//! # Catalog Subcommands
//!
//! `atoms shapes` and `atoms schema` print what a generation's registry
//! declares: the raw shape table, or the JSON Schema derived from it.

use anyhow::Result;
use clap::Args;
use serde_json::Value;

use atoms_core::Generation;
use atoms_schema::Registry;

use crate::{print_json, EXIT_ACCEPTED};

/// Arguments for the `atoms shapes` subcommand.
#[derive(Args, Debug, Default)]
pub struct ShapesArgs {
    /// Generation whose registry to print. Defaults to the current one.
    #[arg(long, value_name = "GEN")]
    pub generation: Option<Generation>,
}

/// Arguments for the `atoms schema` subcommand.
#[derive(Args, Debug, Default)]
pub struct SchemaArgs {
    /// Generation whose registry to export. Defaults to the current one.
    #[arg(long, value_name = "GEN")]
    pub generation: Option<Generation>,

    /// Print only the registry fingerprint.
    #[arg(long)]
    pub fingerprint: bool,
}

fn registry(generation: Option<Generation>) -> &'static Registry {
    Registry::for_generation(generation.unwrap_or(Generation::CURRENT))
}

/// Execute the shapes subcommand.
pub fn run_shapes(args: &ShapesArgs) -> Result<u8> {
    let registry = registry(args.generation);
    tracing::info!(
        generation = %registry.generation(),
        variants = registry.shapes().len(),
        "printing shape table"
    );
    print_json(&registry.shape_table())?;
    Ok(EXIT_ACCEPTED)
}

/// Execute the schema subcommand.
pub fn run_schema(args: &SchemaArgs) -> Result<u8> {
    let output = schema_output(args);
    match output {
        Value::String(fingerprint) => println!("{fingerprint}"),
        schema => print_json(&schema)?,
    }
    Ok(EXIT_ACCEPTED)
}

/// The document `atoms schema` prints: the full schema, or just the
/// fingerprint string under `--fingerprint`.
pub fn schema_output(args: &SchemaArgs) -> Value {
    let registry = registry(args.generation);
    if args.fingerprint {
        Value::String(registry.fingerprint())
    } else {
        registry.to_json_schema()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_defaults_to_current_generation() {
        let schema = schema_output(&SchemaArgs::default());
        assert_eq!(schema, Registry::current().to_json_schema());
    }

    #[test]
    fn test_fingerprint_only() {
        let args = SchemaArgs {
            generation: Some(Generation::V1),
            fingerprint: true,
        };
        let output = schema_output(&args);
        let fingerprint = output.as_str().unwrap();
        assert_eq!(fingerprint.len(), 64);
        assert_eq!(fingerprint, Registry::for_generation(Generation::V1).fingerprint());
        assert_ne!(fingerprint, Registry::current().fingerprint());
    }

    #[test]
    fn test_schema_carries_fingerprint() {
        let args = SchemaArgs {
            generation: Some(Generation::V2),
            fingerprint: false,
        };
        let schema = schema_output(&args);
        assert_eq!(schema["x-fingerprint"], Registry::current().fingerprint());
    }
}

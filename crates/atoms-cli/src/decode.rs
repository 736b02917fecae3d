//! # Decode Subcommand
//!
//! Decodes one payload file and prints either the accepted value (with any
//! warnings) or the full list of violations.
//!
//! ## Configuration Precedence
//!
//! Command-line flags win over the `--config` file, which replaces the
//! `ATOMS_*` environment variables wholesale when given. Anything left
//! unset takes the [`PipelineConfig`] default.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;

use atoms_codec::{ObjectPolicy, Pipeline, PipelineConfig};
use atoms_core::Generation;

use crate::{print_json, read_document, EXIT_ACCEPTED, EXIT_REJECTED};

/// Arguments for the `atoms decode` subcommand.
#[derive(Args, Debug, Default)]
pub struct DecodeArgs {
    /// Payload file. `.yaml`/`.yml` files are read as YAML, others as JSON.
    #[arg(value_name = "FILE")]
    pub path: PathBuf,

    /// Generation the payload was written in (`v1` or `v2`). Unmarked
    /// payloads are assumed current.
    #[arg(long, value_name = "GEN")]
    pub generation: Option<Generation>,

    /// What to do when a legacy action lacks `object`.
    #[arg(long, value_name = "POLICY")]
    pub object_policy: Option<ObjectPolicy>,

    /// Deepest nesting level accepted.
    #[arg(long, value_name = "N")]
    pub max_depth: Option<usize>,

    /// Most nested values one payload may expand into.
    #[arg(long, value_name = "N")]
    pub max_nodes: Option<usize>,

    /// Never retry unmarked payloads through the legacy reconciler.
    #[arg(long)]
    pub no_fallback: bool,
}

/// Execute the decode subcommand.
///
/// Returns exit code: 0 when accepted, 1 when rejected. Operational
/// failures are returned as errors.
pub fn run_decode(args: &DecodeArgs, config_path: Option<&Path>) -> Result<u8> {
    let config = resolve_config(args, config_path, |key| std::env::var(key).ok())?;
    tracing::debug!(
        max_depth = config.max_depth,
        max_nodes = config.max_nodes,
        object_policy = %config.object_policy,
        fallback = config.fallback_reconcile,
        "resolved pipeline configuration"
    );

    let document = read_document(&args.path)?;
    let (code, output) = decode_document(&document, args.generation, config)?;
    print_json(&output)?;
    Ok(code)
}

/// Build the pipeline configuration from flags, file, and environment.
pub fn resolve_config(
    args: &DecodeArgs,
    config_path: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<PipelineConfig> {
    let mut config = match config_path {
        Some(path) => PipelineConfig::from_yaml_file(path)
            .with_context(|| format!("invalid configuration file {}", path.display()))?,
        None => PipelineConfig::default()
            .overlay(env)
            .context("invalid configuration in environment")?,
    };

    if let Some(max_depth) = args.max_depth {
        config.max_depth = max_depth;
    }
    if let Some(max_nodes) = args.max_nodes {
        config.max_nodes = max_nodes;
    }
    if let Some(policy) = args.object_policy {
        config.object_policy = policy;
    }
    if args.no_fallback {
        config.fallback_reconcile = false;
    }
    Ok(config)
}

/// Decode `document` and render the outcome as JSON.
pub fn decode_document(
    document: &Value,
    generation: Option<Generation>,
    config: PipelineConfig,
) -> Result<(u8, Value)> {
    match Pipeline::new(config).decode_json(document, generation) {
        Ok(decoded) => {
            tracing::info!(
                variant = %decoded.value.class(),
                warnings = decoded.warnings.len(),
                "payload accepted"
            );
            let output = serde_json::to_value(&decoded).context("failed to render decoded value")?;
            Ok((EXIT_ACCEPTED, output))
        }
        Err(rejection) => {
            tracing::info!(violations = rejection.violations.len(), "payload rejected");
            let output = serde_json::to_value(&rejection).context("failed to render violations")?;
            Ok((EXIT_REJECTED, output))
        }
    }
}

//! # atoms-cli — Command-Line Interface for the Atomic Value Catalog
//!
//! Provides the `atoms` binary.
//!
//! ## Subcommands
//!
//! - `atoms decode <FILE>`: decode a JSON or YAML payload and print the
//!   typed value, or every violation found.
//! - `atoms shapes`: print the shape table of one generation.
//! - `atoms schema`: print the JSON Schema derived from one generation.
//!
//! ```bash
//! atoms decode payload.json --generation v1 --object-policy placeholder
//! atoms schema --generation v2 --fingerprint
//! ```
//!
//! ## Exit Codes
//!
//! `0` accepted, `1` rejected, `2` operational error (unreadable file,
//! unparseable document, invalid configuration).
//!
//! ## Crate Policy
//!
//! - Argument parsing lives here; decoding lives in `atoms-codec`.
//! - Handlers return the exit code and write JSON to stdout. Logs go to
//!   stderr.

pub mod catalog;
pub mod decode;

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

/// Exit code for an accepted payload.
pub const EXIT_ACCEPTED: u8 = 0;
/// Exit code for a rejected payload.
pub const EXIT_REJECTED: u8 = 1;
/// Exit code for anything that stopped the command before a verdict.
pub const EXIT_ERROR: u8 = 2;

/// Read a payload document. `.yaml` and `.yml` files are parsed as YAML,
/// everything else as JSON.
pub fn read_document(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
    if is_yaml {
        serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse YAML in {}", path.display()))
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse JSON in {}", path.display()))
    }
}

/// Pretty-print `value` to stdout.
pub fn print_json(value: &Value) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render JSON")?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_json_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("text.json");
        std::fs::write(&path, r#"{"type": "Text", "text": "hi"}"#).unwrap();
        let value = read_document(&path).unwrap();
        assert_eq!(value["text"], "hi");
    }

    #[test]
    fn test_read_yaml_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flag.yml");
        std::fs::write(&path, "type: Flag\nflag: true\n").unwrap();
        let value = read_document(&path).unwrap();
        assert_eq!(value["flag"], true);
    }

    #[test]
    fn test_read_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_document(&dir.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn test_read_malformed_json_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{\"type\": ").unwrap();
        let err = read_document(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse JSON"));
    }
}

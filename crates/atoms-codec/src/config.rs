//! Pipeline configuration.
//!
//! Defaults suit untrusted payloads: depth bounded at 32, expansion bounded
//! at 10 000 nested values, legacy actions
//! without an `object` rejected, automatic reconciliation of unmarked legacy
//! payloads enabled. Override via environment variables, a YAML file, or
//! explicit construction.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::expander::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_NODES};

/// What the reconciler does when a field that became required in the
/// current generation is absent from a legacy payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectPolicy {
    /// Reject with `SchemaGap`.
    #[default]
    Reject,
    /// Substitute a placeholder value and report a warning.
    Placeholder,
}

impl ObjectPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reject => "reject",
            Self::Placeholder => "placeholder",
        }
    }
}

impl std::fmt::Display for ObjectPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "placeholder" => Ok(Self::Placeholder),
            _ => Err(ConfigError::InvalidValue {
                key: "object_policy".to_string(),
                value: s.to_string(),
                reason: "expected `reject` or `placeholder`".to_string(),
            }),
        }
    }
}

/// Settings for one [`Pipeline`](crate::Pipeline).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Deepest nesting level accepted; the root is level 0.
    pub max_depth: usize,
    /// Most nested values one expansion may produce.
    pub max_nodes: usize,
    pub object_policy: ObjectPolicy,
    /// Retry a failed unmarked decode through the reconciler when the
    /// payload uses legacy names.
    pub fallback_reconcile: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_nodes: DEFAULT_MAX_NODES,
            object_policy: ObjectPolicy::Reject,
            fallback_reconcile: true,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `ATOMS_MAX_DEPTH` (default: 32)
    /// - `ATOMS_MAX_NODES` (default: 10000)
    /// - `ATOMS_OBJECT_POLICY`: `reject` | `placeholder` (default: `reject`)
    /// - `ATOMS_FALLBACK_RECONCILE`: `true` | `false` (default: `true`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    /// Load configuration from a YAML file. Absent keys take their defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_yaml_str(&content).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })
    }

    /// Apply every variable `lookup` returns on top of `self`.
    pub fn overlay(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(raw) = lookup(ENV_MAX_DEPTH) {
            self.max_depth = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_MAX_DEPTH.to_string(),
                value: raw.clone(),
                reason: "expected a non-negative integer".to_string(),
            })?;
        }
        if let Some(raw) = lookup(ENV_MAX_NODES) {
            self.max_nodes = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_MAX_NODES.to_string(),
                value: raw.clone(),
                reason: "expected a non-negative integer".to_string(),
            })?;
        }
        if let Some(raw) = lookup(ENV_OBJECT_POLICY) {
            self.object_policy = raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_OBJECT_POLICY.to_string(),
                value: raw.clone(),
                reason: "expected `reject` or `placeholder`".to_string(),
            })?;
        }
        if let Some(raw) = lookup(ENV_FALLBACK_RECONCILE) {
            self.fallback_reconcile = parse_bool(&raw).ok_or_else(|| ConfigError::InvalidValue {
                key: ENV_FALLBACK_RECONCILE.to_string(),
                value: raw.clone(),
                reason: "expected `true` or `false`".to_string(),
            })?;
        }
        Ok(self)
    }
}

pub const ENV_MAX_DEPTH: &str = "ATOMS_MAX_DEPTH";
pub const ENV_MAX_NODES: &str = "ATOMS_MAX_NODES";
pub const ENV_OBJECT_POLICY: &str = "ATOMS_OBJECT_POLICY";
pub const ENV_FALLBACK_RECONCILE: &str = "ATOMS_FALLBACK_RECONCILE";

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
    #[error("cannot read {path}: {message}")]
    Io { path: String, message: String },
    #[error("cannot parse {path}: {message}")]
    Parse { path: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.max_depth, 32);
        assert_eq!(cfg.max_nodes, 10_000);
        assert_eq!(cfg.object_policy, ObjectPolicy::Reject);
        assert!(cfg.fallback_reconcile);
    }

    #[test]
    fn test_overlay_reads_variables() {
        let cfg = PipelineConfig::default()
            .overlay(lookup(&[
                ("ATOMS_MAX_DEPTH", "8"),
                ("ATOMS_MAX_NODES", "500"),
                ("ATOMS_OBJECT_POLICY", "Placeholder"),
                ("ATOMS_FALLBACK_RECONCILE", "false"),
            ]))
            .unwrap();
        assert_eq!(cfg.max_depth, 8);
        assert_eq!(cfg.max_nodes, 500);
        assert_eq!(cfg.object_policy, ObjectPolicy::Placeholder);
        assert!(!cfg.fallback_reconcile);
    }

    #[test]
    fn test_overlay_without_variables_keeps_base() {
        let base = PipelineConfig {
            max_depth: 4,
            ..PipelineConfig::default()
        };
        assert_eq!(base.overlay(lookup(&[])).unwrap(), base);
    }

    #[test]
    fn test_overlay_rejects_bad_depth() {
        let err = PipelineConfig::default()
            .overlay(lookup(&[("ATOMS_MAX_DEPTH", "-1")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "ATOMS_MAX_DEPTH"));
    }

    #[test]
    fn test_overlay_rejects_bad_policy() {
        assert!(PipelineConfig::default()
            .overlay(lookup(&[("ATOMS_OBJECT_POLICY", "ignore")]))
            .is_err());
    }

    #[test]
    fn test_yaml_partial() {
        let cfg = PipelineConfig::from_yaml_str("object_policy: placeholder\n").unwrap();
        assert_eq!(cfg.object_policy, ObjectPolicy::Placeholder);
        assert_eq!(cfg.max_depth, 32);
    }

    #[test]
    fn test_yaml_unknown_key_rejected() {
        assert!(matches!(
            PipelineConfig::from_yaml_str("depth: 3\n"),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_yaml_file_missing() {
        let err = PipelineConfig::from_yaml_file(Path::new("/nonexistent/atoms.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}

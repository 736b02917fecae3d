//! # Decode Pipeline
//!
//! decode → expand → validate, with the reconciler in front for legacy
//! payloads.
//!
//! ## Generation Handling
//!
//! - `Some(Generation::V1)`: the payload is reconciled first, then decoded
//!   against the current registry.
//! - `None` (unmarked, assumed current): decoded directly. If that fails
//!   with `UnknownVariant`, `MissingField`, or `TypeMismatch`, fallback is
//!   enabled, and the payload uses legacy names, it is reconciled and
//!   decoded once more. The second attempt's outcome is final.
//! - `Some(Generation::V2)`: decoded directly, never reconciled.
//!
//! The pipeline holds only its configuration and `'static` registries, so
//! it is `Send + Sync` and can be shared across threads.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use atoms_core::{BagArena, BagId, DecodeError, ErrorCode, Generation, Violation};
use atoms_schema::Registry;

use crate::config::PipelineConfig;
use crate::decoder::Decoder;
use crate::expander::Expander;
use crate::model::Atom;
use crate::reconciler::{Reconciler, V1_TO_V2};
use crate::validator::{validate, Warning};

/// An accepted payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Decoded {
    pub value: Atom,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
    /// The generation the payload was reconciled from, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconciled_from: Option<Generation>,
}

/// A rejected payload: every violation found, never empty.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[error("payload rejected with {} violation(s), first: {}", .violations.len(), first(.violations))]
pub struct Rejection {
    pub violations: Vec<Violation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

fn first(violations: &[Violation]) -> String {
    violations
        .first()
        .map(ToString::to_string)
        .unwrap_or_default()
}

impl Rejection {
    fn from_error(err: &DecodeError, warnings: Vec<Warning>) -> Self {
        Self {
            violations: err.violations(),
            warnings,
        }
    }
}

/// Decodes payloads under one [`PipelineConfig`].
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Decode a JSON document.
    pub fn decode_json(
        &self,
        value: &Value,
        generation: Option<Generation>,
    ) -> Result<Decoded, Rejection> {
        let (arena, root) = BagArena::from_json(value)
            .map_err(|e| Rejection::from_error(&DecodeError::from(e), Vec::new()))?;
        self.decode(&arena, root, generation)
    }

    /// Decode the value rooted at `root`.
    pub fn decode(
        &self,
        arena: &BagArena,
        root: BagId,
        generation: Option<Generation>,
    ) -> Result<Decoded, Rejection> {
        match generation {
            Some(Generation::V1) => self.decode_legacy(arena, root),
            Some(Generation::V2) => self.decode_current(arena, root, Vec::new(), None),
            None => match self.expand(arena, root) {
                Ok(atom) => self.finish(atom, Vec::new(), None),
                Err(err) if self.should_fall_back(&err, arena, root) => {
                    tracing::debug!(
                        code = %err.code(),
                        "unmarked payload uses legacy names, retrying through reconciler"
                    );
                    self.decode_legacy(arena, root)
                }
                Err(err) => Err(Rejection::from_error(&err, Vec::new())),
            },
        }
    }

    fn should_fall_back(&self, err: &DecodeError, arena: &BagArena, root: BagId) -> bool {
        self.config.fallback_reconcile
            && matches!(
                err.code(),
                ErrorCode::UnknownVariant | ErrorCode::MissingField | ErrorCode::TypeMismatch
            )
            && V1_TO_V2.detects_legacy(arena, root)
    }

    fn decode_legacy(&self, arena: &BagArena, root: BagId) -> Result<Decoded, Rejection> {
        let reconciled = Reconciler::new(V1_TO_V2, self.config.object_policy)
            .reconcile(arena, root)
            .map_err(|err| Rejection::from_error(&err, Vec::new()))?;
        tracing::debug!(from = %V1_TO_V2.from, to = %V1_TO_V2.to, "reconciled legacy payload");
        self.decode_current(
            &reconciled.arena,
            reconciled.root,
            reconciled.warnings,
            Some(V1_TO_V2.from),
        )
    }

    fn decode_current(
        &self,
        arena: &BagArena,
        root: BagId,
        warnings: Vec<Warning>,
        reconciled_from: Option<Generation>,
    ) -> Result<Decoded, Rejection> {
        match self.expand(arena, root) {
            Ok(atom) => self.finish(atom, warnings, reconciled_from),
            Err(err) => Err(Rejection::from_error(&err, warnings)),
        }
    }

    fn expand(&self, arena: &BagArena, root: BagId) -> Result<Atom, DecodeError> {
        let decoder = Decoder::new(Registry::current());
        Expander::new(decoder, arena, self.config.max_depth)
            .with_max_nodes(self.config.max_nodes)
            .expand(root)
    }

    fn finish(
        &self,
        value: Atom,
        mut warnings: Vec<Warning>,
        reconciled_from: Option<Generation>,
    ) -> Result<Decoded, Rejection> {
        let report = validate(&value);
        for warning in &report.warnings {
            tracing::warn!(code = ?warning.code, field = ?warning.field, "{}", warning.detail);
        }
        warnings.extend(report.warnings);
        if !report.violations.is_empty() {
            return Err(Rejection {
                violations: report.violations,
                warnings,
            });
        }
        Ok(Decoded {
            value,
            warnings,
            reconciled_from,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ObjectPolicy;
    use serde_json::json;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_pipeline_is_send_sync() {
        assert_send_sync::<Pipeline>();
    }

    #[test]
    fn test_accepts_current_payload() {
        let decoded = Pipeline::default()
            .decode_json(&json!({"type": "Text", "text": "hello"}), None)
            .unwrap();
        assert_eq!(decoded.value.class(), atoms_core::AtomicClass::Text);
        assert!(decoded.warnings.is_empty());
        assert_eq!(decoded.reconciled_from, None);
    }

    #[test]
    fn test_validation_failure_rejected() {
        let rejection = Pipeline::default()
            .decode_json(
                &json!({"type": "NumericRange", "fromValue": 10, "toValue": 5}),
                None,
            )
            .unwrap_err();
        assert_eq!(rejection.violations[0].code, ErrorCode::InvalidRange);
    }

    #[test]
    fn test_non_object_payload_rejected() {
        let rejection = Pipeline::default()
            .decode_json(&json!(["not", "a", "bag"]), None)
            .unwrap_err();
        assert_eq!(rejection.violations[0].code, ErrorCode::TypeMismatch);
    }

    #[test]
    fn test_fallback_reconciles_unmarked_legacy() {
        let payload = json!({"type": "Reference", "id": "r", "name": "n", "category1": "c"});
        let decoded = Pipeline::default().decode_json(&payload, None).unwrap();
        assert_eq!(decoded.value.class(), atoms_core::AtomicClass::Resource);
        assert_eq!(decoded.reconciled_from, Some(Generation::V1));
    }

    #[test]
    fn test_decoded_wire_keys_are_camel_case() {
        let payload = json!({"type": "Number", "value": 3});
        let decoded = Pipeline::default()
            .decode_json(&payload, Some(Generation::V1))
            .unwrap();
        let wire = serde_json::to_value(&decoded).unwrap();
        assert_eq!(wire["reconciledFrom"], "v1");
        assert!(wire.get("reconciled_from").is_none());
    }

    #[test]
    fn test_fallback_disabled() {
        let payload = json!({"type": "Reference", "id": "r", "name": "n", "category1": "c"});
        let pipeline = Pipeline::new(PipelineConfig {
            fallback_reconcile: false,
            ..PipelineConfig::default()
        });
        let rejection = pipeline.decode_json(&payload, None).unwrap_err();
        assert_eq!(rejection.violations[0].code, ErrorCode::UnknownVariant);
    }

    #[test]
    fn test_explicit_current_marker_never_reconciles() {
        let payload = json!({"type": "Reference", "id": "r", "name": "n", "category1": "c"});
        let rejection = Pipeline::default()
            .decode_json(&payload, Some(Generation::V2))
            .unwrap_err();
        assert_eq!(rejection.violations[0].code, ErrorCode::UnknownVariant);
    }

    #[test]
    fn test_placeholder_warning_carried() {
        let payload = json!({
            "type": "Action",
            "actionStatus": 1,
            "actor": {"type": "Person", "id": "p", "name": "Ada"},
            "name": "review"
        });
        let pipeline = Pipeline::new(PipelineConfig {
            object_policy: ObjectPolicy::Placeholder,
            ..PipelineConfig::default()
        });
        let decoded = pipeline.decode_json(&payload, Some(Generation::V1)).unwrap();
        assert_eq!(decoded.warnings.len(), 1);
        assert_eq!(
            decoded.warnings[0].code,
            crate::validator::WarningCode::PlaceholderObject
        );
    }

    #[test]
    fn test_rejection_display() {
        let rejection = Pipeline::default()
            .decode_json(&json!({"type": "Flag", "flag": "yes"}), None)
            .unwrap_err();
        let msg = rejection.to_string();
        assert!(msg.starts_with("payload rejected with 1 violation(s)"));
        assert!(msg.contains("Flag.flag"));
    }
}

//! # Error Types — Structured Decode Errors and Violations
//!
//! Defines the error vocabulary shared by the decoder, expander, validator
//! and reconciler. All errors use `thiserror` for derive-based `Display`
//! and `Error` implementations.
//!
//! ## Design
//!
//! - Every error names the variant and field it concerns, plus the
//!   offending value where there is one, so callers can act on it
//!   mechanically.
//! - Decode errors are fail-fast along one nesting path. They nest: an
//!   error inside a department is wrapped in [`DecodeError::Nested`] or
//!   [`DecodeError::ListElements`] so the full field path survives.
//! - [`Violation`] is the flat, serializable wire form
//!   `{code, variant, field?, detail}`. A decode error flattens into one
//!   violation per leaf failure.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bag::{BagError, BagId};
use crate::class::AtomicClass;
use crate::generation::Generation;

/// Machine-readable violation code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    UnknownVariant,
    AmbiguousVariant,
    MissingField,
    TypeMismatch,
    CyclicStructure,
    MaxDepthExceeded,
    NodeLimitExceeded,
    InvalidRange,
    MalformedTimestamp,
    InvalidCurrency,
    MissingRecipient,
    SchemaGap,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownVariant => "UnknownVariant",
            Self::AmbiguousVariant => "AmbiguousVariant",
            Self::MissingField => "MissingField",
            Self::TypeMismatch => "TypeMismatch",
            Self::CyclicStructure => "CyclicStructure",
            Self::MaxDepthExceeded => "MaxDepthExceeded",
            Self::NodeLimitExceeded => "NodeLimitExceeded",
            Self::InvalidRange => "InvalidRange",
            Self::MalformedTimestamp => "MalformedTimestamp",
            Self::InvalidCurrency => "InvalidCurrency",
            Self::MissingRecipient => "MissingRecipient",
            Self::SchemaGap => "SchemaGap",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reported problem, in the flat form handed back to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub code: ErrorCode,
    /// Variant that owns the field (or the offending tag for tag errors).
    pub variant: String,
    /// Dotted path from the root value, e.g. `department[0].dateCreated`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub detail: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.field {
            Some(field) => write!(f, "[{}] {}.{}: {}", self.code, self.variant, field, self.detail),
            None => write!(f, "[{}] {}: {}", self.code, self.variant, self.detail),
        }
    }
}

/// A failing element of a list-of-nested-atomic field.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementFailure {
    pub index: usize,
    pub error: DecodeError,
}

/// Failure to turn a field-bag into a typed value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// The tag names no variant of the current generation, or no variant's
    /// required fields are all present when the tag had to be inferred.
    #[error("unknown variant {tag:?}: {detail}")]
    UnknownVariant {
        /// The offending tag (empty when inference found no candidate).
        tag: String,
        /// Why the tag was not accepted.
        detail: String,
    },

    /// Tag inference matched more than one variant.
    #[error("ambiguous variant, candidates: {}", class_list(.candidates))]
    AmbiguousVariant {
        /// Every variant whose required fields were all present.
        candidates: Vec<AtomicClass>,
    },

    /// A required field is absent.
    #[error("{variant}.{field}: missing required field")]
    MissingField { variant: String, field: String },

    /// A field is present with the wrong kind of value.
    #[error("{variant}.{field}: expected {expected}, found {actual}")]
    TypeMismatch {
        variant: String,
        field: String,
        /// The kind the shape declares.
        expected: String,
        /// Rendering of the offending value.
        actual: String,
    },

    /// A nested bag appears on its own ancestor path. `variant` and `field`
    /// name the link that closes the cycle.
    #[error("{variant}.{field}: {bag} is its own ancestor")]
    CyclicStructure {
        variant: String,
        field: String,
        bag: BagId,
    },

    /// Nesting goes deeper than the configured bound.
    #[error("{variant}.{field}: nesting exceeds maximum depth {max_depth}")]
    MaxDepthExceeded {
        variant: String,
        field: String,
        max_depth: usize,
    },

    /// Expanding the payload would produce more nested values than the
    /// configured bound. Bags shared between branches count once per use.
    #[error("{variant}.{field}: expansion exceeds {max_nodes} nested values")]
    NodeLimitExceeded {
        variant: String,
        field: String,
        max_nodes: usize,
    },

    /// A field that became required in a later generation is absent from a
    /// payload written against an earlier one. `field` is the path from the
    /// root value.
    #[error("{variant}.{field}: required since {introduced_in}, absent from legacy payload")]
    SchemaGap {
        variant: String,
        field: String,
        introduced_in: Generation,
    },

    /// A nested value failed to decode.
    #[error("{variant}.{field}: {source}")]
    Nested {
        variant: String,
        field: String,
        source: Box<DecodeError>,
    },

    /// One or more elements of a nested list failed to decode. Every
    /// element is attempted; each failure is reported independently.
    #[error("{variant}.{field}: {} element(s) failed", .failures.len())]
    ListElements {
        variant: String,
        field: String,
        failures: Vec<ElementFailure>,
    },

    /// The payload could not be represented as field-bags at all.
    #[error("malformed payload: {0}")]
    Bag(#[from] BagError),
}

impl DecodeError {
    /// The innermost error, looking through [`Nested`](Self::Nested) and the
    /// first failure of [`ListElements`](Self::ListElements).
    pub fn root_cause(&self) -> &DecodeError {
        match self {
            Self::Nested { source, .. } => source.root_cause(),
            Self::ListElements { failures, .. } => match failures.first() {
                Some(first) => first.error.root_cause(),
                None => self,
            },
            other => other,
        }
    }

    /// Code of the root cause.
    pub fn code(&self) -> ErrorCode {
        match self.root_cause() {
            Self::UnknownVariant { .. } => ErrorCode::UnknownVariant,
            Self::AmbiguousVariant { .. } => ErrorCode::AmbiguousVariant,
            Self::MissingField { .. } => ErrorCode::MissingField,
            Self::TypeMismatch { .. } | Self::Bag(_) => ErrorCode::TypeMismatch,
            Self::CyclicStructure { .. } => ErrorCode::CyclicStructure,
            Self::MaxDepthExceeded { .. } => ErrorCode::MaxDepthExceeded,
            Self::NodeLimitExceeded { .. } => ErrorCode::NodeLimitExceeded,
            Self::SchemaGap { .. } => ErrorCode::SchemaGap,
            // An empty ListElements is never constructed.
            Self::Nested { .. } | Self::ListElements { .. } => ErrorCode::TypeMismatch,
        }
    }

    /// Flatten into one [`Violation`] per leaf failure, with field paths
    /// relative to the root value.
    pub fn violations(&self) -> Vec<Violation> {
        let mut out = Vec::new();
        self.collect(None, &mut out);
        out
    }

    fn collect(&self, prefix: Option<&str>, out: &mut Vec<Violation>) {
        let leaf = |code: ErrorCode, variant: &str, field: &str, detail: String| Violation {
            code,
            variant: variant.to_string(),
            field: Some(join_path(prefix, field)),
            detail,
        };
        // Link errors arrive wrapped by the parent that owns the link, so the
        // prefix already names it (`department[1]`).
        let link = |code: ErrorCode, variant: &str, field: &str, detail: String| Violation {
            code,
            variant: variant.to_string(),
            field: Some(prefix.map_or_else(|| field.to_string(), str::to_string)),
            detail,
        };

        match self {
            Self::Nested { field, source, .. } => {
                source.collect(Some(&join_path(prefix, field)), out);
            }
            Self::ListElements { field, failures, .. } => {
                let base = join_path(prefix, field);
                for failure in failures {
                    let path = format!("{base}[{}]", failure.index);
                    failure.error.collect(Some(&path), out);
                }
            }
            Self::UnknownVariant { tag, detail } => out.push(Violation {
                code: ErrorCode::UnknownVariant,
                variant: tag.clone(),
                field: prefix.map(str::to_string),
                detail: detail.clone(),
            }),
            Self::AmbiguousVariant { candidates } => out.push(Violation {
                code: ErrorCode::AmbiguousVariant,
                variant: class_list(candidates),
                field: prefix.map(str::to_string),
                detail: "explicit `type` required to disambiguate".to_string(),
            }),
            Self::MissingField { variant, field } => out.push(leaf(
                ErrorCode::MissingField,
                variant,
                field,
                "missing required field".to_string(),
            )),
            Self::TypeMismatch {
                variant,
                field,
                expected,
                actual,
            } => out.push(leaf(
                ErrorCode::TypeMismatch,
                variant,
                field,
                format!("expected {expected}, found {actual}"),
            )),
            Self::CyclicStructure {
                variant,
                field,
                bag,
            } => out.push(link(
                ErrorCode::CyclicStructure,
                variant,
                field,
                format!("{bag} is its own ancestor"),
            )),
            Self::MaxDepthExceeded {
                variant,
                field,
                max_depth,
            } => out.push(link(
                ErrorCode::MaxDepthExceeded,
                variant,
                field,
                format!("nesting exceeds maximum depth {max_depth}"),
            )),
            Self::NodeLimitExceeded {
                variant,
                field,
                max_nodes,
            } => out.push(link(
                ErrorCode::NodeLimitExceeded,
                variant,
                field,
                format!("expansion exceeds {max_nodes} nested values"),
            )),
            Self::SchemaGap {
                variant,
                field,
                introduced_in,
            } => out.push(leaf(
                ErrorCode::SchemaGap,
                variant,
                field,
                format!("required since {introduced_in}; payload predates the requirement"),
            )),
            Self::Bag(err) => out.push(Violation {
                code: ErrorCode::TypeMismatch,
                variant: String::new(),
                field: prefix.map(str::to_string),
                detail: err.to_string(),
            }),
        }
    }
}

fn join_path(prefix: Option<&str>, field: &str) -> String {
    match prefix {
        Some(p) if !p.is_empty() => format!("{p}.{field}"),
        _ => field.to_string(),
    }
}

fn class_list(classes: &[AtomicClass]) -> String {
    classes
        .iter()
        .map(AtomicClass::as_str)
        .collect::<Vec<_>>()
        .join("|")
}

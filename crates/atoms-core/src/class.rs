//! # Atomic Class — Single Source of Truth for Variant Tags
//!
//! Defines the `AtomicClass` enum: every type tag that appears in any
//! schema generation. Every `match` on `AtomicClass` must be exhaustive, so
//! adding a tag forces every consumer to handle it at compile time.
//!
//! A tag being listed here does not make it legal. The per-generation
//! registries in `atoms-schema` decide which tags exist only in v1
//! (`Reference`, `Number`) and which only in v2 (`Resource`, `Numeric`,
//! `MediaObject`, `EmailMessage`).

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Every atomic variant tag known to any generation.
///
/// Serialized exactly as written on the wire (`"NumericRange"`,
/// `"EducationalOccupationalCredential"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AtomicClass {
    Text,
    Website,
    Email,
    Flag,
    /// v1 spelling of a plain number.
    Number,
    /// v2 spelling of a plain number.
    Numeric,
    NumericRange,
    MonetaryAmount,
    DateTime,
    DateTimeRange,
    Person,
    Organization,
    Software,
    /// v1 name of an external entity reference.
    Reference,
    /// v2 name of an external entity reference.
    Resource,
    PostalAddress,
    EducationalOccupationalCredential,
    MediaObject,
    DigitalDocument,
    Action,
    EmailMessage,
}

/// The concrete variants that may fill an abstract `Agent` slot.
pub const AGENT_CLASSES: &[AtomicClass] = &[
    AtomicClass::Person,
    AtomicClass::Organization,
    AtomicClass::Software,
];

/// A tag string that names no known variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown atomic class: {0:?}")]
pub struct UnknownClassError(pub String);

impl AtomicClass {
    /// Every tag, in catalog order.
    pub fn all() -> &'static [AtomicClass] {
        &[
            Self::Text,
            Self::Website,
            Self::Email,
            Self::Flag,
            Self::Number,
            Self::Numeric,
            Self::NumericRange,
            Self::MonetaryAmount,
            Self::DateTime,
            Self::DateTimeRange,
            Self::Person,
            Self::Organization,
            Self::Software,
            Self::Reference,
            Self::Resource,
            Self::PostalAddress,
            Self::EducationalOccupationalCredential,
            Self::MediaObject,
            Self::DigitalDocument,
            Self::Action,
            Self::EmailMessage,
        ]
    }

    /// The wire tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Website => "Website",
            Self::Email => "Email",
            Self::Flag => "Flag",
            Self::Number => "Number",
            Self::Numeric => "Numeric",
            Self::NumericRange => "NumericRange",
            Self::MonetaryAmount => "MonetaryAmount",
            Self::DateTime => "DateTime",
            Self::DateTimeRange => "DateTimeRange",
            Self::Person => "Person",
            Self::Organization => "Organization",
            Self::Software => "Software",
            Self::Reference => "Reference",
            Self::Resource => "Resource",
            Self::PostalAddress => "PostalAddress",
            Self::EducationalOccupationalCredential => "EducationalOccupationalCredential",
            Self::MediaObject => "MediaObject",
            Self::DigitalDocument => "DigitalDocument",
            Self::Action => "Action",
            Self::EmailMessage => "EmailMessage",
        }
    }

    /// Whether this tag can fill an `Agent` slot.
    pub fn is_agent(&self) -> bool {
        AGENT_CLASSES.contains(self)
    }
}

impl std::fmt::Display for AtomicClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AtomicClass {
    type Err = UnknownClassError;

    /// Parse a wire tag. Case-sensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|class| class.as_str() == s)
            .ok_or_else(|| UnknownClassError(s.to_string()))
    }
}

//! # Schema Generations
//!
//! A generation is a versioned snapshot of the variant catalog. Two exist:
//! `v1`, the legacy vocabulary, and `v2`, the current one. Callers mark a
//! payload with a generation; an unmarked payload is assumed current.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// A generation marker that names no known generation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown schema generation: {0:?}")]
pub struct UnknownGenerationError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Generation {
    V1,
    V2,
}

impl Generation {
    /// The generation every payload is decoded into.
    pub const CURRENT: Generation = Generation::V2;

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V2 => "v2",
        }
    }

    pub fn is_current(&self) -> bool {
        *self == Self::CURRENT
    }
}

impl Default for Generation {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Generation {
    type Err = UnknownGenerationError;

    /// Accepts `v1`/`v2`, case-insensitively, with or without the `v`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v1" | "1" => Ok(Self::V1),
            "v2" | "2" => Ok(Self::V2),
            _ => Err(UnknownGenerationError(s.to_string())),
        }
    }
}

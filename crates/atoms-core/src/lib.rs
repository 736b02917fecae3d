//! # atoms-core — Foundational Types for the Atomic Value Catalog
//!
//! This crate is the leaf of the workspace. It defines the vocabulary that
//! every other crate speaks: the loosely-typed field-bag a payload arrives
//! as, the closed set of variant tags, the schema generations, and the
//! structured error codes reported back to callers.
//!
//! ## Key Design Principles
//!
//! 1. **Bags live in an arena.** Nested field-bags are referenced by
//!    [`BagId`], never owned inline. A bag's identity is its id, which is
//!    what makes cycle detection during expansion deterministic.
//!
//! 2. **Single `AtomicClass` enum.** One definition covering every tag of
//!    every generation. Which tags are legal in which generation is the
//!    registry's concern (`atoms-schema`), not this enum's.
//!
//! 3. **Errors are values.** Every failure carries the variant, the field
//!    and the offending value. Nothing is silently defaulted.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `atoms-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod bag;
pub mod class;
pub mod error;
pub mod generation;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use bag::{BagArena, BagError, BagId, FieldBag, FieldValue, TYPE_FIELD};
pub use class::{AtomicClass, UnknownClassError, AGENT_CLASSES};
pub use error::{DecodeError, ElementFailure, ErrorCode, Violation};
pub use generation::{Generation, UnknownGenerationError};
pub use temporal::{check_timestamp, is_timestamp, TimestampError, TIMESTAMP_PATTERN};

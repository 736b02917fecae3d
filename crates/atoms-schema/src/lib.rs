//! # atoms-schema — Variant Registries
//!
//! One read-only [`Registry`] per schema generation, mapping each
//! [`AtomicClass`](atoms_core::AtomicClass) to its [`VariantShape`]: the
//! ordered field descriptors the decoder checks a field-bag against.
//!
//! ## Design
//!
//! - Shapes are `const` literal tables. The per-generation index is built
//!   on first use behind a `OnceLock` and never changes afterwards.
//! - The registries of different generations are never merged. The v1→v2
//!   translation lives in `atoms-codec`'s reconciler.
//! - [`Registry::to_json_schema`] and [`Registry::fingerprint`] derive the
//!   documents a schema mirror is generated from.
//!
//! ## Crate Policy
//!
//! - Depends only on `atoms-core` internally.
//! - No `unsafe` code.

pub mod export;
pub mod registry;
pub mod shape;

pub use export::JSON_SCHEMA_DIALECT;
pub use registry::{Registry, RegistryError, ACTION_STATUS_ORDINALS};
pub use shape::{DefaultValue, EmptyList, FieldDescriptor, FieldKind, NestedTarget, VariantShape};

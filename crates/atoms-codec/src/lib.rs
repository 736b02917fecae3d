//! # atoms-codec — Field-Bag Decoding for the Atomic Value Catalog
//!
//! Turns loosely-typed field-bags into typed [`Atom`] values and back.
//!
//! ## Stages
//!
//! 1. **Decoder** ([`decoder`]): selects the variant of one bag (explicit
//!    `type` or inference) and checks its fields against the shape.
//! 2. **Expander** ([`expander`]): recurses into nested bags, rejecting
//!    cycles and nesting beyond the depth bound.
//! 3. **Validator** ([`validator`]): value-level checks over the whole
//!    tree, collecting every violation.
//! 4. **Reconciler** ([`reconciler`]): rewrites legacy-generation payloads
//!    into the current vocabulary before decoding.
//!
//! [`Pipeline`] runs them in order under a [`PipelineConfig`].
//!
//! ## Crate Policy
//!
//! - All operations are pure and synchronous; input arenas are never
//!   mutated.
//! - No `unsafe` code.
//! - No `.unwrap()` outside tests.

pub mod config;
pub mod decoder;
pub mod expander;
pub mod model;
pub mod pipeline;
pub mod reconciler;
pub mod validator;

pub use config::{ConfigError, ObjectPolicy, PipelineConfig};
pub use decoder::{Decoder, Record, Slot};
pub use expander::{Expander, Resolved, DEFAULT_MAX_DEPTH, DEFAULT_MAX_NODES};
pub use model::{
    Action, ActionStatus, Agent, Atom, DateTime, DateTimeRange, DigitalDocument,
    EducationalOccupationalCredential, Email, EmailMessage, Flag, MediaObject, MonetaryAmount,
    Numeric, NumericRange, Organization, Person, PostalAddress, Resource, Software, Text,
    UnknownActionStatus, Website,
};
pub use pipeline::{Decoded, Pipeline, Rejection};
pub use reconciler::{
    FieldRename, Reconciled, Reconciler, RenameTable, TagRename, TightenedField, ValueRewrite,
    PLACEHOLDER_RESOURCE_ID, V1_TO_V2,
};
pub use validator::{validate, Report, Warning, WarningCode};

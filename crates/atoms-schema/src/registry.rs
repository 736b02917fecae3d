//! # Variant Registry
//!
//! The closed catalog of variants for each schema generation, with the
//! shape of every variant. Registries are literal tables indexed once on
//! first use and never modified afterwards; there is no mutation API.
//!
//! ## Generations
//!
//! - **v1** is the legacy vocabulary: `Reference` with `category1..4`,
//!   plain numbers tagged `Number`, agents identified by a mandatory `id`,
//!   and `Action` without an `object` whose `actionStatus` is an ordinal.
//! - **v2** is the current vocabulary: `Reference` became `Resource` with
//!   `categoryLvl1..4`, `Number` became `Numeric`, agents need only a
//!   `name`, `MediaObject` and `EmailMessage` were added, and
//!   `Action.object` is required. `actionStatus` is written by name.
//!
//! The two are kept as separate tables. Translating between them is the
//! reconciler's job (`atoms-codec`); merging them here would hide the
//! `Action.object` tightening.
//!
//! ## Thread Safety
//!
//! `&'static Registry` is `Send + Sync`. The index is built inside a
//! `OnceLock`, so concurrent first use is safe and later reads take no lock.

use std::collections::HashMap;
use std::sync::OnceLock;

use atoms_core::{AtomicClass, DecodeError, Generation, AGENT_CLASSES};
use thiserror::Error;

use crate::shape::{
    DefaultValue, EmptyList, FieldDescriptor, FieldKind, NestedTarget, VariantShape,
};

/// Lookup failure against a registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The tag is not part of the generation's closed set.
    #[error("variant {tag:?} is not part of the {generation} catalog")]
    UnknownVariant { tag: String, generation: Generation },
}

impl From<RegistryError> for DecodeError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownVariant { tag, generation } => DecodeError::UnknownVariant {
                tag,
                detail: format!("not a {generation} variant"),
            },
        }
    }
}

/// The variant catalog of one generation.
#[derive(Debug)]
pub struct Registry {
    generation: Generation,
    shapes: &'static [VariantShape],
    index: HashMap<AtomicClass, usize>,
}

static V1_REGISTRY: OnceLock<Registry> = OnceLock::new();
static V2_REGISTRY: OnceLock<Registry> = OnceLock::new();

impl Registry {
    /// The registry of `generation`, initialized on first use.
    pub fn for_generation(generation: Generation) -> &'static Registry {
        match generation {
            Generation::V1 => V1_REGISTRY.get_or_init(|| Registry::build(generation, V1_SHAPES)),
            Generation::V2 => V2_REGISTRY.get_or_init(|| Registry::build(generation, V2_SHAPES)),
        }
    }

    /// The registry every payload is decoded against.
    pub fn current() -> &'static Registry {
        Self::for_generation(Generation::CURRENT)
    }

    fn build(generation: Generation, shapes: &'static [VariantShape]) -> Self {
        let index = shapes
            .iter()
            .enumerate()
            .map(|(i, shape)| (shape.class, i))
            .collect();
        Self {
            generation,
            shapes,
            index,
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Shape of `class`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownVariant`] when `class` does not exist in this
    /// generation (e.g. `Reference` in v2).
    pub fn shape_of(&self, class: AtomicClass) -> Result<&'static VariantShape, RegistryError> {
        let shapes = self.shapes;
        self.index
            .get(&class)
            .map(|&i| &shapes[i])
            .ok_or_else(|| RegistryError::UnknownVariant {
                tag: class.as_str().to_string(),
                generation: self.generation,
            })
    }

    /// Shape of the variant with wire tag `tag`.
    pub fn shape_named(&self, tag: &str) -> Result<&'static VariantShape, RegistryError> {
        let class = tag
            .parse::<AtomicClass>()
            .map_err(|_| RegistryError::UnknownVariant {
                tag: tag.to_string(),
                generation: self.generation,
            })?;
        self.shape_of(class)
    }

    pub fn contains(&self, class: AtomicClass) -> bool {
        self.index.contains_key(&class)
    }

    /// Every tag in declaration order. Each call starts a fresh iteration.
    pub fn all_tags(&self) -> impl Iterator<Item = AtomicClass> + 'static {
        self.shapes.iter().map(|shape| shape.class)
    }

    /// Every shape in declaration order.
    pub fn shapes(&self) -> &'static [VariantShape] {
        self.shapes
    }
}

// ── Shape tables ────────────────────────────────────────────────────

use FieldKind::{Boolean, Number, String as Str, StringList, Timestamp};

const fn req(name: &'static str, kind: FieldKind) -> FieldDescriptor {
    FieldDescriptor::required(name, kind)
}

const fn opt(name: &'static str, kind: FieldKind) -> FieldDescriptor {
    FieldDescriptor::optional(name, kind)
}

const AGENT: NestedTarget = NestedTarget::OneOf(AGENT_CLASSES);
const ORGANIZATION: NestedTarget = NestedTarget::Fixed(AtomicClass::Organization);
const ACTION: NestedTarget = NestedTarget::Fixed(AtomicClass::Action);
const RESOURCE: NestedTarget = NestedTarget::Fixed(AtomicClass::Resource);
const MEDIA_OBJECT: NestedTarget = NestedTarget::Fixed(AtomicClass::MediaObject);

// Variants whose shape did not change between generations.

const TEXT: VariantShape = VariantShape {
    class: AtomicClass::Text,
    fields: &[req("text", Str)],
};

const WEBSITE: VariantShape = VariantShape {
    class: AtomicClass::Website,
    fields: &[req("url", Str)],
};

const EMAIL: VariantShape = VariantShape {
    class: AtomicClass::Email,
    fields: &[req("email", Str)],
};

const FLAG: VariantShape = VariantShape {
    class: AtomicClass::Flag,
    fields: &[req("flag", Boolean)],
};

const NUMERIC_RANGE: VariantShape = VariantShape {
    class: AtomicClass::NumericRange,
    fields: &[req("fromValue", Number), req("toValue", Number)],
};

const MONETARY_AMOUNT: VariantShape = VariantShape {
    class: AtomicClass::MonetaryAmount,
    fields: &[req("currency", Str), req("value", Number)],
};

const DATE_TIME: VariantShape = VariantShape {
    class: AtomicClass::DateTime,
    fields: &[req("dateTime", Timestamp)],
};

const DATE_TIME_RANGE: VariantShape = VariantShape {
    class: AtomicClass::DateTimeRange,
    fields: &[req("fromDateTime", Timestamp), req("toDateTime", Timestamp)],
};

const POSTAL_ADDRESS: VariantShape = VariantShape {
    class: AtomicClass::PostalAddress,
    fields: &[
        req("addressCountry", Str),
        req("addressLocality", Str),
        opt("addressRegion", Str),
        opt("postOfficeBoxNumber", Str),
        opt("postalCode", Str),
        req("streetAddress", Str),
    ],
};

const CREDENTIAL: VariantShape = VariantShape {
    class: AtomicClass::EducationalOccupationalCredential,
    fields: &[
        req("name", Str),
        opt("alternateName", Str),
        opt("description", Str),
        req("dateCreated", Timestamp),
        opt("expires", Timestamp),
        opt("recognizedBy", FieldKind::Nested(ORGANIZATION)),
        opt("credentialCategory", Str),
    ],
};

// ── v1 ──────────────────────────────────────────────────────────────

const V1_PERSON: VariantShape = VariantShape {
    class: AtomicClass::Person,
    fields: &[
        req("id", Str),
        req("name", Str),
        opt("nickname", Str),
        opt("email", Str),
        opt("jobTitle", Str),
        opt("telephone", Str),
        opt("givenName", Str),
    ],
};

const V1_ORGANIZATION: VariantShape = VariantShape {
    class: AtomicClass::Organization,
    fields: &[
        req("id", Str),
        req("name", Str),
        opt("nickname", Str),
        opt("email", Str),
        opt("department", FieldKind::NestedList(ORGANIZATION)),
    ],
};

const V1_SOFTWARE: VariantShape = VariantShape {
    class: AtomicClass::Software,
    fields: &[
        req("id", Str),
        req("name", Str),
        opt("nickname", Str),
        opt("email", Str),
    ],
};

const V1_REFERENCE: VariantShape = VariantShape {
    class: AtomicClass::Reference,
    fields: &[
        req("id", Str),
        req("name", Str),
        req("category1", Str),
        opt("category2", Str),
        opt("category3", Str),
        opt("category4", Str),
        opt("source", Str),
    ],
};

const V1_DIGITAL_DOCUMENT: VariantShape = VariantShape {
    class: AtomicClass::DigitalDocument,
    fields: &[
        opt("creator", FieldKind::Nested(AGENT)),
        req("name", Str),
        opt("description", Str),
        opt("dateCreated", Timestamp),
        opt("dateModified", Timestamp),
        opt("text", Str),
        opt("keywords", StringList),
        opt("potentialAction", FieldKind::NestedList(ACTION)),
    ],
};

/// Status names in ordinal order, as v1 encodes `actionStatus`.
pub const ACTION_STATUS_ORDINALS: &[&str] = &[
    "ActiveActionStatus",
    "CompletedActionStatus",
    "FailedActionStatus",
    "PotentialActionStatus",
];

const V1_NUMBER: VariantShape = VariantShape {
    class: AtomicClass::Number,
    fields: &[req("value", Number)],
};

const V1_ACTION: VariantShape = VariantShape {
    class: AtomicClass::Action,
    fields: &[
        req("actionStatus", FieldKind::Ordinal(ACTION_STATUS_ORDINALS)),
        req("actor", FieldKind::Nested(AGENT)),
        req("name", Str),
        opt("description", Str),
        opt("error", Str),
        opt("startTime", Timestamp),
        opt("endTime", Timestamp),
        opt("participant", FieldKind::NestedList(AGENT)),
    ],
};

static V1_SHAPES: &[VariantShape] = &[
    TEXT,
    WEBSITE,
    EMAIL,
    FLAG,
    V1_NUMBER,
    NUMERIC_RANGE,
    MONETARY_AMOUNT,
    DATE_TIME,
    DATE_TIME_RANGE,
    V1_PERSON,
    V1_ORGANIZATION,
    V1_SOFTWARE,
    V1_REFERENCE,
    POSTAL_ADDRESS,
    CREDENTIAL,
    V1_DIGITAL_DOCUMENT,
    V1_ACTION,
];

// ── v2 ──────────────────────────────────────────────────────────────

const NUMERIC: VariantShape = VariantShape {
    class: AtomicClass::Numeric,
    fields: &[req("value", Number)],
};

const PERSON: VariantShape = VariantShape {
    class: AtomicClass::Person,
    fields: &[
        opt("id", Str),
        req("name", Str),
        opt("nickname", Str),
        opt("email", Str),
        opt("jobTitle", Str),
        opt("telephone", Str),
        opt("givenName", Str),
    ],
};

const ORGANIZATION_SHAPE: VariantShape = VariantShape {
    class: AtomicClass::Organization,
    fields: &[
        opt("id", Str),
        req("name", Str),
        opt("nickname", Str),
        opt("email", Str),
        opt("department", FieldKind::NestedList(ORGANIZATION)),
    ],
};

const SOFTWARE: VariantShape = VariantShape {
    class: AtomicClass::Software,
    fields: &[
        opt("id", Str),
        req("name", Str),
        opt("nickname", Str),
        opt("email", Str),
    ],
};

const RESOURCE_SHAPE: VariantShape = VariantShape {
    class: AtomicClass::Resource,
    fields: &[
        req("id", Str),
        req("name", Str),
        req("categoryLvl1", Str),
        opt("categoryLvl2", Str),
        opt("categoryLvl3", Str),
        opt("categoryLvl4", Str),
        opt("source", Str),
    ],
};

const MEDIA_OBJECT_SHAPE: VariantShape = VariantShape {
    class: AtomicClass::MediaObject,
    fields: &[
        req("name", Str),
        req("contentUrl", Str),
        opt("encodingFormat", Str),
        opt("contentSize", Number),
        opt("uploadDate", Timestamp),
        opt("author", FieldKind::Nested(AGENT)),
    ],
};

const DIGITAL_DOCUMENT: VariantShape = VariantShape {
    class: AtomicClass::DigitalDocument,
    fields: &[
        opt("creator", FieldKind::Nested(AGENT)),
        req("name", Str),
        opt("description", Str),
        opt("dateCreated", Timestamp),
        opt("dateModified", Timestamp),
        opt("text", Str),
        FieldDescriptor::defaulted("keywords", StringList, DefaultValue::EmptyList(EmptyList)),
        opt("potentialAction", FieldKind::NestedList(ACTION)),
        opt("associatedMedia", FieldKind::NestedList(MEDIA_OBJECT)),
    ],
};

const ACTION_SHAPE: VariantShape = VariantShape {
    class: AtomicClass::Action,
    fields: &[
        req("actionStatus", Str),
        req("actor", FieldKind::Nested(AGENT)),
        req("name", Str),
        opt("description", Str),
        opt("error", Str),
        opt("startTime", Timestamp),
        opt("endTime", Timestamp),
        opt("participant", FieldKind::NestedList(AGENT)),
        req("object", FieldKind::Nested(RESOURCE)),
    ],
};

const EMAIL_MESSAGE: VariantShape = VariantShape {
    class: AtomicClass::EmailMessage,
    fields: &[
        opt("sender", FieldKind::Nested(AGENT)),
        req("toRecipient", FieldKind::NestedList(AGENT)),
        opt("ccRecipient", FieldKind::NestedList(AGENT)),
        opt("bccRecipient", FieldKind::NestedList(AGENT)),
        opt("subject", Str),
        opt("text", Str),
        opt("dateSent", Timestamp),
        opt("messageAttachment", FieldKind::NestedList(MEDIA_OBJECT)),
    ],
};

static V2_SHAPES: &[VariantShape] = &[
    TEXT,
    WEBSITE,
    EMAIL,
    FLAG,
    NUMERIC,
    NUMERIC_RANGE,
    MONETARY_AMOUNT,
    DATE_TIME,
    DATE_TIME_RANGE,
    PERSON,
    ORGANIZATION_SHAPE,
    SOFTWARE,
    RESOURCE_SHAPE,
    POSTAL_ADDRESS,
    CREDENTIAL,
    MEDIA_OBJECT_SHAPE,
    DIGITAL_DOCUMENT,
    ACTION_SHAPE,
    EMAIL_MESSAGE,
];

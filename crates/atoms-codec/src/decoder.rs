//! # Decoder
//!
//! Turns one field-bag into a [`Record`] of the selected variant: the
//! shape's fields, checked for presence and kind, with nested bags left as
//! [`BagId`]s for the expander.
//!
//! ## Variant Selection
//!
//! 1. A string `type` entry names the variant. It must exist in the
//!    registry's generation and, inside a nested slot, be admitted by it.
//! 2. A `Fixed` slot forces its variant when `type` is absent.
//! 3. Otherwise the variant is inferred: every candidate (all tags in
//!    declaration order, or the slot's members) whose required fields are
//!    all present is a match. Exactly one match is selected.
//!
//! Decoding is pure. Extra bag entries are ignored.

use atoms_core::{AtomicClass, BagId, DecodeError, FieldBag, FieldValue};
use atoms_schema::{
    DefaultValue, FieldDescriptor, FieldKind, NestedTarget, Registry, VariantShape,
};

/// One decoded field, before nested bags are expanded.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    String(String),
    Number(f64),
    Bool(bool),
    StringList(Vec<String>),
    Nested { bag: BagId, target: NestedTarget },
    NestedList { bags: Vec<BagId>, target: NestedTarget },
}

/// The fields of one variant in shape order. Absent optionals without a
/// default do not appear.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<V> {
    pub class: AtomicClass,
    pub fields: Vec<(&'static str, V)>,
}

impl<V> Record<V> {
    pub fn get(&self, name: &str) -> Option<&V> {
        self.fields.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }
}

/// Decoder bound to one generation's registry.
#[derive(Debug, Clone, Copy)]
pub struct Decoder {
    registry: &'static Registry,
}

impl Decoder {
    pub fn new(registry: &'static Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'static Registry {
        self.registry
    }

    /// Select the variant `bag` decodes as.
    ///
    /// `target` is the slot the bag fills, or `None` at the root.
    pub fn select(
        &self,
        bag: &FieldBag,
        target: Option<NestedTarget>,
    ) -> Result<&'static VariantShape, DecodeError> {
        match bag.tag() {
            Some(FieldValue::String(tag)) => {
                let shape = self.registry.shape_named(tag)?;
                match target {
                    Some(target) if !target.admits(shape.class) => {
                        Err(DecodeError::TypeMismatch {
                            variant: tag.clone(),
                            field: atoms_core::TYPE_FIELD.to_string(),
                            expected: target.describe(),
                            actual: format!("string {tag:?}"),
                        })
                    }
                    _ => Ok(shape),
                }
            }
            Some(other) => Err(DecodeError::TypeMismatch {
                variant: target.map_or_else(|| "atom".to_string(), |t| t.describe()),
                field: atoms_core::TYPE_FIELD.to_string(),
                expected: "string".to_string(),
                actual: other.describe(),
            }),
            None => match target {
                Some(NestedTarget::Fixed(class)) => Ok(self.registry.shape_of(class)?),
                Some(NestedTarget::OneOf(members)) => self.infer(bag, members.iter().copied()),
                None => self.infer(bag, self.registry.all_tags()),
            },
        }
    }

    /// Infer the variant of an untagged bag among `candidates`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::UnknownVariant`] with an empty tag when no candidate
    /// matches, [`DecodeError::AmbiguousVariant`] when several do.
    pub fn infer(
        &self,
        bag: &FieldBag,
        candidates: impl IntoIterator<Item = AtomicClass>,
    ) -> Result<&'static VariantShape, DecodeError> {
        let matches: Vec<&'static VariantShape> = candidates
            .into_iter()
            .filter_map(|class| self.registry.shape_of(class).ok())
            .filter(|shape| shape.required_fields().all(|f| bag.contains(f.name)))
            .collect();

        match matches.as_slice() {
            [] => Err(DecodeError::UnknownVariant {
                tag: String::new(),
                detail: "no `type` given and no variant has all its required fields present"
                    .to_string(),
            }),
            [shape] => {
                tracing::debug!(variant = %shape.class, "inferred variant of untagged bag");
                Ok(shape)
            }
            _ => Err(DecodeError::AmbiguousVariant {
                candidates: matches.iter().map(|s| s.class).collect(),
            }),
        }
    }

    /// Select the variant and decode its fields.
    pub fn decode(
        &self,
        bag: &FieldBag,
        target: Option<NestedTarget>,
    ) -> Result<Record<Slot>, DecodeError> {
        let shape = self.select(bag, target)?;
        decode_fields(bag, shape)
    }
}

/// Check `bag` against `shape`, field by field, in shape order.
///
/// # Errors
///
/// The first [`DecodeError::MissingField`] or [`DecodeError::TypeMismatch`]
/// in shape order.
pub fn decode_fields(bag: &FieldBag, shape: &VariantShape) -> Result<Record<Slot>, DecodeError> {
    let mut fields = Vec::with_capacity(shape.fields.len());
    for descriptor in shape.fields {
        match bag.get(descriptor.name) {
            Some(value) => fields.push((descriptor.name, decode_value(shape, descriptor, value)?)),
            None if descriptor.required => {
                return Err(DecodeError::MissingField {
                    variant: shape.class.to_string(),
                    field: descriptor.name.to_string(),
                })
            }
            None => {
                if let Some(default) = &descriptor.default {
                    fields.push((descriptor.name, default_slot(descriptor.kind, default)));
                }
            }
        }
    }
    Ok(Record {
        class: shape.class,
        fields,
    })
}

fn decode_value(
    shape: &VariantShape,
    descriptor: &FieldDescriptor,
    value: &FieldValue,
) -> Result<Slot, DecodeError> {
    let mismatch = |actual: String| DecodeError::TypeMismatch {
        variant: shape.class.to_string(),
        field: descriptor.name.to_string(),
        expected: descriptor.kind.describe(),
        actual,
    };

    match (descriptor.kind, value) {
        (FieldKind::String | FieldKind::Timestamp, FieldValue::String(s)) => {
            Ok(Slot::String(s.clone()))
        }
        (FieldKind::Number, FieldValue::Number(n)) => Ok(Slot::Number(*n)),
        (FieldKind::Ordinal(_), FieldValue::Number(n)) => match descriptor.kind.ordinal_name(*n) {
            Some(_) => Ok(Slot::Number(*n)),
            None => Err(mismatch(value.describe())),
        },
        (FieldKind::Boolean, FieldValue::Bool(b)) => Ok(Slot::Bool(*b)),
        (FieldKind::StringList, FieldValue::List(items)) => {
            let mut strings = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                match item {
                    FieldValue::String(s) => strings.push(s.clone()),
                    other => return Err(mismatch(format!("{} at [{i}]", other.describe()))),
                }
            }
            Ok(Slot::StringList(strings))
        }
        (FieldKind::Nested(target), FieldValue::Bag(bag)) => Ok(Slot::Nested {
            bag: *bag,
            target,
        }),
        (FieldKind::NestedList(target), FieldValue::List(items)) => {
            let mut bags = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                match item {
                    FieldValue::Bag(bag) => bags.push(*bag),
                    other => return Err(mismatch(format!("{} at [{i}]", other.describe()))),
                }
            }
            Ok(Slot::NestedList { bags, target })
        }
        (_, other) => Err(mismatch(other.describe())),
    }
}

fn default_slot(kind: FieldKind, default: &DefaultValue) -> Slot {
    match default {
        DefaultValue::String(s) => Slot::String((*s).to_string()),
        DefaultValue::Number(n) => Slot::Number(*n),
        DefaultValue::Boolean(b) => Slot::Bool(*b),
        DefaultValue::EmptyList(_) => match kind {
            FieldKind::NestedList(target) => Slot::NestedList {
                bags: Vec::new(),
                target,
            },
            _ => Slot::StringList(Vec::new()),
        },
    }
}

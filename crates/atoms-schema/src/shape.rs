//! # Variant Shapes
//!
//! A shape is the ordered list of field descriptors one variant declares.
//! Shapes are plain `const` data so the registries can be written as
//! literal tables.

use atoms_core::AtomicClass;
use serde::Serialize;

/// Which variant a nested field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NestedTarget {
    /// Structurally fixed: `department` is always an `Organization`.
    Fixed(AtomicClass),
    /// Abstract slot: the nested bag's own `type` picks one of these.
    OneOf(&'static [AtomicClass]),
}

impl NestedTarget {
    /// Whether `class` may fill this slot.
    pub fn admits(&self, class: AtomicClass) -> bool {
        match self {
            Self::Fixed(fixed) => *fixed == class,
            Self::OneOf(members) => members.contains(&class),
        }
    }

    /// Every class that may fill this slot.
    pub fn members(&self) -> &[AtomicClass] {
        match self {
            Self::Fixed(fixed) => std::slice::from_ref(fixed),
            Self::OneOf(members) => members,
        }
    }

    /// Human-readable form used in type-mismatch errors.
    pub fn describe(&self) -> String {
        self.members()
            .iter()
            .map(AtomicClass::as_str)
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

/// Wire kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "target", rename_all = "camelCase")]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    /// A string in the `[-]CCYY-MM-DDThh:mm:ss[Z|±hh:mm]` profile.
    Timestamp,
    /// An ordered list of strings (`keywords`).
    StringList,
    /// A non-negative integer indexing the listed names.
    Ordinal(&'static [&'static str]),
    Nested(NestedTarget),
    NestedList(NestedTarget),
}

impl FieldKind {
    /// Name used as the `expected` side of type mismatches.
    pub fn describe(&self) -> String {
        match self {
            Self::String => "string".to_string(),
            Self::Number => "number".to_string(),
            Self::Boolean => "boolean".to_string(),
            Self::Timestamp => "timestamp string".to_string(),
            Self::StringList => "list of strings".to_string(),
            Self::Ordinal(names) => format!("ordinal 0..{}", names.len()),
            Self::Nested(target) => format!("field-bag ({})", target.describe()),
            Self::NestedList(target) => format!("list of field-bags ({})", target.describe()),
        }
    }

    /// The name an ordinal value stands for, if `value` is a valid index.
    pub fn ordinal_name(&self, value: f64) -> Option<&'static str> {
        match self {
            Self::Ordinal(names) if value.fract() == 0.0 && value >= 0.0 => {
                names.get(value as usize).copied()
            }
            _ => None,
        }
    }

    /// The nested target, for nested kinds.
    pub fn target(&self) -> Option<NestedTarget> {
        match self {
            Self::Nested(target) | Self::NestedList(target) => Some(*target),
            _ => None,
        }
    }
}

/// Value applied verbatim when an optional field is absent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DefaultValue {
    String(&'static str),
    Number(f64),
    Boolean(bool),
    EmptyList(EmptyList),
}

/// Marker serialized as `[]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyList;

impl Serialize for EmptyList {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeSeq;
        serializer.serialize_seq(Some(0))?.end()
    }
}

/// One field of a variant shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldDescriptor {
    pub name: &'static str,
    #[serde(flatten)]
    pub kind: FieldKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
}

impl FieldDescriptor {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            default: None,
        }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            default: None,
        }
    }

    /// An optional field that takes `default` when absent.
    pub const fn defaulted(name: &'static str, kind: FieldKind, default: DefaultValue) -> Self {
        Self {
            name,
            kind,
            required: false,
            default: Some(default),
        }
    }
}

/// The full shape of one variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VariantShape {
    #[serde(rename = "type")]
    pub class: AtomicClass,
    pub fields: &'static [FieldDescriptor],
}

impl VariantShape {
    pub fn field(&self, name: &str) -> Option<&'static FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &'static FieldDescriptor> {
        self.fields.iter().filter(|f| f.required)
    }

    /// Fields holding nested bags.
    pub fn nested_fields(&self) -> impl Iterator<Item = &'static FieldDescriptor> {
        self.fields.iter().filter(|f| f.kind.target().is_some())
    }
}

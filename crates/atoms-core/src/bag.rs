//! # Field-Bags
//!
//! A field-bag is the flattened, loosely-typed record a payload arrives as:
//! a map from field name to string, number, boolean, nested bag, or list.
//! It carries the superset of every variant's fields; the decoder picks out
//! the ones the selected variant declares.
//!
//! ## Arena Representation
//!
//! All bags of one payload live in a [`BagArena`]. A nested bag is stored
//! as [`FieldValue::Bag`] holding the child's [`BagId`]. Bags built from a
//! JSON document always form a tree, but bags linked programmatically with
//! [`BagArena::set`] may share children or form cycles. The expander
//! tracks `BagId`s on the current path to reject the latter.
//!
//! `null` is treated as absence: JSON `null` members are not stored.
//!
//! JSON ingestion walks the document with a heap-allocated stack of open
//! objects and lists, so document depth is bounded by memory rather than
//! by the thread's call stack.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Name of the field that carries a bag's variant tag.
pub const TYPE_FIELD: &str = "type";

/// Identity of a bag within its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BagId(usize);

impl BagId {
    /// Position of the bag in its arena.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for BagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bag#{}", self.0)
    }
}

/// A single loosely-typed bag entry.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Number(f64),
    Bool(bool),
    /// Reference to a nested bag in the same arena.
    Bag(BagId),
    List(Vec<FieldValue>),
}

impl FieldValue {
    /// Wire-level kind name, used as the `actual` side of type mismatches.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Number(_) => "number",
            Self::Bool(_) => "boolean",
            Self::Bag(_) => "field-bag",
            Self::List(_) => "list",
        }
    }

    /// Short rendering of the value for error details.
    ///
    /// Nested bags render as their id; lists render their length.
    pub fn describe(&self) -> String {
        match self {
            Self::String(s) => format!("string {s:?}"),
            Self::Number(n) => format!("number {n}"),
            Self::Bool(b) => format!("boolean {b}"),
            Self::Bag(id) => format!("field-bag {id}"),
            Self::List(items) => format!("list of {} item(s)", items.len()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    fn visit_bag_ids(&self, out: &mut Vec<BagId>) {
        match self {
            Self::Bag(id) => out.push(*id),
            Self::List(items) => items.iter().for_each(|item| item.visit_bag_ids(out)),
            _ => {}
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<BagId> for FieldValue {
    fn from(id: BagId) -> Self {
        Self::Bag(id)
    }
}

impl From<Vec<FieldValue>> for FieldValue {
    fn from(items: Vec<FieldValue>) -> Self {
        Self::List(items)
    }
}

/// One flattened record: field name to loosely-typed value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldBag {
    fields: BTreeMap<String, FieldValue>,
}

impl FieldBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    /// The raw `type` entry, if any.
    pub fn tag(&self) -> Option<&FieldValue> {
        self.fields.get(TYPE_FIELD)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Ids of every bag referenced directly by this bag's entries.
    pub fn child_ids(&self) -> Vec<BagId> {
        let mut out = Vec::new();
        for value in self.fields.values() {
            value.visit_bag_ids(&mut out);
        }
        out
    }
}

/// Errors raised while building or addressing an arena.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BagError {
    /// A position that must hold a field-bag held something else.
    #[error("expected a field-bag at '{path}', found {found}")]
    NotAnObject {
        /// JSON path of the offending value.
        path: String,
        /// Kind of value found instead.
        found: String,
    },

    /// A JSON number that cannot be represented as `f64`.
    #[error("unsupported number at '{path}'")]
    UnsupportedNumber {
        /// JSON path of the offending value.
        path: String,
    },

    /// A list element was `null`; absence is only meaningful for fields.
    #[error("null list element at '{path}'")]
    NullListElement {
        /// JSON path of the offending element.
        path: String,
    },

    /// A `BagId` that does not belong to this arena.
    #[error("{0} does not exist in this arena")]
    Dangling(BagId),
}

/// Owner of every bag in one payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BagArena {
    bags: Vec<FieldBag>,
}

impl BagArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an arena from a JSON document whose root is an object.
    ///
    /// # Errors
    ///
    /// Returns [`BagError::NotAnObject`] when the root is not an object,
    /// and the other [`BagError`] variants for values that have no
    /// field-bag representation.
    pub fn from_json(value: &Value) -> Result<(Self, BagId), BagError> {
        let mut arena = Self::new();
        let root = arena.insert_json(value)?;
        Ok((arena, root))
    }

    /// Add a JSON object (and everything nested in it) to this arena.
    ///
    /// The document is walked with an explicit stack, so arbitrarily deep
    /// documents built in code cannot exhaust the call stack. Parents are
    /// allocated before their children and get lower ids.
    pub fn insert_json(&mut self, value: &Value) -> Result<BagId, BagError> {
        let Value::Object(members) = value else {
            return Err(BagError::NotAnObject {
                path: "$".to_string(),
                found: json_kind(value).to_string(),
            });
        };
        let root = self.alloc(FieldBag::new());
        let mut stack = vec![Frame::object(root, members, "$".to_string())];

        while let Some(top) = stack.last_mut() {
            let Some((child, segment)) = top.next_child() else {
                let finished = match stack.pop() {
                    Some(Frame::Object { id, bag, .. }) => {
                        self.bags[id.0] = bag;
                        FieldValue::Bag(id)
                    }
                    Some(Frame::List { converted, .. }) => FieldValue::List(converted),
                    None => break,
                };
                if let Some(parent) = stack.last_mut() {
                    parent.accept(finished);
                }
                continue;
            };

            match child {
                Value::Object(members) => {
                    let id = self.alloc(FieldBag::new());
                    stack.push(Frame::object(id, members, segment));
                }
                Value::Array(items) => stack.push(Frame::list(items, segment)),
                Value::String(s) => top.accept(FieldValue::String(s.clone())),
                Value::Bool(b) => top.accept(FieldValue::Bool(*b)),
                Value::Number(n) => match n.as_f64() {
                    Some(n) => top.accept(FieldValue::Number(n)),
                    None => {
                        return Err(BagError::UnsupportedNumber {
                            path: path_of(&stack, &segment),
                        })
                    }
                },
                // Object members that are null are skipped by `next_child`.
                Value::Null => {
                    return Err(BagError::NullListElement {
                        path: path_of(&stack, &segment),
                    })
                }
            }
        }
        Ok(root)
    }

    /// Store a bag and return its identity.
    pub fn alloc(&mut self, bag: FieldBag) -> BagId {
        self.bags.push(bag);
        BagId(self.bags.len() - 1)
    }

    pub fn get(&self, id: BagId) -> Option<&FieldBag> {
        self.bags.get(id.0)
    }

    /// Like [`get`](Self::get), but reports a dangling id as an error.
    pub fn bag(&self, id: BagId) -> Result<&FieldBag, BagError> {
        self.bags.get(id.0).ok_or(BagError::Dangling(id))
    }

    pub fn bag_mut(&mut self, id: BagId) -> Result<&mut FieldBag, BagError> {
        self.bags.get_mut(id.0).ok_or(BagError::Dangling(id))
    }

    /// Set one entry of an existing bag.
    ///
    /// Every `BagId` inside `value` must already exist in this arena. This is
    /// the only way to link a bag to one of its ancestors.
    pub fn set(
        &mut self,
        id: BagId,
        name: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Result<(), BagError> {
        let value = value.into();
        let mut referenced = Vec::new();
        value.visit_bag_ids(&mut referenced);
        if let Some(missing) = referenced.into_iter().find(|r| r.0 >= self.bags.len()) {
            return Err(BagError::Dangling(missing));
        }
        self.bag_mut(id)?.insert(name, value);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.bags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bags.is_empty()
    }
}

/// A JSON object or array whose members are still being converted.
enum Frame<'v> {
    Object {
        id: BagId,
        members: serde_json::map::Iter<'v>,
        bag: FieldBag,
        /// Member whose value is being converted.
        member: Option<String>,
        segment: String,
    },
    List {
        items: std::iter::Enumerate<std::slice::Iter<'v, Value>>,
        converted: Vec<FieldValue>,
        segment: String,
    },
}

impl<'v> Frame<'v> {
    fn object(id: BagId, members: &'v serde_json::Map<String, Value>, segment: String) -> Self {
        Self::Object {
            id,
            members: members.iter(),
            bag: FieldBag::new(),
            member: None,
            segment,
        }
    }

    fn list(items: &'v [Value], segment: String) -> Self {
        Self::List {
            items: items.iter().enumerate(),
            converted: Vec::with_capacity(items.len()),
            segment,
        }
    }

    /// The next child to convert and its path segment. Null members are
    /// absent and skipped; null list elements are returned for the caller
    /// to reject.
    fn next_child(&mut self) -> Option<(&'v Value, String)> {
        match self {
            Self::Object {
                members, member, ..
            } => {
                let (name, value) = members.by_ref().find(|(_, value)| !value.is_null())?;
                *member = Some(name.clone());
                Some((value, format!(".{name}")))
            }
            Self::List { items, .. } => items.next().map(|(i, item)| (item, format!("[{i}]"))),
        }
    }

    fn accept(&mut self, value: FieldValue) {
        match self {
            Self::Object { bag, member, .. } => {
                if let Some(name) = member.take() {
                    bag.insert(name, value);
                }
            }
            Self::List { converted, .. } => converted.push(value),
        }
    }

    fn segment(&self) -> &str {
        match self {
            Self::Object { segment, .. } | Self::List { segment, .. } => segment,
        }
    }
}

fn path_of(stack: &[Frame<'_>], tail: &str) -> String {
    let mut path: String = stack.iter().map(Frame::segment).collect();
    path.push_str(tail);
    path
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "field-bag",
    }
}

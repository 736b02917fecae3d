//! # Recursive Expander
//!
//! Drives the decoder from the root bag down through every nested bag and
//! assembles the typed [`Atom`] tree.
//!
//! ## Safety Bounds
//!
//! - **Cycles.** The `BagId`s on the current root-to-node path are kept in
//!   a set. Following a link to a bag already on the path is a
//!   [`DecodeError::CyclicStructure`]. A bag referenced twice from
//!   different branches is not a cycle and decodes twice.
//! - **Depth.** The root is depth 0 and each link adds one. A link that
//!   would reach a depth above `max_depth` is a
//!   [`DecodeError::MaxDepthExceeded`].
//! - **Size.** Every followed link produces one more value in the typed
//!   tree, so a chain of bags each shared twice doubles the output per
//!   level. Following more than `max_nodes` links in one expansion is a
//!   [`DecodeError::NodeLimitExceeded`].
//!
//! All three checks run before the child is touched and are reported
//! against the parent's variant and field.
//!
//! ## Failure Reporting
//!
//! A failing nested field is wrapped in [`DecodeError::Nested`]. In a list
//! every element is attempted and all failures are reported together in
//! [`DecodeError::ListElements`].

use std::cell::Cell;
use std::collections::HashSet;

use atoms_core::{AtomicClass, BagArena, BagId, DecodeError, ElementFailure};
use atoms_schema::NestedTarget;

use crate::decoder::{Decoder, Record, Slot};
use crate::model::Atom;

/// Default bound on nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Default bound on the number of nested values one expansion produces.
pub const DEFAULT_MAX_NODES: usize = 10_000;

/// A decoded field with nested bags replaced by typed values.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    String(String),
    Number(f64),
    Bool(bool),
    StringList(Vec<String>),
    Atom(Box<Atom>),
    Atoms(Vec<Atom>),
}

/// Expands one payload held in `arena`.
#[derive(Debug)]
pub struct Expander<'a> {
    decoder: Decoder,
    arena: &'a BagArena,
    max_depth: usize,
    max_nodes: usize,
    /// Links followed by the expansion in progress.
    followed: Cell<usize>,
}

impl<'a> Expander<'a> {
    pub fn new(decoder: Decoder, arena: &'a BagArena, max_depth: usize) -> Self {
        Self {
            decoder,
            arena,
            max_depth,
            max_nodes: DEFAULT_MAX_NODES,
            followed: Cell::new(0),
        }
    }

    /// Bound the number of nested values one expansion may produce.
    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    /// Decode the tree rooted at `root`.
    pub fn expand(&self, root: BagId) -> Result<Atom, DecodeError> {
        self.followed.set(0);
        let mut path = HashSet::new();
        self.expand_bag(root, None, 0, &mut path)
    }

    fn expand_bag(
        &self,
        id: BagId,
        target: Option<NestedTarget>,
        depth: usize,
        path: &mut HashSet<BagId>,
    ) -> Result<Atom, DecodeError> {
        let bag = self.arena.bag(id)?;
        let record = self.decoder.decode(bag, target)?;

        path.insert(id);
        let resolved = self.resolve(record, depth, path);
        path.remove(&id);

        Atom::from_record(resolved?)
    }

    fn resolve(
        &self,
        record: Record<Slot>,
        depth: usize,
        path: &mut HashSet<BagId>,
    ) -> Result<Record<Resolved>, DecodeError> {
        let class = record.class;
        let mut fields = Vec::with_capacity(record.fields.len());
        for (name, slot) in record.fields {
            let value = match slot {
                Slot::String(s) => Resolved::String(s),
                Slot::Number(n) => Resolved::Number(n),
                Slot::Bool(b) => Resolved::Bool(b),
                Slot::StringList(items) => Resolved::StringList(items),
                Slot::Nested { bag, target } => {
                    let atom = self
                        .descend(class, name, bag, target, depth, path)
                        .map_err(|source| DecodeError::Nested {
                            variant: class.to_string(),
                            field: name.to_string(),
                            source: Box::new(source),
                        })?;
                    Resolved::Atom(Box::new(atom))
                }
                Slot::NestedList { bags, target } => {
                    let mut atoms = Vec::with_capacity(bags.len());
                    let mut failures = Vec::new();
                    for (index, bag) in bags.into_iter().enumerate() {
                        match self.descend(class, name, bag, target, depth, path) {
                            Ok(atom) => atoms.push(atom),
                            Err(error) => failures.push(ElementFailure { index, error }),
                        }
                    }
                    if !failures.is_empty() {
                        return Err(DecodeError::ListElements {
                            variant: class.to_string(),
                            field: name.to_string(),
                            failures,
                        });
                    }
                    Resolved::Atoms(atoms)
                }
            };
            fields.push((name, value));
        }
        Ok(Record { class, fields })
    }

    fn descend(
        &self,
        parent: AtomicClass,
        field: &str,
        child: BagId,
        target: NestedTarget,
        depth: usize,
        path: &mut HashSet<BagId>,
    ) -> Result<Atom, DecodeError> {
        if path.contains(&child) {
            return Err(DecodeError::CyclicStructure {
                variant: parent.to_string(),
                field: field.to_string(),
                bag: child,
            });
        }
        if depth + 1 > self.max_depth {
            return Err(DecodeError::MaxDepthExceeded {
                variant: parent.to_string(),
                field: field.to_string(),
                max_depth: self.max_depth,
            });
        }
        if self.followed.get() >= self.max_nodes {
            return Err(DecodeError::NodeLimitExceeded {
                variant: parent.to_string(),
                field: field.to_string(),
                max_nodes: self.max_nodes,
            });
        }
        self.followed.set(self.followed.get() + 1);
        self.expand_bag(child, Some(target), depth + 1, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atoms_core::{ErrorCode, FieldBag, FieldValue};
    use atoms_schema::Registry;
    use serde_json::json;

    fn expand(arena: &BagArena, root: BagId, max_depth: usize) -> Result<Atom, DecodeError> {
        Expander::new(Decoder::new(Registry::current()), arena, max_depth).expand(root)
    }

    /// Root organization with `links` nested departments below it.
    fn department_chain(links: usize) -> (BagArena, BagId) {
        let mut arena = BagArena::new();
        let mut child: Option<BagId> = None;
        for i in (0..=links).rev() {
            let mut bag = FieldBag::new()
                .with("type", "Organization")
                .with("name", format!("org-{i}"));
            if let Some(c) = child {
                bag.insert("department", vec![FieldValue::Bag(c)]);
            }
            child = Some(arena.alloc(bag));
        }
        let root = child.unwrap();
        (arena, root)
    }

    #[test]
    fn test_expands_nested_list() {
        let (arena, root) = BagArena::from_json(&json!({
            "type": "Organization",
            "name": "Acme",
            "department": [{"name": "R&D"}, {"name": "Sales"}]
        }))
        .unwrap();
        let atom = expand(&arena, root, DEFAULT_MAX_DEPTH).unwrap();
        match atom {
            Atom::Organization(org) => {
                let names: Vec<_> = org
                    .department
                    .unwrap()
                    .into_iter()
                    .map(|d| d.name)
                    .collect();
                assert_eq!(names, vec!["R&D", "Sales"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_depth_at_bound_accepted() {
        let (arena, root) = department_chain(32);
        assert!(expand(&arena, root, 32).is_ok());
    }

    #[test]
    fn test_depth_beyond_bound_rejected() {
        let (arena, root) = department_chain(33);
        let err = expand(&arena, root, 32).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MaxDepthExceeded);
    }

    #[test]
    fn test_zero_depth_allows_only_root() {
        let (arena, root) = department_chain(0);
        assert!(expand(&arena, root, 0).is_ok());
        let (arena, root) = department_chain(1);
        assert_eq!(
            expand(&arena, root, 0).unwrap_err().code(),
            ErrorCode::MaxDepthExceeded
        );
    }

    #[test]
    fn test_self_cycle_rejected() {
        let mut arena = BagArena::new();
        let root = arena.alloc(
            FieldBag::new()
                .with("type", "Organization")
                .with("name", "Loop"),
        );
        arena
            .set(root, "department", vec![FieldValue::Bag(root)])
            .unwrap();
        let err = expand(&arena, root, DEFAULT_MAX_DEPTH).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CyclicStructure);
        let violations = err.violations();
        assert_eq!(violations[0].field.as_deref(), Some("department[0]"));
    }

    #[test]
    fn test_shared_child_is_not_a_cycle() {
        let mut arena = BagArena::new();
        let shared = arena.alloc(FieldBag::new().with("name", "Shared"));
        let root = arena.alloc(
            FieldBag::new()
                .with("type", "Organization")
                .with("name", "Acme")
                .with(
                    "department",
                    vec![FieldValue::Bag(shared), FieldValue::Bag(shared)],
                ),
        );
        assert!(expand(&arena, root, DEFAULT_MAX_DEPTH).is_ok());
    }

    /// `levels` organizations, each listing the next one twice.
    fn doubling_chain(levels: usize) -> (BagArena, BagId) {
        let mut arena = BagArena::new();
        let mut child = arena.alloc(
            FieldBag::new()
                .with("type", "Organization")
                .with("name", "leaf"),
        );
        for i in 0..levels {
            child = arena.alloc(
                FieldBag::new()
                    .with("type", "Organization")
                    .with("name", format!("org-{i}"))
                    .with(
                        "department",
                        vec![FieldValue::Bag(child), FieldValue::Bag(child)],
                    ),
            );
        }
        (arena, child)
    }

    #[test]
    fn test_shared_chain_within_node_limit() {
        // 2 + 4 + ... + 2^5 = 62 links.
        let (arena, root) = doubling_chain(5);
        let expander = Expander::new(Decoder::new(Registry::current()), &arena, DEFAULT_MAX_DEPTH)
            .with_max_nodes(62);
        assert!(expander.expand(root).is_ok());
        // The counter restarts with each expansion.
        assert!(expander.expand(root).is_ok());
        let tight = Expander::new(Decoder::new(Registry::current()), &arena, DEFAULT_MAX_DEPTH)
            .with_max_nodes(61);
        assert_eq!(
            tight.expand(root).unwrap_err().code(),
            ErrorCode::NodeLimitExceeded
        );
    }

    #[test]
    fn test_exponential_sharing_stops_at_node_limit() {
        let (arena, root) = doubling_chain(32);
        let err = expand(&arena, root, DEFAULT_MAX_DEPTH).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NodeLimitExceeded);
        assert!(err
            .violations()
            .iter()
            .all(|v| v.code == ErrorCode::NodeLimitExceeded));
    }

    #[test]
    fn test_every_list_element_attempted() {
        let (arena, root) = BagArena::from_json(&json!({
            "type": "Organization",
            "name": "Acme",
            "department": [
                {"nickname": "no name"},
                {"name": "ok"},
                {"name": 7}
            ]
        }))
        .unwrap();
        let err = expand(&arena, root, DEFAULT_MAX_DEPTH).unwrap_err();
        match &err {
            DecodeError::ListElements { failures, .. } => {
                let indices: Vec<_> = failures.iter().map(|f| f.index).collect();
                assert_eq!(indices, vec![0, 2]);
            }
            other => panic!("unexpected {other:?}"),
        }
        let fields: Vec<_> = err
            .violations()
            .into_iter()
            .filter_map(|v| v.field)
            .collect();
        assert_eq!(fields, vec!["department[0].name", "department[2].name"]);
    }

    #[test]
    fn test_nested_failure_wrapped() {
        let (arena, root) = BagArena::from_json(&json!({
            "type": "EducationalOccupationalCredential",
            "name": "MSc",
            "dateCreated": "2020-06-30T00:00:00Z",
            "recognizedBy": {"nickname": "nameless"}
        }))
        .unwrap();
        let err = expand(&arena, root, DEFAULT_MAX_DEPTH).unwrap_err();
        assert!(matches!(err, DecodeError::Nested { ref field, .. } if field == "recognizedBy"));
        assert_eq!(err.code(), ErrorCode::MissingField);
    }
}

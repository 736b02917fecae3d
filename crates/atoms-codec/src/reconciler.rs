//! # Schema Reconciler
//!
//! Rewrites a legacy-generation payload, bag by bag, into the vocabulary of
//! the next generation so the current decoder can read it.
//!
//! ## Rename Table
//!
//! A [`RenameTable`] lists everything that changed between two
//! generations:
//!
//! - **tag renames**: `Reference` → `Resource`, `Number` → `Numeric`;
//! - **field renames** per variant: `category1..4` → `categoryLvl1..4`;
//! - **value rewrites**: numeric `actionStatus` ordinals → status names;
//! - **retired tags**: variants that no longer exist (none for v1 → v2);
//! - **tightened fields**: fields that became required (`Action.object`).
//!
//! ## Traversal
//!
//! The reconciler works on a clone of the arena and never touches the
//! caller's. Every reachable bag is visited once; the visited set makes
//! cyclic arenas terminate. Rejecting the cycle is left to the expander.
//!
//! A legacy payload cannot supply a tightened field, so its absence is
//! handled by the configured [`ObjectPolicy`]: `Reject` fails with
//! `SchemaGap`, `Placeholder` substitutes the table's placeholder value and
//! reports a warning.

use std::collections::HashSet;

use atoms_core::{
    AtomicClass, BagArena, BagId, DecodeError, FieldBag, FieldValue, Generation, TYPE_FIELD,
};
use atoms_schema::{NestedTarget, Registry, VariantShape};

use crate::config::ObjectPolicy;
use crate::decoder::Decoder;
use crate::model::ActionStatus;
use crate::validator::{Warning, WarningCode};

/// A variant renamed between generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagRename {
    /// Tag as written by the older generation.
    pub from: &'static str,
    pub to: AtomicClass,
}

/// A field renamed within one variant. `variant` is the newer tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRename {
    pub variant: AtomicClass,
    pub from: &'static str,
    pub to: &'static str,
}

/// A field whose encoding changed. `rewrite` returns `None` for values it
/// does not recognise, which are left for the decoder to reject.
#[derive(Debug, Clone, Copy)]
pub struct ValueRewrite {
    pub variant: AtomicClass,
    pub field: &'static str,
    pub rewrite: fn(&FieldValue) -> Option<FieldValue>,
}

/// A field that became required.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TightenedField {
    pub variant: AtomicClass,
    pub field: &'static str,
    pub introduced_in: Generation,
    /// Entries of the bag substituted under [`ObjectPolicy::Placeholder`].
    pub placeholder: &'static [(&'static str, &'static str)],
}

/// Everything that changed from `from` to `to`.
#[derive(Debug, Clone, Copy)]
pub struct RenameTable {
    pub from: Generation,
    pub to: Generation,
    pub tag_renames: &'static [TagRename],
    pub field_renames: &'static [FieldRename],
    pub value_rewrites: &'static [ValueRewrite],
    pub retired_tags: &'static [&'static str],
    pub tightened: &'static [TightenedField],
}

/// Identifier of the resource substituted for a missing `Action.object`.
pub const PLACEHOLDER_RESOURCE_ID: &str = "urn:atoms:unknown-resource";

/// The v1 → v2 table.
pub const V1_TO_V2: RenameTable = RenameTable {
    from: Generation::V1,
    to: Generation::V2,
    tag_renames: &[
        TagRename {
            from: "Reference",
            to: AtomicClass::Resource,
        },
        TagRename {
            from: "Number",
            to: AtomicClass::Numeric,
        },
    ],
    field_renames: &[
        FieldRename {
            variant: AtomicClass::Resource,
            from: "category1",
            to: "categoryLvl1",
        },
        FieldRename {
            variant: AtomicClass::Resource,
            from: "category2",
            to: "categoryLvl2",
        },
        FieldRename {
            variant: AtomicClass::Resource,
            from: "category3",
            to: "categoryLvl3",
        },
        FieldRename {
            variant: AtomicClass::Resource,
            from: "category4",
            to: "categoryLvl4",
        },
    ],
    value_rewrites: &[ValueRewrite {
        variant: AtomicClass::Action,
        field: "actionStatus",
        rewrite: action_status_ordinal,
    }],
    retired_tags: &[],
    tightened: &[TightenedField {
        variant: AtomicClass::Action,
        field: "object",
        introduced_in: Generation::V2,
        placeholder: &[
            (TYPE_FIELD, "Resource"),
            ("id", PLACEHOLDER_RESOURCE_ID),
            ("name", "Unknown resource"),
            ("categoryLvl1", "unknown"),
        ],
    }],
};

fn action_status_ordinal(value: &FieldValue) -> Option<FieldValue> {
    match value {
        FieldValue::Number(n) if n.fract() == 0.0 && *n >= 0.0 => {
            ActionStatus::from_ordinal(*n as usize).map(|s| FieldValue::from(s.as_str()))
        }
        _ => None,
    }
}

impl RenameTable {
    fn renamed(&self, tag: &str) -> Option<AtomicClass> {
        self.tag_renames.iter().find(|r| r.from == tag).map(|r| r.to)
    }

    fn is_retired(&self, tag: &str) -> bool {
        self.retired_tags.contains(&tag)
    }

    /// Whether any bag reachable from `root` uses a name or encoding this
    /// table would rewrite.
    pub fn detects_legacy(&self, arena: &BagArena, root: BagId) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(bag) = arena.get(id) else { continue };
            if let Some(tag) = bag.tag().and_then(FieldValue::as_str) {
                if self.renamed(tag).is_some() || self.is_retired(tag) {
                    return true;
                }
            }
            if self.field_renames.iter().any(|r| bag.contains(r.from)) {
                return true;
            }
            let rewritable = self.value_rewrites.iter().any(|r| {
                bag.get(r.field)
                    .map_or(false, |value| (r.rewrite)(value).is_some())
            });
            if rewritable {
                return true;
            }
            stack.extend(bag.child_ids());
        }
        false
    }
}

/// A rewritten copy of the payload.
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub arena: BagArena,
    pub root: BagId,
    pub warnings: Vec<Warning>,
}

/// Applies one [`RenameTable`].
#[derive(Debug, Clone, Copy)]
pub struct Reconciler {
    table: RenameTable,
    policy: ObjectPolicy,
}

struct Pending {
    id: BagId,
    target: Option<NestedTarget>,
    path: String,
}

impl Reconciler {
    pub fn new(table: RenameTable, policy: ObjectPolicy) -> Self {
        Self { table, policy }
    }

    pub fn table(&self) -> &RenameTable {
        &self.table
    }

    /// Rewrite every bag reachable from `root`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::UnknownVariant`] for a retired tag,
    /// [`DecodeError::SchemaGap`] for a missing tightened field under
    /// [`ObjectPolicy::Reject`], and [`DecodeError::Bag`] for dangling ids.
    pub fn reconcile(&self, arena: &BagArena, root: BagId) -> Result<Reconciled, DecodeError> {
        let legacy = Registry::for_generation(self.table.from);
        let current = Registry::for_generation(self.table.to);
        let legacy_decoder = Decoder::new(legacy);

        let mut arena = arena.clone();
        let mut warnings = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![Pending {
            id: root,
            target: None,
            path: String::new(),
        }];

        while let Some(Pending { id, target, path }) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let mut bag = arena.bag(id)?.clone();

            let (legacy_class, class) = self.classify(&legacy_decoder, &mut bag, target)?;
            if let Some(class) = class {
                self.rename_fields(&mut bag, class);
                self.rewrite_values(&mut bag, class);
                self.fill_tightened(&mut arena, &mut bag, class, &path, &mut warnings)?;
            }

            let legacy_shape = legacy_class.and_then(|c| legacy.shape_of(c).ok());
            let current_shape = class.and_then(|c| current.shape_of(c).ok());
            stack.extend(children(&bag, legacy_shape, current_shape, &path));

            *arena.bag_mut(id)? = bag;
        }

        Ok(Reconciled {
            arena,
            root,
            warnings,
        })
    }

    /// Work out the bag's variant in the older and newer generation,
    /// renaming an explicit tag in place.
    fn classify(
        &self,
        legacy_decoder: &Decoder,
        bag: &mut FieldBag,
        target: Option<NestedTarget>,
    ) -> Result<(Option<AtomicClass>, Option<AtomicClass>), DecodeError> {
        let legacy = legacy_decoder.registry();
        match bag.tag() {
            Some(FieldValue::String(tag)) => {
                let tag = tag.clone();
                if self.table.is_retired(&tag) {
                    return Err(DecodeError::UnknownVariant {
                        detail: format!("retired in {}", self.table.to),
                        tag,
                    });
                }
                let parsed = tag.parse::<AtomicClass>().ok();
                match self.table.renamed(&tag) {
                    Some(to) => {
                        bag.insert(TYPE_FIELD, to.as_str());
                        tracing::debug!(from = %tag, to = %to, "renamed legacy variant");
                        let legacy_class = parsed.filter(|c| legacy.contains(*c)).or(Some(to));
                        Ok((legacy_class, Some(to)))
                    }
                    None => Ok((parsed, parsed)),
                }
            }
            // Left for the decoder to report.
            Some(_) => Ok((None, None)),
            None => {
                let inferred = match target {
                    Some(NestedTarget::Fixed(class)) => Some(class),
                    Some(NestedTarget::OneOf(members)) => legacy_decoder
                        .infer(bag, members.iter().copied())
                        .ok()
                        .map(|s| s.class),
                    None => legacy_decoder
                        .infer(bag, legacy.all_tags())
                        .ok()
                        .map(|s| s.class),
                };
                let Some(legacy_class) = inferred else {
                    return Ok((None, None));
                };
                match self.table.renamed(legacy_class.as_str()) {
                    Some(to) => {
                        bag.insert(TYPE_FIELD, to.as_str());
                        Ok((Some(legacy_class), Some(to)))
                    }
                    None => Ok((Some(legacy_class), Some(legacy_class))),
                }
            }
        }
    }

    fn rename_fields(&self, bag: &mut FieldBag, class: AtomicClass) {
        for rename in self.table.field_renames.iter().filter(|r| r.variant == class) {
            if bag.contains(rename.to) {
                continue;
            }
            if let Some(value) = bag.remove(rename.from) {
                bag.insert(rename.to, value);
            }
        }
    }

    fn rewrite_values(&self, bag: &mut FieldBag, class: AtomicClass) {
        for rewrite in self.table.value_rewrites.iter().filter(|r| r.variant == class) {
            let replacement = bag.get(rewrite.field).and_then(|v| (rewrite.rewrite)(v));
            if let Some(value) = replacement {
                bag.insert(rewrite.field, value);
            }
        }
    }

    fn fill_tightened(
        &self,
        arena: &mut BagArena,
        bag: &mut FieldBag,
        class: AtomicClass,
        path: &str,
        warnings: &mut Vec<Warning>,
    ) -> Result<(), DecodeError> {
        for tightened in self.table.tightened.iter().filter(|t| t.variant == class) {
            if bag.contains(tightened.field) {
                continue;
            }
            let field_path = join(path, tightened.field);
            match self.policy {
                ObjectPolicy::Reject => {
                    return Err(DecodeError::SchemaGap {
                        variant: class.to_string(),
                        field: field_path,
                        introduced_in: tightened.introduced_in,
                    });
                }
                ObjectPolicy::Placeholder => {
                    let placeholder = tightened
                        .placeholder
                        .iter()
                        .fold(FieldBag::new(), |b, (k, v)| b.with(*k, *v));
                    let placeholder_id = arena.alloc(placeholder);
                    bag.insert(tightened.field, placeholder_id);

                    tracing::warn!(
                        variant = %class,
                        field = %field_path,
                        "legacy payload lacks a required field, substituted placeholder"
                    );
                    warnings.push(Warning {
                        code: WarningCode::PlaceholderObject,
                        variant: class.to_string(),
                        field: Some(field_path),
                        detail: format!(
                            "required since {}; placeholder substituted",
                            tightened.introduced_in
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

fn join(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}

/// Nested bags of `bag` with the slot each one fills. The legacy shape is
/// consulted first, then the current one; bags under fields neither
/// declares are still visited, untargeted.
fn children(
    bag: &FieldBag,
    legacy: Option<&VariantShape>,
    current: Option<&VariantShape>,
    path: &str,
) -> Vec<Pending> {
    let mut out = Vec::new();
    for (name, value) in bag.iter() {
        let target = legacy
            .and_then(|s| s.field(name))
            .or_else(|| current.and_then(|s| s.field(name)))
            .and_then(|f| f.kind.target());
        match value {
            FieldValue::Bag(id) => out.push(Pending {
                id: *id,
                target,
                path: join(path, name),
            }),
            FieldValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if let FieldValue::Bag(id) = item {
                        out.push(Pending {
                            id: *id,
                            target,
                            path: format!("{}[{i}]", join(path, name)),
                        });
                    }
                }
            }
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reconcile(value: serde_json::Value, policy: ObjectPolicy) -> Result<Reconciled, DecodeError> {
        let (arena, root) = BagArena::from_json(&value).unwrap();
        Reconciler::new(V1_TO_V2, policy).reconcile(&arena, root)
    }

    fn root_bag(r: &Reconciled) -> &FieldBag {
        r.arena.bag(r.root).unwrap()
    }

    #[test]
    fn test_reference_becomes_resource() {
        let r = reconcile(
            json!({"type": "Reference", "id": "r1", "name": "Ledger", "category1": "finance", "category2": "books"}),
            ObjectPolicy::Reject,
        )
        .unwrap();
        let bag = root_bag(&r);
        assert_eq!(bag.tag().and_then(FieldValue::as_str), Some("Resource"));
        assert_eq!(bag.get("categoryLvl1").and_then(FieldValue::as_str), Some("finance"));
        assert_eq!(bag.get("categoryLvl2").and_then(FieldValue::as_str), Some("books"));
        assert!(!bag.contains("category1"));
    }

    #[test]
    fn test_untagged_action_inferred() {
        let r = reconcile(
            json!({
                "actionStatus": 0,
                "actor": {"type": "Person", "id": "p1", "name": "Ada"},
                "name": "draft"
            }),
            ObjectPolicy::Placeholder,
        )
        .unwrap();
        let bag = root_bag(&r);
        assert_eq!(
            bag.get("actionStatus").and_then(FieldValue::as_str),
            Some("ActiveActionStatus")
        );
        assert!(bag.contains("object"));
        assert_eq!(r.warnings[0].field.as_deref(), Some("object"));
    }

    #[test]
    fn test_ambiguous_legacy_bag_left_alone() {
        // In v1 every agent also requires `id` and `name`.
        let r = reconcile(
            json!({"id": "r1", "name": "Ledger", "category1": "finance"}),
            ObjectPolicy::Reject,
        )
        .unwrap();
        let bag = root_bag(&r);
        assert!(bag.tag().is_none());
        assert!(bag.contains("category1"));
    }

    #[test]
    fn test_number_tag_renamed() {
        let r = reconcile(json!({"type": "Number", "value": 4}), ObjectPolicy::Reject).unwrap();
        assert_eq!(root_bag(&r).tag().and_then(FieldValue::as_str), Some("Numeric"));
    }

    #[test]
    fn test_action_without_object_rejected() {
        let err = reconcile(
            json!({
                "type": "Action",
                "actionStatus": 1,
                "actor": {"type": "Person", "id": "p1", "name": "Ada"},
                "name": "review"
            }),
            ObjectPolicy::Reject,
        )
        .unwrap_err();
        assert_eq!(
            err,
            DecodeError::SchemaGap {
                variant: "Action".to_string(),
                field: "object".to_string(),
                introduced_in: Generation::V2,
            }
        );
    }

    #[test]
    fn test_action_placeholder_and_status_rewrite() {
        let r = reconcile(
            json!({
                "type": "DigitalDocument",
                "name": "Plan",
                "potentialAction": [{
                    "actionStatus": 2,
                    "actor": {"type": "Software", "id": "s1", "name": "bot"},
                    "name": "publish"
                }]
            }),
            ObjectPolicy::Placeholder,
        )
        .unwrap();
        assert_eq!(r.warnings.len(), 1);
        assert_eq!(r.warnings[0].code, WarningCode::PlaceholderObject);
        assert_eq!(r.warnings[0].field.as_deref(), Some("potentialAction[0].object"));

        let doc = root_bag(&r);
        let action_id = match doc.get("potentialAction") {
            Some(FieldValue::List(items)) => match items[0] {
                FieldValue::Bag(id) => id,
                _ => panic!("expected a bag"),
            },
            other => panic!("unexpected {other:?}"),
        };
        let action = r.arena.bag(action_id).unwrap();
        assert_eq!(
            action.get("actionStatus").and_then(FieldValue::as_str),
            Some("FailedActionStatus")
        );
        let object = match action.get("object") {
            Some(FieldValue::Bag(id)) => r.arena.bag(*id).unwrap(),
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(object.get("id").and_then(FieldValue::as_str), Some(PLACEHOLDER_RESOURCE_ID));
    }

    #[test]
    fn test_input_arena_untouched() {
        let (arena, root) =
            BagArena::from_json(&json!({"type": "Reference", "id": "r", "name": "n", "category1": "c"}))
                .unwrap();
        let before = arena.clone();
        Reconciler::new(V1_TO_V2, ObjectPolicy::Reject)
            .reconcile(&arena, root)
            .unwrap();
        assert_eq!(arena, before);
    }

    #[test]
    fn test_cyclic_arena_terminates() {
        let mut arena = BagArena::new();
        let root = arena.alloc(
            FieldBag::new()
                .with("type", "Organization")
                .with("id", "o1")
                .with("name", "Loop"),
        );
        arena.set(root, "department", vec![FieldValue::Bag(root)]).unwrap();
        assert!(Reconciler::new(V1_TO_V2, ObjectPolicy::Reject)
            .reconcile(&arena, root)
            .is_ok());
    }

    #[test]
    fn test_retired_tag_rejected() {
        const RETIRING: RenameTable = RenameTable {
            retired_tags: &["Software"],
            ..V1_TO_V2
        };
        let (arena, root) =
            BagArena::from_json(&json!({"type": "Software", "id": "s", "name": "bot"})).unwrap();
        let err = Reconciler::new(RETIRING, ObjectPolicy::Reject)
            .reconcile(&arena, root)
            .unwrap_err();
        match err {
            DecodeError::UnknownVariant { tag, detail } => {
                assert_eq!(tag, "Software");
                assert!(detail.contains("retired"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_detects_legacy_names() {
        let legacy = |v: serde_json::Value| {
            let (arena, root) = BagArena::from_json(&v).unwrap();
            V1_TO_V2.detects_legacy(&arena, root)
        };
        assert!(legacy(json!({"type": "Number", "value": 1})));
        assert!(legacy(json!({"type": "Organization", "name": "o", "department": [{"name": "d", "category1": "x"}]})));
        assert!(legacy(json!({"actionStatus": 0})));
        assert!(!legacy(json!({"type": "Text", "text": "x"})));
        assert!(!legacy(json!({"actionStatus": "ActiveActionStatus"})));
    }
}

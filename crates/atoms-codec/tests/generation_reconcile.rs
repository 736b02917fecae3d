//! Legacy (v1) payloads decoded into the current catalog.

use atoms_codec::{
    ActionStatus, Atom, ObjectPolicy, Pipeline, PipelineConfig, Reconciler, RenameTable,
    WarningCode, PLACEHOLDER_RESOURCE_ID, V1_TO_V2,
};
use atoms_core::{BagArena, DecodeError, ErrorCode, Generation};
use serde_json::{json, Value};

fn pipeline(policy: ObjectPolicy) -> Pipeline {
    Pipeline::new(PipelineConfig {
        object_policy: policy,
        ..PipelineConfig::default()
    })
}

fn legacy_action(status: u8) -> Value {
    json!({
        "type": "Action",
        "actionStatus": status,
        "actor": {"type": "Person", "id": "p-1", "name": "Ada"},
        "name": "review"
    })
}

#[test]
fn test_reference_becomes_resource() {
    let payload = json!({
        "type": "Reference",
        "id": "ref-1",
        "name": "Ledger",
        "category1": "finance",
        "category3": "books",
        "source": "archive"
    });
    let decoded = Pipeline::default()
        .decode_json(&payload, Some(Generation::V1))
        .unwrap();
    assert_eq!(decoded.reconciled_from, Some(Generation::V1));
    match decoded.value {
        Atom::Resource(resource) => {
            assert_eq!(resource.id, "ref-1");
            assert_eq!(resource.category_lvl1, "finance");
            assert_eq!(resource.category_lvl2, None);
            assert_eq!(resource.category_lvl3.as_deref(), Some("books"));
            assert_eq!(resource.source.as_deref(), Some("archive"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_number_tag_becomes_numeric() {
    let decoded = Pipeline::default()
        .decode_json(&json!({"type": "Number", "value": 7}), Some(Generation::V1))
        .unwrap();
    assert_eq!(decoded.value.to_json().unwrap(), json!({"type": "Numeric", "value": 7.0}));
}

#[test]
fn test_v1_agents_keep_their_id() {
    let decoded = Pipeline::default()
        .decode_json(
            &json!({"type": "Organization", "id": "o-1", "name": "Acme"}),
            Some(Generation::V1),
        )
        .unwrap();
    match decoded.value {
        Atom::Organization(org) => assert_eq!(org.id.as_deref(), Some("o-1")),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_missing_object_rejected_by_default() {
    let rejection = Pipeline::default()
        .decode_json(&legacy_action(1), Some(Generation::V1))
        .unwrap_err();
    assert_eq!(rejection.violations.len(), 1);
    let v = &rejection.violations[0];
    assert_eq!(v.code, ErrorCode::SchemaGap);
    assert_eq!(v.variant, "Action");
    assert_eq!(v.field.as_deref(), Some("object"));
}

#[test]
fn test_missing_object_placeholder() {
    let decoded = pipeline(ObjectPolicy::Placeholder)
        .decode_json(&legacy_action(1), Some(Generation::V1))
        .unwrap();
    match decoded.value {
        Atom::Action(action) => {
            assert_eq!(action.action_status, ActionStatus::CompletedActionStatus);
            assert_eq!(action.object.id, PLACEHOLDER_RESOURCE_ID);
            assert_eq!(action.object.category_lvl1, "unknown");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(decoded.warnings.len(), 1);
    assert_eq!(decoded.warnings[0].code, WarningCode::PlaceholderObject);
}

#[test]
fn test_nested_schema_gap_has_path() {
    let payload = json!({
        "type": "DigitalDocument",
        "name": "Plan",
        "potentialAction": [legacy_action(0)]
    });
    let rejection = Pipeline::default()
        .decode_json(&payload, Some(Generation::V1))
        .unwrap_err();
    assert_eq!(
        rejection.violations[0].field.as_deref(),
        Some("potentialAction[0].object")
    );
}

#[test]
fn test_failed_status_ordinal_warns_after_reconcile() {
    let decoded = pipeline(ObjectPolicy::Placeholder)
        .decode_json(&legacy_action(2), Some(Generation::V1))
        .unwrap();
    let codes: Vec<_> = decoded.warnings.iter().map(|w| w.code).collect();
    assert_eq!(
        codes,
        vec![WarningCode::PlaceholderObject, WarningCode::FailedActionWithoutError]
    );
}

#[test]
fn test_out_of_range_ordinal_rejected() {
    let rejection = pipeline(ObjectPolicy::Placeholder)
        .decode_json(&legacy_action(9), Some(Generation::V1))
        .unwrap_err();
    let v = &rejection.violations[0];
    assert_eq!(v.code, ErrorCode::TypeMismatch);
    assert_eq!(v.field.as_deref(), Some("actionStatus"));
}

#[test]
fn test_unmarked_legacy_payload_falls_back() {
    let payload = json!({
        "type": "DigitalDocument",
        "name": "Plan",
        "potentialAction": [{
            "type": "Action",
            "actionStatus": 3,
            "actor": {"type": "Software", "id": "s-1", "name": "bot"},
            "name": "publish",
            "object": {"type": "Reference", "id": "r", "name": "site", "category1": "web"}
        }]
    });
    let decoded = Pipeline::default().decode_json(&payload, None).unwrap();
    assert_eq!(decoded.reconciled_from, Some(Generation::V1));
    match decoded.value {
        Atom::DigitalDocument(doc) => {
            let action = &doc.potential_action.unwrap()[0];
            assert_eq!(action.action_status, ActionStatus::PotentialActionStatus);
            assert_eq!(action.object.category_lvl1, "web");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_unmarked_action_without_legacy_names_not_reconciled() {
    let payload = json!({
        "type": "Action",
        "actionStatus": "ActiveActionStatus",
        "actor": {"type": "Person", "name": "Ada"},
        "name": "review"
    });
    let rejection = pipeline(ObjectPolicy::Placeholder)
        .decode_json(&payload, None)
        .unwrap_err();
    assert_eq!(rejection.violations[0].code, ErrorCode::MissingField);
    assert_eq!(rejection.violations[0].field.as_deref(), Some("object"));
}

#[test]
fn test_current_payload_unaffected_by_v1_marker() {
    let decoded = Pipeline::default()
        .decode_json(&json!({"type": "Text", "text": "hi"}), Some(Generation::V1))
        .unwrap();
    assert!(matches!(decoded.value, Atom::Text(_)));
}

#[test]
fn test_retired_tag_reported() {
    const RETIRING: RenameTable = RenameTable {
        retired_tags: &["Website"],
        ..V1_TO_V2
    };
    let (arena, root) = BagArena::from_json(&json!({
        "type": "DigitalDocument",
        "name": "Links",
        "creator": {"type": "Website", "url": "https://example.org"}
    }))
    .unwrap();
    let err = Reconciler::new(RETIRING, ObjectPolicy::Reject)
        .reconcile(&arena, root)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnknownVariant);
    match err {
        DecodeError::UnknownVariant { tag, detail } => {
            assert_eq!(tag, "Website");
            assert_eq!(detail, "retired in v2");
        }
        other => panic!("unexpected {other:?}"),
    }
}

//! The exported JSON Schema must accept the field-bags the decoder accepts
//! and reject the ones it rejects for structural reasons.

use atoms_core::Generation;
use atoms_schema::Registry;
use serde_json::{json, Value};

fn validator(generation: Generation) -> jsonschema::Validator {
    let schema = Registry::for_generation(generation).to_json_schema();
    jsonschema::validator_for(&schema).expect("exported schema must compile")
}

fn accepts(generation: Generation, instance: &Value) -> bool {
    validator(generation).is_valid(instance)
}

#[test]
fn test_schema_compiles_for_every_generation() {
    validator(Generation::V1);
    validator(Generation::V2);
}

#[test]
fn test_tagged_atoms_accepted() {
    let cases = [
        json!({"type": "Text", "text": "hello"}),
        json!({"type": "Flag", "flag": true}),
        json!({"type": "NumericRange", "fromValue": 1, "toValue": 2}),
        json!({"type": "MonetaryAmount", "currency": "EUR", "value": 12.5}),
        json!({"type": "DateTime", "dateTime": "2026-01-15T12:00:00Z"}),
        json!({"type": "Person", "name": "Ada"}),
        json!({
            "type": "Resource",
            "id": "r-1",
            "name": "Ledger",
            "categoryLvl1": "finance"
        }),
    ];
    for case in &cases {
        assert!(accepts(Generation::V2, case), "rejected {case}");
    }
}

#[test]
fn test_nested_department_accepted() {
    let org = json!({
        "type": "Organization",
        "name": "Acme",
        "department": [
            {"name": "Research"},
            {"type": "Organization", "name": "Sales", "department": []}
        ]
    });
    assert!(accepts(Generation::V2, &org));
}

#[test]
fn test_action_requires_object_in_v2_only() {
    let action = json!({
        "type": "Action",
        "actionStatus": "CompletedActionStatus",
        "actor": {"type": "Software", "name": "indexer"},
        "name": "index"
    });
    assert!(!accepts(Generation::V2, &action));

    let mut v1_action = action.clone();
    v1_action["actor"]["id"] = json!("sw-1");
    v1_action["actionStatus"] = json!(1);
    assert!(accepts(Generation::V1, &v1_action));

    let mut with_object = action;
    with_object["object"] = json!({
        "type": "Resource",
        "id": "r-1",
        "name": "Ledger",
        "categoryLvl1": "finance"
    });
    assert!(accepts(Generation::V2, &with_object));
}

#[test]
fn test_v1_wire_format_accepted_by_v1_schema_only() {
    let number = json!({"type": "Number", "value": 7});
    assert!(accepts(Generation::V1, &number));
    assert!(!accepts(Generation::V2, &number));
    assert!(!accepts(Generation::V1, &json!({"type": "Numeric", "value": 7})));

    let document = json!({
        "type": "DigitalDocument",
        "name": "Plan",
        "potentialAction": [{
            "type": "Action",
            "actionStatus": 1,
            "actor": {"type": "Person", "id": "p-1", "name": "Ada"},
            "name": "review"
        }],
        "creator": {"type": "Organization", "id": "o-1", "name": "Acme"}
    });
    assert!(accepts(Generation::V1, &document));

    let reference = json!({
        "type": "Reference",
        "id": "r-1",
        "name": "Ledger",
        "category1": "finance"
    });
    assert!(accepts(Generation::V1, &reference));
}

#[test]
fn test_v1_status_must_be_an_ordinal() {
    let action = |status: Value| {
        json!({
            "type": "Action",
            "actionStatus": status,
            "actor": {"type": "Person", "id": "p-1", "name": "Ada"},
            "name": "review"
        })
    };
    assert!(accepts(Generation::V1, &action(json!(0))));
    assert!(accepts(Generation::V1, &action(json!(3))));
    assert!(!accepts(Generation::V1, &action(json!(4))));
    assert!(!accepts(Generation::V1, &action(json!(-1))));
    assert!(!accepts(Generation::V1, &action(json!("CompletedActionStatus"))));
}

#[test]
fn test_null_optional_accepted() {
    let person = json!({"type": "Person", "name": "Ada", "nickname": null});
    assert!(accepts(Generation::V2, &person));
}

#[test]
fn test_wrong_kind_rejected() {
    assert!(!accepts(Generation::V2, &json!({"type": "Flag", "flag": "yes"})));
    assert!(!accepts(
        Generation::V2,
        &json!({"type": "Numeric", "value": "12"})
    ));
}

#[test]
fn test_unknown_tag_rejected() {
    assert!(!accepts(Generation::V2, &json!({"type": "Reference", "id": "r", "name": "n", "category1": "c"})));
    assert!(!accepts(Generation::V2, &json!({"type": "Widget"})));
}

#[test]
fn test_malformed_timestamp_rejected() {
    let dt = json!({"type": "DateTime", "dateTime": "2026-01-15 12:00"});
    assert!(!accepts(Generation::V2, &dt));
}

#[test]
fn test_untagged_ambiguity_rejected() {
    // Satisfies both Text and Website.
    let bag = json!({"text": "hi", "url": "https://example.org"});
    assert!(!accepts(Generation::V2, &bag));
    assert!(accepts(Generation::V2, &json!({"url": "https://example.org"})));
}

#[test]
fn test_agent_slot_rejects_non_agents() {
    let doc = json!({
        "type": "DigitalDocument",
        "name": "Report",
        "creator": {"type": "Text", "text": "me"}
    });
    assert!(!accepts(Generation::V2, &doc));
}

//! # Shape Export
//!
//! Derived documents for collaborators that mirror the catalog outside
//! Rust: the plain shape table, a JSON Schema (draft 2020-12) document, and
//! a SHA-256 fingerprint of the shape table.
//!
//! The fingerprint is computed over the serialized shape table. Field order
//! inside each shape is declaration order and object keys are emitted by
//! `serde` in struct order, so the bytes are stable for a given catalog.
//! A mirror document records the fingerprint it was derived from; a
//! mismatch later means the catalog drifted.

use serde::Serialize;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

use atoms_core::{Generation, TIMESTAMP_PATTERN, TYPE_FIELD};

use crate::registry::Registry;
use crate::shape::{FieldDescriptor, FieldKind, NestedTarget, VariantShape};

/// JSON Schema dialect of the exported document.
pub const JSON_SCHEMA_DIALECT: &str = "https://json-schema.org/draft/2020-12/schema";

#[derive(Serialize)]
struct ShapeTable<'a> {
    generation: Generation,
    shapes: &'a [VariantShape],
}

impl Registry {
    fn table(&self) -> ShapeTable<'static> {
        ShapeTable {
            generation: self.generation(),
            shapes: self.shapes(),
        }
    }

    /// The shape table as JSON: `{generation, shapes: [{type, fields}]}`.
    pub fn shape_table(&self) -> Value {
        let table = self.table();
        json!(table)
    }

    /// Lowercase hex SHA-256 of the serialized shape table.
    pub fn fingerprint(&self) -> String {
        // Serializing plain static data into a Vec cannot fail.
        let bytes = serde_json::to_vec(&self.table()).unwrap_or_default();
        Sha256::digest(&bytes)
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }

    /// A JSON Schema document accepting the field-bags this generation
    /// decodes.
    ///
    /// Each variant is a `$defs` entry. The root is a `oneOf` over all of
    /// them, which mirrors tag inference: a bag without `type` that
    /// satisfies two variants' required lists is rejected as ambiguous.
    /// Optional fields also accept `null`, which the decoder treats as
    /// absence. Extra members are allowed.
    pub fn to_json_schema(&self) -> Value {
        let mut defs = Map::new();
        for shape in self.shapes() {
            defs.insert(shape.class.as_str().to_string(), variant_schema(shape));
        }
        let variants: Vec<Value> = self
            .shapes()
            .iter()
            .map(|shape| def_ref(shape.class.as_str()))
            .collect();

        json!({
            "$schema": JSON_SCHEMA_DIALECT,
            "title": format!("Atomic value catalog ({})", self.generation()),
            "x-fingerprint": self.fingerprint(),
            "oneOf": variants,
            "$defs": defs,
        })
    }
}

fn def_ref(tag: &str) -> Value {
    json!({ "$ref": format!("#/$defs/{tag}") })
}

fn variant_schema(shape: &VariantShape) -> Value {
    let mut properties = Map::new();
    properties.insert(
        TYPE_FIELD.to_string(),
        json!({ "const": shape.class.as_str() }),
    );
    for field in shape.fields {
        properties.insert(field.name.to_string(), field_schema(field));
    }
    let required: Vec<&str> = shape.required_fields().map(|f| f.name).collect();

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn field_schema(field: &FieldDescriptor) -> Value {
    let mut schema = kind_schema(&field.kind);
    if let Some(default) = &field.default {
        if let Value::Object(map) = &mut schema {
            map.insert("default".to_string(), json!(default));
        }
    }
    if field.required {
        schema
    } else {
        json!({ "anyOf": [schema, { "type": "null" }] })
    }
}

fn kind_schema(kind: &FieldKind) -> Value {
    match kind {
        FieldKind::String => json!({ "type": "string" }),
        FieldKind::Number => json!({ "type": "number" }),
        FieldKind::Boolean => json!({ "type": "boolean" }),
        FieldKind::Timestamp => json!({ "type": "string", "pattern": TIMESTAMP_PATTERN }),
        FieldKind::StringList => json!({ "type": "array", "items": { "type": "string" } }),
        FieldKind::Ordinal(names) => json!({
            "type": "integer",
            "minimum": 0,
            "maximum": names.len().saturating_sub(1),
        }),
        FieldKind::Nested(target) => target_schema(target),
        FieldKind::NestedList(target) => json!({ "type": "array", "items": target_schema(target) }),
    }
}

fn target_schema(target: &NestedTarget) -> Value {
    match target {
        NestedTarget::Fixed(class) => def_ref(class.as_str()),
        NestedTarget::OneOf(members) => {
            let refs: Vec<Value> = members.iter().map(|m| def_ref(m.as_str())).collect();
            json!({ "oneOf": refs })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable() {
        let registry = Registry::current();
        let a = registry.fingerprint();
        let b = registry.fingerprint();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_fingerprint_differs_between_generations() {
        assert_ne!(
            Registry::for_generation(Generation::V1).fingerprint(),
            Registry::for_generation(Generation::V2).fingerprint()
        );
    }

    #[test]
    fn test_shape_table_lists_every_variant() {
        let table = Registry::current().shape_table();
        assert_eq!(table["generation"], "v2");
        let shapes = table["shapes"].as_array().unwrap();
        assert_eq!(shapes.len(), 19);
        assert_eq!(shapes[0]["type"], "Text");
        assert_eq!(shapes[0]["fields"][0]["name"], "text");
    }

    #[test]
    fn test_schema_defs_and_refs() {
        let schema = Registry::current().to_json_schema();
        assert_eq!(schema["$schema"], JSON_SCHEMA_DIALECT);
        assert_eq!(schema["oneOf"].as_array().unwrap().len(), 19);

        let action = &schema["$defs"]["Action"];
        assert_eq!(action["properties"]["type"]["const"], "Action");
        assert_eq!(
            action["properties"]["object"],
            json!({ "$ref": "#/$defs/Resource" })
        );
        let required = action["required"].as_array().unwrap();
        assert!(required.contains(&json!("object")));
        assert!(!required.contains(&json!("type")));
    }

    #[test]
    fn test_schema_optional_fields_nullable() {
        let schema = Registry::current().to_json_schema();
        let keywords = &schema["$defs"]["DigitalDocument"]["properties"]["keywords"];
        assert_eq!(keywords["anyOf"][1], json!({ "type": "null" }));
        assert_eq!(keywords["anyOf"][0]["default"], json!([]));
    }

    #[test]
    fn test_v1_schema_uses_legacy_spellings() {
        let schema = Registry::for_generation(Generation::V1).to_json_schema();
        assert_eq!(schema["$defs"]["Number"]["properties"]["type"]["const"], "Number");
        assert!(schema["$defs"].get("Numeric").is_none());
        assert_eq!(
            schema["$defs"]["Action"]["properties"]["actionStatus"],
            json!({ "type": "integer", "minimum": 0, "maximum": 3 })
        );
    }

    #[test]
    fn test_schema_agent_slot() {
        let schema = Registry::current().to_json_schema();
        let actor = &schema["$defs"]["Action"]["properties"]["actor"];
        assert_eq!(actor["oneOf"].as_array().unwrap().len(), 3);
    }
}
